//! Knowledge-graph messages and the pipeline that turns them into a
//! renderable, filterable, colored graph.

pub mod color;
pub mod message;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod stages;

pub use message::{KgEdge, KgNode, KnowledgeGraph, Message, MessageError, OneOrMany};
pub use model::{
	Connections, GraphModel, HiddenTypes, ModelError, RenderLink, RenderNode, TypeEntry,
	TypeMappings, TypeTable,
};
pub use pipeline::{Pipeline, PipelineError, Stage};
pub use settings::{DataSource, FilterSettings};
