//! The stages of the query and schema pipelines.

mod curvature;
mod filters;
mod init;
mod types;

pub use curvature::CurvatureStage;
pub use filters::{LinkWeightFilter, NodeDegreeFilter, SourceDatabaseFilter};
pub use init::InitStage;
pub use types::TypeColorStage;
