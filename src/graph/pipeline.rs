//! Staged rebuilding of the render graph.

use log::{debug, error};
use thiserror::Error;

use super::message::Message;
use super::model::{GraphModel, ModelError};
use super::settings::FilterSettings;
use super::stages::{
	CurvatureStage, InitStage, LinkWeightFilter, NodeDegreeFilter, SourceDatabaseFilter,
	TypeColorStage,
};

/// A stage left the graph in a state later stages cannot work with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
	/// Validation failed right after `stage` ran.
	#[error("stage `{stage}` broke the graph: {source}")]
	Invariant {
		/// Name of the offending stage.
		stage: &'static str,
		/// The violated invariant.
		#[source]
		source: ModelError,
	},
	/// A partial run named a stage this pipeline does not have.
	#[error("no stage named `{0}`")]
	UnknownStage(String),
}

/// One step of a [`Pipeline`].
///
/// A stage reads the settings, rewrites `message.graph` and must leave it
/// valid (see [`GraphModel::validate`]). Missing optional attributes are
/// never an error.
pub trait Stage {
	/// Short name used in logs and errors.
	fn name(&self) -> &'static str;
	/// Rewrites `message.graph` in place.
	fn apply(&self, message: &mut Message, settings: &FilterSettings);
}

/// Ordered list of stages run against a message.
pub struct Pipeline {
	stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
	/// Pipeline running `stages` in the given order.
	pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
		Self { stages }
	}

	/// Stages for query results.
	pub fn query() -> Self {
		Self::new(vec![
			Box::new(InitStage),
			Box::new(LinkWeightFilter),
			Box::new(NodeDegreeFilter),
			Box::new(SourceDatabaseFilter),
			Box::new(TypeColorStage),
			Box::new(CurvatureStage),
		])
	}

	/// Stages for the schema graph, whose edges carry no weight or source.
	pub fn schema() -> Self {
		Self::new(vec![
			Box::new(InitStage),
			Box::new(NodeDegreeFilter),
			Box::new(TypeColorStage),
			Box::new(CurvatureStage),
		])
	}

	/// Stage names in run order.
	pub fn stage_names(&self) -> Vec<&'static str> {
		self.stages.iter().map(|s| s.name()).collect()
	}

	/// Runs every stage in order and returns the rebuilt graph.
	pub fn run<'m>(
		&self,
		message: &'m mut Message,
		settings: &FilterSettings,
	) -> Result<&'m GraphModel, PipelineError> {
		self.run_stages(&self.stages, message, settings)
	}

	/// Runs `stage` and every stage after it over the graph already in
	/// `message`, e.g. to re-apply hidden types after a legend click.
	pub fn run_from<'m>(
		&self,
		stage: &str,
		message: &'m mut Message,
		settings: &FilterSettings,
	) -> Result<&'m GraphModel, PipelineError> {
		let start = self
			.stages
			.iter()
			.position(|s| s.name() == stage)
			.ok_or_else(|| PipelineError::UnknownStage(stage.to_string()))?;
		self.run_stages(&self.stages[start..], message, settings)
	}

	fn run_stages<'m>(
		&self,
		stages: &[Box<dyn Stage>],
		message: &'m mut Message,
		settings: &FilterSettings,
	) -> Result<&'m GraphModel, PipelineError> {
		for stage in stages {
			stage.apply(message, settings);
			if let Err(source) = message.graph.validate() {
				error!("pipeline stage {} broke the graph: {}", stage.name(), source);
				return Err(PipelineError::Invariant {
					stage: stage.name(),
					source,
				});
			}
			debug!(
				"{}: {} nodes, {} links",
				stage.name(),
				message.graph.nodes.len(),
				message.graph.links.len()
			);
		}
		Ok(&message.graph)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::message::{KgEdge, KgNode, KnowledgeGraph, OneOrMany};
	use crate::graph::model::tests::link;

	fn message() -> Message {
		let node = |id: &str, t: &str| KgNode {
			id: Some(id.into()),
			kind: Some(OneOrMany::One(t.into())),
			..Default::default()
		};
		Message::new(KnowledgeGraph {
			nodes: vec![node("a", "gene"), node("b", "disease")],
			edges: vec![KgEdge {
				source_id: Some("a".into()),
				target_id: Some("b".into()),
				kind: Some(OneOrMany::One("affects".into())),
				weight: Some(0.5),
				..Default::default()
			}],
		})
	}

	struct Dangle;

	impl Stage for Dangle {
		fn name(&self) -> &'static str {
			"dangle"
		}

		fn apply(&self, message: &mut Message, _: &FilterSettings) {
			message.graph.links.push(link("a", "ghost", &["x"]));
		}
	}

	#[test]
	fn stage_orders() {
		assert_eq!(
			Pipeline::query().stage_names(),
			vec![
				"init",
				"link-weight",
				"node-degree",
				"source-database",
				"type-color",
				"curvature"
			]
		);
		assert_eq!(
			Pipeline::schema().stage_names(),
			vec!["init", "node-degree", "type-color", "curvature"]
		);
	}

	#[test]
	fn run_builds_colored_graph() {
		let mut msg = message();
		let graph = Pipeline::query().run(&mut msg, &FilterSettings::default()).unwrap();
		assert_eq!(graph.nodes.len(), 2);
		assert_eq!(graph.links.len(), 1);
		assert!(graph.nodes.iter().all(|n| n.color.is_some()));
		assert!(graph.links[0].color.is_some());
	}

	#[test]
	fn contract_violation_fails_fast() {
		let mut msg = message();
		let pipeline = Pipeline::new(vec![Box::new(InitStage), Box::new(Dangle), Box::new(TypeColorStage)]);
		let err = pipeline.run(&mut msg, &FilterSettings::default()).unwrap_err();
		assert!(matches!(err, PipelineError::Invariant { stage: "dangle", .. }));
		assert!(msg.graph.type_mappings.nodes.is_empty());
	}

	#[test]
	fn legend_toggle_reruns_the_later_stages_only() {
		let mut msg = message();
		let pipeline = Pipeline::query();
		let full = pipeline.run(&mut msg, &FilterSettings::default()).unwrap().clone();

		msg.graph.hidden_types.toggle_node_type("gene");
		let hidden = pipeline
			.run_from("type-color", &mut msg, &FilterSettings::default())
			.unwrap();
		assert!(hidden.nodes.is_empty());
		assert_eq!(hidden.type_mappings.nodes, {
			let mut t = full.type_mappings.nodes.clone();
			for e in &mut t.0 {
				e.actual_quantity = Some(0);
			}
			t
		});

		msg.graph.hidden_types.toggle_node_type("gene");
		let shown = pipeline
			.run_from("type-color", &mut msg, &FilterSettings::default())
			.unwrap();
		assert_eq!(shown, &full);

		let err = pipeline
			.run_from("layout", &mut msg, &FilterSettings::default())
			.unwrap_err();
		assert_eq!(err, PipelineError::UnknownStage("layout".into()));
	}
}
