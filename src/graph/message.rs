//! Backend knowledge-graph payloads.
//!
//! The backend answers a query with `{knowledge_graph: {nodes, edges}, ...}`.
//! Everything is deserialized leniently: required fields are optional here so
//! that a single malformed element is dropped by the init stage instead of
//! rejecting the whole response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::GraphModel;

/// Failure to import a backend response.
#[derive(Debug, Error)]
pub enum MessageError {
	/// The payload is not valid JSON or does not have the message shape.
	#[error("invalid knowledge graph message: {0}")]
	Json(#[from] serde_json::Error),
}

/// A field the backend sends either as a scalar or as a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
	/// A single value.
	One(String),
	/// A list of values.
	Many(Vec<String>),
}

impl OneOrMany {
	/// Normalizes to a list, dropping empty strings.
	pub fn to_vec(&self) -> Vec<String> {
		match self {
			OneOrMany::One(s) if s.is_empty() => Vec::new(),
			OneOrMany::One(s) => vec![s.clone()],
			OneOrMany::Many(v) => v.iter().filter(|s| !s.is_empty()).cloned().collect(),
		}
	}
}

/// A node as sent by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KgNode {
	/// Node id; nodes without one are dropped.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Node type or types.
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<OneOrMany>,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Any other backend attribute, kept for the find tool.
	#[serde(flatten)]
	pub attributes: Map<String, Value>,
}

/// An edge as sent by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KgEdge {
	/// Edge id; a missing one is derived from the endpoints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Id of the source node.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_id: Option<String>,
	/// Id of the target node.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target_id: Option<String>,
	/// Edge type or types.
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<OneOrMany>,
	/// Confidence in `0..=1`; `None` passes every weight filter.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub weight: Option<f64>,
	/// Databases the edge was drawn from.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_database: Option<OneOrMany>,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Any other backend attribute.
	#[serde(flatten)]
	pub attributes: Map<String, Value>,
}

/// The `knowledge_graph` section of a backend response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
	/// Backend nodes, in response order.
	#[serde(default)]
	pub nodes: Vec<KgNode>,
	/// Backend edges, in response order.
	#[serde(default)]
	pub edges: Vec<KgEdge>,
}

/// A backend response travelling through the pipeline together with the
/// graph derived from it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Message {
	/// The graph returned by the backend.
	#[serde(default)]
	pub knowledge_graph: KnowledgeGraph,
	/// Render graph built by the last pipeline run.
	#[serde(skip)]
	pub graph: GraphModel,
	/// Other top-level fields, passed through untouched.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Message {
	/// Wraps a knowledge graph with an empty render graph.
	pub fn new(knowledge_graph: KnowledgeGraph) -> Self {
		Self {
			knowledge_graph,
			..Self::default()
		}
	}

	/// Imports a backend response.
	pub fn from_json(json: &str) -> Result<Self, MessageError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Backend node a render node was built from.
	pub fn origin_node(&self, origin: usize) -> Option<&KgNode> {
		self.knowledge_graph.nodes.get(origin)
	}

	/// Backend edge a render link was built from.
	pub fn origin_edge(&self, origin: usize) -> Option<&KgEdge> {
		self.knowledge_graph.edges.get(origin)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_scalar_and_list_fields() {
		let msg = Message::from_json(
			r#"{
				"status": "OK",
				"knowledge_graph": {
					"nodes": [
						{"id": "n1", "type": "gene", "name": "BRCA1", "symbol": "B1"},
						{"id": "n2", "type": ["disease", "phenotype"]}
					],
					"edges": [
						{"source_id": "n1", "target_id": "n2", "type": "affects",
						 "weight": 0.5, "source_database": ["a", "b"]}
					]
				}
			}"#,
		)
		.unwrap();

		let kg = &msg.knowledge_graph;
		assert_eq!(kg.nodes[0].kind, Some(OneOrMany::One("gene".into())));
		assert_eq!(kg.nodes[0].attributes["symbol"], "B1");
		assert_eq!(kg.nodes[1].kind.as_ref().unwrap().to_vec(), vec!["disease", "phenotype"]);
		assert_eq!(kg.edges[0].weight, Some(0.5));
		assert_eq!(kg.edges[0].source_database.as_ref().unwrap().to_vec().len(), 2);
		assert_eq!(msg.extra["status"], "OK");
	}

	#[test]
	fn tolerates_missing_and_null_fields() {
		let msg = Message::from_json(
			r#"{"knowledge_graph": {"nodes": [{"name": "orphan"}],
			"edges": [{"source_id": "a", "weight": null}]}}"#,
		)
		.unwrap();
		assert!(msg.knowledge_graph.nodes[0].id.is_none());
		assert!(msg.knowledge_graph.edges[0].weight.is_none());
	}

	#[test]
	fn rejects_non_json() {
		let err = Message::from_json("not json").unwrap_err();
		assert!(err.to_string().starts_with("invalid knowledge graph message"));
	}
}
