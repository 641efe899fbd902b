use std::collections::HashSet;

use log::warn;

use crate::graph::message::Message;
use crate::graph::model::{GraphModel, RenderLink, RenderNode};
use crate::graph::pipeline::Stage;
use crate::graph::settings::FilterSettings;

/// Translates the backend knowledge graph into a fresh render graph.
///
/// Hidden types survive from the previous graph of the same message.
pub struct InitStage;

impl Stage for InitStage {
	fn name(&self) -> &'static str {
		"init"
	}

	fn apply(&self, message: &mut Message, _: &FilterSettings) {
		let hidden_types = std::mem::take(&mut message.graph.hidden_types);
		let kg = &message.knowledge_graph;
		let mut graph = GraphModel {
			hidden_types,
			..GraphModel::default()
		};

		let mut ids = HashSet::new();
		for (origin, node) in kg.nodes.iter().enumerate() {
			let Some(id) = node.id.as_ref().filter(|id| !id.is_empty()) else {
				warn!("dropping node #{origin}: no id");
				continue;
			};
			let types = node.kind.as_ref().map(|k| k.to_vec()).unwrap_or_default();
			if types.is_empty() {
				warn!("dropping node {id}: no type");
				continue;
			}
			if !ids.insert(id.clone()) {
				warn!("dropping node {id}: duplicate id");
				continue;
			}
			graph.nodes.push(RenderNode {
				id: id.clone(),
				types,
				name: node.name.clone().unwrap_or_else(|| id.clone()),
				origin,
				color: None,
			});
		}

		for (origin, edge) in kg.edges.iter().enumerate() {
			let (Some(source), Some(target)) = (&edge.source_id, &edge.target_id) else {
				warn!("dropping edge #{origin}: missing endpoint");
				continue;
			};
			if !ids.contains(source) || !ids.contains(target) {
				warn!("dropping edge #{origin}: {source} -> {target} references an unknown node");
				continue;
			}
			let types = edge.kind.as_ref().map(|k| k.to_vec()).unwrap_or_default();
			if types.is_empty() {
				warn!("dropping edge #{origin}: no type");
				continue;
			}
			let name = edge.name.clone().unwrap_or_else(|| types.join(", "));
			graph.links.push(RenderLink {
				id: edge
					.id
					.clone()
					.unwrap_or_else(|| format!("{source}-{target}-{origin}")),
				source: source.clone(),
				target: target.clone(),
				types,
				weight: edge.weight.map(round2),
				concat_name: name.clone(),
				name,
				origin,
				color: None,
				curvature: None,
				rotation: None,
			});
		}

		message.graph = graph;
	}
}

fn round2(w: f64) -> f64 {
	(w * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
	use super::*;

	fn init(json: &str) -> Message {
		let mut msg = Message::from_json(json).unwrap();
		InitStage.apply(&mut msg, &FilterSettings::default());
		msg
	}

	#[test]
	fn normalizes_types_and_rounds_weights() {
		let msg = init(
			r#"{"knowledge_graph": {
				"nodes": [{"id": "n1", "type": "gene"}, {"id": "n2", "type": ["gene"]}],
				"edges": [{"source_id": "n1", "target_id": "n2", "type": "interacts", "weight": 0.12345}]
			}}"#,
		);
		let g = &msg.graph;
		assert_eq!(g.nodes[0].types, g.nodes[1].types);
		assert_eq!(g.nodes[0].name, "n1");
		assert_eq!(g.links[0].types, vec!["interacts"]);
		assert_eq!(g.links[0].weight, Some(0.12));
		assert_eq!(g.links[0].id, "n1-n2-0");
		assert_eq!(g.links[0].name, "interacts");
	}

	#[test]
	fn drops_malformed_elements() {
		let msg = init(
			r#"{"knowledge_graph": {
				"nodes": [
					{"id": "a", "type": "x"},
					{"id": "b"},
					{"type": "x"},
					{"id": "a", "type": "y"},
					{"id": "c", "type": []}
				],
				"edges": [
					{"source_id": "a", "target_id": "b", "type": "r"},
					{"source_id": "a", "type": "r"},
					{"source_id": "a", "target_id": "a"},
					{"id": "e9", "source_id": "a", "target_id": "a", "type": "self", "name": "loop"}
				]
			}}"#,
		);
		let g = &msg.graph;
		assert_eq!(g.nodes.len(), 1);
		assert_eq!(g.nodes[0].types, vec!["x"]);
		assert_eq!(g.links.len(), 1);
		assert_eq!(g.links[0].id, "e9");
		assert_eq!(g.links[0].origin, 3);
		assert_eq!(g.links[0].concat_name, "loop");
		assert!(g.validate().is_ok());
	}

	#[test]
	fn keeps_hidden_types_of_previous_graph() {
		let mut msg = init(r#"{"knowledge_graph": {"nodes": [{"id": "a", "type": "x"}]}}"#);
		msg.graph.hidden_types.toggle_node_type("x");
		InitStage.apply(&mut msg, &FilterSettings::default());
		assert!(msg.graph.hidden_types.nodes.contains("x"));
		assert_eq!(msg.graph.nodes.len(), 1);
	}
}
