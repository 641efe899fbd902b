use std::collections::{HashMap, HashSet};

use log::debug;

use crate::graph::color::color_for_rank;
use crate::graph::message::Message;
use crate::graph::model::{Stash, TypeEntry, TypeMappings, TypeTable};
use crate::graph::pipeline::Stage;
use crate::graph::settings::FilterSettings;

/// Builds the legend, colors every element by its first type and removes
/// hidden types.
pub struct TypeColorStage;

impl Stage for TypeColorStage {
	fn name(&self) -> &'static str {
		"type-color"
	}

	fn apply(&self, message: &mut Message, _: &FilterSettings) {
		let graph = &mut message.graph;
		// quantities cover everything a previous pass hid
		graph.restore_stash();
		let mut mappings = TypeMappings {
			nodes: rank(graph.nodes.iter().map(|n| n.types.as_slice())),
			links: rank(graph.links.iter().map(|l| l.types.as_slice())),
		};

		for node in &mut graph.nodes {
			node.color = mappings.nodes.color_of(&node.types[0]).map(str::to_string);
		}
		for link in &mut graph.links {
			link.color = mappings.links.color_of(&link.types[0]).map(str::to_string);
		}

		if !graph.hidden_types.is_empty() {
			let hidden = graph.hidden_types.clone();
			let (all_nodes, all_links) = (graph.nodes.clone(), graph.links.clone());
			let before = graph.linked_node_ids();
			graph.retain_nodes(|n| !hidden.hides_node(n));
			graph.links.retain(|l| !hidden.hides_link(l));
			let pruned = graph.prune_disconnected(&before);

			let kept_nodes: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
			let kept_links: HashSet<(usize, &str)> =
				graph.links.iter().map(|l| (l.origin, l.id.as_str())).collect();
			let stash = Stash {
				nodes: all_nodes
					.into_iter()
					.filter(|n| !kept_nodes.contains(n.id.as_str()))
					.collect(),
				links: all_links
					.into_iter()
					.filter(|l| !kept_links.contains(&(l.origin, l.id.as_str())))
					.collect(),
			};
			debug!(
				"type-color: hiding {} node and {} link types, {} nodes and {} links stashed, {pruned} left unlinked",
				hidden.nodes.len(),
				hidden.links.len(),
				stash.nodes.len(),
				stash.links.len()
			);
			graph.stash = stash;
		}

		set_actual(&mut mappings.nodes, graph.nodes.iter().map(|n| n.types.as_slice()));
		set_actual(&mut mappings.links, graph.links.iter().map(|l| l.types.as_slice()));
		graph.type_mappings = mappings;
	}
}

/// Counts types in first-seen order and colors them by descending count.
fn rank<'a>(elements: impl Iterator<Item = &'a [String]>) -> TypeTable {
	let mut counted: Vec<(String, usize)> = Vec::new();
	let mut index: HashMap<&'a str, usize> = HashMap::new();
	for types in elements {
		let mut seen = HashSet::new();
		for t in types {
			if !seen.insert(t.as_str()) {
				continue;
			}
			match index.get(t.as_str()) {
				Some(&i) => counted[i].1 += 1,
				None => {
					index.insert(t.as_str(), counted.len());
					counted.push((t.clone(), 1));
				}
			}
		}
	}
	// stable: equal counts keep first-seen order
	counted.sort_by(|a, b| b.1.cmp(&a.1));
	TypeTable(
		counted
			.into_iter()
			.enumerate()
			.map(|(rank, (name, quantity))| TypeEntry {
				name,
				color: color_for_rank(rank),
				quantity,
				actual_quantity: None,
			})
			.collect(),
	)
}

fn set_actual<'a>(table: &mut TypeTable, elements: impl Iterator<Item = &'a [String]>) {
	let mut counts: HashMap<&str, usize> = HashMap::new();
	for types in elements {
		let distinct: HashSet<&str> = types.iter().map(String::as_str).collect();
		for t in distinct {
			*counts.entry(t).or_insert(0) += 1;
		}
	}
	for entry in &mut table.0 {
		entry.actual_quantity = Some(counts.get(entry.name.as_str()).copied().unwrap_or(0));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::color::PALETTE;
	use crate::graph::model::GraphModel;
	use crate::graph::model::tests::{link, node};

	fn apply(graph: GraphModel) -> GraphModel {
		let mut msg = Message {
			graph,
			..Default::default()
		};
		TypeColorStage.apply(&mut msg, &FilterSettings::default());
		assert!(msg.graph.validate().is_ok());
		msg.graph
	}

	#[test]
	fn most_frequent_type_gets_first_color() {
		let g = apply(GraphModel {
			nodes: vec![node("a", &["x"]), node("b", &["y", "x"]), node("c", &["y"]), node("d", &["y"])],
			links: vec![link("a", "b", &["r"])],
			..Default::default()
		});
		let nodes = &g.type_mappings.nodes;
		assert_eq!(nodes.0[0].name, "y");
		assert_eq!(nodes.0[0].quantity, 3);
		assert_eq!(nodes.0[0].color, PALETTE[0]);
		assert_eq!(nodes.get("x").unwrap().quantity, 2);
		// links rank independently
		assert_eq!(g.type_mappings.links.color_of("r"), Some(PALETTE[0]));
		// first type decides the node color
		assert_eq!(g.nodes[1].color.as_deref(), Some(PALETTE[0]));
		assert_eq!(g.nodes[0].color.as_deref(), Some(PALETTE[1]));
	}

	#[test]
	fn thirty_tied_types_wrap_with_hue_shift() {
		let nodes = (0..30).map(|i| node(&format!("n{i}"), &[format!("t{i}").as_str()])).collect();
		let g = apply(GraphModel {
			nodes,
			..Default::default()
		});
		let table = &g.type_mappings.nodes;
		for i in 0..26 {
			assert_eq!(table.0[i].name, format!("t{i}"));
			assert_eq!(table.0[i].color, PALETTE[i]);
		}
		for i in 26..30 {
			assert_eq!(table.0[i].color, color_for_rank(i));
			assert_ne!(table.0[i].color, PALETTE[i - 26]);
		}
	}

	#[test]
	fn hiding_a_type_keeps_quantity_and_zeroes_actual() {
		let mut graph = GraphModel {
			nodes: vec![node("g1", &["gene"]), node("g2", &["gene"]), node("d", &["disease"]), node("p", &["protein"])],
			links: vec![
				link("g1", "d", &["affects"]),
				link("g2", "d", &["affects"]),
				link("p", "d", &["binds"]),
			],
			..Default::default()
		};
		graph.hidden_types.toggle_node_type("gene");
		let g = apply(graph);
		let ids: Vec<_> = g.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["d", "p"]);
		assert_eq!(g.links.len(), 1);
		let gene = g.type_mappings.nodes.get("gene").unwrap();
		assert_eq!(gene.quantity, 2);
		assert_eq!(gene.actual_quantity, Some(0));
		let affects = g.type_mappings.links.get("affects").unwrap();
		assert_eq!((affects.quantity, affects.actual_quantity), (2, Some(0)));
	}

	#[test]
	fn hidden_link_type_strands_its_nodes() {
		let mut graph = GraphModel {
			nodes: vec![node("a", &["x"]), node("b", &["x"]), node("c", &["x"])],
			links: vec![link("a", "b", &["r"]), link("b", "c", &["s"])],
			..Default::default()
		};
		graph.hidden_types.toggle_link_type("s");
		let g = apply(graph);
		let ids: Vec<_> = g.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["a", "b"]);
		assert_eq!(g.type_mappings.nodes.get("x").unwrap().actual_quantity, Some(2));
	}

	/// Nodes and links numbered in message order, as the init stage leaves them.
	fn numbered(mut graph: GraphModel) -> GraphModel {
		for (i, n) in graph.nodes.iter_mut().enumerate() {
			n.origin = i;
		}
		for (i, l) in graph.links.iter_mut().enumerate() {
			l.origin = i;
		}
		graph
	}

	fn gene_graph() -> GraphModel {
		numbered(GraphModel {
			nodes: vec![
				node("g1", &["gene"]),
				node("g2", &["gene"]),
				node("d", &["disease"]),
				node("c", &["chemical"]),
				node("s", &["gene"]),
			],
			links: vec![
				link("g1", "d", &["affects"]),
				link("g2", "d", &["affects"]),
				link("c", "d", &["treats"]),
				link("s", "s", &["regulates"]),
			],
			..Default::default()
		})
	}

	#[test]
	fn reapplying_is_idempotent() {
		let once = apply(numbered(GraphModel {
			nodes: vec![node("a", &["x"]), node("b", &["y"]), node("c", &["y"])],
			links: vec![link("a", "b", &["r"]), link("b", "c", &["r"])],
			..Default::default()
		}));
		let twice = apply(once.clone());
		assert_eq!(once.type_mappings, twice.type_mappings);
		assert_eq!(once, twice);
	}

	#[test]
	fn reapplying_with_hidden_types_is_idempotent() {
		let mut graph = gene_graph();
		graph.hidden_types.toggle_node_type("gene");
		graph.hidden_types.toggle_link_type("treats");
		let once = apply(graph);
		assert!(once.nodes.is_empty());
		let gene = once.type_mappings.nodes.get("gene").unwrap();
		assert_eq!((gene.quantity, gene.actual_quantity, gene.color.as_str()), (3, Some(0), PALETTE[0]));

		let twice = apply(once.clone());
		assert_eq!(once.type_mappings, twice.type_mappings);
		assert_eq!(once, twice);
	}

	#[test]
	fn showing_a_type_again_restores_its_elements_in_order() {
		let mut graph = gene_graph();
		graph.hidden_types.toggle_node_type("gene");
		let mut hidden = apply(graph);
		let ids: Vec<_> = hidden.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, vec!["d", "c"]);

		hidden.hidden_types.toggle_node_type("gene");
		let shown = apply(hidden);
		assert_eq!(shown, apply(gene_graph()));
		assert!(shown.stash.is_empty());
	}
}
