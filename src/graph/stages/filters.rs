use std::collections::{HashMap, HashSet};

use log::debug;

use crate::graph::message::Message;
use crate::graph::pipeline::Stage;
use crate::graph::settings::FilterSettings;

/// Drops weighted links outside the configured weight range.
///
/// Weights are compared ×100 against the 0–100 range. Unweighted links
/// always pass.
pub struct LinkWeightFilter;

impl Stage for LinkWeightFilter {
	fn name(&self) -> &'static str {
		"link-weight"
	}

	fn apply(&self, message: &mut Message, settings: &FilterSettings) {
		let (min, max) = settings.link_weight_range;
		let removed = message.graph.retain_links(|link| match link.weight {
			None => true,
			Some(w) => {
				let scaled = (w * 100.0).round();
				scaled >= min && scaled <= max
			}
		});
		debug!("link-weight: removed {removed} links outside {min}..={max}");
	}
}

/// Drops nodes whose degree is outside the configured range.
///
/// The degree counts incoming links only, plus one.
pub struct NodeDegreeFilter;

impl NodeDegreeFilter {
	/// Degree of every node in the current graph.
	pub fn degrees(message: &Message) -> HashMap<&str, usize> {
		let graph = &message.graph;
		let mut degrees: HashMap<&str, usize> =
			graph.nodes.iter().map(|n| (n.id.as_str(), 1)).collect();
		for link in &graph.links {
			if let Some(d) = degrees.get_mut(link.target.as_str()) {
				*d += 1;
			}
		}
		degrees
	}
}

impl Stage for NodeDegreeFilter {
	fn name(&self) -> &'static str {
		"node-degree"
	}

	fn apply(&self, message: &mut Message, settings: &FilterSettings) {
		let (min, max) = settings.node_degree_range;
		let outside: HashSet<String> = Self::degrees(message)
			.into_iter()
			.filter(|&(_, d)| d < min || d > max)
			.map(|(id, _)| id.to_string())
			.collect();
		if outside.is_empty() {
			return;
		}

		let graph = &mut message.graph;
		let before = graph.linked_node_ids();
		graph.retain_nodes(|n| !outside.contains(&n.id));
		let pruned = graph.prune_disconnected(&before);
		debug!(
			"node-degree: removed {} nodes outside {min}..={max}, {pruned} left unlinked",
			outside.len()
		);
	}
}

/// Drops links that come from a deselected source database.
pub struct SourceDatabaseFilter;

impl Stage for SourceDatabaseFilter {
	fn name(&self) -> &'static str {
		"source-database"
	}

	fn apply(&self, message: &mut Message, settings: &FilterSettings) {
		if settings.data_sources.iter().all(|s| s.checked) {
			return;
		}
		let Message {
			knowledge_graph,
			graph,
			..
		} = message;
		let removed = graph.retain_links(|link| {
			let Some(sources) = knowledge_graph
				.edges
				.get(link.origin)
				.and_then(|e| e.source_database.as_ref())
			else {
				return true;
			};
			!sources
				.to_vec()
				.iter()
				.any(|s| settings.is_source_excluded(s))
		});
		debug!("source-database: removed {removed} links");
	}
}
