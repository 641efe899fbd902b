//! Filter settings read by the pipeline stages.

use serde::{Deserialize, Serialize};

use super::message::KnowledgeGraph;

/// One entry of the data-source checkbox list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
	/// Database name as sent by the backend.
	pub label: String,
	/// Unchecked sources are filtered out.
	pub checked: bool,
}

impl DataSource {
	/// Distinct source databases named by the edges of `kg`, in first-seen
	/// order, all checked.
	pub fn collect(kg: &KnowledgeGraph) -> Vec<DataSource> {
		let mut sources: Vec<DataSource> = Vec::new();
		for db in kg.edges.iter().filter_map(|e| e.source_database.as_ref()) {
			for label in db.to_vec() {
				if !sources.iter().any(|s| s.label == label) {
					sources.push(DataSource {
						label,
						checked: true,
					});
				}
			}
		}
		sources
	}
}

/// User-adjustable filter settings handed to every pipeline run.
///
/// Stages only read it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSettings {
	/// Inclusive link weight bounds on a 0–100 scale (weight × 100).
	pub link_weight_range: (f64, f64),
	/// Inclusive node degree bounds.
	pub node_degree_range: (usize, usize),
	/// Source database checkboxes; unlisted sources pass.
	pub data_sources: Vec<DataSource>,
}

impl Default for FilterSettings {
	fn default() -> Self {
		Self {
			link_weight_range: (0.0, 100.0),
			node_degree_range: (0, usize::MAX),
			data_sources: Vec::new(),
		}
	}
}

impl FilterSettings {
	/// Reads camelCase settings, defaulting any missing field.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// True when `label` is listed and unchecked.
	pub fn is_source_excluded(&self, label: &str) -> bool {
		self.data_sources
			.iter()
			.any(|s| !s.checked && s.label == label)
	}
}
