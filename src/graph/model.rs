//! The render graph: nodes and links the canvas draws and the find tool
//! searches, plus the legend tables and hidden types.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural invariant violations of a [`GraphModel`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
	/// Two nodes share an id.
	#[error("duplicate node id `{0}`")]
	DuplicateNode(String),
	/// A node has an empty type list.
	#[error("node `{0}` has no type")]
	UntypedNode(String),
	/// A link has an empty type list.
	#[error("link `{0}` has no type")]
	UntypedLink(String),
	/// A link endpoint is not in the graph.
	#[error("link `{link}` references missing node `{node}`")]
	DanglingLink {
		/// Id of the link.
		link: String,
		/// The missing endpoint.
		node: String,
	},
}

/// A node as the renderer and the find tool see it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
	/// Unique node id.
	pub id: String,
	/// Non-empty type list; the first type picks the color.
	#[serde(rename = "type")]
	pub types: Vec<String>,
	/// Display name, the id when the backend sent none.
	pub name: String,
	/// Index of the backend node in `knowledge_graph.nodes`.
	pub origin: usize,
	/// `#RRGGBB` color of the first type, set by the type stage.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
}

/// A link as the renderer and the find tool see it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderLink {
	/// Link id, unique within the graph.
	pub id: String,
	/// Source node id.
	pub source: String,
	/// Target node id.
	pub target: String,
	/// Non-empty type list; the first type picks the color.
	#[serde(rename = "type")]
	pub types: Vec<String>,
	/// Backend weight, rounded to two decimals.
	pub weight: Option<f64>,
	/// Display name, empty when the backend sent none.
	pub name: String,
	/// Index of the backend edge in `knowledge_graph.edges`.
	pub origin: usize,
	/// `#RRGGBB` color of the first type, set by the type stage.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	/// Newline-joined names of every link between the same two nodes.
	pub concat_name: String,
	/// Bend of the drawn curve, set by the curvature stage.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub curvature: Option<f64>,
	/// Angle of a self-loop in radians, set by the curvature stage.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rotation: Option<f64>,
}

impl RenderLink {
	/// True when the link touches `id` at either end.
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}

	/// True for links starting and ending at the same node.
	pub fn is_self_loop(&self) -> bool {
		self.source == self.target
	}
}

/// Legend row for one type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeEntry {
	/// Type name.
	pub name: String,
	/// `#RRGGBB` color given to the type's rank.
	pub color: String,
	/// Elements carrying the type before hidden types are removed.
	pub quantity: usize,
	/// Elements carrying the type that are still shown.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub actual_quantity: Option<usize>,
}

/// Type entries in rank order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable(pub Vec<TypeEntry>);

impl TypeTable {
	/// Entry for `name`, if the type occurs.
	pub fn get(&self, name: &str) -> Option<&TypeEntry> {
		self.0.iter().find(|e| e.name == name)
	}

	/// Color assigned to `name`.
	pub fn color_of(&self, name: &str) -> Option<&str> {
		self.get(name).map(|e| e.color.as_str())
	}

	/// Entries in rank order.
	pub fn iter(&self) -> impl Iterator<Item = &TypeEntry> {
		self.0.iter()
	}

	/// Number of distinct types.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// True when no type occurs.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Per-type colors and counts for nodes and links.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMappings {
	/// Node types.
	pub nodes: TypeTable,
	/// Link types.
	pub links: TypeTable,
}

/// Types the user switched off in the legend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenTypes {
	/// Hidden node types.
	pub nodes: BTreeSet<String>,
	/// Hidden link types.
	pub links: BTreeSet<String>,
}

impl HiddenTypes {
	/// Flips a node type; returns whether it is now hidden.
	pub fn toggle_node_type(&mut self, kind: &str) -> bool {
		toggle(&mut self.nodes, kind)
	}

	/// Flips a link type; returns whether it is now hidden.
	pub fn toggle_link_type(&mut self, kind: &str) -> bool {
		toggle(&mut self.links, kind)
	}

	/// True when any type of `node` is hidden.
	pub fn hides_node(&self, node: &RenderNode) -> bool {
		node.types.iter().any(|t| self.nodes.contains(t))
	}

	/// True when any type of `link` is hidden.
	pub fn hides_link(&self, link: &RenderLink) -> bool {
		link.types.iter().any(|t| self.links.contains(t))
	}

	/// True when nothing is hidden.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.links.is_empty()
	}
}

fn toggle(set: &mut BTreeSet<String>, kind: &str) -> bool {
	if set.remove(kind) {
		false
	} else {
		set.insert(kind.to_string());
		true
	}
}

/// Links and neighbors around one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Connections<'a> {
	/// Links touching the node.
	pub links: Vec<&'a RenderLink>,
	/// Ids at the other end of those links, without repeats.
	pub neighbors: Vec<&'a str>,
}

/// Elements removed because their type is hidden, or stranded by that.
/// They still count towards the legend quantities and come back when the
/// type is shown again.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stash {
	/// Stashed nodes.
	pub nodes: Vec<RenderNode>,
	/// Stashed links.
	pub links: Vec<RenderLink>,
}

impl Stash {
	/// True when nothing is stashed.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.links.is_empty()
	}
}

/// The renderable graph derived from a message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModel {
	/// Shown nodes, in message order.
	pub nodes: Vec<RenderNode>,
	/// Shown links, in message order.
	pub links: Vec<RenderLink>,
	/// Types switched off in the legend.
	pub hidden_types: HiddenTypes,
	/// Legend tables from the last type stage.
	pub type_mappings: TypeMappings,
	/// Elements held back by the hidden types.
	#[serde(skip)]
	pub stash: Stash,
}

impl GraphModel {
	/// Node with `id`.
	pub fn node(&self, id: &str) -> Option<&RenderNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Ids of every shown node.
	pub fn node_ids(&self) -> HashSet<&str> {
		self.nodes.iter().map(|n| n.id.as_str()).collect()
	}

	/// Ids of every node at least one link touches.
	pub fn linked_node_ids(&self) -> HashSet<String> {
		let mut ids = HashSet::new();
		for link in &self.links {
			ids.insert(link.source.clone());
			ids.insert(link.target.clone());
		}
		ids
	}

	/// Removes links rejected by `keep` and then every node that was linked
	/// before and is not anymore. Nodes that never had a link stay.
	///
	/// Returns the number of links removed.
	pub fn retain_links<F>(&mut self, keep: F) -> usize
	where
		F: FnMut(&RenderLink) -> bool,
	{
		let before = self.linked_node_ids();
		let count = self.links.len();
		self.links.retain(keep);
		let removed = count - self.links.len();
		if removed > 0 {
			self.prune_disconnected(&before);
		}
		removed
	}

	/// Removes rejected nodes and the links touching them. Returns the ids of
	/// the removed nodes.
	pub fn retain_nodes<F>(&mut self, mut keep: F) -> HashSet<String>
	where
		F: FnMut(&RenderNode) -> bool,
	{
		let mut dropped = HashSet::new();
		self.nodes.retain(|n| {
			let k = keep(n);
			if !k {
				dropped.insert(n.id.clone());
			}
			k
		});
		if !dropped.is_empty() {
			self.links
				.retain(|l| !dropped.contains(&l.source) && !dropped.contains(&l.target));
		}
		dropped
	}

	/// Drops nodes listed in `previously_linked` that no link touches anymore.
	pub fn prune_disconnected(&mut self, previously_linked: &HashSet<String>) -> usize {
		let linked = self.linked_node_ids();
		let count = self.nodes.len();
		self.nodes
			.retain(|n| linked.contains(&n.id) || !previously_linked.contains(&n.id));
		count - self.nodes.len()
	}

	/// Puts stashed elements back, in message order.
	pub fn restore_stash(&mut self) {
		if self.stash.is_empty() {
			return;
		}
		let Stash { nodes, links } = std::mem::take(&mut self.stash);
		self.nodes.extend(nodes);
		self.links.extend(links);
		self.nodes.sort_by_key(|n| n.origin);
		self.links.sort_by_key(|l| l.origin);
	}

	/// Checks the invariants every pipeline stage must leave behind.
	pub fn validate(&self) -> Result<(), ModelError> {
		let mut ids = HashSet::with_capacity(self.nodes.len());
		for node in &self.nodes {
			if !ids.insert(node.id.as_str()) {
				return Err(ModelError::DuplicateNode(node.id.clone()));
			}
			if node.types.is_empty() {
				return Err(ModelError::UntypedNode(node.id.clone()));
			}
		}
		for link in &self.links {
			if link.types.is_empty() {
				return Err(ModelError::UntypedLink(link.id.clone()));
			}
			for end in [&link.source, &link.target] {
				if !ids.contains(end.as_str()) {
					return Err(ModelError::DanglingLink {
						link: link.id.clone(),
						node: end.clone(),
					});
				}
			}
		}
		Ok(())
	}

	/// Links touching `id` and the distinct nodes on their other ends.
	pub fn connections(&self, id: &str) -> Connections<'_> {
		let mut conn = Connections::default();
		let mut seen = HashSet::new();
		for link in self.links.iter().filter(|l| l.touches(id)) {
			conn.links.push(link);
			let other = if link.source == id { &link.target } else { &link.source };
			if seen.insert(other.as_str()) {
				conn.neighbors.push(other.as_str());
			}
		}
		conn
	}

	/// Nodes carrying `kind` among their types.
	pub fn nodes_of_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a RenderNode> + 'a {
		self.nodes.iter().filter(move |n| n.types.iter().any(|t| t == kind))
	}

	/// Pretty JSON export of the graph.
	pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string_pretty(self)
	}
}

/// Order-independent key for the two ends of a link.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
	if a <= b {
		(a.to_string(), b.to_string())
	} else {
		(b.to_string(), a.to_string())
	}
}
