use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use crate::graph::GraphModel;

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;
pub const DEFAULT_COLOR: &str = "#8c8c8c";
/// Radius of a self-loop of curvature 1, in world units.
pub const LOOP_RADIUS: f64 = 14.0;

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub label: Option<String>,
	pub color: String,
}

/// A rendered link. Kept outside the simulation so self-loops and parallel
/// links can be drawn with their own curvature.
#[derive(Clone, Debug)]
pub struct EdgeInfo {
	pub id: String,
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	pub color: String,
	pub curvature: f64,
	pub rotation: f64,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub edges: Vec<EdgeInfo>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	/// Nodes and links selected by the find tool.
	pub found_nodes: HashSet<DefaultNodeIdx>,
	pub found_links: HashSet<String>,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	id_to_idx: HashMap<String, DefaultNodeIdx>,
}

impl ForceGraphState {
	pub fn new(model: &GraphModel, width: f64, height: f64) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});
		let mut id_to_idx = HashMap::new();
		let mut edges = Vec::new();

		for (i, node) in model.nodes.iter().enumerate() {
			let angle = (i as f64) * 2.0 * PI / model.nodes.len() as f64;
			let (x, y) = (
				(width / 2.0 + 100.0 * angle.cos()) as f32,
				(height / 2.0 + 100.0 * angle.sin()) as f32,
			);

			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo {
					label: (!node.name.is_empty()).then(|| node.name.clone()),
					color: node.color.clone().unwrap_or_else(|| DEFAULT_COLOR.into()),
				},
			});
			id_to_idx.insert(node.id.clone(), idx);
		}

		let mut springs = HashSet::new();
		for link in &model.links {
			let (Some(&src), Some(&tgt)) = (id_to_idx.get(&link.source), id_to_idx.get(&link.target))
			else {
				continue;
			};
			// one spring per node pair; loops pull on nothing
			if src != tgt && springs.insert((src.min(tgt), src.max(tgt))) {
				graph.add_edge(src, tgt, EdgeData::default());
			}
			edges.push(EdgeInfo {
				id: link.id.clone(),
				source: src,
				target: tgt,
				color: link.color.clone().unwrap_or_else(|| DEFAULT_COLOR.into()),
				curvature: link.curvature.unwrap_or(0.0),
				rotation: link.rotation.unwrap_or(0.0),
			});
		}

		Self {
			graph,
			edges,
			id_to_idx,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			found_nodes: HashSet::new(),
			found_links: HashSet::new(),
			width,
			height,
			animation_running: true,
		}
	}

	pub fn index_of(&self, id: &str) -> Option<DefaultNodeIdx> {
		self.id_to_idx.get(id).copied()
	}

	/// Replaces the find-tool selection. Unknown ids are ignored.
	pub fn set_found<'a>(
		&mut self,
		nodes: impl IntoIterator<Item = &'a str>,
		links: impl IntoIterator<Item = &'a str>,
	) {
		self.found_nodes = nodes.into_iter().filter_map(|id| self.index_of(id)).collect();
		self.found_links = links.into_iter().map(String::from).collect();
	}

	pub fn has_found(&self) -> bool {
		!self.found_nodes.is_empty() || !self.found_links.is_empty()
	}

	/// World coordinates of every node.
	pub fn positions(&self) -> HashMap<DefaultNodeIdx, (f64, f64)> {
		let mut out = HashMap::new();
		self.graph.visit_nodes(|node| {
			out.insert(node.index(), (node.x() as f64, node.y() as f64));
		});
		out
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// world-space radius, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the previous highlight around while it fades out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in &self.edges {
				if edge.source == idx {
					self.hover.neighbors.insert(edge.target);
				} else if edge.target == idx {
					self.hover.neighbors.insert(edge.source);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

/// Quadratic bezier control point of a link bent by `curvature`.
///
/// Zero curvature is a straight line (the midpoint). Larger values bend the
/// curve further out, proportionally to the link length.
pub fn control_point(start: (f64, f64), end: (f64, f64), curvature: f64) -> (f64, f64) {
	let (dx, dy) = (end.0 - start.0, end.1 - start.1);
	let length = (dx * dx + dy * dy).sqrt();
	let angle = dy.atan2(dx) - PI / 2.0;
	let d = length * curvature;
	(
		(start.0 + end.0) / 2.0 + d * angle.cos(),
		(start.1 + end.1) / 2.0 + d * angle.sin(),
	)
}

/// Center and radius of a self-loop drawn beside the node at `at`.
pub fn loop_circle(at: (f64, f64), curvature: f64, rotation: f64) -> ((f64, f64), f64) {
	let radius = LOOP_RADIUS * curvature.max(0.1);
	let distance = NODE_RADIUS + radius * 0.6;
	(
		(at.0 + distance * rotation.cos(), at.1 + distance * rotation.sin()),
		radius,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::model::tests::{link, node};

	fn model() -> GraphModel {
		let mut m = GraphModel::default();
		m.nodes = vec![node("a", &["x"]), node("b", &["y"]), node("c", &["y"])];
		let mut parallel = link("a", "b", &["p"]);
		parallel.id = "a-b-2".into();
		parallel.curvature = Some(0.5);
		m.links = vec![link("a", "b", &["p"]), parallel, link("c", "c", &["q"])];
		m.nodes[0].color = Some("#ff0000".into());
		m
	}

	#[test]
	fn builds_one_spring_per_pair_and_keeps_every_link() {
		let s = ForceGraphState::new(&model(), 800.0, 600.0);
		assert_eq!(s.edges.len(), 3);
		let mut springs = 0;
		s.graph.visit_edges(|_, _, _| springs += 1);
		assert_eq!(springs, 1);
		assert_eq!(s.positions().len(), 3);
	}

	#[test]
	fn node_colors_come_from_the_model() {
		let s = ForceGraphState::new(&model(), 800.0, 600.0);
		let a = s.index_of("a").unwrap();
		let mut colors = HashMap::new();
		s.graph.visit_nodes(|n| {
			colors.insert(n.index(), n.data.user_data.color.clone());
		});
		assert_eq!(colors[&a], "#ff0000");
		assert_eq!(colors[&s.index_of("b").unwrap()], DEFAULT_COLOR);
	}

	#[test]
	fn hover_highlights_neighbors() {
		let mut s = ForceGraphState::new(&model(), 800.0, 600.0);
		let (a, b, c) = (s.index_of("a").unwrap(), s.index_of("b").unwrap(), s.index_of("c").unwrap());
		s.set_hover(Some(a));
		assert!(s.is_highlighted(b));
		assert!(!s.is_highlighted(c));
		s.set_hover(None);
		assert!(s.has_active_highlight());
		assert!(s.is_hovered(a));
	}

	#[test]
	fn find_selection_ignores_unknown_ids() {
		let mut s = ForceGraphState::new(&model(), 800.0, 600.0);
		s.set_found(["a", "zzz"], ["a-b"]);
		assert_eq!(s.found_nodes.len(), 1);
		assert!(s.has_found());
		s.set_found([], []);
		assert!(!s.has_found());
	}

	#[test]
	fn curve_geometry() {
		assert_eq!(control_point((0.0, 0.0), (10.0, 0.0), 0.0), (5.0, 0.0));
		let (x, y) = control_point((0.0, 0.0), (10.0, 0.0), 0.5);
		assert!((x - 5.0).abs() < 1e-9);
		assert!((y + 5.0).abs() < 1e-9);

		let ((cx, cy), r) = loop_circle((0.0, 0.0), 1.0, 0.0);
		assert_eq!(r, LOOP_RADIUS);
		assert!(cx > 0.0 && cy.abs() < 1e-9);
	}
}
