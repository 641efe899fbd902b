use std::collections::HashMap;
use std::f64::consts::PI;

use crate::graph::message::Message;
use crate::graph::model::pair_key;
use crate::graph::pipeline::Stage;
use crate::graph::settings::FilterSettings;

/// Fans out links sharing the same two nodes and bends self-loops.
pub struct CurvatureStage;

impl Stage for CurvatureStage {
	fn name(&self) -> &'static str {
		"curvature"
	}

	fn apply(&self, message: &mut Message, _: &FilterSettings) {
		let links = &mut message.graph.links;
		let mut groups: HashMap<(String, String), Vec<usize>> = HashMap::new();
		for (i, link) in links.iter().enumerate() {
			groups.entry(pair_key(&link.source, &link.target)).or_default().push(i);
		}

		for members in groups.values() {
			let size = members.len();
			let self_loop = links[members[0]].is_self_loop();
			let concat = if size > 1 {
				members
					.iter()
					.map(|&i| links[i].name.as_str())
					.collect::<Vec<_>>()
					.join("\n")
			} else {
				links[members[0]].name.clone()
			};

			for (index, &i) in members.iter().enumerate() {
				let link = &mut links[i];
				link.concat_name = concat.clone();
				if self_loop {
					link.curvature = Some((index + 1) as f64 / size as f64);
					link.rotation = Some(2.0 * PI * index as f64 / size as f64);
				} else if size > 1 {
					link.curvature = Some(index as f64 / size as f64);
					link.rotation = Some(2.0 * PI * index as f64 / size as f64);
				} else {
					link.curvature = None;
					link.rotation = None;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::model::GraphModel;
	use crate::graph::model::tests::{link, node};

	fn apply(links: Vec<crate::graph::model::RenderLink>) -> GraphModel {
		let mut msg = Message {
			graph: GraphModel {
				nodes: vec![node("a", &["x"]), node("b", &["x"]), node("c", &["x"])],
				links,
				..Default::default()
			},
			..Default::default()
		};
		CurvatureStage.apply(&mut msg, &FilterSettings::default());
		msg.graph
	}

	#[test]
	fn opposite_directions_share_a_group() {
		let g = apply(vec![
			link("a", "b", &["r"]),
			link("b", "a", &["s"]),
			link("b", "c", &["t"]),
		]);
		assert_eq!(g.links[0].curvature, Some(0.0));
		assert_eq!(g.links[1].curvature, Some(0.5));
		assert_eq!(g.links[1].rotation, Some(PI));
		assert_eq!(g.links[0].concat_name, "r\ns");
		assert_eq!(g.links[1].concat_name, "r\ns");

		assert_eq!(g.links[2].curvature, None);
		assert_eq!(g.links[2].concat_name, "t");
	}

	#[test]
	fn self_loops_always_bend() {
		let g = apply(vec![link("c", "c", &["self"])]);
		assert_eq!(g.links[0].curvature, Some(1.0));

		let g = apply(vec![link("a", "a", &["p"]), link("a", "a", &["q"])]);
		assert_eq!(g.links[0].curvature, Some(0.5));
		assert_eq!(g.links[1].curvature, Some(1.0));
		assert_eq!(g.links[1].concat_name, "p\nq");
	}
}
