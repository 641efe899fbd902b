use std::collections::HashSet;

use kg_query_canvas::graph::{DataSource, FilterSettings, Message, Pipeline};
use proptest::prelude::*;
use serde_json::{Value, json};

const TYPES: [&str; 4] = ["gene", "disease", "chemical", "pathway"];

/// Up to 12 nodes and 30 edges. Endpoints may point past the node list, and
/// types may be missing, so the init stage has something to drop.
fn arb_message() -> impl Strategy<Value = Value> {
	let node = prop::option::weighted(0.9, prop::sample::subsequence(TYPES.to_vec(), 1..=2));
	let edge = (
		0usize..14,
		0usize..14,
		prop::option::weighted(0.9, prop::sample::select(TYPES.to_vec())),
		prop::option::of(0.0f64..=1.0),
		prop::option::of(prop::sample::select(vec!["a", "b", "c"])),
	);
	(
		prop::collection::vec(node, 1..12),
		prop::collection::vec(edge, 0..30),
	)
		.prop_map(|(nodes, edges)| {
			let nodes: Vec<Value> = nodes
				.into_iter()
				.enumerate()
				.map(|(i, types)| match types {
					Some(types) => json!({"id": format!("n{i}"), "type": types}),
					None => json!({"id": format!("n{i}")}),
				})
				.collect();
			let edges: Vec<Value> = edges
				.into_iter()
				.map(|(s, t, kind, weight, db)| {
					json!({
						"source_id": format!("n{s}"),
						"target_id": format!("n{t}"),
						"type": kind,
						"weight": weight,
						"source_database": db,
					})
				})
				.collect();
			json!({"knowledge_graph": {"nodes": nodes, "edges": edges}})
		})
}

fn arb_settings() -> impl Strategy<Value = FilterSettings> {
	(0.0f64..=100.0, 0.0f64..=100.0, 0usize..4, 1usize..8, any::<bool>()).prop_map(
		|(lo, hi, dlo, dspan, uncheck_a)| {
			let mut settings = FilterSettings {
				link_weight_range: (lo.min(hi), lo.max(hi)),
				node_degree_range: (dlo, dlo + dspan),
				..FilterSettings::default()
			};
			if uncheck_a {
				settings.data_sources = vec![DataSource {
					label: "a".into(),
					checked: false,
				}];
			}
			settings
		},
	)
}

proptest! {
	#[test]
	fn pipeline_output_is_consistent(raw in arb_message(), settings in arb_settings()) {
		let mut msg = Message::from_json(&raw.to_string()).unwrap();
		let graph = Pipeline::query().run(&mut msg, &settings).unwrap().clone();

		let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
		prop_assert_eq!(ids.len(), graph.nodes.len());
		for node in &graph.nodes {
			prop_assert!(!node.types.is_empty());
			prop_assert!(node.color.is_some());
		}
		for link in &graph.links {
			prop_assert!(ids.contains(link.source.as_str()));
			prop_assert!(ids.contains(link.target.as_str()));
			prop_assert!(!link.types.is_empty());
			if let Some(w) = link.weight {
				let (lo, hi) = settings.link_weight_range;
				let scaled = (w * 100.0).round();
				prop_assert!(scaled >= lo && scaled <= hi);
			}
			let c = link.curvature.unwrap_or(0.0);
			prop_assert!((0.0..=1.0).contains(&c));
		}

		// a second run over the same message yields the same graph
		let again = Pipeline::query().run(&mut msg, &settings).unwrap();
		prop_assert_eq!(&graph, again);
	}

	#[test]
	fn legend_toggles_are_reversible(
		raw in arb_message(),
		settings in arb_settings(),
		hidden_nodes in prop::sample::subsequence(TYPES.to_vec(), 0..=2),
		hidden_links in prop::sample::subsequence(TYPES.to_vec(), 0..=2),
	) {
		let pipeline = Pipeline::query();
		let mut plain = Message::from_json(&raw.to_string()).unwrap();
		let shown = pipeline.run(&mut plain, &settings).unwrap().clone();

		let mut msg = Message::from_json(&raw.to_string()).unwrap();
		for t in &hidden_nodes {
			msg.graph.hidden_types.toggle_node_type(t);
		}
		for t in &hidden_links {
			msg.graph.hidden_types.toggle_link_type(t);
		}
		let hidden = pipeline.run(&mut msg, &settings).unwrap().clone();
		// legend counts ignore what is hidden
		prop_assert_eq!(hidden.type_mappings.nodes.len(), shown.type_mappings.nodes.len());
		for (h, s) in hidden.type_mappings.nodes.iter().zip(shown.type_mappings.nodes.iter()) {
			prop_assert_eq!((&h.name, h.quantity, &h.color), (&s.name, s.quantity, &s.color));
		}

		let again = pipeline.run_from("type-color", &mut msg, &settings).unwrap();
		prop_assert_eq!(&hidden, again);

		for t in &hidden_nodes {
			msg.graph.hidden_types.toggle_node_type(t);
		}
		for t in &hidden_links {
			msg.graph.hidden_types.toggle_link_type(t);
		}
		let restored = pipeline.run_from("type-color", &mut msg, &settings).unwrap();
		prop_assert_eq!(&shown, restored);
	}

	#[test]
	fn schema_pipeline_ignores_weight_and_sources(raw in arb_message(), settings in arb_settings()) {
		let mut filtered = Message::from_json(&raw.to_string()).unwrap();
		let mut open = filtered.clone();
		let schema = Pipeline::schema();
		let a = schema.run(&mut filtered, &settings).unwrap().links.len();
		let relaxed = FilterSettings {
			node_degree_range: settings.node_degree_range,
			..FilterSettings::default()
		};
		let b = schema.run(&mut open, &relaxed).unwrap().links.len();
		prop_assert_eq!(a, b);
	}
}
