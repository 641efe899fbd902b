//! Runs a parsed query against the render graph.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::error::FindError;
use super::matcher::{Flag, Matcher};
use super::parser::{Predicate, Selector, SelectorChain};
use crate::graph::{Message, RenderLink, RenderNode};

const SOURCE_NODES: &str = "__sourceNodes__";
const TARGET_NODES: &str = "__targetNodes__";
const ELEMENT: &str = "__element__";
const NODES: &str = "__nodes__";
const LINKS: &str = "__links__";

/// Regex that matches nothing, used for empty id alternations.
const NOTHING: &str = r"[^\s\S]";

/// Elements selected by a query, in graph order.
#[derive(Debug, Default, PartialEq)]
pub struct Matches<'g> {
	/// Matched nodes.
	pub nodes: Vec<&'g RenderNode>,
	/// Matched links.
	pub links: Vec<&'g RenderLink>,
}

impl Matches<'_> {
	/// True when nothing matched.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty() && self.links.is_empty()
	}

	/// Ids of the matched nodes.
	pub fn node_ids(&self) -> HashSet<String> {
		self.nodes.iter().map(|n| n.id.clone()).collect()
	}
}

/// Values substituted for magic variables.
struct Bindings {
	nodes: String,
	links: String,
	source_nodes: Option<String>,
	target_nodes: Option<String>,
}

impl Bindings {
	fn substitute(&self, v: &Value, element: Option<&str>) -> Result<Value, FindError> {
		Ok(match v {
			Value::String(s) => Value::String(self.substitute_str(s, element)?),
			Value::Array(items) => Value::Array(
				items
					.iter()
					.map(|i| self.substitute(i, element))
					.collect::<Result<_, _>>()?,
			),
			Value::Object(map) => Value::Object(
				map.iter()
					.map(|(k, v)| Ok((k.clone(), self.substitute(v, element)?)))
					.collect::<Result<_, FindError>>()?,
			),
			other => other.clone(),
		})
	}

	fn substitute_str(&self, s: &str, element: Option<&str>) -> Result<String, FindError> {
		let mut out = s.replace(NODES, &self.nodes).replace(LINKS, &self.links);
		for (name, binding) in [
			(SOURCE_NODES, &self.source_nodes),
			(TARGET_NODES, &self.target_nodes),
		] {
			if out.contains(name) {
				let alternation = binding.as_deref().ok_or(FindError::MisplacedVariable(name))?;
				out = out.replace(name, alternation);
			}
		}
		if let Some(id) = element {
			out = out.replace(ELEMENT, id);
		}
		Ok(out)
	}
}

fn mentions_element(v: &Value) -> bool {
	match v {
		Value::String(s) => s.contains(ELEMENT),
		Value::Array(items) => items.iter().any(mentions_element),
		Value::Object(map) => map.values().any(mentions_element),
		_ => false,
	}
}

fn alternation<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
	let escaped: Vec<String> = ids.into_iter().map(regex::escape).collect();
	if escaped.is_empty() {
		NOTHING.to_string()
	} else {
		escaped.join("|")
	}
}

/// A predicate ready to run: either compiled once, or per element when the
/// expected value mentions `__element__`.
enum Prepared<'p> {
	Fixed(&'p str, Matcher),
	PerElement(&'p Predicate),
}

fn prepare<'p>(predicates: &'p [Predicate], bindings: &Bindings) -> Result<Vec<Prepared<'p>>, FindError> {
	predicates
		.iter()
		.map(|p| {
			if mentions_element(&p.expected) {
				// surface misplaced variables before looking at any element
				bindings.substitute(&p.expected, None)?;
				return Ok(Prepared::PerElement(p));
			}
			let matcher = Matcher::new(p.flag, bindings.substitute(&p.expected, None)?);
			if let Some(message) = matcher.func_error() {
				return Err(FindError::InvalidFunc {
					attribute: p.attribute.clone(),
					message: message.to_string(),
				});
			}
			Ok(Prepared::Fixed(&p.attribute, matcher))
		})
		.collect()
}

fn matches_all(prepared: &[Prepared<'_>], id: &str, view: &Value, bindings: &Bindings) -> bool {
	prepared.iter().all(|p| match p {
		Prepared::Fixed(attribute, matcher) => matcher.test(lookup(view, attribute), view),
		Prepared::PerElement(pred) => {
			let id = if pred.flag == Flag::Regex {
				regex::escape(id)
			} else {
				id.to_string()
			};
			match bindings.substitute(&pred.expected, Some(&id)) {
				Ok(expected) => Matcher::new(pred.flag, expected).test(lookup(view, &pred.attribute), view),
				Err(_) => false,
			}
		}
	})
}

/// Finds `key` literally first, then as a dotted path (`origin.x`, `type.0`).
pub fn lookup<'v>(view: &'v Value, key: &str) -> Option<&'v Value> {
	if let Some(v) = view.get(key) {
		return Some(v);
	}
	let mut current = view;
	for segment in key.split('.') {
		current = match current {
			Value::Object(map) => map.get(segment)?,
			Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
			_ => return None,
		};
	}
	Some(current)
}

/// Attributes of a node as the find tool sees them: the backend node with
/// the render fields on top.
pub fn node_view(message: &Message, node: &RenderNode) -> Value {
	let origin = message
		.origin_node(node.origin)
		.and_then(|o| serde_json::to_value(o).ok())
		.unwrap_or(Value::Null);
	let mut map = match &origin {
		Value::Object(m) => m.clone(),
		_ => Map::new(),
	};
	map.insert("id".into(), node.id.clone().into());
	map.insert("type".into(), node.types.clone().into());
	map.insert("name".into(), node.name.clone().into());
	map.insert("color".into(), node.color.clone().into());
	map.insert("origin".into(), origin);
	Value::Object(map)
}

/// Attributes of a link as the find tool sees them.
pub fn link_view(message: &Message, link: &RenderLink) -> Value {
	let origin = message
		.origin_edge(link.origin)
		.and_then(|o| serde_json::to_value(o).ok())
		.unwrap_or(Value::Null);
	let mut map = match &origin {
		Value::Object(m) => m.clone(),
		_ => Map::new(),
	};
	map.insert("id".into(), link.id.clone().into());
	map.insert("source".into(), link.source.clone().into());
	map.insert("target".into(), link.target.clone().into());
	map.insert("source_id".into(), link.source.clone().into());
	map.insert("target_id".into(), link.target.clone().into());
	map.insert("type".into(), link.types.clone().into());
	map.insert("weight".into(), link.weight.into());
	map.insert("name".into(), link.name.clone().into());
	map.insert("color".into(), link.color.clone().into());
	map.insert("concatName".into(), link.concat_name.clone().into());
	map.insert("curvature".into(), link.curvature.into());
	map.insert("rotation".into(), link.rotation.into());
	map.insert("origin".into(), origin);
	Value::Object(map)
}

fn select_nodes<'m>(
	message: &'m Message,
	selector: &Selector,
	bindings: &Bindings,
) -> Result<Vec<&'m RenderNode>, FindError> {
	let prepared = prepare(&selector.predicates, bindings)?;
	Ok(message
		.graph
		.nodes
		.iter()
		.filter(|n| prepared.is_empty() || matches_all(&prepared, &n.id, &node_view(message, n), bindings))
		.collect())
}

fn select_links<'m>(
	message: &'m Message,
	selector: &Selector,
	bindings: &Bindings,
) -> Result<Vec<&'m RenderLink>, FindError> {
	let prepared = prepare(&selector.predicates, bindings)?;
	Ok(message
		.graph
		.links
		.iter()
		.filter(|l| prepared.is_empty() || matches_all(&prepared, &l.id, &link_view(message, l), bindings))
		.collect())
}

/// Runs a parsed query against the graph of `message`.
///
/// A single selector returns the matching elements of its kind. A
/// `nodes -> links -> nodes` chain returns the links joining the two node
/// sets (in either direction) together with their end nodes.
pub fn evaluate<'m>(message: &'m Message, chain: &SelectorChain) -> Result<Matches<'m>, FindError> {
	let graph = &message.graph;
	let mut bindings = Bindings {
		nodes: alternation(graph.nodes.iter().map(|n| n.id.as_str())),
		links: alternation(graph.links.iter().map(|l| l.id.as_str())),
		source_nodes: None,
		target_nodes: None,
	};

	match chain.selectors.as_slice() {
		[selector] => {
			let mut matches = Matches::default();
			if selector.kind.selects_nodes() {
				matches.nodes = select_nodes(message, selector, &bindings)?;
			}
			if selector.kind.selects_links() {
				matches.links = select_links(message, selector, &bindings)?;
			}
			Ok(matches)
		}
		[from, via, to] => {
			let sources = select_nodes(message, from, &bindings)?;
			let targets = select_nodes(message, to, &bindings)?;
			bindings.source_nodes = Some(alternation(sources.iter().map(|n| n.id.as_str())));
			bindings.target_nodes = Some(alternation(targets.iter().map(|n| n.id.as_str())));

			let a: HashSet<&str> = sources.iter().map(|n| n.id.as_str()).collect();
			let c: HashSet<&str> = targets.iter().map(|n| n.id.as_str()).collect();
			let links: Vec<&RenderLink> = select_links(message, via, &bindings)?
				.into_iter()
				.filter(|l| {
					let (s, t) = (l.source.as_str(), l.target.as_str());
					(a.contains(s) && c.contains(t)) || (c.contains(s) && a.contains(t))
				})
				.collect();

			let ends: HashSet<&str> = links
				.iter()
				.flat_map(|l| [l.source.as_str(), l.target.as_str()])
				.collect();
			let nodes = graph.nodes.iter().filter(|n| ends.contains(n.id.as_str())).collect();
			Ok(Matches { nodes, links })
		}
		other => Err(FindError::UnsupportedLength(other.len())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::find::parse;
	use crate::graph::{FilterSettings, Pipeline};

	fn message() -> Message {
		let mut msg = Message::from_json(
			r#"{"knowledge_graph": {
				"nodes": [
					{"id": "a", "type": "x", "name": "Alpha", "score": 3},
					{"id": "b", "type": "y", "name": "Beta"},
					{"id": "c", "type": "y", "name": "Gamma", "score": 7},
					{"id": "d", "type": "z", "name": "Delta"}
				],
				"edges": [
					{"id": "e1", "source_id": "a", "target_id": "b", "type": "treats", "weight": 0.9},
					{"id": "e2", "source_id": "c", "target_id": "a", "type": "causes", "weight": 0.2},
					{"id": "e3", "source_id": "b", "target_id": "d", "type": "treats"}
				]
			}}"#,
		)
		.unwrap();
		Pipeline::query().run(&mut msg, &FilterSettings::default()).unwrap();
		msg
	}

	fn ids(m: &Matches) -> (Vec<String>, Vec<String>) {
		(
			m.nodes.iter().map(|n| n.id.clone()).collect(),
			m.links.iter().map(|l| l.id.clone()).collect(),
		)
	}

	fn find(msg: &Message, q: &str) -> (Vec<String>, Vec<String>) {
		ids(&evaluate(msg, &parse(q).unwrap()).unwrap())
	}

	#[test]
	fn single_selectors() {
		let msg = message();
		assert_eq!(find(&msg, r#"nodes{"id": "a"}"#).0, vec!["a"]);
		assert_eq!(find(&msg, r#"nodes{"score:>": 2}"#).0, vec!["a", "c"]);
		assert_eq!(find(&msg, r#"nodes{"name:regex": "^(Alpha|Delta)$"}"#).0, vec!["a", "d"]);
		assert_eq!(find(&msg, r#"links{"type:includes": "treats"}"#).1, vec!["e1", "e3"]);
		assert_eq!(find(&msg, r#"links{"weight:<": 0.5}"#).1, vec!["e2"]);
		let all = find(&msg, "*");
		assert_eq!((all.0.len(), all.1.len()), (4, 3));
		assert!(find(&msg, "nodes").1.is_empty());
	}

	#[test]
	fn dotted_paths_reach_backend_attributes() {
		let msg = message();
		assert_eq!(find(&msg, r#"nodes{"origin.type": "y"}"#).0, vec!["b", "c"]);
		assert_eq!(find(&msg, r#"nodes{"type.0": "z"}"#).0, vec!["d"]);
	}

	#[test]
	fn node_pairs_in_either_direction() {
		let msg = message();
		let (nodes, links) = find(
			&msg,
			r#"nodes{"type:includes":"x"} -> links{} -> nodes{"type:includes":"y"}"#,
		);
		assert_eq!(nodes, vec!["a", "b", "c"]);
		assert_eq!(links, vec!["e1", "e2"]);

		let (nodes, links) = find(
			&msg,
			r#"nodes{"id":"a"} -> links{"type:includes":"causes"} -> *"#,
		);
		assert_eq!(nodes, vec!["a", "c"]);
		assert_eq!(links, vec!["e2"]);
	}

	#[test]
	fn endpoint_variables_bind_in_the_middle_selector() {
		let msg = message();
		let (nodes, links) = find(
			&msg,
			r#"nodes{"id":"a"} -> links{"source:regex": "^(__sourceNodes__)$"} -> nodes{"type:includes":"y"}"#,
		);
		assert_eq!(links, vec!["e1"]);
		assert_eq!(nodes, vec!["a", "b"]);

		assert_eq!(
			evaluate(&msg, &parse(r#"links{"source:regex": "__sourceNodes__"}"#).unwrap()),
			Err(FindError::MisplacedVariable("__sourceNodes__"))
		);
	}

	#[test]
	fn graph_wide_and_element_variables() {
		let msg = message();
		assert_eq!(find(&msg, r#"nodes{"id:regex": "^(__nodes__)$"}"#).0.len(), 4);
		assert_eq!(find(&msg, r#"links{"id:regex": "^(__links__)$"}"#).1.len(), 3);
		assert_eq!(find(&msg, r#"nodes{"id:regex": "^__element__$"}"#).0.len(), 4);
		assert_eq!(find(&msg, r#"links{"concatName:!=": "__element__"}"#).1.len(), 3);
		assert_eq!(find(&msg, r#"nodes{"id": "__element__"}"#).0.len(), 4);
		assert_eq!(
			find(&msg, r#"nodes{"name:func": "element.id == 'c' || value == 'Beta'"}"#).0,
			vec!["b", "c"]
		);
	}

	#[test]
	fn bad_func_is_reported() {
		let msg = message();
		let err = evaluate(&msg, &parse(r#"nodes{"name:func": "value =="}"#).unwrap()).unwrap_err();
		assert!(matches!(err, FindError::InvalidFunc { ref attribute, .. } if attribute == "name"));
	}

	#[test]
	fn empty_end_set_matches_no_links() {
		let msg = message();
		let (nodes, links) = find(
			&msg,
			r#"nodes{"id":"nope"} -> links{"source:regex": "__sourceNodes__"} -> nodes"#,
		);
		assert!(nodes.is_empty() && links.is_empty());
	}

	#[test]
	fn evaluation_does_not_touch_the_graph() {
		let msg = message();
		let before = msg.graph.clone();
		let _ = find(&msg, "*");
		assert_eq!(msg.graph, before);
	}

	#[test]
	fn target_variable_restricts_the_middle_links() {
		let msg = message();
		let (nodes, links) = find(
			&msg,
			r#"nodes{"type:includes":"x"} -> links{"target:regex": "^(__targetNodes__)$"} -> nodes{"type:includes":"y"}"#,
		);
		// e2 joins the two sets too, but its target is `a`
		assert_eq!(links, vec!["e1"]);
		assert_eq!(nodes, vec!["a", "b"]);

		assert_eq!(
			evaluate(&msg, &parse(r#"nodes{"id:regex": "__targetNodes__"}"#).unwrap()),
			Err(FindError::MisplacedVariable("__targetNodes__"))
		);
	}

	#[test]
	fn comma_transitions_behave_like_arrows() {
		let msg = message();
		let arrows = r#"nodes{"type:includes":"x"} -> links{"weight:>=": 0.1, "source:regex": "^(__sourceNodes__|__targetNodes__)$"} -> nodes{"type:includes":"y"}"#;
		let expected = (vec!["a".to_string(), "b".into(), "c".into()], vec!["e1".to_string(), "e2".into()]);
		assert_eq!(find(&msg, arrows), expected);
		assert_eq!(find(&msg, &arrows.replace("->", ",")), expected);
		assert_eq!(find(&msg, &arrows.replacen("->", ",", 1)), expected);

		let narrowed = r#"nodes{"type:includes":"x"}, links{"weight:>": 0.5}, nodes{"type:includes":"y"}"#;
		assert_eq!(find(&msg, narrowed), (vec!["a".into(), "b".into()], vec!["e1".into()]));
	}

	#[test]
	fn element_variable_under_other_flags() {
		let msg = message();
		// only "Alpha" contains its own id
		assert_eq!(find(&msg, r#"nodes{"name:includes": "__element__"}"#).0, vec!["a"]);
		assert_eq!(
			find(&msg, r#"nodes{"name:func": "starts_with(lower(value), '__element__')"}"#).0,
			vec!["a", "b", "d"]
		);
		assert_eq!(find(&msg, r#"links{"id:endsWith": "__element__"}"#).1.len(), 3);

		// substituted verbatim outside the regex flag
		let mut odd = Message::from_json(
			r#"{"knowledge_graph": {"nodes": [{"id": "n(1", "type": "x"}, {"id": "n.1", "type": "x"}], "edges": []}}"#,
		)
		.unwrap();
		Pipeline::query().run(&mut odd, &FilterSettings::default()).unwrap();
		assert_eq!(find(&odd, r#"nodes{"id:startsWith": "__element__"}"#).0, vec!["n(1", "n.1"]);
		assert_eq!(find(&odd, r#"nodes{"id:regex": "^__element__$"}"#).0, vec!["n(1", "n.1"]);
	}
}
