//! The find tool: a small selector language over the rendered graph.
//!
//! ```text
//! nodes{"type:includes": "gene"} -> links{"weight:>=": 0.5} -> nodes{"name:regex": "^BRCA"}
//! ```

pub mod error;
pub mod evaluator;
pub mod expr;
pub mod matcher;
pub mod parser;

use log::debug;

pub use error::FindError;
pub use evaluator::{Matches, evaluate};
pub use matcher::{Flag, Matcher};
pub use parser::{Predicate, Selector, SelectorChain, SelectorKind, Transition, parse};

use crate::graph::Message;

/// Parses and runs `text` against the current graph of `message`.
///
/// Errors come back as display text, ready to show in place of results.
pub fn search<'m>(message: &'m Message, text: &str) -> Result<Matches<'m>, String> {
	let chain = parse(text).map_err(|e| e.to_string())?;
	let matches = evaluate(message, &chain).map_err(|e| e.to_string())?;
	debug!(
		"find `{text}`: {} nodes, {} links",
		matches.nodes.len(),
		matches.links.len()
	);
	Ok(matches)
}
