//! Find tool errors.

use thiserror::Error;

/// Why a find query could not be parsed or evaluated.
///
/// The `Display` text is shown to the user in place of results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FindError {
	/// The query is blank.
	#[error("enter a selector, e.g. nodes{{\"id\": \"a\"}}")]
	Empty,
	/// The query is not valid selector syntax at byte `position`.
	#[error("syntax error at position {position}: {message}")]
	Syntax {
		/// Byte offset into the query.
		position: usize,
		/// What was found there.
		message: String,
	},
	/// The query starts with `->` or `,`.
	#[error("the query cannot start with `{0}`")]
	LeadingTransition(String),
	/// The query ends with `->` or `,`.
	#[error("`{0}` must be followed by a selector")]
	DanglingTransition(String),
	/// Two selectors follow each other directly.
	#[error("selectors must be separated by `->` or `,`")]
	MissingTransition,
	/// Neither one nor three selectors.
	#[error("{0} selectors given; use one selector or a nodes -> links -> nodes chain")]
	UnsupportedLength(usize),
	/// A three-selector chain that is not nodes, links, nodes.
	#[error("a three-selector chain must have the shape nodes -> links -> nodes")]
	ChainShape,
	/// A key has a `:flag` suffix no matcher knows.
	#[error("unknown flag `{flag}` on attribute `{attribute}`")]
	UnknownFlag {
		/// Attribute the flag was attached to.
		attribute: String,
		/// The unrecognized flag.
		flag: String,
	},
	/// A `func` expression does not parse.
	#[error("invalid func expression for `{attribute}`: {message}")]
	InvalidFunc {
		/// Attribute the expression was attached to.
		attribute: String,
		/// Parse error of the expression.
		message: String,
	},
	/// An endpoint variable used outside the middle selector.
	#[error("`{0}` is only available in the middle selector of a three-selector chain")]
	MisplacedVariable(&'static str),
}
