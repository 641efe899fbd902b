//! Parser for find queries.
//!
//! ```text
//! query      = selector (transition selector)*
//! selector   = ("nodes" | "links" | "*") dictionary?
//! transition = "->" | ","
//! dictionary = "{" (key ":" value ("," key ":" value)* ","?)? "}"
//! key        = string | bare-identifier
//! ```
//!
//! Dictionaries are JSON with a few liberties: bare keys, single quoted
//! strings and trailing commas. A key may end in `:flag` to pick the
//! comparison, e.g. `"weight:>=": 0.5`; write `\:` for a literal colon.

use nom::{
	branch::alt,
	bytes::complete::{tag, take_while},
	character::complete::{char, multispace0, satisfy},
	combinator::{map, map_opt, opt, recognize, value},
	error::{Error, ErrorKind},
	multi::separated_list0,
	number::complete::recognize_float,
	sequence::{delimited, pair, preceded, separated_pair, terminated},
	IResult,
};
use serde_json::{Number, Value};

use super::error::FindError;
use super::matcher::Flag;

/// Which elements a selector looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorKind {
	/// `nodes`
	Nodes,
	/// `links`
	Links,
	/// `*`: nodes and links.
	Any,
}

impl SelectorKind {
	/// True for `nodes` and `*`.
	pub fn selects_nodes(self) -> bool {
		matches!(self, SelectorKind::Nodes | SelectorKind::Any)
	}

	/// True for `links` and `*`.
	pub fn selects_links(self) -> bool {
		matches!(self, SelectorKind::Links | SelectorKind::Any)
	}
}

/// Separator between selectors. Both spellings mean the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
	/// `->`
	Arrow,
	/// `,`
	Comma,
}

impl Transition {
	fn token(self) -> &'static str {
		match self {
			Transition::Arrow => "->",
			Transition::Comma => ",",
		}
	}
}

/// One `key:flag = expected` entry of a selector dictionary.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
	/// Attribute name or dotted path, with `\:` unescaped.
	pub attribute: String,
	/// How the attribute is compared.
	pub flag: Flag,
	/// Value from the dictionary, before variable substitution.
	pub expected: Value,
}

/// `nodes`, `links` or `*` with its predicates.
#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
	/// Which elements the selector looks at.
	pub kind: SelectorKind,
	/// All must hold for an element to match.
	pub predicates: Vec<Predicate>,
}

/// A parsed query: one selector, or three joined by transitions.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectorChain {
	/// One or three selectors.
	pub selectors: Vec<Selector>,
	/// One fewer than the selectors.
	pub transitions: Vec<Transition>,
}

impl SelectorChain {
	/// True for `nodes -> links -> nodes` pair queries.
	pub fn is_transitional(&self) -> bool {
		self.selectors.len() == 3
	}
}

enum Token {
	Selector(SelectorKind, Vec<(String, Value)>),
	Transition(Transition),
}

/// Parses a find query.
pub fn parse(text: &str) -> Result<SelectorChain, FindError> {
	if let Some(position) = nesting_overflow(text, &[]) {
		return Err(FindError::Syntax {
			position,
			message: format!("nested deeper than {MAX_NESTING} levels"),
		});
	}
	let mut input = text;
	let mut tokens = Vec::new();
	loop {
		let rest = input.trim_start();
		if rest.is_empty() {
			break;
		}
		let parsed = alt((
			map(transition, Token::Transition),
			map(selector, |(kind, dict)| Token::Selector(kind, dict)),
		))(rest);
		match parsed {
			Ok((rest, token)) => {
				tokens.push(token);
				input = rest;
			}
			Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
				return Err(syntax_error(text, e.input));
			}
			Err(nom::Err::Incomplete(_)) => return Err(syntax_error(text, "")),
		}
	}

	let mut chain = SelectorChain {
		selectors: Vec::new(),
		transitions: Vec::new(),
	};
	let mut expect_selector = true;
	for token in tokens {
		match (token, expect_selector) {
			(Token::Selector(kind, dict), true) => {
				chain.selectors.push(Selector {
					kind,
					predicates: predicates(dict)?,
				});
				expect_selector = false;
			}
			(Token::Selector(..), false) => return Err(FindError::MissingTransition),
			(Token::Transition(t), false) => {
				chain.transitions.push(t);
				expect_selector = true;
			}
			(Token::Transition(t), true) if chain.selectors.is_empty() => {
				return Err(FindError::LeadingTransition(t.token().into()));
			}
			(Token::Transition(t), true) => {
				return Err(FindError::DanglingTransition(
					chain.transitions.last().copied().unwrap_or(t).token().into(),
				));
			}
		}
	}

	if chain.selectors.is_empty() {
		return Err(FindError::Empty);
	}
	if let (true, Some(t)) = (expect_selector, chain.transitions.last()) {
		return Err(FindError::DanglingTransition(t.token().into()));
	}
	match chain.selectors.len() {
		1 => {}
		3 => {
			let s = &chain.selectors;
			if s[0].kind == SelectorKind::Links
				|| s[2].kind == SelectorKind::Links
				|| s[1].kind == SelectorKind::Nodes
			{
				return Err(FindError::ChainShape);
			}
		}
		n => return Err(FindError::UnsupportedLength(n)),
	}
	Ok(chain)
}

/// Deepest bracket nesting the recursive parsers accept.
pub(crate) const MAX_NESTING: usize = 128;

/// Byte offset of the first character that takes `text` past
/// [`MAX_NESTING`], or `None` if it stays within it.
///
/// Counts `{`, `[` and `(` outside quoted strings. Each char in `prefix`
/// adds a level until the next character that is neither whitespace, an
/// opening bracket nor another prefix.
pub(crate) fn nesting_overflow(text: &str, prefix: &[char]) -> Option<usize> {
	let (mut depth, mut run) = (0usize, 0usize);
	let mut quote = None;
	let mut escaped = false;
	for (i, c) in text.char_indices() {
		if let Some(q) = quote {
			if escaped {
				escaped = false;
			} else if c == '\\' {
				escaped = true;
			} else if c == q {
				quote = None;
			}
			continue;
		}
		match c {
			'{' | '[' | '(' => depth += 1,
			'}' | ']' | ')' => {
				depth = depth.saturating_sub(1);
				run = 0;
			}
			'"' | '\'' => {
				quote = Some(c);
				run = 0;
			}
			c if prefix.contains(&c) => run += 1,
			c if c.is_whitespace() => {}
			_ => run = 0,
		}
		if depth + run > MAX_NESTING {
			return Some(i);
		}
	}
	None
}

fn syntax_error(text: &str, rest: &str) -> FindError {
	let position = text.len() - rest.len();
	let message = match rest.chars().next() {
		Some(c) => format!("unexpected `{c}`"),
		None => "unexpected end of query".into(),
	};
	FindError::Syntax { position, message }
}

/// Splits `attribute:flag` keys and resolves the flag.
fn predicates(dict: Vec<(String, Value)>) -> Result<Vec<Predicate>, FindError> {
	dict.into_iter()
		.map(|(key, expected)| {
			let (attribute, flag) = split_flag(&key);
			let flag = match flag {
				None => Flag::DeepEq,
				Some(f) => Flag::parse(&f).ok_or_else(|| FindError::UnknownFlag {
					attribute: attribute.clone(),
					flag: f,
				})?,
			};
			Ok(Predicate {
				attribute,
				flag,
				expected,
			})
		})
		.collect()
}

/// Splits at the last colon not preceded by a backslash.
pub(crate) fn split_flag(key: &str) -> (String, Option<String>) {
	let chars: Vec<char> = key.chars().collect();
	let split = (0..chars.len())
		.rev()
		.find(|&i| chars[i] == ':' && (i == 0 || chars[i - 1] != '\\'));
	let unescape = |s: &[char]| s.iter().collect::<String>().replace("\\:", ":");
	match split {
		Some(i) => (
			unescape(&chars[..i]),
			Some(chars[i + 1..].iter().collect()),
		),
		None => (unescape(&chars), None),
	}
}

fn transition(input: &str) -> IResult<&str, Transition> {
	alt((
		value(Transition::Arrow, tag("->")),
		value(Transition::Comma, char(',')),
	))(input)
}

fn selector(input: &str) -> IResult<&str, (SelectorKind, Vec<(String, Value)>)> {
	let (input, kind) = alt((
		value(SelectorKind::Nodes, tag("nodes")),
		value(SelectorKind::Links, tag("links")),
		value(SelectorKind::Any, char('*')),
	))(input)?;
	let (input, dict) = opt(preceded(multispace0, object))(input)?;
	Ok((input, (kind, dict.unwrap_or_default())))
}

/// Wraps a parser in optional surrounding whitespace.
pub(crate) fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
	F: FnMut(&'a str) -> IResult<&'a str, O>,
{
	delimited(multispace0, inner, multispace0)
}

/// `{...}` as ordered key/value pairs.
fn object(input: &str) -> IResult<&str, Vec<(String, Value)>> {
	delimited(
		pair(char('{'), multispace0),
		terminated(
			separated_list0(ws(char(',')), separated_pair(key, ws(char(':')), json_value)),
			opt(ws(char(','))),
		),
		pair(multispace0, char('}')),
	)(input)
}

fn array(input: &str) -> IResult<&str, Vec<Value>> {
	delimited(
		pair(char('['), multispace0),
		terminated(
			separated_list0(ws(char(',')), json_value),
			opt(ws(char(','))),
		),
		pair(multispace0, char(']')),
	)(input)
}

fn key(input: &str) -> IResult<&str, String> {
	alt((string_literal, map(identifier, String::from)))(input)
}

pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
	recognize(pair(
		satisfy(|c| c.is_alphabetic() || c == '_' || c == '$'),
		take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
	))(input)
}

/// Permissive JSON value.
pub(crate) fn json_value(input: &str) -> IResult<&str, Value> {
	alt((
		map(object, |entries| Value::Object(entries.into_iter().collect())),
		map(array, Value::Array),
		map(string_literal, Value::String),
		number,
		value(Value::Bool(true), tag("true")),
		value(Value::Bool(false), tag("false")),
		value(Value::Null, tag("null")),
	))(input)
}

pub(crate) fn number(input: &str) -> IResult<&str, Value> {
	map_opt(recognize_float, |s: &str| {
		if s.contains(['.', 'e', 'E']) {
			s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
		} else {
			s.parse::<i64>()
				.ok()
				.map(|n| Value::Number(n.into()))
				.or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number))
		}
	})(input)
}

/// Single or double quoted string. Unknown escapes are kept verbatim so
/// regexes and `\:` survive.
pub(crate) fn string_literal(input: &str) -> IResult<&str, String> {
	let fail = || nom::Err::Error(Error::new(input, ErrorKind::Char));
	let mut chars = input.char_indices();
	let quote = match chars.next() {
		Some((_, q @ ('"' | '\''))) => q,
		_ => return Err(fail()),
	};
	let mut out = String::new();
	while let Some((i, c)) = chars.next() {
		if c == quote {
			return Ok((&input[i + c.len_utf8()..], out));
		}
		if c != '\\' {
			out.push(c);
			continue;
		}
		let Some((_, e)) = chars.next() else {
			return Err(fail());
		};
		match e {
			'n' => out.push('\n'),
			't' => out.push('\t'),
			'r' => out.push('\r'),
			'b' => out.push('\u{8}'),
			'f' => out.push('\u{c}'),
			'"' | '\'' | '\\' | '/' => out.push(e),
			'u' => {
				let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
				let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
				match decoded {
					Some(d) if hex.len() == 4 => out.push(d),
					_ => return Err(fail()),
				}
			}
			other => {
				out.push('\\');
				out.push(other);
			}
		}
	}
	Err(fail())
}
