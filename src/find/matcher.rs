//! Attribute predicates.
//!
//! A [`Matcher`] compares one attribute of an element against the expected
//! value of a selector entry. Matching never fails: a type mismatch, a bad
//! regex or an expression that cannot be evaluated is simply no match.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use super::expr::Expr;

/// Comparison selected by the `:flag` suffix of a selector key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
	/// No flag: structural equality.
	DeepEq,
	/// `regex`: the expected value is a pattern searched in the text.
	Regex,
	/// Sandboxed predicate expression, see [`Expr`].
	Func,
	/// `<`
	Lt,
	/// `>`
	Gt,
	/// `<=`
	Le,
	/// `>=`
	Ge,
	/// `==`, coercing numbers and numeric strings.
	LooseEq,
	/// `===`
	StrictEq,
	/// `!=`
	LooseNe,
	/// `!==`
	StrictNe,
	/// `includes`: array membership or substring.
	Includes,
	/// `startsWith`
	StartsWith,
	/// `endsWith`
	EndsWith,
}

impl Flag {
	/// Flag for a key suffix; `None` for unknown ones.
	pub fn parse(flag: &str) -> Option<Flag> {
		Some(match flag {
			"regex" => Flag::Regex,
			"func" => Flag::Func,
			"<" => Flag::Lt,
			">" => Flag::Gt,
			"<=" => Flag::Le,
			">=" => Flag::Ge,
			"==" => Flag::LooseEq,
			"===" => Flag::StrictEq,
			"!=" => Flag::LooseNe,
			"!==" => Flag::StrictNe,
			"includes" => Flag::Includes,
			"startsWith" => Flag::StartsWith,
			"endsWith" => Flag::EndsWith,
			_ => return None,
		})
	}
}

enum Compiled {
	Plain,
	Regex(Option<Regex>),
	Func(Result<Expr, String>),
}

/// A flag and expected value, with regexes and expressions compiled once.
pub struct Matcher {
	flag: Flag,
	expected: Value,
	compiled: Compiled,
}

impl Matcher {
	/// Compiles `expected` for `flag`.
	pub fn new(flag: Flag, expected: Value) -> Self {
		let compiled = match flag {
			Flag::Regex => Compiled::Regex(Regex::new(&as_text(&expected)).ok()),
			Flag::Func => Compiled::Func(Expr::parse(&as_text(&expected))),
			_ => Compiled::Plain,
		};
		Self {
			flag,
			expected,
			compiled,
		}
	}

	/// Parse error of a `func` expression, if any.
	pub fn func_error(&self) -> Option<&str> {
		match &self.compiled {
			Compiled::Func(Err(e)) => Some(e),
			_ => None,
		}
	}

	/// Tests the attribute value `actual` (`None` when the element lacks the
	/// attribute). `element` is the whole element, visible to `func`.
	pub fn test(&self, actual: Option<&Value>, element: &Value) -> bool {
		match &self.compiled {
			Compiled::Regex(Some(re)) => actual.is_some_and(|v| regex_test(re, v)),
			Compiled::Regex(None) => false,
			Compiled::Func(Ok(expr)) => expr.test(actual.unwrap_or(&Value::Null), element),
			Compiled::Func(Err(_)) => false,
			Compiled::Plain => compare(self.flag, actual, &self.expected),
		}
	}
}

/// One-off test of `actual` against `expected` under `flag`.
pub fn test(actual: Option<&Value>, flag: Flag, expected: &Value) -> bool {
	Matcher::new(flag, expected.clone()).test(actual, &Value::Null)
}

/// Non-regex, non-func comparisons. Missing attributes behave like an
/// undefined value: only the negated flags and `== null` match them.
pub(crate) fn compare(flag: Flag, actual: Option<&Value>, expected: &Value) -> bool {
	let Some(actual) = actual else {
		return match flag {
			Flag::LooseNe | Flag::StrictNe => true,
			Flag::LooseEq => expected.is_null(),
			_ => false,
		};
	};
	match flag {
		Flag::DeepEq => deep_eq(actual, expected),
		Flag::StrictEq => strict_eq(actual, expected),
		Flag::StrictNe => !strict_eq(actual, expected),
		Flag::LooseEq => loose_eq(actual, expected),
		Flag::LooseNe => !loose_eq(actual, expected),
		Flag::Lt => order(actual, expected) == Some(Ordering::Less),
		Flag::Gt => order(actual, expected) == Some(Ordering::Greater),
		Flag::Le => matches!(order(actual, expected), Some(Ordering::Less | Ordering::Equal)),
		Flag::Ge => matches!(order(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
		Flag::Includes => includes(actual, expected),
		Flag::StartsWith => match (actual, expected) {
			(Value::String(a), Value::String(e)) => a.starts_with(e.as_str()),
			_ => false,
		},
		Flag::EndsWith => match (actual, expected) {
			(Value::String(a), Value::String(e)) => a.ends_with(e.as_str()),
			_ => false,
		},
		Flag::Regex | Flag::Func => test(Some(actual), flag, expected),
	}
}

/// Structural equality; numbers compare by value.
pub(crate) fn deep_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
		(Value::Array(x), Value::Array(y)) => {
			x.len() == y.len() && x.iter().zip(y).all(|(x, y)| deep_eq(x, y))
		}
		(Value::Object(x), Value::Object(y)) => {
			x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| deep_eq(v, w)))
		}
		_ => a == b,
	}
}

/// Same type and value. Lists and maps are never strictly equal to a
/// literal.
fn strict_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
		_ => deep_eq(a, b),
	}
}

/// Equality with number/string/bool coercion.
fn loose_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Null, Value::Null) => true,
		(Value::Null, _) | (_, Value::Null) => false,
		(Value::String(x), Value::String(y)) => x == y,
		_ => match (as_number(a), as_number(b)) {
			(Some(x), Some(y)) => x == y,
			_ => strict_eq(a, b),
		},
	}
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
	match (a, b) {
		(Value::String(x), Value::String(y)) => Some(x.cmp(y)),
		_ => as_number(a)?.partial_cmp(&as_number(b)?),
	}
}

fn includes(actual: &Value, expected: &Value) -> bool {
	match (actual, expected) {
		(Value::Array(items), _) => items.iter().any(|i| deep_eq(i, expected)),
		(Value::String(s), Value::String(e)) => s.contains(e.as_str()),
		_ => false,
	}
}

pub(crate) fn as_number(v: &Value) -> Option<f64> {
	match v {
		Value::Number(n) => n.as_f64(),
		Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
		Value::String(s) => s.trim().parse().ok(),
		_ => None,
	}
}

/// Scalar text form; strings are not quoted.
pub(crate) fn as_text(v: &Value) -> String {
	match v {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

/// Scalars match on their text; lists match when any scalar entry does.
fn regex_test(re: &Regex, v: &Value) -> bool {
	match v {
		Value::String(s) => re.is_match(s),
		Value::Number(_) | Value::Bool(_) => re.is_match(&v.to_string()),
		Value::Array(items) => items
			.iter()
			.any(|i| !matches!(i, Value::Array(_)) && regex_test(re, i)),
		Value::Null | Value::Object(_) => false,
	}
}
