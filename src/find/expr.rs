//! Sandboxed predicate expressions for the `func` flag.
//!
//! ```text
//! expr    = and ("||" and)*
//! and     = cmp ("&&" cmp)*
//! cmp     = unary (("===" | "!==" | "==" | "!=" | "<=" | ">=" | "<" | ">") unary)?
//! unary   = "!" unary | primary
//! primary = "(" expr ")" | literal | call | path
//! path    = ("value" | "element") ("." segment)*
//! call    = name "(" (expr ("," expr)*)? ")"
//! ```
//!
//! `value` is the attribute under test, `element` the whole element.
//! Available functions: `len`, `contains`, `starts_with`, `ends_with`,
//! `matches`, `lower`, `upper`, `number`. Nothing here can reach outside the
//! element being tested.

use nom::{
	branch::alt,
	bytes::complete::{tag, take_while1},
	character::complete::{char, multispace0},
	combinator::{all_consuming, map, value},
	error::{Error, ErrorKind},
	multi::{many0, separated_list0},
	sequence::{delimited, pair, preceded},
	IResult,
};
use regex::Regex;
use serde_json::{Number, Value};

use super::matcher::{as_number, as_text, compare, deep_eq, Flag};
use super::parser::{MAX_NESTING, identifier, nesting_overflow, number, string_literal, ws};

/// A function callable from an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Func {
	/// `len(x)`: characters of a string, items of an array or keys of an object.
	Len,
	/// `contains(haystack, needle)` over strings and arrays.
	Contains,
	/// `starts_with(text, prefix)`.
	StartsWith,
	/// `ends_with(text, suffix)`.
	EndsWith,
	/// `matches(text, pattern)`; an invalid pattern never matches.
	Matches,
	/// `lower(text)`.
	Lower,
	/// `upper(text)`.
	Upper,
	/// `number(x)`: parses a string, passes numbers through, else null.
	Number,
}

impl Func {
	fn from_name(name: &str) -> Option<Func> {
		Some(match name {
			"len" => Func::Len,
			"contains" => Func::Contains,
			"starts_with" => Func::StartsWith,
			"ends_with" => Func::EndsWith,
			"matches" => Func::Matches,
			"lower" => Func::Lower,
			"upper" => Func::Upper,
			"number" => Func::Number,
			_ => return None,
		})
	}

	fn arity(self) -> usize {
		match self {
			Func::Len | Func::Lower | Func::Upper | Func::Number => 1,
			_ => 2,
		}
	}
}

/// A parsed `func` expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
	/// String, number or boolean constant.
	Literal(Value),
	/// Path into the attribute under test.
	Input(Vec<String>),
	/// Path into the element.
	Element(Vec<String>),
	/// `!expr`
	Not(Box<Expr>),
	/// `a && b && ...`, flattened.
	And(Vec<Expr>),
	/// `a || b || ...`, flattened.
	Or(Vec<Expr>),
	/// Binary comparison using the matcher's flag semantics.
	Compare(Box<Expr>, Flag, Box<Expr>),
	/// Function call with exactly its arity in arguments.
	Call(Func, Vec<Expr>),
}

impl Expr {
	/// Parses an expression, rejecting anything outside the grammar or
	/// nested deeper than [`MAX_NESTING`].
	pub fn parse(src: &str) -> Result<Expr, String> {
		if let Some(position) = nesting_overflow(src, &['!']) {
			return Err(format!(
				"nested deeper than {MAX_NESTING} levels at position {position}"
			));
		}
		match all_consuming(ws(or_expr))(src) {
			Ok((_, expr)) => Ok(expr),
			Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
				let position = src.len() - e.input.len();
				Err(match e.input.chars().next() {
					Some(c) => format!("unexpected `{c}` at position {position}"),
					None => "unexpected end of expression".into(),
				})
			}
			Err(nom::Err::Incomplete(_)) => Err("unexpected end of expression".into()),
		}
	}

	/// Evaluates to a truthy value.
	pub fn test(&self, input: &Value, element: &Value) -> bool {
		truthy(&self.eval(input, element))
	}

	/// Evaluates against the attribute under test and the whole element.
	pub fn eval(&self, input: &Value, element: &Value) -> Value {
		match self {
			Expr::Literal(v) => v.clone(),
			Expr::Input(path) => resolve(input, path),
			Expr::Element(path) => resolve(element, path),
			Expr::Not(e) => Value::Bool(!e.test(input, element)),
			Expr::And(all) => Value::Bool(all.iter().all(|e| e.test(input, element))),
			Expr::Or(any) => Value::Bool(any.iter().any(|e| e.test(input, element))),
			Expr::Compare(a, flag, b) => {
				let lhs = a.eval(input, element);
				let rhs = b.eval(input, element);
				Value::Bool(compare(*flag, Some(&lhs), &rhs))
			}
			Expr::Call(func, args) => {
				let args: Vec<Value> = args.iter().map(|a| a.eval(input, element)).collect();
				call(*func, &args)
			}
		}
	}
}

fn resolve(root: &Value, path: &[String]) -> Value {
	let mut current = root;
	for segment in path {
		let next = match current {
			Value::Object(map) => map.get(segment),
			Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
			_ => None,
		};
		match next {
			Some(v) => current = v,
			None => return Value::Null,
		}
	}
	current.clone()
}

fn truthy(v: &Value) -> bool {
	match v {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

fn call(func: Func, args: &[Value]) -> Value {
	let text = |i: usize| args.get(i).map(as_text).unwrap_or_default();
	match func {
		Func::Len => match &args[0] {
			Value::String(s) => s.chars().count().into(),
			Value::Array(a) => a.len().into(),
			Value::Object(o) => o.len().into(),
			_ => Value::Null,
		},
		Func::Contains => Value::Bool(match (&args[0], &args[1]) {
			(Value::Array(items), needle) => items.iter().any(|i| deep_eq(i, needle)),
			(Value::String(s), needle) => s.contains(as_text(needle).as_str()),
			_ => false,
		}),
		Func::StartsWith => Value::Bool(args[0].is_string() && text(0).starts_with(&text(1))),
		Func::EndsWith => Value::Bool(args[0].is_string() && text(0).ends_with(&text(1))),
		Func::Matches => Value::Bool(
			Regex::new(&text(1)).is_ok_and(|re| !args[0].is_null() && re.is_match(&text(0))),
		),
		Func::Lower => Value::String(text(0).to_lowercase()),
		Func::Upper => Value::String(text(0).to_uppercase()),
		Func::Number => as_number(&args[0])
			.and_then(Number::from_f64)
			.map(Value::Number)
			.unwrap_or(Value::Null),
	}
}

fn or_expr(input: &str) -> IResult<&str, Expr> {
	let (mut input, first) = and_expr(input)?;
	let mut any = vec![first];
	while let Ok((rest, rhs)) = preceded(ws(tag("||")), and_expr)(input) {
		any.push(rhs);
		input = rest;
	}
	Ok((input, flatten(any, Expr::Or)))
}

fn and_expr(input: &str) -> IResult<&str, Expr> {
	let (mut input, first) = cmp_expr(input)?;
	let mut all = vec![first];
	while let Ok((rest, rhs)) = preceded(ws(tag("&&")), cmp_expr)(input) {
		all.push(rhs);
		input = rest;
	}
	Ok((input, flatten(all, Expr::And)))
}

fn flatten(mut operands: Vec<Expr>, join: fn(Vec<Expr>) -> Expr) -> Expr {
	if operands.len() == 1 {
		operands.remove(0)
	} else {
		join(operands)
	}
}

fn cmp_expr(input: &str) -> IResult<&str, Expr> {
	let (input, lhs) = unary(input)?;
	match pair(ws(cmp_op), unary)(input) {
		Ok((rest, (op, rhs))) => Ok((rest, Expr::Compare(Box::new(lhs), op, Box::new(rhs)))),
		Err(_) => Ok((input, lhs)),
	}
}

fn cmp_op(input: &str) -> IResult<&str, Flag> {
	alt((
		value(Flag::StrictEq, tag("===")),
		value(Flag::StrictNe, tag("!==")),
		value(Flag::LooseEq, tag("==")),
		value(Flag::LooseNe, tag("!=")),
		value(Flag::Le, tag("<=")),
		value(Flag::Ge, tag(">=")),
		value(Flag::Lt, tag("<")),
		value(Flag::Gt, tag(">")),
	))(input)
}

fn unary(input: &str) -> IResult<&str, Expr> {
	alt((
		map(preceded(pair(char('!'), multispace0), unary), |e| Expr::Not(Box::new(e))),
		primary,
	))(input)
}

fn primary(input: &str) -> IResult<&str, Expr> {
	alt((
		delimited(pair(char('('), multispace0), or_expr, pair(multispace0, char(')'))),
		map(string_literal, |s| Expr::Literal(Value::String(s))),
		map(number, Expr::Literal),
		call_or_path,
	))(input)
}

fn call_or_path(input: &str) -> IResult<&str, Expr> {
	let (rest, name) = identifier(input)?;
	let fail = || nom::Err::Failure(Error::new(input, ErrorKind::Verify));

	if let Ok((rest, args)) = delimited(
		ws(char('(')),
		separated_list0(ws(char(',')), or_expr),
		preceded(multispace0, char(')')),
	)(rest)
	{
		let func = Func::from_name(name).ok_or_else(fail)?;
		if args.len() != func.arity() {
			return Err(fail());
		}
		return Ok((rest, Expr::Call(func, args)));
	}

	let (rest, path) = many0(preceded(
		char('.'),
		map(take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-'), String::from),
	))(rest)?;
	match name {
		"value" => Ok((rest, Expr::Input(path))),
		"element" => Ok((rest, Expr::Element(path))),
		"true" if path.is_empty() => Ok((rest, Expr::Literal(Value::Bool(true)))),
		"false" if path.is_empty() => Ok((rest, Expr::Literal(Value::Bool(false)))),
		"null" if path.is_empty() => Ok((rest, Expr::Literal(Value::Null))),
		_ => Err(fail()),
	}
}
