//! Compiles textual `[~]field:expression` filters into executable
//! predicates. Each predicate is a closed variant; negation is a flag
//! applied at evaluation time, so for any predicate exactly one of P / ~P
//! holds per item.

use std::{cmp::Ordering, collections::HashMap};

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use time::OffsetDateTime;

use bibq_domain::{FieldClass, Library, classify, date, format_value};

use crate::{
	derive::EnrichedItem,
	error::{Error, Result},
};

/// Values meaning "unset" in a filter expression.
pub const EMPTY_TOKENS: &[&str] = &["-", "<empty>"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
	Eq,
	Lt,
	Le,
	Gt,
	Ge,
}

impl CompareOp {
	/// Split a comparison expression into its operator and operand. An
	/// absent operator maps to `default`, when one applies.
	fn split(expression: &str, default: Option<Self>) -> Option<(Self, &str)> {
		for (token, op) in
			[("==", Self::Eq), ("<=", Self::Le), (">=", Self::Ge), ("<", Self::Lt), (">", Self::Gt)]
		{
			if let Some(rest) = expression.strip_prefix(token) {
				return Some((op, rest.trim()));
			}
		}

		default.map(|op| (op, expression.trim()))
	}

	fn matches(self, ordering: Ordering) -> bool {
		match self {
			Self::Eq => ordering == Ordering::Equal,
			Self::Lt => ordering == Ordering::Less,
			Self::Le => ordering != Ordering::Greater,
			Self::Gt => ordering == Ordering::Greater,
			Self::Ge => ordering != Ordering::Less,
		}
	}
}

#[derive(Clone, Debug)]
pub enum Predicate {
	/// Integer comparison against the raw field value.
	Numeric { op: CompareOp, operand: i64 },
	/// Timestamp comparison; the unset sentinel compares like any date.
	Date { op: CompareOp, operand: OffsetDateTime },
	/// Comparison against the transient rank score (0 when unranked).
	Rank { op: CompareOp, operand: f64 },
	/// Tag membership, or "has no tags at all" for the empty tokens.
	Tag { value: String },
	/// Raw value is the empty string (the sentinel year for `year`).
	Empty,
	/// Case-insensitive regex search over the formatted value.
	Regex { pattern: Regex },
}

#[derive(Clone, Debug)]
pub struct FieldFilter {
	pub field: String,
	pub negate: bool,
	pub predicate: Predicate,
}

impl FieldFilter {
	fn matches(&self, item: &EnrichedItem, ranks: &HashMap<String, f64>) -> bool {
		let value = item.data.get(self.field.as_str());

		match &self.predicate {
			Predicate::Numeric { op, operand } => value_as_i64(value)
				.is_some_and(|actual| op.matches(actual.cmp(operand))),
			Predicate::Date { op, operand } => {
				let raw = value.and_then(Value::as_str).unwrap_or_default();
				let actual = date::parse_or_sentinel(raw);

				op.matches(actual.cmp(operand))
			},
			Predicate::Rank { op, operand } => {
				let actual = ranks.get(&item.key).copied().unwrap_or_default();

				op.matches(actual.total_cmp(operand))
			},
			Predicate::Tag { value: wanted } => {
				let tags = parse_tags(value);

				if EMPTY_TOKENS.contains(&wanted.as_str()) {
					tags.is_empty()
				} else {
					tags.iter().any(|tag| tag == wanted)
				}
			},
			Predicate::Empty =>
				if self.field == "year" {
					value_as_i64(value) == Some(i64::from(date::SENTINEL_YEAR))
				} else {
					value.and_then(Value::as_str) == Some("")
				},
			Predicate::Regex { pattern } =>
				pattern.is_match(&format_value(value.unwrap_or(&Value::Null), &self.field)),
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct FilterSet {
	filters: Vec<FieldFilter>,
}

impl FilterSet {
	pub fn compile(expressions: &[String], library: &Library) -> Result<Self> {
		let mut filters = Vec::with_capacity(expressions.len());

		for raw in expressions {
			filters.push(compile_one(raw, library)?);
		}

		Ok(Self { filters })
	}

	/// Fields referenced by any predicate, in filter order.
	pub fn fields(&self) -> impl Iterator<Item = &str> {
		self.filters.iter().map(|filter| filter.field.as_str())
	}

	pub fn references_rank(&self) -> bool {
		self.filters.iter().any(|filter| filter.field == "rank")
	}

	/// The same set with rank predicates removed; used before ranks exist.
	pub fn without_rank(&self) -> Self {
		Self {
			filters: self
				.filters
				.iter()
				.filter(|filter| filter.field != "rank")
				.cloned()
				.collect(),
		}
	}

	/// Regex predicates on the `collections` field, with their negate
	/// flags; the citation walk consults these.
	pub(crate) fn collection_regexes(&self) -> Vec<(bool, &Regex)> {
		self.filters
			.iter()
			.filter(|filter| filter.field == "collections")
			.filter_map(|filter| match &filter.predicate {
				Predicate::Regex { pattern } => Some((filter.negate, pattern)),
				_ => None,
			})
			.collect()
	}

	/// An item is kept iff every predicate holds after negation; any
	/// failing negation-aware predicate excludes it.
	pub fn matches(&self, item: &EnrichedItem, ranks: &HashMap<String, f64>) -> bool {
		self.filters.iter().all(|filter| filter.matches(item, ranks) != filter.negate)
	}
}

fn compile_one(raw: &str, library: &Library) -> Result<FieldFilter> {
	let Some((field_part, value_part)) = raw.split_once(':') else {
		return Err(Error::BadFilter { raw: raw.to_string() });
	};
	let mut field = field_part.trim();
	let value = value_part.trim();
	let negate = field.starts_with('~');

	if negate {
		field = &field[1..];
	}
	if value.is_empty() {
		return Err(Error::EmptyFilter { field: field.to_string() });
	}
	if !library.is_valid_field(field) {
		tracing::warn!(
			field,
			"Got an unknown field name; should be one of:\n- {}",
			library.sorted_fields().join("\n- "),
		);

		return Err(Error::UnknownField { field: field.to_string() });
	}

	let predicate = build_predicate(field, value, library)?;

	Ok(FieldFilter { field: field.to_string(), negate, predicate })
}

fn build_predicate(field: &str, value: &str, library: &Library) -> Result<Predicate> {
	let class = classify(field);

	if class == FieldClass::Integer && field != "rank"
		&& let Some((op, operand)) = CompareOp::split(value, Some(CompareOp::Eq))
		&& !operand.is_empty()
		&& operand.bytes().all(|byte| byte.is_ascii_digit())
	{
		// Parse can only fail on overflow here.
		let operand = operand.parse().map_err(|_| Error::BadComparison {
			field: field.to_string(),
			expression: value.to_string(),
		})?;

		return Ok(Predicate::Numeric { op, operand });
	}
	if class == FieldClass::Date {
		if EMPTY_TOKENS.contains(&value) {
			return Ok(Predicate::Date { op: CompareOp::Eq, operand: date::sentinel() });
		}

		let Some((op, operand)) = CompareOp::split(value, None) else {
			return Err(Error::BadComparison {
				field: field.to_string(),
				expression: value.to_string(),
			});
		};

		return Ok(Predicate::Date { op, operand: date::parse_or_sentinel(operand) });
	}
	if field == "rank" {
		let operand = CompareOp::split(value, None)
			.and_then(|(op, operand)| Some((op, operand.parse::<f64>().ok()?)));
		let Some((op, operand)) = operand else {
			return Err(Error::BadComparison {
				field: field.to_string(),
				expression: value.to_string(),
			});
		};

		return Ok(Predicate::Rank { op, operand });
	}
	if field == "tags" {
		if !library.has_tag(value) && !EMPTY_TOKENS.contains(&value) {
			tracing::warn!(
				tag = value,
				"Got an unknown tag; should be one of:\n- {}",
				library.sorted_tags().join("\n- "),
			);

			return Err(Error::UnknownTag { tag: value.to_string() });
		}

		return Ok(Predicate::Tag { value: value.to_string() });
	}
	if EMPTY_TOKENS.contains(&value) {
		return Ok(Predicate::Empty);
	}

	let pattern = RegexBuilder::new(value).case_insensitive(true).build().map_err(|source| {
		Error::BadRegex { field: field.to_string(), pattern: value.to_string(), source }
	})?;

	Ok(Predicate::Regex { pattern })
}

pub(crate) fn parse_tags(value: Option<&Value>) -> Vec<String> {
	match value {
		Some(Value::String(joined)) if !joined.is_empty() =>
			joined.split(';').map(str::to_string).collect(),
		Some(Value::Array(entries)) => entries
			.iter()
			.filter_map(|entry| entry.get("tag").and_then(Value::as_str))
			.map(str::to_string)
			.collect(),
		_ => Vec::new(),
	}
}

fn value_as_i64(value: Option<&Value>) -> Option<i64> {
	match value? {
		Value::Number(number) =>
			number.as_i64().or_else(|| number.as_f64().map(|float| float as i64)),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}
