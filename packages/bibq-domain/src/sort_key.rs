//! Canonical comparison key used for sorting and limiting. Date-class
//! fields compare by parsed timestamp, numeric-class fields by float value
//! (-1 for empty), titles by article-stripped case-folded text, everything
//! else by case-folded text.

use std::cmp::Ordering;

use serde_json::Value;

use crate::{
	date,
	fields::{FieldClass, classify},
	format::format_value,
};

#[derive(Clone, Debug)]
pub enum SortKey {
	Time(i64),
	Num(f64),
	Text(String),
}

impl PartialEq for SortKey {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for SortKey {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self, other) {
			(Self::Time(lhs), Self::Time(rhs)) => lhs.cmp(rhs),
			(Self::Num(lhs), Self::Num(rhs)) => lhs.total_cmp(rhs),
			(Self::Text(lhs), Self::Text(rhs)) => lhs.cmp(rhs),
			(Self::Time(_), _) => Ordering::Less,
			(_, Self::Time(_)) => Ordering::Greater,
			(Self::Num(_), _) => Ordering::Less,
			(_, Self::Num(_)) => Ordering::Greater,
		}
	}
}

pub fn sort_key(value: &Value, field: &str) -> SortKey {
	match classify(field) {
		FieldClass::Date => {
			let formatted = format_value(value, field);
			let stripped = formatted.trim_start_matches('-');

			SortKey::Time(date::parse_or_sentinel(stripped).unix_timestamp())
		},
		FieldClass::Integer => SortKey::Num(numeric_key(value, field)),
		FieldClass::Title => SortKey::Text(title_key(&format_value(value, field))),
		FieldClass::Tags | FieldClass::Text =>
			SortKey::Text(format_value(value, field).to_lowercase()),
	}
}

fn numeric_key(value: &Value, field: &str) -> f64 {
	match value {
		Value::Null => -1.0,
		Value::Number(number) => number.as_f64().unwrap_or(-1.0),
		Value::String(text) if text.is_empty() || text == "-" => -1.0,
		Value::String(text) => text.trim().parse().unwrap_or_else(|_| {
			tracing::warn!(value = text.as_str(), field, "Bad numeric value.");

			-1.0
		}),
		other => {
			tracing::warn!(value = %other, field, "Bad numeric value.");

			-1.0
		},
	}
}

/// Case-folds and strips a leading article and leading punctuation so that
/// "The Art of X" sorts under "art of x".
fn title_key(text: &str) -> String {
	let lowered = text.to_lowercase();
	let trimmed = lowered.trim_start();
	let without_article = match trimmed.split_once(char::is_whitespace) {
		Some((first, rest)) if matches!(first, "a" | "an" | "the") => rest.trim_start(),
		_ => trimmed,
	};
	let replaced = if let Some(rest) = without_article.strip_prefix('@') {
		format!("a{rest}")
	} else if let Some(rest) = without_article.strip_prefix('$') {
		format!("s{rest}")
	} else {
		without_article.to_string()
	};

	replaced.trim_start_matches(|c: char| c.is_ascii_punctuation()).to_string()
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use time::macros::datetime;

	use crate::sort_key::{SortKey, sort_key};

	#[test]
	fn dates_compare_by_timestamp_with_sentinel_first() {
		let unset = sort_key(&json!("-"), "date");
		let dated = sort_key(&json!("2021-05-03"), "date");

		assert_eq!(unset, SortKey::Time(datetime!(1900-01-01 0:00 UTC).unix_timestamp()));
		assert!(unset < dated);
	}

	#[test]
	fn numeric_fields_treat_empty_as_minus_one() {
		assert_eq!(sort_key(&json!("-"), "numPages"), SortKey::Num(-1.0));
		assert_eq!(sort_key(&json!(""), "citations"), SortKey::Num(-1.0));
		assert_eq!(sort_key(&serde_json::Value::Null, "year"), SortKey::Num(-1.0));
		assert_eq!(sort_key(&json!("12"), "numPages"), SortKey::Num(12.0));
		assert_eq!(sort_key(&json!(7), "citations"), SortKey::Num(7.0));
		assert!(sort_key(&json!("junk"), "numPages") == SortKey::Num(-1.0));
	}

	#[test]
	fn titles_drop_leading_articles_and_punctuation() {
		assert_eq!(sort_key(&json!("The Art of Fuzzing"), "title"), sort_key(&json!("art of fuzzing"), "title"));
		assert_eq!(sort_key(&json!("\"Quoted\" Title"), "title"), SortKey::Text("quoted\" title".to_string()));
		assert_eq!(sort_key(&json!("$ymbolic"), "title"), SortKey::Text("symbolic".to_string()));
		assert_eq!(sort_key(&json!("@Home"), "title"), SortKey::Text("ahome".to_string()));
	}

	#[test]
	fn text_fields_fold_case() {
		assert_eq!(sort_key(&json!("Zürich"), "place"), SortKey::Text("zürich".to_string()));
	}
}
