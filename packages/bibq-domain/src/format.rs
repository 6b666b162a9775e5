//! Canonical string rendering of field values for display, sorting and
//! regex filtering. Pure and total: any value formats without failing, and
//! formatting an already-formatted string is a no-op.

use serde_json::Value;

use crate::{date, fields::PERSON_FIELDS};

pub fn format_value(value: &Value, field: &str) -> String {
	match field {
		"tags" => return format_tags(value),
		"itemType" =>
			if let Value::String(raw) = value {
				return camel_to_words(raw);
			},
		"rank" => return format!("{:.3}", value_as_f64(value).unwrap_or(0.0)),
		"year" =>
			if value_as_f64(value) == Some(f64::from(date::SENTINEL_YEAR)) {
				return "-".to_string();
			},
		_ => {},
	}

	match value {
		Value::Number(number) => match number.as_i64() {
			Some(integer) if integer < 0 => "-".to_string(),
			Some(integer) => integer.to_string(),
			None => number.to_string(),
		},
		Value::Array(values) => {
			let separator = if field == "attachments" { ";" } else { ", " };

			values
				.iter()
				.map(|entry| format_value(entry, field))
				.collect::<Vec<_>>()
				.join(separator)
		},
		Value::Object(mapping) if PERSON_FIELDS.contains(&field) => format_person(mapping),
		Value::String(text) => text.clone(),
		Value::Bool(flag) => flag.to_string(),
		Value::Null => String::new(),
		Value::Object(_) => value.to_string(),
	}
}

fn format_person(mapping: &serde_json::Map<String, Value>) -> String {
	let name = mapping.get("name").and_then(Value::as_str).unwrap_or_default();

	if !name.is_empty() {
		return name.to_string();
	}

	let last = mapping.get("lastName").and_then(Value::as_str).unwrap_or_default();
	let first = mapping.get("firstName").and_then(Value::as_str).unwrap_or_default();

	format!("{last} {first}").trim().to_string()
}

fn format_tags(value: &Value) -> String {
	match value {
		Value::String(joined) => joined.clone(),
		Value::Array(entries) => entries
			.iter()
			.map(|entry| match entry {
				Value::Object(mapping) =>
					mapping.get("tag").and_then(Value::as_str).unwrap_or_default().to_string(),
				Value::String(tag) => tag.clone(),
				other => other.to_string(),
			})
			.collect::<Vec<_>>()
			.join(";"),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

/// `journalArticle` -> `journal article`; already-split input is unchanged.
fn camel_to_words(raw: &str) -> String {
	let chars = raw.chars().collect::<Vec<_>>();
	let mut words = String::with_capacity(raw.len() + 4);

	for (index, &current) in chars.iter().enumerate() {
		if current.is_ascii_uppercase() && index > 0 {
			let previous = chars[index - 1];
			let next_is_lower = chars.get(index + 1).is_some_and(char::is_ascii_lowercase);

			if previous.is_ascii_lowercase()
				|| previous.is_ascii_digit()
				|| (previous.is_ascii_uppercase() && next_is_lower)
			{
				words.push(' ');
			}
		}

		words.push(current.to_ascii_lowercase());
	}

	words
}

fn value_as_f64(value: &Value) -> Option<f64> {
	match value {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use crate::format::format_value;

	#[test]
	fn item_type_splits_camel_case() {
		assert_eq!(format_value(&json!("journalArticle"), "itemType"), "journal article");
		assert_eq!(format_value(&json!("tvBroadcast"), "itemType"), "tv broadcast");
		assert_eq!(format_value(&json!("book"), "itemType"), "book");
	}

	#[test]
	fn rank_formats_with_three_decimals() {
		assert_eq!(format_value(&json!(0.5), "rank"), "0.500");
		assert_eq!(format_value(&json!(1), "rank"), "1.000");
		assert_eq!(format_value(&json!(""), "rank"), "0.000");
	}

	#[test]
	fn sentinels_format_as_dash() {
		assert_eq!(format_value(&json!(1900), "year"), "-");
		assert_eq!(format_value(&json!(2021), "year"), "2021");
		assert_eq!(format_value(&json!(-1), "numPages"), "-");
		assert_eq!(format_value(&json!(12), "numPages"), "12");
	}

	#[test]
	fn lists_and_persons_flatten() {
		let authors = json!([
			{ "lastName": "Knuth", "firstName": "Donald", "creatorType": "author" },
			{ "name": "ACM" },
		]);

		assert_eq!(format_value(&authors, "authors"), "Knuth Donald, ACM");
		assert_eq!(format_value(&json!(["a.pdf", "b.pdf"]), "attachments"), "a.pdf;b.pdf");
		assert_eq!(format_value(&json!([{ "tag": "x" }, { "tag": "y" }]), "tags"), "x;y");
		assert_eq!(format_value(&json!("x;y"), "tags"), "x;y");
	}

	#[test]
	fn formatting_is_idempotent_on_string_results() {
		for (value, field) in [
			(json!("journalArticle"), "itemType"),
			(json!(1900), "year"),
			(json!(-3), "numPages"),
			(json!([{ "tag": "x" }]), "tags"),
			(json!(0.25), "rank"),
		] {
			let once = format_value(&value, field);
			let twice = format_value(&serde_json::Value::String(once.clone()), field);

			assert_eq!(once, twice, "field {field}");
		}
	}

	#[test]
	fn null_formats_as_empty() {
		assert_eq!(format_value(&serde_json::Value::Null, "url"), "");
	}
}
