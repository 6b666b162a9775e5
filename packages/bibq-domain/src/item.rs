//! Raw cached records. Items are immutable as fetched; queries work on
//! enriched copies, never on the cached data itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One cached object: an item, collection, attachment, note or annotation.
/// The payload keeps the source schema as-is under `data`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawItem {
	pub key: String,
	#[serde(default)]
	pub data: Map<String, Value>,
}

impl RawItem {
	pub fn new(key: impl Into<String>, data: Map<String, Value>) -> Self {
		Self { key: key.into(), data }
	}

	/// String value of a raw field, empty when absent or not a string.
	pub fn str_field(&self, field: &str) -> &str {
		self.data.get(field).and_then(Value::as_str).unwrap_or_default()
	}

	pub fn item_type(&self) -> &str {
		self.str_field("itemType")
	}

	pub fn date(&self) -> &str {
		self.str_field("date")
	}

	pub fn parent_item(&self) -> Option<&str> {
		self.data.get("parentItem").and_then(Value::as_str)
	}

	/// Keys of the objects this item relates to, from
	/// `relations."dc:relation"` (a single URI or a list of URIs). The key is
	/// the last path segment of each URI.
	pub fn relation_keys(&self) -> Vec<&str> {
		let Some(relations) = self.data.get("relations").and_then(Value::as_object) else {
			return Vec::new();
		};

		match relations.get("dc:relation") {
			Some(Value::String(uri)) => vec![relation_key(uri)],
			Some(Value::Array(uris)) =>
				uris.iter().filter_map(Value::as_str).map(relation_key).collect(),
			_ => Vec::new(),
		}
	}

	/// Parsed tag list; the raw field is either a `;`-joined string or a list
	/// of `{"tag": …}` mappings.
	pub fn tags(&self) -> Vec<String> {
		match self.data.get("tags") {
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

	pub fn creators(&self) -> &[Value] {
		self.data.get("creators").and_then(Value::as_array).map_or(&[], Vec::as_slice)
	}

	/// Creators whose `creatorType` is one of `roles`.
	pub fn creators_of<'a>(&'a self, roles: &'a [&str]) -> impl Iterator<Item = &'a Value> {
		self.creators().iter().filter(move |creator| {
			creator
				.get("creatorType")
				.and_then(Value::as_str)
				.is_some_and(|role| roles.contains(&role))
		})
	}

	pub fn collection_keys(&self) -> Vec<&str> {
		self.data
			.get("collections")
			.and_then(Value::as_array)
			.map(|keys| keys.iter().filter_map(Value::as_str).collect())
			.unwrap_or_default()
	}
}

fn relation_key(uri: &str) -> &str {
	uri.rsplit('/').next().unwrap_or(uri)
}
