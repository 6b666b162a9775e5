//! Per-query-session view of the cached snapshot: the ordered item list,
//! the auxiliary child collections, the key -> object index and the
//! field/tag catalogs. Built once per invocation, read-only afterwards.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::{
	fields::{COMPUTED_FIELDS, INTEGER_FIELDS, NOTE_FIELDS},
	item::RawItem,
	sort_key,
};

/// The raw sequences a data source yields. Every sequence may be empty.
#[derive(Debug, Default, Deserialize)]
pub struct LibraryData {
	#[serde(default)]
	pub items: Vec<RawItem>,
	#[serde(default)]
	pub collections: Vec<RawItem>,
	#[serde(default)]
	pub attachments: Vec<RawItem>,
	#[serde(default)]
	pub notes: Vec<RawItem>,
	#[serde(default)]
	pub annotations: Vec<RawItem>,
}

#[derive(Debug)]
pub struct Library {
	pub items: Vec<RawItem>,
	pub collections: Vec<RawItem>,
	pub attachments: Vec<RawItem>,
	pub notes: Vec<RawItem>,
	pub annotations: Vec<RawItem>,
	index: HashMap<String, RawItem>,
	valid_fields: Vec<String>,
	valid_field_set: HashSet<String>,
	valid_tags: Vec<String>,
}

impl Library {
	pub fn new(data: LibraryData) -> Self {
		let LibraryData { items, collections, attachments, notes, annotations } = data;
		let mut index = HashMap::new();

		for object in
			[&items, &collections, &attachments, &notes, &annotations].into_iter().flatten()
		{
			index.insert(object.key.clone(), object.clone());
		}

		let mut valid_fields = Vec::new();
		let mut valid_field_set = HashSet::new();
		let mut valid_tags = Vec::new();
		let mut seen_tags = HashSet::new();

		for item in &items {
			for tag in item.tags() {
				if seen_tags.insert(tag.clone()) {
					valid_tags.push(tag);
				}
			}
			for field in item.data.keys() {
				if valid_field_set.insert(field.clone()) {
					valid_fields.push(field.clone());
				}
			}
		}
		for &field in COMPUTED_FIELDS.iter().chain(INTEGER_FIELDS).chain(NOTE_FIELDS) {
			if valid_field_set.insert(field.to_string()) {
				valid_fields.push(field.to_string());
			}
		}

		Self {
			items,
			collections,
			attachments,
			notes,
			annotations,
			index,
			valid_fields,
			valid_field_set,
			valid_tags,
		}
	}

	/// Resolve any cached object by key. Unresolved keys mean the referenced
	/// object is not in the cache; callers skip them.
	pub fn object(&self, key: &str) -> Option<&RawItem> {
		self.index.get(key)
	}

	pub fn is_valid_field(&self, field: &str) -> bool {
		self.valid_field_set.contains(field)
	}

	pub fn valid_fields(&self) -> &[String] {
		&self.valid_fields
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		self.valid_tags.iter().any(|known| known == tag)
	}

	/// Known tags, canonically sorted for error listings.
	pub fn sorted_tags(&self) -> Vec<String> {
		let mut tags = self.valid_tags.clone();

		tags.sort_by_key(|tag| sort_key::sort_key(&serde_json::Value::String(tag.clone()), "tags"));

		tags
	}

	/// Fields known to the catalog, canonically sorted for error listings.
	pub fn sorted_fields(&self) -> Vec<String> {
		let mut fields = self.valid_fields.clone();

		fields.sort_by_key(|field| {
			sort_key::sort_key(&serde_json::Value::String(field.clone()), "")
		});

		fields
	}

	/// Name of a collection object, when the key resolves to one.
	pub fn collection_name(&self, key: &str) -> Option<&str> {
		self.object(key).and_then(|collection| {
			collection.data.get("name").and_then(serde_json::Value::as_str)
		})
	}

	/// Child records of `parent` within one auxiliary sequence.
	pub fn children_of<'a>(
		&'a self,
		children: &'a [RawItem],
		parent: &'a str,
	) -> impl Iterator<Item = &'a RawItem> {
		children.iter().filter(move |child| child.parent_item() == Some(parent))
	}
}
