//! Builders for in-memory libraries, for tests only. Records carry the
//! same shape as cached data, `key` duplicated inside `data` included.

use serde_json::{Map, Value, json};

use bibq_domain::{Library, LibraryData, RawItem};

pub struct ItemBuilder {
	key: String,
	data: Map<String, Value>,
}

impl ItemBuilder {
	pub fn new(key: impl Into<String>) -> Self {
		let key = key.into();
		let mut data = Map::new();

		data.insert("key".to_string(), json!(key));

		Self { key, data }
	}

	pub fn title(self, title: &str) -> Self {
		self.field("title", json!(title))
	}

	pub fn date(self, date: &str) -> Self {
		self.field("date", json!(date))
	}

	pub fn item_type(self, item_type: &str) -> Self {
		self.field("itemType", json!(item_type))
	}

	pub fn tags(self, tags: &[&str]) -> Self {
		let tags = tags.iter().map(|tag| json!({ "tag": tag })).collect::<Vec<_>>();

		self.field("tags", Value::Array(tags))
	}

	pub fn relations(self, keys: &[&str]) -> Self {
		let uris = keys
			.iter()
			.map(|key| json!(format!("http://zotero.org/users/0/items/{key}")))
			.collect::<Vec<_>>();

		self.field("relations", json!({ "dc:relation": uris }))
	}

	pub fn creator(mut self, role: &str, last: &str, first: &str) -> Self {
		let creators = self
			.data
			.entry("creators")
			.or_insert_with(|| json!([]));

		if let Value::Array(entries) = creators {
			entries.push(json!({ "creatorType": role, "lastName": last, "firstName": first }));
		}

		self
	}

	pub fn collections(self, keys: &[&str]) -> Self {
		self.field("collections", json!(keys))
	}

	pub fn field(mut self, name: &str, value: Value) -> Self {
		self.data.insert(name.to_string(), value);

		self
	}

	pub fn build(self) -> RawItem {
		RawItem::new(self.key, self.data)
	}
}

#[derive(Default)]
pub struct LibraryBuilder {
	data: LibraryData,
}

impl LibraryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn item(mut self, item: RawItem) -> Self {
		self.data.items.push(item);

		self
	}

	pub fn collection(mut self, key: &str, name: &str) -> Self {
		let mut data = Map::new();

		data.insert("key".to_string(), json!(key));
		data.insert("name".to_string(), json!(name));
		self.data.collections.push(RawItem::new(key, data));

		self
	}

	pub fn attachment(mut self, parent: &str, title: &str) -> Self {
		let key = format!("ATTA{:04}", self.data.attachments.len() + 1);
		let mut data = Map::new();

		data.insert("key".to_string(), json!(key));
		data.insert("parentItem".to_string(), json!(parent));
		data.insert("title".to_string(), json!(title));
		self.data.attachments.push(RawItem::new(key, data));

		self
	}

	pub fn note(mut self, parent: &str, note: &str) -> Self {
		let key = format!("NOTE{:04}", self.data.notes.len() + 1);
		let mut data = Map::new();

		data.insert("key".to_string(), json!(key));
		data.insert("parentItem".to_string(), json!(parent));
		data.insert("note".to_string(), json!(note));
		self.data.notes.push(RawItem::new(key, data));

		self
	}

	pub fn annotation(mut self, parent: &str) -> Self {
		let key = format!("ANNO{:04}", self.data.annotations.len() + 1);
		let mut data = Map::new();

		data.insert("key".to_string(), json!(key));
		data.insert("parentItem".to_string(), json!(parent));
		self.data.annotations.push(RawItem::new(key, data));

		self
	}

	pub fn build(self) -> Library {
		Library::new(self.data)
	}
}
