//! Cache-directory data source. One JSON file per object sequence, each a
//! plain list of records; an absent file just means an empty sequence.

use std::{
	fs,
	path::{Path, PathBuf},
};

use bibq_domain::{LibraryData, RawItem};

use crate::error::{Error, Result};

pub const OBJECT_FILES: &[&str] = &["items", "collections", "attachments", "notes", "annotations"];

#[derive(Clone, Debug)]
pub struct CacheDir {
	root: PathBuf,
}

impl CacheDir {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn path(&self) -> &Path {
		&self.root
	}

	pub fn marks_path(&self) -> PathBuf {
		self.root.join("marks.json")
	}

	pub fn load(&self) -> Result<LibraryData> {
		Ok(LibraryData {
			items: self.load_objects("items")?,
			collections: self.load_objects("collections")?,
			attachments: self.load_objects("attachments")?,
			notes: self.load_objects("notes")?,
			annotations: self.load_objects("annotations")?,
		})
	}

	fn load_objects(&self, name: &str) -> Result<Vec<RawItem>> {
		let path = self.root.join(format!("{name}.json"));

		if !path.exists() {
			tracing::debug!(path = %path.display(), "No cache file, using an empty sequence.");

			return Ok(Vec::new());
		}

		tracing::debug!(path = %path.display(), "Loading objects from cache.");

		let raw = fs::read_to_string(&path)
			.map_err(|source| Error::ReadCache { path: path.clone(), source })?;

		serde_json::from_str(&raw).map_err(|source| Error::ParseCache { path, source })
	}
}

/// Bucket child records into the three child sequences by `itemType`. For
/// fetchers that write children as one mixed sequence; the per-file loader
/// above expects them already split. Any other type means the snapshot does
/// not match the expected schema.
pub fn classify_children(
	children: Vec<RawItem>,
) -> Result<(Vec<RawItem>, Vec<RawItem>, Vec<RawItem>)> {
	let (mut attachments, mut notes, mut annotations) = (Vec::new(), Vec::new(), Vec::new());

	for child in children {
		match child.item_type() {
			"attachment" => attachments.push(child),
			"note" => notes.push(child),
			"annotation" => annotations.push(child),
			other => {
				return Err(Error::UnknownChildType { item_type: other.to_string() });
			},
		}
	}

	Ok((attachments, notes, annotations))
}

#[cfg(test)]
mod tests {
	use std::fs;

	use serde_json::json;

	use crate::{
		cache::{CacheDir, classify_children},
		error::Error,
	};

	#[test]
	fn absent_files_load_as_empty_sequences() {
		let dir = tempfile::tempdir().expect("tempdir");
		let data = CacheDir::new(dir.path()).load().expect("load");

		assert!(data.items.is_empty());
		assert!(data.collections.is_empty());
	}

	#[test]
	fn object_files_round_trip() {
		let dir = tempfile::tempdir().expect("tempdir");
		let items = json!([
			{ "key": "AAAA0001", "data": { "key": "AAAA0001", "title": "First" } },
		]);

		fs::write(dir.path().join("items.json"), items.to_string()).expect("write");

		let data = CacheDir::new(dir.path()).load().expect("load");

		assert_eq!(data.items.len(), 1);
		assert_eq!(data.items[0].key, "AAAA0001");
		assert_eq!(data.items[0].str_field("title"), "First");
	}

	#[test]
	fn unreadable_json_is_an_error() {
		let dir = tempfile::tempdir().expect("tempdir");

		fs::write(dir.path().join("items.json"), "not json").expect("write");

		let result = CacheDir::new(dir.path()).load();

		assert!(matches!(result, Err(Error::ParseCache { .. })));
	}

	#[test]
	fn children_bucket_by_item_type() {
		let children = serde_json::from_value(json!([
			{ "key": "ATTA0001", "data": { "itemType": "attachment" } },
			{ "key": "NOTE0001", "data": { "itemType": "note" } },
			{ "key": "ANNO0001", "data": { "itemType": "annotation" } },
		]))
		.expect("children");
		let (attachments, notes, annotations) =
			classify_children(children).expect("classify");

		assert_eq!(attachments.len(), 1);
		assert_eq!(notes.len(), 1);
		assert_eq!(annotations.len(), 1);
	}

	#[test]
	fn unknown_child_type_is_fatal() {
		let children = serde_json::from_value(json!([
			{ "key": "XXXX0001", "data": { "itemType": "hologram" } },
		]))
		.expect("children");
		let result = classify_children(children);

		assert!(matches!(result, Err(Error::UnknownChildType { item_type }) if item_type == "hologram"));
	}
}
