//! Field derivation. Queries never see cached records directly: each item
//! is copied into an [`EnrichedItem`] restricted to the fields the query
//! touches, with the computed fields resolved on top.

use std::{
	collections::HashSet,
	sync::LazyLock,
};

use regex::Regex;
use serde_json::{Map, Value, json};

use bibq_domain::{
	RawItem,
	date,
	fields::{AUTHOR_ROLES, CITED_COUNT_FIELD, NOTE_FIELDS},
	library::Library,
};

use crate::filter::FilterSet;

static PAGES: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(\d+)(?:\s*[-–]+\s*(\d+))?$").expect("static pattern")
});

/// A per-query copy of one item. `data` holds the requested raw fields
/// plus the computed ones; the cached record stays untouched.
#[derive(Clone, Debug)]
pub struct EnrichedItem {
	pub key: String,
	pub data: Map<String, Value>,
}

impl EnrichedItem {
	pub fn get(&self, field: &str) -> &Value {
		self.data.get(field).unwrap_or(&Value::Null)
	}
}

/// Build the enriched copy of `item` carrying the fields in `afields`.
///
/// `filters` only matters for the citation walk: regex filters on
/// `collections` restrict which related records are counted.
pub fn enrich(
	item: &RawItem,
	afields: &HashSet<String>,
	library: &Library,
	filters: &FilterSet,
) -> EnrichedItem {
	let mut data = Map::new();

	for (field, value) in &item.data {
		if afields.contains(field) {
			data.insert(field.clone(), value.clone());
		}
	}

	data.insert(CITED_COUNT_FIELD.to_string(), json!(-1));
	apply_extra_lines(item, &mut data);

	if afields.contains("abstractShortNote") {
		data.insert(
			"abstractShortNote".to_string(),
			json!(short_abstract(item.str_field("abstractNote"))),
		);
	}
	if afields.contains("attachments") {
		let titles = library
			.children_of(&library.attachments, &item.key)
			.map(|attachment| attachment.str_field("title"))
			.collect::<Vec<_>>();

		data.insert("attachments".to_string(), json!(titles));
	}
	if afields.contains("authors") {
		let authors = item.creators_of(AUTHOR_ROLES).cloned().collect::<Vec<_>>();

		data.insert("authors".to_string(), Value::Array(authors));
	}
	if afields.contains("citations") || afields.contains("references") {
		let (citations, references) = count_relations(item, library, filters);

		data.insert("citations".to_string(), json!(citations));
		data.insert("references".to_string(), json!(references));
	}
	if afields.contains("collections") {
		let names = item
			.collection_keys()
			.iter()
			.filter_map(|key| library.collection_name(key))
			.collect::<Vec<_>>();

		data.insert("collections".to_string(), json!(names));
	}
	if afields.contains("editors") {
		let editors = item.creators_of(&["editor"]).cloned().collect::<Vec<_>>();

		data.insert("editors".to_string(), Value::Array(editors));
	}
	if afields.contains("firstAuthor") {
		let first = item.creators_of(AUTHOR_ROLES).next().cloned().unwrap_or(json!(""));

		data.insert("firstAuthor".to_string(), first);
	}
	if afields.contains("numAttachments") {
		let count = library.children_of(&library.attachments, &item.key).count();

		data.insert("numAttachments".to_string(), json!(count));
	}
	if afields.contains("numAuthors") {
		data.insert("numAuthors".to_string(), json!(item.creators_of(AUTHOR_ROLES).count()));
	}
	if afields.contains("numCreators") {
		data.insert("numCreators".to_string(), json!(item.creators().len()));
	}
	if afields.contains("numEditors") {
		data.insert("numEditors".to_string(), json!(item.creators_of(&["editor"]).count()));
	}
	if afields.contains("numNotes") {
		let count = library.children_of(&library.notes, &item.key).count();

		data.insert("numNotes".to_string(), json!(count));
	}
	if afields.contains("numAnnotations") {
		let count = library.children_of(&library.annotations, &item.key).count();

		data.insert("numAnnotations".to_string(), json!(count));
	}
	if afields.contains("numPages") {
		data.insert("numPages".to_string(), json!(page_count(item)));
	}
	if NOTE_FIELDS.iter().any(|field| afields.contains(*field)) {
		apply_note_fields(item, library, &mut data);
	}
	if afields.contains("year") {
		data.insert("year".to_string(), json!(date::year_of(item.date())));
	}

	EnrichedItem { key: item.key.clone(), data }
}

/// Overlay custom fields from the free-form `extra` raw field. Each line
/// has the shape `Name: value`; names never shadow real raw fields.
fn apply_extra_lines(item: &RawItem, data: &mut Map<String, Value>) {
	for line in item.str_field("extra").lines() {
		let Some((field, value)) = line.split_once(": ") else {
			continue;
		};
		let field = field.trim().to_lowercase();
		let value = value.trim();

		if item.data.contains_key(&field) {
			continue;
		}
		if field == CITED_COUNT_FIELD {
			if let Ok(count) = value.parse::<i64>() {
				data.insert(field, json!(count));
			}
		} else {
			data.insert(field, json!(value));
		}
	}
}

/// First sentence of the abstract, newlines removed, period restored.
fn short_abstract(text: &str) -> String {
	let mut end = text.len();
	let bytes = text.as_bytes();

	for (index, byte) in bytes.iter().enumerate() {
		if *byte == b'.'
			&& bytes.get(index + 1).is_none_or(|next| next.is_ascii_whitespace())
		{
			end = index;

			break;
		}
	}

	let mut sentence = text[..end].trim().replace(['\r', '\n'], "");

	sentence.push('.');

	sentence
}

/// Walk the item's relations and split them into citations (related record
/// dated after this item) and references (dated on or before). Regex
/// filters on `collections` restrict which related records count; keys that
/// do not resolve in the cache are skipped.
fn count_relations(item: &RawItem, library: &Library, filters: &FilterSet) -> (u64, u64) {
	let (mut citations, mut references) = (0, 0);
	let item_date = date::parse_or_sentinel(item.date());
	let collection_filters = filters.collection_regexes();

	for key in item.relation_keys() {
		let Some(target) = library.object(key) else {
			continue;
		};

		if !collection_filters.is_empty() {
			let names = target
				.collection_keys()
				.iter()
				.filter_map(|key| library.collection_name(key))
				.collect::<Vec<_>>()
				.join(", ");
			let kept = collection_filters
				.iter()
				.all(|(negate, pattern)| pattern.is_match(&names) != *negate);

			if !kept {
				continue;
			}
		}
		if date::parse_or_sentinel(target.date()) > item_date {
			citations += 1;
		} else {
			references += 1;
		}
	}

	(citations, references)
}

/// Page count from `numPages` or `pages`: single number, or a range whose
/// span is used. Zero and unparsable values map to -1.
fn page_count(item: &RawItem) -> i64 {
	let raw = [item.data.get("numPages"), item.data.get("pages")]
		.into_iter()
		.flatten()
		.find_map(page_field)
		.filter(|raw| !raw.is_empty())
		.unwrap_or_else(|| "0".to_string());
	let Some(captures) = PAGES.captures(&raw) else {
		tracing::warn!(pages = raw, "Bad pages value.");

		return -1;
	};
	let start = captures[1].parse::<i64>().unwrap_or(0);
	let end = captures.get(2).and_then(|end| end.as_str().parse::<i64>().ok()).unwrap_or(0);

	match (start - end).abs() {
		0 => -1,
		count => count,
	}
}

fn page_field(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.trim().to_string()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

/// Resolve the note-backed fields from the item's child notes. Each note's
/// text (HTML stripped) has the shape `Name: content`; unrecognized names
/// are ignored and unset fields stay empty.
fn apply_note_fields(item: &RawItem, library: &Library, data: &mut Map<String, Value>) {
	for field in NOTE_FIELDS {
		data.insert(field.to_string(), json!(""));
	}
	for note in library.children_of(&library.notes, &item.key) {
		let text = strip_html(note.str_field("note"));
		let Some((field, content)) = text.split_once(':') else {
			continue;
		};
		let field = field.trim().to_lowercase();

		if NOTE_FIELDS.contains(&field.as_str()) {
			data.insert(field, json!(content.trim()));
		}
	}
}

/// Drop HTML tags, keeping the text content.
fn strip_html(html: &str) -> String {
	let mut text = String::with_capacity(html.len());
	let mut in_tag = false;

	for character in html.chars() {
		match character {
			'<' => in_tag = true,
			'>' if in_tag => in_tag = false,
			_ if !in_tag => text.push(character),
			_ => {},
		}
	}

	text
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use serde_json::json;

	use bibq_testkit::{ItemBuilder, LibraryBuilder};

	use crate::{
		derive::{enrich, short_abstract, strip_html},
		filter::FilterSet,
	};

	fn afields(fields: &[&str]) -> HashSet<String> {
		fields.iter().map(|field| field.to_string()).collect()
	}

	#[test]
	fn raw_fields_are_restricted_to_the_requested_set() {
		let library = LibraryBuilder::new()
			.item(
				ItemBuilder::new("AAAA0001")
					.title("First")
					.field("url", json!("https://example.org"))
					.build(),
			)
			.build();
		let enriched = enrich(
			&library.items[0],
			&afields(&["title"]),
			&library,
			&FilterSet::default(),
		);

		assert_eq!(enriched.get("title"), &json!("First"));
		assert!(enriched.data.get("url").is_none());
	}

	#[test]
	fn extra_lines_set_custom_fields_without_shadowing() {
		let library = LibraryBuilder::new()
			.item(
				ItemBuilder::new("AAAA0001")
					.title("First")
					.field("extra", json!("ZSCC: 42\nTitle: shadowed\nVenue: USENIX"))
					.build(),
			)
			.build();
		let enriched = enrich(
			&library.items[0],
			&afields(&["title"]),
			&library,
			&FilterSet::default(),
		);

		assert_eq!(enriched.get("zscc"), &json!(42));
		assert_eq!(enriched.get("venue"), &json!("USENIX"));
		// "title" exists as a raw field, so the extra line is ignored.
		assert_eq!(enriched.get("title"), &json!("First"));
	}

	#[test]
	fn citations_and_references_split_on_relative_dates() {
		let library = LibraryBuilder::new()
			.item(
				ItemBuilder::new("AAAA0001")
					.title("Middle")
					.date("2020-01-01")
					.relations(&["BBBB0002", "CCCC0003", "DDDD0004"])
					.build(),
			)
			.item(ItemBuilder::new("BBBB0002").title("Earlier").date("2015-01-01").build())
			.item(ItemBuilder::new("CCCC0003").title("Later").date("2023-01-01").build())
			.build();
		let enriched = enrich(
			&library.items[0],
			&afields(&["citations", "references"]),
			&library,
			&FilterSet::default(),
		);

		// DDDD0004 does not resolve and is skipped.
		assert_eq!(enriched.get("citations"), &json!(1));
		assert_eq!(enriched.get("references"), &json!(1));
	}

	#[test]
	fn page_count_handles_single_values_and_ranges() {
		let cases = [
			(json!("7"), 7),
			(json!("100-110"), 10),
			(json!("100 – 110"), 10),
			(json!("0"), -1),
			(json!("vii"), -1),
		];

		for (pages, expected) in cases {
			let library = LibraryBuilder::new()
				.item(ItemBuilder::new("AAAA0001").field("pages", pages).build())
				.build();
			let enriched = enrich(
				&library.items[0],
				&afields(&["numPages"]),
				&library,
				&FilterSet::default(),
			);

			assert_eq!(enriched.get("numPages"), &json!(expected));
		}
	}

	#[test]
	fn note_fields_come_from_child_notes() {
		let library = LibraryBuilder::new()
			.item(ItemBuilder::new("AAAA0001").title("First").build())
			.note("AAAA0001", "<p>What: a fuzzing survey</p>")
			.note("AAAA0001", "<p>no marker here</p>")
			.build();
		let enriched = enrich(
			&library.items[0],
			&afields(&["what"]),
			&library,
			&FilterSet::default(),
		);

		assert_eq!(enriched.get("what"), &json!("a fuzzing survey"));
		assert_eq!(enriched.get("comments"), &json!(""));
	}

	#[test]
	fn year_degrades_to_the_sentinel() {
		let library = LibraryBuilder::new()
			.item(ItemBuilder::new("AAAA0001").date("2019-05-01").build())
			.item(ItemBuilder::new("BBBB0002").build())
			.build();
		let fields = afields(&["year"]);
		let dated = enrich(&library.items[0], &fields, &library, &FilterSet::default());
		let undated = enrich(&library.items[1], &fields, &library, &FilterSet::default());

		assert_eq!(dated.get("year"), &json!(2019));
		assert_eq!(undated.get("year"), &json!(1900));
	}

	#[test]
	fn short_abstract_keeps_the_first_sentence() {
		assert_eq!(short_abstract("One sentence. Another one."), "One sentence.");
		assert_eq!(short_abstract("Spans\ntwo lines. More."), "Spanstwo lines.");
		assert_eq!(short_abstract("No terminator"), "No terminator.");
		assert_eq!(short_abstract("v2.0 is faster. Details follow."), "v2.0 is faster.");
	}

	#[test]
	fn strip_html_keeps_text_content() {
		assert_eq!(strip_html("<p>What: <b>bold</b></p>"), "What: bold");
		assert_eq!(strip_html("plain"), "plain");
	}
}
