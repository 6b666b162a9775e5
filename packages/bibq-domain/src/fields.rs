//! Field catalog: which fields exist beyond the raw record, and how each
//! field class is compared, filtered and formatted.

/// Integer-class fields. `rank` is listed here for sorting/formatting even
/// though its value is a float score.
pub const INTEGER_FIELDS: &[&str] = &[
	"callNumber",
	"citations",
	"numAttachments",
	"numAuthors",
	"numCreators",
	"numEditors",
	"numNotes",
	"numAnnotations",
	"numPages",
	"rank",
	"references",
	"year",
	"zscc",
];

/// Keys recognized inside child notes (`key: value` bodies).
pub const NOTE_FIELDS: &[&str] = &["comments", "results", "what"];

/// Derived fields that never exist on the raw record.
pub const COMPUTED_FIELDS: &[&str] =
	&["abstractShortNote", "attachments", "authors", "editors", "firstAuthor", "selected"];

/// Fields whose values are person mappings (`name` or `lastName`/`firstName`).
pub const PERSON_FIELDS: &[&str] = &["authors", "creators", "editors", "firstAuthor"];

/// Creator roles counted as authors.
pub const AUTHOR_ROLES: &[&str] = &["author", "presenter"];

/// The `extra`-note key overriding the cached citation count.
pub const CITED_COUNT_FIELD: &str = "zscc";

/// Comparison dispatch class for a field name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldClass {
	Date,
	Integer,
	Tags,
	Title,
	Text,
}

pub fn classify(field: &str) -> FieldClass {
	if field.starts_with("date") || field.ends_with("Date") {
		FieldClass::Date
	} else if field == "tags" {
		FieldClass::Tags
	} else if field == "title" {
		FieldClass::Title
	} else if INTEGER_FIELDS.contains(&field) {
		FieldClass::Integer
	} else {
		FieldClass::Text
	}
}

/// Column label for a field: a fixed alias when one exists, `numX` fields as
/// `#X`, first letter uppercased otherwise.
pub fn header(field: &str) -> String {
	let aliased = match field {
		"itemType" => "Type".to_string(),
		"what" => "What ?".to_string(),
		"zscc" => "#Cited".to_string(),
		_ => match field.strip_prefix("num") {
			Some(rest) if rest.starts_with(|c: char| c.is_ascii_uppercase()) =>
				format!("#{rest}"),
			_ => field.to_string(),
		},
	};
	let mut chars = aliased.chars();

	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => aliased,
	}
}
