pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Input errors abort the current query with no partial output; the cached
/// data is never touched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Bad filter '{raw}'; format: [~][field]:[regex]")]
	BadFilter { raw: String },
	#[error("Regex for filter on field '{field}' is empty.")]
	EmptyFilter { field: String },
	#[error("Bad comparison '{expression}' for field '{field}'.")]
	BadComparison { field: String, expression: String },
	#[error("Bad regex '{pattern}' for field '{field}'.")]
	BadRegex { field: String, pattern: String, source: regex::Error },
	#[error("Bad field name '{field}'.")]
	UnknownField { field: String },
	#[error("Tag '{tag}' does not exist.")]
	UnknownTag { tag: String },
	#[error("Bad limit '{raw}'; should be a positive integer.")]
	BadLimit { raw: String },
}
