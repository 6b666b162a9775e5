pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read cache file at {path:?}.")]
	ReadCache { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse cache file at {path:?}.")]
	ParseCache { path: std::path::PathBuf, source: serde_json::Error },
	#[error("Failed to write marks file at {path:?}.")]
	WriteMarks { path: std::path::PathBuf, source: std::io::Error },
	#[error("Unknown item type '{item_type}'.")]
	UnknownChildType { item_type: String },
	#[error("Bad marker '{marker}' (should be one of: {expected}).")]
	UnknownMarker { marker: String, expected: String },
}
