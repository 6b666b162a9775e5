pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unknown output format '{format}' (should be one of: csv|json|md).")]
	UnknownFormat { format: String },
}
