mod cache;
mod error;
mod marks;

pub use cache::{CacheDir, OBJECT_FILES, classify_children};
pub use error::{Error, Result};
pub use marks::{MARKERS, Marks, resolve};
