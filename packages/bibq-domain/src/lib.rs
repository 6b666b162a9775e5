pub mod date;
pub mod fields;
pub mod format;
pub mod item;
pub mod library;
pub mod sort_key;

pub use fields::{FieldClass, classify, header};
pub use format::format_value;
pub use item::RawItem;
pub use library::{Library, LibraryData};
pub use sort_key::{SortKey, sort_key};
