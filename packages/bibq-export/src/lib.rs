mod error;
mod line;
mod table;

pub use error::{Error, Result};
pub use line::{lower_title, render_lines};
pub use table::{Format, render};
