pub mod derive;
pub mod error;
pub mod filter;
pub mod query;
pub mod rank;

pub use derive::{EnrichedItem, enrich};
pub use error::{Error, Result};
pub use filter::FilterSet;
pub use query::{MarkSets, QueryOutput, QuerySpec, candidate_keys, run, select};
pub use rank::RankingOptions;
