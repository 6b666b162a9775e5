use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	#[serde(default = "default_cache_dir")]
	pub cache_dir: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default)]
	pub ranking: Ranking,
	/// Named query shorthands; the built-in ones are always available.
	#[serde(default)]
	pub presets: HashMap<String, Preset>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			cache_dir: default_cache_dir(),
			log_level: default_log_level(),
			ranking: Ranking::default(),
			presets: builtin_presets(),
		}
	}
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Ranking {
	/// Exponent of the age damping curve.
	#[serde(default = "default_order")]
	pub order: i32,
}

impl Default for Ranking {
	fn default() -> Self {
		Self { order: default_order() }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Preset {
	#[serde(default)]
	pub fields: Vec<String>,
	#[serde(default)]
	pub filters: Vec<String>,
	pub sort: Option<String>,
	pub limit: Option<String>,
}

pub(crate) fn builtin_presets() -> HashMap<String, Preset> {
	let top = |count: &str| Preset {
		fields: owned(&["year", "title", "numPages", "itemType"]),
		filters: Vec::new(),
		sort: Some(">date".to_string()),
		limit: Some(format!(">rank:{count}")),
	};

	HashMap::from([
		("no-attachment".to_string(), Preset {
			fields: owned(&["title"]),
			filters: owned(&["numAttachments:0"]),
			sort: None,
			limit: None,
		}),
		("no-url".to_string(), Preset {
			fields: owned(&["year", "title"]),
			filters: owned(&["url:<empty>"]),
			sort: Some("year".to_string()),
			limit: None,
		}),
		("top-10-most-relevants".to_string(), top("10")),
		("top-50-most-relevants".to_string(), top("50")),
	])
}

fn owned(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}

fn default_cache_dir() -> String {
	"~/.bibq/cache".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_order() -> i32 {
	3
}
