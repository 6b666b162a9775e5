mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Preset, Ranking};

use std::{env, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Load a config file, or fall back to the defaults when there is none.
pub fn load_or_default(path: &Path) -> Result<Config> {
	if path.exists() {
		load(path)
	} else {
		let mut cfg = Config::default();

		normalize(&mut cfg);

		Ok(cfg)
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.log_level.trim().is_empty() {
		return Err(Error::Validation { message: "log_level must be non-empty.".to_string() });
	}
	if !(1..=9).contains(&cfg.ranking.order) {
		return Err(Error::Validation {
			message: "ranking.order must be between 1 and 9.".to_string(),
		});
	}

	for (name, preset) in &cfg.presets {
		if preset.fields.is_empty() {
			return Err(Error::Validation {
				message: format!("presets.{name}.fields must be non-empty."),
			});
		}
		if let Some(limit) = &preset.limit
			&& !limit_is_well_formed(limit)
		{
			return Err(Error::Validation {
				message: format!(
					"presets.{name}.limit must end in a positive integer, got '{limit}'.",
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if let Some(rest) = cfg.cache_dir.strip_prefix("~")
		&& (rest.is_empty() || rest.starts_with('/'))
		&& let Ok(home) = env::var("HOME")
	{
		cfg.cache_dir = format!("{home}{rest}");
	}

	// User presets extend the built-in table; same-named entries win.
	for (name, preset) in types::builtin_presets() {
		cfg.presets.entry(name).or_insert(preset);
	}
}

fn limit_is_well_formed(limit: &str) -> bool {
	let tail = limit.split_once(':').map_or(limit, |(_, tail)| tail);

	tail.parse::<usize>().is_ok_and(|count| count > 0)
}
