//! Named key sets persisted next to the cached data. Each marker comes as
//! a pair: the second name undoes the first (`read`/`unread`, ...).

use std::{
	collections::{BTreeMap, HashSet},
	fs,
	path::Path,
};

use bibq_engine::MarkSets;

use crate::error::{Error, Result};

/// Marker pairs: (canonical name, undoing name).
pub const MARKERS: &[(&str, &str)] =
	&[("read", "unread"), ("irrelevant", "relevant"), ("ignore", "unignore")];

/// Resolve a marker name to its canonical set name and whether it undoes.
pub fn resolve(marker: &str) -> Result<(&'static str, bool)> {
	for (canonical, undoing) in MARKERS {
		if marker == *canonical {
			return Ok((canonical, false));
		}
		if marker == *undoing {
			return Ok((canonical, true));
		}
	}

	Err(Error::UnknownMarker {
		marker: marker.to_string(),
		expected: MARKERS
			.iter()
			.flat_map(|(canonical, undoing)| [*canonical, *undoing])
			.collect::<Vec<_>>()
			.join("|"),
	})
}

#[derive(Debug, Default)]
pub struct Marks {
	sets: BTreeMap<String, HashSet<String>>,
}

impl Marks {
	/// Load from a JSON object of name -> key list; an absent file means no
	/// marks yet.
	pub fn load(path: &Path) -> Result<Self> {
		if !path.exists() {
			return Ok(Self::default());
		}

		let raw = fs::read_to_string(path)
			.map_err(|source| Error::ReadCache { path: path.to_path_buf(), source })?;
		let sets: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
			.map_err(|source| Error::ParseCache { path: path.to_path_buf(), source })?;

		Ok(Self {
			sets: sets
				.into_iter()
				.map(|(name, keys)| (name, keys.into_iter().collect()))
				.collect(),
		})
	}

	/// Persist as a JSON object of name -> sorted key list, dropping empty
	/// sets.
	pub fn save(&self, path: &Path) -> Result<()> {
		let sets = self
			.sets
			.iter()
			.filter(|(_, keys)| !keys.is_empty())
			.map(|(name, keys)| {
				let mut keys = keys.iter().cloned().collect::<Vec<_>>();

				keys.sort();

				(name.clone(), keys)
			})
			.collect::<BTreeMap<_, _>>();
		// Only fails on a non-string key type, which the map cannot hold.
		let raw = serde_json::to_string(&sets)
			.map_err(|source| Error::ParseCache { path: path.to_path_buf(), source })?;

		tracing::debug!(path = %path.display(), "Saving marks.");
		fs::write(path, raw).map_err(|source| Error::WriteMarks { path: path.to_path_buf(), source })
	}

	/// Apply a marker to a batch of keys; undoing markers remove instead of
	/// add. Returns the number of keys whose state actually changed.
	pub fn apply(&mut self, marker: &str, keys: &[String]) -> Result<usize> {
		let (canonical, undoing) = resolve(marker)?;
		let set = self.sets.entry(canonical.to_string()).or_default();
		let mut changed = 0;

		for key in keys {
			let done = if undoing {
				set.remove(key)
			} else {
				set.insert(key.clone())
			};

			if done {
				tracing::debug!(key, marker = canonical, undoing, "Mark updated.");

				changed += 1;
			}
		}

		Ok(changed)
	}
}

impl MarkSets for Marks {
	fn contains(&self, marker: &str, key: &str) -> bool {
		self.sets.get(marker).is_some_and(|keys| keys.contains(key))
	}
}

#[cfg(test)]
mod tests {
	use bibq_engine::MarkSets;

	use crate::{
		error::Error,
		marks::{Marks, resolve},
	};

	fn keys(names: &[&str]) -> Vec<String> {
		names.iter().map(|name| name.to_string()).collect()
	}

	#[test]
	fn resolve_maps_undoing_names_to_their_pair() {
		assert_eq!(resolve("read").expect("marker"), ("read", false));
		assert_eq!(resolve("unread").expect("marker"), ("read", true));
		assert_eq!(resolve("relevant").expect("marker"), ("irrelevant", true));
		assert!(matches!(resolve("starred"), Err(Error::UnknownMarker { .. })));
	}

	#[test]
	fn apply_adds_and_undoes() {
		let mut marks = Marks::default();

		assert_eq!(marks.apply("read", &keys(&["AAAA0001", "BBBB0002"])).expect("apply"), 2);
		assert!(marks.contains("read", "AAAA0001"));
		// Re-marking is a no-op.
		assert_eq!(marks.apply("read", &keys(&["AAAA0001"])).expect("apply"), 0);
		assert_eq!(marks.apply("unread", &keys(&["AAAA0001", "CCCC0003"])).expect("apply"), 1);
		assert!(!marks.contains("read", "AAAA0001"));
		assert!(marks.contains("read", "BBBB0002"));
	}

	#[test]
	fn save_drops_empty_sets_and_round_trips() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("marks.json");
		let mut marks = Marks::default();

		marks.apply("read", &keys(&["BBBB0002", "AAAA0001"])).expect("apply");
		marks.apply("ignore", &keys(&["CCCC0003"])).expect("apply");
		marks.apply("unignore", &keys(&["CCCC0003"])).expect("apply");
		marks.save(&path).expect("save");

		let raw = std::fs::read_to_string(&path).expect("read");

		assert_eq!(raw, r#"{"read":["AAAA0001","BBBB0002"]}"#);

		let reloaded = Marks::load(&path).expect("load");

		assert!(reloaded.contains("read", "AAAA0001"));
		assert!(!reloaded.contains("ignore", "CCCC0003"));
	}

	#[test]
	fn load_tolerates_an_absent_file() {
		let dir = tempfile::tempdir().expect("tempdir");
		let marks = Marks::load(&dir.path().join("marks.json")).expect("load");

		assert!(!marks.contains("read", "AAAA0001"));
	}
}
