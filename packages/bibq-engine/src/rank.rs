//! Relation-graph ranking. Scores flow along "related item" links from
//! newer records back to the older records they build on, then an age
//! damping factor and a max-normalization are applied.

use std::collections::HashMap;

use time::OffsetDateTime;

use bibq_domain::{Library, date};

use crate::derive::EnrichedItem;

#[derive(Clone, Copy, Debug)]
pub struct RankingOptions {
	/// Weigh scores by item age before normalizing.
	pub age_damping: bool,
	/// Exponent of the damping curve.
	pub order: i32,
}

impl Default for RankingOptions {
	fn default() -> Self {
		Self { age_damping: true, order: 3 }
	}
}

/// Compute a score in [0, 1] for every candidate.
///
/// Undated items keep a zero score throughout. For the others, each pass
/// reseeds the score to 1 when the item links to at least one candidate,
/// then adds, for every linked candidate that is not older, that
/// candidate's current score split across its reference count. Passes
/// update scores in place, in candidate order, and stop as soon as a pass
/// leaves the score vector bit-identical; the candidate count bounds the
/// number of passes.
pub fn compute(
	items: &[EnrichedItem],
	library: &Library,
	options: RankingOptions,
) -> HashMap<String, f64> {
	if items.is_empty() {
		return HashMap::new();
	}

	let index = items
		.iter()
		.enumerate()
		.map(|(position, item)| (item.key.as_str(), position))
		.collect::<HashMap<_, _>>();
	let raw_dates = items
		.iter()
		.map(|item| {
			library
				.object(&item.key)
				.map_or_else(date::sentinel, |raw| date::parse_or_sentinel(raw.date()))
		})
		.collect::<Vec<_>>();
	// Links resolved to candidate positions; everything else is invisible
	// to the ranking.
	let links = items
		.iter()
		.map(|item| {
			library
				.object(&item.key)
				.map(|raw| {
					raw.relation_keys()
						.iter()
						.filter_map(|key| index.get(key).copied())
						.collect::<Vec<_>>()
				})
				.unwrap_or_default()
		})
		.collect::<Vec<_>>();
	let count = items.len();
	let mut scores = items
		.iter()
		.map(|item| if year(item) > date::SENTINEL_YEAR { 1. / count as f64 } else { 0. })
		.collect::<Vec<_>>();

	for pass in 0..count {
		let previous = scores.clone();

		for position in 0..count {
			if year(&items[position]) == date::SENTINEL_YEAR {
				continue;
			}

			scores[position] = if links[position].is_empty() { 0. } else { 1. };

			for &linked in &links[position] {
				if raw_dates[position] <= raw_dates[linked] {
					let references = reference_count(&items[linked]);

					if references > 0 {
						scores[position] += scores[linked] / references as f64;
					}
				}
			}
		}

		if scores == previous {
			tracing::debug!(passes = pass, "Ranking converged.");

			break;
		}
	}

	if options.age_damping {
		apply_age_damping(&mut scores, &raw_dates, options.order);
	}

	let max = scores.iter().copied().fold(0., f64::max);

	for score in &mut scores {
		*score = if max == 0. { 0. } else { *score / max };
	}

	items.iter().zip(scores).map(|(item, score)| (item.key.clone(), score)).collect()
}

/// Scale each score by `((ts - min') / (max - min'))^order` over the
/// candidates' dates, where `min'` is the minimum shifted down by a tenth
/// of the span (at least one second) so the oldest dated item keeps a
/// nonzero factor. Undated items are left out of the span; when no
/// candidate is dated the damping step is skipped.
fn apply_age_damping(scores: &mut [f64], raw_dates: &[OffsetDateTime], order: i32) {
	let sentinel = date::sentinel();
	let timestamps = raw_dates
		.iter()
		.filter(|stamp| **stamp != sentinel)
		.map(|stamp| stamp.unix_timestamp() as f64)
		.collect::<Vec<_>>();
	let Some(max) = timestamps.iter().copied().reduce(f64::max) else {
		return;
	};
	// reduce only fails on an empty set, handled above
	let min = timestamps.iter().copied().reduce(f64::min).unwrap_or(max);
	let shifted_min = min - ((max - min) / 10.).floor().max(1.);
	let span = max - shifted_min;

	for (score, stamp) in scores.iter_mut().zip(raw_dates) {
		let factor = ((stamp.unix_timestamp() as f64 - shifted_min) / span).powi(order);

		*score *= factor;
	}
}

fn year(item: &EnrichedItem) -> i32 {
	item.get("year").as_i64().map_or(date::SENTINEL_YEAR, |year| year as i32)
}

fn reference_count(item: &EnrichedItem) -> i64 {
	item.get("references").as_i64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use bibq_domain::Library;
	use bibq_testkit::{ItemBuilder, LibraryBuilder};

	use crate::{
		derive::{EnrichedItem, enrich},
		filter::FilterSet,
		rank::{RankingOptions, compute},
	};

	const DEPENDENT_FIELDS: &[&str] =
		&["rank", "title", "citations", "references", "year", "zscc"];

	fn chain() -> Library {
		// CCCC0003 (2022) builds on BBBB0002 (2018), which builds on
		// AAAA0001 (2014); UNDATED00 links in but carries no date.
		LibraryBuilder::new()
			.item(ItemBuilder::new("AAAA0001").title("Root").date("2014-01-01").build())
			.item(
				ItemBuilder::new("BBBB0002")
					.title("Middle")
					.date("2018-01-01")
					.relations(&["AAAA0001"])
					.build(),
			)
			.item(
				ItemBuilder::new("CCCC0003")
					.title("Tip")
					.date("2022-01-01")
					.relations(&["BBBB0002"])
					.build(),
			)
			.item(ItemBuilder::new("UNDATED00").title("Undated").relations(&["AAAA0001"]).build())
			.build()
	}

	fn candidates(library: &Library) -> Vec<EnrichedItem> {
		let afields = DEPENDENT_FIELDS
			.iter()
			.map(|field| field.to_string())
			.collect::<HashSet<_>>();

		library
			.items
			.iter()
			.map(|item| enrich(item, &afields, library, &FilterSet::default()))
			.collect()
	}

	#[test]
	fn scores_stay_within_bounds_and_max_out_at_one() {
		let library = chain();
		let ranks = compute(&candidates(&library), &library, RankingOptions::default());

		assert_eq!(ranks.len(), 4);

		for score in ranks.values() {
			assert!((0. ..=1.).contains(score), "score {score} out of bounds");
		}

		assert!(ranks.values().any(|score| *score == 1.));
	}

	#[test]
	fn undated_items_score_zero() {
		let library = chain();
		let ranks = compute(&candidates(&library), &library, RankingOptions::default());

		assert_eq!(ranks["UNDATED00"], 0.);
	}

	#[test]
	fn unlinked_candidates_score_zero() {
		let library = chain();
		let ranks = compute(&candidates(&library), &library, RankingOptions::default());

		// The root links to nothing in the candidate set.
		assert_eq!(ranks["AAAA0001"], 0.);
	}

	#[test]
	fn ranking_is_deterministic() {
		let library = chain();
		let items = candidates(&library);
		let first = compute(&items, &library, RankingOptions::default());
		let second = compute(&items, &library, RankingOptions::default());

		assert_eq!(first, second);
	}

	#[test]
	fn newer_to_older_graphs_settle_immediately() {
		// Every relation points from a newer record back to an older one, so
		// no score flows between items and the first pass is already the
		// fixed point: 1 for dated items with a resolved link, 0 otherwise.
		let library = LibraryBuilder::new()
			.item(ItemBuilder::new("AAAA0001").title("Oldest").date("2014-01-01").build())
			.item(
				ItemBuilder::new("BBBB0002")
					.title("Middle")
					.date("2018-01-01")
					.relations(&["AAAA0001"])
					.build(),
			)
			.item(
				ItemBuilder::new("CCCC0003")
					.title("Newest")
					.date("2021-01-01")
					.relations(&["BBBB0002"])
					.build(),
			)
			.build();
		let ranks = compute(
			&candidates(&library),
			&library,
			RankingOptions { age_damping: false, order: 3 },
		);

		assert_eq!(ranks["AAAA0001"], 0.);
		assert_eq!(ranks["BBBB0002"], 1.);
		assert_eq!(ranks["CCCC0003"], 1.);
	}

	#[test]
	fn damping_favors_recent_items_with_equal_link_structure() {
		// Two tips with one reference each; the newer one must outrank the
		// older one once age damping applies.
		let library = LibraryBuilder::new()
			.item(ItemBuilder::new("AAAA0001").title("Root").date("2010-01-01").build())
			.item(
				ItemBuilder::new("BBBB0002")
					.title("Old tip")
					.date("2012-01-01")
					.relations(&["AAAA0001"])
					.build(),
			)
			.item(
				ItemBuilder::new("CCCC0003")
					.title("New tip")
					.date("2024-01-01")
					.relations(&["AAAA0001"])
					.build(),
			)
			.build();
		let damped = compute(&candidates(&library), &library, RankingOptions::default());
		let strict = compute(
			&candidates(&library),
			&library,
			RankingOptions { age_damping: false, order: 3 },
		);

		assert!(damped["CCCC0003"] > damped["BBBB0002"]);
		assert_eq!(strict["CCCC0003"], strict["BBBB0002"]);
	}

	#[test]
	fn cited_items_collect_score_from_their_citers() {
		// Relations are recorded on both records; the older side of the
		// pair collects score from the newer one.
		let library = LibraryBuilder::new()
			.item(
				ItemBuilder::new("AAAA0001")
					.title("Cited")
					.date("2014-01-01")
					.relations(&["BBBB0002"])
					.build(),
			)
			.item(
				ItemBuilder::new("BBBB0002")
					.title("Citer")
					.date("2018-01-01")
					.relations(&["AAAA0001"])
					.build(),
			)
			.build();
		let ranks = compute(
			&candidates(&library),
			&library,
			RankingOptions { age_damping: false, order: 3 },
		);

		assert_eq!(ranks["AAAA0001"], 1.);
		assert_eq!(ranks["BBBB0002"], 0.5);
	}

	#[test]
	fn all_undated_candidates_normalize_to_zero() {
		let library = LibraryBuilder::new()
			.item(ItemBuilder::new("AAAA0001").title("First").build())
			.item(ItemBuilder::new("BBBB0002").title("Second").relations(&["AAAA0001"]).build())
			.build();
		let ranks = compute(&candidates(&library), &library, RankingOptions::default());

		assert!(ranks.values().all(|score| *score == 0.));
	}
}
