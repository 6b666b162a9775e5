//! The query pipeline: field selection, filtering, optional ranking,
//! limiting, sorting and row formatting, in that order.

use std::collections::{HashMap, HashSet};

use serde_json::{Value, json};

use bibq_domain::{Library, format_value, header, sort_key};

use crate::{
	derive::{EnrichedItem, enrich},
	error::{Error, Result},
	filter::FilterSet,
	rank::{self, RankingOptions},
};

/// Fields the ranking pass needs besides the requested ones.
const RANK_DEPENDENT_FIELDS: &[&str] =
	&["rank", "title", "citations", "references", "year", "zscc"];

/// Named key sets maintained outside the cached data. Queries only ever
/// ask whether a key belongs to a set.
pub trait MarkSets {
	fn contains(&self, marker: &str, key: &str) -> bool;
}

/// No marks at all.
impl MarkSets for () {
	fn contains(&self, _: &str, _: &str) -> bool {
		false
	}
}

#[derive(Clone, Debug, Default)]
pub struct QuerySpec {
	/// Output columns; the first one drives the default sort. A `rank^N`
	/// entry sets the damping order, `rank*` disables damping.
	pub fields: Vec<String>,
	/// `[~]field:expression` filters, all of which must hold.
	pub filters: Vec<String>,
	/// Sort field; defaults to the first output column.
	pub sort: Option<String>,
	pub descending: bool,
	/// `[[<|>]field:]N` row cap, applied before the final sort.
	pub limit: Option<String>,
	/// Include ignored and irrelevant items.
	pub force: bool,
	pub ranking: RankingOptions,
}

#[derive(Clone, Debug, Default)]
pub struct QueryOutput {
	pub headers: Vec<String>,
	pub rows: Vec<Vec<String>>,
	/// Scores by key; empty unless the query involved ranking.
	pub ranks: HashMap<String, f64>,
}

/// Run a query over the library.
pub fn run(library: &Library, marks: &impl MarkSets, spec: &QuerySpec) -> Result<QueryOutput> {
	let mut fields = spec.fields.clone();
	let mut ranking = spec.ranking;

	apply_rank_token(&mut fields, &mut ranking);

	let Some(first_field) = fields.first() else {
		return Ok(QueryOutput::default());
	};
	let sort = spec.sort.clone().unwrap_or_else(|| first_field.clone());
	let limit = expand_limit(spec.limit.as_deref(), &sort, spec.descending, &mut ranking)?;
	let filters = FilterSet::compile(&spec.filters, library)?;
	let rank_involved = fields.iter().any(|field| field == "rank")
		|| sort == "rank"
		|| limit.field == "rank"
		|| filters.references_rank();
	let mut ffields = fields.clone();

	push_missing(&mut ffields, &sort);

	if rank_involved {
		for field in RANK_DEPENDENT_FIELDS {
			push_missing(&mut ffields, field);
		}
	}

	push_missing(&mut ffields, &limit.field);
	validate_fields(&ffields, library)?;
	tracing::debug!(fields = ffields.join("|"), "Selected fields.");

	let afields = ffields
		.iter()
		.cloned()
		.chain(filters.fields().map(str::to_string))
		.collect::<HashSet<_>>();
	// Rank predicates cannot run before ranks exist; every other filter
	// narrows the candidate set first.
	let mut items = select_with(
		library,
		marks,
		&afields,
		&filters.without_rank(),
		&HashMap::new(),
		spec.force,
	);

	if items.is_empty() {
		tracing::info!("No data.");

		return Ok(QueryOutput { headers: headers_of(&fields), ..Default::default() });
	}

	let mut ranks = HashMap::new();

	if rank_involved {
		tracing::debug!("Computing ranks...");

		ranks = rank::compute(&items, library, ranking);
		items = select_with(library, marks, &afields, &filters, &ranks, spec.force);

		for item in &mut items {
			let score = ranks.get(&item.key).copied().unwrap_or_default();

			item.data.insert("rank".to_string(), json!(score));
		}

		if items.is_empty() {
			tracing::info!("No data.");

			return Ok(QueryOutput { headers: headers_of(&fields), ranks, ..Default::default() });
		}
	}
	if !spec.force {
		items.retain(|item| !marks.contains("irrelevant", &item.key));
	}
	if let Some(count) = limit.count {
		items.sort_by_key(|item| {
			sort_key(item.data.get(&limit.field).unwrap_or(&Value::Null), &limit.field)
		});

		if limit.descending {
			items.reverse();
		}

		tracing::debug!(count, field = limit.field, "Limiting items.");
		items.truncate(count);
	}

	let fallback = Value::String("-".to_string());

	items.sort_by_key(|item| sort_key(item.data.get(&sort).unwrap_or(&fallback), &sort));

	let mut rows = Vec::with_capacity(items.len());

	for item in &items {
		let row = fields
			.iter()
			.map(|field| {
				let value = item.get(field);

				if truthy(value) { format_value(value, field) } else { "-".to_string() }
			})
			.collect::<Vec<_>>();

		// A row whose only content is its key carries no information.
		if row.len() > 1 && row[1..].iter().all(|cell| ".-".contains(cell.as_str())) {
			continue;
		}

		rows.push(row);
	}

	if spec.descending {
		rows.reverse();
	}

	Ok(QueryOutput { headers: headers_of(&fields), rows, ranks })
}

/// Keys of the items a mark operation targets: the usual pipeline with a
/// single key column, mark-based exclusions disabled.
pub fn candidate_keys(
	library: &Library,
	marks: &impl MarkSets,
	spec: &QuerySpec,
) -> Result<Vec<String>> {
	let spec = QuerySpec { fields: vec!["key".to_string()], force: true, ..spec.clone() };

	Ok(run(library, marks, &spec)?
		.rows
		.into_iter()
		.filter_map(|row| row.into_iter().next())
		.collect())
}

/// Filter pass without the table stage: enriched items carrying `fields`,
/// matching `filters`, in library order. Rank predicates see a zero score
/// for every item here.
pub fn select(
	library: &Library,
	marks: &impl MarkSets,
	fields: &[String],
	filters: &[String],
	force: bool,
) -> Result<Vec<EnrichedItem>> {
	let filters = FilterSet::compile(filters, library)?;

	validate_fields(fields, library)?;

	let afields = fields
		.iter()
		.cloned()
		.chain(filters.fields().map(str::to_string))
		.collect::<HashSet<_>>();

	Ok(select_with(library, marks, &afields, &filters, &HashMap::new(), force))
}

fn select_with(
	library: &Library,
	marks: &impl MarkSets,
	afields: &HashSet<String>,
	filters: &FilterSet,
	ranks: &HashMap<String, f64>,
	force: bool,
) -> Vec<EnrichedItem> {
	library
		.items
		.iter()
		.map(|item| enrich(item, afields, library, filters))
		.filter(|item| filters.matches(item, ranks))
		.filter(|item| force || !marks.contains("ignore", &item.key))
		.collect()
}

/// Replace the first `rank^N`/`rank*` field entry with plain `rank`,
/// adjusting the ranking options accordingly.
fn apply_rank_token(fields: &mut [String], ranking: &mut RankingOptions) {
	for field in fields {
		let Some(token) = field.strip_prefix("rank") else {
			continue;
		};

		if token == "*" {
			ranking.age_damping = false;
		} else {
			match token.strip_prefix('^').and_then(|order| order.parse::<i32>().ok()) {
				Some(order) if (1..=9).contains(&order) => ranking.order = order,
				_ => continue,
			}
		}

		*field = "rank".to_string();

		break;
	}
}

struct LimitSpec {
	count: Option<usize>,
	field: String,
	descending: bool,
}

/// Expand a `[[<|>]field:]N` limit. The optional field overrides the sort
/// field for the cap only; `<`/`>` override the direction; `rank*` caps on
/// the undamped rank and `rank^K` on the rank damped with order `K`.
fn expand_limit(
	raw: Option<&str>,
	sort: &str,
	descending: bool,
	ranking: &mut RankingOptions,
) -> Result<LimitSpec> {
	let Some(raw) = raw else {
		return Ok(LimitSpec { count: None, field: sort.to_string(), descending });
	};
	let mut field = sort.to_string();
	let mut direction = descending;
	let count = match raw.split_once(':') {
		Some((field_part, count_part)) => {
			let mut field_part = field_part.trim();

			if let Some(rest) = field_part.strip_prefix(['<', '>']) {
				direction = field_part.starts_with('>');
				field_part = rest;
			}
			if field_part == "rank*" {
				ranking.age_damping = false;
				field_part = "rank";
			} else if let Some(order) = field_part
				.strip_prefix("rank^")
				.and_then(|order| order.parse::<i32>().ok())
				.filter(|order| (1..=9).contains(order))
			{
				ranking.order = order;
				field_part = "rank";
			}
			if !field_part.is_empty() {
				field = field_part.to_string();
			}

			count_part
		},
		None => raw,
	};
	let count = count
		.parse::<usize>()
		.ok()
		.filter(|count| *count > 0)
		.ok_or_else(|| Error::BadLimit { raw: raw.to_string() })?;

	Ok(LimitSpec { count: Some(count), field, descending: direction })
}

fn push_missing(fields: &mut Vec<String>, field: &str) {
	if !fields.iter().any(|known| known == field) {
		fields.push(field.to_string());
	}
}

fn validate_fields(fields: &[String], library: &Library) -> Result<()> {
	for field in fields {
		if !library.is_valid_field(field) {
			tracing::warn!(
				field,
				"Got an unknown field name; should be one of:\n- {}",
				library.sorted_fields().join("\n- "),
			);

			return Err(Error::UnknownField { field: field.clone() });
		}
	}

	Ok(())
}

fn headers_of(fields: &[String]) -> Vec<String> {
	fields.iter().map(|field| header(field)).collect()
}

/// Unset-ness for output purposes: null, empty and zero values all render
/// as the placeholder.
fn truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(boolean) => *boolean,
		Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.),
		Value::String(text) => !text.is_empty(),
		Value::Array(entries) => !entries.is_empty(),
		Value::Object(entries) => !entries.is_empty(),
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		query::{QuerySpec, expand_limit, run},
		rank::RankingOptions,
	};

	use bibq_testkit::{ItemBuilder, LibraryBuilder};

	#[test]
	fn expand_limit_accepts_all_shapes() {
		let mut ranking = RankingOptions::default();
		let plain = expand_limit(Some("10"), "year", false, &mut ranking).expect("plain");

		assert_eq!(plain.count, Some(10));
		assert_eq!(plain.field, "year");
		assert!(!plain.descending);

		let fielded = expand_limit(Some(">rank:5"), "year", false, &mut ranking).expect("fielded");

		assert_eq!(fielded.count, Some(5));
		assert_eq!(fielded.field, "rank");
		assert!(fielded.descending);
		assert!(ranking.age_damping);

		let strict = expand_limit(Some("rank*:5"), "year", false, &mut ranking).expect("strict");

		assert_eq!(strict.field, "rank");
		assert!(!ranking.age_damping);

		let mut ranking = RankingOptions::default();
		let ordered =
			expand_limit(Some(">rank^2:1"), "year", false, &mut ranking).expect("ordered");

		assert_eq!(ordered.count, Some(1));
		assert_eq!(ordered.field, "rank");
		assert!(ordered.descending);
		assert_eq!(ranking.order, 2);
		assert!(ranking.age_damping);

		// Out-of-range orders are not a token and fail field validation later.
		let mut ranking = RankingOptions::default();
		let bogus =
			expand_limit(Some("rank^12:1"), "year", false, &mut ranking).expect("parses");

		assert_eq!(bogus.field, "rank^12");
		assert_eq!(ranking.order, 3);
	}

	#[test]
	fn expand_limit_rejects_non_positive_counts() {
		let mut ranking = RankingOptions::default();

		for raw in ["0", "-3", "ten", "year:"] {
			assert!(expand_limit(Some(raw), "year", false, &mut ranking).is_err(), "{raw}");
		}
	}

	#[test]
	fn rows_with_no_content_beyond_the_key_are_dropped() {
		let library = LibraryBuilder::new()
			.item(ItemBuilder::new("AAAA0001").title("Kept").field("url", serde_json::json!("https://example.org")).build())
			.item(ItemBuilder::new("BBBB0002").title("Dropped").build())
			.build();
		let output = run(
			&library,
			&(),
			&QuerySpec {
				fields: vec!["key".to_string(), "url".to_string()],
				..Default::default()
			},
		)
		.expect("query");

		assert_eq!(output.rows.len(), 1);
		assert_eq!(output.rows[0][0], "AAAA0001");
	}
}
