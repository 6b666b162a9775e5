//! One function per subcommand, each wiring the query pipeline to the
//! terminal or an export file.

use std::{
	collections::{BTreeMap, HashSet},
	fs,
};

use color_eyre::eyre::{self, eyre};

use bibq_domain::{Library, date, header, sort_key};
use bibq_engine::{QuerySpec, candidate_keys, run, select};
use bibq_export::{Format, render, render_lines};
use bibq_store::{CacheDir, Marks};

const CHARTS: &[&str] = &["software-in-time"];

pub fn count(library: &Library, marks: &Marks, spec: &QuerySpec) -> eyre::Result<()> {
	let spec = QuerySpec { fields: vec!["title".to_string()], ..spec.clone() };
	let output = run(library, marks, &spec)?;

	println!("{}", output.rows.len());

	Ok(())
}

pub fn show(library: &Library, marks: &Marks, spec: &QuerySpec) -> eyre::Result<()> {
	// The key column always takes part in the query so marks and row
	// dropping see it; it only stays in the output when asked for.
	let output_key = spec.fields.iter().any(|field| field == "key");
	let mut spec = spec.clone();

	if !output_key {
		spec.fields.insert(0, "key".to_string());
	}

	let mut output = run(library, marks, &spec)?;

	if !output_key {
		output.headers.remove(0);

		for row in &mut output.rows {
			row.remove(0);
		}
	}
	if !output.headers.is_empty() {
		println!("{}", render(Format::Md, &output.headers, &output.rows));
	}

	Ok(())
}

pub fn list(
	library: &Library,
	marks: &Marks,
	spec: &QuerySpec,
	field: &str,
	desc: bool,
	limit: Option<usize>,
) -> eyre::Result<()> {
	let values = match field {
		"collections" => {
			tracing::warn!("Filters are not applicable to field: collections");

			library
				.collections
				.iter()
				.map(|collection| collection.str_field("name").to_string())
				.collect()
		},
		"fields" => {
			tracing::warn!("Filters are not applicable to field: fields");

			library.valid_fields().to_vec()
		},
		_ => {
			let items =
				select(library, marks, &[field.to_string()], &spec.filters, spec.force)?;
			let mut values = items
				.iter()
				.map(|item| bibq_domain::format_value(item.get(field), field))
				.collect::<Vec<_>>();

			// Multi-valued fields list their parts, not the joined cell.
			match field {
				"attachments" | "tags" => {
					values = values
						.iter()
						.flat_map(|value| value.split(';'))
						.map(str::to_string)
						.collect();
				},
				"authors" | "creators" | "editors" => {
					values = values
						.iter()
						.flat_map(|value| value.split(", "))
						.map(str::to_string)
						.collect();
				},
				_ => {},
			}

			values
		},
	};

	if values.is_empty() {
		return Ok(());
	}

	let mut values = values
		.into_iter()
		.filter(|value| value != "-" && !value.is_empty())
		.collect::<HashSet<_>>()
		.into_iter()
		.collect::<Vec<_>>();

	values.sort_by_key(|value| sort_key(&serde_json::Value::String(value.clone()), field));

	if desc {
		values.reverse();
	}
	if let Some(limit) = limit {
		values.truncate(limit);
	}

	let rows = values.into_iter().map(|value| vec![value]).collect::<Vec<_>>();

	println!("{}", render(Format::Md, &[header(field)], &rows));

	Ok(())
}

pub fn mark(
	library: &Library,
	mut marks: Marks,
	cache: &CacheDir,
	spec: &QuerySpec,
	marker: &str,
) -> eyre::Result<()> {
	// Items without pages are reference stubs; marking them makes no sense.
	let mut spec = spec.clone();

	spec.filters.push("numPages:>0".to_string());

	let keys = candidate_keys(library, &marks, &spec)?;
	let changed = marks.apply(marker, &keys)?;

	marks.save(&cache.marks_path())?;
	tracing::info!(marker, changed, "Marks updated.");

	Ok(())
}

pub fn plot(library: &Library, marks: &Marks, spec: &QuerySpec, chart: &str) -> eyre::Result<()> {
	if chart != "software-in-time" {
		tracing::debug!(
			chart,
			"Got an unknown chart slug; should be one of:\n- {}",
			CHARTS.join("\n- "),
		);

		return Err(eyre!("Bad chart"));
	}

	let mut filters = vec!["itemType:computerProgram".to_string()];

	filters.extend(spec.filters.iter().cloned());

	let fields = ["title", "date"].map(str::to_string);
	let items = select(library, marks, &fields, &filters, spec.force)?;
	let mut by_year = BTreeMap::<i32, Vec<String>>::new();

	for item in &items {
		let year = date::year_of(item.get("date").as_str().unwrap_or_default());

		by_year.entry(year).or_default().push(
			item.get("title").as_str().unwrap_or_default().to_string(),
		);
	}

	for (year, titles) in by_year {
		let label = if year == date::SENTINEL_YEAR {
			"####:".to_string()
		} else {
			format!("{year}:")
		};

		println!("{label} {}", titles.join(", "));
	}

	Ok(())
}

pub fn export(
	library: &Library,
	marks: &Marks,
	spec: &QuerySpec,
	line_format: Option<&str>,
	output_format: &str,
) -> eyre::Result<()> {
	let format = Format::parse(output_format)?;
	let mut spec = spec.clone();

	// `{stars}` is relative to the best rank, so the rank column must ride
	// along even when not asked for.
	if line_format.is_some_and(|line_format| line_format.contains("{stars}"))
		&& !spec.fields.iter().any(|field| field == "rank")
	{
		spec.fields.push("rank".to_string());
	}

	let output = run(library, marks, &spec)?;
	let content = match (line_format, format) {
		(Some(line_format), Format::Md) =>
			render_lines(line_format, &output.headers, &output.rows),
		_ => render(format, &output.headers, &output.rows),
	};
	let path = format!("export.{}", format.extension());

	tracing::debug!(path, "Writing the export file...");
	fs::write(&path, content)?;
	tracing::info!(path, rows = output.rows.len(), "Export written.");

	Ok(())
}

pub fn view(
	library: &Library,
	marks: &Marks,
	spec: &QuerySpec,
	name: &str,
	value: &str,
) -> eyre::Result<()> {
	let spec = QuerySpec {
		filters: vec![format!("{name}:{value}")],
		..spec.clone()
	};
	let output = run(library, marks, &spec)?;
	let Some(row) = output.rows.first() else {
		tracing::info!("No data.");

		return Ok(());
	};
	let key = candidate_keys(library, marks, &spec)?.into_iter().next();

	for ((field, header), cell) in spec.fields.iter().zip(&output.headers).zip(row) {
		// Relation targets read better as their titles than as raw keys.
		if field == "relations" {
			let titles =
				key.as_deref().map(|key| relation_titles(library, key)).unwrap_or_default();

			if titles.is_empty() {
				println!("{header: <24}: -");
			} else {
				println!("{header: <24}:");

				for title in titles {
					println!("- {title}");
				}
			}
		} else {
			println!("{header: <24}: {cell}");
		}
	}

	Ok(())
}

/// Titles of the records an item relates to; keys that do not resolve in
/// the cache are skipped.
fn relation_titles(library: &Library, key: &str) -> Vec<String> {
	library
		.object(key)
		.map(|item| {
			item.relation_keys()
				.iter()
				.filter_map(|target| library.object(target))
				.map(|target| target.str_field("title").to_string())
				.collect()
		})
		.unwrap_or_default()
}
