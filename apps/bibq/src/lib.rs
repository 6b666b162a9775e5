pub mod cli;
mod commands;

use std::{env, path::PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, eyre};
use tracing_subscriber::EnvFilter;

use bibq_config::Config;
use bibq_domain::Library;
use bibq_engine::{QuerySpec, RankingOptions};
use bibq_store::{CacheDir, Marks};

/// Inspect, filter, sort and export a personal reference library, working
/// entirely on locally cached data.
#[derive(Debug, Parser)]
#[command(
	version = cli::VERSION,
	rename_all = "kebab",
	styles = cli::styles(),
)]
pub struct Args {
	/// Config file path.
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: Option<PathBuf>,
	/// Cache directory, overriding the configured one.
	#[arg(long, value_name = "DIR")]
	pub cache: Option<PathBuf>,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Count items while applying filters.
	Count {
		#[command(flatten)]
		select: SelectOpts,
	},
	/// Export items to a file.
	Export {
		/// Fields to be exported; `-` expands to the preset's fields.
		#[arg(required = true, value_name = "FIELD")]
		fields: Vec<String>,
		/// Line template for outputting as a list instead of a table.
		#[arg(long, value_name = "TEMPLATE")]
		line_format: Option<String>,
		/// Output format.
		#[arg(short = 'o', long, value_name = "FORMAT", default_value = "md")]
		output_format: String,
		#[command(flatten)]
		select: SelectOpts,
		#[command(flatten)]
		order: OrderOpts,
	},
	/// List distinct values of one field.
	List {
		/// Field whose distinct values are to be listed.
		field: String,
		/// Cap on the number of listed values.
		#[arg(short = 'l', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
		limit: Option<u64>,
		/// Sort values in descending order.
		#[arg(long)]
		desc: bool,
		#[command(flatten)]
		select: SelectOpts,
	},
	/// Mark items with a marker.
	Mark {
		/// Marker to be set; the `un`-prefixed names undo their pair.
		marker: String,
		#[command(flatten)]
		select: SelectOpts,
		#[command(flatten)]
		order: OrderOpts,
	},
	/// Print a chart.
	Plot {
		/// Chart slug.
		chart: String,
		#[command(flatten)]
		select: SelectOpts,
	},
	/// Show a list of items.
	Show {
		/// Fields to be shown; `-` expands to the preset's fields.
		#[arg(required = true, value_name = "FIELD")]
		fields: Vec<String>,
		#[command(flatten)]
		select: SelectOpts,
		#[command(flatten)]
		order: OrderOpts,
	},
	/// View a single item, one line per field.
	View {
		/// Field name for selection.
		name: String,
		/// Field value to be selected.
		value: String,
		/// Fields to be shown.
		#[arg(required = true, value_name = "FIELD")]
		fields: Vec<String>,
	},
}

#[derive(Clone, Debug, Default, clap::Args)]
pub struct SelectOpts {
	/// Filter on a field's value; format: `[~]field:expression`.
	#[arg(short = 'f', long = "filter", value_name = "FILTER")]
	pub filters: Vec<String>,
	/// Use a preset query; can be combined with additional filters.
	#[arg(short = 'q', long = "query", value_name = "NAME")]
	pub query: Option<String>,
}

#[derive(Clone, Debug, Default, clap::Args)]
pub struct OrderOpts {
	/// Field to be sorted on; a leading `<`/`>` sets the direction.
	#[arg(short = 's', long, value_name = "FIELD")]
	pub sort: Option<String>,
	/// Cap on the number of records; format: `[[<|>]field:]number`.
	#[arg(short = 'l', long, value_name = "LIMIT")]
	pub limit: Option<String>,
}

pub fn run(args: Args) -> eyre::Result<()> {
	let config_path = args
		.config
		.unwrap_or_else(|| PathBuf::from(expand_home("~/.bibq/config.toml")));
	let config = bibq_config::load_or_default(&config_path)?;
	let filter = EnvFilter::new(config.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let cache = CacheDir::new(args.cache.unwrap_or_else(|| PathBuf::from(&config.cache_dir)));
	let library = Library::new(cache.load()?);
	let marks = Marks::load(&cache.marks_path())?;

	match args.command {
		Command::Count { select } => {
			let spec = build_spec(&config, Vec::new(), &select, &OrderOpts::default())?;

			commands::count(&library, &marks, &spec)
		},
		Command::Export { fields, line_format, output_format, select, order } => {
			let spec = build_spec(&config, fields, &select, &order)?;

			commands::export(&library, &marks, &spec, line_format.as_deref(), &output_format)
		},
		Command::List { field, limit, desc, select } => {
			let spec = build_spec(&config, Vec::new(), &select, &OrderOpts::default())?;

			commands::list(&library, &marks, &spec, &field, desc, limit.map(|limit| limit as usize))
		},
		Command::Mark { marker, select, order } => {
			let spec = build_spec(&config, Vec::new(), &select, &order)?;

			commands::mark(&library, marks, &cache, &spec, &marker)
		},
		Command::Plot { chart, select } => {
			let spec = build_spec(&config, Vec::new(), &select, &OrderOpts::default())?;

			commands::plot(&library, &marks, &spec, &chart)
		},
		Command::Show { fields, select, order } => {
			let spec = build_spec(&config, fields, &select, &order)?;

			commands::show(&library, &marks, &spec)
		},
		Command::View { name, value, fields } => {
			let spec = build_spec(&config, fields, &SelectOpts::default(), &OrderOpts::default())?;

			commands::view(&library, &marks, &spec, &name, &value)
		},
	}
}

/// Merge the command-line selection with an optional preset: `-` as the
/// only field expands to the preset's fields, preset filters are appended,
/// and the preset's sort/limit only apply when none were given. A leading
/// `<`/`>` on the sort field sets the direction.
pub fn build_spec(
	config: &Config,
	fields: Vec<String>,
	select: &SelectOpts,
	order: &OrderOpts,
) -> eyre::Result<QuerySpec> {
	let mut fields = fields;
	let mut filters = select.filters.clone();
	let mut sort = order.sort.clone();
	let mut limit = order.limit.clone();

	if let Some(name) = &select.query {
		let preset = config.presets.get(name).ok_or_else(|| {
			let mut known = config.presets.keys().cloned().collect::<Vec<_>>();

			known.sort();

			eyre!("Unknown preset '{name}' (should be one of: {}).", known.join("|"))
		})?;

		if fields == ["-"] {
			fields = preset.fields.clone();
		}

		filters.extend(preset.filters.iter().cloned());

		if limit.is_none() {
			limit = preset.limit.clone();
		}
		if sort.is_none() {
			sort = preset.sort.clone();
		}
	}

	let mut descending = false;

	if let Some(field) = sort.take() {
		descending = field.starts_with('>');
		sort = Some(
			field
				.strip_prefix(['<', '>'])
				.map_or(field.clone(), str::to_string),
		);
	}

	Ok(QuerySpec {
		fields,
		filters,
		sort,
		descending,
		limit,
		force: false,
		ranking: RankingOptions { age_damping: true, order: config.ranking.order },
	})
}

fn expand_home(path: &str) -> String {
	match (path.strip_prefix("~/"), env::var("HOME")) {
		(Some(rest), Ok(home)) => format!("{home}/{rest}"),
		_ => path.to_string(),
	}
}
