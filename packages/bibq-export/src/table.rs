//! Tabular renderers for query output.

use std::fmt::Write;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
	Csv,
	Json,
	Md,
}

impl Format {
	pub fn parse(format: &str) -> Result<Self> {
		match format {
			"csv" => Ok(Self::Csv),
			"json" => Ok(Self::Json),
			"md" => Ok(Self::Md),
			other => Err(Error::UnknownFormat { format: other.to_string() }),
		}
	}

	pub fn extension(self) -> &'static str {
		match self {
			Self::Csv => "csv",
			Self::Json => "json",
			Self::Md => "md",
		}
	}
}

pub fn render(format: Format, headers: &[String], rows: &[Vec<String>]) -> String {
	match format {
		Format::Csv => render_csv(headers, rows),
		Format::Json => render_json(headers, rows),
		Format::Md => render_md(headers, rows),
	}
}

fn render_csv(headers: &[String], rows: &[Vec<String>]) -> String {
	let mut output = String::new();

	push_csv_row(&mut output, headers.iter());

	for row in rows {
		push_csv_row(&mut output, row.iter());
	}

	output
}

fn push_csv_row<'a>(output: &mut String, cells: impl Iterator<Item = &'a String>) {
	let mut first = true;

	for cell in cells {
		if !first {
			output.push(',');
		}

		first = false;

		if cell.contains([',', '"', '\n', '\r']) {
			output.push('"');
			output.push_str(&cell.replace('"', "\"\""));
			output.push('"');
		} else {
			output.push_str(cell);
		}
	}

	output.push('\n');
}

fn render_json(headers: &[String], rows: &[Vec<String>]) -> String {
	let records = rows
		.iter()
		.map(|row| {
			headers
				.iter()
				.zip(row)
				.map(|(header, cell)| (header.clone(), Value::String(cell.clone())))
				.collect::<Map<_, _>>()
		})
		.collect::<Vec<_>>();

	// String-keyed maps of strings always serialize.
	serde_json::to_string_pretty(&records).unwrap_or_default()
}

fn render_md(headers: &[String], rows: &[Vec<String>]) -> String {
	let escape = |cells: &[String]| {
		cells.iter().map(|cell| cell.replace('|', "\\|")).collect::<Vec<_>>()
	};
	let headers = escape(headers);
	let rows = rows.iter().map(|row| escape(row)).collect::<Vec<_>>();
	let mut widths = headers.iter().map(String::len).collect::<Vec<_>>();

	for row in &rows {
		for (width, cell) in widths.iter_mut().zip(row) {
			*width = (*width).max(cell.len());
		}
	}

	let mut output = String::new();

	push_md_row(&mut output, &headers, &widths);

	for width in &widths {
		let _ = write!(output, "|{:-<1$}", "", width + 2);
	}

	output.push_str("|\n");

	for row in &rows {
		push_md_row(&mut output, row, &widths);
	}

	output
}

fn push_md_row(output: &mut String, cells: &[String], widths: &[usize]) {
	for (cell, width) in cells.iter().zip(widths.iter().copied()) {
		let _ = write!(output, "| {cell:<width$} ");
	}

	output.push_str("|\n");
}
