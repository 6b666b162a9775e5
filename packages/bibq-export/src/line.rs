//! Line-format rendering: one templated line per result row, with a few
//! derived placeholders on top of the lowercased column names.

use std::{collections::HashMap, sync::LazyLock};

use regex::{Captures, Regex};

/// Words whose casing is meaningful and must survive `lower_title`.
const STATIC_WORDS: &[&str] = &["Android", "Bochs", "Linux", "Markov", "NsPack", "Windows"];

const TYPE_EMOJIS: &[(&str, &str)] = &[
	("artwork", ":art:"),
	("audio recording", ":microphone:"),
	("blog post", ":pushpin:"),
	("book", ":green_book:"),
	("book section", ":closed_book:"),
	("computer program", ":floppy_disk:"),
	("conference paper", ":notebook:"),
	("document", ":page_facing_up:"),
	("email", ":email:"),
	("encyclopedia article", ":book:"),
	("forum post", ":pushpin:"),
	("journal article", ":newspaper:"),
	("magazine article", ":page_with_curl:"),
	("manuscript", ":scroll:"),
	("newspaper article", ":newspaper:"),
	("podcast", ":video_camera:"),
	("preprint", ":bookmark:"),
	("presentation", ":bar_chart:"),
	("report", ":clipboard:"),
	("thesis", ":mortar_board:"),
	("tv broadcast", ":tv:"),
	("video recording", ":movie_camera:"),
	("webpage", ":earth_americas:"),
];
const DEFAULT_EMOJI: &str = ":question:";

static SUBTITLE_WORD: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"([^-:!?]\s+(?:[A-Z][a-z]+(?:[-_]?[A-Z]?[a-z]+)*|[A-Z]{2}[a-z]{3,}))")
		.expect("static pattern")
});
static AFTER_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"([-:!?]\s+)([a-z]+(?:[-_][A-Z]?[a-z]+)*)").expect("static pattern")
});
static FIRST_WORD: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^([A-Z][a-z]+(?:[-_][A-Z]?[a-z]+)*)").expect("static pattern")
});

/// Render one line per row. Placeholders are the lowercased column names;
/// `{lower_title}`, `{link}`, `{link_lower}` and `{link_with_abstract}`
/// derive from the Title/Url/abstract columns, `{emoji}` from the Type
/// column and `{stars}` from the rank relative to the result's maximum.
/// Unknown placeholders stay literal.
pub fn render_lines(line_format: &str, headers: &[String], rows: &[Vec<String>]) -> String {
	let names = headers.iter().map(|header| header.to_lowercase()).collect::<Vec<_>>();
	let has = |header: &str| headers.iter().any(|known| known == header);
	let max_rank = if line_format.contains("{stars}") {
		match names.iter().position(|name| name == "rank") {
			Some(position) => rows
				.iter()
				.map(|row| parse_rank(&row[position]))
				.fold(0., f64::max),
			None => {
				tracing::warn!("No rank column for the {{stars}} placeholder.");

				0.
			},
		}
	} else {
		0.
	};
	let mut lines = Vec::with_capacity(rows.len());

	for row in rows {
		let mut values = names
			.iter()
			.cloned()
			.zip(row.iter().cloned())
			.collect::<HashMap<_, _>>();

		if has("Title") && has("Url") {
			let title = values["title"].clone();
			let url = values["url"].clone();
			let lowered = lower_title(&title);
			let unset = url.is_empty() || url == "-";
			let link = |text: &str| {
				if unset { text.to_string() } else { format!("[{text}]({url})") }
			};

			values.insert("link".to_string(), link(&title));
			values.insert("link_lower".to_string(), link(&lowered));
			values.insert("lower_title".to_string(), lowered);
		}
		if line_format.contains("{link_with_abstract}")
			&& let Some(link) = values.get("link").cloned()
		{
			let with_abstract = if has("AbstractNote") {
				match values["abstractnote"].as_str() {
					"-" => link,
					text => format!("{link}\n\n{}\n\n", indent(text, 2)),
				}
			} else if has("AbstractShortNote") {
				match values["abstractshortnote"].as_str() {
					"." => link,
					text => format!("{link} - {text}"),
				}
			} else {
				link
			};

			values.insert("link_with_abstract".to_string(), with_abstract);
		}
		if line_format.contains("{emoji}") {
			let item_type = values.get("type").map(String::as_str).unwrap_or_default();
			let emoji = TYPE_EMOJIS
				.iter()
				.find(|(known, _)| *known == item_type)
				.map_or(DEFAULT_EMOJI, |(_, emoji)| emoji);

			values.insert("emoji".to_string(), emoji.to_string());
		}
		if line_format.contains("{stars}") {
			let rank = values.get("rank").map(String::as_str).map_or(0., parse_rank);

			values.insert("stars".to_string(), stars(rank, max_rank));
		}

		lines.push(expand(line_format, &values));
	}

	lines.join("\n")
}

fn parse_rank(cell: &str) -> f64 {
	if cell == "-" { 0. } else { cell.parse().unwrap_or_default() }
}

fn stars(rank: f64, max_rank: f64) -> String {
	let star = if rank == max_rank { " :star2:" } else { " :star:" };

	if rank < 0.35 {
		String::new()
	} else if rank < 0.65 {
		star.to_string()
	} else if rank < 0.85 {
		star.repeat(2)
	} else {
		star.repeat(3)
	}
}

fn expand(template: &str, values: &HashMap<String, String>) -> String {
	let mut output = String::with_capacity(template.len());
	let mut rest = template;

	while let Some(open) = rest.find('{') {
		output.push_str(&rest[..open]);

		let Some(close) = rest[open..].find('}') else {
			rest = &rest[open..];

			break;
		};
		let name = &rest[open + 1..open + close];

		match values.get(name) {
			Some(value) => output.push_str(value),
			None => output.push_str(&rest[open..=open + close]),
		}

		rest = &rest[open + close + 1..];
	}

	output.push_str(rest);

	output
}

fn indent(text: &str, spaces: usize) -> String {
	let prefix = " ".repeat(spaces);

	text.lines()
		.map(|line| format!("{prefix}{line}"))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Lowercase the non-leading title words while preserving cased subtitles
/// (words following `-:!?`), the recognized proper nouns and the casing of
/// the very first word.
pub fn lower_title(title: &str) -> String {
	let mut title = title.to_string();

	// Two passes: a match consumes the character before the word, so the
	// first pass only catches every other word of a run.
	for _ in 0..2 {
		title = SUBTITLE_WORD
			.replace_all(&title, |captures: &Captures<'_>| {
				let whole = &captures[1];
				let (first, rest) = split_first(whole);

				if STATIC_WORDS.contains(&rest.trim()) {
					whole.to_string()
				} else {
					format!("{first}{}", rest.to_lowercase())
				}
			})
			.into_owned();
	}

	title = AFTER_PUNCTUATION
		.replace_all(&title, |captures: &Captures<'_>| {
			let (first, rest) = split_first(&captures[2]);

			format!("{}{}{rest}", &captures[1], first.to_uppercase())
		})
		.into_owned();

	FIRST_WORD
		.replace(&title, |captures: &Captures<'_>| {
			let (first, rest) = split_first(&captures[1]);

			format!("{first}{}", rest.to_lowercase())
		})
		.into_owned()
}

fn split_first(text: &str) -> (&str, &str) {
	match text.char_indices().nth(1) {
		Some((boundary, _)) => text.split_at(boundary),
		None => (text, ""),
	}
}

#[cfg(test)]
mod tests {
	use crate::line::{expand, lower_title, render_lines, stars};

	fn owned(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	#[test]
	fn lower_title_preserves_cased_subtitles_and_proper_nouns() {
		let cases = [
			("An Example Title: With a Subtitle", "An example title: With a subtitle"),
			("First Part: Second Part", "First part: Second part"),
			("A Guide to Markov", "A guide to Markov"),
			// The match consumes the character before "Android", so the
			// word after a preserved noun keeps its case too.
			("Fuzzing on Android Devices", "Fuzzing on Android Devices"),
			("Foo: bar baz", "Foo: Bar baz"),
			("plain lowercase", "plain lowercase"),
		];

		for (input, expected) in cases {
			assert_eq!(lower_title(input), expected, "{input}");
		}
	}

	#[test]
	fn stars_scale_with_rank_and_crown_the_maximum() {
		assert_eq!(stars(0.2, 1.), "");
		assert_eq!(stars(0.5, 1.), " :star:");
		assert_eq!(stars(0.7, 1.), " :star: :star:");
		assert_eq!(stars(0.9, 1.), " :star: :star: :star:");
		assert_eq!(stars(1., 1.), " :star2: :star2: :star2:");
	}

	#[test]
	fn links_fall_back_to_the_bare_title() {
		let headers = owned(&["Title", "Url"]);
		let rows = [
			owned(&["Fuzzing in Depth", "https://example.org"]),
			owned(&["No Link Here", "-"]),
		];
		let rendered = render_lines("- {link}", &headers, &rows);

		assert_eq!(
			rendered,
			"- [Fuzzing in Depth](https://example.org)\n- No Link Here",
		);
	}

	#[test]
	fn emoji_and_stars_placeholders_expand() {
		let headers = owned(&["Title", "Type", "Rank"]);
		let rows = [
			owned(&["Fuzzing in Depth", "journal article", "1.000"]),
			owned(&["Oddity", "hologram", "-"]),
		];
		let rendered = render_lines("{emoji} {title}{stars}", &headers, &rows);

		assert_eq!(
			rendered,
			":newspaper: Fuzzing in Depth :star2: :star2: :star2:\n:question: Oddity",
		);
	}

	#[test]
	fn short_abstracts_append_to_the_link() {
		let headers = owned(&["Title", "Url", "AbstractShortNote"]);
		let rows = [
			owned(&["Fuzzing in Depth", "-", "A survey of fuzzing."]),
			owned(&["Bare", "-", "."]),
		];
		let rendered = render_lines("{link_with_abstract}", &headers, &rows);

		assert_eq!(rendered, "Fuzzing in Depth - A survey of fuzzing.\nBare");
	}

	#[test]
	fn unknown_placeholders_stay_literal() {
		let values =
			std::collections::HashMap::from([("title".to_string(), "T".to_string())]);

		assert_eq!(expand("{title} {bogus} {title", &values), "T {bogus} {title");
	}
}
