//! Lenient parsing for the free-form `date` fields of cached records.
//!
//! An absent or unparsable date maps to the 1900-01-01 sentinel; downstream
//! code treats the sentinel year as "unset".

use time::{Date, Month, OffsetDateTime, macros::datetime};

pub const SENTINEL_YEAR: i32 = 1900;

const MONTHS: &[(&str, Month)] = &[
	("jan", Month::January),
	("feb", Month::February),
	("mar", Month::March),
	("apr", Month::April),
	("may", Month::May),
	("jun", Month::June),
	("jul", Month::July),
	("aug", Month::August),
	("sep", Month::September),
	("oct", Month::October),
	("nov", Month::November),
	("dec", Month::December),
];

/// The "unset" date sentinel.
pub fn sentinel() -> OffsetDateTime {
	datetime!(1900-01-01 0:00 UTC)
}

/// Parse a free-form date string. Accepted shapes: `YYYY`, `YYYY-MM`,
/// `YYYY-MM-DD` (also with `/` separators or a trailing time part),
/// `Month YYYY`, `Month DD, YYYY` and `DD Month YYYY`. As a last resort any
/// embedded four-digit year is used on its own.
pub fn parse(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	if raw.is_empty() {
		return None;
	}
	if let Some(parsed) = parse_numeric(raw) {
		return Some(parsed);
	}
	if let Some(parsed) = parse_named_month(raw) {
		return Some(parsed);
	}

	find_year(raw).and_then(|year| build(year, Month::January, 1))
}

/// Parse with the sentinel as fallback, warning on unparsable non-empty
/// input.
pub fn parse_or_sentinel(raw: &str) -> OffsetDateTime {
	match parse(raw) {
		Some(parsed) => parsed,
		None => {
			if !raw.trim().is_empty() {
				tracing::warn!(date = raw, "Bad datetime format, using the 1900-01-01 sentinel.");
			}

			sentinel()
		},
	}
}

/// Calendar year of a free-form date, or the sentinel year.
pub fn year_of(raw: &str) -> i32 {
	parse(raw).map_or(SENTINEL_YEAR, |parsed| parsed.year())
}

fn build(year: i32, month: Month, day: u8) -> Option<OffsetDateTime> {
	Date::from_calendar_date(year, month, day).ok().map(|date| date.midnight().assume_utc())
}

fn parse_numeric(raw: &str) -> Option<OffsetDateTime> {
	// Strip a time part, if any.
	let date_part = raw.split([' ', 'T']).next()?;
	let mut parts = date_part.split(['-', '/']);
	let year = parts.next()?.parse::<i32>().ok().filter(|year| (1000..=9999).contains(year))?;
	let month = match parts.next() {
		Some(part) => Month::try_from(part.parse::<u8>().ok()?).ok()?,
		None => Month::January,
	};
	let day = match parts.next() {
		Some(part) => part.parse::<u8>().ok()?,
		None => 1,
	};

	if parts.next().is_some() {
		return None;
	}

	build(year, month, day)
}

fn parse_named_month(raw: &str) -> Option<OffsetDateTime> {
	let cleaned = raw.replace(',', " ");
	let tokens = cleaned.split_whitespace().collect::<Vec<_>>();

	match tokens.as_slice() {
		// "May 2021"
		[month, year] => build(parse_year(year)?, month_by_name(month)?, 1),
		// "May 3, 2021"
		[month, day, year] if month_by_name(month).is_some() =>
			build(parse_year(year)?, month_by_name(month)?, day.parse().ok()?),
		// "3 May 2021"
		[day, month, year] if month_by_name(month).is_some() =>
			build(parse_year(year)?, month_by_name(month)?, day.parse().ok()?),
		_ => None,
	}
}

fn month_by_name(token: &str) -> Option<Month> {
	let lowered = token.to_ascii_lowercase();

	MONTHS
		.iter()
		.find(|(prefix, _)| lowered.starts_with(prefix))
		.map(|(_, month)| *month)
}

fn parse_year(token: &str) -> Option<i32> {
	token.parse::<i32>().ok().filter(|year| (1000..=9999).contains(year))
}

fn find_year(raw: &str) -> Option<i32> {
	let bytes = raw.as_bytes();
	let mut start = None;

	for (index, byte) in bytes.iter().enumerate() {
		if byte.is_ascii_digit() {
			if start.is_none() {
				start = Some(index);
			}
		} else if let Some(from) = start.take()
			&& index - from == 4
			&& let Some(year) = parse_year(&raw[from..index])
		{
			return Some(year);
		}
	}

	match start {
		Some(from) if bytes.len() - from == 4 => parse_year(&raw[from..]),
		_ => None,
	}
}
