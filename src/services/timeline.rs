//! Time handling for evidence records.
//!
//! - [`extract_date_tokens`] pulls day, month and year tokens out of a query.
//! - [`parse_timestamp`] reads the free-form timestamps records carry.
//! - [`sort_by_time`] and [`build_timeline_text`] order and render records so
//!   a worker can reason about event order.

use std::fmt;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::models::EvidenceRecord;

const MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

/// Longest month range expanded by "from Month YYYY to Month YYYY".
const MAX_RANGE_MONTHS: usize = 600;

fn date_regex(template: &str) -> Regex {
    // {M} expands to the month-name alternation.
    Regex::new(&template.replace("{M}", MONTHS)).expect("static date pattern")
}

static DAY_RANGE: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"(?i)({M})\s+([0-9]{1,2})\s*[-–to]+\s*([0-9]{1,2}),?\s+([0-9]{4})"));
static DAY_PAIR: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"(?i)({M})\s+([0-9]{1,2})\s+and\s+([0-9]{1,2}),?\s+([0-9]{4})"));
static FULL_DATE: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"(?i)({M})\s+([0-9]{1,2}),?\s+([0-9]{4})"));
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| date_regex(r"([0-9]{4})-([0-9]{2})-([0-9]{2})"));
static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| date_regex(r"(?i)({M})\s+([0-9]{4})"));
static SEASON_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    date_regex(r"(?i)(?:summer|winter|spring|autumn|fall)\s+(?:of\s+)?([0-9]{4})")
});
static PART_OF_YEAR: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"(?i)(?:early|late|mid-?)\s+([0-9]{4})\b"));
static NEW_YEARS_EVE: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"(?i)New\s+Year'?s?\s+Eve\s+([0-9]{4})"));
static DECADE: LazyLock<Regex> = LazyLock::new(|| date_regex(r"\b([0-9]{4})s\b"));
static MONTH_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    date_regex(r"(?i)from\s+({M})\s+([0-9]{4})\s+to\s+({M})\s+([0-9]{4})")
});
static BARE_YEAR: LazyLock<Regex> = LazyLock::new(|| date_regex(r"\b(19[0-9]{2}|20[0-9]{2})\b"));

static ENGLISH_DATE: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"^[A-Z][a-z]+\s+[0-9]{1,2},?\s+[0-9]{4}$"));
static EMBEDDED_DATE: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})"));
static EMBEDDED_TIME: LazyLock<Regex> =
    LazyLock::new(|| date_regex(r"([0-9]{1,2}):([0-9]{2}):?([0-9]{2})?"));

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Month number for an English month name, case-insensitive.
pub fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    Some(n)
}

/// A date token at the granularity the query specified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateToken {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
    Year(i32),
    /// Day-shaped but not a real calendar date (e.g. `2001-02-30`); matched by prefix only.
    Invalid(String),
}

impl DateToken {
    /// Interpret a `YYYY-MM-DD`, `YYYY-MM` or `YYYY` token.
    pub fn parse(token: &str) -> Option<Self> {
        let parts: Vec<&str> = token.split('-').collect();
        let num = |s: &str| s.parse::<u32>().ok();
        match parts.as_slice() {
            [y, m, d] => {
                let (year, month, day) = (y.parse::<i32>().ok()?, num(m)?, num(d)?);
                Some(match NaiveDate::from_ymd_opt(year, month, day) {
                    Some(date) => DateToken::Day(date),
                    None => DateToken::Invalid(token.to_string()),
                })
            }
            [y, m] => Some(DateToken::Month {
                year: y.parse().ok()?,
                month: num(m)?,
            }),
            [y] if y.len() == 4 => Some(DateToken::Year(y.parse().ok()?)),
            _ => None,
        }
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateToken::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateToken::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            DateToken::Year(year) => write!(f, "{:04}", year),
            DateToken::Invalid(raw) => f.write_str(raw),
        }
    }
}

fn push_unique(tokens: &mut Vec<String>, token: String) {
    if !tokens.contains(&token) {
        tokens.push(token);
    }
}

fn covered(tokens: &[String], prefix: &str) -> bool {
    tokens.iter().any(|t| t.starts_with(prefix))
}

fn push_day_span(tokens: &mut Vec<String>, caps: &regex::Captures<'_>) {
    let Some(month) = month_number(&caps[1]) else {
        return;
    };
    let (Ok(start), Ok(end)) = (caps[2].parse::<u32>(), caps[3].parse::<u32>()) else {
        return;
    };
    let year = &caps[4];
    for day in start..=end.min(31) {
        push_unique(tokens, format!("{}-{:02}-{:02}", year, month, day));
    }
}

/// Extract ordered, deduplicated date tokens from free text.
///
/// Produces `YYYY-MM-DD`, `YYYY-MM` or `YYYY`. Bare years are only used when
/// nothing more specific was found.
pub fn extract_date_tokens(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for caps in DAY_RANGE.captures_iter(query) {
        push_day_span(&mut tokens, &caps);
    }
    for caps in DAY_PAIR.captures_iter(query) {
        push_day_span(&mut tokens, &caps);
    }

    for caps in FULL_DATE.captures_iter(query) {
        if let (Some(month), Ok(day)) = (month_number(&caps[1]), caps[2].parse::<u32>()) {
            push_unique(&mut tokens, format!("{}-{:02}-{:02}", &caps[3], month, day));
        }
    }

    for m in ISO_DATE.find_iter(query) {
        push_unique(&mut tokens, m.as_str().to_string());
    }

    for caps in MONTH_YEAR.captures_iter(query) {
        if let Some(month) = month_number(&caps[1]) {
            let ym = format!("{}-{:02}", &caps[2], month);
            if !covered(&tokens, &ym) {
                tokens.push(ym);
            }
        }
    }

    for re in [&*SEASON_YEAR, &*PART_OF_YEAR] {
        for caps in re.captures_iter(query) {
            let year = caps[1].to_string();
            if !covered(&tokens, &year) {
                tokens.push(year);
            }
        }
    }

    for caps in NEW_YEARS_EVE.captures_iter(query) {
        push_unique(&mut tokens, format!("{}-12-31", &caps[1]));
    }

    for caps in DECADE.captures_iter(query) {
        let decade = caps[1].to_string();
        if !covered(&tokens, &decade[..3]) {
            tokens.push(decade);
        }
    }

    for caps in MONTH_SPAN.captures_iter(query) {
        let (Some(m1), Some(m2)) = (month_number(&caps[1]), month_number(&caps[3])) else {
            continue;
        };
        let (Ok(y1), Ok(y2)) = (caps[2].parse::<i32>(), caps[4].parse::<i32>()) else {
            continue;
        };
        let (mut year, mut month) = (y1, m1);
        let mut expanded = 0;
        while (year, month) <= (y2, m2) && expanded < MAX_RANGE_MONTHS {
            let ym = format!("{}-{:02}", year, month);
            if !covered(&tokens, &ym) {
                tokens.push(ym);
            }
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
            expanded += 1;
        }
    }

    if tokens.is_empty() {
        for caps in BARE_YEAR.captures_iter(query) {
            push_unique(&mut tokens, caps[1].to_string());
        }
    }

    tokens
}

/// Parse a free-form record timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM`,
/// `YYYY-MM-DD` and `Month D, YYYY`. Anything else falls back to the first
/// embedded `YYYY-MM-DD` with an optional `HH:MM[:SS]` after it.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if ENGLISH_DATE.is_match(text) {
        return parse_english_date(text);
    }
    parse_embedded(text)
}

fn parse_english_date(text: &str) -> Option<NaiveDateTime> {
    let cleaned = text.replace(',', "");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    let [month, day, year] = parts.as_slice() else {
        return None;
    };
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month)?, day.parse().ok()?)?;
    Some(date.and_time(NaiveTime::MIN))
}

fn parse_embedded(text: &str) -> Option<NaiveDateTime> {
    let caps = EMBEDDED_DATE.captures(text)?;
    let date = NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )?;
    let rest = &text[caps.get(0)?.end()..];
    let time = match EMBEDDED_TIME.captures(rest) {
        Some(t) => NaiveTime::from_hms_opt(
            t[1].parse().ok()?,
            t[2].parse().ok()?,
            t.get(3).map_or(Some(0), |s| s.as_str().parse().ok())?,
        )?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

/// Whether `instant` falls inside the calendar month or year of a partial token.
pub(crate) fn within_period(instant: &NaiveDateTime, token: &DateToken) -> bool {
    match token {
        DateToken::Month { year, month } => instant.year() == *year && instant.month() == *month,
        DateToken::Year(year) => instant.year() == *year,
        DateToken::Day(_) | DateToken::Invalid(_) => false,
    }
}

/// Sort records by parsed timestamp, ties by original position.
///
/// Records without a parseable timestamp follow, in their original order.
pub fn sort_by_time(records: &[EvidenceRecord]) -> Vec<EvidenceRecord> {
    let mut dated: Vec<(NaiveDateTime, usize)> = Vec::new();
    let mut undated: Vec<usize> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        match parse_timestamp(&record.timestamp) {
            Some(instant) => dated.push((instant, idx)),
            None => undated.push(idx),
        }
    }
    dated.sort();
    dated
        .into_iter()
        .map(|(_, idx)| idx)
        .chain(undated)
        .map(|idx| records[idx].clone())
        .collect()
}

/// Rendering options for [`build_timeline_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineOptions {
    pub max_records: usize,
    pub max_chars_per_field: usize,
    pub numbered: bool,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            max_records: 200,
            max_chars_per_field: 500,
            numbered: true,
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Render records in time order as numbered event blocks:
///
/// ```text
/// [Event 1] [1969-08-15 14:00:30]
///   location: A gravel road leading to a farm
///   action: The family walked along the road
/// ```
pub fn build_timeline_text(records: &[EvidenceRecord], options: TimelineOptions) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (n, record) in sort_by_time(records)
        .iter()
        .take(options.max_records)
        .enumerate()
    {
        let prefix = if options.numbered {
            format!("[Event {}]", n + 1)
        } else {
            String::new()
        };
        let timestamp = record.timestamp.trim();
        let label = if timestamp.is_empty() {
            String::new()
        } else {
            format!(" [{}]", timestamp)
        };
        let header = format!("{}{}", prefix, label).trim().to_string();
        if !header.is_empty() {
            lines.push(header);
        }
        for (name, value) in record.fields() {
            lines.push(format!(
                "  {}: {}",
                name,
                truncate_chars(value, options.max_chars_per_field)
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(extract_date_tokens("August 15, 1969"), vec!["1969-08-15"]);
        assert_eq!(extract_date_tokens("July 1998"), vec!["1998-07"]);
        assert_eq!(extract_date_tokens("the 1990s"), vec!["1990"]);
        assert_eq!(
            extract_date_tokens("What happened on 1975-08-18?"),
            vec!["1975-08-18"]
        );
    }

    #[test]
    fn test_day_ranges() {
        assert_eq!(
            extract_date_tokens("between July 1-4, 1999"),
            vec!["1999-07-01", "1999-07-02", "1999-07-03", "1999-07-04"]
        );
        assert_eq!(
            extract_date_tokens("on March 3 and 5, 2001"),
            vec!["2001-03-03", "2001-03-04", "2001-03-05"]
        );
    }

    #[test]
    fn test_month_span() {
        assert_eq!(
            extract_date_tokens("from November 1975 to February 1976"),
            vec!["1975-11", "1976-02", "1975-12", "1976-01"]
        );
    }

    #[test]
    fn test_partial_year_patterns() {
        assert_eq!(extract_date_tokens("in the summer of 2003"), vec!["2003"]);
        assert_eq!(extract_date_tokens("late 1984"), vec!["1984"]);
        assert_eq!(extract_date_tokens("New Year's Eve 1999"), vec!["1999-12-31"]);
        // month token already covers the season's year
        assert_eq!(
            extract_date_tokens("July 2003, that summer of 2003"),
            vec!["2003-07"]
        );
    }

    #[test]
    fn test_bare_year_only_as_fallback() {
        assert_eq!(extract_date_tokens("Back in 1987 and 2002"), vec!["1987", "2002"]);
        assert_eq!(extract_date_tokens("August 15, 1969 in 1970"), vec!["1969-08-15"]);
        assert!(extract_date_tokens("no dates here, only 42 and 3000").is_empty());
    }

    #[test]
    fn test_date_token_parse() {
        assert_eq!(
            DateToken::parse("1969-08-15"),
            NaiveDate::from_ymd_opt(1969, 8, 15).map(DateToken::Day)
        );
        assert_eq!(
            DateToken::parse("1998-07"),
            Some(DateToken::Month {
                year: 1998,
                month: 7
            })
        );
        assert_eq!(DateToken::parse("1990"), Some(DateToken::Year(1990)));
        assert_eq!(
            DateToken::parse("2001-02-30"),
            Some(DateToken::Invalid("2001-02-30".into()))
        );
        assert_eq!(DateToken::parse("abc"), None);
        assert_eq!(DateToken::parse("1998-07").unwrap().to_string(), "1998-07");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("1969-08-15 14:00:30"),
            Some(dt("1969-08-15 14:00:30"))
        );
        assert_eq!(
            parse_timestamp("1969-08-15T14:00:30"),
            Some(dt("1969-08-15 14:00:30"))
        );
        assert_eq!(
            parse_timestamp("1969-08-15 14:00"),
            Some(dt("1969-08-15 14:00:00"))
        );
        assert_eq!(parse_timestamp("1969-08-15"), Some(dt("1969-08-15 00:00:00")));
        assert_eq!(
            parse_timestamp("August 15, 1969"),
            Some(dt("1969-08-15 00:00:00"))
        );
        assert_eq!(
            parse_timestamp("Day 3 (1969-8-15) around 9:05"),
            Some(dt("1969-08-15 09:05:00"))
        );
        assert_eq!(parse_timestamp("Someday 15, 1969"), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_sort_by_time_puts_undated_last() {
        let records = vec![
            EvidenceRecord::new(1, "unknown"),
            EvidenceRecord::new(2, "1970-01-02"),
            EvidenceRecord::new(3, ""),
            EvidenceRecord::new(4, "1969-12-31 23:00"),
            EvidenceRecord::new(5, "1970-01-02"),
        ];
        let ids: Vec<i64> = sort_by_time(&records).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 5, 1, 3]);
    }

    #[test]
    fn test_build_timeline_text() {
        let records = vec![
            EvidenceRecord::new(2, "1969-08-15 14:30:00").with_action("Fed the horses"),
            EvidenceRecord::new(1, "1969-08-15 14:00:30")
                .with_location("A gravel road leading to a farm")
                .with_action("The family walked along the road"),
        ];
        let text = build_timeline_text(&records, TimelineOptions::default());
        insta::assert_snapshot!(text, @r"
        [Event 1] [1969-08-15 14:00:30]
          location: A gravel road leading to a farm
          action: The family walked along the road

        [Event 2] [1969-08-15 14:30:00]
          action: Fed the horses
        ");
    }

    #[test]
    fn test_timeline_truncates_and_limits() {
        let records = vec![
            EvidenceRecord::new(1, "").with_dialogue("abcdefgh"),
            EvidenceRecord::new(2, "").with_dialogue("ignored"),
        ];
        let options = TimelineOptions {
            max_records: 1,
            max_chars_per_field: 3,
            numbered: false,
        };
        assert_eq!(build_timeline_text(&records, options), "dialogue: abc…");
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_sort_is_a_permutation(days in proptest::collection::vec(prop::option::of(1u32..28), 0..30)) {
                let records: Vec<EvidenceRecord> = days
                    .iter()
                    .enumerate()
                    .map(|(i, d)| {
                        let ts = d.map(|d| format!("2000-01-{:02}", d)).unwrap_or_default();
                        EvidenceRecord::new(i as i64, ts)
                    })
                    .collect();
                let sorted = sort_by_time(&records);
                prop_assert_eq!(sorted.len(), records.len());

                let instants: Vec<_> = sorted
                    .iter()
                    .map_while(|r| parse_timestamp(&r.timestamp))
                    .collect();
                prop_assert!(instants.windows(2).all(|w| w[0] <= w[1]));
            }

            #[test]
            fn prop_extraction_never_panics(query in ".{0,120}") {
                let _ = extract_date_tokens(&query);
            }
        }
    }
}
