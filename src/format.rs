use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset, Locale, NaiveDateTime, Offset, Utc};

use crate::richtext::{self, RichTextBlock};

/// Average reading speed used for the reading-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

const DATE_FORMAT: &str = "%d %b %Y";
const TIME_SUFFIX: &str = ", às %H:%M";

/// A content section of a post: a heading followed by rich-text body blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

/// Parse a CMS timestamp into UTC.
///
/// Accepts RFC 3339 (`2021-03-15T14:05:00+00:00`), the compact offset form the
/// CMS emits (`2021-03-15T14:05:00+0000`), and offset-less timestamps, which
/// are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    bail!("Invalid timestamp: {:?}", s)
}

/// Format a timestamp as `dd MMM yyyy` in pt-BR, e.g. `15 mar 2021`.
///
/// With `with_time`, a time-of-day suffix is appended: `15 mar 2021, às 14:05`.
pub fn format_date(ts: &DateTime<Utc>, with_time: bool) -> String {
    format_date_in(ts, with_time, Utc.fix())
}

/// Like [`format_date`], but renders the wall-clock date in `offset`.
pub fn format_date_in(ts: &DateTime<Utc>, with_time: bool, offset: FixedOffset) -> String {
    let local = ts.with_timezone(&offset);
    let mut out = local
        .format_localized(DATE_FORMAT, Locale::pt_BR)
        .to_string();
    if with_time {
        out.push_str(&local.format_localized(TIME_SUFFIX, Locale::pt_BR).to_string());
    }
    out
}

/// Estimated reading time in whole minutes, rounded up.
pub fn reading_time(sections: &[Section]) -> usize {
    let words: usize = sections
        .iter()
        .map(|section| {
            format!("{} {}", section.heading, richtext::as_text(&section.body))
                .split_whitespace()
                .count()
        })
        .sum();
    words.div_ceil(WORDS_PER_MINUTE)
}
