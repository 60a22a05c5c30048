//! Field keys and simple field values
//!
//! Keys are matched at the byte level. They are pure ASCII, so every match
//! boundary is also a valid `str` boundary.

use std::ops::Range;

use chrono::NaiveDate;

use super::ParseError;
use crate::domain::DATE_FORMAT;

/// A `key:` marker with its long and optional short spelling
#[derive(Debug)]
pub(crate) struct FieldKey {
    pub name: &'static str,
    long: &'static str,
    short: Option<&'static str>,
}

pub(crate) const DUE: FieldKey = FieldKey {
    name: "due",
    long: "due:",
    short: Some("d:"),
};

pub(crate) const SCHEDULED: FieldKey = FieldKey {
    name: "scheduled",
    long: "scheduled:",
    short: Some("s:"),
};

pub(crate) const COMPLETED: FieldKey = FieldKey {
    name: "completed",
    long: "completed:",
    short: None,
};

pub(crate) const PRIORITY: FieldKey = FieldKey {
    name: "priority",
    long: "priority:",
    short: Some("p:"),
};

pub(crate) const EVERY: FieldKey = FieldKey {
    name: "every",
    long: "every:",
    short: Some("e:"),
};

pub(crate) const ALL_KEYS: [&FieldKey; 5] = [&DUE, &SCHEDULED, &COMPLETED, &PRIORITY, &EVERY];

impl FieldKey {
    /// Finds the first valid occurrence of this key at or after `from`.
    ///
    /// A short key only counts at the start of the text or right after a
    /// space, so `d:` inside `scheduled:` is skipped and scanning continues.
    pub fn find(&self, text: &str, from: usize) -> Option<Range<usize>> {
        let bytes = text.as_bytes();
        (from..bytes.len()).find_map(|i| self.len_at(bytes, i).map(|len| i..i + len))
    }

    fn len_at(&self, bytes: &[u8], i: usize) -> Option<usize> {
        let rest = &bytes[i..];
        if rest.starts_with(self.long.as_bytes()) {
            return Some(self.long.len());
        }

        let short = self.short?;
        let at_boundary = i == 0 || bytes[i - 1] == b' ';
        (at_boundary && rest.starts_with(short.as_bytes())).then_some(short.len())
    }
}

/// Start of the earliest key of any field at or after `from`
pub(crate) fn first_key(text: &str, from: usize) -> Option<usize> {
    ALL_KEYS
        .iter()
        .filter_map(|key| key.find(text, from))
        .map(|range| range.start)
        .min()
}

/// Index of the first byte at or after `from` that is not a space or tab
pub(crate) fn skip_inline_whitespace(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = from;
    while matches!(bytes.get(i), Some(b' ' | b'\t')) {
        i += 1;
    }
    i
}

/// Parses a strict `YYYY-MM-DD` date at the start of `text`
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    if bytes.len() < 10 {
        return None;
    }

    let shape_ok = bytes[..10].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(&text[..10], DATE_FORMAT).ok()
}

/// Parses the digits of a priority value at the start of `text`
pub(crate) fn parse_priority(text: &str) -> Result<u32, ParseError> {
    let end = text
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(text.len());

    let malformed = || ParseError::MalformedField {
        field: PRIORITY.name,
        value: text.split_whitespace().next().unwrap_or_default().to_string(),
    };

    if end == 0 {
        return Err(malformed());
    }
    text[..end].parse().map_err(|_| malformed())
}
