//! Recurrence rules for repeating tasks
//!
//! A [`Recurrence`] carries two views of the same rule: the structured
//! schedule used for date calculations and the author's original wording
//! (`text`) which is what gets written back to disk.
//!
//! Expansion follows RFC 5545 RRULE semantics with `anchor` as DTSTART and
//! Monday as the week start.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Base period of a recurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A parsed `every:` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    frequency: Frequency,
    interval: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    by_weekday: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    by_month_day: BTreeSet<u32>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    by_month: BTreeSet<u32>,
    anchor: NaiveDate,
    text: String,
}

impl Recurrence {
    /// Creates a rule repeating every period of `frequency`, starting at `anchor`
    pub fn new(frequency: Frequency, anchor: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: Vec::new(),
            by_month_day: BTreeSet::new(),
            by_month: BTreeSet::new(),
            anchor,
            text: text.into().trim().to_string(),
        }
    }

    /// Sets the number of periods between occurrences (must be at least 1)
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Restricts occurrences to the given weekdays
    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        for day in weekdays {
            if !self.by_weekday.contains(&day) {
                self.by_weekday.push(day);
            }
        }
        self.by_weekday.sort_by_key(|d| d.num_days_from_monday());
        self
    }

    /// Restricts occurrences to the given days of the month (1..=31)
    pub fn with_month_days(mut self, days: impl IntoIterator<Item = u32>) -> Self {
        self.by_month_day
            .extend(days.into_iter().filter(|d| (1..=31).contains(d)));
        self
    }

    /// Restricts occurrences to the given months (1..=12)
    pub fn with_months(mut self, months: impl IntoIterator<Item = u32>) -> Self {
        self.by_month
            .extend(months.into_iter().filter(|m| (1..=12).contains(m)));
        self
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Weekdays the rule is restricted to, Monday first
    pub fn by_weekday(&self) -> &[Weekday] {
        &self.by_weekday
    }

    pub fn by_month_day(&self) -> &BTreeSet<u32> {
        &self.by_month_day
    }

    pub fn by_month(&self) -> &BTreeSet<u32> {
        &self.by_month
    }

    /// Date the schedule is counted from
    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// The rule as the author wrote it
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true if the rule produces an occurrence on `date`
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        if date < self.anchor {
            return false;
        }
        if !self.by_month.is_empty() && !self.by_month.contains(&date.month()) {
            return false;
        }
        if !self.by_month_day.is_empty() && !self.by_month_day.contains(&date.day()) {
            return false;
        }
        if !self.by_weekday.is_empty() && !self.by_weekday.contains(&date.weekday()) {
            return false;
        }
        if !self.matches_implicit_parts(date) {
            return false;
        }
        self.elapsed_periods(date) % u64::from(self.interval) == 0
    }

    /// Returns the first occurrence strictly after `date`
    ///
    /// Only periods selected by the interval are visited, one day at a time
    /// within each. Returns `None` for rules that can never fire (e.g.
    /// `every: 31 feb`) or whose next period lies beyond the calendar.
    pub fn next_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let start = match date.succ_opt() {
            Some(next) if next > self.anchor => next,
            Some(_) => self.anchor,
            None => return None,
        };

        let interval = u64::from(self.interval);
        let first = self.elapsed_periods(start).div_ceil(interval) * interval;

        for step in 0..MAX_PERIODS {
            let period = first.checked_add(step.checked_mul(interval)?)?;
            let (begin, end) = self.period_bounds(period)?;

            let mut candidate = begin.max(start);
            while candidate < end {
                if self.occurs_on(candidate) {
                    return Some(candidate);
                }
                candidate = candidate.succ_opt()?;
            }
        }
        None
    }

    /// First day of the `period`-th period after the anchor's, and the first
    /// day of the one after it
    fn period_bounds(&self, period: u64) -> Option<(NaiveDate, NaiveDate)> {
        let period = i64::try_from(period).ok()?;
        let anchor = self.anchor;
        let begin_of = |n: i64| -> Option<NaiveDate> {
            match self.frequency {
                Frequency::Daily => anchor.checked_add_signed(Duration::try_days(n)?),
                Frequency::Weekly => {
                    week_start(anchor).checked_add_signed(Duration::try_weeks(n)?)
                }
                Frequency::Monthly => {
                    let month = (i64::from(anchor.year()) * 12 + i64::from(anchor.month0()))
                        .checked_add(n)?;
                    let year = i32::try_from(month.div_euclid(12)).ok()?;
                    NaiveDate::from_ymd_opt(year, u32::try_from(month.rem_euclid(12)).ok()? + 1, 1)
                }
                Frequency::Yearly => {
                    let year = i32::try_from(i64::from(anchor.year()).checked_add(n)?).ok()?;
                    NaiveDate::from_ymd_opt(year, 1, 1)
                }
            }
        };

        let begin = begin_of(period)?;
        let end = begin_of(period.checked_add(1)?)?;
        Some((begin, end))
    }

    /// Fields that default to the anchor when no BYxxx part covers them
    fn matches_implicit_parts(&self, date: NaiveDate) -> bool {
        let anchor = self.anchor;
        let no_weekday = self.by_weekday.is_empty();
        let no_month_day = self.by_month_day.is_empty();
        let no_month = self.by_month.is_empty();

        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => !no_weekday || date.weekday() == anchor.weekday(),
            Frequency::Monthly => !no_weekday || !no_month_day || date.day() == anchor.day(),
            Frequency::Yearly => {
                if !no_weekday {
                    return true;
                }
                if no_month_day && no_month {
                    return date.month() == anchor.month() && date.day() == anchor.day();
                }
                if no_month_day {
                    return date.day() == anchor.day();
                }
                true
            }
        }
    }

    fn elapsed_periods(&self, date: NaiveDate) -> u64 {
        let anchor = self.anchor;
        let periods = match self.frequency {
            Frequency::Daily => (date - anchor).num_days(),
            Frequency::Weekly => (week_start(date) - week_start(anchor)).num_days() / 7,
            Frequency::Monthly => {
                (i64::from(date.year()) * 12 + i64::from(date.month0()))
                    - (i64::from(anchor.year()) * 12 + i64::from(anchor.month0()))
            }
            Frequency::Yearly => i64::from(date.year() - anchor.year()),
        };
        u64::try_from(periods).unwrap_or(0)
    }
}

/// Periods visited by [`Recurrence::next_after`]; the Gregorian calendar
/// repeats every 400 years, so a rule that fires at all fires within this many
const MAX_PERIODS: u64 = 400;

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}
