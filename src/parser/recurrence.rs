//! The `every:` micro-language
//!
//! Supported forms, tried in order:
//!
//! - a single word: `day`, `week`, `month`, `year`, `weekday`, `weekend`
//! - a weekday list: `monday, wed fri`
//! - an interval: `3 days`, `2 weeks`
//! - month days and month names: `15`, `1st 15th`, `march`, `15 march`
//!
//! Words are matched case-insensitively and as whole tokens, so `week` never
//! matches the start of `weekday` and `mon` never matches `month`.

use chrono::{NaiveDate, Weekday};
use thiserror::Error;

use crate::domain::{Frequency, Recurrence};

/// A rule that matches syntactically but cannot be scheduled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("invalid recurrence interval: {0}")]
    InvalidInterval(String),
}

const WEEKDAYS: [(&str, &str, Weekday); 7] = [
    ("monday", "mon", Weekday::Mon),
    ("tuesday", "tue", Weekday::Tue),
    ("wednesday", "wed", Weekday::Wed),
    ("thursday", "thu", Weekday::Thu),
    ("friday", "fri", Weekday::Fri),
    ("saturday", "sat", Weekday::Sat),
    ("sunday", "sun", Weekday::Sun),
];

const MONTHS: [(&str, &str, u32); 12] = [
    ("january", "jan", 1),
    ("february", "feb", 2),
    ("march", "mar", 3),
    ("april", "apr", 4),
    ("may", "may", 5),
    ("june", "jun", 6),
    ("july", "jul", 7),
    ("august", "aug", 8),
    ("september", "sep", 9),
    ("october", "oct", 10),
    ("november", "nov", 11),
    ("december", "dec", 12),
];

const ORDINALS: [&str; 4] = ["st", "nd", "rd", "th"];

const WORKWEEK: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// Parses a recurrence rule at the start of `input`.
///
/// Returns the rule and the number of bytes consumed, or `None` if no form
/// matches. `anchor` becomes the rule's start date.
pub fn parse_recurrence(
    input: &str,
    anchor: NaiveDate,
) -> Result<Option<(Recurrence, usize)>, RecurrenceError> {
    let mut scanner = Scanner::new(input);
    scanner.skip_inline_whitespace();
    let start = scanner.pos;

    let draft = if let Some(draft) = single_word(&mut scanner) {
        draft
    } else if let Some(draft) = weekday_list(&mut scanner) {
        draft
    } else if let Some(draft) = interval(&mut scanner)? {
        draft
    } else if let Some(draft) = calendar(&mut scanner) {
        draft
    } else {
        return Ok(None);
    };

    let text = &input[start..scanner.pos];
    Ok(Some((draft.build(anchor, text), scanner.pos)))
}

/// Byte cursor over ASCII tokens; never stops inside a multi-byte char
struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> Option<&'a str> {
        let text = self.text;
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        let end = self.pos;
        (end > start).then(|| &text[start..end])
    }

    fn word(&mut self) -> Option<&'a str> {
        self.take_while(|b| b.is_ascii_alphabetic())
    }

    fn digits(&mut self) -> Option<&'a str> {
        self.take_while(|b| b.is_ascii_digit())
    }
}

/// Schedule parts collected by a branch before the rule is built
struct Draft {
    frequency: Frequency,
    interval: u32,
    weekdays: Vec<Weekday>,
    month_days: Vec<u32>,
    months: Vec<u32>,
}

impl Draft {
    fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            weekdays: Vec::new(),
            month_days: Vec::new(),
            months: Vec::new(),
        }
    }

    fn weekdays(mut self, days: &[Weekday]) -> Self {
        self.weekdays = days.to_vec();
        self
    }

    fn build(self, anchor: NaiveDate, text: &str) -> Recurrence {
        Recurrence::new(self.frequency, anchor, text)
            .with_interval(self.interval)
            .with_weekdays(self.weekdays)
            .with_month_days(self.month_days)
            .with_months(self.months)
    }
}

fn weekday(word: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(long, short, _)| word.eq_ignore_ascii_case(long) || word.eq_ignore_ascii_case(short))
        .map(|(_, _, day)| *day)
}

fn month(word: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(long, short, _)| word.eq_ignore_ascii_case(long) || word.eq_ignore_ascii_case(short))
        .map(|(_, _, month)| *month)
}

fn unit(word: &str) -> Option<Frequency> {
    match word.to_ascii_lowercase().as_str() {
        "day" | "days" => Some(Frequency::Daily),
        "week" | "weeks" => Some(Frequency::Weekly),
        "month" | "months" => Some(Frequency::Monthly),
        "year" | "years" => Some(Frequency::Yearly),
        _ => None,
    }
}

fn single_word(s: &mut Scanner<'_>) -> Option<Draft> {
    let mark = s.pos;
    let word = s.word()?;

    let draft = match word.to_ascii_lowercase().as_str() {
        "day" => Draft::new(Frequency::Daily),
        "week" => Draft::new(Frequency::Weekly),
        "month" => Draft::new(Frequency::Monthly),
        "year" => Draft::new(Frequency::Yearly),
        "weekday" => Draft::new(Frequency::Weekly).weekdays(&WORKWEEK),
        "weekend" => Draft::new(Frequency::Weekly).weekdays(&[Weekday::Sat]),
        _ => {
            s.pos = mark;
            return None;
        }
    };
    Some(draft)
}

fn weekday_list(s: &mut Scanner<'_>) -> Option<Draft> {
    let mut days = Vec::new();

    loop {
        let before = s.pos;
        if !days.is_empty() {
            while matches!(s.peek(), Some(b' ' | b'\t' | b',')) {
                s.pos += 1;
            }
            if s.pos == before {
                break;
            }
        }

        match s.word().and_then(weekday) {
            Some(day) => days.push(day),
            None => {
                s.pos = before;
                break;
            }
        }
    }

    (!days.is_empty()).then(|| Draft::new(Frequency::Weekly).weekdays(&days))
}

fn interval(s: &mut Scanner<'_>) -> Result<Option<Draft>, RecurrenceError> {
    let mark = s.pos;
    let Some(digits) = s.digits() else {
        return Ok(None);
    };

    let frequency = if s.eat(b' ') {
        s.word().and_then(unit)
    } else {
        None
    };
    let Some(frequency) = frequency else {
        s.pos = mark;
        return Ok(None);
    };

    let invalid = || RecurrenceError::InvalidInterval(digits.to_string());
    let interval: u32 = digits.parse().map_err(|_| invalid())?;
    if interval == 0 {
        return Err(invalid());
    }

    let mut draft = Draft::new(frequency);
    draft.interval = interval;
    Ok(Some(draft))
}

fn calendar(s: &mut Scanner<'_>) -> Option<Draft> {
    let mut days = Vec::new();
    let mut months = Vec::new();

    loop {
        let iteration = s.pos;

        s.eat(b' ');
        let day = month_day(s);
        if let Some(day) = day {
            days.push(day);
        }

        let before_month = s.pos;
        s.eat(b' ');
        let name = month_name(s);
        if let Some(name) = name {
            months.push(name);
        }

        match (day, name) {
            (None, None) => {
                s.pos = iteration;
                break;
            }
            (Some(_), None) => s.pos = before_month,
            _ => {}
        }
    }

    if days.is_empty() && months.is_empty() {
        return None;
    }
    if days.is_empty() {
        days.push(1);
    }

    let mut draft = Draft::new(Frequency::Yearly);
    draft.month_days = days;
    draft.months = months;
    Some(draft)
}

/// One or two digits in 1..=31, with an optional ordinal suffix
fn month_day(s: &mut Scanner<'_>) -> Option<u32> {
    let mark = s.pos;
    let day = s
        .digits()
        .filter(|digits| digits.len() <= 2)
        .and_then(|digits| digits.parse::<u32>().ok())
        .filter(|day| (1..=31).contains(day));

    let Some(day) = day else {
        s.pos = mark;
        return None;
    };

    let after_digits = s.pos;
    let suffix = s.word();
    if !suffix.is_some_and(|w| ORDINALS.iter().any(|o| w.eq_ignore_ascii_case(o))) {
        s.pos = after_digits;
    }
    Some(day)
}

fn month_name(s: &mut Scanner<'_>) -> Option<u32> {
    let mark = s.pos;
    let found = s.word().and_then(month);
    if found.is_none() {
        s.pos = mark;
    }
    found
}
