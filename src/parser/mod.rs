//! Task line parser
//!
//! Recognizes checkbox list items such as
//!
//! ```text
//! - [ ] Renew passport due:2024-06-01 p:1 every:year
//! ```
//!
//! and turns them into [`Task`] values. Lines that are not tasks are
//! skipped; a task line with an unreadable priority is rejected as a whole.

mod fields;
mod recurrence;

pub use recurrence::{parse_recurrence, RecurrenceError};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Frontmatter, Identifier, Status, Task};
use fields::{FieldKey, COMPLETED, DUE, EVERY, PRIORITY, SCHEDULED};

/// Parse errors that abort a single task line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed {field} value: '{value}'")]
    MalformedField { field: &'static str, value: String },
}

/// Parses task lines belonging to one document version
#[derive(Debug, Clone, Copy)]
pub struct TaskParser<'a> {
    path: &'a str,
    version: &'a str,
    reference: NaiveDate,
}

impl<'a> TaskParser<'a> {
    /// `reference` anchors recurrence rules found on parsed lines.
    pub fn new(path: &'a str, version: &'a str, reference: NaiveDate) -> Self {
        Self {
            path,
            version,
            reference,
        }
    }

    /// Parses one physical line.
    ///
    /// Returns `Ok(None)` when the line is not a task.
    pub fn parse_line(&self, line: usize, text: &str) -> Result<Option<Task>, ParseError> {
        let Some((status, name_start)) = checkbox(text) else {
            return Ok(None);
        };

        let name_end = fields::first_key(text, name_start).unwrap_or(text.len());
        let name = text[name_start..name_end].trim();

        let identifier = Identifier::new(self.path, line, self.version);
        let mut builder = Task::builder(identifier, name, status);

        if let Some(due) = date_field(&DUE, text, name_end) {
            builder = builder.due(due);
        }
        if let Some(scheduled) = date_field(&SCHEDULED, text, name_end) {
            builder = builder.scheduled(scheduled);
        }
        if let Some(completed) = date_field(&COMPLETED, text, name_end) {
            builder = builder.completed(completed);
        }

        if let Some(value) = field_value(&PRIORITY, text, name_end) {
            builder = builder.priority(fields::parse_priority(value)?);
        }

        if let Some(value) = field_value(&EVERY, text, name_end) {
            match parse_recurrence(value, self.reference) {
                Ok(Some((every, _))) => builder = builder.every(every),
                Ok(None) => {}
                Err(e) => debug!(path = self.path, line, error = %e, "dropping recurrence"),
            }
        }

        Ok(Some(builder.build()))
    }

    /// Parses every task in a document body.
    ///
    /// Lines are numbered from the top of the file; front matter lines are
    /// never parsed. Malformed lines are logged and skipped.
    pub fn parse_document(&self, content: &str) -> Vec<Task> {
        let preamble = Frontmatter::line_count(content);

        content
            .split('\n')
            .enumerate()
            .skip(preamble)
            .filter_map(|(index, raw)| {
                let line = index + 1;
                let text = raw.strip_suffix('\r').unwrap_or(raw);
                match self.parse_line(line, text) {
                    Ok(task) => task,
                    Err(e) => {
                        debug!(path = self.path, line, error = %e, "skipping malformed task");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Matches `- [x] ` and returns the status plus the byte offset of the name
fn checkbox(text: &str) -> Option<(Status, usize)> {
    let bytes = text.as_bytes();

    let dash = fields::skip_inline_whitespace(text, 0);
    if bytes.get(dash) != Some(&b'-') {
        return None;
    }

    let open = fields::skip_inline_whitespace(text, dash + 1);
    if bytes.get(open) != Some(&b'[') {
        return None;
    }

    let status = Status::from_marker(char::from(*bytes.get(open + 1)?))?;
    if bytes.get(open + 2) != Some(&b']') || bytes.get(open + 3) != Some(&b' ') {
        return None;
    }

    Some((status, open + 4))
}

/// Text following the first valid occurrence of `key`, leading blanks skipped
fn field_value<'t>(key: &FieldKey, text: &'t str, from: usize) -> Option<&'t str> {
    let range = key.find(text, from)?;
    Some(&text[fields::skip_inline_whitespace(text, range.end)..])
}

fn date_field(key: &FieldKey, text: &str, from: usize) -> Option<NaiveDate> {
    field_value(key, text, from).and_then(fields::parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Frequency, Recurrence};
    use chrono::Weekday;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference() -> NaiveDate {
        date(2024, 1, 1)
    }

    fn parser() -> TaskParser<'static> {
        TaskParser::new("notes.md", "v1", reference())
    }

    fn parse(text: &str) -> Task {
        parser()
            .parse_line(1, text)
            .expect("line parses")
            .expect("line is a task")
    }

    #[test]
    fn plain_task() {
        let task = parse("- [ ] Buy milk");
        assert_eq!(task.name(), "Buy milk");
        assert_eq!(task.status(), Status::Todo);
        assert_eq!(task.path(), "notes.md");
        assert_eq!(task.line(), 1);
        assert_eq!(task.version(), "v1");
    }

    #[test]
    fn status_markers() {
        assert_eq!(parse("- [x] a").status(), Status::Done);
        assert_eq!(parse("- [X] a").status(), Status::Done);
        assert_eq!(parse("- [a] a").status(), Status::Abandoned);
        assert_eq!(parse("- [b] a").status(), Status::Blocked);
        assert_eq!(parse("- [/] a").status(), Status::Doing);
    }

    #[test]
    fn indented_task() {
        let task = parse("    -   [ ] nested");
        assert_eq!(task.name(), "nested");
    }

    #[test]
    fn non_task_lines() {
        let p = parser();
        for text in [
            "",
            "# Heading",
            "- plain bullet",
            "* [ ] star bullet",
            "- [q] unknown marker",
            "- [ ]no space",
            "- [ ]",
            "- [x]",
        ] {
            assert_eq!(p.parse_line(1, text), Ok(None), "{text:?}");
        }
    }

    #[test]
    fn all_fields() {
        let task = parse(
            "- [x] Pay rent due:2024-02-01 scheduled:2024-01-28 completed:2024-01-30 priority:2 every:month",
        );
        assert_eq!(task.name(), "Pay rent");
        assert_eq!(task.due(), Some(date(2024, 2, 1)));
        assert_eq!(task.scheduled(), Some(date(2024, 1, 28)));
        assert_eq!(task.completed(), Some(date(2024, 1, 30)));
        assert_eq!(task.priority(), Some(2));
        assert_eq!(task.every().map(Recurrence::frequency), Some(Frequency::Monthly));
    }

    #[test]
    fn short_keys_any_order() {
        let task = parse("- [ ] Call mom p:1 e:weekend d:2024-03-03 s:2024-03-02");
        assert_eq!(task.name(), "Call mom");
        assert_eq!(task.priority(), Some(1));
        assert_eq!(task.due(), Some(date(2024, 3, 3)));
        assert_eq!(task.scheduled(), Some(date(2024, 3, 2)));
        assert_eq!(task.every().unwrap().by_weekday(), &[Weekday::Sat]);
    }

    #[test]
    fn whitespace_after_key() {
        let task = parse("- [ ] Stretch due: 2024-05-05");
        assert_eq!(task.due(), Some(date(2024, 5, 5)));
    }

    #[test]
    fn short_key_inside_word_is_ignored() {
        let task = parse("- [ ] Read hd:foo");
        assert_eq!(task.name(), "Read hd:foo");
        assert!(task.due().is_none());
    }

    #[test]
    fn every_after_due_is_found() {
        let task = parse("- [ ] Water plants due:2024-01-10 every:3 days");
        assert_eq!(task.name(), "Water plants");
        assert_eq!(task.due(), Some(date(2024, 1, 10)));
        let every = task.every().unwrap();
        assert_eq!(every.interval(), 3);
        assert_eq!(every.text(), "3 days");
    }

    #[test]
    fn invalid_date_drops_the_field() {
        let task = parse("- [ ] Plan due:2024-02-30 p:3");
        assert!(task.due().is_none());
        assert_eq!(task.priority(), Some(3));
    }

    #[test]
    fn malformed_priority_rejects_the_line() {
        assert_eq!(
            parser().parse_line(1, "- [ ] Plan priority:high"),
            Err(ParseError::MalformedField {
                field: "priority",
                value: "high".to_string()
            })
        );
        assert!(parser().parse_line(1, "- [ ] Plan p:").is_err());
        assert!(parser().parse_line(1, "- [ ] Plan p:99999999999").is_err());
    }

    #[test]
    fn invalid_recurrence_keeps_the_task() {
        let task = parse("- [ ] Nap every:0 days");
        assert!(task.every().is_none());

        let task = parse("- [ ] Nap every:sometimes");
        assert!(task.every().is_none());
    }

    #[test]
    fn recurrence_uses_reference_date() {
        let task = parse("- [ ] Review e:week");
        assert_eq!(task.every().unwrap().anchor(), reference());
    }

    #[test]
    fn trailing_text_is_discarded() {
        let task = parse("- [ ] Ship it due:2024-01-01 and then celebrate");
        assert_eq!(task.to_string(), "- [ ] Ship it due:2024-01-01");
    }

    #[test]
    fn document_skips_frontmatter_and_bad_lines() {
        let content = "---\ntype: daily\n---\n# Today\n- [ ] one\n- [ ] bad p:x\n\n- [x] two\r\n";
        let tasks = parser().parse_document(content);

        let lines: Vec<_> = tasks.iter().map(|t| (t.line(), t.name().to_string())).collect();
        assert_eq!(lines, vec![(5, "one".to_string()), (8, "two".to_string())]);
    }

    #[test]
    fn document_frontmatter_lines_are_never_tasks() {
        let content = "---\n- [ ] not a task\n---\n- [ ] real\n";
        let tasks = parser().parse_document(content);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].line(), 4);
    }

    const RULES: [&str; 6] = ["day", "weekday", "3 weeks", "monday, friday", "15 march", "1st 15th"];

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2000i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| date(y, m, d))
    }

    fn arb_task() -> impl Strategy<Value = Task> {
        (
            "[A-Za-z][A-Za-z0-9 ]{0,20}[A-Za-z0-9]",
            prop::sample::select(Status::ALL.to_vec()),
            prop::option::of(arb_date()),
            prop::option::of(arb_date()),
            prop::option::of(arb_date()),
            prop::option::of(any::<u32>()),
            prop::option::of(prop::sample::select(RULES.to_vec())),
        )
            .prop_map(|(name, status, due, scheduled, completed, priority, every)| {
                let mut builder = Task::builder(Identifier::new("notes.md", 1, "v1"), name, status);
                if let Some(d) = due {
                    builder = builder.due(d);
                }
                if let Some(d) = scheduled {
                    builder = builder.scheduled(d);
                }
                if let Some(d) = completed {
                    builder = builder.completed(d);
                }
                if let Some(p) = priority {
                    builder = builder.priority(p);
                }
                if let Some(rule) = every {
                    let (rule, _) = parse_recurrence(rule, reference()).unwrap().unwrap();
                    builder = builder.every(rule);
                }
                builder.build()
            })
    }

    proptest! {
        #[test]
        fn rendered_tasks_parse_back(task in arb_task()) {
            let line = task.to_string();
            let parsed = parser().parse_line(1, &line).unwrap();
            prop_assert_eq!(parsed, Some(task));
        }
    }
}
