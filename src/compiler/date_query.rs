//! Date-oriented how-many/find queries.
//!
//! Operates on the first column whose name contains "date". The column is
//! coerced to date cells in place before matching; unparsable cells become
//! null and are excluded from every comparison. Recognized forms, in
//! priority order: "today", "yesterday", a `YYYY-MM-DD` literal (equality,
//! unless an after/before/on qualifier directly precedes it), nothing else.

use chrono::{Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::Outcome;
use crate::condition::{CompareOp, Predicate};
use crate::error::InstructionError;
use crate::lexicon::IntentLexicon;
use crate::table::{Table, Value};

static DATE_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("date literal pattern is valid"));

static QUALIFIED_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(after|before|on|apres|avant)\s*(\d{4}-\d{2}-\d{2})\b")
        .expect("qualified date pattern is valid")
});

const DATE_TEMPLATE: &str = "Could not understand the date condition. Please use keywords like \
     'after', 'before', 'on', or a specific date.";

pub(crate) fn run(
    lexicon: &IntentLexicon,
    instruction: &str,
    table: &mut Table,
) -> Result<Outcome, InstructionError> {
    let column = table
        .first_date_column()
        .ok_or(InstructionError::NoDateColumn)?
        .to_string();
    table.coerce_date_column(&column);

    let lowered = instruction.to_lowercase();
    let today = Local::now().date_naive();

    let (op, date, described) = if lexicon.mentions_today(&lowered) {
        (CompareOp::On, today, "dated today".to_string())
    } else if lexicon.mentions_yesterday(&lowered) {
        (CompareOp::On, today - Duration::days(1), "dated yesterday".to_string())
    } else if let Some(caps) = QUALIFIED_DATE_RE.captures(&lowered) {
        let date = parse_literal(&caps[2])?;
        let qualifier = caps[1].to_lowercase();
        let op = match qualifier.as_str() {
            "after" | "apres" => CompareOp::After,
            "before" | "avant" => CompareOp::Before,
            _ => CompareOp::On,
        };
        (op, date, format!("where {column} is {qualifier} {date}"))
    } else if let Some(caps) = DATE_LITERAL_RE.captures(&lowered) {
        let date = parse_literal(&caps[1])?;
        (CompareOp::On, date, format!("with a date of {date}"))
    } else {
        return Err(InstructionError::template(DATE_TEMPLATE));
    };

    let predicate = Predicate::Leaf {
        column: column.clone(),
        op,
        value: Value::Date(date),
    };
    debug!(%column, ?op, %date, "date query compiled");

    let view: &Table = table;
    if lexicon.has_find_keyword(&lowered) {
        Ok(Outcome::Rows(view.select(|row| predicate.matches(view, row))))
    } else {
        let matched = view.count_where(|row| predicate.matches(view, row));
        let message = format!("Number of records {described}: {matched}");
        Ok(Outcome::Count { matched, message })
    }
}

fn parse_literal(text: &str) -> Result<NaiveDate, InstructionError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| InstructionError::template(DATE_TEMPLATE))
}
