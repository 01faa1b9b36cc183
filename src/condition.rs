//! Natural-language condition parsing.
//!
//! A condition clause ("region is east and priority greater than 3 or
//! status contains open") is split on ` or ` into OR-groups, each OR-group
//! on ` and ` into AND-groups, and each atom matched against
//! `<column> <operator> <value>`. Atoms are typed against the target table:
//! on a numeric column the literal is coerced to a number, otherwise
//! comparisons are case-insensitive text operations.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::InstructionError;
use crate::table::value::is_digit_coercible;
use crate::table::{Table, Value};

/// Comparison operator of a predicate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Equals,
    GreaterThan,
    LessThan,
    Contains,
    /// Date-only: strictly later than the literal.
    After,
    /// Date-only: strictly earlier than the literal.
    Before,
    /// Date-only: the same calendar day as the literal.
    On,
}

/// Boolean condition tree over table rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Leaf {
        column: String,
        op: CompareOp,
        value: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

// Operator phrases, longest variants first so the alternation never
// truncates a two-word operator to its one-word suffix.
static ATOM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\w+)\s+(greater than|less than|plus grand que|plus petit que|superieur a|inferieur a|equals|egale|contains|contient|is|est)\s+([\w\s.]+)",
    )
    .expect("atom pattern is valid")
});

impl Predicate {
    /// Parse a condition clause against a table's columns.
    ///
    /// Splitting happens before trimming so a dangling ` or ` / ` and `
    /// leaves an empty group behind and fails, instead of being absorbed
    /// into the neighboring atom's value.
    pub fn parse(condition: &str, table: &Table) -> Result<Predicate, InstructionError> {
        let text = condition.to_lowercase();

        let mut or_groups = Vec::new();
        for or_part in text.split(" or ") {
            let mut and_groups = Vec::new();
            for and_part in or_part.split(" and ") {
                if and_part.trim().is_empty() {
                    return Err(InstructionError::UnparsableCondition(
                        condition.trim().to_string(),
                    ));
                }
                and_groups.push(parse_atom(and_part, table)?);
            }
            or_groups.push(match and_groups.len() {
                1 => and_groups.remove(0),
                _ => Predicate::And(and_groups),
            });
        }

        Ok(match or_groups.len() {
            1 => or_groups.remove(0),
            _ => Predicate::Or(or_groups),
        })
    }

    /// Evaluate the predicate against one row of `table`.
    pub fn matches(&self, table: &Table, row: &[Value]) -> bool {
        match self {
            Predicate::And(parts) => parts.iter().all(|p| p.matches(table, row)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(table, row)),
            Predicate::Leaf { column, op, value } => {
                let Some(idx) = table.column_index(column) else {
                    return false;
                };
                compare(&row[idx], *op, value)
            }
        }
    }
}

/// Split one `<column> <operator> <value>` atom into its raw pieces
/// (column text, lowercased operator phrase, trimmed value text).
pub(crate) fn split_atom(clause: &str) -> Option<(String, String, String)> {
    ATOM_RE.captures(clause).map(|caps| {
        (
            caps[1].to_string(),
            caps[2].to_lowercase(),
            caps[3].trim().to_string(),
        )
    })
}

/// Parse one atom against the table's columns.
fn parse_atom(clause: &str, table: &Table) -> Result<Predicate, InstructionError> {
    let (column_text, phrase, value_text) = split_atom(clause)
        .ok_or_else(|| InstructionError::UnparsableCondition(clause.trim().to_string()))?;

    let column = table
        .resolve_column(&column_text)
        .ok_or(InstructionError::UnknownColumn(column_text))?
        .to_string();

    let op = op_from_phrase(&phrase);
    typed_leaf(table, column, op, &phrase, value_text)
}

fn op_from_phrase(phrase: &str) -> CompareOp {
    match phrase {
        "greater than" | "plus grand que" | "superieur a" => CompareOp::GreaterThan,
        "less than" | "plus petit que" | "inferieur a" => CompareOp::LessThan,
        "contains" | "contient" => CompareOp::Contains,
        // is / est / equals / egale
        _ => CompareOp::Equals,
    }
}

/// Build a leaf typed against the target column.
pub(crate) fn typed_leaf(
    table: &Table,
    column: String,
    op: CompareOp,
    phrase: &str,
    value_text: String,
) -> Result<Predicate, InstructionError> {
    if table.is_numeric(&column) {
        if !is_digit_coercible(&value_text) {
            return Err(InstructionError::TypeCoercion {
                column,
                value: value_text,
            });
        }
        let number: f64 = value_text
            .parse()
            .map_err(|_| InstructionError::TypeCoercion {
                column: column.clone(),
                value: value_text.clone(),
            })?;
        // On a numeric column "contains" degrades to equality.
        let op = match op {
            CompareOp::Contains => CompareOp::Equals,
            other => other,
        };
        return Ok(Predicate::Leaf {
            column,
            op,
            value: Value::Number(number),
        });
    }

    match op {
        CompareOp::GreaterThan | CompareOp::LessThan => {
            Err(InstructionError::UnsupportedOperator(phrase.to_string()))
        }
        _ => Ok(Predicate::Leaf {
            column,
            op,
            value: Value::Text(value_text),
        }),
    }
}

/// Compare a single cell against a literal. Null cells never match.
fn compare(cell: &Value, op: CompareOp, literal: &Value) -> bool {
    match (op, literal) {
        (CompareOp::Equals, Value::Number(n)) => cell.as_number() == Some(*n),
        (CompareOp::GreaterThan, Value::Number(n)) => {
            cell.as_number().map_or(false, |v| v > *n)
        }
        (CompareOp::LessThan, Value::Number(n)) => {
            cell.as_number().map_or(false, |v| v < *n)
        }
        (CompareOp::Equals, Value::Text(t)) => {
            cell.as_comparable_text() == Some(t.to_lowercase())
        }
        (CompareOp::Contains, Value::Text(t)) => cell
            .as_comparable_text()
            .map_or(false, |text| text.contains(&t.to_lowercase())),
        (CompareOp::After, Value::Date(d)) => cell.as_date().map_or(false, |v| v > *d),
        (CompareOp::Before, Value::Date(d)) => cell.as_date().map_or(false, |v| v < *d),
        (CompareOp::On, Value::Date(d)) => cell.as_date() == Some(*d),
        _ => false,
    }
}
