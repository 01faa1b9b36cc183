//! Instruction compiler: intent dispatch and per-intent extraction.
//!
//! One handler per intent. Every handler finishes all parsing and
//! validation before it touches the table, so a failed instruction leaves
//! the table exactly as it found it; mutating handlers persist through the
//! store before returning.

pub mod date_query;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::condition::{self, CompareOp, Predicate};
use crate::error::InstructionError;
use crate::lexicon::{Intent, IntentLexicon};
use crate::table::value::is_digit_coercible;
use crate::table::{Table, TableStore, Value};

/// Result of one compiled-and-applied instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Full table after a mutation (add / update).
    Table(Table),
    /// Detached set of rows matching a filter.
    Rows(Table),
    /// Row count phrased as a chat reply.
    Count { matched: usize, message: String },
    /// Status confirmation for destructive operations.
    Status(String),
}

static ADD_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w+)\s+(?:is|est)\s+([\w\s.]+)").expect("add pattern is valid"));

static UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:update|edit|set|modifier|modifie|mettre a jour)\s+(\w+)\s+to\s+([\w\s.]+?)\s+where\s+(.+)",
    )
    .expect("update pattern is valid")
});

static DELETE_WHERE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:delete|remove|supprimer|supprime)\b[\w\s]*?\bwhere\b\s*(.+)")
        .expect("delete pattern is valid")
});

// Count accepts "of" ("number of records of region east"); filter does not.
static COUNT_OP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(greater than|less than|plus grand que|plus petit que|superieur a|inferieur a|equals|egale|before|after|avant|apres|is|est|of)\s*([\w\s.]+)",
    )
    .expect("count operator pattern is valid")
});

static FILTER_OP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(greater than|less than|plus grand que|plus petit que|superieur a|inferieur a|equals|egale|before|after|avant|apres|is|est)\s*([\w\s.]+)",
    )
    .expect("filter operator pattern is valid")
});

static TRAILING_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.][\w\s.]*").expect("value pattern is valid"));

const ADD_TEMPLATE: &str = "Could not parse the addition instruction. Please follow the format: \
     'Add a record where column1 is value1, column2 is value2, ...'";
const UPDATE_TEMPLATE: &str = "Could not parse the update instruction. Please follow the format: \
     'Update column to value where condition'.";
const DELETE_TEMPLATE: &str = "Could not parse the delete instruction. Please follow the format: \
     'Delete (or remove) records where column operator value', using 'greater than', 'less than', \
     'equals', 'is' or 'contains'.";
const CONDITION_TEMPLATE: &str = "Could not understand the condition. Please use keywords like \
     'greater than', 'less than', 'equals', 'is', 'before', 'after'.";

// Prefix vocabulary that must not survive into the delete condition; a
// remainder opening with one of these means the template itself was
// malformed rather than a condition.
const DELETE_PREFIX_WORDS: &[&str] = &[
    "delete",
    "remove",
    "records",
    "record",
    "where",
    "supprimer",
    "supprime",
];

/// The rule compiler. Holds the keyword lexicon; all other state lives in
/// the table and store passed per call.
#[derive(Debug, Clone, Default)]
pub struct InstructionCompiler {
    lexicon: IntentLexicon,
}

impl InstructionCompiler {
    pub fn new() -> Self {
        Self {
            lexicon: IntentLexicon::default(),
        }
    }

    /// Swap in a custom keyword lexicon.
    pub fn with_lexicon(lexicon: IntentLexicon) -> Self {
        Self { lexicon }
    }

    /// Classify without executing; the session uses this for routing.
    pub fn classify(&self, instruction: &str) -> Intent {
        self.lexicon.classify(instruction)
    }

    /// Compile and apply one instruction against the session's table.
    pub fn handle(
        &self,
        instruction: &str,
        table: &mut Table,
        store: &TableStore,
    ) -> Result<Outcome, InstructionError> {
        let intent = self.lexicon.classify(instruction);
        debug!(?intent, instruction, "instruction classified");

        match intent {
            Intent::Add => self.handle_add(instruction, table, store),
            Intent::Update => self.handle_update(instruction, table, store),
            Intent::Delete => self.handle_delete(instruction, table, store),
            Intent::DateQuery => date_query::run(&self.lexicon, instruction, table),
            Intent::Count => self.handle_count(instruction, table),
            Intent::Filter => self.handle_filter(instruction, table),
            Intent::Unrecognized => Err(InstructionError::Unrecognized),
        }
    }

    /// add: collect `<col> is <value>` pairs from comma/and-separated
    /// segments, drop unknown columns, append one row, persist.
    fn handle_add(
        &self,
        instruction: &str,
        table: &mut Table,
        store: &TableStore,
    ) -> Result<Outcome, InstructionError> {
        let mut pairs: Vec<(String, Value)> = Vec::new();
        let mut any_pair = false;

        for segment in instruction.split(',').flat_map(|s| s.split(" and ")) {
            let Some(caps) = ADD_PAIR_RE.captures(segment) else {
                continue;
            };
            any_pair = true;
            match table.resolve_column(&caps[1]) {
                Some(column) => pairs.push((
                    column.to_string(),
                    Value::Text(caps[2].trim().to_string()),
                )),
                None => {
                    debug!(column = &caps[1], "dropping unknown column from add pair");
                }
            }
        }

        if !any_pair {
            return Err(InstructionError::template(ADD_TEMPLATE));
        }
        if pairs.is_empty() {
            return Err(InstructionError::NoValidColumns);
        }

        let row = table.row_from_pairs(&pairs);
        table.push_row(row);
        persist(table, store)?;
        Ok(Outcome::Table(table.clone()))
    }

    /// update: `update <column> to <value> where <condition>`.
    fn handle_update(
        &self,
        instruction: &str,
        table: &mut Table,
        store: &TableStore,
    ) -> Result<Outcome, InstructionError> {
        let caps = UPDATE_RE
            .captures(instruction)
            .ok_or_else(|| InstructionError::template(UPDATE_TEMPLATE))?;

        let column = table
            .resolve_column(&caps[1])
            .ok_or_else(|| InstructionError::UnknownColumn(caps[1].to_string()))?
            .to_string();
        let value_text = caps[2].trim().to_string();
        let predicate = Predicate::parse(&caps[3], table)?;

        let value = if table.is_numeric(&column) {
            if !is_digit_coercible(&value_text) {
                return Err(InstructionError::TypeCoercion {
                    column,
                    value: value_text,
                });
            }
            Value::Number(value_text.parse().map_err(|_| {
                InstructionError::TypeCoercion {
                    column: column.clone(),
                    value: value_text.clone(),
                }
            })?)
        } else {
            Value::Text(value_text)
        };

        let mask = {
            let view: &Table = table;
            view.match_mask(|row| predicate.matches(view, row))
        };
        let changed = table.update_rows(&mask, &column, value);
        debug!(%column, changed, "update applied");
        persist(table, store)?;
        Ok(Outcome::Table(table.clone()))
    }

    /// delete: strip the `delete/remove records where` prefix, then match a
    /// single `<column> <operator> <value>` condition.
    fn handle_delete(
        &self,
        instruction: &str,
        table: &mut Table,
        store: &TableStore,
    ) -> Result<Outcome, InstructionError> {
        let caps = DELETE_WHERE_RE
            .captures(instruction)
            .ok_or_else(|| InstructionError::template(DELETE_TEMPLATE))?;
        let remainder = caps[1].trim().to_string();

        // A remainder that still opens with prefix vocabulary means the
        // operator match would bind template words, not a condition.
        if remainder
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .is_some_and(|first| DELETE_PREFIX_WORDS.contains(&first.as_str()))
        {
            return Err(InstructionError::template(DELETE_TEMPLATE));
        }

        let (column_text, phrase, value_text) = condition::split_atom(&remainder)
            .ok_or_else(|| InstructionError::template(DELETE_TEMPLATE))?;
        let column = table
            .resolve_column(&column_text)
            .ok_or(InstructionError::UnknownColumn(column_text))?
            .to_string();

        let predicate = match phrase.as_str() {
            "greater than" | "less than" | "equals" | "plus grand que" | "plus petit que"
            | "superieur a" | "inferieur a" | "egale" => {
                if !table.is_numeric(&column) || !is_digit_coercible(&value_text) {
                    return Err(InstructionError::TypeCoercion {
                        column,
                        value: value_text,
                    });
                }
                let op = match phrase.as_str() {
                    "greater than" | "plus grand que" | "superieur a" => CompareOp::GreaterThan,
                    "less than" | "plus petit que" | "inferieur a" => CompareOp::LessThan,
                    _ => CompareOp::Equals,
                };
                Predicate::Leaf {
                    column: column.clone(),
                    op,
                    value: Value::Number(value_text.parse().map_err(|_| {
                        InstructionError::TypeCoercion {
                            column: column.clone(),
                            value: value_text.clone(),
                        }
                    })?),
                }
            }
            // "is" deliberately matches by substring here, same as contains.
            _ => Predicate::Leaf {
                column: column.clone(),
                op: CompareOp::Contains,
                value: Value::Text(value_text),
            },
        };

        let mask = {
            let view: &Table = table;
            view.match_mask(|row| predicate.matches(view, row))
        };
        let removed = table.delete_rows(&mask);
        debug!(%column, removed, "delete applied");
        persist(table, store)?;
        Ok(Outcome::Status(format!(
            "Records deleted successfully ({removed} removed)."
        )))
    }

    /// count: single-leaf query over the first column named in the text,
    /// replied as a formatted sentence.
    fn handle_count(
        &self,
        instruction: &str,
        table: &Table,
    ) -> Result<Outcome, InstructionError> {
        let lowered = instruction.to_lowercase();
        let (column, rest) = locate_column(table, &lowered)?;
        let (predicate, phrase, value_text) =
            single_leaf(table, &column, rest, &COUNT_OP_RE)?;

        let matched = table.count_where(|row| predicate.matches(table, row));
        let message = format!(
            "Number of records where {column} {phrase} '{value_text}': {matched}"
        );
        Ok(Outcome::Count { matched, message })
    }

    /// filter: same single-leaf query, replied as the matching rows.
    fn handle_filter(
        &self,
        instruction: &str,
        table: &Table,
    ) -> Result<Outcome, InstructionError> {
        let lowered = instruction.to_lowercase();
        let (column, rest) = locate_column(table, &lowered)?;
        let (predicate, _, _) = single_leaf(table, &column, rest, &FILTER_OP_RE)?;
        Ok(Outcome::Rows(table.select(|row| predicate.matches(table, row))))
    }
}

fn persist(table: &Table, store: &TableStore) -> Result<(), InstructionError> {
    store.save(table).map_err(InstructionError::SaveFailed)
}

/// Locate the column the instruction refers to: every column whose name
/// appears in the lowercased text is a candidate, the longest name wins,
/// and an equal-length tie between distinct columns is ambiguous.
fn locate_column<'t>(
    table: &Table,
    lowered: &'t str,
) -> Result<(String, &'t str), InstructionError> {
    let mut candidates: Vec<(&str, usize)> = table
        .columns()
        .iter()
        .filter_map(|col| {
            let name = col.to_lowercase();
            lowered.find(&name).map(|start| (col.as_str(), start + name.len()))
        })
        .collect();

    if candidates.is_empty() {
        return Err(InstructionError::NoColumnMatch);
    }
    candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    if candidates.len() > 1 && candidates[0].0.len() == candidates[1].0.len() {
        return Err(InstructionError::AmbiguousColumn(vec![
            candidates[0].0.to_string(),
            candidates[1].0.to_string(),
        ]));
    }

    let (column, end) = candidates[0];
    Ok((column.to_string(), &lowered[end..]))
}

/// Build the single leaf for filter/count from the text following the
/// column name: an explicit operator keyword if present, otherwise the
/// trailing text is taken as an equality value ("... from region east").
fn single_leaf(
    table: &Table,
    column: &str,
    rest: &str,
    op_re: &Regex,
) -> Result<(Predicate, String, String), InstructionError> {
    let (phrase, value_text) = match op_re.captures(rest) {
        Some(caps) => (caps[1].to_lowercase(), caps[2].trim().to_string()),
        None => {
            let value = TRAILING_VALUE_RE
                .find(rest)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            if value.is_empty() {
                return Err(InstructionError::template(CONDITION_TEMPLATE));
            }
            ("is".to_string(), value)
        }
    };

    let op = match phrase.as_str() {
        "greater than" | "after" | "plus grand que" | "superieur a" | "apres" => {
            CompareOp::GreaterThan
        }
        "less than" | "before" | "plus petit que" | "inferieur a" | "avant" => CompareOp::LessThan,
        // equals / is / est / egale / of
        _ => CompareOp::Equals,
    };

    let predicate = if table.is_numeric(column) {
        if !is_digit_coercible(&value_text) {
            return Err(InstructionError::TypeCoercion {
                column: column.to_string(),
                value: value_text,
            });
        }
        Predicate::Leaf {
            column: column.to_string(),
            op,
            value: Value::Number(value_text.parse().map_err(|_| {
                InstructionError::TypeCoercion {
                    column: column.to_string(),
                    value: value_text.clone(),
                }
            })?),
        }
    } else {
        match op {
            CompareOp::GreaterThan | CompareOp::LessThan => {
                return Err(InstructionError::UnsupportedOperator(phrase));
            }
            // Equality on a string column is substring-style, so
            // "region east" finds "East district" rows too.
            _ => Predicate::Leaf {
                column: column.to_string(),
                op: CompareOp::Contains,
                value: Value::Text(value_text.clone()),
            },
        }
    };

    Ok((predicate, phrase, value_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(contents: &str) -> (tempfile::TempDir, TableStore, Table) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");
        std::fs::write(&path, contents).unwrap();
        let store = TableStore::new(path);
        let table = store.load().unwrap();
        (dir, store, table)
    }

    fn crew() -> (tempfile::TempDir, TableStore, Table) {
        seeded(
            "region,priority,status\n\
             east,5,open\n\
             west,2,closed\n\
             east,1,\n",
        )
    }

    #[test]
    fn test_add_appends_one_row_and_persists() {
        let (_dir, store, mut table) = crew();
        let compiler = InstructionCompiler::new();
        let outcome = compiler
            .handle("Add a record where region is north, priority is 9", &mut table, &store)
            .unwrap();

        assert_eq!(table.len(), 4);
        let added = &table.rows()[3];
        assert_eq!(added[0], Value::Text("north".into()));
        assert_eq!(added[1], Value::Text("9".into()));
        // Unspecified columns default to null.
        assert_eq!(added[2], Value::Null);

        // The persisted row count matches the in-memory one.
        assert_eq!(store.load().unwrap().len(), 4);
        assert!(matches!(outcome, Outcome::Table(t) if t.len() == 4));
    }

    #[test]
    fn test_add_drops_unknown_columns_silently() {
        let (_dir, store, mut table) = crew();
        InstructionCompiler::new()
            .handle("add a record where region is north and flavor is vanilla", &mut table, &store)
            .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[3][0], Value::Text("north".into()));
    }

    #[test]
    fn test_add_with_no_known_column_fails_without_mutating() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("add a record where flavor is vanilla", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::NoValidColumns));
        assert_eq!(table.len(), 3);
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn test_add_without_pairs_names_the_template() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("add something", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::TemplateMismatch { .. }));
    }

    #[test]
    fn test_update_assigns_only_matching_rows() {
        let (_dir, store, mut table) = crew();
        InstructionCompiler::new()
            .handle("update status to stale where priority greater than 3", &mut table, &store)
            .unwrap();
        assert_eq!(table.rows()[0][2], Value::Text("stale".into()));
        assert_eq!(table.rows()[1][2], Value::Text("closed".into()));
        assert_eq!(table.rows()[2][2], Value::Null);
    }

    #[test]
    fn test_update_with_or_condition() {
        let (_dir, store, mut table) = crew();
        InstructionCompiler::new()
            .handle(
                "update status to flagged where region is west or priority greater than 4",
                &mut table,
                &store,
            )
            .unwrap();
        assert_eq!(table.rows()[0][2], Value::Text("flagged".into()));
        assert_eq!(table.rows()[1][2], Value::Text("flagged".into()));
        assert_eq!(table.rows()[2][2], Value::Null);
    }

    #[test]
    fn test_update_numeric_target_coerces_value() {
        let (_dir, store, mut table) = crew();
        InstructionCompiler::new()
            .handle("update priority to 7 where region is east", &mut table, &store)
            .unwrap();
        assert_eq!(table.rows()[0][1], Value::Number(7.0));
        assert_eq!(table.rows()[2][1], Value::Number(7.0));

        let err = InstructionCompiler::new()
            .handle("update priority to urgent where region is east", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::TypeCoercion { .. }));
    }

    #[test]
    fn test_update_unknown_column_leaves_table_untouched() {
        let (_dir, store, mut table) = crew();
        let before = table.clone();
        let err = InstructionCompiler::new()
            .handle("update foo to 1 where bar is 2", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::UnknownColumn(c) if c == "foo"));
        assert_eq!(table, before);
        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn test_update_without_where_names_the_template() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("update status to closed", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::TemplateMismatch { .. }));
    }

    #[test]
    fn test_delete_numeric_condition() {
        let (_dir, store, mut table) = seeded("age\n70\n40\n80\n");
        let outcome = InstructionCompiler::new()
            .handle("delete records where age greater than 65", &mut table, &store)
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0][0], Value::Text("40".into()));
        assert_eq!(store.load().unwrap().len(), 1);
        assert!(matches!(outcome, Outcome::Status(msg) if msg.contains('2')));
    }

    #[test]
    fn test_delete_is_matches_by_substring() {
        let (_dir, store, mut table) = crew();
        InstructionCompiler::new()
            .handle("remove records where region is east", &mut table, &store)
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0][0], Value::Text("west".into()));
    }

    #[test]
    fn test_delete_prefix_words_do_not_parse_as_a_condition() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("delete records where where region is east", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::TemplateMismatch { .. }));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_delete_ordering_needs_a_numeric_column() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("delete records where region greater than 5", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::TypeCoercion { .. }));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_count_embeds_the_exact_count() {
        let (_dir, store, mut table) = seeded(
            "region\n\
             east\n\
             east\n\
             east\n\
             west\n",
        );
        let outcome = InstructionCompiler::new()
            .handle("how many records are from region east", &mut table, &store)
            .unwrap();
        match outcome {
            Outcome::Count { matched, message } => {
                assert_eq!(matched, 3);
                assert!(message.contains(": 3"), "got: {message}");
            }
            other => panic!("expected a count, got {other:?}"),
        }
    }

    #[test]
    fn test_count_with_explicit_operator() {
        let (_dir, store, mut table) = crew();
        let outcome = InstructionCompiler::new()
            .handle("how many records have priority greater than 1", &mut table, &store)
            .unwrap();
        assert!(matches!(outcome, Outcome::Count { matched: 2, .. }));
    }

    #[test]
    fn test_filter_returns_matching_rows_only() {
        let (_dir, store, mut table) = crew();
        let outcome = InstructionCompiler::new()
            .handle("find all records where priority less than 3", &mut table, &store)
            .unwrap();
        match outcome {
            Outcome::Rows(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows.columns(), table.columns());
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_without_any_column_reference() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("show me everything interesting", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::NoColumnMatch));
    }

    #[test]
    fn test_equal_length_column_tie_is_ambiguous() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("show region and status", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::AmbiguousColumn(_)));
    }

    #[test]
    fn test_longest_column_name_wins() {
        let (_dir, store, mut table) = seeded(
            "status,statuscode\n\
             open,7\n\
             closed,9\n",
        );
        // "status" is a fragment of "statuscode"; the longer name binds.
        let outcome = InstructionCompiler::new()
            .handle("show statuscode is 7", &mut table, &store)
            .unwrap();
        match outcome {
            Outcome::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows.rows()[0][0], Value::Text("open".into()));
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_instruction() {
        let (_dir, store, mut table) = crew();
        let err = InstructionCompiler::new()
            .handle("please make me a sandwich", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::Unrecognized));
    }

    #[test]
    fn test_save_failure_is_surfaced_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        // The store points into a directory that does not exist, so the
        // atomic save cannot create its temp file.
        let store = TableStore::new(dir.path().join("missing").join("sheet.csv"));
        let mut table = Table::from_rows(
            vec!["region".into()],
            vec![vec![Value::Text("east".into())]],
        );
        let err = InstructionCompiler::new()
            .handle("add a record where region is north", &mut table, &store)
            .unwrap_err();
        assert!(matches!(err, InstructionError::SaveFailed(_)));
        // The in-memory mutation happened; only the file write failed.
        assert_eq!(table.len(), 2);
    }
}
