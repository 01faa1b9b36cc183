//! Typed errors for instruction processing.
//!
//! Every way an instruction can fail is a value in this taxonomy. Errors
//! terminate the failing instruction only: the session renders them as chat
//! replies and the in-memory table is left untouched (all parsing and
//! validation completes before any mutation). The one exception is
//! [`InstructionError::SaveFailed`], which reports that an in-memory mutation
//! succeeded but the backing file was not updated.

use thiserror::Error;

use crate::table::StorageError;

/// Failure of a single instruction.
#[derive(Debug, Error)]
pub enum InstructionError {
    /// The instruction did not match the expected shape for its intent.
    /// Carries the user-facing description of the expected template.
    #[error("{expected}")]
    TemplateMismatch { expected: String },

    /// An atomic condition clause did not match `<column> <operator> <value>`.
    #[error("Could not parse the condition: {0}")]
    UnparsableCondition(String),

    /// The instruction named a column the table does not have.
    #[error("Column '{0}' not found in the table.")]
    UnknownColumn(String),

    /// The operator cannot be applied to the target column's type.
    #[error("Unsupported operator: {0}. Use 'greater than', 'less than', 'equals', 'is' or 'contains'.")]
    UnsupportedOperator(String),

    /// The literal value cannot be interpreted for the target column's type.
    #[error("Column '{column}' does not support this operation with value '{value}'.")]
    TypeCoercion { column: String, value: String },

    /// A date query was issued against a table with no date-named column.
    #[error("No date columns found in the dataset.")]
    NoDateColumn,

    /// Two columns of equal name length both appear in the instruction.
    #[error("Ambiguous column reference: {}. Please name exactly one column.", .0.join(", "))]
    AmbiguousColumn(Vec<String>),

    /// Filter/count could not locate any column name in the instruction.
    /// The session routes this to the fallback answerer.
    #[error("No matching column found. Please try a different instruction.")]
    NoColumnMatch,

    /// An add instruction named no column that exists in the table.
    #[error("No valid columns found for the new record.")]
    NoValidColumns,

    /// No keyword family matched. The session routes this to the fallback
    /// answerer.
    #[error("Instruction not recognized.")]
    Unrecognized,

    /// The in-memory mutation succeeded but persisting it did not. The
    /// backing file is now behind the session's table; the caller may retry
    /// the save.
    #[error("The table was changed in memory but saving to file failed: {0}")]
    SaveFailed(#[source] StorageError),
}

impl InstructionError {
    /// Shorthand for a template mismatch with a user-facing format hint.
    pub fn template(expected: impl Into<String>) -> Self {
        InstructionError::TemplateMismatch {
            expected: expected.into(),
        }
    }

    /// True for the failures the session hands to the fallback answerer.
    pub fn wants_fallback(&self) -> bool {
        matches!(
            self,
            InstructionError::Unrecognized | InstructionError::NoColumnMatch
        )
    }
}
