//! Per-session instruction loop.
//!
//! A session owns one private table instance loaded from its store
//! (copy-on-load: sessions never share an in-memory table), pushes every
//! instruction through the rule compiler, and renders outcomes and errors
//! into chat replies. Unrecognized instructions go to the fallback answerer
//! when one is configured.

use std::sync::Arc;

use tracing::{info, warn};

use crate::compiler::{InstructionCompiler, Outcome};
use crate::error::InstructionError;
use crate::fallback::FallbackAnswerer;
use crate::table::{StorageError, Table, TableStore};

/// What the host UI renders for one instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Full table after a mutation; the UI shows the sheet.
    Table(Table),
    /// Matching rows for a filter or find query.
    Rows(Table),
    /// Plain text: counts, status confirmations, errors, fallback answers.
    Message(String),
}

/// One user's conversation with one table.
pub struct InstructionSession {
    compiler: InstructionCompiler,
    store: TableStore,
    table: Table,
    fallback: Option<Arc<dyn FallbackAnswerer>>,
}

impl InstructionSession {
    /// Open a session by loading a private table copy from the store.
    pub fn open(store: TableStore) -> Result<Self, StorageError> {
        let table = store.load()?;
        info!(path = %store.path().display(), rows = table.len(), "session opened");
        Ok(Self {
            compiler: InstructionCompiler::new(),
            store,
            table,
            fallback: None,
        })
    }

    /// Attach a fallback answerer for instructions the rules cannot handle.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackAnswerer>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Current in-memory table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Execute one instruction and render the reply.
    pub async fn execute(&mut self, instruction: &str) -> Reply {
        info!(instruction, "instruction received");

        match self.compiler.handle(instruction, &mut self.table, &self.store) {
            Ok(Outcome::Table(table)) => Reply::Table(table),
            Ok(Outcome::Rows(rows)) => Reply::Rows(rows),
            Ok(Outcome::Count { message, .. }) => Reply::Message(message),
            Ok(Outcome::Status(message)) => Reply::Message(message),
            Err(err) if err.wants_fallback() => self.ask_fallback(instruction, err).await,
            Err(err) => Reply::Message(err.to_string()),
        }
    }

    async fn ask_fallback(&self, instruction: &str, original: InstructionError) -> Reply {
        let Some(fallback) = &self.fallback else {
            return Reply::Message(original.to_string());
        };

        match fallback.answer(instruction, &self.table).await {
            Ok(text) => Reply::Message(text),
            Err(err) => {
                warn!(
                    provider = fallback.provider_name(),
                    error = %err,
                    "fallback answerer failed"
                );
                Reply::Message(original.to_string())
            }
        }
    }
}
