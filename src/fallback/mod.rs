//! Fallback answerer boundary.
//!
//! When the rule compiler cannot classify an instruction (or filter/count
//! finds no column to bind), the session hands the raw instruction plus a
//! bounded preview of the table to this collaborator and relays its text
//! answer. The compiler itself never calls out.

pub mod anthropic;

pub use anthropic::AnthropicClient;

use anyhow::Result;
use async_trait::async_trait;

use crate::table::Table;

/// Free-form question answering over the session's table.
#[async_trait]
pub trait FallbackAnswerer: Send + Sync {
    /// Answer an instruction the rule compiler could not handle.
    async fn answer(&self, instruction: &str, table: &Table) -> Result<String>;

    /// Provider name for logging.
    fn provider_name(&self) -> &str;
}
