//! Natural-language CRUD over delimited tables
//!
//! This crate compiles short free-text instructions ("update status to closed
//! where priority greater than 3") into typed operations against an in-memory
//! table backed by a CSV file. The rule compiler is deterministic; anything it
//! cannot classify is handed to an LLM fallback answerer.
//!
//! ## Architecture
//!
//! ```text
//! Instruction → Lexicon (intent) → Compiler → Condition Parser → Predicate
//!                                      ↓
//!                              Table Adapter (+ CSV store)
//! ```
//!
//! The session orchestrator owns one table per user session and routes
//! unrecognized instructions to the fallback answerer.

// Rule compiler
pub mod compiler;
pub mod condition;
pub mod error;
pub mod lexicon;

// Table adapter and persistence
pub mod table;

// LLM fallback boundary
pub mod fallback;

// Per-session orchestration
pub mod session;

// Re-exports for convenience
pub use compiler::{InstructionCompiler, Outcome};
pub use condition::{CompareOp, Predicate};
pub use error::InstructionError;
pub use fallback::{AnthropicClient, FallbackAnswerer};
pub use lexicon::{Intent, IntentLexicon};
pub use session::{InstructionSession, Reply};
pub use table::{StorageError, Table, TableStore, Value};
