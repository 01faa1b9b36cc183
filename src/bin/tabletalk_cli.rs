//! Interactive chat over a CSV table.
//!
//! Mirrors the original chat page: load a sheet, preview it, read
//! instructions line by line, print replies. Set `ANTHROPIC_API_KEY` to
//! enable the LLM fallback for free-form questions.
//!
//! Run with: cargo run --features cli --bin tabletalk_cli -- files/sheet.csv

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use tabletalk::{AnthropicClient, InstructionSession, Reply, TableStore};

/// Natural-language CRUD over a CSV table.
#[derive(Debug, Parser)]
#[command(name = "tabletalk_cli", version)]
struct Args {
    /// Path to the CSV sheet to chat with.
    file: PathBuf,

    /// Rows shown when previewing tables.
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,

    /// Disable the LLM fallback even when an API key is configured.
    #[arg(long)]
    no_fallback: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let store = TableStore::new(&args.file);
    let mut session = InstructionSession::open(store)?;

    if !args.no_fallback {
        match AnthropicClient::from_env() {
            Ok(client) => {
                session = session.with_fallback(Arc::new(client));
            }
            Err(err) => {
                eprintln!("{} {err}", "fallback disabled:".yellow());
            }
        }
    }

    println!("{}", "Data preview:".bold());
    println!("{}", session.table().preview(args.preview_rows));
    println!(
        "{}",
        "Name the column(s) you want to work on as they appear on the sheet, alongside the \
         operation (add, delete, update, date, ...). Dates are YYYY-MM-DD."
            .dimmed()
    );

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline(&"query> ".green().to_string()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                editor.add_history_entry(line)?;

                match session.execute(line).await {
                    Reply::Table(table) => {
                        println!("{}", "Result:".bold());
                        println!("{}", table.preview(args.preview_rows));
                    }
                    Reply::Rows(rows) => {
                        println!("{}", format!("{} matching row(s):", rows.len()).bold());
                        println!("{}", rows.preview(args.preview_rows));
                    }
                    Reply::Message(text) => println!("{text}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
