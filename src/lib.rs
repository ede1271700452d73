//! # DuckDB Quiz Merge Extension
//!
//! A DuckDB extension that merges question content from a spreadsheet into the tables of a
//! Word document. Each question block in the document starts at an anchor row such as
//! `| 1 | Question Number | Question 3 | ... |`; the prompt, answers and explanation of the
//! matching spreadsheet row are written into the content column of the rows below it.
//!
//! ## Features
//!
//! - **Spreadsheet input**: `.xlsx`, `.xlsm`, `.xlam` and `.ods`, local or remote
//! - **Two document layouts**: `Version A` (question number anchors, spacer row before the
//!   explanation) and `Version B` (slide name anchors)
//! - **Layout preserving**: only rewritten cells change, formatting of the first paragraph
//!   and run is kept, every other part of the package is copied as is
//! - **Processing budget**: scanning stops after a configurable number of anchors
//! - **Dry runs**: report what would be written without producing a document
//!
//! ## Table Functions
//!
//! - `merge_questions`: Merge a spreadsheet into a document and report every decision
//! - `read_questions`: Preview the question records parsed from a spreadsheet
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod database;
mod document;
mod error;
mod extension;
mod helpers;
mod merge;
mod spreadsheet;

use crate::extension::merge_questions::MergeQuestionsTableFunction;
use crate::extension::read_questions::ReadQuestionsTableFunction;
use anyhow::{Context, Result};
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use libduckdb_sys as ffi;

/// Extension entry point for DuckDB.
///
/// Registers `merge_questions` and `read_questions` on the given connection.
///
/// # Errors
///
/// Returns an error if either table function fails to register with DuckDB.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    connection
        .register_table_function::<MergeQuestionsTableFunction>("merge_questions")
        .context("Failed to register merge_questions table function")?;
    connection
        .register_table_function::<ReadQuestionsTableFunction>("read_questions")
        .context("Failed to register read_questions table function")?;
    Ok(())
}
