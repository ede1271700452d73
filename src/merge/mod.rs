//! # Merge Module
//!
//! Writes spreadsheet questions into the tables of a document. Content tables are
//! recognised by their header row, question blocks by an anchor row whose role cell
//! names the variant's marker role and whose marker cell reads `Question <N>`. Record
//! `N` is then written into the content cell of the rows below the anchor.
pub(crate) mod header;
pub(crate) mod record;
pub(crate) mod scanner;
pub(crate) mod variant;

use crate::document::Table;
use crate::merge::header::headers_match;
use crate::merge::header::REQUIRED_ROLES;
use crate::merge::record::QuestionRecord;
use crate::merge::scanner::anchor_number;
use crate::merge::scanner::inject;
use crate::merge::variant::VariantPolicy;
use log::debug;
use log::info;
use log::warn;
use std::fmt::Display;
use std::num::NonZeroUsize;

/// Final status line of every merge
pub(crate) const COMPLETION_MESSAGE: &str = "Processing complete.";

/// Raw question and explanation text of one spreadsheet data row
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct SourceRecord {
    pub(crate) question: String,
    pub(crate) explanation: String,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct MergeOptions {
    pub(crate) variant: VariantPolicy,
    /// Anchors processed before scanning stops, matched or not
    pub(crate) question_limit: NonZeroUsize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            variant: VariantPolicy::VERSION_A,
            question_limit: NonZeroUsize::new(5).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Something worth telling the operator about, in scanning order
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Diagnostic {
    /// The header row lacks a required role; no row of the table was inspected
    TableSkipped {
        table_index: usize,
        headers: Vec<String>,
    },
    /// The anchor names a question the spreadsheet does not have
    Unmatched {
        table_index: usize,
        row_index: usize,
        question_number: String,
    },
    Injected {
        table_index: usize,
        row_index: usize,
        question_number: String,
        cells_written: usize,
    },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::TableSkipped { headers, .. } => {
                write!(f, "Table skipped due to missing required columns: {headers:?}")
            }
            Diagnostic::Unmatched { question_number, .. } => {
                write!(f, "No matching row found in Excel for Question {question_number}.")
            }
            Diagnostic::Injected { table_index, row_index, question_number, cells_written } => write!(
                f,
                "Question {question_number} written below row {row_index} of table {table_index} ({cells_written} cells)."
            ),
        }
    }
}

/// Outcome of one merge
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MergeReport {
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) questions_processed: usize,
}

impl MergeReport {
    pub(crate) fn message(&self) -> &'static str {
        COMPLETION_MESSAGE
    }

    pub(crate) fn injected_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| matches!(diagnostic, Diagnostic::Injected { .. }))
            .count()
    }
}

impl Display for MergeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        write!(f, "{}", self.message())
    }
}

/// Merges `records` into `tables` in place.
///
/// Tables are visited in document order and rows top to bottom. Every anchor row uses
/// one unit of the question budget; once the budget is spent the scan stops, leaving
/// later tables and rows untouched. Nothing here fails: skipped tables and unknown
/// question numbers are reported as diagnostics.
pub(crate) fn merge(records: &[SourceRecord], tables: &mut [Table], options: &MergeOptions) -> MergeReport {
    let mut report = MergeReport::default();
    'tables: for (table_index, table) in tables.iter_mut().enumerate() {
        let headers = table.headers();
        if !headers_match(&headers, &REQUIRED_ROLES) {
            warn!("Table {table_index} skipped due to missing required columns: {headers:?}");
            report.diagnostics.push(Diagnostic::TableSkipped { table_index, headers });
            continue;
        }

        for row_index in 1..table.row_count() {
            let Some(question_number) = anchor_number(table, row_index, &options.variant) else {
                continue;
            };
            let source = question_number
                .parse::<usize>()
                .ok()
                .and_then(|number| number.checked_sub(1))
                .and_then(|position| records.get(position));
            match source {
                Some(source) => {
                    let record = QuestionRecord::parse(&source.question, &source.explanation);
                    let cells_written = inject(table, row_index, &record, &options.variant);
                    debug!("Question {question_number} written below row {row_index} of table {table_index} ({cells_written} cells)");
                    report.diagnostics.push(Diagnostic::Injected { table_index, row_index, question_number, cells_written });
                }
                None => {
                    warn!("No matching row found in Excel for Question {question_number}");
                    report.diagnostics.push(Diagnostic::Unmatched { table_index, row_index, question_number });
                }
            }

            report.questions_processed += 1;
            if report.questions_processed >= options.question_limit.get() {
                break 'tables;
            }
        }
    }
    info!(
        "{} {} questions processed with {}, {} injected",
        COMPLETION_MESSAGE,
        report.questions_processed,
        options.variant,
        report.injected_count()
    );
    report
}
