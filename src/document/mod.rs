//! # Document Module
//!
//! In-memory model of the tables of a Word document. The model only knows about
//! tables, rows and text cells; [`docx::Docx`] loads it from a `.docx` package and
//! writes the changed cells back.
pub(crate) mod docx;

use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum DocumentError {
    #[error("Document '{0}' is password protected")]
    DocumentPasswordProtectedError(String),

    #[error("Missing '{1}' in document package '{0}'")]
    MissingPartError(String, String),

    #[error("Unsupported document format: '{0}'")]
    UnsupportedFormatError(String),
}

/// A table in document order. Row 0 is the header row.
///
/// Rows are laid out on the table grid. A cell spanning several grid columns fills one
/// slot per column, and a vertically merged continuation fills its slots with the cell it
/// continues. Slots sharing a cell read and write the same text.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Table {
    /// Grid slots of each row, as indexes into `cells`
    rows: Vec<Vec<usize>>,
    /// Distinct document cells in document order
    cells: Vec<Cell>,
}

/// Where a cell's content lives in the source XML
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CellLayout {
    /// Bytes replaced when the cell is rewritten
    pub(crate) content: Range<usize>,
    /// The cell was written as `<w:tc/>`, so `content` covers the whole tag
    pub(crate) self_closing: bool,
    pub(crate) paragraph_properties: Option<Range<usize>>,
    pub(crate) run_properties: Option<Range<usize>>,
}

/// A mutable text cell
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Cell {
    text: String,
    changed: bool,
    pub(crate) layout: CellLayout,
}

impl Cell {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the cell text. Writing the text the cell already holds is not a change.
    pub(crate) fn set_text(&mut self, text: &str) {
        if self.text != text {
            self.text = text.to_owned();
            self.changed = true;
        }
    }

    pub(crate) fn is_changed(&self) -> bool {
        self.changed
    }
}

impl Table {
    pub(crate) fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of grid slots in a row, 0 for a row that does not exist
    pub(crate) fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map(Vec::len).unwrap_or(0)
    }

    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        let index = *self.rows.get(row)?.get(col)?;
        self.cells.get(index)
    }

    pub(crate) fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        let index = *self.rows.get(row)?.get(col)?;
        self.cells.get_mut(index)
    }

    /// Distinct document cells, each listed once however many slots it fills
    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Trimmed texts of the header row
    pub(crate) fn headers(&self) -> Vec<String> {
        (0..self.row_len(0))
            .filter_map(|col| self.cell(0, col))
            .map(|cell| cell.text().trim().to_owned())
            .collect()
    }

    pub(crate) fn push_row(&mut self) {
        self.rows.push(Vec::new());
    }

    /// Appends a cell covering `span` grid columns to the last row
    pub(crate) fn push_cell(&mut self, cell: Cell, span: usize) {
        let index = self.cells.len();
        if let Some(row) = self.rows.last_mut() {
            self.cells.push(cell);
            row.extend(std::iter::repeat_n(index, span.max(1)));
        }
    }

    /// Appends a vertically merged continuation covering `span` grid columns to the last
    /// row. Each slot resolves to the cell above it; slots with nothing above keep `cell`.
    pub(crate) fn push_continuation(&mut self, cell: Cell, span: usize) {
        let Some((row, above)) = self.rows.split_last_mut() else {
            return;
        };
        let above = above.last();
        let mut own: Option<usize> = None;
        for _ in 0..span.max(1) {
            let col = row.len();
            let index = match above.and_then(|above| above.get(col)) {
                Some(index) => *index,
                None => *own.get_or_insert_with(|| {
                    self.cells.push(cell.clone());
                    self.cells.len() - 1
                }),
            };
            row.push(index);
        }
    }

    /// Builds a table from plain cell texts, one slot per cell
    #[cfg(test)]
    pub(crate) fn from_texts(rows: &[&[&str]]) -> Self {
        let mut table = Table::default();
        for cells in rows {
            table.push_row();
            for text in cells.iter() {
                table.push_cell(Cell::new(*text), 1);
            }
        }
        table
    }

    /// Slot texts, row by row
    #[cfg(test)]
    pub(crate) fn texts(&self) -> Vec<Vec<String>> {
        (0..self.row_count())
            .map(|row| {
                (0..self.row_len(row))
                    .filter_map(|col| self.cell(row, col))
                    .map(|cell| cell.text().to_owned())
                    .collect()
            })
            .collect()
    }
}
