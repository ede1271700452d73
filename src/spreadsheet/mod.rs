//! # Spreadsheet Module
//!
//! Reads the question source workbook. Excel (.xlsx, .xlsm, .xlam) and OpenDocument
//! (.ods) packages are parsed into sparse [`Sheet`]s of text cells, and
//! [`records::load_records`] projects the selected sheet into ordered source records.
pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod excel;
pub(crate) mod ods;
pub(crate) mod records;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

use crate::error::RustyQuizError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;

/// Errors raised while opening or reading a spreadsheet
#[derive(Error, Debug)]
pub(crate) enum SpreadsheetError {
    #[error("File '{0}' not found in spreadsheet package")]
    FileError(String),

    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Spreadsheet '{0}' has no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Unsupported spreadsheet format: '{0}'")]
    UnsupportedFormatError(String),

    #[error("No sheet matching '{1}' in '{0}'")]
    SheetNotFoundError(String, String),

    #[error("Sheet '{1}' in '{0}' has no header row")]
    MissingHeaderError(String, String),

    #[error("Column '{2}' not found in header row of sheet '{1}' in '{0}'")]
    MissingColumnError(String, String, String),
}

/// Common interface of the supported workbook formats
pub(crate) trait Spreadsheet {
    /// Returns the file name or URL the spreadsheet was opened from
    fn name(&self) -> String;

    /// Loads the shared string table, empty for formats that store strings inline
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyQuizError>;

    /// Reads the sheets selected by `criteria`, in workbook order
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, RustyQuizError>;
}

/// Opens a spreadsheet, choosing the reader from the file extension
pub(crate) fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, RustyQuizError> {
    let path = if UnifiedReader::is_remote_url(file_name) {
        file_name.split(['?', '#']).next().unwrap_or(file_name)
    } else {
        file_name
    };
    let extension = Path::new(path)
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlam" => Ok(Box::new(XlsxSpreadsheet::open(file_name)?)),
        "ods" => Ok(Box::new(OdsSpreadsheet::open(file_name)?)),
        _ => Err(SpreadsheetError::UnsupportedFormatError(file_name.to_owned()))?,
    }
}
