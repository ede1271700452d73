use crate::error::RustyQuizError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::io::Read;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const SPREADSHEET: QName = QName(b"office:spreadsheet");
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
/// Covered cells are the hidden part of a merged area
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
/// Run of spaces, `text:c` holds the count
const SPACES: QName = QName(b"text:s");
const TAB: QName = QName(b"text:tab");
const LINE_BREAK: QName = QName(b"text:line-break");
const FILE_ENTRY: QName = QName(b"manifest:file-entry");
const ENCRYPTION_DATA: QName = QName(b"manifest:encryption-data");

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub(crate) enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,

    #[error("Missing '{0}' in ODS package")]
    MissingPartError(String),
}

/// ODS spreadsheet handler for reading OpenDocument Spreadsheet files
pub(crate) struct OdsSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<UnifiedReader>,
}

impl OdsSpreadsheet {
    /// Opens an ODS file and validates its format
    pub(crate) fn open(file_name: &str) -> Result<Self, RustyQuizError> {
        let reader = UnifiedReader::new(file_name)?;
        let mut zip = ZipArchive::new(reader)?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// ODS stores strings inline, so there is no shared string table
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyQuizError> {
        Ok(Vec::new())
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, RustyQuizError> {
        let mut sheets = Vec::<Sheet>::new();
        let mut sheet_count = 0usize;
        let mut sheet_name = String::new();
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| OdsError::MissingPartError("content.xml".to_owned()))?;
        'sheets: loop {
            let mut found = false;
            match_xml_events!(reader => {
                Event::End(event) if event.name() == SPREADSHEET => break 'sheets,
                Event::Start(event) if event.name() == TABLE => {
                    sheet_name.clear();
                    if let Some(table_name) = event.get_attribute_value("table:name")? {
                        sheet_name.push_str(&table_name);
                    }
                    if criteria.is_exhausted(sheet_count) {
                        break 'sheets;
                    } else if criteria.accept(&sheet_name) {
                        sheet_count += 1;
                        found = true;
                        break;
                    }
                }
            });
            if !found {
                break;
            }

            let mut sheet = Sheet::new(&self.name, &sheet_name);
            let mut row = 0usize;
            let mut col = 0usize;
            let mut row_count = 0usize;
            let mut col_count = 0usize;
            let mut kind = CellType::default();
            let mut value = String::new();
            // Reading the paragraphs of a string cell
            let mut element_context = false;
            // Inside a cell comment, which is not part of the value
            let mut comment_context = false;
            match_xml_events!(reader => {
                Event::End(event) if event.name() == TABLE => break,
                Event::Start(event) if event.name() == TABLE_ROW => {
                    row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                    col = 0;
                }
                Event::End(event) if event.name() == TABLE_ROW => {
                    row += row_count;
                }
                Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                    value.clear();
                    col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                    let value_type = event.get_attribute_value("office:value-type")?;
                    kind = match value_type.as_deref() {
                        Some("boolean") => CellType::Boolean,
                        Some("date") => CellType::IsoDateTime,
                        Some("time") => CellType::IsoDuration,
                        Some("string") => if event.get_attribute_value("calcext:value-type")?.map(|cow| cow == "error").unwrap_or(false) {
                            CellType::Empty
                        } else {
                            CellType::InlineString
                        },
                        Some(_) => CellType::Number,
                        None => CellType::Empty,
                    };

                    match value_type.as_deref() {
                        Some("string") => element_context = kind != CellType::Empty,
                        Some("boolean") => if event.get_attribute_value("office:boolean-value")?.map(|cow| cow != "false" && cow != "0").unwrap_or(false) {
                            value.push('1');
                        } else {
                            value.push('0');
                        },
                        Some("date") => if let Some(data) = event.get_attribute_value("office:date-value")? {
                            value.push_str(&data);
                        },
                        Some("time") => if let Some(data) = event.get_attribute_value("office:time-value")? {
                            value.push_str(&data);
                        },
                        Some(_) => if let Some(data) = event.get_attribute_value("office:value")? {
                            value.push_str(&data);
                        },
                        None => (),
                    }
                }
                Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                    if kind != CellType::Empty && !value.is_empty() {
                        for row_offset in 0..row_count {
                            for col_offset in 0..col_count {
                                sheet.push(Cell {
                                    row: row + row_offset,
                                    col: col + col_offset,
                                    kind,
                                    value: value.to_owned(),
                                });
                            }
                        }
                    }
                    col += col_count;
                    element_context = false;
                    comment_context = false;
                }
                Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
                Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
                Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                }
                Event::Start(event) if element_context && !comment_context && event.name() == SPACES => {
                    let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                    for _ in 0..count {
                        value.push(' ');
                    }
                }
                Event::Start(event) if element_context && !comment_context && event.name() == TAB => value.push('\t'),
                Event::Start(event) if element_context && !comment_context && event.name() == LINE_BREAK => value.push('\n'),
                Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
                Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
            });
            sheets.push(sheet);

            if criteria.is_exhausted(sheet_count) {
                break;
            }
        }

        Ok(sheets)
    }
}

/// Validates that the ZIP archive contains a valid ODS file by checking MIME type
fn check_mime(zip: &mut ZipArchive<UnifiedReader>) -> Result<(), RustyQuizError> {
    if let Some(file) = &mut zip.file("mimetype")? {
        let mut buffer = Vec::with_capacity(MIME_TYPE.len());
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Checks if the ODS file is password protected by examining the manifest
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, RustyQuizError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == FILE_ENTRY => in_file_entry = true,
        Event::End(event) if event.name() == FILE_ENTRY => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == ENCRYPTION_DATA => {
            return Ok(true);
        }
    });
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::zip::tests::write_package;
    use pretty_assertions::assert_eq;

    const CONTENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:calcext="urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
<office:body><office:spreadsheet>
<table:table table:name="Notes"><table:table-row><table:table-cell office:value-type="string"><text:p>skip</text:p></table:table-cell></table:table-row></table:table>
<table:table table:name="Simulated">
<table:table-row>
<table:table-cell office:value-type="string"><text:p>Question</text:p></table:table-cell>
<table:table-cell office:value-type="string"><text:p>Explanation</text:p></table:table-cell>
</table:table-row>
<table:table-row>
<table:table-cell office:value-type="string"><office:annotation><text:p>reviewer note</text:p></office:annotation><text:p>Pick one</text:p><text:p>A.<text:s/>Red</text:p><text:p>B. Blue</text:p></table:table-cell>
<table:table-cell office:value-type="string"><text:p>Red &amp; blue</text:p></table:table-cell>
</table:table-row>
<table:table-row table:number-rows-repeated="2"><table:table-cell table:number-columns-repeated="2"/></table:table-row>
<table:table-row>
<table:table-cell office:value-type="float" office:value="7"><text:p>7</text:p></table:table-cell>
<table:table-cell office:value-type="boolean" office:boolean-value="true"><text:p>TRUE</text:p></table:table-cell>
<table:table-cell office:value-type="string" calcext:value-type="error"><text:p>#N/A</text:p></table:table-cell>
</table:table-row>
</table:table>
</office:spreadsheet></office:body>
</office:document-content>"#;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;

    const ENCRYPTED_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"><manifest:encryption-data manifest:checksum-type="SHA1"/></manifest:file-entry>
</manifest:manifest>"#;

    #[test]
    fn test_read_sheets() -> Result<(), RustyQuizError> {
        let file = write_package(".ods", &[
            ("mimetype", "application/vnd.oasis.opendocument.spreadsheet"),
            ("META-INF/manifest.xml", MANIFEST),
            ("content.xml", CONTENT),
        ]);
        let mut spreadsheet = OdsSpreadsheet::open(&file.path().to_string_lossy())?;
        let sheets = spreadsheet.read_sheets(&Criteria {
            sheet_name_patterns: Some(vec![glob::Pattern::new("Simulated")?]),
            ..Criteria::default()
        })?;
        assert_eq!(sheets.len(), 1);
        let cells: Vec<(String, String)> = sheets[0].cells
            .iter()
            .map(|cell| (cell.reference(), cell.to_string()))
            .collect();
        assert_eq!(cells, vec![
            ("A1".to_owned(), "Question".to_owned()),
            ("B1".to_owned(), "Explanation".to_owned()),
            ("A2".to_owned(), "Pick one\nA. Red\nB. Blue".to_owned()),
            ("B2".to_owned(), "Red & blue".to_owned()),
            ("A5".to_owned(), "7".to_owned()),
            ("B5".to_owned(), "true".to_owned()),
        ]);
        Ok(())
    }

    #[test]
    fn test_rejects_wrong_mime_type() {
        let file = write_package(".ods", &[
            ("mimetype", "application/vnd.oasis.opendocument.text"),
            ("content.xml", CONTENT),
        ]);
        let result = OdsSpreadsheet::open(&file.path().to_string_lossy());
        assert!(matches!(result, Err(RustyQuizError::OdsError(OdsError::MimeTypeError))));
    }

    #[test]
    fn test_rejects_encrypted_package() {
        let file = write_package(".ods", &[
            ("mimetype", "application/vnd.oasis.opendocument.spreadsheet"),
            ("META-INF/manifest.xml", ENCRYPTED_MANIFEST),
            ("content.xml", CONTENT),
        ]);
        let result = OdsSpreadsheet::open(&file.path().to_string_lossy());
        assert!(matches!(
            result,
            Err(RustyQuizError::SpreadsheetError(SpreadsheetError::SpreadsheetPasswordProtectedError(_)))
        ));
    }
}
