use crate::error::RustyQuizError;
use crate::error::ResultMessage;
use crate::merge::SourceRecord;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use glob::Pattern;

/// Names of the spreadsheet columns that feed the merge
#[derive(Clone, Debug)]
pub(crate) struct RecordColumns {
    pub(crate) sheet: String,
    pub(crate) question: String,
    pub(crate) explanation: String,
}

impl Default for RecordColumns {
    fn default() -> Self {
        Self {
            sheet: "Simulated".to_owned(),
            question: "Question".to_owned(),
            explanation: "Explanation".to_owned(),
        }
    }
}

/// Reads the first sheet matching `columns.sheet` and returns one record per data row.
///
/// The header row is the first non-empty row. Every row below it becomes a record,
/// blank rows included, so record positions line up with question numbers.
pub(crate) fn load_records(file_name: &str, columns: &RecordColumns) -> Result<Vec<SourceRecord>, RustyQuizError> {
    let criteria = Criteria {
        sheet_name_patterns: Some(vec![Pattern::new(&columns.sheet)?]),
        sheet_limit: Some(1),
    };
    let mut spreadsheet = open_spreadsheet(file_name).with_prefix(file_name)?;
    let shared_strings = spreadsheet.load_shared_strings().with_prefix(file_name)?;
    let sheet = spreadsheet
        .read_sheets(&criteria)
        .with_prefix(file_name)?
        .into_iter()
        .next()
        .ok_or_else(|| SpreadsheetError::SheetNotFoundError(spreadsheet.name(), columns.sheet.to_owned()))?;
    project_records(&sheet, &shared_strings, columns)
}

fn project_records(sheet: &Sheet, shared_strings: &[String], columns: &RecordColumns) -> Result<Vec<SourceRecord>, RustyQuizError> {
    let table = sheet.table();
    let (header, rows) = table
        .split_first()
        .ok_or_else(|| SpreadsheetError::MissingHeaderError(sheet.file_name.to_owned(), sheet.name.to_owned()))?;
    let headers: Vec<String> = header
        .iter()
        .map(|cell| text_of(*cell, shared_strings))
        .collect();
    let question_index = column_index(sheet, &headers, &columns.question)?;
    let explanation_index = column_index(sheet, &headers, &columns.explanation)?;

    let records = rows
        .iter()
        .map(|row| SourceRecord {
            question: text_of(row[question_index], shared_strings),
            explanation: text_of(row[explanation_index], shared_strings),
        })
        .collect();
    Ok(records)
}

fn text_of(cell: Option<&Cell>, shared_strings: &[String]) -> String {
    cell.map(|cell| cell.text(shared_strings)).unwrap_or_default()
}

fn column_index(sheet: &Sheet, headers: &[String], column: &str) -> Result<usize, RustyQuizError> {
    let expected = column.trim().to_lowercase();
    headers
        .iter()
        .position(|header| header.trim().to_lowercase() == expected)
        .ok_or_else(|| {
            SpreadsheetError::MissingColumnError(
                sheet.file_name.to_owned(),
                sheet.name.to_owned(),
                column.to_owned(),
            ).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::zip::tests::write_package;
    use crate::merge::record::QuestionRecord;
    use pretty_assertions::assert_eq;

    const WORKBOOK: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Simulated" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    const RELATIONSHIPS: &str = r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    const SHEET: &str = r#"<worksheet><sheetData>
<row r="2"><c r="B2" t="inlineStr"><is><t>ID</t></is></c><c r="C2" t="inlineStr"><is><t> question </t></is></c><c r="D2" t="inlineStr"><is><t>EXPLANATION</t></is></c></row>
<row r="3"><c r="B3"><v>1</v></c><c r="C3" t="inlineStr"><is><t>First?
A. Yes
B. No</t></is></c><c r="D3" t="inlineStr"><is><t>Because.</t></is></c></row>
<row r="5"><c r="B5"><v>3</v></c><c r="C5" t="inlineStr"><is><t>Third?</t></is></c><c r="D5" t="e"><v>#N/A</v></c></row>
</sheetData></worksheet>"#;

    fn workbook() -> tempfile::NamedTempFile {
        write_package(".xlsx", &[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/worksheets/sheet1.xml", SHEET),
        ])
    }

    #[test]
    fn test_load_records_keeps_row_positions() -> Result<(), RustyQuizError> {
        let file = workbook();
        let records = load_records(&file.path().to_string_lossy(), &RecordColumns::default())?;
        assert_eq!(records, vec![
            SourceRecord { question: "First?\nA. Yes\nB. No".to_owned(), explanation: "Because.".to_owned() },
            SourceRecord { question: String::new(), explanation: String::new() },
            SourceRecord { question: "Third?".to_owned(), explanation: String::new() },
        ]);
        Ok(())
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let file = workbook();
        let columns = RecordColumns {
            explanation: "Rationale".to_owned(),
            ..RecordColumns::default()
        };
        let result = load_records(&file.path().to_string_lossy(), &columns);
        assert!(matches!(
            result,
            Err(RustyQuizError::SpreadsheetError(SpreadsheetError::MissingColumnError(_, _, column))) if column == "Rationale"
        ));
    }

    #[test]
    fn test_missing_sheet_is_an_error() {
        let file = workbook();
        let columns = RecordColumns {
            sheet: "Live".to_owned(),
            ..RecordColumns::default()
        };
        let result = load_records(&file.path().to_string_lossy(), &columns);
        assert!(matches!(
            result,
            Err(RustyQuizError::SpreadsheetError(SpreadsheetError::SheetNotFoundError(_, pattern))) if pattern == "Live"
        ));
    }

    #[test]
    fn test_windows_line_breaks_are_decoded() -> Result<(), RustyQuizError> {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Question</t></is></c><c r="B1" t="inlineStr"><is><t>Explanation</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Stem_x000D_
A. Yes_x000D_
B. No</t></is></c><c r="B2" t="inlineStr"><is><t>Why_x000D_</t></is></c></row>
</sheetData></worksheet>"#;
        let file = write_package(".xlsx", &[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);
        let records = load_records(&file.path().to_string_lossy(), &RecordColumns::default())?;
        let record = QuestionRecord::parse(&records[0].question, &records[0].explanation);
        assert_eq!(record, QuestionRecord {
            prompt: "Stem".to_owned(),
            answers: vec!["Yes".to_owned(), "No".to_owned()],
            explanation: "Why\r".to_owned(),
        });
        Ok(())
    }
}
