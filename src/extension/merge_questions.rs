use crate::database::bridge::write_bigint;
use crate::document::docx::Docx;
use crate::error::ResultMessage;
use crate::error::RustyQuizError;
use crate::extension::output_path;
use crate::extension::DryRunParam;
use crate::extension::ExplanationColumnParam;
use crate::extension::FileParam;
use crate::extension::NamedParam;
use crate::extension::OutputParam;
use crate::extension::Param;
use crate::extension::QuestionColumnParam;
use crate::extension::QuestionLimitParam;
use crate::extension::SheetParam;
use crate::extension::VariantParam;
use crate::extension::CHUNK_SIZE;
use crate::merge::merge;
use crate::merge::Diagnostic;
use crate::merge::MergeOptions;
use crate::merge::MergeReport;
use crate::spreadsheet::records::load_records;
use crate::spreadsheet::records::RecordColumns;
use duckdb::core::DataChunkHandle;
use duckdb::core::Inserter;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use duckdb::vtab::InitInfo;
use duckdb::vtab::TableFunctionInfo;
use duckdb::vtab::VTab;
use log::info;
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Parameters of `merge_questions(document, spreadsheet, ...)`
struct MergeQuestionsParameters {
    document: String,
    spreadsheet: String,
    options: MergeOptions,
    columns: RecordColumns,
    /// Output path, defaults to `<stem>_updated.docx` next to the document
    output: Option<String>,
    /// Run the merge without writing the output document
    dry_run: bool,
}

impl TryFrom<&BindInfo> for MergeQuestionsParameters {
    type Error = RustyQuizError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        let defaults = MergeOptions::default();
        let columns = RecordColumns::default();
        Ok(MergeQuestionsParameters {
            document: FileParam::read(bind, 0)?,
            spreadsheet: FileParam::read(bind, 1)?,
            options: MergeOptions {
                variant: VariantParam::read(bind)?.unwrap_or(defaults.variant),
                question_limit: QuestionLimitParam::read(bind)?.unwrap_or(defaults.question_limit),
            },
            columns: RecordColumns {
                sheet: SheetParam::read(bind)?.unwrap_or(columns.sheet),
                question: QuestionColumnParam::read(bind)?.unwrap_or(columns.question),
                explanation: ExplanationColumnParam::read(bind)?.unwrap_or(columns.explanation),
            },
            output: OutputParam::read(bind)?,
            dry_run: DryRunParam::read(bind)?.unwrap_or(false),
        })
    }
}

/// One result row of `merge_questions`
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ReportRow {
    kind: &'static str,
    table_index: Option<i64>,
    row_index: Option<i64>,
    question_number: Option<i64>,
    message: String,
}

impl From<&Diagnostic> for ReportRow {
    fn from(diagnostic: &Diagnostic) -> Self {
        let message = diagnostic.to_string();
        match diagnostic {
            Diagnostic::TableSkipped { table_index, .. } => ReportRow {
                kind: "table_skipped",
                table_index: Some(*table_index as i64),
                row_index: None,
                question_number: None,
                message,
            },
            Diagnostic::Unmatched { table_index, row_index, question_number } => ReportRow {
                kind: "unmatched",
                table_index: Some(*table_index as i64),
                row_index: Some(*row_index as i64),
                question_number: question_number.parse().ok(),
                message,
            },
            Diagnostic::Injected { table_index, row_index, question_number, .. } => ReportRow {
                kind: "injected",
                table_index: Some(*table_index as i64),
                row_index: Some(*row_index as i64),
                question_number: question_number.parse().ok(),
                message,
            },
        }
    }
}

/// Turns a merge report into result rows; `output` is the written file, if any
fn report_rows(report: &MergeReport, output: Option<&str>) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = report.diagnostics.iter().map(ReportRow::from).collect();
    if let Some(output) = output {
        rows.push(ReportRow {
            kind: "output",
            table_index: None,
            row_index: None,
            question_number: None,
            message: output.to_owned(),
        });
    }
    rows.push(ReportRow {
        kind: "complete",
        table_index: None,
        row_index: None,
        question_number: None,
        message: report.message().to_owned(),
    });
    rows
}

#[repr(C)]
/// Report rows computed during bind, streamed by `func`
pub(crate) struct MergeQuestionsBindData {
    rows: Vec<ReportRow>,
}

impl TryFrom<&MergeQuestionsParameters> for MergeQuestionsBindData {
    type Error = RustyQuizError;

    /// Loads both inputs, runs the merge and writes the output document
    fn try_from(parameters: &MergeQuestionsParameters) -> Result<Self, Self::Error> {
        let records = load_records(&parameters.spreadsheet, &parameters.columns)?;
        let mut docx = Docx::open(&parameters.document).with_prefix(&parameters.document)?;
        let report = merge(&records, &mut docx.tables, &parameters.options);

        let output = if parameters.dry_run {
            None
        } else {
            let path = output_path(&parameters.document, parameters.output.as_deref())?;
            let path_name = path.to_string_lossy().into_owned();
            docx.save(&path).with_prefix(&path_name)?;
            info!("Updated document written to '{path_name}'");
            Some(path_name)
        };
        Ok(MergeQuestionsBindData {
            rows: report_rows(&report, output.as_deref()),
        })
    }
}

#[repr(C)]
pub(crate) struct MergeQuestionsInitData {
    /// Next chunk to emit
    index: AtomicUsize,
}

/// `merge_questions` table function
pub(crate) struct MergeQuestionsTableFunction;

impl VTab for MergeQuestionsTableFunction {
    type InitData = MergeQuestionsInitData;
    type BindData = MergeQuestionsBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = MergeQuestionsParameters::try_from(bind)?;
        let data = MergeQuestionsBindData::try_from(&parameters)?;
        bind.add_result_column("kind", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("table_index", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("row_index", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("question_number", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("message", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        Ok(data)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(MergeQuestionsInitData {
            index: AtomicUsize::new(0),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let bind = func.get_bind_data();
        let init = func.get_init_data();
        let index = init.index.fetch_add(1, Ordering::Relaxed);
        let chunk = bind.rows.chunks(CHUNK_SIZE).nth(index).unwrap_or_default();

        let mut kinds = output.flat_vector(0);
        let mut table_indexes = output.flat_vector(1);
        let mut row_indexes = output.flat_vector(2);
        let mut question_numbers = output.flat_vector(3);
        let mut messages = output.flat_vector(4);
        for (row, report) in chunk.iter().enumerate() {
            kinds.insert(row, report.kind);
            write_bigint(&mut table_indexes, row, report.table_index);
            write_bigint(&mut row_indexes, row, report.row_index);
            write_bigint(&mut question_numbers, row, report.question_number);
            messages.insert(row, report.message.as_str());
        }
        output.set_len(chunk.len());
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            LogicalTypeHandle::from(LogicalTypeId::Varchar),
            LogicalTypeHandle::from(LogicalTypeId::Varchar),
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
            VariantParam::definition(),
            QuestionLimitParam::definition(),
            SheetParam::definition(),
            QuestionColumnParam::definition(),
            ExplanationColumnParam::definition(),
            OutputParam::definition(),
            DryRunParam::definition(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::zip::tests::write_package;
    use crate::merge::variant::VariantPolicy;
    use pretty_assertions::assert_eq;
    use std::num::NonZeroUsize;

    const WORKBOOK: &str = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Simulated" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    const RELATIONSHIPS: &str = r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    const SHEET: &str = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>Question</t></is></c><c r="B1" t="inlineStr"><is><t>Explanation</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>Capital of France?
A. Paris
B. Rome</t></is></c><c r="B2" t="inlineStr"><is><t>Paris is the capital.</t></is></c></row>
</sheetData></worksheet>"#;

    fn cell(text: &str) -> String {
        format!("<w:tc><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:tc>")
    }

    fn row(cells: [&str; 4]) -> String {
        format!("<w:tr>{}</w:tr>", cells.iter().map(|text| cell(text)).collect::<String>())
    }

    fn document_xml() -> String {
        let mut rows = vec![
            row(["ID", "Type", "Source Text", "Translation"]),
            row(["1", "Question Number", "Question 1", ""]),
            row(["2", "Question Number", "Question 7", ""]),
        ];
        for _ in 0..6 {
            rows.push(row(["", "", "", "todo"]));
        }
        format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:tbl>{}</w:tbl></w:body></w:document>"#,
            rows.concat()
        )
    }

    fn parameters(document: &str, spreadsheet: &str, output: Option<String>, dry_run: bool) -> MergeQuestionsParameters {
        MergeQuestionsParameters {
            document: document.to_owned(),
            spreadsheet: spreadsheet.to_owned(),
            options: MergeOptions {
                variant: VariantPolicy::VERSION_A,
                question_limit: NonZeroUsize::new(5).unwrap(),
            },
            columns: RecordColumns::default(),
            output,
            dry_run,
        }
    }

    #[test]
    fn test_merge_writes_output_and_reports() -> Result<(), RustyQuizError> {
        let xml = document_xml();
        let document = write_package(".docx", &[("word/document.xml", xml.as_str())]);
        let workbook = write_package(".xlsx", &[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/worksheets/sheet1.xml", SHEET),
        ]);
        let output = tempfile::Builder::new().suffix(".docx").tempfile()?;
        let output_name = output.path().to_string_lossy().into_owned();

        let data = MergeQuestionsBindData::try_from(&parameters(
            &document.path().to_string_lossy(),
            &workbook.path().to_string_lossy(),
            Some(output_name.to_owned()),
            false,
        ))?;
        let kinds: Vec<&str> = data.rows.iter().map(|row| row.kind).collect();
        assert_eq!(kinds, vec!["injected", "unmatched", "output", "complete"]);
        assert_eq!(data.rows[1].question_number, Some(7));
        assert_eq!(data.rows[1].message, "No matching row found in Excel for Question 7.");
        assert_eq!(data.rows[2].message, output_name);
        assert_eq!(data.rows[3].message, "Processing complete.");

        let written = Docx::open(&output_name)?;
        let table = &written.tables[0];
        let content: Vec<&str> = (0..table.row_count()).map(|row| table.cell(row, 3).unwrap().text()).collect();
        assert_eq!(content, vec![
            "Translation", "", "", "Capital of France?", "Paris", "Rome", "todo", "Paris is the capital.", "todo",
        ]);
        Ok(())
    }

    #[test]
    fn test_dry_run_writes_nothing() -> Result<(), RustyQuizError> {
        let xml = document_xml();
        let document = write_package(".docx", &[("word/document.xml", xml.as_str())]);
        let workbook = write_package(".xlsx", &[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/worksheets/sheet1.xml", SHEET),
        ]);
        let document_name = document.path().to_string_lossy().into_owned();
        let data = MergeQuestionsBindData::try_from(&parameters(
            &document_name,
            &workbook.path().to_string_lossy(),
            None,
            true,
        ))?;
        assert!(data.rows.iter().all(|row| row.kind != "output"));
        assert!(!output_path(&document_name, None)?.exists());
        Ok(())
    }
}
