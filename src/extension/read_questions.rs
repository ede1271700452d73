use crate::database::bridge::write_bigint;
use crate::error::RustyQuizError;
use crate::extension::ExplanationColumnParam;
use crate::extension::FileParam;
use crate::extension::NamedParam;
use crate::extension::Param;
use crate::extension::QuestionColumnParam;
use crate::extension::SheetParam;
use crate::extension::CHUNK_SIZE;
use crate::merge::record::QuestionRecord;
use crate::merge::SourceRecord;
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
use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

struct ReadQuestionsParameters {
    spreadsheet: String,
    columns: RecordColumns,
}

impl TryFrom<&BindInfo> for ReadQuestionsParameters {
    type Error = RustyQuizError;

    fn try_from(bind: &BindInfo) -> Result<Self, Self::Error> {
        let columns = RecordColumns::default();
        Ok(ReadQuestionsParameters {
            spreadsheet: FileParam::read(bind, 0)?,
            columns: RecordColumns {
                sheet: SheetParam::read(bind)?.unwrap_or(columns.sheet),
                question: QuestionColumnParam::read(bind)?.unwrap_or(columns.question),
                explanation: ExplanationColumnParam::read(bind)?.unwrap_or(columns.explanation),
            },
        })
    }
}

/// A parsed question, numbered the way document anchors refer to it
#[derive(Clone, Debug, PartialEq)]
struct QuestionRow {
    question_number: i64,
    record: QuestionRecord,
}

fn question_rows(records: &[SourceRecord]) -> Vec<QuestionRow> {
    records
        .iter()
        .enumerate()
        .map(|(index, source)| QuestionRow {
            question_number: index as i64 + 1,
            record: QuestionRecord::parse(&source.question, &source.explanation),
        })
        .collect()
}

#[repr(C)]
pub(crate) struct ReadQuestionsBindData {
    rows: Vec<QuestionRow>,
}

#[repr(C)]
pub(crate) struct ReadQuestionsInitData {
    index: AtomicUsize,
}

/// `read_questions` table function: the question records a merge would use
pub(crate) struct ReadQuestionsTableFunction;

impl VTab for ReadQuestionsTableFunction {
    type InitData = ReadQuestionsInitData;
    type BindData = ReadQuestionsBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        let parameters = ReadQuestionsParameters::try_from(bind)?;
        let records = load_records(&parameters.spreadsheet, &parameters.columns)?;
        bind.add_result_column("question_number", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("prompt", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("answer_count", LogicalTypeHandle::from(LogicalTypeId::Bigint));
        bind.add_result_column("answers", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        bind.add_result_column("explanation", LogicalTypeHandle::from(LogicalTypeId::Varchar));
        Ok(ReadQuestionsBindData {
            rows: question_rows(&records),
        })
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(ReadQuestionsInitData {
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

        let mut numbers = output.flat_vector(0);
        let mut prompts = output.flat_vector(1);
        let mut answer_counts = output.flat_vector(2);
        let mut answers = output.flat_vector(3);
        let mut explanations = output.flat_vector(4);
        for (row, question) in chunk.iter().enumerate() {
            write_bigint(&mut numbers, row, Some(question.question_number));
            prompts.insert(row, question.record.prompt.as_str());
            write_bigint(&mut answer_counts, row, Some(question.record.answers.len() as i64));
            answers.insert(row, question.record.answers.join("\n").as_str());
            explanations.insert(row, question.record.explanation.as_str());
        }
        output.set_len(chunk.len());
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![
            SheetParam::definition(),
            QuestionColumnParam::definition(),
            ExplanationColumnParam::definition(),
        ])
    }
}
