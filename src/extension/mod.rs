//! # Extension Module
//!
//! SQL surface of the extension: parameter parsing shared by the table functions,
//! and the `merge_questions` and `read_questions` functions themselves.
pub(crate) mod merge_questions;
pub(crate) mod read_questions;

use crate::database::bridge::ValueBridge;
use crate::error::RustyQuizError;
use crate::helpers::reader::UnifiedReader;
use crate::merge::variant::VariantPolicy;
use duckdb::core::LogicalTypeHandle;
use duckdb::core::LogicalTypeId;
use duckdb::vtab::BindInfo;
use glob::Pattern;
use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Rows emitted per `func` call, DuckDB's standard vector size
pub(crate) const CHUNK_SIZE: usize = 2048;

#[derive(Error, Debug)]
pub(crate) enum ExtensionError {
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Missing parameter #{0}")]
    MissingParameter(usize),
}

/// Positional parameter of a table function
pub(crate) trait Param<T> {
    fn read(bind: &BindInfo, index: usize) -> Result<T, RustyQuizError>;
}

/// Named parameter of a table function
pub(crate) trait NamedParam<T> {
    /// Parameter name as used in SQL
    fn name() -> &'static str;

    fn kind() -> LogicalTypeHandle;

    fn definition() -> (String, LogicalTypeHandle) {
        (Self::name().to_string(), Self::kind())
    }

    /// Reads and validates the value, `None` when the parameter is not given
    fn read(bind: &BindInfo) -> Result<Option<T>, RustyQuizError>;

    fn invalid(message: String) -> ExtensionError {
        ExtensionError::InvalidParameter {
            name: Self::name().to_string(),
            message,
        }
    }
}

/// Path or URL of an input file
pub(crate) struct FileParam;

impl Param<String> for FileParam {
    fn read(bind: &BindInfo, index: usize) -> Result<String, RustyQuizError> {
        if index as u64 >= bind.get_parameter_count() {
            Err(ExtensionError::MissingParameter(index))?
        }
        let file_name = bind.get_parameter(index as u64).to_varchar();
        if file_name.trim().is_empty() {
            Err(ExtensionError::InvalidParameter {
                name: format!("#{index}"),
                message: "file name is empty".to_owned(),
            })?
        }
        Ok(file_name)
    }
}

pub(crate) struct VariantParam;

impl NamedParam<VariantPolicy> for VariantParam {
    fn name() -> &'static str {
        "variant"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    fn read(bind: &BindInfo) -> Result<Option<VariantPolicy>, RustyQuizError> {
        bind.get_named_parameter(Self::name())
            .map(|value| parse_variant(&value.to_varchar()))
            .transpose()
    }
}

pub(crate) struct QuestionLimitParam;

impl NamedParam<NonZeroUsize> for QuestionLimitParam {
    fn name() -> &'static str {
        "question_limit"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::UInteger)
    }

    fn read(bind: &BindInfo) -> Result<Option<NonZeroUsize>, RustyQuizError> {
        bind.get_named_parameter(Self::name())
            .map(|value| parse_question_limit(value.to_uint32()))
            .transpose()
    }
}

pub(crate) struct SheetParam;

impl NamedParam<String> for SheetParam {
    fn name() -> &'static str {
        "sheet"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Varchar)
    }

    /// The value is a glob pattern; it is validated here and compiled again by the reader
    fn read(bind: &BindInfo) -> Result<Option<String>, RustyQuizError> {
        bind.get_named_parameter(Self::name())
            .map(|value| parse_sheet_pattern(&value.to_varchar()))
            .transpose()
    }
}

/// Declares a named VARCHAR parameter that must not be blank
macro_rules! text_param {
    ($param:ident, $name:literal) => {
        pub(crate) struct $param;

        impl NamedParam<String> for $param {
            fn name() -> &'static str {
                $name
            }

            fn kind() -> LogicalTypeHandle {
                LogicalTypeHandle::from(LogicalTypeId::Varchar)
            }

            fn read(bind: &BindInfo) -> Result<Option<String>, RustyQuizError> {
                bind.get_named_parameter(Self::name())
                    .map(|value| -> Result<String, RustyQuizError> {
                        let text = value.to_varchar();
                        if text.trim().is_empty() {
                            Err(Self::invalid("must not be empty".to_owned()))?
                        }
                        Ok(text)
                    })
                    .transpose()
            }
        }
    };
}

text_param!(QuestionColumnParam, "question_column");
text_param!(ExplanationColumnParam, "explanation_column");
text_param!(OutputParam, "output");

pub(crate) struct DryRunParam;

impl NamedParam<bool> for DryRunParam {
    fn name() -> &'static str {
        "dry_run"
    }

    fn kind() -> LogicalTypeHandle {
        LogicalTypeHandle::from(LogicalTypeId::Boolean)
    }

    fn read(bind: &BindInfo) -> Result<Option<bool>, RustyQuizError> {
        Ok(bind.get_named_parameter(Self::name()).map(|value| value.to_bool()))
    }
}

pub(crate) fn parse_variant(text: &str) -> Result<VariantPolicy, RustyQuizError> {
    VariantPolicy::from_name(text).ok_or_else(|| {
        VariantParam::invalid(format!("'{text}' is not one of 'A', 'Version A', 'B', 'Version B'")).into()
    })
}

pub(crate) fn parse_question_limit(limit: u32) -> Result<NonZeroUsize, RustyQuizError> {
    NonZeroUsize::new(limit as usize)
        .ok_or_else(|| QuestionLimitParam::invalid("must be at least 1".to_owned()).into())
}

pub(crate) fn parse_sheet_pattern(pattern: &str) -> Result<String, RustyQuizError> {
    Pattern::new(pattern).map_err(|error| SheetParam::invalid(format!("'{pattern}' is not a valid pattern: {error}")))?;
    Ok(pattern.to_owned())
}

/// Output path of a merge: the explicit `output` parameter, or `<stem>_updated.docx`
/// next to a local document
pub(crate) fn output_path(document: &str, output: Option<&str>) -> Result<PathBuf, RustyQuizError> {
    if let Some(output) = output {
        return Ok(PathBuf::from(output));
    }
    if UnifiedReader::is_remote_url(document) {
        Err(OutputParam::invalid(format!("required when the document '{document}' is remote")))?
    }
    let path = Path::new(document);
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_owned());
    Ok(path.with_file_name(format!("{stem}_updated.docx")))
}
