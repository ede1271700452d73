use crate::document::Table;
use crate::merge::record::QuestionRecord;
use crate::merge::variant::VariantPolicy;
use regex::Regex;
use std::sync::LazyLock;

/// Only ASCII digits make a question number
static QUESTION_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Question\s*([0-9]+)").expect("Hardcode regex pattern"));

/// Cell holding the row role, e.g. "Question Number"
const ROLE_CELL: usize = 1;
/// Cell holding the marker text, e.g. "Question 3"
const MARKER_CELL: usize = 2;
/// The only cell the merge ever writes
const CONTENT_CELL: usize = 3;
/// Rows narrower than this are neither anchors nor targets
const MIN_CELLS: usize = CONTENT_CELL + 1;

/// Returns the question number of an anchor row, as its decimal digits without leading zeros
pub(crate) fn anchor_number(table: &Table, row_index: usize, variant: &VariantPolicy) -> Option<String> {
    if table.row_len(row_index) < MIN_CELLS {
        return None;
    }
    let role = table.cell(row_index, ROLE_CELL)?.text().trim().to_lowercase();
    if role != variant.marker_role.to_lowercase() {
        return None;
    }
    let marker = table.cell(row_index, MARKER_CELL)?.text().trim();
    let digits = QUESTION_MARKER.captures(marker)?.get(1)?.as_str();
    let digits = digits.trim_start_matches('0');
    Some(if digits.is_empty() { "0".to_owned() } else { digits.to_owned() })
}

/// Writes a record into the rows below an anchor and returns the number of cells written.
///
/// Prompt goes two rows below the anchor, answers follow one per row, and the explanation
/// comes after the answers plus the variant's spacer rows. Targets outside the table or
/// without a content cell are skipped one by one.
pub(crate) fn inject(table: &mut Table, anchor_index: usize, record: &QuestionRecord, variant: &VariantPolicy) -> usize {
    let mut written = 0usize;
    if write_content(table, anchor_index + 2, &record.prompt) {
        written += 1;
    }
    for (offset, answer) in record.answers.iter().enumerate() {
        if write_content(table, anchor_index + 3 + offset, answer) {
            written += 1;
        }
    }
    let explanation_index = anchor_index + 3 + record.answers.len() + variant.explanation_extra_offset;
    if write_content(table, explanation_index, &record.explanation) {
        written += 1;
    }
    written
}

fn write_content(table: &mut Table, row_index: usize, text: &str) -> bool {
    if row_index == 0 || table.row_len(row_index) < MIN_CELLS {
        return false;
    }
    match table.cell_mut(row_index, CONTENT_CELL) {
        Some(cell) => {
            cell.set_text(text);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn anchor(cells: &[&str], variant: &VariantPolicy) -> Option<String> {
        anchor_number(&Table::from_texts(&[cells]), 0, variant)
    }

    #[test]
    fn test_anchor_number() {
        let variant = VariantPolicy::VERSION_A;
        assert_eq!(anchor(&["1", " Question Number ", "Question 12", ""], &variant), Some("12".to_owned()));
        assert_eq!(anchor(&["1", "question number", "see question007 below", ""], &variant), Some("7".to_owned()));
        assert_eq!(anchor(&["1", "question number", "QUESTION0", ""], &variant), Some("0".to_owned()));
        assert_eq!(anchor(&["1", "question number", "Q 12", ""], &variant), None);
        assert_eq!(anchor(&["1", "slide name", "Question 1", ""], &variant), None);
        assert_eq!(anchor(&["1", "question number", "Question 1"], &variant), None);
        assert_eq!(anchor(&["1", "Slide Name", "Question 1", ""], &VariantPolicy::VERSION_B), Some("1".to_owned()));
    }

    #[test]
    fn test_non_ascii_digits_are_not_question_numbers() {
        let variant = VariantPolicy::VERSION_A;
        assert_eq!(anchor(&["1", "question number", "Question \u{663}", ""], &variant), None);
        assert_eq!(anchor(&["1", "question number", "Question \u{FF13}", ""], &variant), None);
        assert_eq!(anchor(&["1", "question number", "Question 3\u{663}", ""], &variant), Some("3".to_owned()));
    }

    #[test]
    fn test_inject_skips_out_of_bounds_and_narrow_rows() {
        let mut table = Table::from_texts(&[
            &["ID", "Type", "Source Text", "Translation"],
            &["1", "question number", "Question 1", ""],
            &["2", "", "", ""],
            &["3", "", "", "old prompt"],
            &["4", ""],
            &["5", "", "", ""],
        ]);
        let record = QuestionRecord {
            prompt: "Prompt".to_owned(),
            answers: vec!["One".to_owned(), "Two".to_owned(), "Three".to_owned()],
            explanation: "Why".to_owned(),
        };
        let written = inject(&mut table, 1, &record, &VariantPolicy::VERSION_A);
        assert_eq!(written, 2);
        assert_eq!(table.texts(), vec![
            vec!["ID", "Type", "Source Text", "Translation"],
            vec!["1", "question number", "Question 1", ""],
            vec!["2", "", "", ""],
            vec!["3", "", "", "Prompt"],
            vec!["4", ""],
            vec!["5", "", "", "Two"],
        ]);
    }
}
