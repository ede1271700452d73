use regex::Regex;
use std::sync::LazyLock;

/// Start of the lettered options: the first `A.` on a word boundary
static OPTIONS_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bA\.").expect("Hardcode regex pattern"));
/// A line break that starts the next lettered option
static OPTION_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[A-Z]\.").expect("Hardcode regex pattern"));
static OPTION_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]\.\s*").expect("Hardcode regex pattern"));

/// One question split into the parts that get written into the document
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct QuestionRecord {
    pub(crate) prompt: String,
    pub(crate) answers: Vec<String>,
    pub(crate) explanation: String,
}

impl QuestionRecord {
    /// Splits raw question text into prompt and answers.
    ///
    /// Everything before the first `A.` is the prompt. The rest is cut into one answer
    /// per line that starts with a capital letter and a period; the labels are removed.
    /// Options sharing a line stay in one answer. The explanation is kept verbatim.
    pub(crate) fn parse(question_text: &str, explanation_text: &str) -> QuestionRecord {
        let Some(start) = OPTIONS_START.find(question_text) else {
            return QuestionRecord {
                prompt: question_text.trim().to_owned(),
                answers: Vec::new(),
                explanation: explanation_text.to_owned(),
            };
        };

        let prompt = question_text[..start.start()].trim().to_owned();
        let block = question_text[start.start()..].trim();
        let mut answers = Vec::new();
        let mut segment_start = 0usize;
        for line_break in OPTION_BREAK.find_iter(block) {
            answers.push(clean_answer(&block[segment_start..line_break.start()]));
            // the label stays with the next segment, only the newline is dropped
            segment_start = line_break.start() + 1;
        }
        answers.push(clean_answer(&block[segment_start..]));

        QuestionRecord {
            prompt,
            answers,
            explanation: explanation_text.to_owned(),
        }
    }
}

fn clean_answer(segment: &str) -> String {
    OPTION_LABEL.replace(segment, "").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_options_on_separate_lines() {
        let record = QuestionRecord::parse("What color is the sky?\nA. Red\nB. Blue\nC. Green", "Rayleigh scattering.");
        assert_eq!(record, QuestionRecord {
            prompt: "What color is the sky?".to_owned(),
            answers: vec!["Red".to_owned(), "Blue".to_owned(), "Green".to_owned()],
            explanation: "Rayleigh scattering.".to_owned(),
        });
    }

    #[test]
    fn test_parse_without_options() {
        let record = QuestionRecord::parse("  Describe the process.  ", "");
        assert_eq!(record.prompt, "Describe the process.");
        assert!(record.answers.is_empty());
    }

    #[test]
    fn test_parse_empty_text() {
        let record = QuestionRecord::parse("", " keep me ");
        assert_eq!(record.prompt, "");
        assert!(record.answers.is_empty());
        assert_eq!(record.explanation, " keep me ");
    }

    #[test]
    fn test_options_on_one_line_stay_together() {
        let record = QuestionRecord::parse("Pick one A. x B. y C. z", "");
        assert_eq!(record.prompt, "Pick one");
        assert_eq!(record.answers, vec!["x B. y C. z".to_owned()]);
    }

    #[test]
    fn test_multiline_answer_and_spacing() {
        let record = QuestionRecord::parse("Stem\r\nA.   first\ncontinued\nB.second  \n\nC. third", "");
        assert_eq!(record.prompt, "Stem");
        assert_eq!(record.answers, vec![
            "first\ncontinued".to_owned(),
            "second".to_owned(),
            "third".to_owned(),
        ]);
    }

    #[test]
    fn test_label_must_start_on_word_boundary() {
        let record = QuestionRecord::parse("Use DATA. then\nA. one", "");
        assert_eq!(record.prompt, "Use DATA. then");
        assert_eq!(record.answers, vec!["one".to_owned()]);
    }
}
