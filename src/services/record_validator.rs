use crate::{
    models::domain::{OptionLabel, QuestionRecord},
    services::response_parser::{is_option_line, is_options_label},
};

/// Structural problems that make a record unusable. Empty means valid.
pub fn record_issues(record: &QuestionRecord) -> Vec<String> {
    let mut issues = Vec::new();

    if record.question_lines.is_empty() {
        issues.push("question is empty".to_string());
    }
    if record.question_lines.iter().any(|line| line.trim().is_empty()) {
        issues.push("question contains blank lines".to_string());
    }
    if record
        .question_lines
        .iter()
        .any(|line| is_option_line(line) || is_options_label(line))
    {
        issues.push("question contains option lines".to_string());
    }

    let missing: Vec<&str> = OptionLabel::ALL
        .iter()
        .filter(|label| {
            record
                .option(**label)
                .map_or(true, |text| text.trim().is_empty())
        })
        .map(|label| label.as_str())
        .collect();
    if !missing.is_empty() || record.options.len() != OptionLabel::ALL.len() {
        issues.push(format!(
            "expected options A-D, got {} (missing: {})",
            record.options.len(),
            missing.join(", ")
        ));
    }

    match record.correct_answer.as_deref().and_then(OptionLabel::parse) {
        Some(label) if record.option(label).is_some() => {}
        Some(label) => issues.push(format!("correct answer {} has no option", label)),
        None => issues.push(format!(
            "correct answer is not one of A-D: {:?}",
            record.correct_answer
        )),
    }

    if record.explanation.trim().is_empty() {
        issues.push("explanation is empty".to_string());
    }

    issues
}

pub fn is_valid(record: &QuestionRecord) -> bool {
    record_issues(record).is_empty()
}
