use serde::Serialize;

use crate::models::domain::QuestionRecord;

/// A single record when one question was asked for, otherwise a list.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Answers {
    Single(QuestionRecord),
    Many(Vec<QuestionRecord>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answers: Answers,
}

impl AskResponse {
    pub fn from_records(mut records: Vec<QuestionRecord>) -> Self {
        let answers = if records.len() == 1 {
            Answers::Single(records.remove(0))
        } else {
            Answers::Many(records)
        };
        AskResponse { answers }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str) -> QuestionRecord {
        QuestionRecord {
            question_lines: vec![text.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn single_record_is_not_wrapped_in_a_list() {
        let response = AskResponse::from_records(vec![record("Q1")]);
        let json = serde_json::to_value(&response).unwrap();

        assert!(json["answers"].is_object());
        assert_eq!(json["answers"]["question"][0], "Q1");
    }

    #[test]
    fn multiple_records_serialize_as_list() {
        let response = AskResponse::from_records(vec![record("Q1"), record("Q2")]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["answers"].as_array().map(Vec::len), Some(2));
    }
}
