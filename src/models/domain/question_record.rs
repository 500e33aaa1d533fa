use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The four canonical option labels, in presentation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }

    /// Accepts `a`..`d` in either case.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(OptionLabel::A),
            'B' => Some(OptionLabel::B),
            'C' => Some(OptionLabel::C),
            'D' => Some(OptionLabel::D),
            _ => None,
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let mut chars = label.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => Self::from_letter(letter),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed multiple-choice question. May be structurally incomplete until it has
/// passed [`crate::services::record_validator::is_valid`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(rename = "question")]
    pub question_lines: Vec<String>,
    /// Keyed by the upper-case option label.
    pub options: BTreeMap<String, String>,
    pub correct_answer: Option<String>,
    pub explanation: String,
}

impl QuestionRecord {
    pub fn option(&self, label: OptionLabel) -> Option<&str> {
        self.options.get(label.as_str()).map(String::as_str)
    }

    pub fn set_option(&mut self, label: OptionLabel, text: impl Into<String>) {
        self.options.insert(label.as_str().to_string(), text.into());
    }

    pub fn question_text(&self) -> String {
        self.question_lines.join("\n")
    }
}
