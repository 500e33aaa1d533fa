/// A question-format template the assistant is told to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionStructure {
    pub name: &'static str,
    pub instructions: &'static str,
    /// Phrase whose presence in a response identifies this format.
    pub marker: Option<&'static str>,
}

pub const STATEMENT_BASED: QuestionStructure = QuestionStructure {
    name: "Statement-Based",
    instructions: "Write 3 numbered statements followed by \"How many of the above statements are correct?\". \
Use exactly these options: (a) Only one (b) Only two (c) All three (d) None.",
    marker: Some("How many of the above statements are correct?"),
};

pub const ASSERTION_REASON: QuestionStructure = QuestionStructure {
    name: "Assertion-Reason",
    instructions: "Write two statements labelled \"Assertion (A):\" and \"Reason (R):\". \
Use exactly these options: (a) Both A and R are true, and R is the correct explanation of A \
(b) Both A and R are true, but R is NOT the correct explanation of A (c) A is true, but R is false \
(d) A is false, but R is true.",
    marker: Some("Assertion (A)"),
};

pub const STATEMENT_COMBINATIONS: QuestionStructure = QuestionStructure {
    name: "Multiple Statements with Specific Combinations",
    instructions: "Write 3 numbered statements followed by \"Which of the statements given above is/are correct?\". \
Use exactly these options: (a) 1 and 2 only (b) 2 and 3 only (c) 1 and 3 only (d) 1, 2, and 3.",
    marker: Some("Which of the statements given above is/are correct?"),
};

pub const CHRONOLOGICAL_ORDER: QuestionStructure = QuestionStructure {
    name: "Chronological Order",
    instructions: "Start with \"Arrange the following events in chronological order:\" and list 4 numbered events. \
Use four candidate orderings as options, for example (a) 1, 2, 3, 4 (b) 2, 1, 3, 4 (c) 1, 3, 2, 4 (d) 3, 2, 1, 4.",
    marker: Some("Arrange the following events in chronological order:"),
};

pub const DIRECT_QUESTION: QuestionStructure = QuestionStructure {
    name: "Direct Question with Single Correct Answer",
    instructions: "Ask a single direct question with four options (a) to (d), exactly one of which is correct.",
    marker: None,
};

pub const STRUCTURES: &[QuestionStructure] = &[
    STATEMENT_BASED,
    ASSERTION_REASON,
    STATEMENT_COMBINATIONS,
    CHRONOLOGICAL_ORDER,
    DIRECT_QUESTION,
];

/// Guesses which format a generated response actually used. Falls back to the direct
/// question format when no marker phrase is present.
pub fn detect_structure(response: &str) -> &'static QuestionStructure {
    STRUCTURES
        .iter()
        .find(|structure| {
            structure
                .marker
                .is_some_and(|marker| response.contains(marker))
        })
        .unwrap_or(&STRUCTURES[STRUCTURES.len() - 1])
}
