use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::constants::{books::BookInfo, structures::QuestionStructure};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([a-z_]+)\}").expect("PLACEHOLDER is a valid regex pattern")
});

/// Line separating consecutive questions when more than one is requested.
pub const MCQ_DELIMITER: &str = "---";

/// Questions served per session and chapter before related material is allowed.
pub const CHAPTER_CONTENT_THRESHOLD: u32 = 20;

pub const GENERATION_PROMPT_TEMPLATE: &str = "You are an AI trained exclusively on UPSC reference books for the TrainWithMe platform.

Reference book for this request:
- Category: {category}
- Book: {book}
- File ID: {file_id}
- Description: {description}

Instructions:
- Generate {count} MCQ(s) from {book} using the attached file (File ID: {file_id}).
- Scope: {scope}
- Focus every question on this theme within the scope: \"{theme}\".
- This is question number {question_number} in the user's session. For the first {threshold} questions use ONLY the content of the scope above. After that, if the scope has no new material left, you MAY use general knowledge that is clearly related to it.
- Make the questions difficult but do not say so.
- Do not repeat questions you have already asked in this conversation.

Question format ({structure_name}):
{structure_instructions}

Response structure. Use this EXACT layout with plain-text headers and separate each section with exactly one blank line:

Question: [full question text, including numbered statements or assertion/reason lines]

Options:
(a) [option A]
(b) [option B]
(c) [option C]
(d) [option D]

Correct Answer: [letter, e.g. (a)]

Explanation: [2-3 sentences grounded in the book]

- Start directly with \"Question:\" and add no introduction.
- Never place options inside the Question section.
- When generating more than one MCQ, put a line containing only {delimiter} between consecutive MCQs.

Request from the user:
\"{query}\"";

pub const THEME_ANALYSIS_PROMPT_TEMPLATE: &str = "Analyze {scope} of {book} (File ID: {file_id}) and list the distinct topical themes it covers that could each support several exam questions.

Rules:
- Return between 8 and 15 themes.
- One theme per line, each a short noun phrase of at most 8 words.
- No numbering, bullets, headings, or commentary.";

pub struct GenerationPrompt<'a> {
    pub book: &'a BookInfo,
    pub chapter: &'a str,
    pub theme: &'a str,
    pub structure: &'a QuestionStructure,
    pub count: usize,
    pub question_number: u32,
    pub query: &'a str,
}

fn scope_description(book: &BookInfo, chapter: &str) -> String {
    if chapter == crate::constants::books::ENTIRE_BOOK {
        format!("the entire {}", book.book_name)
    } else {
        format!("the chapter \"{}\"", chapter)
    }
}

pub fn render_generation_prompt(prompt: &GenerationPrompt<'_>) -> String {
    fill_template(
        GENERATION_PROMPT_TEMPLATE,
        &[
            ("category", prompt.book.category.to_string()),
            ("book", prompt.book.book_name.to_string()),
            ("file_id", prompt.book.file_id.to_string()),
            ("description", prompt.book.description.to_string()),
            ("count", prompt.count.to_string()),
            ("scope", scope_description(prompt.book, prompt.chapter)),
            ("theme", prompt.theme.to_string()),
            ("question_number", prompt.question_number.to_string()),
            ("threshold", CHAPTER_CONTENT_THRESHOLD.to_string()),
            ("structure_name", prompt.structure.name.to_string()),
            ("structure_instructions", prompt.structure.instructions.to_string()),
            ("delimiter", MCQ_DELIMITER.to_string()),
            ("query", prompt.query.trim().to_string()),
        ],
    )
}

pub fn render_theme_analysis_prompt(book: &BookInfo, chapter: &str) -> String {
    fill_template(
        THEME_ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("scope", scope_description(book, chapter)),
            ("book", book.book_name.to_string()),
            ("file_id", book.file_id.to_string()),
        ],
    )
}

/// Substitutes `{name}` placeholders in one pass. Inserted values are never
/// rescanned, and unknown placeholders are left as they are.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
