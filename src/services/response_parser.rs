//! Turns free-text assistant replies into [`QuestionRecord`]s.
//!
//! Replies are expected to follow the layout requested by the generation
//! prompt:
//!
//! ```text
//! Question: ...
//!
//! Options:
//! (a) ...
//! (b) ...
//! (c) ...
//! (d) ...
//!
//! Correct Answer: (c)
//!
//! Explanation: ...
//! ```
//!
//! Parsing never fails. Missing sections come back empty and the record
//! validator decides whether the result is usable.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    constants::prompts::MCQ_DELIMITER,
    models::domain::{OptionLabel, QuestionRecord},
};

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t]*\n").expect("PARAGRAPH_BREAK is a valid regex pattern")
});

/// A line holding only the question delimiter, tolerating extra dashes.
static DELIMITER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^[ \t]*{}-*[ \t]*$", regex::escape(MCQ_DELIMITER)))
        .expect("DELIMITER_LINE is a valid regex pattern")
});

static QUESTION_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^[ \t*#]*question(?:[ \t]*\d+)?[ \t]*:")
        .expect("QUESTION_START is a valid regex pattern")
});

static OPTION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s*]*\(?([A-Da-d])\)\s*(\S.*?)\s*$").expect("OPTION_LINE is a valid regex pattern")
});

static INLINE_OPTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(([A-Da-d])\)").expect("INLINE_OPTION_MARKER is a valid regex pattern")
});

static ANSWER_LETTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[\s*]*(?:option\s*)?\(?\s*([a-d])\s*\)?(?:[\s.:,)*\-]|$)")
        .expect("ANSWER_LETTER is a valid regex pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Question,
    Options,
    CorrectAnswer,
    Explanation,
}

impl Section {
    fn label_regex(&self) -> &'static Regex {
        static QUESTION: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)^[\s*#]*question(?:\s*\d+)?\s*:[\s*]*(.*)$")
                .expect("question label is a valid regex pattern")
        });
        static OPTIONS: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)^[\s*#]*options\s*:[\s*]*(.*)$")
                .expect("options label is a valid regex pattern")
        });
        static CORRECT_ANSWER: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)^[\s*#]*correct\s+answer\s*:[\s*]*(.*)$")
                .expect("correct answer label is a valid regex pattern")
        });
        static EXPLANATION: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)^[\s*#]*explanation\s*:[\s*]*(.*)$")
                .expect("explanation label is a valid regex pattern")
        });

        match self {
            Section::Question => &QUESTION,
            Section::Options => &OPTIONS,
            Section::CorrectAnswer => &CORRECT_ANSWER,
            Section::Explanation => &EXPLANATION,
        }
    }

    /// Text following the label when `line` starts with it.
    fn strip_label<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.label_regex()
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|rest| rest.as_str().trim())
    }

    fn starts(&self, paragraph: &str) -> bool {
        paragraph
            .lines()
            .next()
            .map_or(false, |first| self.strip_label(first).is_some())
    }
}

/// True for lines such as `(a) Text` or `b) Text`.
pub fn is_option_line(line: &str) -> bool {
    OPTION_LINE.is_match(line)
}

/// True for a line introducing the options section.
pub fn is_options_label(line: &str) -> bool {
    Section::Options.strip_label(line).is_some()
}

fn option_entry(line: &str) -> Option<(OptionLabel, String)> {
    let caps = OPTION_LINE.captures(line)?;
    let letter = caps.get(1)?.as_str().chars().next()?;
    let text = caps.get(2)?.as_str().trim_end_matches('*').trim();
    if text.is_empty() {
        return None;
    }
    Some((OptionLabel::from_letter(letter)?, text.to_string()))
}

/// Splits `(a) X (b) Y` style lines into one entry per marker. Only a line
/// that opens with a marker and continues with consecutive letters is split,
/// so options such as `(d) Both (a) and (b)` stay whole.
fn option_entries(line: &str) -> Vec<(OptionLabel, String)> {
    let markers: Vec<_> = INLINE_OPTION_MARKER.find_iter(line).collect();
    if markers.len() < 2 || !is_inline_option_run(line, &markers) {
        return option_entry(line).into_iter().collect();
    }

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, marker)| {
            let end = markers.get(i + 1).map_or(line.len(), |next| next.start());
            option_entry(&line[marker.start()..end])
        })
        .collect()
}

fn is_inline_option_run(line: &str, markers: &[regex::Match<'_>]) -> bool {
    let leading = &line[..markers[0].start()];
    if !leading.chars().all(|c| c.is_whitespace() || c == '*') {
        return false;
    }

    let letters: Vec<u8> = markers
        .iter()
        .map(|marker| marker.as_str().as_bytes()[1].to_ascii_lowercase())
        .collect();
    letters.windows(2).all(|pair| pair[1] == pair[0] + 1)
}

/// Paragraphs belonging to the section starting at `start`, ending at the
/// nearest later section start. The label itself is removed.
fn section_text(paragraphs: &[&str], section: Section, start: Option<usize>, next: &[Option<usize>]) -> Vec<String> {
    let Some(start) = start else {
        return Vec::new();
    };

    let end = next
        .iter()
        .flatten()
        .copied()
        .filter(|&index| index > start)
        .min()
        .unwrap_or(paragraphs.len());

    let mut lines = Vec::new();
    for (offset, paragraph) in paragraphs[start..end].iter().enumerate() {
        for (line_no, line) in paragraph.lines().enumerate() {
            let line = if offset == 0 && line_no == 0 {
                section.strip_label(line).unwrap_or(line)
            } else {
                line
            };
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
    }
    lines
}

fn answer_letter(line: &str) -> Option<OptionLabel> {
    ANSWER_LETTER
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|letter| letter.as_str().chars().next())
        .and_then(OptionLabel::from_letter)
}

/// Parses one reply block into a record.
pub fn parse_mcq(raw: &str) -> QuestionRecord {
    let text = raw.replace("\r\n", "\n");
    let paragraphs: Vec<&str> = PARAGRAPH_BREAK
        .split(&text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect();

    let find = |section: Section| paragraphs.iter().position(|p| section.starts(p));
    let question_at = find(Section::Question);
    let options_at = find(Section::Options);
    let answer_at = find(Section::CorrectAnswer);
    let explanation_at = find(Section::Explanation);

    let question_body = section_text(
        &paragraphs,
        Section::Question,
        question_at,
        &[options_at, answer_at, explanation_at],
    );
    let options_body = section_text(&paragraphs, Section::Options, options_at, &[answer_at, explanation_at]);
    let answer_body = section_text(&paragraphs, Section::CorrectAnswer, answer_at, &[explanation_at]);
    let explanation_body = section_text(&paragraphs, Section::Explanation, explanation_at, &[]);

    // Sections that were not found at a paragraph start may still be glued
    // onto an earlier section without a blank line in between.
    let embedded = |origin: Section, line: &str| -> Option<(Section, String)> {
        let candidates = [
            (Section::Options, origin == Section::Question),
            (Section::CorrectAnswer, answer_at.is_none() && origin != Section::CorrectAnswer),
            (Section::Explanation, explanation_at.is_none()),
        ];
        candidates
            .iter()
            .filter(|(_, allowed)| *allowed)
            .find_map(|(section, _)| section.strip_label(line).map(|rest| (*section, rest.to_string())))
    };

    let mut record = QuestionRecord::default();
    let mut option_lines = Vec::new();
    let mut answer_lines = Vec::new();
    let mut explanation_lines = Vec::new();

    for (origin, body) in [
        (Section::Question, question_body),
        (Section::Options, options_body),
        (Section::CorrectAnswer, answer_body),
    ] {
        let mut current = origin;
        for line in body {
            if let Some((section, rest)) = embedded(origin, &line) {
                current = section;
                if rest.is_empty() {
                    continue;
                }
                match section {
                    Section::Options => option_lines.push(rest),
                    Section::CorrectAnswer => answer_lines.push(rest),
                    _ => explanation_lines.push(rest),
                }
                continue;
            }

            match current {
                // Only option markers leave the question body; anything else
                // stays where the model put it.
                Section::Options if origin == Section::Question => {
                    if is_option_line(&line) {
                        option_lines.push(line);
                    } else {
                        record.question_lines.push(line);
                    }
                }
                Section::Question => record.question_lines.push(line),
                Section::Options => option_lines.push(line),
                Section::CorrectAnswer => answer_lines.push(line),
                Section::Explanation => explanation_lines.push(line),
            }
        }
    }
    explanation_lines.extend(explanation_body);

    for line in &option_lines {
        for (label, text) in option_entries(line) {
            record.set_option(label, text);
        }
    }

    record.correct_answer = answer_lines
        .first()
        .and_then(|line| answer_letter(line))
        .map(|label| label.as_str().to_string());

    record.explanation = if explanation_at.is_some() || !explanation_lines.is_empty() {
        explanation_lines.join("\n").trim().to_string()
    } else {
        let trailing = answer_lines.iter().skip(1).cloned().collect::<Vec<_>>().join("\n");
        match (&record.correct_answer, trailing.trim().is_empty()) {
            (_, false) => trailing.trim().to_string(),
            (Some(letter), true) => format!("The correct answer is ({}).", letter.to_lowercase()),
            (None, true) => String::new(),
        }
    };

    record
}

/// Cuts a reply into at most `count` question blocks. Blocks are normally
/// separated by [`MCQ_DELIMITER`] lines; replies that skip the separator are cut at each
/// `Question:` label instead.
pub fn split_blocks(response: &str, count: usize) -> Vec<String> {
    let text = response.replace("\r\n", "\n");
    let mut blocks: Vec<String> = DELIMITER_LINE
        .split(&text)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_string)
        .collect();

    if blocks.len() < count {
        let starts: Vec<usize> = QUESTION_START.find_iter(&text).map(|m| m.start()).collect();
        if starts.len() > blocks.len() {
            blocks = starts
                .iter()
                .enumerate()
                .map(|(i, &start)| {
                    let end = starts.get(i + 1).copied().unwrap_or(text.len());
                    DELIMITER_LINE.replace_all(&text[start..end], "").trim().to_string()
                })
                .filter(|block| !block.is_empty())
                .collect();
        }
    }

    blocks.truncate(count.max(1));
    blocks
}
