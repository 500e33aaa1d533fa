use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::domain::{CachedQuestion, LeaderboardEntry, ThemeSet},
    repositories::{LeaderboardRepository, QuestionFilter, QuestionRepository, ThemeRepository},
    services::{
        assistant_client::AssistantClient, conversation::ConversationRunner,
        question_generator::QuestionGenerator, session_registry::SessionRegistry,
        structure_selector::StructureSelector, theme_tracker::ThemeTracker,
    },
};

pub use fixtures::WELL_FORMED_MCQ;

pub mod fixtures {
    use crate::{
        constants::prompts::MCQ_DELIMITER,
        models::domain::{OptionLabel, QuestionRecord},
    };

    pub const WELL_FORMED_MCQ: &str = "Question: Consider the following statements about the Preamble:
1. It was amended once, in 1976.
2. It is enforceable in a court of law.
Which of the statements given above is/are correct?

Options:
(a) 1 only
(b) 2 only
(c) Both 1 and 2
(d) Neither 1 nor 2

Correct Answer: (a)

Explanation: The 42nd Amendment added the words socialist, secular and integrity. The Preamble is not enforceable in a court of law.";

    pub const MALFORMED_MCQ: &str =
        "Here is a question about rivers without the expected layout.\n(a) Ganga (b) Yamuna";

    /// One well-formed question block; `index` keeps blocks distinct.
    pub fn mcq_block(index: usize) -> String {
        format!(
            "Question: Which Article of the Constitution was relied on in case {index}?\n\n\
             Options:\n(a) Article 14\n(b) Article 19\n(c) Article 21\n(d) Article 32\n\n\
             Correct Answer: (c)\n\n\
             Explanation: Article 21 protects life and personal liberty (case {index})."
        )
    }

    /// A reply holding `count` blocks separated by `---` lines.
    pub fn mcq_reply(count: usize) -> String {
        (1..=count)
            .map(mcq_block)
            .collect::<Vec<_>>()
            .join(&format!("\n\n{}\n\n", MCQ_DELIMITER))
    }

    pub fn valid_record() -> QuestionRecord {
        let mut record = QuestionRecord {
            question_lines: vec!["Which river is known as the Sorrow of Bihar?".to_string()],
            correct_answer: Some("A".to_string()),
            explanation: "The Kosi shifts course and floods north Bihar almost every year.".to_string(),
            ..Default::default()
        };
        record.set_option(OptionLabel::A, "Kosi");
        record.set_option(OptionLabel::B, "Gandak");
        record.set_option(OptionLabel::C, "Son");
        record.set_option(OptionLabel::D, "Ghaghara");
        record
    }
}

pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

fn ensure_available(unavailable: &AtomicBool) -> AppResult<()> {
    if unavailable.load(Ordering::SeqCst) {
        return Err(AppError::DatabaseError("store unreachable".to_string()));
    }
    Ok(())
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<Vec<CachedQuestion>>,
    unavailable: AtomicBool,
}

impl InMemoryQuestionRepository {
    pub fn seed(&self, question: CachedQuestion) {
        self.questions.write().unwrap().push(question);
    }

    pub fn len(&self) -> usize {
        self.questions.read().unwrap().len()
    }

    pub fn all(&self) -> Vec<CachedQuestion> {
        self.questions.read().unwrap().clone()
    }

    /// Makes every call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn insert_many(&self, questions: Vec<CachedQuestion>) -> AppResult<usize> {
        ensure_available(&self.unavailable)?;
        let inserted = questions.len();
        self.questions.write().unwrap().extend(questions);
        Ok(inserted)
    }

    async fn count(&self, filter: &QuestionFilter) -> AppResult<u64> {
        ensure_available(&self.unavailable)?;
        let questions = self.questions.read().unwrap();
        Ok(questions.iter().filter(|q| filter.matches(q)).count() as u64)
    }

    async fn sample(&self, filter: &QuestionFilter, size: usize) -> AppResult<Vec<CachedQuestion>> {
        ensure_available(&self.unavailable)?;
        let mut matching: Vec<CachedQuestion> = self
            .questions
            .read()
            .unwrap()
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        matching.shuffle(&mut rand::thread_rng());
        matching.truncate(size);
        Ok(matching)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        ensure_available(&self.unavailable)
    }
}

#[derive(Default)]
pub struct InMemoryThemeRepository {
    theme_sets: RwLock<Vec<ThemeSet>>,
    unavailable: AtomicBool,
}

impl InMemoryThemeRepository {
    pub fn insert(&self, theme_set: ThemeSet) {
        let mut theme_sets = self.theme_sets.write().unwrap();
        theme_sets.retain(|t| !(t.category == theme_set.category && t.chapter == theme_set.chapter));
        theme_sets.push(theme_set);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ThemeRepository for InMemoryThemeRepository {
    async fn find(&self, category: &str, chapter: &str) -> AppResult<Option<ThemeSet>> {
        ensure_available(&self.unavailable)?;
        Ok(self
            .theme_sets
            .read()
            .unwrap()
            .iter()
            .find(|t| t.category == category && t.chapter == chapter)
            .cloned())
    }

    async fn save(&self, theme_set: ThemeSet) -> AppResult<ThemeSet> {
        ensure_available(&self.unavailable)?;
        self.insert(theme_set.clone());
        Ok(theme_set)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        ensure_available(&self.unavailable)
    }
}

#[derive(Default)]
pub struct InMemoryLeaderboardRepository {
    entries: RwLock<Vec<LeaderboardEntry>>,
}

#[async_trait]
impl LeaderboardRepository for InMemoryLeaderboardRepository {
    async fn insert(&self, entry: LeaderboardEntry) -> AppResult<LeaderboardEntry> {
        self.entries.write().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn top(&self, limit: i64) -> AppResult<Vec<LeaderboardEntry>> {
        let mut entries = self.entries.read().unwrap().clone();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.date.cmp(&b.date)));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Wires a generator around `client` with fast polling settings.
pub fn build_generator(
    client: Arc<dyn AssistantClient>,
    questions: Arc<InMemoryQuestionRepository>,
    themes: Arc<InMemoryThemeRepository>,
) -> Arc<QuestionGenerator> {
    let settings = Config::test_config().generation_settings();
    let runner = Arc::new(ConversationRunner::new(client.clone(), settings.clone()));

    Arc::new(QuestionGenerator::new(
        Arc::new(SessionRegistry::new(client)),
        runner.clone(),
        Arc::new(ThemeTracker::new(themes, runner)),
        Arc::new(StructureSelector::default()),
        questions,
        settings,
    ))
}

#[cfg(test)]
mod tests {
    use super::{fixtures::*, *};
    use crate::services::{record_validator::is_valid, response_parser::parse_mcq};

    #[test]
    fn fixtures_valid_record_is_valid() {
        assert!(is_valid(&valid_record()));
    }

    #[test]
    fn fixtures_reply_blocks_parse_as_valid() {
        assert!(is_valid(&parse_mcq(&mcq_block(7))));
        assert!(is_valid(&parse_mcq(WELL_FORMED_MCQ)));
        assert!(!is_valid(&parse_mcq(MALFORMED_MCQ)));
    }

    #[tokio::test]
    async fn in_memory_sample_respects_filter_and_size() {
        let repository = InMemoryQuestionRepository::default();
        for chapter in ["Preamble", "Preamble", "Parliament"] {
            repository.seed(CachedQuestion::new("Book", "Polity", chapter, valid_record()));
        }

        let filter = QuestionFilter::for_chapter("Polity", "Preamble");
        assert_eq!(repository.count(&filter).await.unwrap(), 2);
        assert_eq!(repository.sample(&filter, 5).await.unwrap().len(), 2);
        assert_eq!(repository.sample(&QuestionFilter::any(), 1).await.unwrap().len(), 1);
    }
}
