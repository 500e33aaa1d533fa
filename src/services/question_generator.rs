use std::sync::Arc;

use crate::{
    config::GenerationSettings,
    constants::{
        books::{canonical_chapter, resolve_book, BookInfo},
        prompts::{render_generation_prompt, GenerationPrompt},
        structures::detect_structure,
    },
    errors::{AppError, AppResult},
    models::domain::{CachedQuestion, QuestionRecord},
    repositories::{QuestionFilter, QuestionRepository},
    services::{
        conversation::ConversationRunner,
        conversation_locks::ConversationLocks,
        record_validator::{is_valid, record_issues},
        response_parser::{parse_mcq, split_blocks},
        session_registry::SessionRegistry,
        structure_selector::StructureSelector,
        theme_tracker::{session_key, ThemeTracker},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub query: String,
    pub category: String,
    pub chapter: Option<String>,
    pub session_id: String,
    pub count: usize,
}

pub struct QuestionGenerator {
    sessions: Arc<SessionRegistry>,
    locks: ConversationLocks,
    runner: Arc<ConversationRunner>,
    themes: Arc<ThemeTracker>,
    structures: Arc<StructureSelector>,
    questions: Arc<dyn QuestionRepository>,
    settings: GenerationSettings,
}

impl QuestionGenerator {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        runner: Arc<ConversationRunner>,
        themes: Arc<ThemeTracker>,
        structures: Arc<StructureSelector>,
        questions: Arc<dyn QuestionRepository>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            sessions,
            locks: ConversationLocks::new(),
            runner,
            themes,
            structures,
            questions,
            settings,
        }
    }

    pub fn locks(&self) -> &ConversationLocks {
        &self.locks
    }

    /// Generates `request.count` questions. Shortfalls from invalid output or
    /// retryable failures are covered from stored questions first, then by
    /// another attempt, up to `max_retries` extra attempts.
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<Vec<QuestionRecord>> {
        let book = resolve_book(&request.category)?;
        let chapter = canonical_chapter(book, request.chapter.as_deref());
        let wanted = request.count.max(1);

        let mut collected: Vec<QuestionRecord> = Vec::with_capacity(wanted);
        let mut retry_count = 0;

        loop {
            let shortfall = wanted - collected.len();
            match self.attempt(book, &chapter, request, shortfall).await {
                Ok(valid) => collected.extend(valid.into_iter().take(shortfall)),
                Err(err) if err.is_retryable() => {
                    log::warn!(
                        "Generation attempt {} for session {} failed: {}",
                        retry_count + 1,
                        request.session_id,
                        err
                    );
                }
                Err(err) => return Err(err),
            }

            let shortfall = wanted - collected.len();
            if shortfall == 0 {
                return Ok(collected);
            }

            let fallback = self.sample_fallback(book, &chapter, shortfall, &collected).await;
            if fallback.len() >= shortfall {
                log::info!(
                    "Filled {} missing question(s) for session {} from stored questions",
                    shortfall,
                    request.session_id
                );
                collected.extend(fallback.into_iter().take(shortfall));
                return Ok(collected);
            }

            retry_count += 1;
            if retry_count > self.settings.max_retries {
                log::error!(
                    "Giving up on {} question(s) for session {} after {} attempts",
                    shortfall,
                    request.session_id,
                    retry_count
                );
                return Err(AppError::GenerationFailed(format!(
                    "Could not produce {} valid question(s) after {} attempts",
                    shortfall, retry_count
                )));
            }

            log::info!(
                "Retrying generation of {} question(s) for session {} (retry {}/{})",
                shortfall,
                request.session_id,
                retry_count,
                self.settings.max_retries
            );
        }
    }

    /// One locked generation sequence on the session's conversation. Returns
    /// the valid records, already stored.
    async fn attempt(
        &self,
        book: &'static BookInfo,
        chapter: &str,
        request: &GenerationRequest,
        count: usize,
    ) -> AppResult<Vec<QuestionRecord>> {
        let thread_id = self
            .sessions
            .get_or_create_conversation(&request.session_id)
            .await?;
        let _guard = self.locks.acquire(&thread_id, self.settings.lock_timeout).await?;

        self.runner.drain(&thread_id).await?;

        let key = session_key(&request.session_id, chapter);
        let theme = self.themes.select_theme(book, chapter, &key).await?;
        let question_number = self.themes.next_question_number(&key, count).await;
        let structure = self.structures.select_structure(&request.session_id);

        log::info!(
            "Generating {} MCQ(s) for {} / {} (theme: {}, structure: {}, question #{})",
            count,
            book.category,
            chapter,
            theme,
            structure.name,
            question_number
        );

        let prompt = render_generation_prompt(&GenerationPrompt {
            book,
            chapter,
            theme: &theme,
            structure,
            count,
            question_number,
            query: &request.query,
        });
        let response = self.runner.complete_turn(&thread_id, &prompt).await?;
        log::debug!("Assistant reply on thread {}:\n{}", thread_id, response);

        let detected = detect_structure(&response);
        if detected.name != structure.name {
            log::info!(
                "Requested structure {} but the reply looks like {}",
                structure.name,
                detected.name
            );
        }

        let mut valid = Vec::new();
        for block in split_blocks(&response, count) {
            let record = parse_mcq(&block);
            if is_valid(&record) {
                valid.push(record);
            } else {
                log::warn!(
                    "Discarding invalid MCQ ({}):\n{}",
                    record_issues(&record).join("; "),
                    block
                );
            }
        }

        self.store(book, chapter, &valid).await;
        Ok(valid)
    }

    async fn store(&self, book: &BookInfo, chapter: &str, records: &[QuestionRecord]) {
        if records.is_empty() {
            return;
        }

        let cached: Vec<CachedQuestion> = records
            .iter()
            .map(|record| CachedQuestion::new(book.book_name, book.category, chapter, record.clone()))
            .collect();

        match self.questions.insert_many(cached).await {
            Ok(stored) => log::info!("Stored {} MCQ(s) for {} / {}", stored, book.category, chapter),
            Err(err) => log::warn!("Could not store generated MCQs: {}", err),
        }
    }

    /// Samples stored questions not already in `exclude`, preferring the
    /// requested chapter, then the category, then any category. Empty when no
    /// tier has enough.
    async fn sample_fallback(
        &self,
        book: &BookInfo,
        chapter: &str,
        needed: usize,
        exclude: &[QuestionRecord],
    ) -> Vec<QuestionRecord> {
        let tiers = [
            QuestionFilter::for_chapter(book.category, chapter),
            QuestionFilter {
                category: Some(book.category.to_string()),
                chapter: None,
            },
            QuestionFilter::any(),
        ];

        for filter in &tiers {
            match self.questions.sample(filter, needed + exclude.len()).await {
                Ok(sampled) => {
                    let fresh: Vec<QuestionRecord> = sampled
                        .into_iter()
                        .map(|cached| cached.mcq)
                        .filter(|record| !exclude.contains(record))
                        .take(needed)
                        .collect();
                    if fresh.len() == needed {
                        return fresh;
                    }
                }
                Err(err) => {
                    log::warn!("Could not sample stored MCQs: {}", err);
                    return Vec::new();
                }
            }
        }

        Vec::new()
    }
}
