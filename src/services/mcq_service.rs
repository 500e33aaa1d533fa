use std::sync::Arc;

use validator::Validate;

use crate::{
    constants::books::{canonical_chapter, chapter_from_query, resolve_book},
    errors::AppResult,
    models::{domain::QuestionRecord, dto::request::AskRequest},
    repositories::{QuestionFilter, QuestionRepository},
    services::question_generator::{GenerationRequest, QuestionGenerator},
};

/// Serves `/ask`: stored questions when there are enough for the chapter,
/// freshly generated ones otherwise.
pub struct McqService {
    generator: Arc<QuestionGenerator>,
    questions: Arc<dyn QuestionRepository>,
}

impl McqService {
    pub fn new(generator: Arc<QuestionGenerator>, questions: Arc<dyn QuestionRepository>) -> Self {
        Self {
            generator,
            questions,
        }
    }

    pub async fn ask(&self, request: AskRequest) -> AppResult<Vec<QuestionRecord>> {
        request.validate()?;

        let book = resolve_book(&request.category)?;
        let requested_chapter = request
            .chapter
            .clone()
            .filter(|chapter| !chapter.trim().is_empty())
            .or_else(|| chapter_from_query(&request.query));
        let chapter = canonical_chapter(book, requested_chapter.as_deref());
        let count = request.count as usize;

        if !request.force_generate {
            match self.cached(&request.category, &chapter, count).await {
                Ok(Some(records)) => {
                    log::info!(
                        "Serving {} stored MCQ(s) for {} / {}",
                        records.len(),
                        request.category,
                        chapter
                    );
                    return Ok(records);
                }
                Ok(None) => {}
                Err(err) => log::warn!("Question cache unavailable, generating instead: {}", err),
            }
        }

        self.generator
            .generate(&GenerationRequest {
                query: request.query,
                category: request.category,
                chapter: Some(chapter),
                session_id: request.session_id,
                count,
            })
            .await
    }

    async fn cached(&self, category: &str, chapter: &str, count: usize) -> AppResult<Option<Vec<QuestionRecord>>> {
        let filter = QuestionFilter::for_chapter(category, chapter);
        if self.questions.count(&filter).await? < count as u64 {
            return Ok(None);
        }

        let sampled = self.questions.sample(&filter, count).await?;
        if sampled.len() < count {
            return Ok(None);
        }

        Ok(Some(sampled.into_iter().map(|cached| cached.mcq).collect()))
    }
}
