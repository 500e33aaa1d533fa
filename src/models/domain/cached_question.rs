use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::QuestionRecord;

/// A validated question as stored in the question collection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedQuestion {
    pub book: String,
    pub category: String,
    pub chapter: String,
    pub mcq: QuestionRecord,
    pub created_at: DateTime<Utc>,
}

impl CachedQuestion {
    pub fn new(book: &str, category: &str, chapter: &str, mcq: QuestionRecord) -> Self {
        CachedQuestion {
            book: book.to_string(),
            category: category.to_string(),
            chapter: chapter.to_string(),
            mcq,
            created_at: Utc::now(),
        }
    }
}
