use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topical themes known for one chapter of one category's book.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSet {
    pub category: String,
    pub chapter: String,
    pub themes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ThemeSet {
    pub fn new(category: &str, chapter: &str, themes: Vec<String>) -> Self {
        ThemeSet {
            category: category.to_string(),
            chapter: chapter.to_string(),
            themes,
            created_at: Utc::now(),
        }
    }
}
