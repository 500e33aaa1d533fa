use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::CachedQuestion,
};

/// Exact-match filter over stored questions. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub category: Option<String>,
    pub chapter: Option<String>,
}

impl QuestionFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn for_chapter(category: &str, chapter: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            chapter: Some(chapter.to_string()),
        }
    }

    pub fn matches(&self, question: &CachedQuestion) -> bool {
        self.category.as_deref().map_or(true, |c| question.category == c)
            && self.chapter.as_deref().map_or(true, |c| question.chapter == c)
    }

    pub fn to_document(&self) -> Document {
        let mut filter = doc! {};
        if let Some(category) = &self.category {
            filter.insert("category", category.as_str());
        }
        if let Some(chapter) = &self.chapter {
            filter.insert("chapter", chapter.as_str());
        }
        filter
    }
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn insert_many(&self, questions: Vec<CachedQuestion>) -> AppResult<usize>;
    async fn count(&self, filter: &QuestionFilter) -> AppResult<u64>;
    /// Uniform random sample of at most `size` questions matching `filter`.
    async fn sample(&self, filter: &QuestionFilter, size: usize) -> AppResult<Vec<CachedQuestion>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuestionRepository {
    collection: Collection<CachedQuestion>,
}

impl MongoQuestionRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn insert_many(&self, questions: Vec<CachedQuestion>) -> AppResult<usize> {
        if questions.is_empty() {
            return Ok(0);
        }

        let result = self.collection.insert_many(&questions).await?;
        Ok(result.inserted_ids.len())
    }

    async fn count(&self, filter: &QuestionFilter) -> AppResult<u64> {
        let total = self.collection.count_documents(filter.to_document()).await?;
        Ok(total)
    }

    async fn sample(&self, filter: &QuestionFilter, size: usize) -> AppResult<Vec<CachedQuestion>> {
        if size == 0 {
            return Ok(vec![]);
        }

        let pipeline = vec![
            doc! { "$match": filter.to_document() },
            doc! { "$sample": { "size": size as i64 } },
        ];

        let cursor = self.collection.aggregate(pipeline).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        documents
            .into_iter()
            .map(|document| mongodb::bson::from_document(document).map_err(AppError::from))
            .collect()
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for questions collection");

        let category_chapter_index = IndexModel::builder()
            .keys(doc! { "category": 1, "chapter": 1 })
            .build();
        self.collection.create_index(category_chapter_index).await?;

        let created_at_index = IndexModel::builder()
            .keys(doc! { "createdAt": -1 })
            .build();
        self.collection.create_index(created_at_index).await?;

        log::info!("Successfully created indexes for questions collection");
        Ok(())
    }
}
