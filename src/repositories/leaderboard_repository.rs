use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::LeaderboardEntry};

#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    async fn insert(&self, entry: LeaderboardEntry) -> AppResult<LeaderboardEntry>;
    /// Highest scores first; ties go to the earlier submission.
    async fn top(&self, limit: i64) -> AppResult<Vec<LeaderboardEntry>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoLeaderboardRepository {
    collection: Collection<LeaderboardEntry>,
}

impl MongoLeaderboardRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        let collection = db.get_collection(collection_name);
        Self { collection }
    }
}

#[async_trait]
impl LeaderboardRepository for MongoLeaderboardRepository {
    async fn insert(&self, entry: LeaderboardEntry) -> AppResult<LeaderboardEntry> {
        self.collection.insert_one(&entry).await?;
        Ok(entry)
    }

    async fn top(&self, limit: i64) -> AppResult<Vec<LeaderboardEntry>> {
        let find_options = FindOptions::builder()
            .sort(doc! { "score": -1, "date": 1 })
            .limit(Some(limit))
            .build();

        let cursor = self.collection.find(doc! {}).with_options(find_options).await?;
        let entries: Vec<LeaderboardEntry> = cursor.try_collect().await?;

        Ok(entries)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let model = IndexModel::builder()
            .keys(doc! { "score": -1, "date": 1 })
            .build();

        self.collection.create_index(model).await?;
        log::info!("Created index on leaderboard.(score, date)");

        Ok(())
    }
}
