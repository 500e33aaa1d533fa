use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::AppResult,
    models::{domain::LeaderboardEntry, dto::request::SubmitScoreRequest},
    repositories::LeaderboardRepository,
};

pub const LEADERBOARD_SIZE: i64 = 50;

pub struct LeaderboardService {
    repository: Arc<dyn LeaderboardRepository>,
}

impl LeaderboardService {
    pub fn new(repository: Arc<dyn LeaderboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn submit_score(&self, request: SubmitScoreRequest) -> AppResult<LeaderboardEntry> {
        request.validate()?;

        let entry = LeaderboardEntry::new(request.username.trim(), request.score);
        let entry = self.repository.insert(entry).await?;
        log::info!("Recorded score {} for {}", entry.score, entry.username);

        Ok(entry)
    }

    pub async fn top_scores(&self) -> AppResult<Vec<LeaderboardEntry>> {
        self.repository.top(LEADERBOARD_SIZE).await
    }
}
