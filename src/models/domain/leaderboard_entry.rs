use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
    pub date: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn new(username: &str, score: i64) -> Self {
        LeaderboardEntry {
            username: username.to_string(),
            score,
            date: Utc::now(),
        }
    }
}
