use serde::Deserialize;
use validator::Validate;

fn default_count() -> u32 {
    1
}

/// Body of `POST /ask`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub query: String,

    #[validate(length(min = 1, max = 100))]
    pub category: String,

    /// Opaque session identifier, optionally suffixed with `-<index>`.
    #[serde(rename = "userId", alias = "sessionId")]
    #[validate(length(min = 1, max = 200))]
    pub session_id: String,

    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 10))]
    pub count: u32,

    #[serde(default)]
    #[validate(length(max = 200))]
    pub chapter: Option<String>,

    #[serde(default)]
    pub force_generate: bool,
}

/// Body of `POST /leaderboard`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitScoreRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,

    #[validate(range(min = 0))]
    pub score: i64,
}
