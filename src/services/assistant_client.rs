use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
};

static CITATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"【[^】]*】").expect("CITATION_REGEX is a valid regex pattern")
});

/// Lifecycle of an assistant run as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Runs in these states still occupy the thread.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::RequiresAction | RunStatus::Cancelling
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    pub fn new(id: impl Into<String>, status: RunStatus) -> Self {
        Run {
            id: id.into(),
            status,
            last_error: None,
        }
    }
}

/// Thread/run based assistant service. One thread holds one user's conversation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn create_thread(&self) -> AppResult<String>;
    async fn add_user_message(&self, thread_id: &str, content: &str) -> AppResult<()>;
    async fn create_run(&self, thread_id: &str) -> AppResult<Run>;
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AppResult<Run>;
    async fn list_runs(&self, thread_id: &str) -> AppResult<Vec<Run>>;
    /// Text of the newest assistant-authored message, if any.
    async fn latest_assistant_message(&self, thread_id: &str) -> AppResult<Option<String>>;
    async fn retrieve_file(&self, file_id: &str) -> AppResult<StoredFile>;
    /// Creates a vector store over `file_ids` and returns its id.
    async fn create_vector_store(&self, name: &str, file_ids: Vec<String>) -> AppResult<String>;
    /// Points the assistant's file search at `vector_store_id`.
    async fn update_assistant(&self, vector_store_id: &str) -> AppResult<()>;
}

/// An uploaded file as reported by the files endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredFile {
    pub id: String,
    #[serde(default)]
    pub filename: String,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

/// Assistants v2 REST client.
pub struct OpenAiAssistantClient {
    http: reqwest::Client,
    api_base: String,
    api_key: SecretString,
    assistant_id: String,
}

impl OpenAiAssistantClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            assistant_id: config.assistant_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(self.api_key.expose_secret())
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, action: &str) -> AppResult<T> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Assistant API call '{}' failed with {}: {}", action, status, body);
            return Err(AppError::AiService(format!(
                "{} failed with status {}",
                action, status
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssistantClient for OpenAiAssistantClient {
    async fn create_thread(&self) -> AppResult<String> {
        let thread: IdResponse = self
            .send(self.request(Method::POST, "/threads").json(&json!({})), "create thread")
            .await?;
        log::info!("Created assistant thread {}", thread.id);
        Ok(thread.id)
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> AppResult<()> {
        let path = format!("/threads/{}/messages", thread_id);
        let _message: IdResponse = self
            .send(
                self.request(Method::POST, &path)
                    .json(&json!({ "role": "user", "content": content })),
                "add message",
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str) -> AppResult<Run> {
        let path = format!("/threads/{}/runs", thread_id);
        let body = json!({
            "assistant_id": self.assistant_id,
            "tools": [{ "type": "file_search" }],
        });
        self.send(self.request(Method::POST, &path).json(&body), "create run")
            .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> AppResult<Run> {
        let path = format!("/threads/{}/runs/{}", thread_id, run_id);
        self.send(self.request(Method::GET, &path), "retrieve run").await
    }

    async fn list_runs(&self, thread_id: &str) -> AppResult<Vec<Run>> {
        let path = format!("/threads/{}/runs", thread_id);
        let runs: ListResponse<Run> = self
            .send(
                self.request(Method::GET, &path).query(&[("limit", "20")]),
                "list runs",
            )
            .await?;
        Ok(runs.data)
    }

    async fn latest_assistant_message(&self, thread_id: &str) -> AppResult<Option<String>> {
        let path = format!("/threads/{}/messages", thread_id);
        let messages: ListResponse<ThreadMessage> = self
            .send(
                self.request(Method::GET, &path)
                    .query(&[("order", "desc"), ("limit", "20")]),
                "list messages",
            )
            .await?;

        Ok(latest_assistant_text(&messages.data))
    }

    async fn retrieve_file(&self, file_id: &str) -> AppResult<StoredFile> {
        let path = format!("/files/{}", file_id);
        self.send(self.request(Method::GET, &path), "retrieve file").await
    }

    async fn create_vector_store(&self, name: &str, file_ids: Vec<String>) -> AppResult<String> {
        let store: IdResponse = self
            .send(
                self.request(Method::POST, "/vector_stores")
                    .json(&json!({ "name": name, "file_ids": file_ids })),
                "create vector store",
            )
            .await?;
        Ok(store.id)
    }

    async fn update_assistant(&self, vector_store_id: &str) -> AppResult<()> {
        let path = format!("/assistants/{}", self.assistant_id);
        let body = json!({
            "tools": [{ "type": "file_search" }],
            "tool_resources": {
                "file_search": { "vector_store_ids": [vector_store_id] }
            },
        });
        let _assistant: IdResponse = self
            .send(self.request(Method::POST, &path).json(&body), "update assistant")
            .await?;
        Ok(())
    }
}

fn latest_assistant_text(messages: &[ThreadMessage]) -> Option<String> {
    messages
        .iter()
        .filter(|message| message.role == "assistant")
        .find_map(|message| {
            message
                .content
                .iter()
                .find(|content| content.kind == "text")
                .and_then(|content| content.text.as_ref())
        })
        .map(|text| strip_citations(&text.value))
}

/// Removes file-search citation markers such as `【4:0†source】`.
pub fn strip_citations(text: &str) -> String {
    CITATION_REGEX.replace_all(text, "").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_deserializes_snake_case() {
        let run: Run = serde_json::from_str(r#"{"id":"run_1","status":"in_progress","object":"thread.run"}"#)
            .expect("run should deserialize");
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(run.status.is_active());
        assert_eq!(run.last_error, None);
    }

    #[test]
    fn terminal_statuses_are_not_active() {
        for status in [
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Expired,
            RunStatus::Incomplete,
        ] {
            assert!(status.is_terminal(), "{} should be terminal", status);
        }
        assert!(RunStatus::Queued.is_active());
    }

    #[test]
    fn latest_assistant_text_skips_user_messages() {
        let messages: ListResponse<ThreadMessage> = serde_json::from_str(
            r#"{"data":[
                {"role":"user","content":[{"type":"text","text":{"value":"prompt"}}]},
                {"role":"assistant","content":[{"type":"text","text":{"value":"Question: Q【4:0†source】"}}]},
                {"role":"assistant","content":[{"type":"text","text":{"value":"older"}}]}
            ]}"#,
        )
        .expect("messages should deserialize");

        assert_eq!(
            latest_assistant_text(&messages.data),
            Some("Question: Q".to_string())
        );
    }

    #[test]
    fn latest_assistant_text_is_none_without_assistant_messages() {
        let messages: ListResponse<ThreadMessage> =
            serde_json::from_str(r#"{"data":[{"role":"user","content":[]}]}"#).unwrap();
        assert_eq!(latest_assistant_text(&messages.data), None);
    }

    #[test]
    fn stored_file_tolerates_missing_filename() {
        let file: StoredFile = serde_json::from_str(r#"{"id":"file-1","object":"file","bytes":12}"#)
            .expect("file should deserialize");
        assert_eq!(file, StoredFile { id: "file-1".to_string(), filename: String::new() });
    }

    #[test]
    fn client_trims_trailing_slash_from_base() {
        let mut config = Config::test_config();
        config.openai_api_base = "https://api.openai.com/v1/".to_string();
        let client = OpenAiAssistantClient::new(&config).expect("client should build");
        assert_eq!(client.api_base, "https://api.openai.com/v1");
    }
}
