use std::sync::Arc;

use tokio::time::{sleep, Instant};

use crate::{
    config::GenerationSettings,
    errors::{AppError, AppResult},
    services::assistant_client::{AssistantClient, RunStatus},
};

/// Drives message/run turns on an assistant thread.
pub struct ConversationRunner {
    client: Arc<dyn AssistantClient>,
    settings: GenerationSettings,
}

impl ConversationRunner {
    pub fn new(client: Arc<dyn AssistantClient>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &Arc<dyn AssistantClient> {
        &self.client
    }

    /// Waits until no run on the thread is active. Runs that start while
    /// draining are picked up by the next listing.
    pub async fn drain(&self, thread_id: &str) -> AppResult<()> {
        loop {
            let active: Vec<String> = self
                .client
                .list_runs(thread_id)
                .await?
                .into_iter()
                .filter(|run| run.status.is_active())
                .map(|run| run.id)
                .collect();

            if active.is_empty() {
                return Ok(());
            }

            log::info!(
                "Waiting for {} active run(s) on thread {} to finish",
                active.len(),
                thread_id
            );

            for run_id in active {
                let status = self.wait_for_run(thread_id, &run_id).await?;
                log::debug!("Run {} on thread {} settled as {}", run_id, thread_id, status);
            }
        }
    }

    /// Polls a run with exponential backoff until it reaches a terminal state.
    pub async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> AppResult<RunStatus> {
        let deadline = Instant::now() + self.settings.run_timeout;
        let mut delay = self.settings.run_poll_interval;

        loop {
            let run = self.client.retrieve_run(thread_id, run_id).await?;
            if run.status.is_terminal() {
                if let Some(error) = &run.last_error {
                    log::warn!(
                        "Run {} ended as {} ({}: {})",
                        run_id,
                        run.status,
                        error.code,
                        error.message
                    );
                }
                return Ok(run.status);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(AppError::Timeout(format!(
                    "Run {} on thread {} still {} after {:?}",
                    run_id, thread_id, run.status, self.settings.run_timeout
                )));
            }

            sleep(delay.min(deadline - now)).await;
            delay = (delay * 2).min(self.settings.run_poll_max_interval);
        }
    }

    /// Appends `content` as a user message, runs the assistant, and returns its reply.
    pub async fn complete_turn(&self, thread_id: &str, content: &str) -> AppResult<String> {
        self.client.add_user_message(thread_id, content).await?;

        let run = self.client.create_run(thread_id).await?;
        if run.id.is_empty() {
            return Err(AppError::AiService("Failed to create AI run".to_string()));
        }

        let status = self.wait_for_run(thread_id, &run.id).await?;
        if status != RunStatus::Completed {
            return Err(AppError::AiService(format!(
                "AI run {} ended with status {}",
                run.id, status
            )));
        }

        self.client
            .latest_assistant_message(thread_id)
            .await?
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AppError::AiService("No response available from the assistant".to_string()))
    }
}
