use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, MutexGuard},
};

use tokio::sync::OnceCell;

use crate::{
    errors::{AppError, AppResult},
    services::assistant_client::AssistantClient,
};

type ThreadSlot = Arc<OnceCell<String>>;

/// Maps session ids to their assistant thread. Process-local; lost on restart.
///
/// Each session owns its own slot, so creating a thread for one session never
/// holds up lookups for another.
pub struct SessionRegistry {
    client: Arc<dyn AssistantClient>,
    threads: StdMutex<HashMap<String, ThreadSlot>>,
}

impl SessionRegistry {
    pub fn new(client: Arc<dyn AssistantClient>) -> Self {
        Self {
            client,
            threads: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns the session's thread, creating it on first use. Concurrent
    /// first calls for one session share a single creation; a failed creation
    /// is retried by the next caller.
    pub async fn get_or_create_conversation(&self, session_id: &str) -> AppResult<String> {
        let slot = self
            .table()
            .entry(session_id.to_string())
            .or_default()
            .clone();

        let thread_id = slot
            .get_or_try_init(|| async {
                let thread_id = self.client.create_thread().await?;
                log::info!("Session {} bound to thread {}", session_id, thread_id);
                Ok::<_, AppError>(thread_id)
            })
            .await?;

        Ok(thread_id.clone())
    }

    /// Sessions that already have a thread.
    pub fn session_count(&self) -> usize {
        self.table()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, ThreadSlot>> {
        self.threads.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
