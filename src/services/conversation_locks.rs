use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, MutexGuard},
    time::Duration,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::{AppError, AppResult};

type LockTable = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Per-conversation mutual exclusion. Waiters queue on the handle's async
/// mutex instead of polling; an entry exists only while someone holds or
/// awaits it.
#[derive(Clone, Default)]
pub struct ConversationLocks {
    entries: LockTable,
}

/// Held for the duration of one generation sequence. Dropping it releases
/// the handle on every exit path.
pub struct ConversationGuard {
    handle: String,
    entries: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, handle: &str, timeout: Duration) -> AppResult<ConversationGuard> {
        let slot = {
            let mut entries = lock_table(&self.entries);
            entries
                .entry(handle.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let acquired = tokio::time::timeout(timeout, slot.lock_owned()).await;

        match acquired {
            Ok(guard) => Ok(ConversationGuard {
                handle: handle.to_string(),
                entries: self.entries.clone(),
                guard: Some(guard),
            }),
            Err(_) => {
                remove_if_idle(&self.entries, handle);
                log::warn!("Timed out after {:?} waiting for conversation {}", timeout, handle);
                Err(AppError::Timeout(format!(
                    "Conversation {} is busy with another request",
                    handle
                )))
            }
        }
    }

    pub fn is_locked(&self, handle: &str) -> bool {
        lock_table(&self.entries)
            .get(handle)
            .map_or(false, |slot| slot.try_lock().is_err())
    }

    /// Number of handles currently held or awaited.
    pub fn tracked(&self) -> usize {
        lock_table(&self.entries).len()
    }
}

impl ConversationGuard {
    pub fn handle(&self) -> &str {
        &self.handle
    }
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        self.guard.take();
        remove_if_idle(&self.entries, &self.handle);
    }
}

fn lock_table(entries: &LockTable) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Only the table's own reference left means nobody holds or awaits the handle.
fn remove_if_idle(entries: &LockTable, handle: &str) {
    let mut table = lock_table(entries);
    if table
        .get(handle)
        .map_or(false, |slot| Arc::strong_count(slot) == 1)
    {
        table.remove(handle);
    }
}
