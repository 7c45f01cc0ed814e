use crate::error::Result;
use crate::storage::{PersistedSession, SessionStore};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-memory session store for tests and hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<PersistedSession>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents, for assertions in tests.
    pub async fn contents(&self) -> Option<PersistedSession> {
        self.slot.read().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.slot.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}
