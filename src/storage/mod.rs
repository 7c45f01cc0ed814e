use crate::domain::session::Session;
use crate::domain::user::UserProfile;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod file;
pub mod memory;

/// Durable mirror of the in-memory session: the access token, the refresh
/// token and the serialized profile, kept as one JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub updated_at: i64,
}

impl PersistedSession {
    pub(crate) fn from_session(session: &Session) -> Self {
        Self {
            access_token: session.access_token().map(ToString::to_string),
            refresh_token: session.refresh_token().map(ToString::to_string),
            user: session.user().cloned(),
            updated_at: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    /// A record is only adopted whole: tokens and profile jointly present.
    /// Partial records are left for the refresh fallback to pick over.
    pub(crate) fn into_session(self) -> Option<Session> {
        match (self.access_token, self.refresh_token, self.user) {
            (Some(access), Some(refresh), Some(user)) => Some(Session::authenticated(access, refresh, user)),
            _ => None,
        }
    }
}

/// Durable client storage boundary. Written only by the session service;
/// reads elsewhere must not bypass the in-memory source of truth.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the persisted session; `None` when absent or unreadable.
    async fn load(&self) -> Result<Option<PersistedSession>>;

    async fn save(&self, session: &PersistedSession) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}
