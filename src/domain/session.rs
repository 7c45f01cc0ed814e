use crate::domain::user::UserProfile;

/// In-memory session state. Only the session service mutates it; all other
/// code reads through the accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub(crate) access_token: Option<String>,
    pub(crate) refresh_token: Option<String>,
    pub(crate) user: Option<UserProfile>,
}

impl Session {
    pub const fn authenticated(access_token: String, refresh_token: String, user: UserProfile) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            user: Some(user),
        }
    }

    /// Authenticated iff both the access token and the profile are present.
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Replaces both tokens in place, leaving the profile untouched.
    pub(crate) fn rotate(&mut self, pair: &TokenPair) {
        self.access_token = Some(pair.access_token.clone());
        self.refresh_token = Some(pair.refresh_token.clone());
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { user: self.user.clone() }
    }
}

/// Rotated credentials returned by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Read-only view published to the UI layer on every session transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<UserProfile>,
}

impl SessionSnapshot {
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
