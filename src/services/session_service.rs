use crate::api::Gateway;
use crate::api::gateway::RefreshHook;
use crate::domain::session::{Session, SessionSnapshot, TokenPair};
use crate::domain::user::UserProfile;
use crate::storage::{PersistedSession, SessionStore};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use opentelemetry::{global, metrics::Counter};
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, watch};

type InFlightRefresh = Shared<BoxFuture<'static, Option<TokenPair>>>;

#[derive(Clone)]
struct Metrics {
    login_total: Counter<u64>,
    logout_total: Counter<u64>,
    refresh_total: Counter<u64>,
    refresh_coalesced_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("aurum-client");
        Self {
            login_total: meter
                .u64_counter("session_login_total")
                .with_description("Total number of sessions established")
                .build(),
            logout_total: meter
                .u64_counter("session_logout_total")
                .with_description("Total number of times the session was cleared")
                .build(),
            refresh_total: meter
                .u64_counter("session_refresh_total")
                .with_description("Total number of successful token rotations")
                .build(),
            refresh_coalesced_total: meter
                .u64_counter("session_refresh_coalesced_total")
                .with_description("Refresh calls served by an already in-flight rotation")
                .build(),
        }
    }
}

/// Session coordinator: owns the token pair and user identity, and
/// guarantees that overlapping refresh attempts collapse into a single
/// network call whose outcome every caller observes.
#[derive(Clone)]
pub struct SessionService {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: Arc<Gateway>,
    store: Arc<dyn SessionStore>,
    session: RwLock<Session>,
    state_tx: watch::Sender<SessionSnapshot>,
    in_flight: Mutex<Option<InFlightRefresh>>,
    metrics: Metrics,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl SessionService {
    pub fn new(gateway: Arc<Gateway>, store: Arc<dyn SessionStore>) -> Self {
        let (state_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                gateway,
                store,
                session: RwLock::new(Session::default()),
                state_tx,
                in_flight: Mutex::new(None),
                metrics: Metrics::new(),
            }),
        }
    }

    /// One-shot hydration from durable storage. Unreadable or malformed
    /// contents leave the session anonymous; startup never fails here.
    #[tracing::instrument(skip(self))]
    pub async fn hydrate(&self) {
        let persisted = match self.inner.store.load().await {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted session, starting anonymous");
                return;
            }
        };

        let Some(persisted) = persisted else { return };
        match persisted.into_session() {
            Some(session) => {
                tracing::debug!("session hydrated from storage");
                self.replace(session);
            }
            None => tracing::debug!("persisted session incomplete, starting anonymous"),
        }
    }

    /// Unconditionally replaces the session and persists it. No error
    /// conditions: a storage failure is logged and the in-memory session
    /// stands.
    #[tracing::instrument(skip_all, fields(user_id = user.id))]
    pub async fn login(&self, access_token: String, refresh_token: String, user: UserProfile) {
        let session = Session::authenticated(access_token, refresh_token, user);
        self.replace(session.clone());
        self.persist(&session).await;
        self.inner.metrics.login_total.add(1, &[]);
        tracing::info!("session established");
    }

    /// Clears session state and durable storage. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) {
        self.replace(Session::default());
        if let Err(e) = self.inner.store.clear().await {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        self.inner.metrics.logout_total.add(1, &[]);
        tracing::info!("session cleared");
    }

    /// Current access token, or `None` when anonymous. Side-effect-free.
    pub fn access_token(&self) -> Option<String> {
        self.read(|s| s.access_token().map(ToString::to_string))
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read(|s| s.user().cloned())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(Session::is_authenticated)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state_tx.borrow().clone()
    }

    /// Watch receiver observing every session transition; the UI layer's
    /// subscription point.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state_tx.subscribe()
    }

    /// Installs [`SessionService::refresh`] as the gateway's 401 handler.
    pub fn install_refresh_hook(&self, gateway: &Gateway) {
        let this = self.clone();
        let hook: RefreshHook = Arc::new(move || {
            let this = this.clone();
            async move { this.refresh().await }.boxed()
        });
        gateway.set_refresh_hook(hook);
    }

    /// Rotates the token pair, deduplicating overlapping calls: the first
    /// caller issues the network request and every caller arriving before it
    /// settles awaits that same outcome. `None` signals refresh failure, which
    /// is terminal for the session.
    pub async fn refresh(&self) -> Option<TokenPair> {
        let pending = {
            let mut slot = self.inner.in_flight.lock().await;
            if let Some(pending) = slot.as_ref() {
                self.inner.metrics.refresh_coalesced_total.add(1, &[]);
                tracing::debug!("refresh already in flight, awaiting its outcome");
                pending.clone()
            } else {
                let this = self.clone();
                let pending: InFlightRefresh = async move {
                    let outcome = this.perform_refresh().await;
                    this.inner.in_flight.lock().await.take();
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some(pending.clone());
                pending
            }
        };

        pending.await
    }

    #[tracing::instrument(skip(self))]
    async fn perform_refresh(&self) -> Option<TokenPair> {
        // Memory first; the storage fallback covers a fresh process that
        // never hydrated.
        let (refresh_token, fallback_user) = match self.read(|s| s.refresh_token().map(ToString::to_string)) {
            Some(token) => (Some(token), None),
            None => match self.inner.store.load().await {
                Ok(Some(persisted)) => (persisted.refresh_token, persisted.user),
                Ok(None) => (None, None),
                Err(e) => {
                    tracing::warn!(error = %e, "could not read persisted session");
                    (None, None)
                }
            },
        };

        let Some(refresh_token) = refresh_token else {
            tracing::debug!("no refresh token available, not calling the gateway");
            return None;
        };

        match self.inner.gateway.refresh_tokens(&refresh_token).await {
            Ok(pair) => {
                self.apply_rotation(&pair, fallback_user).await;
                self.inner.metrics.refresh_total.add(1, &[]);
                tracing::info!("tokens rotated");
                Some(pair)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, clearing session");
                self.logout().await;
                None
            }
        }
    }

    async fn apply_rotation(&self, pair: &TokenPair, fallback_user: Option<UserProfile>) {
        let session = {
            let mut guard = self.inner.session.write().expect("session lock poisoned");
            guard.rotate(pair);
            if guard.user().is_none() {
                // Fallback path: restore the stored profile so authenticated
                // state stays all-or-nothing.
                guard.user = fallback_user;
            }
            guard.clone()
        };
        self.inner.state_tx.send_replace(session.snapshot());
        self.persist(&session).await;
    }

    fn replace(&self, session: Session) {
        let snapshot = session.snapshot();
        *self.inner.session.write().expect("session lock poisoned") = session;
        self.inner.state_tx.send_replace(snapshot);
    }

    async fn persist(&self, session: &Session) {
        let record = PersistedSession::from_session(session);
        if let Err(e) = self.inner.store.save(&record).await {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.inner.session.read().expect("session lock poisoned"))
    }
}
