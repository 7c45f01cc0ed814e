use crate::api::Gateway;
use crate::config::Config;
use crate::storage::SessionStore;
use crate::storage::file::FileStore;
use std::sync::Arc;
use std::time::Duration;

pub mod account_service;
pub mod session_service;

use account_service::AccountService;
use session_service::SessionService;

/// Wired client core: the gateway plus the services the storefront and the
/// back-office use. Cheap to clone.
#[derive(Clone, Debug)]
pub struct App {
    pub gateway: Arc<Gateway>,
    pub session: SessionService,
    pub account: AccountService,
}

pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn SessionStore>>,
}

impl std::fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, store: None }
    }

    /// Overrides the session store (tests, hosts without durable storage).
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the client core: HTTP client, gateway, store and services;
    /// hydrates the session once and installs the refresh hook.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub async fn build(self) -> anyhow::Result<App> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.gateway.request_timeout_secs))
            .build()?;

        let gateway = Arc::new(Gateway::new(http, self.config.gateway.base_url.clone()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileStore::new(self.config.storage.session_file.clone())));

        let session = SessionService::new(Arc::clone(&gateway), store);
        session.hydrate().await;
        session.install_refresh_hook(&gateway);

        let account = AccountService::new(Arc::clone(&gateway), session.clone());

        Ok(App { gateway, session, account })
    }
}
