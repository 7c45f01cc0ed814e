use crate::api::schemas::auth::{RefreshRequest, TokenPairSchema};
use crate::api::schemas::envelope::Envelope;
use crate::domain::session::TokenPair;
use crate::error::{ApiError, Result};
use futures::future::BoxFuture;
use reqwest::header;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use url::Url;
use uuid::Uuid;

/// Handler consulted on a 401 response before the single replay. Installed by
/// the session service so the transport layer stays decoupled from session
/// internals.
pub type RefreshHook = Arc<dyn Fn() -> BoxFuture<'static, Option<TokenPair>> + Send + Sync>;

/// Generic request against the gateway: method, path, optional JSON body and
/// optional bearer token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attaches a JSON body.
    ///
    /// # Errors
    /// Returns `ApiError::Malformed` if the payload cannot be serialized.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    #[must_use]
    pub fn bearer_opt(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// Client-side boundary to the REST backend. Does not interpret business
/// payloads, only the envelope `success` flag and the 401 condition.
pub struct Gateway {
    http: reqwest::Client,
    base_url: Url,
    refresh_hook: RwLock<Option<RefreshHook>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").field("base_url", &self.base_url.as_str()).finish_non_exhaustive()
    }
}

impl Gateway {
    pub const fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            refresh_hook: RwLock::new(None),
        }
    }

    /// Installs the handler invoked on a 401 before the single replay.
    pub fn set_refresh_hook(&self, hook: RefreshHook) {
        *self.refresh_hook.write().expect("refresh hook lock poisoned") = Some(hook);
    }

    fn refresh_hook(&self) -> Option<RefreshHook> {
        self.refresh_hook.read().expect("refresh hook lock poisoned").clone()
    }

    /// Executes a request and returns the envelope's `data`.
    ///
    /// # Errors
    /// `Unauthenticated` after a failed (or unavailable) refresh, `Rejected`
    /// on `success:false`, `Transport` on network failure, `Malformed` on an
    /// unparseable envelope, `BadRequest` when `data` is missing.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let envelope = self.send_enveloped::<T>(&request).await?;
        envelope
            .data
            .ok_or_else(|| ApiError::BadRequest(format!("missing data in response from {}", request.path)))
    }

    /// Variant for endpoints whose success envelope carries no `data`.
    ///
    /// # Errors
    /// Same conditions as [`Gateway::execute`], minus the missing-`data` case.
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<()> {
        self.send_enveloped::<serde_json::Value>(&request).await.map(|_| ())
    }

    /// Calls the token-refresh endpoint directly. Never routed through the
    /// 401 replay path.
    ///
    /// # Errors
    /// Any non-success outcome; callers collapse them all into refresh
    /// failure.
    #[tracing::instrument(skip_all, err(level = "debug"))]
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair> {
        let request = ApiRequest::post("/auth/refresh").json(&RefreshRequest { refresh_token })?;
        let envelope = self.dispatch::<TokenPairSchema>(&request, None).await?;
        let pair = envelope
            .data
            .ok_or_else(|| ApiError::BadRequest("missing data in refresh response".to_string()))?;
        Ok(TokenPair {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    async fn send_enveloped<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<Envelope<T>> {
        match self.dispatch(request, request.bearer.as_deref()).await {
            Err(ApiError::Unauthenticated) => {
                let Some(hook) = self.refresh_hook() else {
                    return Err(ApiError::Unauthenticated);
                };
                let Some(pair) = hook().await else {
                    return Err(ApiError::Unauthenticated);
                };
                tracing::debug!(path = %request.path, "replaying request with rotated access token");
                self.dispatch(request, Some(&pair.access_token)).await
            }
            outcome => outcome,
        }
    }

    async fn dispatch<T: DeserializeOwned>(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<Envelope<T>> {
        let response = self.build(request, bearer)?.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(path = %request.path, "gateway rejected credentials");
            return Err(ApiError::Unauthenticated);
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;

        if envelope.success {
            Ok(envelope)
        } else {
            Err(ApiError::Rejected {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_else(|| "request rejected".to_string()),
                errors: envelope.errors.unwrap_or_default(),
            })
        }
    }

    fn build(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| ApiError::BadRequest(format!("unjoinable path {}: {e}", request.path)))?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(header::ACCEPT, "application/json")
            .header("x-request-id", Uuid::new_v4().to_string());

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }
}
