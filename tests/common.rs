use aurum_client::config::{Config, GatewayConfig, LogFormat, StorageConfig, TelemetryConfig};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use url::Url;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("aurum_client=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub const EMAIL: &str = "goldsmith@aurum.test";
pub const PASSWORD: &str = "marquise-cut";

#[derive(Default)]
pub struct GatewayState {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub refresh_delay_ms: AtomicUsize,
    pub refresh_rejects: AtomicBool,
    pub me_always_unauthorized: AtomicBool,
    tokens: Mutex<Tokens>,
}

#[derive(Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
    generation: usize,
}

impl GatewayState {
    fn issue(&self) -> (String, String) {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.generation += 1;
        let access = format!("access-{}", tokens.generation);
        let refresh = format!("refresh-{}", tokens.generation);
        tokens.access = Some(access.clone());
        tokens.refresh = Some(refresh.clone());
        (access, refresh)
    }

    fn consume_refresh(&self, presented: Option<&str>) -> Option<(String, String)> {
        let mut tokens = self.tokens.lock().unwrap();
        if presented.is_none() || tokens.refresh.as_deref() != presented {
            return None;
        }
        tokens.generation += 1;
        let access = format!("access-{}", tokens.generation);
        let refresh = format!("refresh-{}", tokens.generation);
        tokens.access = Some(access.clone());
        tokens.refresh = Some(refresh.clone());
        Some((access, refresh))
    }

    fn access(&self) -> Option<String> {
        self.tokens.lock().unwrap().access.clone()
    }

    /// Seeds backend-side tokens without going through login.
    #[allow(dead_code)]
    pub fn seed_tokens(&self, access: &str, refresh: &str) {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.access = Some(access.to_string());
        tokens.refresh = Some(refresh.to_string());
    }

    /// Invalidates the current access token server-side, so the next bearer
    /// request 401s while the refresh token stays usable.
    #[allow(dead_code)]
    pub fn expire_access_token(&self) {
        self.tokens.lock().unwrap().access = Some("expired-out-of-band".to_string());
    }
}

pub struct TestApp {
    pub base_url: String,
    pub state: Arc<GatewayState>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        setup_tracing();

        let state = Arc::new(GatewayState::default());
        let router = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/auth/me", get(me))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub gateway");
        let addr = listener.local_addr().expect("stub gateway addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("stub gateway crashed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }
}

#[allow(dead_code)]
pub fn test_config(base_url: &str) -> Config {
    Config {
        gateway: GatewayConfig {
            base_url: Url::parse(base_url).expect("test base url"),
            request_timeout_secs: 5,
        },
        storage: StorageConfig {
            session_file: "unused-session.json".into(),
        },
        telemetry: TelemetryConfig {
            otlp_endpoint: None,
            log_format: LogFormat::Text,
        },
    }
}

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn user_json() -> Value {
    json!({
        "id": 71,
        "email": EMAIL,
        "display_name": "Goldsmith",
        "user_type": "admin"
    })
}

fn unauthenticated() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "data": null,
            "message": "Unauthenticated.",
            "errors": null,
            "meta": null
        })),
    )
}

async fn login(State(state): State<Arc<GatewayState>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    if body["email"] == EMAIL && body["password"] == PASSWORD {
        let (access, refresh) = state.issue();
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "access_token": access,
                    "refresh_token": refresh,
                    "user": user_json()
                },
                "message": "Logged in",
                "errors": null,
                "meta": null
            })),
        )
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "success": false,
                "data": null,
                "message": "Invalid credentials",
                "errors": { "email": ["These credentials do not match our records."] },
                "meta": null
            })),
        )
    }
}

async fn refresh(State(state): State<Arc<GatewayState>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }

    if state.refresh_rejects.load(Ordering::SeqCst) {
        return (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "data": null,
                "message": "Refresh token revoked",
                "errors": null,
                "meta": null
            })),
        );
    }

    match state.consume_refresh(body["refresh_token"].as_str()) {
        Some((access, refresh)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "access_token": access, "refresh_token": refresh },
                "message": "Tokens rotated",
                "errors": null,
                "meta": null
            })),
        ),
        None => unauthenticated(),
    }
}

async fn me(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if state.me_always_unauthorized.load(Ordering::SeqCst) {
        return unauthenticated();
    }

    let presented = bearer_of(&headers);
    if presented.is_some() && presented == state.access() {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": user_json(),
                "message": null,
                "errors": null,
                "meta": null
            })),
        )
    } else {
        unauthenticated()
    }
}

async fn logout(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let presented = bearer_of(&headers);
    if presented.is_some() && presented == state.access() {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": null,
                "message": "Logged out",
                "errors": null,
                "meta": null
            })),
        )
    } else {
        unauthenticated()
    }
}
