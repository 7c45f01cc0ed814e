use crate::api::gateway::{ApiRequest, Gateway};
use crate::api::schemas::auth::{AuthPayload, LoginRequest, UserSchema};
use crate::domain::user::UserProfile;
use crate::error::Result;
use crate::services::session_service::SessionService;
use std::sync::Arc;

/// Authentication calls the storefront and the back-office make around the
/// session coordinator.
#[derive(Clone, Debug)]
pub struct AccountService {
    gateway: Arc<Gateway>,
    session: SessionService,
}

impl AccountService {
    pub const fn new(gateway: Arc<Gateway>, session: SessionService) -> Self {
        Self { gateway, session }
    }

    /// Exchanges credentials for a token pair and establishes the session.
    ///
    /// # Errors
    /// `Rejected` with the backend's message and field errors when the
    /// credentials are refused; `Transport`/`Malformed` as usual.
    #[tracing::instrument(
        skip(self, email, password),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let request = ApiRequest::post("/auth/login").json(&LoginRequest { email, password })?;
        let payload: AuthPayload = self.gateway.execute(request).await?;

        let user = map_user(payload.user);
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        self.session
            .login(payload.access_token, payload.refresh_token, user.clone())
            .await;

        tracing::info!("logged in");
        Ok(user)
    }

    /// Best-effort server-side revocation, then local clear. Idempotent and
    /// infallible: a failed revocation still ends the local session.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(token) = self.session.access_token() {
            let request = ApiRequest::post("/auth/logout").bearer(token);
            if let Err(e) = self.gateway.execute_empty(request).await {
                tracing::debug!(error = %e, "server-side logout failed, clearing locally anyway");
            }
        }
        self.session.logout().await;
    }

    /// Fetches the profile of the authenticated user. Does not touch the
    /// session snapshot.
    ///
    /// # Errors
    /// `Unauthenticated` when no session survives the refresh-and-replay
    /// path.
    #[tracing::instrument(skip(self), err(level = "warn"))]
    pub async fn me(&self) -> Result<UserProfile> {
        let request = ApiRequest::get("/auth/me").bearer_opt(self.session.access_token());
        let user: UserSchema = self.gateway.execute(request).await?;
        Ok(map_user(user))
    }
}

fn map_user(user: UserSchema) -> UserProfile {
    UserProfile {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        user_type: user.user_type,
    }
}
