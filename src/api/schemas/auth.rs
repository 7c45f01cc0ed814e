use crate::domain::user::UserType;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// `data` payload of `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct TokenPairSchema {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UserSchema {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub user_type: UserType,
}

/// `data` payload of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct AuthPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSchema,
}
