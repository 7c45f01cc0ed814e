use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Rejected by API: {message}")]
    Rejected {
        status: u16,
        message: String,
        errors: HashMap<String, Vec<String>>,
    },
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
