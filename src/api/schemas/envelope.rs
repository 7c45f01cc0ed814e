use serde::Deserialize;
use std::collections::HashMap;

/// Uniform response envelope returned by every gateway endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

/// Pagination block attached to list responses.
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}
