use serde::{Deserialize, Serialize};

/// The `{status, message, data}` envelope every card operation resolves to,
/// consumable directly by an HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardResponse {
    pub status: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl CardResponse {
    pub fn new(status: u16, message: &str, data: serde_json::Value) -> Self {
        Self {
            status,
            message: message.to_string(),
            data,
        }
    }

    pub fn ok(message: &str, data: serde_json::Value) -> Self {
        Self::new(200, message, data)
    }

    pub fn created(message: &str, data: serde_json::Value) -> Self {
        Self::new(201, message, data)
    }
}
