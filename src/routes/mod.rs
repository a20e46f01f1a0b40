/**
 * Routes Module
 * API route handlers, one module per resource
 */
pub mod auth;
pub mod comments;
pub mod follows;
pub mod health;
pub mod index;
pub mod likes;
pub mod media;
pub mod posts;
pub mod profiles;
pub mod users;

use serde::{Deserialize, Serialize};

/// Plain `{"message": ...}` success body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
