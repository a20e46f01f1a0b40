use axum::Json;

use super::MessageResponse;

/// GET / - API greeting
pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello in mine odin-book api"))
}
