use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use convo_services::membership::{CallableRequest, RemoveMemberRequest};
use serde_json::Value;

use crate::{error::ApiError, extractors::auth::Caller, state::AppState};

/// Callable `delete_conversation`: removes the caller from a conversation.
///
/// Body is `{"data": {"conversationId": "..."}}`; the reply is
/// `{"result": {"success": true}}` or an `{"error": ...}` envelope.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Caller(auth): Caller,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::InvalidArgument(e.body_text()))?;

    let data = match body.get("data") {
        Some(data) if data.is_object() => serde_json::from_value(data.clone())
            .map_err(|e| ApiError::InvalidArgument(format!("Invalid request data: {e}")))?,
        _ => RemoveMemberRequest::default(),
    };

    let response = state
        .membership
        .remove_member(CallableRequest { data, auth })
        .await?;

    Ok(Json(serde_json::json!({ "result": response })))
}
