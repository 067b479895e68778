use axum::{
    Json,
    extract::{Path, State},
};
use convo_services::trigger::TriggerOutcome;
use serde_json::Value;

use crate::{error::ApiError, state::AppState};

/// Delivery point for `conversations/{conversationId}` write events raised
/// by an external dispatcher.
pub async fn conversation_written(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.empty_conversations.sweep(&conversation_id).await?;

    let (deleted, documents) = match outcome {
        TriggerOutcome::Skipped => (false, 0),
        TriggerOutcome::Deleted(report) => (true, report.documents_deleted),
    };

    Ok(Json(serde_json::json!({
        "deleted": deleted,
        "documents": documents,
    })))
}
