//! Inbound SMS webhook
//!
//! The provider posts `from` and `message` as a form. The serial in the
//! message is classified, audited and answered asynchronously; the HTTP
//! response only reports the status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use svs_common::audit::AuditEntry;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::AppState;

/// Body returned when a required form field is absent or blank
pub const MISSING_FIELDS_MESSAGE: &str = "Missing 'from' or 'message' in request.";

#[derive(Debug, Deserialize)]
pub struct ProcessForm {
    from: Option<String>,
    message: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /v1/:token/process
pub async fn process_message(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Form(form): Form<ProcessForm>,
) -> Result<Response, ApiError> {
    if state.callback_token.is_empty() || token != *state.callback_token {
        return Err(ApiError::NotFound("no such webhook".to_string()));
    }

    let (Some(sender), Some(message)) = (non_blank(form.from), non_blank(form.message)) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": MISSING_FIELDS_MESSAGE })),
        )
            .into_response());
    };

    let verdict = state.classifier.classify(&message);
    info!(
        sender = %sender,
        status = ?verdict.status,
        detail = %verdict.detail,
        "Processed inbound message"
    );

    let entry = AuditEntry::from_verdict(&sender, &message, &verdict);
    if let Err(e) = state.store.append_audit(&entry).await {
        error!(sender = %sender, error = %e, "Failed to record audit entry");
    }

    let reply = verdict.reply_text();
    let notifier = state.notifier.clone();
    let recipient = sender.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&recipient, &reply).await {
            warn!(recipient = %recipient, error = %e, "Reply not delivered");
        }
    });

    Ok(Json(json!({
        "message": "processed",
        "status": verdict.status,
    }))
    .into_response())
}
