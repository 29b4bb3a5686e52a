use axum::{extract::State, http::StatusCode, Form, Json};
use validator::Validate;

use crate::{
    dto::sms_dto::{SmsCallbackEnvelope, SmsReplyForm, SmsReplyResponse, SmsStatusForm},
    error::Result,
    AppState,
};

/// Inbound SMS reply from the provider. Replies that answer nothing still get a 200.
pub async fn handle_reply_callback(
    State(state): State<AppState>,
    Form(form): Form<SmsReplyForm>,
) -> Result<(StatusCode, Json<SmsReplyResponse>)> {
    let envelope: SmsCallbackEnvelope = serde_json::from_str(&form.data)?;
    tracing::info!(
        mo_msg_id = %envelope.callback.mo_msg_id,
        from = %envelope.callback.from,
        "received SMS reply callback"
    );

    let outcome = state
        .reply_service
        .handle_callback(envelope.callback)
        .await?;

    Ok((
        StatusCode::OK,
        Json(SmsReplyResponse {
            updated: outcome.updated.len(),
            matched_codes: outcome.matched_codes,
            broadcast: outcome.broadcast,
        }),
    ))
}

pub async fn handle_status_callback(
    State(state): State<AppState>,
    Form(form): Form<SmsStatusForm>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    form.validate()?;
    let updated = state
        .dispatch_service
        .record_delivery_status(&form.api_msg_id, &form.status)
        .await?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "updated": updated })),
    ))
}
