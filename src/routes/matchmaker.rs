use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    dto::matchmaker_dto::{
        ConfirmRequestPayload, CreateRequestPayload, SendRequestSmsPayload,
        SendRequestSmsResponse,
    },
    error::Result,
    models::{
        pupil_tutor_match::PupilTutorMatch, request_for_tutor::RequestForTutor, subject::Subject,
    },
    utils::time::now,
    AppState,
};

pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequestPayload>,
) -> Result<(StatusCode, Json<RequestForTutor>)> {
    state.match_service.get_pupil(payload.pupil_id).await?;
    let request = state
        .request_service
        .create(payload.pupil_id, payload.subject_id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn send_request_sms(
    State(state): State<AppState>,
    Path(tutor_id): Path<i64>,
    Json(payload): Json<SendRequestSmsPayload>,
) -> Result<(StatusCode, Json<SendRequestSmsResponse>)> {
    payload.validate()?;
    let (dispatch, requests) = state
        .dispatch_service
        .send_request_sms(&state.sms_gateway, tutor_id, &payload.request_ids)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SendRequestSmsResponse { dispatch, requests }),
    ))
}

pub async fn confirm_request(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
    Json(payload): Json<ConfirmRequestPayload>,
) -> Result<(StatusCode, Json<PupilTutorMatch>)> {
    let start_date = payload.start_date.unwrap_or_else(|| {
        now()
            .with_timezone(&state.reply_service.timezone())
            .date_naive()
    });
    let created = state
        .match_service
        .confirm_request(request_id, payload.tutor_id, start_date)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn unmatched_subjects(
    State(state): State<AppState>,
    Path(pupil_id): Path<i64>,
) -> Result<Json<Vec<Subject>>> {
    state.match_service.get_pupil(pupil_id).await?;
    let subjects = state.match_service.unmatched_subjects(pupil_id).await?;
    Ok(Json(subjects))
}
