use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::request_for_tutor::RequestForTutor;
use crate::models::request_sms::RequestSms;

#[derive(Debug, Deserialize)]
pub struct CreateRequestPayload {
    pub pupil_id: i64,
    pub subject_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendRequestSmsPayload {
    #[validate(length(min = 1))]
    pub request_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct SendRequestSmsResponse {
    pub dispatch: RequestSms,
    pub requests: Vec<RequestForTutor>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequestPayload {
    pub tutor_id: i64,
    pub start_date: Option<NaiveDate>,
}
