use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An outbound SMS asking a tutor to take on one or more requests.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequestSms {
    pub id: i64,
    pub tutor_id: i64,
    /// International format, e.g. `27821234567`.
    pub mobile_number: String,
    /// Provider message id of the outbound SMS.
    pub message_id: String,
    pub delivery_status: String,
    pub created_at: DateTime<Utc>,
    pub response_text: Option<String>,
    /// Localized to the reference timezone.
    pub response_timestamp: Option<DateTime<FixedOffset>>,
    pub response_message_id: Option<String>,
}

impl RequestSms {
    pub fn is_answered(&self) -> bool {
        self.response_text.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRequestSms {
    pub tutor_id: i64,
    pub mobile_number: String,
    pub message_id: String,
}

/// Row of the `request_sms_requests` association joined with the request code.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RequestSmsLink {
    pub request_sms_id: i64,
    pub request_id: i64,
    pub code: String,
}
