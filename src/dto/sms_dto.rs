use serde::{Deserialize, Serialize};
use validator::Validate;

/// Form body of the reply callback; `data` carries a JSON-encoded [`SmsCallbackEnvelope`].
#[derive(Debug, Deserialize)]
pub struct SmsReplyForm {
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsCallbackEnvelope {
    pub callback: SmsCallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SmsCallback {
    #[serde(rename = "moMsgId")]
    pub mo_msg_id: String,
    #[validate(length(min = 1))]
    pub timestamp: String,
    pub to: String,
    #[validate(length(min = 1, max = 20))]
    pub from: String,
    pub text: String,
    pub api_id: String,
    pub charset: String,
    pub udh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmsReplyResponse {
    pub updated: usize,
    pub matched_codes: Vec<String>,
    pub broadcast: bool,
}

/// Delivery status callback posted by the provider for outbound messages.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SmsStatusForm {
    #[serde(rename = "apiMsgId")]
    #[validate(length(min = 1))]
    pub api_msg_id: String,
    #[validate(length(min = 1))]
    pub status: String,
    pub timestamp: Option<String>,
}
