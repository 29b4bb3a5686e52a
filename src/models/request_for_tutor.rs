use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A pupil's request for a tutor in one subject, identified in SMS replies by `code`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequestForTutor {
    pub id: i64,
    pub pupil_id: i64,
    pub subject_id: i64,
    pub code: String,
    pub created_at: DateTime<Utc>,
}
