use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tutor {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    /// As registered; converted to international format when an SMS is sent.
    pub mobile: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTutor {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub mobile: String,
    pub status: Option<String>,
    pub subject_ids: Vec<i64>,
}
