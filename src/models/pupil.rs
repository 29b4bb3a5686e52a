use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pupil {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPupil {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub contact_number: Option<String>,
    pub subject_ids: Vec<i64>,
}
