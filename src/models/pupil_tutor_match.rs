use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PupilTutorMatch {
    pub id: i64,
    pub pupil_id: i64,
    pub tutor_id: i64,
    pub subject_id: i64,
    pub start_date: NaiveDate,
}
