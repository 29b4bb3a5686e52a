use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::request_for_tutor::RequestForTutor;
use crate::utils::time::now;
use crate::utils::token::generate_request_code;

/// Fresh codes drawn before request creation gives up on collisions.
pub const MAX_CODE_ATTEMPTS: usize = 8;

#[derive(Clone)]
pub struct RequestService {
    pool: SqlitePool,
    code_length: usize,
}

impl RequestService {
    pub fn new(pool: SqlitePool, code_length: usize) -> Self {
        Self { pool, code_length }
    }

    /// Creates a request with a freshly generated code, redrawing on collision.
    pub async fn create(&self, pupil_id: i64, subject_id: i64) -> Result<RequestForTutor> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_request_code(self.code_length);
            match self.create_with_code(pupil_id, subject_id, &code).await {
                Err(Error::Conflict(_)) => {
                    tracing::debug!(attempt, code = %code, "request code collision, redrawing");
                }
                other => return other,
            }
        }

        Err(Error::Conflict(format!(
            "Could not generate a unique request code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    pub async fn create_with_code(
        &self,
        pupil_id: i64,
        subject_id: i64,
        code: &str,
    ) -> Result<RequestForTutor> {
        let request = sqlx::query_as::<_, RequestForTutor>(
            r#"
            INSERT INTO requests_for_tutor (pupil_id, subject_id, code, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(pupil_id)
        .bind(subject_id)
        .bind(code)
        .bind(now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::from)
        .map_err(|e| {
            if e.is_unique_violation() {
                Error::Conflict(format!("Request code {} is already in use", code))
            } else if e.is_foreign_key_violation() {
                Error::NotFound(format!("Pupil {} or subject {} not found", pupil_id, subject_id))
            } else {
                e
            }
        })?;

        tracing::info!(
            request_id = request.id,
            pupil_id,
            subject_id,
            code = %request.code,
            "request for tutor created"
        );
        Ok(request)
    }

    pub async fn get(&self, id: i64) -> Result<RequestForTutor> {
        sqlx::query_as::<_, RequestForTutor>("SELECT * FROM requests_for_tutor WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Request {} not found", id)))
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<RequestForTutor>> {
        let request = sqlx::query_as::<_, RequestForTutor>(
            "SELECT * FROM requests_for_tutor WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }
}
