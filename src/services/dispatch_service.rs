use chrono::{DateTime, FixedOffset, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::error::{Error, Result};
use crate::models::request_for_tutor::RequestForTutor;
use crate::models::request_sms::{NewRequestSms, RequestSms, RequestSmsLink};
use crate::services::sms_gateway::SmsSender;
use crate::utils::phone::convert_to_international_format;
use crate::utils::time::now;

/// Records of outbound request SMSes and the requests each one covers.
#[derive(Clone)]
pub struct DispatchService {
    pool: SqlitePool,
}

impl DispatchService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewRequestSms) -> Result<RequestSms> {
        let mut conn = self.pool.acquire().await?;
        insert_dispatch(&mut *conn, &new).await
    }

    pub async fn get(&self, id: i64) -> Result<RequestSms> {
        sqlx::query_as::<_, RequestSms>("SELECT * FROM request_sms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Request SMS {} not found", id)))
    }

    pub async fn link_requests(&self, request_sms_id: i64, request_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        link(&mut *tx, request_sms_id, request_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn requests_for(&self, request_sms_id: i64) -> Result<Vec<RequestForTutor>> {
        let requests = sqlx::query_as::<_, RequestForTutor>(
            r#"
            SELECT r.* FROM requests_for_tutor r
            JOIN request_sms_requests l ON l.request_id = r.id
            WHERE l.request_sms_id = ?
            ORDER BY r.id
            "#,
        )
        .bind(request_sms_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn outstanding_for_number(
        &self,
        mobile_number: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RequestSms>> {
        let mut conn = self.pool.acquire().await?;
        outstanding_for_number(&mut *conn, mobile_number, since).await
    }

    pub async fn record_response(
        &self,
        request_sms_id: i64,
        text: &str,
        timestamp: DateTime<FixedOffset>,
        message_id: Option<&str>,
    ) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        record_response(&mut *conn, request_sms_id, text, timestamp, message_id).await
    }

    /// Stores the provider's delivery report. Returns how many dispatches carried `message_id`.
    pub async fn record_delivery_status(&self, message_id: &str, status_code: &str) -> Result<u64> {
        let status = delivery_status_label(status_code);
        let result = sqlx::query("UPDATE request_sms SET delivery_status = ? WHERE message_id = ?")
            .bind(status)
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(message_id, status_code, "delivery status for unknown message");
        } else {
            tracing::info!(message_id, status, "delivery status recorded");
        }
        Ok(result.rows_affected())
    }

    /// Texts the tutor about the given requests and records the dispatch with its links.
    pub async fn send_request_sms<S: SmsSender>(
        &self,
        sender: &S,
        tutor_id: i64,
        request_ids: &[i64],
    ) -> Result<(RequestSms, Vec<RequestForTutor>)> {
        let mut request_ids = request_ids.to_vec();
        request_ids.sort_unstable();
        request_ids.dedup();
        if request_ids.is_empty() {
            return Err(Error::BadRequest("At least one request is required".into()));
        }

        let mobile: String = sqlx::query_scalar("SELECT mobile FROM tutors WHERE id = ?")
            .bind(tutor_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Tutor {} not found", tutor_id)))?;
        let mobile_number = convert_to_international_format(&mobile);

        let lines = request_lines(&self.pool, &request_ids).await?;
        if lines.len() != request_ids.len() {
            return Err(Error::NotFound(format!(
                "Some of the requests {:?} do not exist",
                request_ids
            )));
        }
        let text = compose_request_text(
            &lines
                .iter()
                .map(|(_, subject, code)| (subject.as_str(), code.as_str()))
                .collect::<Vec<_>>(),
        );

        let message_id = sender.send(&mobile_number, &text).await?;

        let mut tx = self.pool.begin().await?;
        let dispatch = insert_dispatch(
            &mut *tx,
            &NewRequestSms {
                tutor_id,
                mobile_number,
                message_id,
            },
        )
        .await?;
        let ids: Vec<i64> = lines.iter().map(|(id, _, _)| *id).collect();
        link(&mut *tx, dispatch.id, &ids).await?;
        tx.commit().await?;

        let requests = self.requests_for(dispatch.id).await?;
        Ok((dispatch, requests))
    }
}

async fn insert_dispatch(conn: &mut SqliteConnection, new: &NewRequestSms) -> Result<RequestSms> {
    let dispatch = sqlx::query_as::<_, RequestSms>(
        r#"
        INSERT INTO request_sms (tutor_id, mobile_number, message_id, delivery_status, created_at)
        VALUES (?, ?, ?, 'unknown', ?)
        RETURNING *
        "#,
    )
    .bind(new.tutor_id)
    .bind(convert_to_international_format(&new.mobile_number))
    .bind(&new.message_id)
    .bind(now())
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        request_sms_id = dispatch.id,
        tutor_id = dispatch.tutor_id,
        mobile_number = %dispatch.mobile_number,
        message_id = %dispatch.message_id,
        "request SMS recorded"
    );
    Ok(dispatch)
}

async fn link(conn: &mut SqliteConnection, request_sms_id: i64, request_ids: &[i64]) -> Result<()> {
    for request_id in request_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO request_sms_requests (request_sms_id, request_id) VALUES (?, ?)",
        )
        .bind(request_sms_id)
        .bind(request_id)
        .execute(&mut *conn)
        .await
        .map_err(Error::from)
        .map_err(|e| {
            if e.is_foreign_key_violation() {
                Error::NotFound(format!(
                    "Request SMS {} or request {} not found",
                    request_sms_id, request_id
                ))
            } else {
                e
            }
        })?;
    }
    Ok(())
}

/// Unanswered dispatches to `mobile_number` created at or after `since`, oldest first.
pub(crate) async fn outstanding_for_number(
    conn: &mut SqliteConnection,
    mobile_number: &str,
    since: DateTime<Utc>,
) -> Result<Vec<RequestSms>> {
    let rows = sqlx::query_as::<_, RequestSms>(
        r#"
        SELECT * FROM request_sms
        WHERE mobile_number = ?
          AND created_at >= ?
          AND response_text IS NULL
        ORDER BY created_at, id
        "#,
    )
    .bind(mobile_number)
    .bind(since)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub(crate) async fn links_for(
    conn: &mut SqliteConnection,
    request_sms_ids: &[i64],
) -> Result<Vec<RequestSmsLink>> {
    if request_sms_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT l.request_sms_id, l.request_id, r.code
        FROM request_sms_requests l
        JOIN requests_for_tutor r ON r.id = l.request_id
        WHERE l.request_sms_id IN ("#,
    );
    let mut separated = builder.separated(", ");
    for id in request_sms_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY l.request_sms_id, l.request_id");

    let links = builder
        .build_query_as::<RequestSmsLink>()
        .fetch_all(&mut *conn)
        .await?;
    Ok(links)
}

/// Sets the response only while none is recorded, so a dispatch is answered at most once.
pub(crate) async fn record_response(
    conn: &mut SqliteConnection,
    request_sms_id: i64,
    text: &str,
    timestamp: DateTime<FixedOffset>,
    message_id: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE request_sms
        SET response_text = ?, response_timestamp = ?, response_message_id = ?
        WHERE id = ? AND response_text IS NULL
        "#,
    )
    .bind(text)
    .bind(timestamp)
    .bind(message_id)
    .bind(request_sms_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

async fn request_lines(pool: &SqlitePool, request_ids: &[i64]) -> Result<Vec<(i64, String, String)>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT r.id, s.name, r.code
        FROM requests_for_tutor r
        JOIN subjects s ON s.id = r.subject_id
        WHERE r.id IN ("#,
    );
    let mut separated = builder.separated(", ");
    for id in request_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY r.id");

    let rows = builder
        .build_query_as::<(i64, String, String)>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Body of a request SMS: one `subject (code)` entry per request plus reply instructions.
pub fn compose_request_text(entries: &[(&str, &str)]) -> String {
    let listed = entries
        .iter()
        .map(|(subject, code)| format!("{} (code {})", subject, code))
        .collect::<Vec<_>>()
        .join(", ");
    let noun = if entries.len() == 1 { "request" } else { "requests" };
    format!(
        "New tutoring {}: {}. Reply with the code and YES to accept or NO to decline.",
        noun, listed
    )
}

/// Maps a Clickatell message status code to the label stored in `delivery_status`.
pub fn delivery_status_label(code: &str) -> &'static str {
    match code.trim() {
        "001" => "unknown",
        "002" => "queued",
        "003" => "gateway",
        "004" => "delivered",
        "005" => "error",
        "006" => "user_cancelled",
        "007" => "failed",
        "009" => "routing_error",
        "010" => "expired",
        "011" => "scheduled",
        "012" => "out_of_credit",
        "013" => "cancelled",
        "014" => "limit_exceeded",
        _ => "unknown",
    }
}
