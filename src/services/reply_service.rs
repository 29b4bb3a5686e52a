use std::collections::HashSet;

use chrono::{DateTime, Duration, FixedOffset};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use validator::Validate;

use crate::database::retry::retry_on_contention;
use crate::dto::sms_dto::SmsCallback;
use crate::error::Result;
use crate::models::request_sms::RequestSmsLink;
use crate::services::dispatch_service::{links_for, outstanding_for_number, record_response};
use crate::utils::phone::convert_to_international_format;
use crate::utils::time::{now, parse_and_localize};

/// An inbound SMS reply, already normalized.
#[derive(Debug, Clone)]
pub struct InboundReply {
    /// Sender in international format.
    pub from: String,
    pub text: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message_id: Option<String>,
}

/// Which outstanding dispatches a reply answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub request_sms_ids: Vec<i64>,
    /// Codes found in the reply, in order of first appearance.
    pub matched_codes: Vec<String>,
    /// No code matched, so every candidate is answered.
    pub broadcast: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationOutcome {
    pub candidates: usize,
    pub updated: Vec<i64>,
    pub matched_codes: Vec<String>,
    pub broadcast: bool,
}

/// Whitespace-delimited tokens of a reply, deduplicated, in order of first appearance.
pub fn extract_tokens(text: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|token| seen.insert(*token))
        .collect()
}

/// Picks the dispatches a reply answers.
///
/// `candidates` are the outstanding dispatch ids and `links` their associated request codes.
/// Dispatches linked to a code that appears verbatim in `text` are selected; when none
/// does, the reply is ambiguous and all candidates are selected.
pub fn select_targets(candidates: &[i64], links: &[RequestSmsLink], text: &str) -> Selection {
    let candidate_set: HashSet<i64> = candidates.iter().copied().collect();
    let known_codes: HashSet<&str> = links
        .iter()
        .filter(|link| candidate_set.contains(&link.request_sms_id))
        .map(|link| link.code.as_str())
        .collect();

    let matched_codes: Vec<String> = extract_tokens(text)
        .into_iter()
        .filter(|token| known_codes.contains(token))
        .map(str::to_string)
        .collect();

    if matched_codes.is_empty() {
        return Selection {
            request_sms_ids: candidates.to_vec(),
            matched_codes,
            broadcast: true,
        };
    }

    let matched: HashSet<&str> = matched_codes.iter().map(String::as_str).collect();
    let hit: HashSet<i64> = links
        .iter()
        .filter(|link| matched.contains(link.code.as_str()))
        .map(|link| link.request_sms_id)
        .collect();

    Selection {
        request_sms_ids: candidates
            .iter()
            .copied()
            .filter(|id| hit.contains(id))
            .collect(),
        matched_codes,
        broadcast: false,
    }
}

/// Correlates inbound SMS replies with the request SMSes they answer.
#[derive(Clone)]
pub struct ReplyService {
    pool: SqlitePool,
    window: Duration,
    timezone: Tz,
}

impl ReplyService {
    pub fn new(pool: SqlitePool, window_hours: i64, timezone: Tz) -> Self {
        Self {
            pool,
            window: Duration::hours(window_hours),
            timezone,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Validates and normalizes a provider callback, then records it.
    ///
    /// Nothing is written when the payload or its timestamp is invalid.
    pub async fn handle_callback(&self, callback: SmsCallback) -> Result<CorrelationOutcome> {
        callback.validate()?;
        let timestamp = parse_and_localize(&callback.timestamp, self.timezone)?;

        let reply = InboundReply {
            from: convert_to_international_format(&callback.from),
            text: callback.text,
            timestamp,
            message_id: Some(callback.mo_msg_id).filter(|id| !id.is_empty()),
        };

        self.correlate(&reply).await
    }

    pub async fn correlate(&self, reply: &InboundReply) -> Result<CorrelationOutcome> {
        retry_on_contention("sms reply correlation", || self.correlate_once(reply)).await
    }

    async fn correlate_once(&self, reply: &InboundReply) -> Result<CorrelationOutcome> {
        let since = now() - self.window;
        let mut tx = self.pool.begin().await?;

        let candidates = outstanding_for_number(&mut *tx, &reply.from, since).await?;
        if candidates.is_empty() {
            tx.commit().await?;
            tracing::info!(from = %reply.from, "no outstanding request SMS for reply");
            return Ok(CorrelationOutcome::default());
        }

        let candidate_ids: Vec<i64> = candidates.iter().map(|sms| sms.id).collect();
        let links = links_for(&mut *tx, &candidate_ids).await?;
        let selection = select_targets(&candidate_ids, &links, &reply.text);

        let mut updated = Vec::with_capacity(selection.request_sms_ids.len());
        for id in &selection.request_sms_ids {
            let changed = record_response(
                &mut *tx,
                *id,
                &reply.text,
                reply.timestamp,
                reply.message_id.as_deref(),
            )
            .await?;
            if changed {
                updated.push(*id);
            }
        }
        tx.commit().await?;

        tracing::info!(
            from = %reply.from,
            candidates = candidate_ids.len(),
            updated = ?updated,
            matched_codes = ?selection.matched_codes,
            broadcast = selection.broadcast,
            "sms reply correlated"
        );

        Ok(CorrelationOutcome {
            candidates: candidate_ids.len(),
            updated,
            matched_codes: selection.matched_codes,
            broadcast: selection.broadcast,
        })
    }
}
