#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use tutor_matchmaker::{
    config::{Config, DEFAULT_REFERENCE_TIMEZONE},
    database::pool::{create_memory_pool, create_pool, run_migrations},
    models::{
        pupil::{NewPupil, Pupil},
        request_for_tutor::RequestForTutor,
        request_sms::{NewRequestSms, RequestSms},
        subject::Subject,
        tutor::{NewTutor, Tutor},
    },
    routes, AppState,
};

pub const TUTOR_MOBILE: &str = "0821234567";
pub const TUTOR_MOBILE_INTERNATIONAL: &str = "27821234567";

pub struct Fixture {
    pub state: AppState,
    pub pool: SqlitePool,
    pub subjects: Vec<Subject>,
    pub pupil: Pupil,
    pub tutor: Tutor,
}

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: "sqlite::memory:".into(),
        database_max_connections: 1,
        reply_window_hours: 48,
        reference_timezone: DEFAULT_REFERENCE_TIMEZONE,
        request_code_length: 5,
        clickatell_api_url: "http://127.0.0.1:9/messages".into(),
        clickatell_api_key: None,
    }
}

/// Four subjects, one pupil needing all of them and one tutor teaching all of them.
pub async fn setup() -> Fixture {
    let pool = create_memory_pool().await.expect("memory pool");
    setup_with_pool(pool).await
}

/// WAL database file under `dir` with several connections, so transactions can overlap.
pub async fn file_pool(dir: &TempDir) -> SqlitePool {
    let mut config = test_config();
    config.database_url = format!("sqlite://{}", dir.path().join("matchmaker.db").display());
    config.database_max_connections = 8;
    let pool = create_pool(&config).await.expect("file pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}

pub async fn setup_with_pool(pool: SqlitePool) -> Fixture {
    let state = AppState::new(pool.clone(), &test_config()).expect("app state");

    let mut subjects = Vec::new();
    for name in ["Mathematics", "Physical Science", "English", "Accounting"] {
        subjects.push(
            state
                .match_service
                .create_subject(name)
                .await
                .expect("create subject"),
        );
    }
    let subject_ids: Vec<i64> = subjects.iter().map(|s| s.id).collect();

    let pupil = state
        .match_service
        .create_pupil(NewPupil {
            name: "Thandi".into(),
            surname: "Nkosi".into(),
            email: "thandi@example.com".into(),
            contact_number: Some("0119876543".into()),
            subject_ids: subject_ids.clone(),
        })
        .await
        .expect("create pupil");

    let tutor = state
        .match_service
        .create_tutor(NewTutor {
            name: "Name".into(),
            surname: "Surname".into(),
            email: "name@example.com".into(),
            mobile: TUTOR_MOBILE.into(),
            status: Some("Accepted".into()),
            subject_ids,
        })
        .await
        .expect("create tutor");

    Fixture {
        state,
        pool,
        subjects,
        pupil,
        tutor,
    }
}

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

/// Records an outbound SMS to the fixture tutor covering one new request with `code`.
pub async fn dispatch_with_code(
    fx: &Fixture,
    subject_id: i64,
    code: &str,
    message_id: &str,
) -> (RequestSms, RequestForTutor) {
    let request = fx
        .state
        .request_service
        .create_with_code(fx.pupil.id, subject_id, code)
        .await
        .expect("create request");
    let sms = fx
        .state
        .dispatch_service
        .create(NewRequestSms {
            tutor_id: fx.tutor.id,
            mobile_number: fx.tutor.mobile.clone(),
            message_id: message_id.into(),
        })
        .await
        .expect("create request sms");
    fx.state
        .dispatch_service
        .link_requests(sms.id, &[request.id])
        .await
        .expect("link request");
    (sms, request)
}

pub async fn reset_response(pool: &SqlitePool, request_sms_id: i64) {
    sqlx::query(
        "UPDATE request_sms SET response_text = NULL, response_timestamp = NULL, response_message_id = NULL WHERE id = ?",
    )
    .bind(request_sms_id)
    .execute(pool)
    .await
    .expect("reset response");
}

pub async fn set_created_at(pool: &SqlitePool, request_sms_id: i64, created_at: DateTime<Utc>) {
    sqlx::query("UPDATE request_sms SET created_at = ? WHERE id = ?")
        .bind(created_at)
        .bind(request_sms_id)
        .execute(pool)
        .await
        .expect("set created_at");
}

pub fn callback_payload(from: &str, text: &str, timestamp: &str) -> JsonValue {
    json!({
        "callback": {
            "moMsgId": "123456",
            "timestamp": timestamp,
            "to": "279995631564",
            "from": from,
            "text": text,
            "api_id": "3478778",
            "charset": "ISO-8859-1",
            "udh": "",
        }
    })
}

pub fn form_encode(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

pub async fn post_form(app: &Router, uri: &str, body: String) -> Response {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn post_reply(app: &Router, payload: &JsonValue) -> Response {
    let data = payload.to_string();
    post_form(app, "/sms/reply-callback", form_encode(&[("data", &data)])).await
}

pub async fn post_json(app: &Router, uri: &str, body: JsonValue) -> Response {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn get_request(app: &Router, uri: &str) -> Response {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn json_body(resp: Response) -> (StatusCode, JsonValue) {
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, body)
}
