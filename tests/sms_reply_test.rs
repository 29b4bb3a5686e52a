mod common;

use axum::http::StatusCode;
use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Africa::Johannesburg;

use common::*;
use tutor_matchmaker::utils::time::{now, parse_provider_timestamp, PROVIDER_TIMESTAMP_FORMAT};

fn current_timestamp() -> String {
    now()
        .with_timezone(&Johannesburg)
        .format(PROVIDER_TIMESTAMP_FORMAT)
        .to_string()
}

#[tokio::test]
async fn reply_records_text_and_localized_timestamp() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (sms, _) = dispatch_with_code(&fx, fx.subjects[0].id, "QX7PL", "CLICK-123456").await;
    assert_eq!(sms.mobile_number, TUTOR_MOBILE_INTERNATIONAL);

    let timestamp = current_timestamp();
    let payload = callback_payload(TUTOR_MOBILE_INTERNATIONAL, "Hereisthe messagetext", &timestamp);
    let (status, body) = json_body(post_reply(&app, &payload).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);
    assert_eq!(body["broadcast"], true);

    let sms = fx.state.dispatch_service.get(sms.id).await.unwrap();
    assert_eq!(sms.response_text.as_deref(), Some("Hereisthe messagetext"));
    assert_eq!(sms.response_message_id.as_deref(), Some("123456"));
    let expected = Johannesburg
        .from_local_datetime(&parse_provider_timestamp(&timestamp).unwrap())
        .single()
        .unwrap();
    assert_eq!(sms.response_timestamp, Some(expected.fixed_offset()));
    assert_eq!(sms.response_timestamp.unwrap().offset().local_minus_utc(), 2 * 3600);
}

#[tokio::test]
async fn codes_disambiguate_between_outstanding_sms() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (d1, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;
    let (d2, _) = dispatch_with_code(&fx, fx.subjects[1].id, "CD34", "CLICK-2").await;
    let timestamp = current_timestamp();

    // one code: only its SMS is answered
    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "AB12", &timestamp)).await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);
    assert_eq!(body["matched_codes"], serde_json::json!(["AB12"]));
    let s1 = fx.state.dispatch_service.get(d1.id).await.unwrap();
    let s2 = fx.state.dispatch_service.get(d2.id).await.unwrap();
    assert_eq!(s1.response_text.as_deref(), Some("AB12"));
    assert_eq!(s2.response_text, None);
    assert_eq!(s2.response_timestamp, None);

    reset_response(&fx.pool, d1.id).await;

    // both codes: both answered with the same text and timestamp
    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "AB12 CD34", &timestamp)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let s1 = fx.state.dispatch_service.get(d1.id).await.unwrap();
    let s2 = fx.state.dispatch_service.get(d2.id).await.unwrap();
    assert_eq!(s1.response_text.as_deref(), Some("AB12 CD34"));
    assert_eq!(s2.response_text.as_deref(), Some("AB12 CD34"));
    assert_eq!(s1.response_timestamp, s2.response_timestamp);

    reset_response(&fx.pool, d1.id).await;
    reset_response(&fx.pool, d2.id).await;

    // no code: broadcast to every outstanding SMS
    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "hello world", &timestamp)).await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);
    assert_eq!(body["broadcast"], true);
    let s1 = fx.state.dispatch_service.get(d1.id).await.unwrap();
    let s2 = fx.state.dispatch_service.get(d2.id).await.unwrap();
    assert_eq!(s1.response_text.as_deref(), Some("hello world"));
    assert_eq!(s2.response_text.as_deref(), Some("hello world"));
}

#[tokio::test]
async fn answered_sms_is_never_overwritten() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (d1, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;
    let (d2, _) = dispatch_with_code(&fx, fx.subjects[1].id, "CD34", "CLICK-2").await;
    let timestamp = current_timestamp();

    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "CD34 YES", &timestamp)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // no code now: only the still-unanswered SMS takes the reply
    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "Hereisthe messagetext", &timestamp)).await;
    let (_, body) = json_body(resp).await;
    assert_eq!(body["updated"], 1);
    let s1 = fx.state.dispatch_service.get(d1.id).await.unwrap();
    let s2 = fx.state.dispatch_service.get(d2.id).await.unwrap();
    assert_eq!(s1.response_text.as_deref(), Some("Hereisthe messagetext"));
    assert_eq!(s2.response_text.as_deref(), Some("CD34 YES"));

    // everything answered: further replies change nothing
    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "AB12 CD34 again", &timestamp)).await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);
    let s1 = fx.state.dispatch_service.get(d1.id).await.unwrap();
    let s2 = fx.state.dispatch_service.get(d2.id).await.unwrap();
    assert_eq!(s1.response_text.as_deref(), Some("Hereisthe messagetext"));
    assert_eq!(s2.response_text.as_deref(), Some("CD34 YES"));
}

#[tokio::test]
async fn code_of_answered_sms_does_not_disambiguate() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (d1, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;
    let (d2, _) = dispatch_with_code(&fx, fx.subjects[1].id, "CD34", "CLICK-2").await;
    let timestamp = current_timestamp();
    post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "CD34", &timestamp)).await;

    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "CD34 NO", &timestamp)).await;
    let (_, body) = json_body(resp).await;
    assert_eq!(body["broadcast"], true);
    let s1 = fx.state.dispatch_service.get(d1.id).await.unwrap();
    let s2 = fx.state.dispatch_service.get(d2.id).await.unwrap();
    assert_eq!(s1.response_text.as_deref(), Some("CD34 NO"));
    assert_eq!(s2.response_text.as_deref(), Some("CD34"));
}

#[tokio::test]
async fn sms_older_than_window_is_ignored() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (old, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;
    let (recent, _) = dispatch_with_code(&fx, fx.subjects[1].id, "CD34", "CLICK-2").await;
    set_created_at(&fx.pool, old.id, Utc::now() - Duration::hours(49)).await;
    set_created_at(&fx.pool, recent.id, Utc::now() - Duration::hours(47)).await;

    let outstanding = fx
        .state
        .dispatch_service
        .outstanding_for_number(TUTOR_MOBILE_INTERNATIONAL, Utc::now() - Duration::hours(48))
        .await
        .unwrap();
    assert_eq!(outstanding.iter().map(|s| s.id).collect::<Vec<_>>(), vec![recent.id]);

    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "AB12", &current_timestamp())).await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let old = fx.state.dispatch_service.get(old.id).await.unwrap();
    let recent = fx.state.dispatch_service.get(recent.id).await.unwrap();
    assert_eq!(old.response_text, None);
    assert_eq!(recent.response_text.as_deref(), Some("AB12"));
}

#[tokio::test]
async fn local_format_sender_is_normalized() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (sms, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;

    let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE, "YES", &current_timestamp())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let sms = fx.state.dispatch_service.get(sms.id).await.unwrap();
    assert_eq!(sms.response_text.as_deref(), Some("YES"));
}

#[tokio::test]
async fn unknown_sender_is_a_successful_noop() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (sms, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;

    let resp = post_reply(&app, &callback_payload("27830000000", "AB12", &current_timestamp())).await;
    let (status, body) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);
    let sms = fx.state.dispatch_service.get(sms.id).await.unwrap();
    assert_eq!(sms.response_text, None);
}

#[tokio::test]
async fn malformed_payloads_are_rejected_without_changes() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (sms, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;

    let resp = post_form(&app, "/sms/reply-callback", form_encode(&[("data", "not json")])).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut missing_text = callback_payload(TUTOR_MOBILE_INTERNATIONAL, "AB12", &current_timestamp());
    missing_text["callback"]
        .as_object_mut()
        .unwrap()
        .remove("text");
    let resp = post_reply(&app, &missing_text).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post_form(&app, "/sms/reply-callback", form_encode(&[("other", "x")])).await;
    assert!(resp.status().is_client_error());

    let resp = post_reply(&app, &callback_payload("", "AB12", &current_timestamp())).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let sms = fx.state.dispatch_service.get(sms.id).await.unwrap();
    assert_eq!(sms.response_text, None);
}

#[tokio::test]
async fn unparseable_timestamp_records_nothing() {
    let fx = setup().await;
    let app = app(fx.state.clone());
    let (sms, _) = dispatch_with_code(&fx, fx.subjects[0].id, "AB12", "CLICK-1").await;

    for bad in ["2015-04-09114:30:00", "2015-04-09T14:30:00", "yesterday"] {
        let resp = post_reply(&app, &callback_payload(TUTOR_MOBILE_INTERNATIONAL, "AB12", bad)).await;
        let (status, body) = json_body(resp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "timestamp {:?}", bad);
        assert!(body["error"].as_str().unwrap().contains("Invalid timestamp"));
    }

    let sms = fx.state.dispatch_service.get(sms.id).await.unwrap();
    assert_eq!(sms.response_text, None);
    assert_eq!(sms.response_timestamp, None);
}
