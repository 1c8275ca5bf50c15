use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use contact_core::{
    create_app, AppState, MailSettings, MailSettingsSource, Mailer, OutgoingMail, RateLimiter,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, _settings: &MailSettings, mail: OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().push(mail);
        Ok(())
    }
}

struct BrokenMailer;

#[async_trait]
impl Mailer for BrokenMailer {
    async fn send(&self, _settings: &MailSettings, _mail: OutgoingMail) -> anyhow::Result<()> {
        anyhow::bail!("connection refused by smtp.example.com:587")
    }
}

struct Unconfigured;

impl MailSettingsSource for Unconfigured {
    fn load(&self) -> contact_core::Result<MailSettings> {
        MailSettings::from_lookup(|_| None)
    }
}

fn mail_settings() -> MailSettings {
    MailSettings {
        host: "smtp.example.com".to_string(),
        port: 587,
        user: "mailer@example.com".to_string(),
        password: "secret".to_string(),
        to: "owner@example.com".to_string(),
        from: "site@example.com".to_string(),
    }
}

fn setup_app(mailer: Arc<dyn Mailer>, max_requests: u32) -> Router {
    let state = AppState::default()
        .with_rate_limiter(RateLimiter::with_limits(max_requests, Duration::from_secs(60)))
        .with_mailer(mailer)
        .with_mail_settings(Arc::new(mail_settings()));

    create_app(state)
}

fn contact_request(ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn valid_body() -> Value {
    json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "message": "Hello!\nLet's talk."
    })
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_successful_submission() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 5);

    let response = app
        .oneshot(contact_request("203.0.113.1", valid_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-ratelimit-limit"], "5");
    assert_eq!(headers["x-ratelimit-remaining"], "4");
    assert_eq!(headers["x-ratelimit-reset"], "60");
    assert_eq!(read_json(response).await, json!({ "ok": true }));

    let sent = mailer.sent.lock();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reply_to, "ada@example.com");
    assert_eq!(sent[0].subject, "New contact form submission from Ada Lovelace");
    assert!(sent[0].html.contains("Hello!<br/>Let&#039;s talk."));
    assert!(sent[0].text.ends_with("Hello!\nLet's talk."));
}

#[tokio::test]
async fn test_missing_name_returns_400_without_dispatch() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 5);

    let body = json!({ "name": "", "email": "a@b.com", "message": "hi" });
    let response = app.oneshot(contact_request("203.0.113.2", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await, json!({ "error": "Missing required fields" }));
    assert!(mailer.sent.lock().is_empty());
}

#[tokio::test]
async fn test_malformed_body_returns_400() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 5);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await, json!({ "error": "Invalid request body" }));
    assert!(mailer.sent.lock().is_empty());
}

#[tokio::test]
async fn test_array_body_returns_400_without_dispatch() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 5);

    let body = json!(["Ada", "ada@example.com", "hi"]);
    let response = app.oneshot(contact_request("203.0.113.3", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await, json!({ "error": "Invalid request body" }));
    assert!(mailer.sent.lock().is_empty());
}

#[tokio::test]
async fn test_rate_limit_after_max_requests() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 3);

    for expected_remaining in ["2", "1", "0"] {
        let response = app
            .clone()
            .oneshot(contact_request("198.51.100.7", valid_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
    }

    let response = app
        .clone()
        .oneshot(contact_request("198.51.100.7", valid_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(
        read_json(response).await,
        json!({ "error": "Too many requests. Please try again later." })
    );

    assert_eq!(mailer.sent.lock().len(), 3);
}

#[tokio::test]
async fn test_rate_limited_before_body_is_read() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 1);

    let first = app
        .clone()
        .oneshot(contact_request("198.51.100.8", json!({})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header("x-forwarded-for", "198.51.100.8")
        .body(Body::from("{not json"))
        .unwrap();
    let second = app.oneshot(request).await.unwrap();

    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_identities_do_not_share_counters() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 1);

    let first = app
        .clone()
        .oneshot(contact_request("192.0.2.1", valid_body()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let limited = app
        .clone()
        .oneshot(contact_request("192.0.2.1", valid_body()))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app
        .oneshot(contact_request("192.0.2.2", valid_body()))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_script_is_escaped_in_markup() {
    let mailer = Arc::new(RecordingMailer::default());
    let app = setup_app(mailer.clone(), 5);

    let body = json!({
        "name": "Mallory",
        "email": "mallory@example.com",
        "message": "<script>alert('x')</script>"
    });
    let response = app.oneshot(contact_request("192.0.2.9", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = mailer.sent.lock();
    assert!(sent[0].html.contains("&lt;script&gt;"));
    assert!(!sent[0].html.contains("<script>"));
}

#[tokio::test]
async fn test_unconfigured_transport_returns_500() {
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::default()
        .with_mailer(mailer.clone())
        .with_mail_settings(Arc::new(Unconfigured));
    let app = create_app(state);

    let response = app
        .oneshot(contact_request("192.0.2.20", valid_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(response).await,
        json!({ "error": "SMTP environment variables are not configured" })
    );
    assert!(mailer.sent.lock().is_empty());
}

#[tokio::test]
async fn test_dispatch_failure_returns_generic_500() {
    let app = setup_app(Arc::new(BrokenMailer), 5);

    let response = app
        .oneshot(contact_request("192.0.2.30", valid_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(read_json(response).await, json!({ "error": "Failed to send message" }));
}

#[tokio::test]
async fn test_health_reports_tracked_identities() {
    let app = setup_app(Arc::new(RecordingMailer::default()), 5);

    app.clone()
        .oneshot(contact_request("192.0.2.40", valid_body()))
        .await
        .unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tracked_identities"], 1);
}
