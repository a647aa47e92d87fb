use rightsguard_deploy::platforms::{WebhookConfig, WebhookStrategy};
use rightsguard_deploy::{
    DeployError, DeployOptions, DeploymentOutcome, DeploymentStrategy, ErrorClass,
};
use rightsguard_license::{License, LicenseCodec, Restrictions};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn license() -> License {
    LicenseCodec::new()
        .generate("nda-enforcement", "Studio", b"screener.mp4", Restrictions::new(), None)
        .unwrap()
}

fn strategy(server: &MockServer) -> WebhookStrategy {
    let mut config = WebhookConfig::new("cms", format!("{}/licenses", server.uri()));
    config.auth_token = Some("secret".into());
    config.headers.insert("X-Tenant".into(), "acme".into());
    WebhookStrategy::new(config).unwrap()
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn endpoint_is_required() {
    let err = WebhookStrategy::new(WebhookConfig::default()).err().unwrap();
    assert!(matches!(err, DeployError::Config(_)));
}

// ── Deploy ──────────────────────────────────────────────────────

#[tokio::test]
async fn posts_license_with_artifacts_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/licenses"))
        .and(header("authorization", "Bearer secret"))
        .and(header("x-tenant", "acme"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"location": "https://cms/licenses/1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let lic = license();
    let outcome = strategy(&server)
        .deploy(&lic, &DeployOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.location.as_deref(), Some("https://cms/licenses/1"));

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body["event"], "license.published");
    assert_eq!(body["license"]["digest"], lic.digest);
    assert_eq!(body["artifacts"].as_array().unwrap().len(), 4);
    assert_eq!(body["headers"]["X-Content-License"], "nda-enforcement");
}

#[tokio::test]
async fn empty_response_body_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let outcome = strategy(&server)
        .deploy(&license(), &DeployOptions::default())
        .await
        .unwrap();
    assert!(outcome.is_deployed());
    assert!(outcome.location.is_none());
}

#[tokio::test]
async fn rejected_post_is_an_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = strategy(&server)
        .deploy(&license(), &DeployOptions::default())
        .await
        .unwrap_err();
    assert_eq!(rightsguard_deploy::classify(&err), ErrorClass::Retryable);
}

// ── Verify ──────────────────────────────────────────────────────

#[tokio::test]
async fn verify_compares_published_digest() {
    let server = MockServer::start().await;
    let lic = license();
    Mock::given(method("GET"))
        .and(path(format!("/licenses/{}", lic.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"license": {"digest": lic.digest}})))
        .mount(&server)
        .await;

    let outcome = DeploymentOutcome::deployed("cms", vec![]);
    assert!(strategy(&server).verify(&lic, &outcome).await.unwrap().verified);
}

#[tokio::test]
async fn verify_url_template_is_expanded() {
    let server = MockServer::start().await;
    let lic = license();
    Mock::given(method("GET"))
        .and(path(format!("/by-digest/{}", lic.digest)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"digest": "something-else"})))
        .mount(&server)
        .await;

    let mut config = WebhookConfig::new("cms", format!("{}/licenses", server.uri()));
    config.verify_url = Some(format!("{}/by-digest/{{digest}}", server.uri()));
    let strategy = WebhookStrategy::new(config).unwrap();

    let outcome = DeploymentOutcome::deployed("cms", vec![]);
    let result = strategy.verify(&lic, &outcome).await.unwrap();
    assert!(!result.verified);
    assert!(result.detail.unwrap().contains("does not match"));
}
