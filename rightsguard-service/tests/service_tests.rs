use pretty_assertions::assert_eq;
use rightsguard_compliance::{AccessAttempt, Claims};
use rightsguard_deploy::platforms::MemoryStrategy;
use rightsguard_deploy::StrategyRegistry;
use rightsguard_license::{LicenseCodec, LicenseError, Restrictions};
use rightsguard_service::{Components, GuardConfig, IssueRequest, Rightsguard, ServiceError};
use rightsguard_types::{
    LicenseStatus, NoopRecorder, ResolutionStatus, Severity, ViolationDraft, ViolationKind,
};
use rightsguard_violations::{
    InboundEvent, LogResponder, MemoryBus, MemoryStore, PipelineError, RecordStore, Topic,
};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    service: Rightsguard,
    store: Arc<MemoryStore>,
    bus: Arc<MemoryBus>,
    alpha: Arc<MemoryStrategy>,
}

/// "alpha" always succeeds, "beta" always answers 503.
fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(MemoryBus::new());
    let alpha = Arc::new(MemoryStrategy::new("alpha"));
    let mut registry = StrategyRegistry::new();
    registry.register(alpha.clone());
    registry.register(Arc::new(MemoryStrategy::new("beta").failing_with_status(503)));

    let components = Components {
        codec: LicenseCodec::new(),
        store: store.clone(),
        bus: bus.clone(),
        registry,
        responder: Arc::new(LogResponder),
        recorder: Arc::new(NoopRecorder),
    };
    Fixture {
        service: Rightsguard::start(&GuardConfig::default(), components),
        store,
        bus,
        alpha,
    }
}

fn do_not_train(creator: &str) -> IssueRequest {
    IssueRequest::new("do-not-train", creator, creator.as_bytes().to_vec())
        .with_restrictions(Restrictions::new().with("ai_training", false))
}

// ── Issuing ──────────────────────────────────────────────────────

#[tokio::test]
async fn issue_stores_and_deploys() {
    let f = fixture();
    let issued = f
        .service
        .issue(do_not_train("Jane").deploy_to(["alpha", "beta"]))
        .await
        .unwrap();

    let license = &issued.license;
    assert!(f.service.codec().validate(license));
    assert_eq!(f.store.license(&license.digest).unwrap().as_ref(), Some(license));

    let report = issued.deployment.unwrap();
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.successful, 1);
    assert_eq!(report.summary.success_rate, 50.0);
    assert_eq!(report.successful[0].platform, "alpha");
    assert_eq!(report.failed[0].platform, "beta");
    assert!(f.alpha.published(&license.digest).await.is_some());

    f.service.shutdown().await;
}

#[tokio::test]
async fn issue_without_platforms_skips_deployment() {
    let f = fixture();
    let issued = f.service.issue(do_not_train("Jane")).await.unwrap();
    assert!(issued.deployment.is_none());
    assert_eq!(f.alpha.deployment_count().await, 0);
    f.service.shutdown().await;
}

#[tokio::test]
async fn issue_rejects_unknown_type() {
    let f = fixture();
    let err = f
        .service
        .issue(IssueRequest::new("public-domain", "Jane", b"x".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::License(LicenseError::UnsupportedType(ref t)) if t == "public-domain"
    ));
    assert!(f.store.licenses().unwrap().is_empty());
    f.service.shutdown().await;
}

#[tokio::test]
async fn retry_targets_only_retryable_failures() {
    let f = fixture();
    let issued = f
        .service
        .issue(do_not_train("Jane").deploy_to(["alpha", "beta", "nowhere"]))
        .await
        .unwrap();
    let report = issued.deployment.unwrap();
    assert_eq!(report.failed.len(), 2);

    let retried = f
        .service
        .retry_failed(&issued.license, &report, &Default::default())
        .await
        .unwrap();
    assert_eq!(retried.summary.total, 1);
    assert_eq!(retried.failed[0].platform, "beta");
    f.service.shutdown().await;
}

#[tokio::test]
async fn retry_is_skipped_when_nothing_is_retryable() {
    let f = fixture();
    let issued = f
        .service
        .issue(do_not_train("Jane").deploy_to(["alpha"]))
        .await
        .unwrap();
    let report = issued.deployment.unwrap();
    assert!(
        f.service
            .retry_failed(&issued.license, &report, &Default::default())
            .await
            .is_none()
    );
    f.service.shutdown().await;
}

// ── Access checks ────────────────────────────────────────────────

#[tokio::test]
async fn training_access_is_reported() {
    let f = fixture();
    let license = f.service.issue(do_not_train("Jane")).await.unwrap().license;

    let attempt = AccessAttempt::for_purpose("ai-training").on_platform("alpha");
    let result = f.service.check_access(&license.digest, &attempt).await.unwrap();
    assert!(!result.compliant);
    assert_eq!(result.violations, vec!["AI training not permitted".to_string()]);

    let violations = f.service.violations_for(&license.digest).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::UnauthorizedTraining);
    assert_eq!(f.service.compliance_log(&license.digest).unwrap().len(), 1);
    assert_eq!(f.bus.on(Topic::ImmediateResponse).await.len(), 1);
    f.service.shutdown().await;
}

#[tokio::test]
async fn research_access_is_compliant() {
    let f = fixture();
    let license = f.service.issue(do_not_train("Jane")).await.unwrap().license;

    let attempt = AccessAttempt::for_purpose("research");
    let result = f.service.check_access(&license.digest, &attempt).await.unwrap();
    assert!(result.compliant);
    assert!(f.service.violations_for(&license.digest).unwrap().is_empty());
    f.service.shutdown().await;
}

#[tokio::test]
async fn check_access_requires_a_stored_license() {
    let f = fixture();
    let err = f
        .service
        .check_access("deadbeef", &AccessAttempt::for_purpose("research"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Pipeline(PipelineError::LicenseNotFound(_))
    ));
    f.service.shutdown().await;
}

#[tokio::test]
async fn evaluating_a_tampered_copy_escalates_through_the_consumer() {
    let f = fixture();
    let license = f.service.issue(do_not_train("Jane")).await.unwrap().license;

    let mut tampered = license.clone();
    tampered.creator = "Mallory".to_string();
    let result = f
        .service
        .evaluate(&tampered, &AccessAttempt::for_purpose("research"));
    assert!(!result.compliant);
    assert_eq!(result.highest_severity(), Some(Severity::Critical));

    // Shutdown drains the queued escalation.
    f.service.shutdown().await;
    let violations = f.store.violations_for(&license.digest).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::IntegrityViolation);
    assert_eq!(violations[0].severity, Severity::Critical);
}

#[tokio::test]
async fn evaluate_does_not_log() {
    let f = fixture();
    let license = f.service.issue(do_not_train("Jane")).await.unwrap().license;
    let attempt = AccessAttempt::for_purpose("research").with_claims(Claims::default());
    assert!(f.service.evaluate(&license, &attempt).compliant);
    assert!(f.service.compliance_log(&license.digest).unwrap().is_empty());
    f.service.shutdown().await;
}

// ── Events and resolution ────────────────────────────────────────

#[tokio::test]
async fn submitted_events_are_processed_in_order() {
    let f = fixture();
    let license = f.service.issue(do_not_train("Jane")).await.unwrap().license;
    let draft = ViolationDraft::new(
        ViolationKind::Other("scraped_mirror".to_string()),
        &license.digest,
        "alpha",
        "crawler-audit",
    );
    let stored = f.service.report(draft).await.unwrap();
    assert_eq!(stored.status, ResolutionStatus::Open);

    for status in [ResolutionStatus::Investigating, ResolutionStatus::Resolved] {
        f.service
            .submit(InboundEvent::StatusChange {
                license_digest: license.digest.clone(),
                violation_id: stored.id,
                status,
            })
            .await
            .unwrap();
    }
    f.service.shutdown().await;

    let record = f.store.violation(stored.id).unwrap().unwrap();
    assert_eq!(record.status, ResolutionStatus::Resolved);
}

#[tokio::test]
async fn update_violation_enforces_transitions() {
    let f = fixture();
    let license = f.service.issue(do_not_train("Jane")).await.unwrap().license;
    let stored = f
        .service
        .report(ViolationDraft::new(
            ViolationKind::MissingAttribution,
            &license.digest,
            "alpha",
            "audit",
        ))
        .await
        .unwrap();

    f.service
        .update_violation(stored.id, ResolutionStatus::FalsePositive)
        .await
        .unwrap();
    let err = f
        .service
        .update_violation(stored.id, ResolutionStatus::Open)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Pipeline(PipelineError::InvalidTransition { .. })
    ));
    f.service.shutdown().await;
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn revoke_is_idempotent() {
    let f = fixture();
    let license = f.service.issue(do_not_train("Jane")).await.unwrap().license;

    let revoked = f.service.revoke(&license.digest).unwrap();
    assert_eq!(revoked.status, LicenseStatus::Revoked);
    assert!(f.service.codec().validate(&revoked));
    assert_eq!(
        f.store.license(&license.digest).unwrap().unwrap().status,
        LicenseStatus::Revoked
    );
    assert!(f.service.revoke(&license.digest).is_ok());
    f.service.shutdown().await;
}

#[tokio::test]
async fn revoke_unknown_license_fails() {
    let f = fixture();
    assert!(matches!(
        f.service.revoke("deadbeef"),
        Err(ServiceError::LicenseNotFound(_))
    ));
    f.service.shutdown().await;
}

#[tokio::test]
async fn monitor_cycle_covers_issued_licenses() {
    let f = fixture();
    f.service.issue(do_not_train("Jane")).await.unwrap();
    f.service.issue(do_not_train("Ravi")).await.unwrap();

    let summary = f.service.run_monitor_cycle().await.unwrap();
    assert_eq!(summary.licenses, 2);
    assert_eq!(summary.tampered, 0);
    assert_eq!(f.bus.on(Topic::PlatformMonitoring).await.len(), 1);
    f.service.shutdown().await;
}

#[tokio::test]
async fn monitor_starts_once_and_stops_on_shutdown() {
    let mut f = fixture();
    assert!(!f.service.monitor_running());
    f.service.start_monitor();
    f.service.start_monitor();
    assert!(f.service.monitor_running());
    f.service.shutdown().await;
}

// ── From configuration ───────────────────────────────────────────

#[tokio::test]
async fn configured_service_pushes_critical_violations_to_the_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .and(body_partial_json(serde_json::json!({"event": "violation.detected"})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let config = GuardConfig::from_toml_str(&format!(
        "[response]\nwebhook_url = \"{}/alerts\"\n\n[platforms]\nmemory = [\"local\"]\n",
        server.uri()
    ))
    .unwrap();
    let service = Rightsguard::from_config(&config).unwrap();
    assert_eq!(service.platforms(), vec!["local".to_string()]);

    let issued = service
        .issue(do_not_train("Jane").deploy_to(["local"]))
        .await
        .unwrap();
    assert_eq!(issued.deployment.unwrap().summary.successful, 1);

    let attempt = AccessAttempt::for_purpose("machine-learning");
    let result = service
        .check_access(&issued.license.digest, &attempt)
        .await
        .unwrap();
    assert!(!result.compliant);

    // A low-severity report must not reach the webhook.
    service
        .report(ViolationDraft::new(
            ViolationKind::MissingAttribution,
            &issued.license.digest,
            "local",
            "audit",
        ))
        .await
        .unwrap();

    service.shutdown().await;
}
