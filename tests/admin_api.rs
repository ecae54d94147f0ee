//! The admin API through the HTTP server and client.

mod common;

use reqwest::StatusCode;
use cmsadmin::auth::PasswdAuth;
use cmsadmin::cli::AdminClient;
use cmsadmin::commons::audit::{AuditEventType, AuditOutcome};
use cmsadmin::daemon::admin::{
    AdminRequest, AdminResponse, AdminStatus, AuthAdmin, HIDDEN_VALUE,
    JobsAdmin,
};
use cmsadmin::jobs::HeartbeatJob;
use common::{ADMIN_TOKEN, TestDaemon};

fn request(op: &str, scope: &str, id: Option<&str>) -> AdminRequest {
    let request = AdminRequest::new()
        .with(AdminRequest::OP_TYPE, op)
        .with(AdminRequest::OP_SCOPE, scope);
    match id {
        Some(id) => request.with(AdminRequest::RS_ID, id),
        None => request,
    }
}

#[tokio::test]
async fn health_needs_no_token() {
    let daemon = TestDaemon::start().await;
    let client = AdminClient::new(daemon.uri.clone(), None).unwrap();
    client.health().await.unwrap();

    let res = reqwest::Client::new()
        .post(daemon.uri.join("health").unwrap())
        .send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn passwd_scenario_over_http() {
    let daemon = TestDaemon::start().await;
    let client = AdminClient::new(
        daemon.uri.clone(), Some(ADMIN_TOKEN.into())
    ).unwrap();
    let path = AuthAdmin::PATH;

    let res = client.admin(
        path,
        &request("OP_ADD", "impl", Some("pwd"))
            .with(AdminRequest::CLASS, PasswdAuth::CLASS)
    ).await.unwrap();
    assert_eq!(res.status, AdminStatus::Success);

    let hash = PasswdAuth::hash_password(
        "pass", &hex::decode("0a1b2c3d").unwrap()
    ).unwrap();
    let res = client.admin(
        path,
        &request("OP_ADD", "instance", Some("inst1"))
            .with(AdminRequest::IMPL_NAME, "pwd")
            .with("host", "ldap1")
            .with("salt", "0a1b2c3d")
            .with("user_joe", hash.as_str())
    ).await.unwrap();
    assert_eq!(res.status, AdminStatus::Success);

    let res = client.admin(
        path, &request("OP_READ", "instance", Some("inst1"))
    ).await.unwrap();
    assert_eq!(res.pairs.get("implName"), Some("pwd"));
    assert_eq!(res.pairs.get("host"), Some("ldap1"));
    assert_eq!(res.pairs.get("salt"), Some(HIDDEN_VALUE));
    assert_eq!(res.pairs.get("user_joe"), Some(HIDDEN_VALUE));
    assert!(res.pairs.iter().all(|pair| pair.value != hash));

    let res = client.admin(
        path,
        &request("OP_PROCESS", "instance", Some("inst1"))
            .with("uid", "joe").with("pwd", "pass")
    ).await.unwrap();
    assert_eq!(res.status, AdminStatus::Success);
    assert_eq!(res.pairs.get("subject"), Some("joe"));

    let res = client.admin(
        path, &request("OP_DELETE", "impl", Some("pwd"))
    ).await.unwrap();
    assert_eq!(res.status, AdminStatus::Error);
    assert!(res.error.unwrap().contains("inst1"));

    let res = client.admin(
        path, &request("OP_DELETE", "instance", Some("inst1"))
    ).await.unwrap();
    assert_eq!(res.status, AdminStatus::Success);
    let res = client.admin(
        path, &request("OP_DELETE", "impl", Some("pwd"))
    ).await.unwrap();
    assert_eq!(res.status, AdminStatus::Success);

    assert!(daemon.auths.plugins().is_empty());
    let events = daemon.audit.events();
    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|event| event.subject == "admin"));
    assert_eq!(events[2].event_type, AuditEventType::AuthProcess);
    assert_eq!(events[3].outcome, AuditOutcome::Failure);
}

#[tokio::test]
async fn jobs_over_http() {
    let daemon = TestDaemon::start().await;
    let client = AdminClient::new(
        daemon.uri.clone(), Some(ADMIN_TOKEN.into())
    ).unwrap();
    let path = JobsAdmin::PATH;

    client.admin(
        path,
        &request("OP_ADD", "impl", Some("beat"))
            .with(AdminRequest::CLASS, HeartbeatJob::CLASS)
    ).await.unwrap();
    client.admin(
        path,
        &request("OP_ADD", "instance", Some("job1"))
            .with(AdminRequest::IMPL_NAME, "beat")
    ).await.unwrap();

    let res = client.admin(
        path, &request("OP_PROCESS", "instance", Some("job1"))
    ).await.unwrap();
    assert_eq!(res.pairs.get("result"), Some("alive (#1)"));

    let res = client.admin(
        path,
        &request("OP_MODIFY", "settings", None)
            .with("enabled", "true").with("interval", "5")
    ).await.unwrap();
    assert_eq!(res.status, AdminStatus::Success);
    let settings = daemon.jobs.settings().unwrap();
    assert!(settings.enabled);
    assert_eq!(settings.interval, 5);
}

#[tokio::test]
async fn errors_have_status_codes() {
    let daemon = TestDaemon::start().await;
    let http = reqwest::Client::new();
    let uri = daemon.uri.join("admin/auths").unwrap();
    let form = [("OP_TYPE", "OP_SEARCH"), ("OP_SCOPE", "impl")];

    // No token.
    let res = http.post(uri.clone()).form(&form).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers().get("www-authenticate").unwrap(), "Bearer");

    // Wrong tokens.
    for token in ["wrong", "secre", "secret2"] {
        let res = http.post(uri.clone()).bearer_auth(token)
            .form(&form).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    // Wrong method.
    let res = http.get(uri.clone()).bearer_auth(ADMIN_TOKEN)
        .send().await.unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    // Unknown path.
    let res = http.post(daemon.uri.join("admin/other").unwrap())
        .bearer_auth(ADMIN_TOKEN).form(&form).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Unknown instance.
    let res = http.post(uri.clone()).bearer_auth(ADMIN_TOKEN)
        .form(&[
            ("OP_TYPE", "OP_READ"), ("OP_SCOPE", "instance"),
            ("RS_ID", "nope"),
        ]).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: AdminResponse = res.json().await.unwrap();
    assert_eq!(body.status, AdminStatus::Error);

    // Missing parameter.
    let res = http.post(uri.clone()).bearer_auth(ADMIN_TOKEN)
        .form(&[("OP_TYPE", "OP_ADD"), ("OP_SCOPE", "impl")])
        .send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Success.
    let res = http.post(uri).bearer_auth(ADMIN_TOKEN)
        .form(&form).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: AdminResponse = res.json().await.unwrap();
    assert_eq!(body.status, AdminStatus::Success);
    assert!(body.pairs.is_empty());
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let daemon = TestDaemon::start_with_limit(Some(64)).await;
    let res = reqwest::Client::new()
        .post(daemon.uri.join("admin/jobs").unwrap())
        .bearer_auth(ADMIN_TOKEN)
        .form(&[
            ("OP_TYPE", "OP_SEARCH"), ("OP_SCOPE", "impl"),
            ("padding", "x".repeat(200).as_str()),
        ])
        .send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(daemon.audit.events().is_empty());
}

#[tokio::test]
async fn oversized_chunked_body_is_refused() {
    let daemon = TestDaemon::start_with_limit(Some(64)).await;
    let chunks: Vec<Result<_, std::io::Error>> = vec![
        Ok(bytes::Bytes::from("OP_TYPE=OP_SEARCH&OP_SCOPE=impl")),
        Ok(bytes::Bytes::from(format!("&padding={}", "x".repeat(200)))),
    ];
    let res = reqwest::Client::new()
        .post(daemon.uri.join("admin/jobs").unwrap())
        .bearer_auth(ADMIN_TOKEN)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(reqwest::Body::wrap_stream(futures_util::stream::iter(chunks)))
        .send().await.unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(daemon.audit.events().is_empty());

    // A small chunked body is fine.
    let chunks: Vec<Result<_, std::io::Error>> = vec![
        Ok(bytes::Bytes::from("OP_TYPE=OP_SEARCH")),
        Ok(bytes::Bytes::from("&OP_SCOPE=impl")),
    ];
    let res = reqwest::Client::new()
        .post(daemon.uri.join("admin/jobs").unwrap())
        .bearer_auth(ADMIN_TOKEN)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(reqwest::Body::wrap_stream(futures_util::stream::iter(chunks)))
        .send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
