//! Integration tests for the login and logout flows.

mod common;

use std::time::{Duration, Instant};

use common::{
    harness, harness_for_url, token_for_role, token_with_payload, unreachable_config,
    RecordingNavigator,
};
use reqwest::StatusCode;
use serde_json::json;
use superfit_core::api::{BearerAuth, ReqwestTransport};
use superfit_core::auth::{logout, Destination, LoginError, LoginFlow, LoginState};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn login_flow(h: &common::Harness) -> LoginFlow<BearerAuth<ReqwestTransport>> {
    LoginFlow::new(h.api.clone(), h.session.tokens(), h.config.redirect_delay())
}

async fn mount_login(server: &MockServer, response: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_redirects_aluno_to_dashboard() {
    let server = MockServer::start().await;
    let token = token_for_role("ROLE_ALUNO");

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"email": "a@b.com", "password": "secret1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let flow = login_flow(&h);
    let navigator = RecordingNavigator::default();

    let destination = flow.login("a@b.com", "secret1", &navigator).await.unwrap();

    assert_eq!(destination, Destination::AlunoDashboard);
    assert_eq!(navigator.paths(), vec!["/aluno/dashboard"]);
    assert_eq!(h.session.token(), Some(token));
    assert_eq!(flow.state(), LoginState::Success(Destination::AlunoDashboard));
    assert_eq!(flow.state().message(), Some("Login successful! Redirecting..."));
}

#[tokio::test]
async fn test_login_routes_every_role() {
    let cases = [
        ("ROLE_ADMIN", "/admin/dashboard"),
        ("ROLE_GESTOR", "/gestor/dashboard"),
        ("ROLE_PROFESSOR", "/professor/dashboard"),
        ("ROLE_ALUNO", "/aluno/dashboard"),
        ("ROLE_VISITANTE", "/home"),
    ];

    for (role, expected) in cases {
        let server = MockServer::start().await;
        let body = json!({ "token": token_for_role(role) });
        mount_login(&server, ResponseTemplate::new(200).set_body_json(body), 1).await;

        let h = harness(&server);
        let navigator = RecordingNavigator::default();
        login_flow(&h).login("a@b.com", "secret1", &navigator).await.unwrap();

        assert_eq!(navigator.paths(), vec![expected], "role {role}");
    }
}

#[tokio::test]
async fn test_token_without_role_goes_home() {
    let server = MockServer::start().await;
    let body = json!({ "token": token_with_payload(r#"{"sub":"a@b.com"}"#) });
    mount_login(&server, ResponseTemplate::new(200).set_body_json(body), 1).await;

    let h = harness(&server);
    let navigator = RecordingNavigator::default();
    let destination = login_flow(&h).login("a@b.com", "secret1", &navigator).await.unwrap();

    assert_eq!(destination, Destination::Home);
    assert_eq!(navigator.paths(), vec!["/home"]);
}

#[tokio::test]
async fn test_redirect_waits_for_delay() {
    let server = MockServer::start().await;
    let body = json!({ "token": token_for_role("ROLE_GESTOR") });
    mount_login(&server, ResponseTemplate::new(200).set_body_json(body), 2).await;

    let h = harness(&server);
    let flow = LoginFlow::new(h.api.clone(), h.session.tokens(), Duration::from_millis(80));
    let navigator = RecordingNavigator::default();

    let redirect = flow.submit("a@b.com", "secret1").await.unwrap();
    assert_eq!(redirect.delay, Duration::from_millis(80));
    assert_eq!(redirect.url.path(), "/gestor/dashboard");
    // submit alone never navigates
    assert!(navigator.paths().is_empty());

    let started = Instant::now();
    flow.login("a@b.com", "secret1", &navigator).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test]
async fn test_empty_password_makes_no_request() {
    let server = MockServer::start().await;
    mount_login(&server, ResponseTemplate::new(200), 0).await;

    let h = harness(&server);
    let flow = login_flow(&h);
    let navigator = RecordingNavigator::default();

    let err = flow.login("a@b.com", "", &navigator).await.unwrap_err();
    assert!(matches!(err, LoginError::Validation));
    assert_eq!(flow.state().message(), Some("Email and password are required."));

    let err = flow.login("   ", "secret1", &navigator).await.unwrap_err();
    assert!(matches!(err, LoginError::Validation));

    let err = flow.login("a@b.com", "  \t", &navigator).await.unwrap_err();
    assert!(matches!(err, LoginError::Validation));

    assert!(navigator.paths().is_empty());
    assert_eq!(h.session.token(), None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_login_keeps_previous_credential() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        1,
    )
    .await;

    let h = harness(&server);
    h.session.tokens().store("previous.credential.value");
    let flow = login_flow(&h);
    let navigator = RecordingNavigator::default();

    let err = flow.login("a@b.com", "wrong", &navigator).await.unwrap_err();

    assert!(matches!(
        err,
        LoginError::Rejected { status: StatusCode::UNAUTHORIZED, .. }
    ));
    assert_eq!(h.session.token().as_deref(), Some("previous.credential.value"));
    assert!(navigator.paths().is_empty());

    let state = flow.state();
    assert!(state.is_editable());
    assert_eq!(
        state.message(),
        Some("Login failed. Status: 401 - check your email and password.")
    );
}

#[tokio::test]
async fn test_rejected_login_is_not_retried() {
    let server = MockServer::start().await;
    mount_login(&server, ResponseTemplate::new(429), 1).await;

    let h = harness(&server);
    let err = login_flow(&h).submit("a@b.com", "secret1").await.unwrap_err();

    assert!(matches!(
        err,
        LoginError::Rejected { status: StatusCode::TOO_MANY_REQUESTS, .. }
    ));
}

#[tokio::test]
async fn test_form_usable_again_after_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "wrong"})))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "a@b.com", "password": "secret1"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": token_for_role("ROLE_ADMIN") })),
        )
        .mount(&server)
        .await;

    let h = harness(&server);
    let flow = login_flow(&h);

    assert!(flow.submit("a@b.com", "wrong").await.is_err());
    assert!(!flow.is_submitting());

    let redirect = flow.submit("a@b.com", "secret1").await.unwrap();
    assert_eq!(redirect.destination, Destination::AdminDashboard);
}

#[tokio::test]
async fn test_malformed_token_payload_is_surfaced() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"token": "header.%%%not-base64%%%.sig"})),
        1,
    )
    .await;

    let h = harness(&server);
    let flow = login_flow(&h);
    let navigator = RecordingNavigator::default();

    let err = flow.login("a@b.com", "secret1", &navigator).await.unwrap_err();

    assert!(matches!(err, LoginError::MalformedToken(_)));
    assert!(navigator.paths().is_empty(), "must not fall through to a redirect");
    assert_eq!(h.session.token(), None, "undecodable token must not be stored");
    assert!(matches!(flow.state(), LoginState::Failure(_)));
}

#[tokio::test]
async fn test_payload_that_is_not_json_is_surfaced() {
    let server = MockServer::start().await;
    let token = token_with_payload("this is not json");
    mount_login(&server, ResponseTemplate::new(200).set_body_json(json!({ "token": token })), 1).await;

    let h = harness(&server);
    let navigator = RecordingNavigator::default();
    let err = login_flow(&h).login("a@b.com", "secret1", &navigator).await.unwrap_err();

    assert!(matches!(err, LoginError::MalformedToken(_)));
    assert!(navigator.paths().is_empty());
}

#[tokio::test]
async fn test_success_body_without_token_is_connectivity_failure() {
    let server = MockServer::start().await;
    mount_login(&server, ResponseTemplate::new(200).set_body_string("<html>oops</html>"), 1).await;

    let h = harness(&server);
    let flow = login_flow(&h);
    let err = flow.submit("a@b.com", "secret1").await.unwrap_err();

    assert!(matches!(err, LoginError::Connectivity(_)));
    assert_eq!(flow.state().message(), Some("Could not reach the server."));
    assert_eq!(h.session.token(), None);
}

#[tokio::test]
async fn test_unreachable_server_is_connectivity_failure() {
    let h = harness_for_url(unreachable_config());
    let flow = login_flow(&h);
    let navigator = RecordingNavigator::default();

    let err = flow.login("a@b.com", "secret1", &navigator).await.unwrap_err();

    assert!(matches!(err, LoginError::Connectivity(_)));
    assert_eq!(err.user_message(), "Could not reach the server.");
    assert!(navigator.paths().is_empty());
    assert!(!flow.is_submitting());
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_ignored() {
    let server = MockServer::start().await;
    mount_login(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "token": token_for_role("ROLE_PROFESSOR") }))
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let h = harness(&server);
    let flow = login_flow(&h);

    let (first, second) = tokio::join!(
        flow.submit("a@b.com", "secret1"),
        flow.submit("a@b.com", "secret1")
    );

    // Whichever submit started first wins; the other is turned away
    let (won, lost) = if first.is_ok() { (first, second) } else { (second, first) };
    assert_eq!(won.unwrap().destination, Destination::ProfessorDashboard);
    assert!(matches!(lost, Err(LoginError::AlreadySubmitting)));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(!flow.is_submitting());
}

#[tokio::test]
async fn test_new_login_overwrites_stored_credential() {
    let server = MockServer::start().await;
    let token = token_for_role("ROLE_GESTOR");
    mount_login(&server, ResponseTemplate::new(200).set_body_json(json!({ "token": token })), 1).await;

    let h = harness(&server);
    h.session.tokens().store("old.token.value");

    login_flow(&h).submit("a@b.com", "secret1").await.unwrap();

    assert_eq!(h.session.token(), Some(token));
}

#[tokio::test]
async fn test_token_with_trailing_newline_is_stored_trimmed() {
    let server = MockServer::start().await;
    let token = token_for_role("ROLE_ALUNO");
    let body = json!({ "token": format!("{token}\n") });
    mount_login(&server, ResponseTemplate::new(200).set_body_json(body), 2).await;
    Mock::given(method("GET"))
        .and(path("/api/alunos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let flow = login_flow(&h);

    let redirect = flow.submit("a@b.com", "secret1").await.unwrap();
    assert_eq!(redirect.destination, Destination::AlunoDashboard);
    assert_eq!(h.session.token(), Some(token.clone()));

    let _: serde_json::Value = h.api.get_json("/api/alunos").await.unwrap();
    flow.submit("a@b.com", "secret1").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let expected = format!("Bearer {token}");
    assert_eq!(
        requests[1].headers.get("authorization").unwrap().to_str().unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_logout_clears_credential_and_goes_home() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    h.session.tokens().store(&token_for_role("ROLE_ALUNO"));
    let navigator = RecordingNavigator::default();

    logout(h.api.as_ref(), &h.session, &navigator).await;

    assert_eq!(h.session.token(), None);
    assert_eq!(navigator.paths(), vec!["/home"]);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_logout_clears_credential_when_server_is_down() {
    let h = harness_for_url(unreachable_config());
    h.session.tokens().store("h.p.s");
    let navigator = RecordingNavigator::default();

    logout(h.api.as_ref(), &h.session, &navigator).await;

    assert_eq!(h.session.token(), None);
    assert_eq!(navigator.paths(), vec!["/home"]);
}

#[tokio::test]
async fn test_logout_without_credential_still_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    assert_eq!(h.session.token(), None);
    let navigator = RecordingNavigator::default();

    logout(h.api.as_ref(), &h.session, &navigator).await;

    assert_eq!(navigator.paths(), vec!["/home"]);
}
