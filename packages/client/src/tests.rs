//! End-to-end flows across the client pages and the gateway.

use std::sync::Arc;

use api::{AppState, TokenKeys};
use chrono::NaiveDate;
use store::MemoryStore;
use tokio::net::TcpListener;

use crate::{
    AuthEvent, ClientError, Dashboard, FlowStep, GatewayClient, LoadOutcome, OtpFlow, Route,
    SessionObserver, SignupForm,
};

async fn spawn_gateway(store: MemoryStore) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(Arc::new(store), TokenKeys::new("scenario-secret", 3600));
    tokio::spawn(api::serve(listener, state, std::future::pending()));
    format!("http://{addr}")
}

fn anonymous_observer() -> SessionObserver {
    let observer = SessionObserver::new();
    observer.apply(AuthEvent::InitialSession(None));
    observer
}

#[tokio::test]
async fn test_signup_with_otp_lands_on_dashboard() {
    let store = MemoryStore::new();
    let observer = anonymous_observer();
    assert_eq!(observer.redirect(Route::Dashboard), Some(Route::SignIn));

    let mut flow = OtpFlow::signup(Arc::new(store.clone()), observer.clone());
    flow.send_signup_code(&SignupForm::new("A", "2000-01-01", "a@x.com"))
        .await
        .unwrap();
    assert_eq!(flow.step(), FlowStep::OtpSent);
    assert_eq!(flow.message(), Some("OTP sent to your email."));

    let code = store.last_otp("a@x.com").unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    let signed_in = flow.verify(&code).await.unwrap();
    assert_eq!(flow.message(), Some("Signup successful! Redirecting..."));

    let users = store.users();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, signed_in.session.user.id);
    assert_eq!(users[0].name, "A");
    assert_eq!(users[0].email, "a@x.com");
    assert_eq!(users[0].dob, NaiveDate::from_ymd_opt(2000, 1, 1));

    assert_eq!(observer.redirect(Route::SignUp), Some(Route::Dashboard));
    assert_eq!(observer.redirect(Route::Dashboard), None);

    let mut page = Dashboard::new(Arc::new(store.clone()), observer.clone());
    assert_eq!(page.load().await.unwrap(), LoadOutcome::Ready);
    assert_eq!(page.user().map(|u| u.name.as_str()), Some("A"));
    assert!(page.notes().is_empty());
}

#[tokio::test]
async fn test_notes_through_gateway_are_private() {
    let store = MemoryStore::new();

    let mut sessions = Vec::new();
    for email in ["u@x.com", "u2@x.com"] {
        let observer = anonymous_observer();
        let mut flow = OtpFlow::login(Arc::new(store.clone()), observer);
        flow.send_login_code(email).await.unwrap();
        let code = store.last_otp(email).unwrap();
        sessions.push(flow.verify(&code).await.unwrap().session);
    }
    let base = spawn_gateway(store.clone()).await;

    let mut u = GatewayClient::new(&base).unwrap();
    u.login(&sessions[0].access_token).await.unwrap();
    let mut u2 = GatewayClient::new(&base).unwrap();
    u2.login(&sessions[1].access_token).await.unwrap();

    let note = u.create_note("buy milk").await.unwrap();
    assert_eq!(note.content, "buy milk");
    assert_eq!(note.user_id, sessions[0].user.id);

    assert_eq!(u.list_notes().await.unwrap(), vec![note.clone()]);
    assert!(u2.list_notes().await.unwrap().is_empty());

    // Someone else's delete is acknowledged but removes nothing
    u2.delete_note(note.id).await.unwrap();
    assert_eq!(u.list_notes().await.unwrap().len(), 1);

    u.delete_note(note.id).await.unwrap();
    assert!(u.list_notes().await.unwrap().is_empty());
    assert_eq!(store.note_count(), 0);
}

#[tokio::test]
async fn test_google_callback_then_dashboard() {
    let store = MemoryStore::new();
    let observer = anonymous_observer();

    let mut flow = OtpFlow::login(Arc::new(store.clone()), observer.clone());
    let url = flow.google_sign_in("http://localhost:5173/").unwrap();
    assert!(url.contains("provider=google"));

    let session = store.issue_oauth_session("g@x.com", Some("Gee"));
    let profile = crate::complete_oauth(&store, &observer, session).await.unwrap();
    assert_eq!(profile.name, "Gee");
    assert_eq!(profile.dob, None);
    assert_eq!(observer.redirect(Route::SignIn), Some(Route::Dashboard));

    let mut page = Dashboard::new(Arc::new(store.clone()), observer.clone());
    page.load().await.unwrap();
    page.add_note("first").await.unwrap();
    assert_eq!(page.notes()[0].user_name.as_deref(), Some("Gee"));

    assert_eq!(page.sign_out().await, Route::SignIn);
    assert_eq!(observer.redirect(Route::Dashboard), Some(Route::SignIn));
}

#[tokio::test]
async fn test_expired_gateway_token_is_rejected() {
    let store = MemoryStore::new();
    let base = spawn_gateway(store).await;

    let keys = TokenKeys::new("scenario-secret", 0);
    let stale = keys.issue(uuid::Uuid::new_v4(), None).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let client = GatewayClient::new(&base).unwrap().with_token(stale);
    match client.list_notes().await {
        Err(ClientError::Gateway { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Invalid token");
        }
        other => panic!("unexpected: {other:?}"),
    }
}
