//! Session store integration tests

mod common;

use common::{principal_json, RecordingNavigator, Reply, ScriptedGateway};
use roster_sync::gateway::Method;
use roster_sync::models::{LoginRequest, RegisterRequest};
use roster_sync::{
    ClientError, FileStorage, MemoryStorage, Result, Route, SessionStorage, SessionStore, CURRENT_USER_KEY,
    TOKEN_KEY,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

fn login_reply(token: &str, id: &str) -> Reply {
    Reply::Json(json!({
        "message": "Login exitoso",
        "user": principal_json(id, "a@b.com"),
        "token": token
    }))
}

#[tokio::test]
async fn test_login_persists_and_publishes() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(Method::Post, "auth/login", login_reply("t1", "u1"));
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionStore::new(gateway.clone(), storage.clone());
    session.initialize();
    let mut principal = session.subscribe();

    let response = session
        .login(&LoginRequest::new("a@b.com", "secret1"))
        .await
        .unwrap();

    assert_eq!(response.token, "t1");
    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("t1"));
    assert_eq!(session.current_principal().map(|p| p.id), Some("u1".to_string()));
    assert!(principal.has_changed().unwrap());
    assert_eq!(principal.borrow_and_update().as_ref().map(|p| p.id.clone()), Some("u1".to_string()));

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].body, Some(json!({"email": "a@b.com", "password": "secret1"})));
}

#[tokio::test]
async fn test_session_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(Method::Post, "auth/login", login_reply("t1", "u1"));

    let first = SessionStore::new(gateway.clone(), Arc::new(FileStorage::new(&path)));
    first.initialize();
    first.login(&LoginRequest::new("a@b.com", "secret1")).await.unwrap();
    assert!(first.is_authenticated());
    let before = first.current_principal();

    // A new store over the same file stands in for a process restart
    let second = SessionStore::new(gateway.clone(), Arc::new(FileStorage::new(&path)));
    assert!(second.is_authenticated());
    let restored = second.initialize();
    assert_eq!(restored, before);
    assert_eq!(second.current_principal(), before);
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn test_logout_clears_both_entries() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(Method::Post, "auth/login", login_reply("t1", "u1"));
    let storage = Arc::new(MemoryStorage::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let session = SessionStore::new(gateway.clone(), storage.clone()).with_navigator(navigator.clone());

    session.login(&LoginRequest::new("a@b.com", "secret1")).await.unwrap();
    session.logout().unwrap();

    assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(CURRENT_USER_KEY).unwrap(), None);
    assert_eq!(session.current_principal(), None);
    assert!(!session.is_authenticated());
    assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Login]);
    // No server round-trip on logout
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn test_rejected_login_leaves_state_unchanged() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(
        Method::Post,
        "auth/login",
        Reply::Status(401, "Credenciales inválidas".into()),
    );
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionStore::new(gateway, storage.clone());
    session.initialize();
    let mut principal = session.subscribe();

    let err = session
        .login(&LoginRequest::new("a@b.com", "wrong"))
        .await
        .unwrap_err();

    match err {
        ClientError::Auth(message) => assert_eq!(message, "Credenciales inválidas"),
        other => panic!("expected auth error, got {:?}", other),
    }
    assert!(storage.is_empty());
    assert_eq!(session.current_principal(), None);
    assert!(!principal.has_changed().unwrap());
}

#[tokio::test]
async fn test_offline_login_is_transport_error() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(Method::Post, "auth/login", Reply::Offline);
    let session = SessionStore::new(gateway, Arc::new(MemoryStorage::new()));

    let err = session
        .login(&LoginRequest::new("a@b.com", "secret1"))
        .await
        .unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_register_signs_in() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(
        Method::Post,
        "auth/register",
        Reply::Json(json!({
            "message": "Usuario registrado",
            "user": principal_json("u2", "new@b.com"),
            "token": "t2"
        })),
    );
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionStore::new(gateway.clone(), storage.clone());

    let payload = RegisterRequest {
        email: "new@b.com".into(),
        password: "secret1".into(),
        name: "Ana Torres".into(),
        role: None,
    };
    session.register(&payload).await.unwrap();

    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("t2"));
    assert_eq!(session.current_principal().map(|p| p.id), Some("u2".to_string()));
    assert!(gateway.calls()[0].body.as_ref().unwrap().get("confirmPassword").is_none());
}

#[tokio::test]
async fn test_second_login_replaces_principal() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(Method::Post, "auth/login", login_reply("t1", "u1"));
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionStore::new(gateway.clone(), storage.clone());

    session.login(&LoginRequest::new("a@b.com", "secret1")).await.unwrap();
    gateway.on(Method::Post, "auth/login", login_reply("t9", "u9"));
    session.login(&LoginRequest::new("a@b.com", "secret1")).await.unwrap();

    assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("t9"));
    assert_eq!(session.current_principal().map(|p| p.id), Some("u9".to_string()));
}

/// What a principal subscriber saw when it was woken
#[derive(Debug, PartialEq)]
struct Observed {
    signed_in: bool,
    authenticated: bool,
    token: Option<String>,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscribers_see_storage_already_written() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(Method::Post, "auth/login", login_reply("t1", "u1"));
    let storage = Arc::new(MemoryStorage::new());
    let session = Arc::new(SessionStore::new(gateway, storage.clone()));
    session.initialize();

    let (tx, mut observed) = mpsc::unbounded_channel();
    let mut principal = session.subscribe();
    let observer = {
        let session = session.clone();
        let storage = storage.clone();
        tokio::spawn(async move {
            while principal.changed().await.is_ok() {
                let signed_in = principal.borrow_and_update().is_some();
                let seen = Observed {
                    signed_in,
                    authenticated: session.is_authenticated(),
                    token: storage.get(TOKEN_KEY).unwrap(),
                };
                if tx.send(seen).is_err() {
                    break;
                }
            }
        })
    };

    session.login(&LoginRequest::new("a@b.com", "secret1")).await.unwrap();
    assert_eq!(
        observed.recv().await.unwrap(),
        Observed {
            signed_in: true,
            authenticated: true,
            token: Some("t1".into()),
        }
    );

    session.logout().unwrap();
    assert_eq!(
        observed.recv().await.unwrap(),
        Observed {
            signed_in: false,
            authenticated: false,
            token: None,
        }
    );

    drop(observed);
    observer.abort();
}

/// Storage whose clear always fails
struct StuckStorage(MemoryStorage);

impl SessionStorage for StuckStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get(key)
    }

    fn put_pair(&self, first: (&str, &str), second: (&str, &str)) -> Result<()> {
        self.0.put_pair(first, second)
    }

    fn remove_pair(&self, _first: &str, _second: &str) -> Result<()> {
        Err(ClientError::Storage("read-only session file".into()))
    }
}

#[tokio::test]
async fn test_logout_reports_storage_failure() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.on(Method::Post, "auth/login", login_reply("t1", "u1"));
    let navigator = Arc::new(RecordingNavigator::default());
    let session = SessionStore::new(gateway, Arc::new(StuckStorage(MemoryStorage::new())))
        .with_navigator(navigator.clone());

    session.login(&LoginRequest::new("a@b.com", "secret1")).await.unwrap();
    let err = session.logout().unwrap_err();

    assert!(matches!(err, ClientError::Storage(_)));
    assert_eq!(session.current_principal(), None);
    // The token survived, and the caller is told so
    assert!(session.is_authenticated());
    assert_eq!(*navigator.routes.lock().unwrap(), vec![Route::Login]);
}
