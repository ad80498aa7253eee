//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use roster_sync::gateway::{Gateway, Method, Query};
use roster_sync::{ClientError, Confirm, Navigator, Notification, Notifier, Result, Route};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a scripted route answers with
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16, String),
    Offline,
}

#[derive(Debug, Clone)]
struct Scripted {
    reply: Reply,
    delay_ms: u64,
}

/// One request as the gateway saw it
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    /// Path plus `?k=v&...` when a query was given
    pub target: String,
    pub body: Option<Value>,
}

/// Gateway that answers from a route table keyed by method and target.
///
/// Unscripted targets answer 404.
#[derive(Default)]
pub struct ScriptedGateway {
    routes: Mutex<HashMap<(Method, String), Scripted>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, target: &str, reply: Reply) -> &Self {
        self.on_delayed(method, target, reply, 0)
    }

    pub fn on_delayed(&self, method: Method, target: &str, reply: Reply, delay_ms: u64) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, target.to_string()), Scripted { reply, delay_ms });
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, target: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.target == target)
            .count()
    }

    pub fn count_method(&self, method: Method) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.method == method).count()
    }
}

fn target_of(path: &str, query: &Query) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let params: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{}?{}", path, params.join("&"))
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn request(&self, method: Method, path: &str, body: Option<Value>, query: Query) -> Result<Value> {
        let target = target_of(path, &query);
        self.calls.lock().unwrap().push(Call {
            method,
            target: target.clone(),
            body,
        });

        let route = self.routes.lock().unwrap().get(&(method, target.clone())).cloned();
        let Some(route) = route else {
            return Err(ClientError::NotFound(target));
        };

        if route.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(route.delay_ms)).await;
        }

        match route.reply {
            Reply::Json(value) => Ok(value),
            Reply::Status(status, message) => Err(ClientError::Server { status, message }),
            Reply::Offline => Err(ClientError::Transport("connection refused".into())),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: Mutex<Vec<Route>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

/// Confirm fake with a fixed answer that counts prompts
pub struct FixedConfirm {
    answer: AtomicBool,
    pub asked: AtomicUsize,
}

impl FixedConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer: AtomicBool::new(answer),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for FixedConfirm {
    async fn request_confirmation(&self, _title: &str, _message: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}

// ==================== Fixtures ====================

pub fn principal_json(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "name": "Ana Torres",
        "role": "teacher",
        "created_at": "2024-01-10T09:00:00Z"
    })
}

pub fn activity_json(id: &str, student_id: &str, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "student_id": student_id,
        "title": title,
        "category": "lectura",
        "difficulty_level": "basico",
        "status": status,
        "created_at": "2024-02-01T10:00:00Z"
    })
}

pub fn student_json(id: &str, name: &str, disability_type: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "group_id": "g1",
        "disability_type": disability_type,
        "created_at": "2024-01-15T10:00:00Z"
    })
}

pub fn group_json(id: &str, name: &str, active: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "level": "primaria",
        "teacher_id": "u1",
        "created_at": "2024-01-01T00:00:00Z",
        "is_active": active
    })
}

pub fn progress_json(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "student_id": "s1",
        "activity_id": "a1",
        "progress_status": status,
        "progress_date": "2024-03-01",
        "created_at": "2024-03-01T12:00:00Z"
    })
}
