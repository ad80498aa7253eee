//! Fan-in loading through the dashboard view model

mod common;

use common::{activity_json, group_json, progress_json, student_json, FixedConfirm, RecordingNotifier, Reply, ScriptedGateway};
use roster_sync::gateway::Method;
use roster_sync::{Dashboard, RecordApi};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn script_dashboard(gateway: &ScriptedGateway, activities: Reply) {
    gateway.on_delayed(
        Method::Get,
        "groups",
        Reply::Json(json!({"groups": [group_json("g1", "3A", true), group_json("g2", "3B", false)]})),
        80,
    );
    gateway.on_delayed(
        Method::Get,
        "students",
        Reply::Json(json!({"students": [
            student_json("s1", "Luis", ""),
            student_json("s2", "Marta", "TEA"),
        ]})),
        5,
    );
    gateway.on_delayed(Method::Get, "activities", activities, 15);
    gateway.on_delayed(
        Method::Get,
        "progress",
        Reply::Json(json!({"progress": [
            progress_json("p1", "achieved"),
            progress_json("p2", "in_progress"),
            progress_json("p3", "achieved"),
            progress_json("p4", "not_achieved"),
        ]})),
        1,
    );
}

fn dashboard(gateway: Arc<ScriptedGateway>, notifier: Arc<RecordingNotifier>) -> Dashboard {
    Dashboard::new(RecordApi::new(gateway), Arc::new(FixedConfirm::new(true)), notifier)
}

#[tokio::test]
async fn test_loading_clears_once_all_four_settle() {
    let gateway = Arc::new(ScriptedGateway::new());
    script_dashboard(&gateway, Reply::Status(500, "Error interno".into()));
    let notifier = Arc::new(RecordingNotifier::default());
    let dashboard = dashboard(gateway.clone(), notifier.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut loading = dashboard.loading();
    let monitor = {
        let seen = seen.clone();
        tokio::spawn(async move {
            while loading.changed().await.is_ok() {
                let value = *loading.borrow_and_update();
                seen.lock().unwrap().push(value);
                if !value {
                    break;
                }
            }
        })
    };

    dashboard.load();
    assert!(dashboard.is_loading());

    // Three of four settle well before the slow groups fetch
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(dashboard.is_loading());
    assert!(dashboard.students().is_ready());
    assert!(!dashboard.groups().is_ready());

    dashboard.ready().await;
    monitor.await.unwrap();

    assert!(!dashboard.is_loading());
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);

    // The failed panel degrades alone
    assert!(!dashboard.activities().is_ready());
    assert_eq!(dashboard.active_groups().len(), 1);
    assert_eq!(dashboard.students_with_special_needs().len(), 1);
    assert_eq!(dashboard.progress_stats().total, 4);
    assert_eq!(dashboard.achievement_rate(), 50);
    assert_eq!(notifier.messages(), vec!["Error loading activities".to_string()]);
}

#[tokio::test]
async fn test_derived_reads() {
    let gateway = Arc::new(ScriptedGateway::new());
    let activities: Vec<_> = (1..=7)
        .map(|i| activity_json(&format!("a{}", i), "s1", &format!("Actividad {}", i), "pending"))
        .chain(std::iter::once(activity_json("a8", "s1", "Lectura", "completed")))
        .collect();
    script_dashboard(&gateway, Reply::Json(json!({ "activities": activities })));
    let dashboard = dashboard(gateway, Arc::new(RecordingNotifier::default()));

    dashboard.load();
    dashboard.ready().await;

    let pending = dashboard.pending_activities();
    assert_eq!(pending.len(), 5);
    assert_eq!(pending[0].id, "a1");
    assert_eq!(dashboard.completed_activities().len(), 1);
    assert_eq!(dashboard.recent_students().len(), 2);
}

#[tokio::test]
async fn test_results_after_teardown_are_dropped() {
    let gateway = Arc::new(ScriptedGateway::new());
    script_dashboard(&gateway, Reply::Status(500, "Error interno".into()));
    let notifier = Arc::new(RecordingNotifier::default());
    let dashboard = dashboard(gateway.clone(), notifier.clone());

    dashboard.load();
    let groups = dashboard.groups().clone();
    let activities = dashboard.activities().clone();
    drop(dashboard);

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Every request went out, none of the answers landed
    assert_eq!(gateway.count_method(Method::Get), 4);
    assert!(!groups.is_ready());
    assert!(!activities.is_ready());
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_reload_replaces_stale_cycle() {
    let gateway = Arc::new(ScriptedGateway::new());
    script_dashboard(&gateway, Reply::Json(json!({"activities": []})));
    let dashboard = dashboard(gateway.clone(), Arc::new(RecordingNotifier::default()));

    let first = dashboard.load();
    let second = dashboard.load();
    assert!(second > first);

    dashboard.ready().await;
    assert!(!dashboard.is_loading());
    assert_eq!(gateway.count(Method::Get, "groups"), 2);
}
