//! Dashboard view model
//!
//! Four independent panels loaded through one fan-in cycle. Panels fill in
//! whatever order the fetches settle; the view is ready once all four have
//! settled, failed ones included.

use crate::api::{RecordApi, Saved};
use crate::confirm::{MutationFlow, MutationOutcome, Prompt};
use crate::fanin::{FetchTask, LoadCoordinator, Panel};
use crate::models::{Activity, ActivityStatus, Group, Progress, ProgressStatus, Student};
use crate::ui::{Confirm, Notifier};
use std::sync::Arc;
use tokio::sync::watch;

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressStats {
    pub achieved: usize,
    pub in_progress: usize,
    pub not_achieved: usize,
    pub total: usize,
}

impl ProgressStats {
    pub fn from_records(records: &[Progress]) -> Self {
        let count = |status: ProgressStatus| {
            records
                .iter()
                .filter(|p| p.progress_status == status)
                .count()
        };
        Self {
            achieved: count(ProgressStatus::Achieved),
            in_progress: count(ProgressStatus::InProgress),
            not_achieved: count(ProgressStatus::NotAchieved),
            total: records.len(),
        }
    }

    /// Rounded percentage of achieved records, 0 when there are none
    pub fn achievement_rate(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.achieved as f64 / self.total as f64 * 100.0).round() as u32
    }
}

pub struct Dashboard {
    api: RecordApi,
    coordinator: LoadCoordinator,
    flow: MutationFlow,
    groups: Panel<Vec<Group>>,
    students: Panel<Vec<Student>>,
    activities: Panel<Vec<Activity>>,
    progress: Panel<ProgressStats>,
}

impl Dashboard {
    pub fn new(api: RecordApi, confirm: Arc<dyn Confirm>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            coordinator: LoadCoordinator::with_notifier(notifier.clone()),
            flow: MutationFlow::new(confirm, notifier),
            groups: Panel::new(),
            students: Panel::new(),
            activities: Panel::new(),
            progress: Panel::new(),
        }
    }

    /// Start (or restart) loading all panels. Returns the load generation.
    pub fn load(&self) -> u64 {
        let api = self.api.clone();
        let groups = FetchTask::fill(
            "groups",
            async move { api.list_groups().await },
            self.groups.clone(),
        );

        let api = self.api.clone();
        let students = FetchTask::fill(
            "students",
            async move { api.list_students(None).await },
            self.students.clone(),
        );

        let api = self.api.clone();
        let activities = FetchTask::fill(
            "activities",
            async move { api.list_activities(None).await },
            self.activities.clone(),
        );

        let api = self.api.clone();
        let panel = self.progress.clone();
        let progress = FetchTask::new(
            "progress",
            async move { api.list_progress(None, None).await },
            move |records: Vec<Progress>| panel.set(ProgressStats::from_records(&records)),
        );

        self.coordinator.arm(vec![groups, students, activities, progress])
    }

    /// Wait for the current load cycle to settle
    pub async fn ready(&self) {
        self.coordinator.wait_settled().await;
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.coordinator.loading()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    pub fn groups(&self) -> &Panel<Vec<Group>> {
        &self.groups
    }

    pub fn students(&self) -> &Panel<Vec<Student>> {
        &self.students
    }

    pub fn activities(&self) -> &Panel<Vec<Activity>> {
        &self.activities
    }

    pub fn progress_stats(&self) -> ProgressStats {
        self.progress.get().unwrap_or_default()
    }

    pub fn achievement_rate(&self) -> u32 {
        self.progress_stats().achievement_rate()
    }

    pub fn recent_students(&self) -> Vec<Student> {
        self.students.with(|students| {
            students
                .map(|s| s.iter().take(RECENT_LIMIT).cloned().collect())
                .unwrap_or_default()
        })
    }

    pub fn students_with_special_needs(&self) -> Vec<Student> {
        self.students.with(|students| {
            students
                .map(|s| s.iter().filter(|s| s.has_special_needs()).cloned().collect())
                .unwrap_or_default()
        })
    }

    pub fn pending_activities(&self) -> Vec<Activity> {
        self.activities_with(ActivityStatus::Pending, Some(RECENT_LIMIT))
    }

    pub fn completed_activities(&self) -> Vec<Activity> {
        self.activities_with(ActivityStatus::Completed, None)
    }

    pub fn active_groups(&self) -> Vec<Group> {
        self.groups.with(|groups| {
            groups
                .map(|g| g.iter().filter(|g| g.is_active()).cloned().collect())
                .unwrap_or_default()
        })
    }

    /// Mark an activity completed after confirmation, then reload.
    pub async fn complete_activity(&self, activity: &Activity) -> MutationOutcome<Saved<Activity>> {
        let prompt = Prompt::new(
            "Mark as completed",
            format!(
                "Are you sure you want to mark the activity \"{}\" as completed?",
                activity.title
            ),
        )
        .on_success("Activity marked as completed")
        .on_failure("Error completing the activity");

        let api = self.api.clone();
        let id = activity.id.clone();
        let outcome = self
            .flow
            .confirm_and_mutate(
                &prompt,
                activity,
                |a| a.status = ActivityStatus::Completed,
                |updated| async move { api.update_activity(&id, &updated).await },
            )
            .await;

        if outcome.is_applied() {
            self.load();
        }
        outcome
    }

    fn activities_with(&self, status: ActivityStatus, limit: Option<usize>) -> Vec<Activity> {
        self.activities.with(|activities| {
            activities
                .map(|list| {
                    list.iter()
                        .filter(|a| a.status == status)
                        .take(limit.unwrap_or(usize::MAX))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        })
    }
}
