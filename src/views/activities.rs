//! Activity list view model
//!
//! One panel of activities, optionally narrowed to a single student. All
//! row actions go through the confirmation flow and reload the list when
//! they succeed.

use crate::api::{RecordApi, Saved};
use crate::confirm::{MutationFlow, MutationOutcome, Prompt};
use crate::fanin::{FetchTask, LoadCoordinator, Panel};
use crate::models::{Activity, ActivityStatus, MessageResponse};
use crate::ui::{Confirm, Notifier};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

pub struct ActivityList {
    api: RecordApi,
    coordinator: LoadCoordinator,
    flow: MutationFlow,
    activities: Panel<Vec<Activity>>,
    student_filter: Mutex<Option<String>>,
}

impl ActivityList {
    pub fn new(api: RecordApi, confirm: Arc<dyn Confirm>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            coordinator: LoadCoordinator::with_notifier(notifier.clone()),
            flow: MutationFlow::new(confirm, notifier),
            activities: Panel::new(),
            student_filter: Mutex::new(None),
        }
    }

    /// Fetch every activity. Returns the load generation.
    pub fn load(&self) -> u64 {
        let api = self.api.clone();
        let task = FetchTask::fill(
            "activities",
            async move { api.list_activities(None).await },
            self.activities.clone(),
        );
        self.coordinator.arm(vec![task])
    }

    /// Narrow the visible rows to one student, or show all with `None`.
    /// Filtering is local; nothing is refetched.
    pub fn filter_by_student(&self, student_id: Option<String>) {
        *self.student_filter.lock().unwrap_or_else(PoisonError::into_inner) = student_id;
    }

    pub fn student_filter(&self) -> Option<String> {
        self.student_filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn ready(&self) {
        self.coordinator.wait_settled().await;
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.coordinator.loading()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    pub fn activities(&self) -> &Panel<Vec<Activity>> {
        &self.activities
    }

    /// Rows matching the student filter, empty before the first load lands
    pub fn rows(&self) -> Vec<Activity> {
        let filter = self.student_filter();
        self.activities.with(|activities| {
            activities
                .map(|list| {
                    list.iter()
                        .filter(|a| filter.as_deref().map_or(true, |id| a.student_id == id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    pub async fn delete(&self, activity: &Activity) -> MutationOutcome<MessageResponse> {
        let prompt = Prompt::new(
            "Delete activity",
            format!("Are you sure you want to delete the activity \"{}\"?", activity.title),
        )
        .on_success("Activity deleted")
        .on_failure("Error deleting the activity");

        let api = self.api.clone();
        let id = activity.id.clone();
        let outcome = self
            .flow
            .confirm_and_run(&prompt, || async move { api.delete_activity(&id).await })
            .await;
        self.reload_if_applied(outcome)
    }

    pub async fn complete(&self, activity: &Activity) -> MutationOutcome<Saved<Activity>> {
        let prompt = Prompt::new(
            "Mark as completed",
            format!(
                "Are you sure you want to mark the activity \"{}\" as completed?",
                activity.title
            ),
        )
        .on_success("Activity marked as completed")
        .on_failure("Error completing the activity");
        self.transition(&prompt, activity, ActivityStatus::Completed).await
    }

    pub async fn reopen(&self, activity: &Activity) -> MutationOutcome<Saved<Activity>> {
        let prompt = Prompt::new(
            "Reopen activity",
            format!("Mark the activity \"{}\" as pending again?", activity.title),
        )
        .on_success("Activity reopened")
        .on_failure("Error reopening the activity");
        self.transition(&prompt, activity, ActivityStatus::Pending).await
    }

    async fn transition(
        &self,
        prompt: &Prompt,
        activity: &Activity,
        status: ActivityStatus,
    ) -> MutationOutcome<Saved<Activity>> {
        let api = self.api.clone();
        let id = activity.id.clone();
        let outcome = self
            .flow
            .confirm_and_mutate(
                prompt,
                activity,
                move |a| a.status = status,
                |updated| async move { api.update_activity(&id, &updated).await },
            )
            .await;
        self.reload_if_applied(outcome)
    }

    fn reload_if_applied<R>(&self, outcome: MutationOutcome<R>) -> MutationOutcome<R> {
        if outcome.is_applied() {
            self.load();
        }
        outcome
    }
}
