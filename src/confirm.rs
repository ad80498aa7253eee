//! Confirmation-gated mutation flow
//!
//! State-changing operations (deletes, status transitions) only run after an
//! explicit yes. A declined prompt is a silent abort, not an error. Updates
//! always send a full copy of the entity with the transitioning fields
//! overwritten; nothing is patched locally, so callers reload on success.

use crate::error::{ClientError, Result};
use crate::ui::{Confirm, Notification, Notifier};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Texts for one gated operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
    /// Notification after the mutation succeeds
    pub success: String,
    /// Notification after the mutation fails
    pub failure: String,
}

impl Prompt {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            success: "Done".to_string(),
            failure: "Operation failed".to_string(),
        }
    }

    pub fn on_success(mut self, text: impl Into<String>) -> Self {
        self.success = text.into();
        self
    }

    pub fn on_failure(mut self, text: impl Into<String>) -> Self {
        self.failure = text.into();
        self
    }
}

#[derive(Debug)]
pub enum MutationOutcome<R> {
    /// The user said no; nothing was sent
    Declined,
    /// The mutation went through; reload affected views
    Applied(R),
    /// Confirmed but the mutation failed; prior state is untouched
    Failed(ClientError),
}

impl<R> MutationOutcome<R> {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, MutationOutcome::Declined)
    }
}

/// Runs mutations behind a confirmation prompt
#[derive(Clone)]
pub struct MutationFlow {
    confirm: Arc<dyn Confirm>,
    notifier: Arc<dyn Notifier>,
}

impl MutationFlow {
    pub fn new(confirm: Arc<dyn Confirm>, notifier: Arc<dyn Notifier>) -> Self {
        Self { confirm, notifier }
    }

    /// Ask, then send `transform` applied to a full copy of `entity`.
    ///
    /// `mutation` is invoked at most once, and only after an affirmative
    /// answer.
    pub async fn confirm_and_mutate<T, R, F, Fut>(
        &self,
        prompt: &Prompt,
        entity: &T,
        transform: impl FnOnce(&mut T),
        mutation: F,
    ) -> MutationOutcome<R>
    where
        T: Clone,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        if !self.ask(prompt).await {
            return MutationOutcome::Declined;
        }

        let mut updated = entity.clone();
        transform(&mut updated);
        self.finish(prompt, mutation(updated).await)
    }

    /// Ask, then run a mutation that needs no payload (deletes).
    pub async fn confirm_and_run<R, F, Fut>(&self, prompt: &Prompt, mutation: F) -> MutationOutcome<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        if !self.ask(prompt).await {
            return MutationOutcome::Declined;
        }
        self.finish(prompt, mutation().await)
    }

    async fn ask(&self, prompt: &Prompt) -> bool {
        let confirmed = self
            .confirm
            .request_confirmation(&prompt.title, &prompt.message)
            .await;
        if !confirmed {
            debug!(title = %prompt.title, "mutation declined");
        }
        confirmed
    }

    fn finish<R>(&self, prompt: &Prompt, result: Result<R>) -> MutationOutcome<R> {
        match result {
            Ok(response) => {
                self.notifier.notify(Notification::success(prompt.success.clone()));
                MutationOutcome::Applied(response)
            }
            Err(e) => {
                error!(title = %prompt.title, "mutation failed: {}", e);
                self.notifier.notify(Notification::error(prompt.failure.clone()));
                MutationOutcome::Failed(e)
            }
        }
    }
}
