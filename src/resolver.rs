//! Cascading dependent-selection resolver
//!
//! Keeps a dependent select field's candidate list in step with its parent
//! field without ever dropping the value already committed to the record
//! under edit.
//!
//! Per form instance the resolver moves through
//! `Unselected -> Constrained(parent) -> Reconciled(parent)`. Any parent
//! change restarts at `Constrained` with a fresh fetch; clearing the parent
//! returns to `Unselected`. While a fetch is in flight the previous
//! candidate list stays published.
//!
//! When the committed value is missing from the constrained domain it is
//! looked up in the unconstrained domain (fetched lazily, once per form) and
//! prepended. A value found in neither domain stays selected but unlisted.

use crate::api::RecordApi;
use crate::error::{ClientError, Result};
use crate::models::{Activity, Record, Student};
use crate::ui::{Notification, Notifier};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{watch, OnceCell};
use tracing::{debug, warn};

/// Where the dependent field's options come from
#[async_trait]
pub trait DomainSource: Send + Sync {
    type Item: Record;

    /// Options valid for `parent_id`
    async fn constrained(&self, parent_id: &str) -> Result<Vec<Self::Item>>;

    /// Every option, unfiltered
    async fn unconstrained(&self) -> Result<Vec<Self::Item>>;

    /// Plural noun used in error notifications
    fn describe(&self) -> &'static str {
        "options"
    }
}

/// Student -> activities assigned to that student
#[derive(Clone)]
pub struct ActivitiesByStudent {
    api: RecordApi,
}

impl ActivitiesByStudent {
    pub fn new(api: RecordApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DomainSource for ActivitiesByStudent {
    type Item = Activity;

    async fn constrained(&self, student_id: &str) -> Result<Vec<Activity>> {
        self.api.list_activities(Some(student_id)).await
    }

    async fn unconstrained(&self) -> Result<Vec<Activity>> {
        self.api.list_activities(None).await
    }

    fn describe(&self) -> &'static str {
        "activities"
    }
}

/// Group -> students enrolled in that group
#[derive(Clone)]
pub struct StudentsByGroup {
    api: RecordApi,
}

impl StudentsByGroup {
    pub fn new(api: RecordApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DomainSource for StudentsByGroup {
    type Item = Student;

    async fn constrained(&self, group_id: &str) -> Result<Vec<Student>> {
        self.api.list_students(Some(group_id)).await
    }

    async fn unconstrained(&self) -> Result<Vec<Student>> {
        self.api.list_students(None).await
    }

    fn describe(&self) -> &'static str {
        "students"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    Unselected,
    /// Constrained fetch for this parent in flight
    Constrained { parent_id: String },
    /// Constrained fetch settled and reconciled
    Reconciled { parent_id: String },
}

/// How a parent change ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Parent cleared
    Unselected,
    /// Constrained domain published as-is
    Constrained,
    /// Committed value prepended from the unconstrained domain
    Reconciled,
    /// Committed value kept but found in neither domain
    Orphaned,
    /// A later parent change made this fetch irrelevant
    Superseded,
    /// Fetch failed; the previous list stays
    Failed,
}

#[derive(Debug)]
struct FormState {
    state: SelectionState,
    value: Option<String>,
    /// Bumped on every parent change; fetches from older requests are dropped
    request: u64,
}

/// Resolver for one dependent field of one form instance
pub struct DependentSelection<S: DomainSource> {
    source: S,
    unconstrained: OnceCell<Vec<S::Item>>,
    candidates: watch::Sender<Vec<S::Item>>,
    form: Mutex<FormState>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl<S: DomainSource> DependentSelection<S> {
    pub fn new(source: S) -> Self {
        let (candidates, _) = watch::channel(Vec::new());
        Self {
            source,
            unconstrained: OnceCell::new(),
            candidates,
            form: Mutex::new(FormState {
                state: SelectionState::Unselected,
                value: None,
                request: 0,
            }),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Prepare for editing an existing record.
    ///
    /// Fetches the unconstrained domain and waits for it before the
    /// committed value is installed, so the first reconciliation already
    /// has data to consult. The value is installed even if the fetch fails;
    /// the error is reported and returned.
    pub async fn bootstrap_for_edit(&self, committed: Option<String>) -> Result<()> {
        let domain = self.unconstrained_domain().await.map(|d| d.clone());

        let unselected = {
            let mut form = self.lock();
            form.value = committed;
            form.state == SelectionState::Unselected
        };

        match domain {
            Ok(all) => {
                if unselected {
                    self.candidates.send_replace(all);
                }
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Bootstrap with the record's committed value, then apply its parent.
    pub async fn open_for_edit(&self, parent_id: Option<&str>, committed: Option<String>) -> Resolution {
        // A failed bootstrap is already reported; the parent fetch may still succeed
        let _ = self.bootstrap_for_edit(committed).await;
        self.on_parent_changed(parent_id).await
    }

    /// React to the parent field changing.
    ///
    /// A blank id is the form's "nothing chosen" value and counts as `None`.
    pub async fn on_parent_changed(&self, parent_id: Option<&str>) -> Resolution {
        let parent_id = parent_id.filter(|id| !id.trim().is_empty());
        let request = {
            let mut form = self.lock();
            form.request += 1;
            form.state = match parent_id {
                Some(id) => SelectionState::Constrained { parent_id: id.to_string() },
                None => SelectionState::Unselected,
            };
            form.request
        };

        match parent_id {
            None => self.enter_unselected(request).await,
            Some(parent_id) => self.enter_constrained(request, parent_id).await,
        }
    }

    /// The user picked a different option
    pub fn set_value(&self, value: Option<String>) {
        self.lock().value = value;
    }

    pub fn value(&self) -> Option<String> {
        self.lock().value.clone()
    }

    pub fn state(&self) -> SelectionState {
        self.lock().state.clone()
    }

    /// Currently displayed options
    pub fn candidates(&self) -> Vec<S::Item> {
        self.candidates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<S::Item>> {
        self.candidates.subscribe()
    }

    /// The entry for the selected value, if it is visible.
    ///
    /// `None` with a value set means the value is orphaned and the UI must
    /// render a fallback label for the bare id.
    pub fn selected(&self) -> Option<S::Item> {
        let value = self.value()?;
        self.candidates
            .borrow()
            .iter()
            .find(|item| item.record_id() == value)
            .cloned()
    }

    /// Whether the unconstrained domain has been fetched
    pub fn is_cached(&self) -> bool {
        self.unconstrained.initialized()
    }

    // === Private Implementation ===

    fn lock(&self) -> std::sync::MutexGuard<'_, FormState> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, request: u64) -> bool {
        self.lock().request == request
    }

    async fn unconstrained_domain(&self) -> Result<&Vec<S::Item>> {
        self.unconstrained
            .get_or_try_init(|| async {
                let all = self.source.unconstrained().await?;
                debug!(count = all.len(), "unconstrained {} cached", self.source.describe());
                Ok::<_, ClientError>(all)
            })
            .await
    }

    async fn enter_unselected(&self, request: u64) -> Resolution {
        if let Some(all) = self.unconstrained.get() {
            self.candidates.send_replace(all.clone());
            return Resolution::Unselected;
        }

        self.candidates.send_replace(Vec::new());
        match self.unconstrained_domain().await {
            Ok(all) => {
                if self.is_current(request) {
                    self.candidates.send_replace(all.clone());
                }
            }
            Err(e) => self.report(&e),
        }
        Resolution::Unselected
    }

    async fn enter_constrained(&self, request: u64, parent_id: &str) -> Resolution {
        let fetched = self.source.constrained(parent_id).await;
        if !self.is_current(request) {
            debug!(parent_id, "constrained fetch superseded");
            return Resolution::Superseded;
        }

        let domain = match fetched {
            Ok(domain) => domain,
            Err(e) => {
                self.report(&e);
                return Resolution::Failed;
            }
        };

        let value = self.value();
        let missing = match &value {
            Some(v) => !domain.iter().any(|item| item.record_id() == v),
            None => false,
        };

        if !missing {
            self.publish(request, parent_id, domain);
            return Resolution::Constrained;
        }

        let value = value.unwrap_or_default();
        let found = match self.unconstrained_domain().await {
            Ok(all) => all.iter().find(|item| item.record_id() == value).cloned(),
            Err(e) => {
                warn!("Could not consult unconstrained {}: {}", self.source.describe(), e);
                None
            }
        };

        if !self.is_current(request) {
            return Resolution::Superseded;
        }

        match found {
            Some(item) => {
                let mut list = Vec::with_capacity(domain.len() + 1);
                list.push(item);
                list.extend(domain);
                self.publish(request, parent_id, list);
                Resolution::Reconciled
            }
            None => {
                warn!(value = %value, parent_id, "selected value not found in any domain");
                self.publish(request, parent_id, domain);
                Resolution::Orphaned
            }
        }
    }

    fn publish(&self, request: u64, parent_id: &str, list: Vec<S::Item>) {
        {
            let mut form = self.lock();
            if form.request != request {
                return;
            }
            form.state = SelectionState::Reconciled {
                parent_id: parent_id.to_string(),
            };
        }
        self.candidates.send_replace(list);
    }

    fn report(&self, err: &ClientError) {
        warn!("Failed to load {}: {}", self.source.describe(), err);
        if let Some(notifier) = &self.notifier {
            notifier.notify(Notification::error(format!(
                "Error loading {}",
                self.source.describe()
            )));
        }
    }
}
