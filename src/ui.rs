//! Collaborators the UI layer plugs into the sync layer
//!
//! Notifications, navigation and yes/no confirmation are rendered by the
//! host UI; the sync layer only talks to these traits.

use async_trait::async_trait;

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A dismissible, self-expiring message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    /// How long the notification stays visible
    pub duration_ms: u64,
}

impl Notification {
    /// Success notice (3 s)
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            duration_ms: 3000,
        }
    }

    /// Error notice (5 s)
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            duration_ms: 5000,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NoticeLevel::Success => tracing::info!(duration_ms = notification.duration_ms, "{}", notification.message),
            NoticeLevel::Error => tracing::warn!(duration_ms = notification.duration_ms, "{}", notification.message),
        }
    }
}

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Groups,
    Students,
    Activities,
    Progress,
}

impl Route {
    /// Routes reachable without a session
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Groups => "/groups",
            Route::Students => "/students",
            Route::Activities => "/activities",
            Route::Progress => "/progress",
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Modal yes/no prompt.
///
/// Resolves to `true` only on explicit affirmation; dismissing the prompt
/// resolves to `false`.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn request_confirmation(&self, title: &str, message: &str) -> bool;
}
