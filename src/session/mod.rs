//! Session store
//!
//! Single authoritative holder of the current [`Principal`]. The value is
//! published on a `watch` channel that lives as long as the store, so the
//! principal stream never closes; failures of login/register are returned
//! to the caller and never reach subscribers.
//!
//! Ordering: the durable pair is written before the in-memory value is
//! published, so a subscriber that reacts by reading storage (for example
//! through [`SessionStore::is_authenticated`]) never sees a stale token.

mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, CURRENT_USER_KEY, TOKEN_KEY};

use crate::error::{ClientError, Result};
use crate::gateway::{fetch, Gateway, Method};
use crate::models::{AuthResponse, LoginRequest, Principal, RegisterRequest};
use crate::ui::{Navigator, Route};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";

/// Outcome of a route guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Route),
}

/// Observable, persisted holder of the authenticated principal.
///
/// Construct one per process and share it by `Arc`; nothing else writes the
/// durable session pair.
///
/// # Example
///
/// ```rust,ignore
/// let session = SessionStore::new(gateway, storage);
/// session.initialize();
///
/// let mut principal = session.subscribe();
/// session.login(&LoginRequest::new("a@b.com", "secret1")).await?;
/// principal.changed().await?;
/// ```
pub struct SessionStore {
    gateway: Arc<dyn Gateway>,
    storage: Arc<dyn SessionStorage>,
    principal: watch::Sender<Option<Principal>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn Gateway>, storage: Arc<dyn SessionStorage>) -> Self {
        let (principal, _) = watch::channel(None);
        Self {
            gateway,
            storage,
            principal,
            navigator: None,
        }
    }

    /// Navigate to the login screen on logout
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Restore the principal from durable storage without contacting the
    /// server. Both keys must be present and the principal must decode;
    /// otherwise the session starts unauthenticated.
    ///
    /// Always publishes the result, even when unchanged.
    pub fn initialize(&self) -> Option<Principal> {
        let restored = self.read_persisted();
        match &restored {
            Some(principal) => info!(user_id = %principal.id, "session restored"),
            None => info!("no persisted session"),
        }
        self.principal.send_replace(restored.clone());
        restored
    }

    /// Authenticate with email and password.
    ///
    /// On success the pair is persisted, the principal published and the
    /// full server response returned. On failure nothing changes.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse> {
        let body = serde_json::to_value(credentials)?;
        let response: AuthResponse =
            fetch(self.gateway.as_ref(), Method::Post, LOGIN_PATH, Some(body), Vec::new())
                .await
                .map_err(|e| auth_failure(e, "Login failed"))?;

        self.establish(&response)?;
        info!(user_id = %response.user.id, "logged in");
        Ok(response)
    }

    /// Create an account and sign in with it. Same contract as [`login`].
    ///
    /// [`login`]: SessionStore::login
    pub async fn register(&self, payload: &RegisterRequest) -> Result<AuthResponse> {
        let body = serde_json::to_value(payload)?;
        let response: AuthResponse =
            fetch(self.gateway.as_ref(), Method::Post, REGISTER_PATH, Some(body), Vec::new())
                .await
                .map_err(|e| auth_failure(e, "Registration failed"))?;

        self.establish(&response)?;
        info!(user_id = %response.user.id, "registered");
        Ok(response)
    }

    /// Clear the durable pair and the in-memory principal, then leave for
    /// the login screen. No server round-trip.
    ///
    /// The in-memory principal is cleared even if storage cannot be
    /// written. That error is returned: the token is still persisted and
    /// [`is_authenticated`](SessionStore::is_authenticated) keeps saying so.
    pub fn logout(&self) -> Result<()> {
        let cleared = self.storage.remove_pair(TOKEN_KEY, CURRENT_USER_KEY);
        if let Err(e) = &cleared {
            error!("Failed to clear persisted session: {}", e);
        }
        self.principal.send_replace(None);
        info!("logged out");

        if let Some(navigator) = &self.navigator {
            navigator.navigate(Route::Login);
        }
        cleared
    }

    /// Latest published principal
    pub fn current_principal(&self) -> Option<Principal> {
        self.principal.borrow().clone()
    }

    /// Whether a token is persisted right now.
    ///
    /// Reads durable storage rather than the in-memory value so it is
    /// correct before [`initialize`](SessionStore::initialize) has run.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// The persisted token, if any
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not read session token: {}", e);
                None
            }
        }
    }

    /// Subscribe to principal changes. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.principal.subscribe()
    }

    /// Route guard consulted before a screen mounts
    pub fn guard(&self, route: Route) -> GuardDecision {
        if route.is_public() || self.is_authenticated() {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(Route::Login)
        }
    }

    // === Private Implementation ===

    fn establish(&self, response: &AuthResponse) -> Result<()> {
        let encoded = serde_json::to_string(&response.user)?;
        self.storage
            .put_pair((TOKEN_KEY, &response.token), (CURRENT_USER_KEY, &encoded))?;
        self.principal.send_replace(Some(response.user.clone()));
        Ok(())
    }

    fn read_persisted(&self) -> Option<Principal> {
        let read = |key: &str| match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, "Could not read persisted session: {}", e);
                None
            }
        };

        let _token = read(TOKEN_KEY)?;
        let user = read(CURRENT_USER_KEY)?;
        match serde_json::from_str::<Principal>(&user) {
            Ok(principal) => Some(principal),
            Err(e) => {
                warn!("Persisted principal is unreadable, starting signed out: {}", e);
                None
            }
        }
    }
}

/// Fold protocol-level failures into an authentication error carrying the
/// server's message (or `generic`). Transport failures pass through.
fn auth_failure(err: ClientError, generic: &str) -> ClientError {
    match err {
        ClientError::Server { message, .. } if !message.trim().is_empty() => ClientError::Auth(message),
        ClientError::Server { .. } | ClientError::NotFound(_) | ClientError::Json(_) => {
            ClientError::Auth(generic.to_string())
        }
        other => other,
    }
}
