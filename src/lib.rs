//! Roster Sync - reactive state layer for the records REST client
//!
//! Keeps UI-facing state in step with the records service (groups, students,
//! activities, progress) behind a token-authenticated JSON API.
//!
//! # Architecture
//!
//! - **Session**: one persisted, observable holder of the signed-in principal
//! - **Fan-in loading**: several independent fetches joined into one `loading` flag
//! - **Dependent selection**: a child picker whose options follow a parent field
//! - **Gated mutations**: confirm first, send a full copy, reload on success
//!
//! Observable values are `tokio::sync::watch` channels. Every view model owns
//! its senders, so streams stay open for the lifetime of the view.
//!
//! # Example
//!
//! ```rust,ignore
//! use roster_sync::{ClientConfig, HttpGateway, RecordApi, SessionStore, FileStorage};
//! use std::sync::Arc;
//!
//! let config = ClientConfig::load("roster.toml")?;
//! let storage = Arc::new(FileStorage::new("session.json"));
//! let gateway = Arc::new(HttpGateway::new(&config)?.with_session(storage.clone()));
//!
//! let session = SessionStore::new(gateway.clone(), storage);
//! session.initialize();
//!
//! let api = RecordApi::new(gateway);
//! let groups = api.list_groups().await?;
//! ```

// Transport seam and HTTP implementation
pub mod gateway;

// Typed record endpoints
pub mod api;

// Wire types
pub mod models;

// Authenticated principal and its persistence
pub mod session;

// Parallel load coordination
pub mod fanin;

// Parent/child option lists
pub mod resolver;

// Confirm-then-mutate
pub mod confirm;

// UI collaborators (notifications, navigation, prompts)
pub mod ui;

// Dashboard and activity list
pub mod views;

pub mod config;

// Error types
pub mod error;

pub use gateway::{Gateway, Method};

#[cfg(feature = "client")]
pub use gateway::HttpGateway;

pub use api::{RecordApi, Saved};

pub use session::{
    FileStorage, GuardDecision, MemoryStorage, SessionStorage, SessionStore, CURRENT_USER_KEY, TOKEN_KEY,
};

pub use fanin::{FetchTask, LoadCoordinator, LoadTicket, Panel};

pub use resolver::{ActivitiesByStudent, DependentSelection, DomainSource, Resolution, SelectionState, StudentsByGroup};

pub use confirm::{MutationFlow, MutationOutcome, Prompt};

pub use ui::{Confirm, Navigator, NoticeLevel, Notification, Notifier, Route, TracingNotifier};

pub use views::{ActivityList, Dashboard, ProgressStats};

pub use config::ClientConfig;

pub use error::{ClientError, Result};
