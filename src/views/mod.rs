//! Screen-level view models built on the sync primitives

mod activities;
mod dashboard;

pub use activities::ActivityList;
pub use dashboard::{Dashboard, ProgressStats};
