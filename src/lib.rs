//! RosterKit - Sports Roster and Athlete Statistics Manager
//!
//! A self-hosted web application for sports organizations. Keeps teams and
//! athletes organized by role, and lets administrators and coaches record
//! per-year athlete statistics through a form generated from each sport's
//! statistic definitions.

pub mod cli;
pub mod messages;
pub mod roster;
pub mod stats;
pub mod storage;
pub mod web;

// Re-export commonly used types
pub use roster::{Actor, RosterStore};
pub use stats::{can_manage, StatisticRegistry};
pub use storage::config::AppConfig;
pub use storage::database::Database;
pub use web::{build_router, AppState};
