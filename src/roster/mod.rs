//! Roster module.
//!
//! Manages the organization's people and teams:
//! - Users, coaches, and athlete profiles
//! - Sports, campuses, and teams
//! - Role-scoped athlete listing with filters
//! - Editing and deleting one athlete
//! - Bulk enrollment of new athletes onto a team

pub mod enrollment;
pub mod filter;
pub mod profile;
pub mod store;
pub mod types;

pub use enrollment::{enroll, EnrollmentFormset, EnrollmentOutcome, EnrollmentRow};
pub use filter::{list_visible, AthleteFilter, RosterView, VisibilityScope};
pub use profile::{ProfileForm, ProfileOutcome};
pub use store::RosterStore;
pub use types::{Actor, Athlete, AthleteSummary, Campus, Coach, Gender, Role, Sport, Team, User};

use crate::storage::DatabaseError;

/// Roster operation errors.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),
}
