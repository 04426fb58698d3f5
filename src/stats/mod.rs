//! Athlete statistics module.
//!
//! Per-sport statistic definitions, the dynamic scorecard form built from
//! them, per-year performance records, per-game reports, and the gate
//! deciding who may edit an athlete's numbers.

pub mod access;
pub mod form;
pub mod games;
pub mod registry;
pub mod upsert;
pub mod workflow;

pub use access::can_manage;
pub use form::{
    build_form, build_game_report_form, GameReportForm, Scorecard, ScorecardForm, ValidationErrors,
};
pub use games::{Game, GameReportContext, GameStore, ReportOutcome};
pub use registry::{ApplicableStatistics, StatisticDefinition, StatisticRegistry, UNIVERSAL_STATISTICS};
pub use upsert::{PerformanceRecord, PerformanceStore};
pub use workflow::{StatsContext, SubmitOutcome};

use uuid::Uuid;

use crate::storage::DatabaseError;

/// Statistics workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Athlete not found: {0}")]
    AthleteNotFound(Uuid),

    #[error("Game not found: {0}")]
    GameNotFound(Uuid),

    #[error("Athlete has no team assigned")]
    NoTeam,

    #[error("Athlete is not on the team playing this game")]
    NotInGame,

    #[error("Actor may not manage these statistics")]
    Unauthorized,

    #[error("Invalid statistic definition: {0}")]
    InvalidDefinition(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl StatsError {
    /// Message shown to the user when the request is turned away.
    pub fn user_message(&self) -> String {
        match self {
            StatsError::AthleteNotFound(_) => "Athlete not found.".to_string(),
            StatsError::GameNotFound(_) => "Game not found.".to_string(),
            StatsError::NotInGame => {
                "This athlete is not on the team playing this game.".to_string()
            }
            StatsError::NoTeam => {
                "Cannot manage stats for an athlete with no team assigned.".to_string()
            }
            StatsError::Unauthorized => {
                "You are not authorized to manage these statistics.".to_string()
            }
            StatsError::InvalidDefinition(reason) => reason.clone(),
            StatsError::Database(_) => {
                "Statistics could not be saved due to a server error. Please try again.".to_string()
            }
        }
    }
}
