//! The manage-athlete-stats request flow.
//!
//! Load the athlete, check the team precondition and the actor's permission,
//! resolve the sport's statistics, then either build the pre-filled form or
//! validate a submission and apply it.

use std::collections::HashMap;

use uuid::Uuid;

use crate::roster::{Actor, AthleteSummary, RosterStore, Sport};
use crate::stats::access;
use crate::stats::form::{build_form, ScorecardForm};
use crate::stats::registry::{ApplicableStatistics, StatisticRegistry};
use crate::stats::upsert::{self, PerformanceStore};
use crate::stats::StatsError;
use crate::storage::{Database, DatabaseError, StatsSettings};

/// Everything a stats page needs about its athlete.
#[derive(Debug, Clone)]
pub struct StatsContext {
    pub athlete: AthleteSummary,
    pub sport: Sport,
    pub applicable: ApplicableStatistics,
}

/// Result of a submission that passed the gate.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Values were stored
    Saved { year: i32, applied: usize },
    /// The form must be shown again with errors
    Invalid(Box<ScorecardForm>),
}

/// Load the athlete and run the gate. No state is touched on failure.
pub fn prepare(db: &Database, actor: &Actor, athlete_id: Uuid) -> Result<StatsContext, StatsError> {
    let roster = RosterStore::new(db.connection());
    let summary = roster
        .athlete_summary(athlete_id)?
        .ok_or(StatsError::AthleteNotFound(athlete_id))?;

    access::authorize(actor, &summary.athlete)?;

    let sport = summary
        .sport
        .clone()
        .ok_or_else(|| DatabaseError::NotFound(format!("sport for athlete {}", athlete_id)))?;
    let applicable = StatisticRegistry::new(db.connection()).resolve_applicable(sport.id)?;

    Ok(StatsContext {
        athlete: summary,
        sport,
        applicable,
    })
}

/// Build the form pre-filled with the athlete's values for `current_year`.
pub fn load_form(
    db: &Database,
    actor: &Actor,
    athlete_id: Uuid,
    current_year: i32,
    settings: &StatsSettings,
) -> Result<(StatsContext, ScorecardForm), StatsError> {
    let context = prepare(db, actor, athlete_id)?;

    let mut initial: HashMap<String, String> =
        PerformanceStore::new(db.connection()).values_for_year(athlete_id, current_year)?;
    initial.insert(
        crate::stats::form::YEAR_FIELD.to_string(),
        current_year.to_string(),
    );

    let form = build_form(&context.applicable, &initial, current_year)
        .with_max_value_length(settings.max_value_length);
    Ok((context, form))
}

/// Validate a submission and, when valid, apply it atomically.
pub fn submit(
    db: &mut Database,
    actor: &Actor,
    athlete_id: Uuid,
    raw: &HashMap<String, String>,
    current_year: i32,
    settings: &StatsSettings,
) -> Result<(StatsContext, SubmitOutcome), StatsError> {
    let context = prepare(db, actor, athlete_id)?;

    let form = build_form(&context.applicable, &HashMap::new(), current_year)
        .with_max_value_length(settings.max_value_length);

    let scorecard = match form.validate(raw) {
        Ok(scorecard) => scorecard,
        Err(errors) => {
            let form = form.rebind(raw, errors);
            return Ok((context, SubmitOutcome::Invalid(Box::new(form))));
        }
    };

    let applied = upsert::apply(db, athlete_id, context.sport.id, &scorecard).map_err(|e| {
        tracing::error!(athlete = %athlete_id, error = %e, "Failed to store statistics");
        StatsError::Database(e)
    })?;

    tracing::info!(
        athlete = %athlete_id,
        actor = %actor.user.username,
        year = scorecard.year,
        applied,
        "Statistics updated"
    );

    Ok((
        context,
        SubmitOutcome::Saved {
            year: scorecard.year,
            applied,
        },
    ))
}
