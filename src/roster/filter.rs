//! Role-scoped athlete listing, filtering, and bulk deletion.

use std::collections::HashSet;

use uuid::Uuid;

use crate::roster::store::RosterStore;
use crate::roster::types::{Actor, AthleteSummary, Campus, Gender, Role, Sport};
use crate::roster::RosterError;
use crate::storage::Database;

/// Which athletes an actor may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityScope {
    /// Every athlete (administrators)
    All,
    /// Athletes on one team (coaches and athletes)
    Team(Uuid),
    /// No athletes
    Nothing,
}

impl VisibilityScope {
    /// Scope for an actor: admins see all, coaches their team, athletes their teammates.
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role() {
            Role::Administrator => VisibilityScope::All,
            Role::Coach => actor
                .coach
                .as_ref()
                .and_then(|c| c.team_id)
                .map(VisibilityScope::Team)
                .unwrap_or(VisibilityScope::Nothing),
            Role::Athlete => actor
                .athlete
                .as_ref()
                .and_then(|a| a.team_id)
                .map(VisibilityScope::Team)
                .unwrap_or(VisibilityScope::Nothing),
        }
    }
}

/// Optional list filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AthleteFilter {
    pub sport: Option<Uuid>,
    pub campus: Option<Uuid>,
    pub coach: Option<Uuid>,
    pub gender: Option<Gender>,
}

/// Visible athletes plus the dropdown options derived from them.
#[derive(Debug, Clone, Default)]
pub struct RosterView {
    pub athletes: Vec<AthleteSummary>,
    pub sports: Vec<Sport>,
    pub campuses: Vec<Campus>,
    /// Coach id and display name
    pub coaches: Vec<(Uuid, String)>,
}

/// List athletes the actor may see, narrowed by the filter.
pub fn list_visible(
    db: &Database,
    actor: &Actor,
    filter: &AthleteFilter,
) -> Result<RosterView, RosterError> {
    let scope = VisibilityScope::for_actor(actor);
    let athletes = RosterStore::new(db.connection()).list_athlete_summaries(&scope, filter)?;

    let mut sports: Vec<Sport> = Vec::new();
    let mut campuses: Vec<Campus> = Vec::new();
    let mut coaches: Vec<(Uuid, String)> = Vec::new();
    for summary in &athletes {
        if let Some(sport) = &summary.sport {
            if !sports.iter().any(|s| s.id == sport.id) {
                sports.push(sport.clone());
            }
        }
        if let Some(campus) = &summary.campus {
            if !campuses.iter().any(|c| c.id == campus.id) {
                campuses.push(campus.clone());
            }
        }
        if let Some(coach) = &summary.coach {
            if !coaches.iter().any(|(id, _)| *id == coach.0) {
                coaches.push(coach.clone());
            }
        }
    }
    sports.sort_by(|a, b| a.name.cmp(&b.name));
    campuses.sort_by(|a, b| a.name.cmp(&b.name));
    coaches.sort_by(|a, b| a.1.cmp(&b.1));

    Ok(RosterView {
        athletes,
        sports,
        campuses,
        coaches,
    })
}

/// Delete the users behind the selected athletes, limited to the actor's scope.
///
/// Returns the number of athletes removed. Ids outside the scope are ignored.
pub fn bulk_delete(
    db: &mut Database,
    actor: &Actor,
    athlete_ids: &[Uuid],
) -> Result<usize, RosterError> {
    if !matches!(actor.role(), Role::Administrator | Role::Coach) {
        return Err(RosterError::Unauthorized(
            "You are not authorized to delete athletes.".to_string(),
        ));
    }

    let scope = VisibilityScope::for_actor(actor);
    let requested: HashSet<Uuid> = athlete_ids.iter().copied().collect();

    let tx = db.transaction()?;
    let deleted = {
        let store = RosterStore::new(&tx);
        let user_ids: Vec<Uuid> = store
            .list_athlete_summaries(&scope, &AthleteFilter::default())?
            .into_iter()
            .filter(|s| requested.contains(&s.athlete.id))
            .map(|s| s.user.id)
            .collect();
        store.delete_users(&user_ids)?
    };
    tx.commit().map_err(crate::storage::DatabaseError::from)?;

    tracing::info!(
        actor = %actor.user.username,
        requested = athlete_ids.len(),
        deleted,
        "Bulk athlete delete"
    );
    Ok(deleted)
}
