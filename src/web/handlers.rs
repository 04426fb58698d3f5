//! Request handlers.
//!
//! Each handler locks the database once, does its synchronous work, and
//! releases the lock before the response is returned.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use uuid::Uuid;

use super::{parse_id, redirect_with, render, resolve_actor, take_messages, AppState, WebError};
use crate::messages::FlashMessage;
use crate::roster::enrollment::{can_enroll, EnrollmentFormset};
use crate::roster::filter::bulk_delete;
use crate::roster::profile::{self, can_delete, can_edit};
use crate::roster::{
    enroll, list_visible, AthleteFilter, Gender, ProfileOutcome, Role, RosterError, RosterStore,
};
use crate::stats::games::{self, GameStore};
use crate::stats::workflow::{self, SubmitOutcome};
use crate::stats::{can_manage, PerformanceStore, ReportOutcome, StatsError};
use super::render::DetailActions;

type Pairs = Vec<(String, String)>;

const ATHLETE_LIST: &str = "/athletes";

/// Rows offered by a fresh enrollment formset.
const BLANK_ENROLLMENT_ROWS: usize = 1;

pub(crate) async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

/// First value wins for repeated keys.
fn first_values(pairs: Pairs) -> HashMap<String, String> {
    let mut raw = HashMap::new();
    for (key, value) in pairs {
        raw.entry(key).or_insert(value);
    }
    raw
}

fn parse_filter(pairs: &[(String, String)]) -> AthleteFilter {
    let id = |key: &str| first_value(pairs, key).and_then(|v| Uuid::parse_str(v).ok());
    AthleteFilter {
        sport: id("sport"),
        campus: id("campus"),
        coach: id("coach"),
        gender: first_value(pairs, "gender").and_then(|v| v.parse::<Gender>().ok()),
    }
}

fn roster_failure(e: RosterError) -> WebError {
    match e {
        RosterError::Database(e) => e.into(),
        RosterError::NotFound(what) => WebError::NotFound(what),
        RosterError::Unauthorized(reason) => WebError::Internal(reason),
    }
}

pub(crate) async fn athlete_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
) -> Result<Response, WebError> {
    let db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let filter = parse_filter(&query);
    let view = list_visible(&db, &actor, &filter).map_err(roster_failure)?;
    let can_delete = matches!(actor.role(), Role::Administrator | Role::Coach);

    let messages = take_messages(&query);
    Ok(Html(render::athlete_list(&view, &filter, can_delete, &messages)).into_response())
}

pub(crate) async fn athletes_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<Pairs>,
) -> Result<Response, WebError> {
    let mut db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let ids: Vec<Uuid> = form
        .iter()
        .filter(|(k, _)| k == "athlete_ids")
        .filter_map(|(_, v)| Uuid::parse_str(v.trim()).ok())
        .collect();

    let messages = match bulk_delete(&mut db, &actor, &ids) {
        Ok(0) => Vec::new(),
        Ok(deleted) => vec![FlashMessage::success(format!(
            "Successfully deleted {} athlete(s).",
            deleted
        ))],
        Err(RosterError::Unauthorized(reason)) => vec![FlashMessage::error(reason)],
        Err(e) => return Err(roster_failure(e)),
    };

    Ok(redirect_with(ATHLETE_LIST, &messages))
}

pub(crate) async fn athlete_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<Pairs>,
) -> Result<Response, WebError> {
    let db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let athlete_id = parse_id(&id, "Athlete")?;

    let summary = RosterStore::new(db.connection())
        .athlete_summary(athlete_id)?
        .ok_or_else(|| WebError::NotFound("Athlete".to_string()))?;
    let records = PerformanceStore::new(db.connection()).records_for_athlete(athlete_id)?;
    let games = match summary.athlete.team_id {
        Some(team_id) => GameStore::new(db.connection()).games_for_team(team_id)?,
        None => Vec::new(),
    };
    let actions = DetailActions {
        manage_stats: can_manage(&actor, &summary.athlete),
        edit: can_edit(&actor, &summary.athlete),
        delete: can_delete(&actor, &summary.athlete),
    };

    let messages = take_messages(&query);
    Ok(Html(render::athlete_detail(&summary, &records, &games, actions, &messages)).into_response())
}

fn detail_path(athlete_id: Uuid) -> String {
    format!("/athletes/{}", athlete_id)
}

/// Gate failures go back to the detail page; missing records are a 404.
fn stats_failure(athlete_id: Uuid, e: StatsError) -> Result<Response, WebError> {
    match e {
        StatsError::AthleteNotFound(_) => Err(WebError::NotFound("Athlete".to_string())),
        StatsError::GameNotFound(_) => Err(WebError::NotFound("Game".to_string())),
        other => Ok(redirect_with(
            &detail_path(athlete_id),
            &[FlashMessage::error(other.user_message())],
        )),
    }
}

pub(crate) async fn stats_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let athlete_id = parse_id(&id, "Athlete")?;

    match workflow::load_form(
        &db,
        &actor,
        athlete_id,
        state.current_year(),
        &state.config.stats,
    ) {
        Ok((context, form)) => Ok(Html(render::stats_form(&context, &form)).into_response()),
        Err(e) => stats_failure(athlete_id, e),
    }
}

pub(crate) async fn stats_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<Pairs>,
) -> Result<Response, WebError> {
    let mut db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let athlete_id = parse_id(&id, "Athlete")?;
    let raw = first_values(form);

    let result = workflow::submit(
        &mut db,
        &actor,
        athlete_id,
        &raw,
        state.current_year(),
        &state.config.stats,
    );

    match result {
        Ok((_, SubmitOutcome::Saved { year, .. })) => Ok(redirect_with(
            &detail_path(athlete_id),
            &[FlashMessage::success(format!(
                "Statistics for {} have been updated successfully.",
                year
            ))],
        )),
        Ok((context, SubmitOutcome::Invalid(form))) => {
            Ok(Html(render::stats_form(&context, &form)).into_response())
        }
        Err(e) => stats_failure(athlete_id, e),
    }
}

pub(crate) async fn game_report_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((game, athlete)): Path<(String, String)>,
) -> Result<Response, WebError> {
    let db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let game_id = parse_id(&game, "Game")?;
    let athlete_id = parse_id(&athlete, "Athlete")?;

    match games::load_report(&db, &actor, game_id, athlete_id, &state.config.stats) {
        Ok((context, form)) => Ok(Html(render::game_report_form(&context, &form)).into_response()),
        Err(e) => stats_failure(athlete_id, e),
    }
}

pub(crate) async fn game_report_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((game, athlete)): Path<(String, String)>,
    Form(form): Form<Pairs>,
) -> Result<Response, WebError> {
    let mut db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let game_id = parse_id(&game, "Game")?;
    let athlete_id = parse_id(&athlete, "Athlete")?;
    let raw = first_values(form);

    match games::submit_report(&mut db, &actor, game_id, athlete_id, &raw, &state.config.stats) {
        Ok((context, ReportOutcome::Saved { .. })) => Ok(redirect_with(
            &detail_path(athlete_id),
            &[FlashMessage::success(format!(
                "Game report for '{}' has been saved.",
                context.game.name
            ))],
        )),
        Ok((context, ReportOutcome::Invalid(form))) => {
            Ok(Html(render::game_report_form(&context, &form)).into_response())
        }
        Err(e) => stats_failure(athlete_id, e),
    }
}

/// Permission failures go back to the detail page.
fn profile_failure(athlete_id: Uuid, e: RosterError) -> Result<Response, WebError> {
    match e {
        RosterError::Unauthorized(reason) => Ok(redirect_with(
            &detail_path(athlete_id),
            &[FlashMessage::error(reason)],
        )),
        other => Err(roster_failure(other)),
    }
}

pub(crate) async fn athlete_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let athlete_id = parse_id(&id, "Athlete")?;

    match profile::edit_form(&db, &actor, athlete_id) {
        Ok((summary, form)) => Ok(Html(render::profile_form(&summary, &form)).into_response()),
        Err(e) => profile_failure(athlete_id, e),
    }
}

pub(crate) async fn athlete_edit_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<Pairs>,
) -> Result<Response, WebError> {
    let mut db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let athlete_id = parse_id(&id, "Athlete")?;

    match profile::update_profile(&mut db, &actor, athlete_id, &form) {
        Ok((_, ProfileOutcome::Updated)) => Ok(redirect_with(
            ATHLETE_LIST,
            &[FlashMessage::success("Athlete profile updated successfully!")],
        )),
        Ok((summary, ProfileOutcome::Invalid(form))) => {
            Ok(Html(render::profile_form(&summary, &form)).into_response())
        }
        Err(e) => profile_failure(athlete_id, e),
    }
}

pub(crate) async fn athlete_delete_confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let athlete_id = parse_id(&id, "Athlete")?;

    let summary = RosterStore::new(db.connection())
        .athlete_summary(athlete_id)?
        .ok_or_else(|| WebError::NotFound("Athlete".to_string()))?;
    if !can_delete(&actor, &summary.athlete) {
        return Ok(redirect_with(
            &detail_path(athlete_id),
            &[FlashMessage::error(
                "You are not authorized to delete this athlete.",
            )],
        ));
    }
    Ok(Html(render::delete_confirm(&summary)).into_response())
}

pub(crate) async fn athlete_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let mut db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let athlete_id = parse_id(&id, "Athlete")?;

    match profile::delete_athlete(&mut db, &actor, athlete_id) {
        Ok(name) => Ok(redirect_with(
            ATHLETE_LIST,
            &[FlashMessage::success(format!(
                "Athlete '{}' has been deleted.",
                name
            ))],
        )),
        Err(e) => profile_failure(athlete_id, e),
    }
}

pub(crate) async fn bulk_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
) -> Result<Response, WebError> {
    let db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;
    let store = RosterStore::new(db.connection());

    let Some(raw_team) = first_value(&query, "team") else {
        let teams: Vec<_> = store
            .list_teams()?
            .into_iter()
            .filter(|team| can_enroll(&actor, team))
            .collect();
        return Ok(Html(render::team_select(&teams, &take_messages(&query))).into_response());
    };

    let team = match Uuid::parse_str(raw_team).ok().map(|id| store.get_team(id)).transpose()? {
        Some(Some(team)) => team,
        _ => {
            return Ok(redirect_with(
                ATHLETE_LIST,
                &[FlashMessage::error("Invalid Team selected.")],
            ))
        }
    };
    if !can_enroll(&actor, &team) {
        return Ok(redirect_with(
            ATHLETE_LIST,
            &[FlashMessage::error(
                "You are not authorized to add athletes to this team.",
            )],
        ));
    }

    let formset = EnrollmentFormset::blank(BLANK_ENROLLMENT_ROWS);
    Ok(Html(render::enrollment_formset(&team, &formset)).into_response())
}

pub(crate) async fn bulk_add_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
    Form(form): Form<Pairs>,
) -> Result<Response, WebError> {
    let mut db = state.lock_db()?;
    let actor = resolve_actor(&db, &headers)?;

    let team = first_value(&query, "team")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(|id| RosterStore::new(db.connection()).get_team(id))
        .transpose()?
        .flatten();
    let Some(team) = team else {
        return Ok(redirect_with(
            ATHLETE_LIST,
            &[FlashMessage::error("Invalid Team selected.")],
        ));
    };

    if !can_enroll(&actor, &team) {
        return Ok(redirect_with(
            ATHLETE_LIST,
            &[FlashMessage::error(
                "You are not authorized to add athletes to this team.",
            )],
        ));
    }

    let formset = EnrollmentFormset::bind(&form);
    if !formset.is_valid() {
        return Ok(Html(render::enrollment_formset(&team, &formset)).into_response());
    }

    let messages = match enroll(&mut db, &actor, &team, formset.cleaned_rows()) {
        Ok(outcome) => outcome.messages,
        Err(RosterError::Unauthorized(reason)) => vec![FlashMessage::error(reason)],
        Err(e) => return Err(roster_failure(e)),
    };

    Ok(redirect_with(ATHLETE_LIST, &messages))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Pairs {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_filter_ignores_blank_and_malformed_values() {
        let sport = Uuid::new_v4();
        let filter = parse_filter(&pairs(&[
            ("sport", &sport.to_string()),
            ("campus", ""),
            ("coach", "not-a-uuid"),
            ("gender", "F"),
        ]));
        assert_eq!(filter.sport, Some(sport));
        assert_eq!(filter.campus, None);
        assert_eq!(filter.coach, None);
        assert_eq!(filter.gender, Some(Gender::Female));
    }

    #[test]
    fn test_first_values_keeps_earliest() {
        let raw = first_values(pairs(&[("pts", "1"), ("pts", "2"), ("goals", "")]));
        assert_eq!(raw.get("pts").map(String::as_str), Some("1"));
        assert_eq!(raw.get("goals").map(String::as_str), Some(""));
    }

    #[test]
    fn test_first_value_trims() {
        let query = pairs(&[("team", "  "), ("team", "x")]);
        assert_eq!(first_value(&query, "team"), None);
        assert_eq!(first_value(&pairs(&[("team", " x ")]), "team"), Some("x"));
    }
}
