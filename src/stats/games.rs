//! Games and per-game statistics.
//!
//! A game belongs to one team. Its report form carries only the sport's own
//! statistics, and each (game, athlete, statistic) holds at most one value.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::roster::{Actor, AthleteSummary, RosterStore, Sport};
use crate::stats::access;
use crate::stats::form::{build_game_report_form, GameReportForm};
use crate::stats::registry::{StatisticDefinition, StatisticRegistry};
use crate::stats::StatsError;
use crate::storage::database::{date_column, uuid_column};
use crate::storage::{Database, DatabaseError, StatsSettings};

/// A scheduled or played game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub played_on: NaiveDate,
    pub location: String,
}

impl Game {
    pub fn new(team_id: Uuid, name: String, played_on: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            name,
            played_on,
            location: String::new(),
        }
    }
}

/// Store for games and their per-athlete values.
pub struct GameStore<'a> {
    conn: &'a Connection,
}

impl<'a> GameStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert_game(&self, game: &Game) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO games (id, team_id, name, played_on, location) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                game.id.to_string(),
                game.team_id.to_string(),
                game.name,
                game.played_on.format("%Y-%m-%d").to_string(),
                game.location,
            ],
        )?;
        Ok(())
    }

    pub fn get_game(&self, id: Uuid) -> Result<Option<Game>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, team_id, name, played_on, location FROM games WHERE id = ?1",
                params![id.to_string()],
                parse_game,
            )
            .optional()?)
    }

    /// A team's games, most recent first.
    pub fn games_for_team(&self, team_id: Uuid) -> Result<Vec<Game>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, team_id, name, played_on, location FROM games
             WHERE team_id = ?1 ORDER BY played_on DESC, name",
        )?;
        let rows = stmt.query_map(params![team_id.to_string()], parse_game)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Create or overwrite the value for (game, athlete, statistic).
    pub fn upsert_value(
        &self,
        game_id: Uuid,
        athlete_id: Uuid,
        statistic_id: Uuid,
        value: &str,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO game_stats (id, game_id, athlete_id, statistic_id, value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(game_id, athlete_id, statistic_id)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![
                Uuid::new_v4().to_string(),
                game_id.to_string(),
                athlete_id.to_string(),
                statistic_id.to_string(),
                value,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// One athlete's recorded values for a game, keyed by short code.
    pub fn values_for(
        &self,
        game_id: Uuid,
        athlete_id: Uuid,
    ) -> Result<HashMap<String, String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.short_name, g.value FROM game_stats g
             JOIN statistics s ON s.id = g.statistic_id
             WHERE g.game_id = ?1 AND g.athlete_id = ?2",
        )?;
        let rows = stmt.query_map(
            params![game_id.to_string(), athlete_id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }
}

fn parse_game(row: &Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: uuid_column(row, 0)?,
        team_id: uuid_column(row, 1)?,
        name: row.get(2)?,
        played_on: date_column(row, 3)?,
        location: row.get(4)?,
    })
}

/// Everything a game report page needs.
#[derive(Debug, Clone)]
pub struct GameReportContext {
    pub athlete: AthleteSummary,
    pub sport: Sport,
    pub game: Game,
    /// The sport's own statistics, in definition order
    pub statistics: Vec<StatisticDefinition>,
}

/// Result of a report submission that passed the gate.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Saved { applied: usize },
    Invalid(Box<GameReportForm>),
}

/// Load the athlete and game, then run the stats gate. The athlete must play
/// for the game's team.
pub fn prepare_report(
    db: &Database,
    actor: &Actor,
    game_id: Uuid,
    athlete_id: Uuid,
) -> Result<GameReportContext, StatsError> {
    let summary = RosterStore::new(db.connection())
        .athlete_summary(athlete_id)?
        .ok_or(StatsError::AthleteNotFound(athlete_id))?;
    let game = GameStore::new(db.connection())
        .get_game(game_id)?
        .ok_or(StatsError::GameNotFound(game_id))?;

    let team_id = access::authorize(actor, &summary.athlete)?;
    if team_id != game.team_id {
        return Err(StatsError::NotInGame);
    }

    let sport = summary
        .sport
        .clone()
        .ok_or_else(|| DatabaseError::NotFound(format!("sport for athlete {}", athlete_id)))?;
    let statistics = StatisticRegistry::new(db.connection())
        .resolve_applicable(sport.id)?
        .specific;

    Ok(GameReportContext {
        athlete: summary,
        sport,
        game,
        statistics,
    })
}

/// Build the report form pre-filled with what is already recorded.
pub fn load_report(
    db: &Database,
    actor: &Actor,
    game_id: Uuid,
    athlete_id: Uuid,
    settings: &StatsSettings,
) -> Result<(GameReportContext, GameReportForm), StatsError> {
    let context = prepare_report(db, actor, game_id, athlete_id)?;
    let initial = GameStore::new(db.connection()).values_for(game_id, athlete_id)?;
    let form = build_game_report_form(&context.statistics, &initial)
        .with_max_value_length(settings.max_value_length);
    Ok((context, form))
}

/// Validate a report and store its non-blank values in one transaction.
pub fn submit_report(
    db: &mut Database,
    actor: &Actor,
    game_id: Uuid,
    athlete_id: Uuid,
    raw: &HashMap<String, String>,
    settings: &StatsSettings,
) -> Result<(GameReportContext, ReportOutcome), StatsError> {
    let context = prepare_report(db, actor, game_id, athlete_id)?;
    let form = build_game_report_form(&context.statistics, &HashMap::new())
        .with_max_value_length(settings.max_value_length);

    let values = match form.validate(raw) {
        Ok(values) => values,
        Err(errors) => {
            let form = form.rebind(raw, errors);
            return Ok((context, ReportOutcome::Invalid(Box::new(form))));
        }
    };

    let applied = record_report(db, &context, &values).map_err(|e| {
        tracing::error!(
            game = %game_id,
            athlete = %athlete_id,
            error = %e,
            "Failed to store game report"
        );
        StatsError::Database(e)
    })?;

    tracing::info!(
        game = %context.game.name,
        athlete = %athlete_id,
        actor = %actor.user.username,
        applied,
        "Game report saved"
    );
    Ok((context, ReportOutcome::Saved { applied }))
}

fn record_report(
    db: &mut Database,
    context: &GameReportContext,
    values: &BTreeMap<String, String>,
) -> Result<usize, DatabaseError> {
    let tx = db.transaction()?;
    let mut applied = 0;
    {
        let store = GameStore::new(&tx);
        for definition in &context.statistics {
            let Some(value) = values.get(&definition.short_code) else {
                continue;
            };
            store.upsert_value(
                context.game.id,
                context.athlete.athlete.id,
                definition.id,
                value,
            )?;
            applied += 1;
        }
    }
    tx.commit()
        .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Athlete, Coach, Gender, Role, Team, User};

    struct League {
        db: Database,
        admin: Actor,
        coach: Actor,
        athlete_id: Uuid,
        teamless_id: Uuid,
        home_game: Game,
        away_game: Game,
    }

    fn league() -> League {
        let db = Database::open_in_memory().unwrap();
        let l = {
            let roster = RosterStore::new(db.connection());
            let soccer = roster.insert_sport("Soccer").unwrap();
            let team = Team::new("United".to_string(), soccer.id, Gender::Female);
            roster.insert_team(&team).unwrap();
            let other = Team::new("City".to_string(), soccer.id, Gender::Female);
            roster.insert_team(&other).unwrap();

            let registry = StatisticRegistry::new(db.connection());
            registry.define_specific(soccer.id, "goals", "Goals").unwrap();
            registry.define_specific(soccer.id, "saves", "Saves").unwrap();

            let admin = User::new(
                "admin".to_string(),
                "admin@club.org".to_string(),
                Role::Administrator,
            );
            roster.insert_user(&admin).unwrap();
            let coach_user = User::new("cora".to_string(), "cora@club.org".to_string(), Role::Coach);
            roster.insert_user(&coach_user).unwrap();
            roster
                .insert_coach(&Coach {
                    id: Uuid::new_v4(),
                    user_id: coach_user.id,
                    team_id: Some(team.id),
                })
                .unwrap();

            let user = User::new("xena".to_string(), "xena@club.org".to_string(), Role::Athlete);
            roster.insert_user(&user).unwrap();
            let mut athlete = Athlete::new(user.id);
            athlete.team_id = Some(team.id);
            let athlete = roster.insert_athlete(&athlete).unwrap();

            let loner = User::new("yuri".to_string(), "yuri@club.org".to_string(), Role::Athlete);
            roster.insert_user(&loner).unwrap();
            let teamless = roster.insert_athlete(&Athlete::new(loner.id)).unwrap();

            let games = GameStore::new(db.connection());
            let day = |d: u32| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
            let home_game = Game::new(team.id, "vs Rovers".to_string(), day(4));
            games.insert_game(&home_game).unwrap();
            let away_game = Game::new(other.id, "at Harbor".to_string(), day(11));
            games.insert_game(&away_game).unwrap();

            (
                roster.resolve_actor(admin.id).unwrap().unwrap(),
                roster.resolve_actor(coach_user.id).unwrap().unwrap(),
                athlete.id,
                teamless.id,
                home_game,
                away_game,
            )
        };
        League {
            db,
            admin: l.0,
            coach: l.1,
            athlete_id: l.2,
            teamless_id: l.3,
            home_game: l.4,
            away_game: l.5,
        }
    }

    fn raw(items: &[(&str, &str)]) -> HashMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn game_rows(db: &Database) -> i64 {
        db.connection()
            .query_row("SELECT COUNT(*) FROM game_stats", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_coach_reports_then_corrects_a_game() {
        let mut l = league();
        let coach = l.coach.clone();
        let settings = StatsSettings::default();
        let game_id = l.home_game.id;

        let (_, outcome) = submit_report(
            &mut l.db,
            &coach,
            game_id,
            l.athlete_id,
            &raw(&[("goals", "2"), ("saves", "1"), ("pts", "9")]),
            &settings,
        )
        .unwrap();
        assert!(matches!(outcome, ReportOutcome::Saved { applied: 2 }));

        submit_report(
            &mut l.db,
            &coach,
            game_id,
            l.athlete_id,
            &raw(&[("goals", "3"), ("saves", "")]),
            &settings,
        )
        .unwrap();

        let (context, form) = load_report(&l.db, &coach, game_id, l.athlete_id, &settings).unwrap();
        assert_eq!(context.game.name, "vs Rovers");
        let keys: Vec<&str> = form.fields().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["goals", "saves"]);
        assert_eq!(form.value("goals"), "3");
        assert_eq!(form.value("saves"), "1");
        assert_eq!(game_rows(&l.db), 2);
    }

    #[test]
    fn test_game_must_belong_to_the_athletes_team() {
        let mut l = league();
        let admin = l.admin.clone();
        let away = l.away_game.id;
        let err = submit_report(
            &mut l.db,
            &admin,
            away,
            l.athlete_id,
            &raw(&[("goals", "1")]),
            &StatsSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StatsError::NotInGame));
        assert_eq!(game_rows(&l.db), 0);
    }

    #[test]
    fn test_gate_errors_come_before_game_membership() {
        let l = league();
        let err = prepare_report(&l.db, &l.admin, l.home_game.id, l.teamless_id).unwrap_err();
        assert!(matches!(err, StatsError::NoTeam));

        let err = prepare_report(&l.db, &l.admin, Uuid::new_v4(), l.athlete_id).unwrap_err();
        assert!(matches!(err, StatsError::GameNotFound(_)));

        let err = prepare_report(&l.db, &l.admin, l.home_game.id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StatsError::AthleteNotFound(_)));
    }

    #[test]
    fn test_invalid_report_writes_nothing() {
        let mut l = league();
        let admin = l.admin.clone();
        let game_id = l.home_game.id;
        let settings = StatsSettings {
            max_value_length: 2,
            ..StatsSettings::default()
        };
        let (_, outcome) = submit_report(
            &mut l.db,
            &admin,
            game_id,
            l.athlete_id,
            &raw(&[("goals", "100"), ("saves", "1")]),
            &settings,
        )
        .unwrap();

        let ReportOutcome::Invalid(form) = outcome else {
            panic!("expected invalid outcome");
        };
        assert!(form.error("goals").is_some());
        assert_eq!(form.value("goals"), "100");
        assert_eq!(game_rows(&l.db), 0);
    }

    #[test]
    fn test_storage_failure_rolls_back_report() {
        let mut l = league();
        l.db.connection()
            .execute_batch(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON game_stats
                 WHEN NEW.value = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'rejected value'); END;",
            )
            .unwrap();
        let admin = l.admin.clone();
        let game_id = l.home_game.id;

        let err = submit_report(
            &mut l.db,
            &admin,
            game_id,
            l.athlete_id,
            &raw(&[("goals", "1"), ("saves", "boom")]),
            &StatsSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StatsError::Database(_)));
        assert_eq!(game_rows(&l.db), 0);
    }

    #[test]
    fn test_games_for_team_newest_first() {
        let l = league();
        let games = GameStore::new(l.db.connection());
        let mut later = Game::new(
            l.home_game.team_id,
            "vs Wanderers".to_string(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        later.location = "North Field".to_string();
        games.insert_game(&later).unwrap();

        let listed = games.games_for_team(l.home_game.team_id).unwrap();
        assert_eq!(listed, vec![later, l.home_game.clone()]);
    }
}
