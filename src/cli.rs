//! Administrative subcommands for the `rosterkit` binary.
//!
//! Seed the roster from the shell: administrators, sports, campuses, teams,
//! sport-specific statistics, coaches and games. Every command prints the id
//! of the row it created.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::roster::{Coach, Gender, Role, RosterStore, Team, User};
use crate::stats::{Game, GameStore, StatisticRegistry, StatsError};
use crate::storage::{Database, DatabaseError};

/// Sports roster and athlete statistics manager.
#[derive(Debug, Parser)]
#[command(name = "rosterkit", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The requested command; serving when none is given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create an administrator
    CreateAdmin { username: String, email: String },
    /// Create a sport
    AddSport { name: String },
    /// Create a campus
    AddCampus { name: String },
    /// Create a team
    AddTeam {
        name: String,
        sport: String,
        /// male, female, other or unspecified
        gender: Gender,
        campus: Option<String>,
    },
    /// Define a sport-specific statistic
    AddStat {
        sport: String,
        short_code: String,
        /// Display name; remaining words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        display_name: Vec<String>,
    },
    /// Create a coach assigned to a team
    AddCoach {
        username: String,
        email: String,
        team: String,
    },
    /// Schedule a game for a team
    AddGame {
        team: String,
        name: String,
        /// YYYY-MM-DD
        date: NaiveDate,
        #[arg(long)]
        location: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Run an administrative command and return the created id.
///
/// `Serve` is handled by the binary and is rejected here.
pub fn execute(db: &mut Database, command: &Command) -> Result<Uuid, CliError> {
    match command {
        Command::Serve => Err(CliError::Invalid(
            "serve is not an administrative command".to_string(),
        )),
        Command::CreateAdmin { username, email } => {
            let store = RosterStore::new(db.connection());
            ensure_new_user(&store, username, email)?;
            let user = User::new(username.clone(), email.clone(), Role::Administrator);
            store.insert_user(&user)?;
            tracing::info!(username = %user.username, "Created administrator");
            Ok(user.id)
        }
        Command::AddSport { name } => {
            let sport = RosterStore::new(db.connection()).insert_sport(name.trim())?;
            Ok(sport.id)
        }
        Command::AddCampus { name } => {
            let campus = RosterStore::new(db.connection()).insert_campus(name.trim())?;
            Ok(campus.id)
        }
        Command::AddTeam {
            name,
            sport,
            gender,
            campus,
        } => {
            let store = RosterStore::new(db.connection());
            let sport = store
                .find_sport_by_name(sport)?
                .ok_or_else(|| CliError::Invalid(format!("Unknown sport '{}'", sport)))?;
            let mut team = Team::new(name.trim().to_string(), sport.id, *gender);
            if let Some(campus) = campus {
                let campus = store
                    .find_campus_by_name(campus)?
                    .ok_or_else(|| CliError::Invalid(format!("Unknown campus '{}'", campus)))?;
                team.campus_id = Some(campus.id);
            }
            store.insert_team(&team)?;
            Ok(team.id)
        }
        Command::AddStat {
            sport,
            short_code,
            display_name,
        } => {
            let sport = RosterStore::new(db.connection())
                .find_sport_by_name(sport)?
                .ok_or_else(|| CliError::Invalid(format!("Unknown sport '{}'", sport)))?;
            let definition = StatisticRegistry::new(db.connection()).define_specific(
                sport.id,
                short_code,
                &display_name.join(" "),
            )?;
            Ok(definition.id)
        }
        Command::AddGame {
            team,
            name,
            date,
            location,
        } => {
            let team = RosterStore::new(db.connection())
                .find_team_by_name(team)?
                .ok_or_else(|| CliError::Invalid(format!("Unknown team '{}'", team)))?;
            let mut game = Game::new(team.id, name.trim().to_string(), *date);
            game.location = location.as_deref().unwrap_or_default().trim().to_string();
            GameStore::new(db.connection()).insert_game(&game)?;
            tracing::info!(team = %team.name, game = %game.name, "Scheduled game");
            Ok(game.id)
        }
        Command::AddCoach {
            username,
            email,
            team,
        } => {
            let tx = db.transaction()?;
            let coach = {
                let store = RosterStore::new(&tx);
                let team = store
                    .find_team_by_name(team)?
                    .ok_or_else(|| CliError::Invalid(format!("Unknown team '{}'", team)))?;
                ensure_new_user(&store, username, email)?;

                let user = User::new(username.clone(), email.clone(), Role::Coach);
                store.insert_user(&user)?;
                let coach = Coach {
                    id: Uuid::new_v4(),
                    user_id: user.id,
                    team_id: Some(team.id),
                };
                store.insert_coach(&coach)?;
                let assigned = store.assign_coach_to_team_athletes(coach.id, team.id)?;
                tracing::info!(
                    username = %user.username,
                    team = %team.name,
                    assigned,
                    "Created coach"
                );
                coach
            };
            tx.commit()
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
            Ok(coach.user_id)
        }
    }
}

fn ensure_new_user(store: &RosterStore<'_>, username: &str, email: &str) -> Result<(), CliError> {
    if store.username_exists(username)? {
        return Err(CliError::Invalid(format!(
            "Username '{}' is already taken",
            username
        )));
    }
    if store.email_exists(email)? {
        return Err(CliError::Invalid(format!(
            "Email '{}' is already registered",
            email
        )));
    }
    Ok(())
}
