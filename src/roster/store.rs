//! Roster data storage operations.
//!
//! Provides persistence for:
//! - Users and the actor lookup used by the HTTP layer
//! - Sports, campuses, and teams
//! - Coach and athlete profiles
//! - Joined athlete summaries for list and detail views

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::roster::filter::{AthleteFilter, VisibilityScope};
use crate::roster::types::{
    Actor, Athlete, AthleteSummary, Campus, Coach, Gender, Sport, Team, User,
};
use crate::storage::database::{
    opt_date_column, opt_uuid_column, timestamp_column, uuid_column, DatabaseError,
};

const USER_COLUMNS: &str =
    "u.id, u.username, u.email, u.first_name, u.last_name, u.gender, u.role, u.created_at";

const SUMMARY_SELECT: &str = "SELECT a.id, a.user_id, a.team_id, a.coach_id, a.birthday, a.contact_details,
        u.id, u.username, u.email, u.first_name, u.last_name, u.gender, u.role, u.created_at,
        t.id, t.name, t.sport_id, t.campus_id, t.gender,
        s.id, s.name,
        c.id, c.name,
        co.id, cu.first_name, cu.last_name, cu.username
 FROM athletes a
 JOIN users u ON u.id = a.user_id
 LEFT JOIN teams t ON t.id = a.team_id
 LEFT JOIN sports s ON s.id = t.sport_id
 LEFT JOIN campuses c ON c.id = t.campus_id
 LEFT JOIN coaches co ON co.id = a.coach_id
 LEFT JOIN users cu ON cu.id = co.user_id";

/// Roster store for persisting organization data.
pub struct RosterStore<'a> {
    conn: &'a Connection,
}

impl<'a> RosterStore<'a> {
    /// Create a new roster store with the given connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== User Operations ==========

    /// Insert a user.
    pub fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO users (id, username, email, first_name, last_name, gender, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.first_name,
                user.last_name,
                user.gender.as_str(),
                user.role.as_str(),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a user by ID.
    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id.to_string()], |row| parse_user(row, 0))
            .optional()?)
    }

    /// Find a user by exact username.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users u WHERE u.username = ?1", USER_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![username], |row| parse_user(row, 0))
            .optional()?)
    }

    /// Whether any user has this email, ignoring ASCII case.
    pub fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Whether a user other than `user_id` has this email, ignoring ASCII case.
    pub fn email_taken_by_other(&self, email: &str, user_id: Uuid) -> Result<bool, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE AND id != ?2",
            params![email, user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Update a user's name, email and gender.
    pub fn update_user_details(&self, user: &User) -> Result<(), DatabaseError> {
        let updated = self.conn.execute(
            "UPDATE users SET first_name = ?2, last_name = ?3, email = ?4, gender = ?5
             WHERE id = ?1",
            params![
                user.id.to_string(),
                user.first_name,
                user.last_name,
                user.email,
                user.gender.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    /// Whether a username is taken.
    pub fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Delete users by ID. Athlete and coach profiles cascade.
    pub fn delete_users(&self, ids: &[Uuid]) -> Result<usize, DatabaseError> {
        let mut deleted = 0;
        for id in ids {
            deleted += self
                .conn
                .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        }
        Ok(deleted)
    }

    /// Resolve the request actor for a user ID.
    pub fn resolve_actor(&self, user_id: Uuid) -> Result<Option<Actor>, DatabaseError> {
        let Some(user) = self.get_user(user_id)? else {
            return Ok(None);
        };
        let coach = self.coach_for_user(user_id)?;
        let athlete = self.athlete_for_user(user_id)?;
        Ok(Some(Actor {
            user,
            coach,
            athlete,
        }))
    }

    // ========== Sport / Campus Operations ==========

    /// Create a sport.
    pub fn insert_sport(&self, name: &str) -> Result<Sport, DatabaseError> {
        let sport = Sport {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
        };
        self.conn.execute(
            "INSERT INTO sports (id, name) VALUES (?1, ?2)",
            params![sport.id.to_string(), sport.name],
        )?;
        Ok(sport)
    }

    /// Find a sport by name, ignoring ASCII case.
    pub fn find_sport_by_name(&self, name: &str) -> Result<Option<Sport>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM sports WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                |row| {
                    Ok(Sport {
                        id: uuid_column(row, 0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    /// Create a campus.
    pub fn insert_campus(&self, name: &str) -> Result<Campus, DatabaseError> {
        let campus = Campus {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
        };
        self.conn.execute(
            "INSERT INTO campuses (id, name) VALUES (?1, ?2)",
            params![campus.id.to_string(), campus.name],
        )?;
        Ok(campus)
    }

    /// Find a campus by name, ignoring ASCII case.
    pub fn find_campus_by_name(&self, name: &str) -> Result<Option<Campus>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM campuses WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                |row| {
                    Ok(Campus {
                        id: uuid_column(row, 0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    // ========== Team Operations ==========

    /// Insert a team.
    pub fn insert_team(&self, team: &Team) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO teams (id, name, sport_id, campus_id, gender) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                team.id.to_string(),
                team.name,
                team.sport_id.to_string(),
                team.campus_id.map(|id| id.to_string()),
                team.gender.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Get a team by ID.
    pub fn get_team(&self, id: Uuid) -> Result<Option<Team>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, sport_id, campus_id, gender FROM teams WHERE id = ?1",
                params![id.to_string()],
                |row| parse_team(row, 0),
            )
            .optional()?)
    }

    /// Find a team by name, ignoring ASCII case.
    pub fn find_team_by_name(&self, name: &str) -> Result<Option<Team>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, sport_id, campus_id, gender FROM teams
                 WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                |row| parse_team(row, 0),
            )
            .optional()?)
    }

    /// All teams ordered by name.
    pub fn list_teams(&self) -> Result<Vec<Team>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, sport_id, campus_id, gender FROM teams ORDER BY name")?;
        let rows = stmt.query_map([], |row| parse_team(row, 0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ========== Coach Operations ==========

    /// Insert a coach profile.
    pub fn insert_coach(&self, coach: &Coach) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO coaches (id, user_id, team_id) VALUES (?1, ?2, ?3)",
            params![
                coach.id.to_string(),
                coach.user_id.to_string(),
                coach.team_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }

    /// Coach profile for a user, if any.
    pub fn coach_for_user(&self, user_id: Uuid) -> Result<Option<Coach>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, team_id FROM coaches WHERE user_id = ?1",
                params![user_id.to_string()],
                parse_coach,
            )
            .optional()?)
    }

    /// The coach assigned to a team, if any.
    pub fn coach_for_team(&self, team_id: Uuid) -> Result<Option<Coach>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, team_id FROM coaches WHERE team_id = ?1
                 ORDER BY rowid LIMIT 1",
                params![team_id.to_string()],
                parse_coach,
            )
            .optional()?)
    }

    /// Give the team's uncoached athletes this coach. Returns rows updated.
    pub fn assign_coach_to_team_athletes(
        &self,
        coach_id: Uuid,
        team_id: Uuid,
    ) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute(
            "UPDATE athletes SET coach_id = ?1 WHERE team_id = ?2 AND coach_id IS NULL",
            params![coach_id.to_string(), team_id.to_string()],
        )?)
    }

    // ========== Athlete Operations ==========

    /// Insert an athlete profile.
    ///
    /// When the athlete has a team but no coach, the team's coach is assigned.
    pub fn insert_athlete(&self, athlete: &Athlete) -> Result<Athlete, DatabaseError> {
        let mut athlete = athlete.clone();
        if athlete.coach_id.is_none() {
            if let Some(team_id) = athlete.team_id {
                athlete.coach_id = self.coach_for_team(team_id)?.map(|c| c.id);
            }
        }

        self.conn.execute(
            "INSERT INTO athletes (id, user_id, team_id, coach_id, birthday, contact_details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                athlete.id.to_string(),
                athlete.user_id.to_string(),
                athlete.team_id.map(|id| id.to_string()),
                athlete.coach_id.map(|id| id.to_string()),
                athlete.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
                athlete.contact_details,
            ],
        )?;
        Ok(athlete)
    }

    /// Get an athlete by ID.
    pub fn get_athlete(&self, id: Uuid) -> Result<Option<Athlete>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, team_id, coach_id, birthday, contact_details
                 FROM athletes WHERE id = ?1",
                params![id.to_string()],
                |row| parse_athlete(row, 0),
            )
            .optional()?)
    }

    /// Update an athlete's birthday and contact details.
    pub fn update_athlete_details(&self, athlete: &Athlete) -> Result<(), DatabaseError> {
        let updated = self.conn.execute(
            "UPDATE athletes SET birthday = ?2, contact_details = ?3 WHERE id = ?1",
            params![
                athlete.id.to_string(),
                athlete.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
                athlete.contact_details,
            ],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(format!("athlete {}", athlete.id)));
        }
        Ok(())
    }

    /// Athlete profile for a user, if any.
    pub fn athlete_for_user(&self, user_id: Uuid) -> Result<Option<Athlete>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, team_id, coach_id, birthday, contact_details
                 FROM athletes WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| parse_athlete(row, 0),
            )
            .optional()?)
    }

    /// Joined summary for one athlete.
    pub fn athlete_summary(&self, id: Uuid) -> Result<Option<AthleteSummary>, DatabaseError> {
        let sql = format!("{} WHERE a.id = ?1", SUMMARY_SELECT);
        Ok(self
            .conn
            .query_row(&sql, params![id.to_string()], parse_summary)
            .optional()?)
    }

    /// Joined summaries inside a visibility scope, narrowed by a filter,
    /// ordered by first name.
    pub fn list_athlete_summaries(
        &self,
        scope: &VisibilityScope,
        filter: &AthleteFilter,
    ) -> Result<Vec<AthleteSummary>, DatabaseError> {
        let team_scope = match scope {
            VisibilityScope::All => None,
            VisibilityScope::Team(team_id) => Some(team_id.to_string()),
            VisibilityScope::Nothing => return Ok(Vec::new()),
        };

        let sql = format!(
            "{}
             WHERE (?1 IS NULL OR a.team_id = ?1)
               AND (?2 IS NULL OR t.sport_id = ?2)
               AND (?3 IS NULL OR t.campus_id = ?3)
               AND (?4 IS NULL OR a.coach_id = ?4)
               AND (?5 IS NULL OR u.gender = ?5)
             ORDER BY u.first_name, u.last_name",
            SUMMARY_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                team_scope,
                filter.sport.map(|id| id.to_string()),
                filter.campus.map(|id| id.to_string()),
                filter.coach.map(|id| id.to_string()),
                filter.gender.map(|g| g.as_str()),
            ],
            parse_summary,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn parse_user(row: &Row<'_>, base: usize) -> rusqlite::Result<User> {
    let gender: String = row.get(base + 5)?;
    let role: String = row.get(base + 6)?;
    Ok(User {
        id: uuid_column(row, base)?,
        username: row.get(base + 1)?,
        email: row.get(base + 2)?,
        first_name: row.get(base + 3)?,
        last_name: row.get(base + 4)?,
        gender: gender.parse().unwrap_or_default(),
        role: role.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(base + 6, rusqlite::types::Type::Text, e.into())
        })?,
        created_at: timestamp_column(row, base + 7)?,
    })
}

fn parse_team(row: &Row<'_>, base: usize) -> rusqlite::Result<Team> {
    let gender: String = row.get(base + 4)?;
    Ok(Team {
        id: uuid_column(row, base)?,
        name: row.get(base + 1)?,
        sport_id: uuid_column(row, base + 2)?,
        campus_id: opt_uuid_column(row, base + 3)?,
        gender: gender.parse::<Gender>().unwrap_or_default(),
    })
}

fn parse_coach(row: &Row<'_>) -> rusqlite::Result<Coach> {
    Ok(Coach {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        team_id: opt_uuid_column(row, 2)?,
    })
}

fn parse_athlete(row: &Row<'_>, base: usize) -> rusqlite::Result<Athlete> {
    Ok(Athlete {
        id: uuid_column(row, base)?,
        user_id: uuid_column(row, base + 1)?,
        team_id: opt_uuid_column(row, base + 2)?,
        coach_id: opt_uuid_column(row, base + 3)?,
        birthday: opt_date_column(row, base + 4)?,
        contact_details: row.get(base + 5)?,
    })
}

fn parse_summary(row: &Row<'_>) -> rusqlite::Result<AthleteSummary> {
    let athlete = parse_athlete(row, 0)?;
    let user = parse_user(row, 6)?;

    let team = match opt_uuid_column(row, 14)? {
        Some(_) => Some(parse_team(row, 14)?),
        None => None,
    };
    let sport = match opt_uuid_column(row, 19)? {
        Some(id) => Some(Sport {
            id,
            name: row.get(20)?,
        }),
        None => None,
    };
    let campus = match opt_uuid_column(row, 21)? {
        Some(id) => Some(Campus {
            id,
            name: row.get(22)?,
        }),
        None => None,
    };
    let coach = match opt_uuid_column(row, 23)? {
        Some(id) => {
            let first: Option<String> = row.get(24)?;
            let last: Option<String> = row.get(25)?;
            let username: Option<String> = row.get(26)?;
            let name = format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default());
            let name = name.trim();
            let name = if name.is_empty() {
                username.unwrap_or_default()
            } else {
                name.to_string()
            };
            Some((id, name))
        }
        None => None,
    };

    Ok(AthleteSummary {
        athlete,
        user,
        team,
        sport,
        campus,
        coach,
    })
}
