//! Performance record storage and the scorecard upsert.
//!
//! Exactly one record exists per (athlete, statistic, year). A submission
//! writes every non-empty value in one transaction; blank values neither
//! create nor clear records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::stats::form::Scorecard;
use crate::stats::registry::StatisticRegistry;
use crate::storage::database::{timestamp_column, uuid_column};
use crate::storage::{Database, DatabaseError};

/// A stored performance value joined with its statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceRecord {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub statistic_id: Uuid,
    pub statistic_name: String,
    pub short_code: String,
    pub year: i32,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Store for per-year performance records.
pub struct PerformanceStore<'a> {
    conn: &'a Connection,
}

impl<'a> PerformanceStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create or overwrite the record for (athlete, statistic, year).
    pub fn upsert(
        &self,
        athlete_id: Uuid,
        statistic_id: Uuid,
        year: i32,
        value: &str,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO performance_stats (id, athlete_id, statistic_id, year, value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(athlete_id, statistic_id, year)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![
                Uuid::new_v4().to_string(),
                athlete_id.to_string(),
                statistic_id.to_string(),
                year,
                value,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Recorded values for one year keyed by short code, for pre-filling.
    pub fn values_for_year(
        &self,
        athlete_id: Uuid,
        year: i32,
    ) -> Result<HashMap<String, String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.short_name, p.value FROM performance_stats p
             JOIN statistics s ON s.id = p.statistic_id
             WHERE p.athlete_id = ?1 AND p.year = ?2",
        )?;
        let rows = stmt.query_map(params![athlete_id.to_string(), year], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    /// All records for an athlete, newest year first.
    pub fn records_for_athlete(
        &self,
        athlete_id: Uuid,
    ) -> Result<Vec<PerformanceRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.athlete_id, p.statistic_id, s.name, s.short_name,
                    p.year, p.value, p.updated_at
             FROM performance_stats p
             JOIN statistics s ON s.id = p.statistic_id
             WHERE p.athlete_id = ?1
             ORDER BY p.year DESC, s.sport_id IS NOT NULL, s.rowid",
        )?;
        let rows = stmt.query_map(params![athlete_id.to_string()], |row| {
            Ok(PerformanceRecord {
                id: uuid_column(row, 0)?,
                athlete_id: uuid_column(row, 1)?,
                statistic_id: uuid_column(row, 2)?,
                statistic_name: row.get(3)?,
                short_code: row.get(4)?,
                year: row.get(5)?,
                value: row.get(6)?,
                updated_at: timestamp_column(row, 7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Write a scorecard for an athlete of the given sport on an open connection
/// or transaction. Returns the number of records written.
pub fn apply_in(
    conn: &Connection,
    athlete_id: Uuid,
    sport_id: Uuid,
    scorecard: &Scorecard,
) -> Result<usize, DatabaseError> {
    let registry = StatisticRegistry::new(conn);
    let records = PerformanceStore::new(conn);
    let applicable = registry.resolve_applicable(sport_id)?;
    let mut applied = 0;

    for (short_code, display_name) in &applicable.universal {
        let Some(value) = non_empty(scorecard, short_code) else {
            continue;
        };
        let definition = registry.get_or_create_universal(short_code, display_name)?;
        records.upsert(athlete_id, definition.id, scorecard.year, value)?;
        applied += 1;
    }

    for definition in &applicable.specific {
        let Some(value) = non_empty(scorecard, &definition.short_code) else {
            continue;
        };
        records.upsert(athlete_id, definition.id, scorecard.year, value)?;
        applied += 1;
    }

    Ok(applied)
}

/// Write a scorecard atomically: either every value is stored or none is.
pub fn apply(
    db: &mut Database,
    athlete_id: Uuid,
    sport_id: Uuid,
    scorecard: &Scorecard,
) -> Result<usize, DatabaseError> {
    let tx = db.transaction()?;
    let applied = apply_in(&tx, athlete_id, sport_id, scorecard)?;
    tx.commit()
        .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
    Ok(applied)
}

fn non_empty<'s>(scorecard: &'s Scorecard, short_code: &str) -> Option<&'s str> {
    scorecard
        .values
        .get(short_code)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
