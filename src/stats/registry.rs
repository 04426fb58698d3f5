//! Statistic schema registry.
//!
//! Universal statistics come from a fixed list and apply to every sport; they
//! are persisted lazily the first time a value is recorded (or up front via
//! [`StatisticRegistry::seed_universal`]). Sport-specific statistics are
//! persisted definitions owned by one sport.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::stats::StatsError;
use crate::storage::database::{opt_uuid_column, uuid_column, DatabaseError};

/// Statistics tracked for every athlete regardless of sport: (short code, display name).
pub const UNIVERSAL_STATISTICS: [(&str, &str); 4] = [
    ("games_played", "Games Played"),
    ("pts", "Points"),
    ("assists", "Assists"),
    ("minutes", "Minutes Played"),
];

/// A persisted statistic definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticDefinition {
    pub id: Uuid,
    pub display_name: String,
    /// Form-field key, unique within the statistics visible for a sport
    pub short_code: String,
    /// None for universal statistics
    pub sport_id: Option<Uuid>,
}

impl StatisticDefinition {
    pub fn is_universal(&self) -> bool {
        self.sport_id.is_none()
    }
}

/// The statistics that apply to one sport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicableStatistics {
    /// (short code, display name), in list order
    pub universal: Vec<(&'static str, &'static str)>,
    /// Definitions owned by the sport, in insertion order
    pub specific: Vec<StatisticDefinition>,
}

impl ApplicableStatistics {
    /// Universal statistics only, for a sport with no custom definitions.
    pub fn universal_only() -> Self {
        Self {
            universal: UNIVERSAL_STATISTICS.to_vec(),
            specific: Vec::new(),
        }
    }

    /// All (short code, display name) pairs, universal first.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = Vec::with_capacity(self.len());
        for (code, name) in &self.universal {
            entries.push((*code, *name));
        }
        for definition in &self.specific {
            entries.push((definition.short_code.as_str(), definition.display_name.as_str()));
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.universal.len() + self.specific.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, short_code: &str) -> bool {
        self.universal.iter().any(|(code, _)| *code == short_code)
            || self.specific.iter().any(|d| d.short_code == short_code)
    }
}

/// Registry of statistic definitions backed by the `statistics` table.
pub struct StatisticRegistry<'a> {
    conn: &'a Connection,
}

impl<'a> StatisticRegistry<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Resolve the universal and sport-specific statistics for a sport.
    ///
    /// Specific definitions whose short code collides with a universal code
    /// are left out so that field keys stay unique.
    pub fn resolve_applicable(&self, sport_id: Uuid) -> Result<ApplicableStatistics, DatabaseError> {
        let mut applicable = ApplicableStatistics::universal_only();

        for definition in self.specific_for_sport(sport_id)? {
            if applicable.contains(&definition.short_code) {
                tracing::warn!(
                    sport = %sport_id,
                    short_code = %definition.short_code,
                    "Ignoring statistic whose short code is already in use"
                );
                continue;
            }
            applicable.specific.push(definition);
        }

        Ok(applicable)
    }

    /// Definitions owned by a sport, in insertion order.
    pub fn specific_for_sport(&self, sport_id: Uuid) -> Result<Vec<StatisticDefinition>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, short_name, sport_id FROM statistics
             WHERE sport_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![sport_id.to_string()], parse_definition)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Get a definition by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<StatisticDefinition>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, short_name, sport_id FROM statistics WHERE id = ?1",
                params![id.to_string()],
                parse_definition,
            )
            .optional()?)
    }

    /// Define a statistic for one sport.
    pub fn define_specific(
        &self,
        sport_id: Uuid,
        short_code: &str,
        display_name: &str,
    ) -> Result<StatisticDefinition, StatsError> {
        let short_code = short_code.trim();
        let display_name = display_name.trim();

        if short_code.is_empty() || display_name.is_empty() {
            return Err(StatsError::InvalidDefinition(
                "Short code and display name are required".to_string(),
            ));
        }
        if short_code == crate::stats::form::YEAR_FIELD
            || !short_code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(StatsError::InvalidDefinition(format!(
                "'{}' cannot be used as a short code",
                short_code
            )));
        }
        if self.resolve_applicable(sport_id)?.contains(short_code) {
            return Err(StatsError::InvalidDefinition(format!(
                "Short code '{}' is already used for this sport",
                short_code
            )));
        }

        let definition = StatisticDefinition {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            short_code: short_code.to_string(),
            sport_id: Some(sport_id),
        };
        self.insert(&definition)?;
        Ok(definition)
    }

    /// Find the universal definition with this display name, creating it with
    /// the given short code when absent.
    pub fn get_or_create_universal(
        &self,
        short_code: &str,
        display_name: &str,
    ) -> Result<StatisticDefinition, DatabaseError> {
        let existing = self
            .conn
            .query_row(
                "SELECT id, name, short_name, sport_id FROM statistics
                 WHERE name = ?1 AND sport_id IS NULL ORDER BY rowid LIMIT 1",
                params![display_name],
                parse_definition,
            )
            .optional()?;

        if let Some(definition) = existing {
            return Ok(definition);
        }

        let definition = StatisticDefinition {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            short_code: short_code.to_string(),
            sport_id: None,
        };
        self.insert(&definition)?;
        tracing::info!(short_code, display_name, "Created universal statistic");
        Ok(definition)
    }

    /// Persist every universal statistic that does not exist yet.
    ///
    /// Returns the number of definitions present afterwards.
    pub fn seed_universal(&self) -> Result<usize, DatabaseError> {
        for (short_code, display_name) in UNIVERSAL_STATISTICS {
            self.get_or_create_universal(short_code, display_name)?;
        }
        Ok(UNIVERSAL_STATISTICS.len())
    }

    fn insert(&self, definition: &StatisticDefinition) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO statistics (id, name, short_name, sport_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                definition.id.to_string(),
                definition.display_name,
                definition.short_code,
                definition.sport_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }
}

fn parse_definition(row: &Row<'_>) -> rusqlite::Result<StatisticDefinition> {
    Ok(StatisticDefinition {
        id: uuid_column(row, 0)?,
        display_name: row.get(1)?,
        short_code: row.get(2)?,
        sport_id: opt_uuid_column(row, 3)?,
    })
}
