//! Database schema definitions for RosterKit.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Users table (identity records; credentials live with the identity provider)
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    gender TEXT NOT NULL DEFAULT 'unspecified',
    role TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email COLLATE NOCASE);

-- Sports table
CREATE TABLE IF NOT EXISTS sports (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Campuses table
CREATE TABLE IF NOT EXISTS campuses (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Teams table
CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sport_id TEXT NOT NULL REFERENCES sports(id),
    campus_id TEXT REFERENCES campuses(id),
    gender TEXT NOT NULL DEFAULT 'unspecified'
);

-- Coaches table
CREATE TABLE IF NOT EXISTS coaches (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    team_id TEXT REFERENCES teams(id) ON DELETE SET NULL
);

-- Athletes table
CREATE TABLE IF NOT EXISTS athletes (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    team_id TEXT REFERENCES teams(id) ON DELETE SET NULL,
    coach_id TEXT REFERENCES coaches(id) ON DELETE SET NULL,
    birthday TEXT,
    contact_details TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_athletes_team_id ON athletes(team_id);
CREATE INDEX IF NOT EXISTS idx_athletes_coach_id ON athletes(coach_id);

-- Statistic definitions (sport_id NULL = universal)
CREATE TABLE IF NOT EXISTS statistics (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    short_name TEXT NOT NULL,
    sport_id TEXT REFERENCES sports(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_statistics_sport_id ON statistics(sport_id);

-- Per-year performance records
CREATE TABLE IF NOT EXISTS performance_stats (
    id TEXT PRIMARY KEY,
    athlete_id TEXT NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
    statistic_id TEXT NOT NULL REFERENCES statistics(id) ON DELETE CASCADE,
    year INTEGER NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(athlete_id, statistic_id, year)
);

CREATE INDEX IF NOT EXISTS idx_performance_stats_athlete_year ON performance_stats(athlete_id, year);
"#;

/// Version 2: games and per-game statistics.
pub const MIGRATION_V2: &str = r#"
-- Games a team plays
CREATE TABLE IF NOT EXISTS games (
    id TEXT PRIMARY KEY,
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    played_on TEXT NOT NULL,
    location TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_games_team_played ON games(team_id, played_on);

-- Per-game values (sport-specific statistics only)
CREATE TABLE IF NOT EXISTS game_stats (
    id TEXT PRIMARY KEY,
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    athlete_id TEXT NOT NULL REFERENCES athletes(id) ON DELETE CASCADE,
    statistic_id TEXT NOT NULL REFERENCES statistics(id) ON DELETE CASCADE,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(game_id, athlete_id, statistic_id)
);
"#;

/// Schema version table for migrations.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;
