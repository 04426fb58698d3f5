//! Shared fixtures: a seeded roster served on an ephemeral port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rosterkit::roster::{Athlete, Coach, Gender, Role, RosterStore, Team, User};
use rosterkit::stats::{Game, GameStore};
use rosterkit::storage::AppConfig;
use rosterkit::{build_router, AppState, Database, StatisticRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

pub const YEAR: i32 = 2024;

/// Ids of everything the fixture seeds.
pub struct Club {
    pub addr: SocketAddr,
    pub db: Arc<Mutex<Database>>,
    pub admin: Uuid,
    pub coach: Uuid,
    pub rival_coach: Uuid,
    pub athlete_user: Uuid,
    pub athlete: Uuid,
    pub teamless: Uuid,
    pub team: Uuid,
    pub rival_team: Uuid,
    /// Played by `team`
    pub game: Uuid,
    /// Played by `rival_team`
    pub rival_game: Uuid,
}

pub struct Response {
    pub status: u16,
    pub head: String,
    pub body: String,
}

impl Response {
    pub fn location(&self) -> Option<String> {
        self.head.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("location")
                .then(|| value.trim().to_string())
        })
    }
}

fn user(store: &RosterStore<'_>, username: &str, role: Role) -> User {
    let mut user = User::new(username.to_string(), format!("{username}@club.org"), role);
    user.first_name = username.to_string();
    user.last_name = "Test".to_string();
    store.insert_user(&user).expect("insert user");
    user
}

fn coach(store: &RosterStore<'_>, username: &str, team: Uuid) -> Uuid {
    let user = user(store, username, Role::Coach);
    store
        .insert_coach(&Coach {
            id: Uuid::new_v4(),
            user_id: user.id,
            team_id: Some(team),
        })
        .expect("insert coach");
    user.id
}

/// Soccer club with one coached athlete, one teamless athlete, a rival team,
/// and one game for each team.
pub async fn start_club() -> Club {
    let db = Database::open_in_memory().expect("open db");
    let store = RosterStore::new(db.connection());

    let soccer = store.insert_sport("Soccer").expect("sport");
    let team = Team::new("United".to_string(), soccer.id, Gender::Female);
    store.insert_team(&team).expect("team");
    let rival_team = Team::new("City".to_string(), soccer.id, Gender::Female);
    store.insert_team(&rival_team).expect("rival team");

    let registry = StatisticRegistry::new(db.connection());
    registry
        .define_specific(soccer.id, "goals", "Goals")
        .expect("goals");
    registry.seed_universal().expect("seed universal");

    let admin = user(&store, "admin", Role::Administrator).id;
    let coach_id = coach(&store, "cora", team.id);
    let rival_coach = coach(&store, "rick", rival_team.id);

    let athlete_user = user(&store, "xena", Role::Athlete);
    let mut athlete = Athlete::new(athlete_user.id);
    athlete.team_id = Some(team.id);
    let athlete = store.insert_athlete(&athlete).expect("athlete");

    let loner = user(&store, "yuri", Role::Athlete);
    let teamless = store
        .insert_athlete(&Athlete::new(loner.id))
        .expect("teamless athlete");

    let games = GameStore::new(db.connection());
    let opening_day = NaiveDate::from_ymd_opt(YEAR, 5, 4).expect("date");
    let game = Game::new(team.id, "vs Rovers".to_string(), opening_day);
    games.insert_game(&game).expect("game");
    let rival_game = Game::new(rival_team.id, "at Harbor".to_string(), opening_day);
    games.insert_game(&rival_game).expect("rival game");

    let state = AppState::new(db, AppConfig::default()).with_current_year(YEAR);
    let shared = state.db.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

    Club {
        addr,
        db: shared,
        admin,
        coach: coach_id,
        rival_coach,
        athlete_user: athlete_user.id,
        athlete: athlete.id,
        teamless: teamless.id,
        team: team.id,
        rival_team: rival_team.id,
        game: game.id,
        rival_game: rival_game.id,
    }
}

/// Send one raw HTTP/1.1 request. `body` is sent form-encoded when present.
pub async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    user: Option<Uuid>,
    body: Option<&str>,
) -> Response {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");

    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(user) = user {
        req.push_str(&format!("X-Roster-User: {user}\r\n"));
    }
    match body {
        Some(body) => {
            req.push_str("Content-Type: application/x-www-form-urlencoded\r\n");
            req.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
        }
        None => req.push_str("\r\n"),
    }

    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    Response {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

/// Stored (short code, year, value) rows for an athlete.
pub fn stored_values(db: &Arc<Mutex<Database>>, athlete: Uuid) -> Vec<(String, i32, String)> {
    let db = db.lock().expect("db lock");
    rosterkit::stats::PerformanceStore::new(db.connection())
        .records_for_athlete(athlete)
        .expect("records")
        .into_iter()
        .map(|r| (r.short_code, r.year, r.value))
        .collect()
}

/// Stored per-game values for an athlete, keyed by short code.
pub fn game_values(
    db: &Arc<Mutex<Database>>,
    game: Uuid,
    athlete: Uuid,
) -> std::collections::HashMap<String, String> {
    let db = db.lock().expect("db lock");
    GameStore::new(db.connection())
        .values_for(game, athlete)
        .expect("game values")
}
