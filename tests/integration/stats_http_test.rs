//! End-to-end tests for the manage-statistics pages.

use crate::support::{game_values, send_raw, start_club, stored_values, YEAR};

fn stats_path(athlete: uuid::Uuid) -> String {
    format!("/athletes/{athlete}/stats")
}

fn report_path(game: uuid::Uuid, athlete: uuid::Uuid) -> String {
    format!("/games/{game}/athletes/{athlete}/report")
}

#[tokio::test]
async fn test_coach_records_then_partially_updates_a_season() {
    let club = start_club().await;
    let path = stats_path(club.athlete);

    let form = send_raw(club.addr, "GET", &path, Some(club.coach), None).await;
    assert_eq!(form.status, 200);
    assert!(form.body.contains("name=\"year\""));
    assert!(form.body.contains(&format!("value=\"{YEAR}\"")));
    assert!(form.body.contains("name=\"pts\""));
    assert!(form.body.contains("name=\"goals\""));

    let saved = send_raw(
        club.addr,
        "POST",
        &path,
        Some(club.coach),
        Some("year=2024&pts=10&goals=3"),
    )
    .await;
    assert_eq!(saved.status, 303);
    let location = saved.location().expect("location");
    assert!(location.starts_with(&format!("/athletes/{}?msg=success", club.athlete)));

    let saved = send_raw(
        club.addr,
        "POST",
        &path,
        Some(club.coach),
        Some("year=2024&pts=12&goals="),
    )
    .await;
    assert_eq!(saved.status, 303);

    assert_eq!(
        stored_values(&club.db, club.athlete),
        vec![
            ("pts".to_string(), 2024, "12".to_string()),
            ("goals".to_string(), 2024, "3".to_string()),
        ]
    );

    let form = send_raw(club.addr, "GET", &path, Some(club.coach), None).await;
    assert!(form.body.contains("name=\"pts\" id=\"id_pts\" value=\"12\""));
    assert!(form.body.contains("name=\"goals\" id=\"id_goals\" value=\"3\""));

    let detail = send_raw(club.addr, "GET", &location, Some(club.coach), None).await;
    assert_eq!(detail.status, 200);
    assert!(detail
        .body
        .contains("Statistics for 2024 have been updated successfully."));
    assert!(detail.body.contains("Tracked: Points, Goals"));
}

#[tokio::test]
async fn test_other_coach_and_athletes_are_turned_away() {
    let club = start_club().await;
    let path = stats_path(club.athlete);

    for actor in [club.rival_coach, club.athlete_user] {
        let response = send_raw(
            club.addr,
            "POST",
            &path,
            Some(actor),
            Some("year=2024&pts=10"),
        )
        .await;
        assert_eq!(response.status, 303);
        let location = response.location().expect("location");
        assert!(location.starts_with(&format!("/athletes/{}?msg=error", club.athlete)));

        let form = send_raw(club.addr, "GET", &path, Some(actor), None).await;
        assert_eq!(form.status, 303);
    }
    assert!(stored_values(&club.db, club.athlete).is_empty());
}

#[tokio::test]
async fn test_teamless_athlete_blocks_even_admins() {
    let club = start_club().await;
    let response = send_raw(
        club.addr,
        "POST",
        &stats_path(club.teamless),
        Some(club.admin),
        Some("year=2024&pts=1"),
    )
    .await;
    assert_eq!(response.status, 303);

    let detail = send_raw(
        club.addr,
        "GET",
        &response.location().expect("location"),
        Some(club.admin),
        None,
    )
    .await;
    assert!(detail
        .body
        .contains("Cannot manage stats for an athlete with no team assigned."));
    assert!(stored_values(&club.db, club.teamless).is_empty());
}

#[tokio::test]
async fn test_invalid_year_rerenders_with_input_kept() {
    let club = start_club().await;
    let response = send_raw(
        club.addr,
        "POST",
        &stats_path(club.athlete),
        Some(club.admin),
        Some("year=next&goals=4"),
    )
    .await;
    assert_eq!(response.status, 200);
    assert!(response.body.contains("Enter a whole number."));
    assert!(response.body.contains("value=\"next\""));
    assert!(response.body.contains("name=\"goals\" id=\"id_goals\" value=\"4\""));
    assert!(stored_values(&club.db, club.athlete).is_empty());
}

#[tokio::test]
async fn test_missing_identity_and_unknown_athletes() {
    let club = start_club().await;

    let anonymous = send_raw(club.addr, "GET", &stats_path(club.athlete), None, None).await;
    assert_eq!(anonymous.status, 401);

    let stranger = send_raw(
        club.addr,
        "GET",
        &stats_path(club.athlete),
        Some(uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(stranger.status, 401);

    let unknown = send_raw(
        club.addr,
        "GET",
        &stats_path(uuid::Uuid::new_v4()),
        Some(club.admin),
        None,
    )
    .await;
    assert_eq!(unknown.status, 404);

    let malformed = send_raw(club.addr, "GET", "/athletes/abc/stats", Some(club.admin), None).await;
    assert_eq!(malformed.status, 404);
}

#[tokio::test]
async fn test_storage_failure_redirects_with_error_and_saves_nothing() {
    let club = start_club().await;
    club.db
        .lock()
        .expect("db lock")
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON performance_stats
             WHEN NEW.value = 'boom'
             BEGIN SELECT RAISE(ABORT, 'rejected value'); END;",
        )
        .expect("install trigger");

    let response = send_raw(
        club.addr,
        "POST",
        &stats_path(club.athlete),
        Some(club.coach),
        Some("year=2024&pts=1&goals=boom"),
    )
    .await;
    assert_eq!(response.status, 303);
    let location = response.location().expect("location");
    assert!(location.starts_with(&format!("/athletes/{}?msg=error", club.athlete)));

    let detail = send_raw(club.addr, "GET", &location, Some(club.coach), None).await;
    assert!(detail
        .body
        .contains("Statistics could not be saved due to a server error. Please try again."));
    assert!(stored_values(&club.db, club.athlete).is_empty());
}

#[tokio::test]
async fn test_coach_enters_a_game_report_from_the_detail_page() {
    let club = start_club().await;
    let path = report_path(club.game, club.athlete);

    let detail = send_raw(
        club.addr,
        "GET",
        &format!("/athletes/{}", club.athlete),
        Some(club.coach),
        None,
    )
    .await;
    assert!(detail.body.contains("vs Rovers"));
    assert!(detail.body.contains(&format!("href=\"{path}\"")));

    let form = send_raw(club.addr, "GET", &path, Some(club.coach), None).await;
    assert_eq!(form.status, 200);
    assert!(form.body.contains("name=\"goals\""));
    assert!(!form.body.contains("name=\"pts\""));
    assert!(!form.body.contains("name=\"year\""));

    let saved = send_raw(club.addr, "POST", &path, Some(club.coach), Some("goals=2&pts=9")).await;
    assert_eq!(saved.status, 303);
    let location = saved.location().expect("location");
    assert!(location.starts_with(&format!("/athletes/{}?msg=success", club.athlete)));

    let detail = send_raw(club.addr, "GET", &location, Some(club.coach), None).await;
    assert!(detail
        .body
        .contains("Game report for &#39;vs Rovers&#39; has been saved."));

    let values = game_values(&club.db, club.game, club.athlete);
    assert_eq!(values.len(), 1);
    assert_eq!(values.get("goals").map(String::as_str), Some("2"));
    assert!(stored_values(&club.db, club.athlete).is_empty());

    let form = send_raw(club.addr, "GET", &path, Some(club.coach), None).await;
    assert!(form.body.contains("name=\"goals\" id=\"id_goals\" value=\"2\""));
}

#[tokio::test]
async fn test_game_reports_are_gated_like_season_stats() {
    let club = start_club().await;

    let athlete_view = send_raw(
        club.addr,
        "GET",
        &format!("/athletes/{}", club.athlete),
        Some(club.athlete_user),
        None,
    )
    .await;
    assert!(athlete_view.body.contains("vs Rovers"));
    assert!(!athlete_view.body.contains("Enter report"));

    let response = send_raw(
        club.addr,
        "POST",
        &report_path(club.game, club.athlete),
        Some(club.rival_coach),
        Some("goals=1"),
    )
    .await;
    assert_eq!(response.status, 303);
    assert!(response
        .location()
        .expect("location")
        .starts_with(&format!("/athletes/{}?msg=error", club.athlete)));

    let response = send_raw(
        club.addr,
        "POST",
        &report_path(club.rival_game, club.athlete),
        Some(club.admin),
        Some("goals=1"),
    )
    .await;
    assert_eq!(response.status, 303);
    let detail = send_raw(
        club.addr,
        "GET",
        &response.location().expect("location"),
        Some(club.admin),
        None,
    )
    .await;
    assert!(detail
        .body
        .contains("This athlete is not on the team playing this game."));
    assert!(game_values(&club.db, club.rival_game, club.athlete).is_empty());
    assert!(game_values(&club.db, club.game, club.athlete).is_empty());

    let unknown = send_raw(
        club.addr,
        "GET",
        &report_path(uuid::Uuid::new_v4(), club.athlete),
        Some(club.admin),
        None,
    )
    .await;
    assert_eq!(unknown.status, 404);
}
