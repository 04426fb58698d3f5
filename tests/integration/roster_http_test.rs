//! End-to-end tests for the athlete list, bulk delete and bulk enrollment.

use rosterkit::roster::RosterStore;

use crate::support::{send_raw, start_club};

#[tokio::test]
async fn test_healthz() {
    let club = start_club().await;
    let response = send_raw(club.addr, "GET", "/healthz", None, None).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_list_is_scoped_by_role() {
    let club = start_club().await;

    let admin = send_raw(club.addr, "GET", "/athletes", Some(club.admin), None).await;
    assert_eq!(admin.status, 200);
    assert!(admin.body.contains("xena Test"));
    assert!(admin.body.contains("yuri Test"));
    assert!(admin.body.contains("Delete selected"));

    let coach = send_raw(club.addr, "GET", "/athletes", Some(club.coach), None).await;
    assert!(coach.body.contains("xena Test"));
    assert!(!coach.body.contains("yuri Test"));

    let rival = send_raw(club.addr, "GET", "/athletes", Some(club.rival_coach), None).await;
    assert!(rival.body.contains("No athletes found."));

    let teammate = send_raw(club.addr, "GET", "/athletes", Some(club.athlete_user), None).await;
    assert!(teammate.body.contains("xena Test"));
    assert!(!teammate.body.contains("Delete selected"));

    let anonymous = send_raw(club.addr, "GET", "/athletes", None, None).await;
    assert_eq!(anonymous.status, 401);
}

#[tokio::test]
async fn test_bulk_delete_respects_scope_and_role() {
    let club = start_club().await;
    let body = format!(
        "athlete_ids={}&athlete_ids={}",
        club.athlete, club.teamless
    );

    let denied = send_raw(
        club.addr,
        "POST",
        "/athletes/delete",
        Some(club.athlete_user),
        Some(&body),
    )
    .await;
    assert_eq!(denied.status, 303);
    assert!(denied.location().expect("location").contains("msg=error"));

    // The coach only reaches their own team, so the teamless athlete survives
    let deleted = send_raw(
        club.addr,
        "POST",
        "/athletes/delete",
        Some(club.coach),
        Some(&body),
    )
    .await;
    assert_eq!(deleted.status, 303);
    let location = deleted.location().expect("location");
    let list = send_raw(club.addr, "GET", &location, Some(club.admin), None).await;
    assert!(list.body.contains("Successfully deleted 1 athlete(s)."));
    assert!(!list.body.contains("xena Test"));
    assert!(list.body.contains("yuri Test"));
}

#[tokio::test]
async fn test_bulk_enrollment_creates_team_athletes() {
    let club = start_club().await;
    let path = format!("/athletes/bulk-add?team={}", club.team);

    let picker = send_raw(club.addr, "GET", "/athletes/bulk-add", Some(club.coach), None).await;
    assert_eq!(picker.status, 200);
    assert!(picker.body.contains(&club.team.to_string()));
    assert!(!picker.body.contains(&club.rival_team.to_string()));

    let formset = send_raw(club.addr, "GET", &path, Some(club.coach), None).await;
    assert_eq!(formset.status, 200);
    assert!(formset.body.contains("name=\"form-0-email\""));

    let body = "form-TOTAL_FORMS=3\
        &form-0-first_name=Ana&form-0-last_name=Lima&form-0-email=ana%40club.org&form-0-birthday=2007-05-01\
        &form-1-first_name=Bo&form-1-last_name=Kim&form-1-email=XENA%40club.org\
        &form-2-first_name=&form-2-last_name=&form-2-email=";
    let response = send_raw(club.addr, "POST", &path, Some(club.coach), Some(body)).await;
    assert_eq!(response.status, 303);

    let list = send_raw(
        club.addr,
        "GET",
        &response.location().expect("location"),
        Some(club.coach),
        None,
    )
    .await;
    assert!(list.body.contains("Successfully added 1 new athletes to team &#39;United&#39;!"));
    assert!(list
        .body
        .contains("Skipped athlete with email &#39;XENA@club.org&#39; as it already exists or was duplicated."));
    assert!(list.body.contains("Ana Lima"));

    let db = club.db.lock().expect("db lock");
    let store = RosterStore::new(db.connection());
    let user = store
        .find_user_by_username("ana.lima")
        .expect("query")
        .expect("created user");
    let athlete = store.athlete_for_user(user.id).expect("query").expect("athlete");
    assert_eq!(athlete.team_id, Some(club.team));
    assert!(athlete.coach_id.is_some());
}

#[tokio::test]
async fn test_bulk_enrollment_rejects_bad_rows_and_teams() {
    let club = start_club().await;

    let invalid_team = send_raw(
        club.addr,
        "GET",
        "/athletes/bulk-add?team=nope",
        Some(club.admin),
        None,
    )
    .await;
    assert_eq!(invalid_team.status, 303);
    assert!(invalid_team
        .location()
        .expect("location")
        .contains("Invalid+Team+selected."));

    let foreign = send_raw(
        club.addr,
        "GET",
        &format!("/athletes/bulk-add?team={}", club.rival_team),
        Some(club.coach),
        None,
    )
    .await;
    assert_eq!(foreign.status, 303);

    let path = format!("/athletes/bulk-add?team={}", club.team);
    let body = "form-TOTAL_FORMS=1&form-0-first_name=Ana&form-0-last_name=&form-0-email=not-an-email";
    let rerender = send_raw(club.addr, "POST", &path, Some(club.admin), Some(body)).await;
    assert_eq!(rerender.status, 200);
    assert!(rerender.body.contains("This field is required."));
    assert!(rerender.body.contains("Enter a valid email address."));
    assert!(rerender.body.contains("value=\"Ana\""));
}

#[tokio::test]
async fn test_athlete_edits_own_profile() {
    let club = start_club().await;
    let path = format!("/athletes/{}/edit", club.athlete);

    let form = send_raw(club.addr, "GET", &path, Some(club.athlete_user), None).await;
    assert_eq!(form.status, 200);
    assert!(form.body.contains("name=\"first_name\" id=\"id_first_name\" value=\"xena\""));

    let invalid = send_raw(
        club.addr,
        "POST",
        &path,
        Some(club.athlete_user),
        Some("first_name=Xena&last_name=Warrior&email=not-an-email"),
    )
    .await;
    assert_eq!(invalid.status, 200);
    assert!(invalid.body.contains("Enter a valid email address."));
    assert!(invalid.body.contains("value=\"Warrior\""));

    let saved = send_raw(
        club.addr,
        "POST",
        &path,
        Some(club.athlete_user),
        Some("first_name=Xena&last_name=Warrior&email=xena%40club.org&gender=female&birthday=2007-03-01"),
    )
    .await;
    assert_eq!(saved.status, 303);
    let location = saved.location().expect("location");
    assert!(location.starts_with("/athletes?msg=success"));
    let list = send_raw(club.addr, "GET", &location, Some(club.admin), None).await;
    assert!(list.body.contains("Athlete profile updated successfully!"));
    assert!(list.body.contains("Xena Warrior"));

    let db = club.db.lock().expect("db lock");
    let summary = RosterStore::new(db.connection())
        .athlete_summary(club.athlete)
        .expect("summary")
        .expect("athlete");
    assert_eq!(summary.athlete.birthday.map(|d| d.to_string()), Some("2007-03-01".to_string()));
    assert_eq!(summary.athlete.team_id, Some(club.team));
}

#[tokio::test]
async fn test_edit_is_scoped_to_team_and_self() {
    let club = start_club().await;
    let path = format!("/athletes/{}/edit", club.athlete);

    let rival = send_raw(
        club.addr,
        "POST",
        &path,
        Some(club.rival_coach),
        Some("first_name=Hacked&last_name=Name&email=h%40club.org"),
    )
    .await;
    assert_eq!(rival.status, 303);
    let location = rival.location().expect("location");
    assert!(location.starts_with(&format!("/athletes/{}?msg=error", club.athlete)));
    let detail = send_raw(club.addr, "GET", &location, Some(club.admin), None).await;
    assert!(detail.body.contains("You are not authorized to edit this athlete."));
    assert!(!detail.body.contains("Hacked"));

    let other_athlete = send_raw(
        club.addr,
        "GET",
        &format!("/athletes/{}/edit", club.teamless),
        Some(club.athlete_user),
        None,
    )
    .await;
    assert_eq!(other_athlete.status, 303);

    let unknown = send_raw(
        club.addr,
        "GET",
        &format!("/athletes/{}/edit", uuid::Uuid::new_v4()),
        Some(club.admin),
        None,
    )
    .await;
    assert_eq!(unknown.status, 404);
}

#[tokio::test]
async fn test_single_delete_by_coach_only_within_team() {
    let club = start_club().await;
    let path = format!("/athletes/{}/delete", club.athlete);

    for actor in [club.athlete_user, club.rival_coach] {
        let denied = send_raw(club.addr, "POST", &path, Some(actor), None).await;
        assert_eq!(denied.status, 303);
        assert!(denied
            .location()
            .expect("location")
            .starts_with(&format!("/athletes/{}?msg=error", club.athlete)));
    }

    let confirm = send_raw(club.addr, "GET", &path, Some(club.coach), None).await;
    assert_eq!(confirm.status, 200);
    assert!(confirm.body.contains("Delete xena Test"));

    let deleted = send_raw(club.addr, "POST", &path, Some(club.coach), None).await;
    assert_eq!(deleted.status, 303);
    let location = deleted.location().expect("location");
    let list = send_raw(club.addr, "GET", &location, Some(club.admin), None).await;
    assert!(list.body.contains("Athlete &#39;xena Test&#39; has been deleted."));

    let detail = send_raw(
        club.addr,
        "GET",
        &format!("/athletes/{}", club.athlete),
        Some(club.admin),
        None,
    )
    .await;
    assert_eq!(detail.status, 404);
}
