//! Server-rendered HTML pages.

use std::fmt::Write;

use crate::messages::FlashMessage;
use crate::roster::enrollment::{EnrollmentFormset, FORMSET_PREFIX, ROW_FIELDS};
use crate::roster::profile::PROFILE_FIELDS;
use crate::roster::{AthleteFilter, AthleteSummary, Gender, ProfileForm, RosterView, Team};
use crate::stats::form::{FieldKind, GameReportForm, ScorecardForm};
use crate::stats::{Game, GameReportContext, PerformanceRecord, StatsContext};

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Wrap a body in the shared layout with any pending messages.
pub fn page(title: &str, messages: &[FlashMessage], body: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} | RosterKit</title></head>\n<body>\n<nav><a href=\"/athletes\">Athletes</a></nav>\n<main>\n<h1>{}</h1>\n",
        html_escape(title),
        html_escape(title)
    );
    if !messages.is_empty() {
        html.push_str("<ul class=\"messages\">\n");
        for message in messages {
            let _ = writeln!(
                html,
                "<li class=\"alert alert-{}\">{}</li>",
                message.level.as_str(),
                html_escape(&message.text)
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str(body);
    html.push_str("\n</main>\n</body>\n</html>\n");
    html
}

/// Plain message page for 401/404/500 responses.
pub fn message_page(title: &str, text: &str) -> String {
    page(title, &[], &format!("<p>{}</p>", html_escape(text)))
}

fn option_list<'a>(
    name: &str,
    label: &str,
    options: impl Iterator<Item = (String, &'a str)>,
    selected: Option<String>,
) -> String {
    let mut html = format!(
        "<label>{} <select name=\"{}\"><option value=\"\">All</option>",
        html_escape(label),
        name
    );
    for (value, text) in options {
        let marker = if selected.as_deref() == Some(value.as_str()) {
            " selected"
        } else {
            ""
        };
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            html_escape(&value),
            marker,
            html_escape(text)
        );
    }
    html.push_str("</select></label>\n");
    html
}

/// Athlete list with filter dropdowns and bulk delete checkboxes.
pub fn athlete_list(
    view: &RosterView,
    filter: &AthleteFilter,
    can_delete: bool,
    messages: &[FlashMessage],
) -> String {
    let mut body = String::from("<form method=\"get\" action=\"/athletes\" class=\"filters\">\n");
    body.push_str(&option_list(
        "sport",
        "Sport",
        view.sports.iter().map(|s| (s.id.to_string(), s.name.as_str())),
        filter.sport.map(|id| id.to_string()),
    ));
    body.push_str(&option_list(
        "campus",
        "Campus",
        view.campuses.iter().map(|c| (c.id.to_string(), c.name.as_str())),
        filter.campus.map(|id| id.to_string()),
    ));
    body.push_str(&option_list(
        "coach",
        "Coach",
        view.coaches.iter().map(|(id, name)| (id.to_string(), name.as_str())),
        filter.coach.map(|id| id.to_string()),
    ));
    let genders: Vec<(String, String)> = Gender::CHOICES
        .iter()
        .map(|g| (g.as_str().to_string(), g.to_string()))
        .collect();
    body.push_str(&option_list(
        "gender",
        "Gender",
        genders.iter().map(|(v, t)| (v.clone(), t.as_str())),
        filter.gender.map(|g| g.as_str().to_string()),
    ));
    body.push_str("<button type=\"submit\">Filter</button>\n</form>\n");

    if view.athletes.is_empty() {
        body.push_str("<p>No athletes found.</p>\n");
        return page("Athletes", messages, &body);
    }

    body.push_str("<form method=\"post\" action=\"/athletes/delete\">\n<table>\n<thead><tr>");
    if can_delete {
        body.push_str("<th></th>");
    }
    body.push_str("<th>Name</th><th>Team</th><th>Sport</th><th>Campus</th><th>Coach</th></tr></thead>\n<tbody>\n");
    for summary in &view.athletes {
        body.push_str("<tr>");
        if can_delete {
            let _ = write!(
                body,
                "<td><input type=\"checkbox\" name=\"athlete_ids\" value=\"{}\"></td>",
                summary.athlete.id
            );
        }
        let _ = writeln!(
            body,
            "<td><a href=\"/athletes/{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            summary.athlete.id,
            html_escape(&summary.user.full_name()),
            html_escape(summary.team.as_ref().map(|t| t.name.as_str()).unwrap_or("-")),
            html_escape(summary.sport.as_ref().map(|s| s.name.as_str()).unwrap_or("-")),
            html_escape(summary.campus.as_ref().map(|c| c.name.as_str()).unwrap_or("-")),
            html_escape(summary.coach.as_ref().map(|c| c.1.as_str()).unwrap_or("-")),
        );
    }
    body.push_str("</tbody>\n</table>\n");
    if can_delete {
        body.push_str("<button type=\"submit\">Delete selected</button>\n");
    }
    body.push_str("</form>\n");

    page("Athletes", messages, &body)
}

/// Controls shown on the detail page for the current actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailActions {
    pub manage_stats: bool,
    pub edit: bool,
    pub delete: bool,
}

/// Athlete profile with recorded statistics and the team's games.
pub fn athlete_detail(
    summary: &AthleteSummary,
    records: &[PerformanceRecord],
    games: &[Game],
    actions: DetailActions,
    messages: &[FlashMessage],
) -> String {
    let mut body = String::from("<dl>\n");
    let rows = [
        ("Username", summary.user.username.clone()),
        ("Email", summary.user.email.clone()),
        (
            "Team",
            summary
                .team
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_else(|| "No team".to_string()),
        ),
        (
            "Sport",
            summary.sport.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
        ),
        (
            "Coach",
            summary.coach.as_ref().map(|c| c.1.clone()).unwrap_or_default(),
        ),
        (
            "Birthday",
            summary
                .athlete
                .birthday
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ),
    ];
    for (label, value) in rows {
        let _ = writeln!(body, "<dt>{}</dt><dd>{}</dd>", label, html_escape(&value));
    }
    body.push_str("</dl>\n");

    let athlete_id = summary.athlete.id;
    if actions.manage_stats {
        let _ = writeln!(
            body,
            "<p><a href=\"/athletes/{}/stats\">Manage statistics</a></p>",
            athlete_id
        );
    }
    if actions.edit {
        let _ = writeln!(
            body,
            "<p><a href=\"/athletes/{}/edit\">Edit profile</a></p>",
            athlete_id
        );
    }
    if actions.delete {
        let _ = writeln!(
            body,
            "<p><a href=\"/athletes/{}/delete\">Delete athlete</a></p>",
            athlete_id
        );
    }

    body.push_str("<h2>Statistics</h2>\n");
    if records.is_empty() {
        body.push_str("<p>No statistics recorded.</p>\n");
    } else {
        let mut tracked: Vec<&str> = Vec::new();
        for record in records {
            if !tracked.contains(&record.statistic_name.as_str()) {
                tracked.push(&record.statistic_name);
            }
        }
        let _ = writeln!(
            body,
            "<p class=\"tracked\">Tracked: {}</p>",
            html_escape(&tracked.join(", "))
        );
        body.push_str("<table>\n<thead><tr><th>Year</th><th>Statistic</th><th>Value</th></tr></thead>\n<tbody>\n");
        for record in records {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                record.year,
                html_escape(&record.statistic_name),
                html_escape(&record.value)
            );
        }
        body.push_str("</tbody>\n</table>\n");
    }

    if !games.is_empty() {
        body.push_str("<h2>Games</h2>\n<ul class=\"games\">\n");
        for game in games {
            let _ = write!(
                body,
                "<li>{} {}",
                game.played_on.format("%Y-%m-%d"),
                html_escape(&game.name)
            );
            if !game.location.is_empty() {
                let _ = write!(body, " ({})", html_escape(&game.location));
            }
            if actions.manage_stats {
                let _ = write!(
                    body,
                    " <a href=\"/games/{}/athletes/{}/report\">Enter report</a>",
                    game.id, athlete_id
                );
            }
            body.push_str("</li>\n");
        }
        body.push_str("</ul>\n");
    }

    page(&summary.user.full_name(), messages, &body)
}

/// The dynamic scorecard form.
pub fn stats_form(context: &StatsContext, form: &ScorecardForm) -> String {
    let athlete_id = context.athlete.athlete.id;
    let mut body = format!(
        "<p>Sport: {}</p>\n<form method=\"post\" action=\"/athletes/{}/stats\">\n",
        html_escape(&context.sport.name),
        athlete_id
    );

    for field in form.fields() {
        let input_type = match field.kind {
            FieldKind::Year => "number",
            FieldKind::Statistic => "text",
        };
        let required = if field.required { " required" } else { "" };
        let _ = write!(
            body,
            "<p><label for=\"id_{key}\">{label}</label> <input type=\"{ty}\" name=\"{key}\" id=\"id_{key}\" value=\"{value}\"{required}>",
            key = html_escape(&field.key),
            label = html_escape(&field.label),
            ty = input_type,
            value = html_escape(form.value(&field.key)),
            required = required,
        );
        if let Some(error) = form.error(&field.key) {
            let _ = write!(body, " <span class=\"errorlist\">{}</span>", html_escape(error));
        }
        body.push_str("</p>\n");
    }

    let _ = write!(
        body,
        "<button type=\"submit\">Save</button> <a href=\"/athletes/{}\">Cancel</a>\n</form>\n",
        athlete_id
    );

    let title = format!("Manage Statistics: {}", context.athlete.user.full_name());
    page(&title, &[], &body)
}

/// Per-game statistics for one athlete.
pub fn game_report_form(context: &GameReportContext, form: &GameReportForm) -> String {
    let athlete_id = context.athlete.athlete.id;
    let mut body = format!(
        "<p>{} on {}</p>\n<form method=\"post\" action=\"/games/{}/athletes/{}/report\">\n",
        html_escape(&context.game.name),
        context.game.played_on.format("%Y-%m-%d"),
        context.game.id,
        athlete_id
    );

    if form.fields().is_empty() {
        let _ = writeln!(
            body,
            "<p>No {} statistics are defined.</p>",
            html_escape(&context.sport.name)
        );
    }
    for field in form.fields() {
        let _ = write!(
            body,
            "<p><label for=\"id_{key}\">{label}</label> <input type=\"text\" name=\"{key}\" id=\"id_{key}\" value=\"{value}\">",
            key = html_escape(&field.key),
            label = html_escape(&field.label),
            value = html_escape(form.value(&field.key)),
        );
        if let Some(error) = form.error(&field.key) {
            let _ = write!(body, " <span class=\"errorlist\">{}</span>", html_escape(error));
        }
        body.push_str("</p>\n");
    }

    let _ = write!(
        body,
        "<button type=\"submit\">Save</button> <a href=\"/athletes/{}\">Cancel</a>\n</form>\n",
        athlete_id
    );

    let title = format!("Game Report: {}", context.athlete.user.full_name());
    page(&title, &[], &body)
}

/// Edit form for one athlete.
pub fn profile_form(summary: &AthleteSummary, form: &ProfileForm) -> String {
    let athlete_id = summary.athlete.id;
    let mut body = format!(
        "<form method=\"post\" action=\"/athletes/{}/edit\">\n",
        athlete_id
    );
    for (key, label) in PROFILE_FIELDS {
        let _ = write!(body, "<p><label for=\"id_{key}\">{label}</label> ");
        if key == "gender" {
            let _ = write!(body, "<select name=\"gender\" id=\"id_gender\">");
            for gender in Gender::CHOICES {
                let marker = if form.value(key) == gender.as_str() {
                    " selected"
                } else {
                    ""
                };
                let _ = write!(
                    body,
                    "<option value=\"{}\"{}>{}</option>",
                    gender.as_str(),
                    marker,
                    gender
                );
            }
            body.push_str("</select>");
        } else {
            let _ = write!(
                body,
                "<input type=\"text\" name=\"{key}\" id=\"id_{key}\" value=\"{}\">",
                html_escape(form.value(key))
            );
        }
        if let Some(error) = form.error(key) {
            let _ = write!(body, " <span class=\"errorlist\">{}</span>", html_escape(error));
        }
        body.push_str("</p>\n");
    }
    let _ = write!(
        body,
        "<button type=\"submit\">Save</button> <a href=\"/athletes/{}\">Cancel</a>\n</form>\n",
        athlete_id
    );

    page(&format!("Edit {}", summary.user.full_name()), &[], &body)
}

/// Confirmation before deleting one athlete.
pub fn delete_confirm(summary: &AthleteSummary) -> String {
    let name = html_escape(&summary.user.full_name());
    let body = format!(
        "<p>Delete {name} and their recorded statistics?</p>\n<form method=\"post\" action=\"/athletes/{id}/delete\">\n<button type=\"submit\">Delete</button> <a href=\"/athletes/{id}\">Cancel</a>\n</form>\n",
        name = name,
        id = summary.athlete.id
    );
    page("Delete Athlete", &[], &body)
}

/// Team picker shown before the enrollment formset.
pub fn team_select(teams: &[Team], messages: &[FlashMessage]) -> String {
    let mut body = String::from(
        "<form method=\"get\" action=\"/athletes/bulk-add\">\n<label>Team <select name=\"team\">",
    );
    for team in teams {
        let _ = write!(
            body,
            "<option value=\"{}\">{}</option>",
            team.id,
            html_escape(&team.name)
        );
    }
    body.push_str("</select></label>\n<button type=\"submit\">Continue</button>\n</form>\n");
    page("Add Athletes by Team", messages, &body)
}

/// Enrollment formset for a selected team.
pub fn enrollment_formset(team: &Team, formset: &EnrollmentFormset) -> String {
    let mut body = format!(
        "<form method=\"post\" action=\"/athletes/bulk-add?team={}\">\n<input type=\"hidden\" name=\"{}-TOTAL_FORMS\" value=\"{}\">\n<table>\n<thead><tr>",
        team.id,
        FORMSET_PREFIX,
        formset.rows.len()
    );
    for (_, label) in ROW_FIELDS {
        let _ = write!(body, "<th>{}</th>", label);
    }
    body.push_str("</tr></thead>\n<tbody>\n");

    for (index, row) in formset.rows.iter().enumerate() {
        body.push_str("<tr>");
        for (field, _) in ROW_FIELDS {
            let value = row.values.get(field).map(String::as_str).unwrap_or("");
            let _ = write!(
                body,
                "<td><input type=\"text\" name=\"{}-{}-{}\" value=\"{}\">",
                FORMSET_PREFIX,
                index,
                field,
                html_escape(value)
            );
            if let Some(error) = row.errors.get(field) {
                let _ = write!(body, " <span class=\"errorlist\">{}</span>", html_escape(error));
            }
            body.push_str("</td>");
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</tbody>\n</table>\n<button type=\"submit\">Add athletes</button>\n</form>\n");

    page(&format!("Add Athletes to {}", team.name), &[], &body)
}
