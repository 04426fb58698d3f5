//! Editing and deleting a single athlete.
//!
//! The edit form covers the user's name, email and gender together with the
//! athlete's birthday and contact details; both rows change in one transaction.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::roster::enrollment::is_valid_email;
use crate::roster::store::RosterStore;
use crate::roster::types::{Actor, Athlete, AthleteSummary, Gender, Role};
use crate::roster::RosterError;
use crate::storage::{Database, DatabaseError};

/// Fields of the edit form, in display order.
pub const PROFILE_FIELDS: [(&str, &str); 6] = [
    ("first_name", "First name"),
    ("last_name", "Last name"),
    ("email", "Email"),
    ("gender", "Gender"),
    ("birthday", "Birthday"),
    ("contact_details", "Contact details"),
];

/// Values accepted by the edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Gender,
    pub birthday: Option<NaiveDate>,
    pub contact_details: String,
}

/// The bound edit form.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    values: BTreeMap<String, String>,
    errors: BTreeMap<String, String>,
}

impl ProfileForm {
    /// Form pre-filled from the stored athlete.
    pub fn from_summary(summary: &AthleteSummary) -> Self {
        let mut values = BTreeMap::new();
        values.insert("first_name".to_string(), summary.user.first_name.clone());
        values.insert("last_name".to_string(), summary.user.last_name.clone());
        values.insert("email".to_string(), summary.user.email.clone());
        values.insert("gender".to_string(), summary.user.gender.as_str().to_string());
        values.insert(
            "birthday".to_string(),
            summary
                .athlete
                .birthday
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        );
        values.insert(
            "contact_details".to_string(),
            summary.athlete.contact_details.clone(),
        );
        Self {
            values,
            errors: BTreeMap::new(),
        }
    }

    /// Bind submitted pairs. Unknown keys are dropped; the first value wins.
    pub fn bind(pairs: &[(String, String)]) -> Self {
        let mut values = BTreeMap::new();
        for (key, value) in pairs {
            if PROFILE_FIELDS.iter().any(|(field, _)| field == key) {
                values.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        Self {
            values,
            errors: BTreeMap::new(),
        }
    }

    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(|v| v.trim()).unwrap_or("")
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn clean(&mut self) -> Option<ProfileUpdate> {
        for field in ["first_name", "last_name", "email"] {
            if self.value(field).is_empty() {
                self.errors
                    .insert(field.to_string(), "This field is required.".to_string());
            }
        }

        let email = self.value("email").to_string();
        if !email.is_empty() && !is_valid_email(&email) {
            self.errors.insert(
                "email".to_string(),
                "Enter a valid email address.".to_string(),
            );
        }

        let gender = match self.value("gender").parse::<Gender>() {
            Ok(gender) => Some(gender),
            Err(_) => {
                self.errors.insert(
                    "gender".to_string(),
                    "Select a valid choice.".to_string(),
                );
                None
            }
        };

        let birthday = match self.value("birthday") {
            "" => None,
            raw => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    self.errors.insert(
                        "birthday".to_string(),
                        "Enter a valid date (YYYY-MM-DD).".to_string(),
                    );
                    None
                }
            },
        };

        if !self.errors.is_empty() {
            return None;
        }

        Some(ProfileUpdate {
            first_name: self.value("first_name").to_string(),
            last_name: self.value("last_name").to_string(),
            email,
            gender: gender.unwrap_or_default(),
            birthday,
            contact_details: self.value("contact_details").to_string(),
        })
    }
}

/// Result of an edit that passed the permission check.
#[derive(Debug, Clone)]
pub enum ProfileOutcome {
    Updated,
    Invalid(ProfileForm),
}

fn coaches_team_of(actor: &Actor, athlete: &Athlete) -> bool {
    actor
        .coach
        .as_ref()
        .and_then(|c| c.team_id)
        .is_some_and(|team| athlete.team_id == Some(team))
}

/// Administrators, the coach of the athlete's team, or the athlete themself.
pub fn can_edit(actor: &Actor, athlete: &Athlete) -> bool {
    match actor.role() {
        Role::Administrator => true,
        Role::Coach => coaches_team_of(actor, athlete),
        Role::Athlete => actor.athlete.as_ref().is_some_and(|own| own.id == athlete.id),
    }
}

/// Administrators, or the coach of the athlete's team.
pub fn can_delete(actor: &Actor, athlete: &Athlete) -> bool {
    match actor.role() {
        Role::Administrator => true,
        Role::Coach => coaches_team_of(actor, athlete),
        Role::Athlete => false,
    }
}

fn load_summary(db: &Database, athlete_id: Uuid) -> Result<AthleteSummary, RosterError> {
    RosterStore::new(db.connection())
        .athlete_summary(athlete_id)?
        .ok_or_else(|| RosterError::NotFound("Athlete".to_string()))
}

/// Load an athlete for editing, checking permission.
pub fn edit_form(
    db: &Database,
    actor: &Actor,
    athlete_id: Uuid,
) -> Result<(AthleteSummary, ProfileForm), RosterError> {
    let summary = load_summary(db, athlete_id)?;
    if !can_edit(actor, &summary.athlete) {
        return Err(RosterError::Unauthorized(
            "You are not authorized to edit this athlete.".to_string(),
        ));
    }
    let form = ProfileForm::from_summary(&summary);
    Ok((summary, form))
}

/// Validate an edit and store the user and athlete changes together.
pub fn update_profile(
    db: &mut Database,
    actor: &Actor,
    athlete_id: Uuid,
    pairs: &[(String, String)],
) -> Result<(AthleteSummary, ProfileOutcome), RosterError> {
    let (summary, _) = edit_form(db, actor, athlete_id)?;

    let mut form = ProfileForm::bind(pairs);
    let Some(update) = form.clean() else {
        return Ok((summary, ProfileOutcome::Invalid(form)));
    };
    if RosterStore::new(db.connection()).email_taken_by_other(&update.email, summary.user.id)? {
        form.errors.insert(
            "email".to_string(),
            "A user with this email already exists.".to_string(),
        );
        return Ok((summary, ProfileOutcome::Invalid(form)));
    }

    let mut user = summary.user.clone();
    user.first_name = update.first_name;
    user.last_name = update.last_name;
    user.email = update.email;
    user.gender = update.gender;
    let mut athlete = summary.athlete.clone();
    athlete.birthday = update.birthday;
    athlete.contact_details = update.contact_details;

    let tx = db.transaction()?;
    {
        let store = RosterStore::new(&tx);
        store.update_user_details(&user)?;
        store.update_athlete_details(&athlete)?;
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        athlete = %athlete_id,
        actor = %actor.user.username,
        "Athlete profile updated"
    );
    Ok((summary, ProfileOutcome::Updated))
}

/// Delete one athlete along with their user. Returns the athlete's name.
pub fn delete_athlete(
    db: &mut Database,
    actor: &Actor,
    athlete_id: Uuid,
) -> Result<String, RosterError> {
    let summary = load_summary(db, athlete_id)?;
    if !can_delete(actor, &summary.athlete) {
        return Err(RosterError::Unauthorized(
            "You are not authorized to delete this athlete.".to_string(),
        ));
    }

    RosterStore::new(db.connection()).delete_users(&[summary.user.id])?;
    tracing::info!(
        athlete = %athlete_id,
        actor = %actor.user.username,
        "Athlete deleted"
    );
    Ok(summary.user.full_name())
}
