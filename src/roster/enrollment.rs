//! Bulk enrollment of new athletes onto a team.
//!
//! A submitted formset is validated row by row, duplicate emails are skipped
//! with a warning, and the remaining athletes are created in one transaction.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::messages::FlashMessage;
use crate::roster::store::RosterStore;
use crate::roster::types::{Actor, Athlete, Role, Team, User};
use crate::roster::RosterError;
use crate::storage::{Database, DatabaseError};

/// Formset key prefix.
pub const FORMSET_PREFIX: &str = "form";

/// Upper bound on rows accepted from one submission.
pub const MAX_ROWS: usize = 200;

/// Fields of a single enrollment row, in display order.
pub const ROW_FIELDS: [(&str, &str); 5] = [
    ("first_name", "First name"),
    ("last_name", "Last name"),
    ("email", "Email"),
    ("birthday", "Birthday"),
    ("contact_details", "Contact details"),
];

/// A validated row ready for creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthday: Option<NaiveDate>,
    pub contact_details: String,
}

/// One row of the formset with its raw values and field errors.
#[derive(Debug, Clone, Default)]
pub struct RowForm {
    pub values: BTreeMap<String, String>,
    pub errors: BTreeMap<String, String>,
}

impl RowForm {
    fn value(&self, field: &str) -> &str {
        self.values.get(field).map(|v| v.trim()).unwrap_or("")
    }

    /// A row with every field blank is ignored.
    pub fn has_changed(&self) -> bool {
        ROW_FIELDS.iter().any(|(field, _)| !self.value(field).is_empty())
    }

    fn validate(&mut self) -> Option<EnrollmentRow> {
        if !self.has_changed() {
            return None;
        }

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

        Some(EnrollmentRow {
            first_name: self.value("first_name").to_string(),
            last_name: self.value("last_name").to_string(),
            email,
            birthday,
            contact_details: self.value("contact_details").to_string(),
        })
    }
}

/// The bound enrollment formset.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentFormset {
    pub rows: Vec<RowForm>,
    cleaned: Vec<EnrollmentRow>,
}

impl EnrollmentFormset {
    /// An unbound formset with `extra` blank rows.
    pub fn blank(extra: usize) -> Self {
        Self {
            rows: vec![RowForm::default(); extra],
            cleaned: Vec::new(),
        }
    }

    /// Bind submitted `form-N-field` pairs and validate each row.
    pub fn bind(pairs: &[(String, String)]) -> Self {
        let declared = pairs
            .iter()
            .find(|(k, _)| k == &format!("{}-TOTAL_FORMS", FORMSET_PREFIX))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok());

        let mut rows: BTreeMap<usize, RowForm> = BTreeMap::new();
        for (key, value) in pairs {
            let Some(rest) = key.strip_prefix(&format!("{}-", FORMSET_PREFIX)) else {
                continue;
            };
            let Some((index, field)) = rest.split_once('-') else {
                continue;
            };
            let Ok(index) = index.parse::<usize>() else {
                continue;
            };
            if index >= MAX_ROWS || !ROW_FIELDS.iter().any(|(f, _)| *f == field) {
                continue;
            }
            rows.entry(index)
                .or_default()
                .values
                .insert(field.to_string(), value.clone());
        }

        let total = declared
            .unwrap_or_else(|| rows.keys().next_back().map(|i| i + 1).unwrap_or(0))
            .min(MAX_ROWS);

        let mut formset = Self::default();
        for index in 0..total {
            let mut row = rows.remove(&index).unwrap_or_default();
            if let Some(cleaned) = row.validate() {
                formset.cleaned.push(cleaned);
            }
            formset.rows.push(row);
        }
        formset
    }

    pub fn is_valid(&self) -> bool {
        self.rows.iter().all(|row| row.errors.is_empty())
    }

    /// Rows that validated and carry data.
    pub fn cleaned_rows(&self) -> &[EnrollmentRow] {
        &self.cleaned
    }
}

/// Result of an enrollment submission.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentOutcome {
    pub created: Vec<User>,
    pub messages: Vec<FlashMessage>,
}

/// Administrators may enroll onto any team; coaches only onto their own.
pub fn can_enroll(actor: &Actor, team: &Team) -> bool {
    match actor.role() {
        Role::Administrator => true,
        Role::Coach => actor
            .coach
            .as_ref()
            .is_some_and(|c| c.team_id == Some(team.id)),
        Role::Athlete => false,
    }
}

/// Enroll validated rows onto a team.
///
/// Rows whose email already exists (ignoring case) or repeats within the
/// batch are skipped with a warning. All remaining athletes are created in a
/// single transaction; a storage failure creates none of them.
pub fn enroll(
    db: &mut Database,
    actor: &Actor,
    team: &Team,
    rows: &[EnrollmentRow],
) -> Result<EnrollmentOutcome, RosterError> {
    if !can_enroll(actor, team) {
        return Err(RosterError::Unauthorized(
            "You are not authorized to add athletes to this team.".to_string(),
        ));
    }

    let mut outcome = EnrollmentOutcome::default();
    let mut emails_in_batch: HashSet<String> = HashSet::new();
    let mut accepted: Vec<&EnrollmentRow> = Vec::new();

    {
        let store = RosterStore::new(db.connection());
        for row in rows {
            // ASCII folding, matching the NOCASE lookup against stored users
            let key = row.email.to_ascii_lowercase();
            if store.email_exists(&row.email)? || emails_in_batch.contains(&key) {
                tracing::warn!(email = %row.email, "Skipping duplicate athlete email");
                outcome.messages.push(FlashMessage::warning(format!(
                    "Skipped athlete with email '{}' as it already exists or was duplicated.",
                    row.email
                )));
                continue;
            }
            emails_in_batch.insert(key);
            accepted.push(row);
        }
    }

    if accepted.is_empty() {
        outcome
            .messages
            .push(FlashMessage::info("No new valid athletes were added."));
        return Ok(outcome);
    }

    match create_athletes(db, team, &accepted) {
        Ok(created) => {
            tracing::info!(
                team = %team.name,
                count = created.len(),
                actor = %actor.user.username,
                "Enrolled athletes"
            );
            outcome.messages.push(FlashMessage::success(format!(
                "Successfully added {} new athletes to team '{}'!",
                created.len(),
                team
            )));
            outcome.created = created;
        }
        Err(e) => {
            tracing::error!(team = %team.name, error = %e, "Athlete enrollment failed");
            outcome.messages.push(FlashMessage::error(format!(
                "An unhandled error occurred during database creation: {}.",
                e
            )));
        }
    }

    Ok(outcome)
}

fn create_athletes(
    db: &mut Database,
    team: &Team,
    rows: &[&EnrollmentRow],
) -> Result<Vec<User>, DatabaseError> {
    let tx = db.transaction()?;
    let mut created = Vec::with_capacity(rows.len());
    {
        let store = RosterStore::new(&tx);
        for row in rows {
            let username = generate_username(&store, &row.first_name, &row.last_name)?;
            let mut user = User::new(username, row.email.clone(), Role::Athlete);
            user.first_name = row.first_name.clone();
            user.last_name = row.last_name.clone();
            user.gender = team.gender;
            store.insert_user(&user)?;

            let mut athlete = Athlete::new(user.id);
            athlete.team_id = Some(team.id);
            athlete.birthday = row.birthday;
            athlete.contact_details = row.contact_details.clone();
            store.insert_athlete(&athlete)?;

            created.push(user);
        }
    }
    tx.commit()?;
    Ok(created)
}

/// `first.last` in lowercase, suffixed with 1, 2, ... until unused.
pub fn generate_username(
    store: &RosterStore<'_>,
    first_name: &str,
    last_name: &str,
) -> Result<String, DatabaseError> {
    let clean = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };
    let base = format!("{}.{}", clean(first_name), clean(last_name));

    let mut username = base.clone();
    let mut counter = 1;
    while store.username_exists(&username)? {
        username = format!("{}{}", base, counter);
        counter += 1;
    }
    Ok(username)
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
}
