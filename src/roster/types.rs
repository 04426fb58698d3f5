//! Roster type definitions: users, sports, teams, coaches, and athletes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Role a user plays in the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Coach,
    Athlete,
}

impl Role {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Coach => "coach",
            Role::Athlete => "athlete",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "administrator" | "admin" => Ok(Role::Administrator),
            "coach" => Ok(Role::Coach),
            "athlete" => Ok(Role::Athlete),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Administrator => write!(f, "Administrator"),
            Role::Coach => write!(f, "Coach"),
            Role::Athlete => write!(f, "Athlete"),
        }
    }
}

/// Gender recorded for users and teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unspecified,
}

impl Gender {
    /// All choices, in display order.
    pub const CHOICES: [Gender; 4] = [
        Gender::Male,
        Gender::Female,
        Gender::Other,
        Gender::Unspecified,
    ];

    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unspecified => "unspecified",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            "unspecified" | "" => Ok(Gender::Unspecified),
            other => Err(format!("Unknown gender: {}", other)),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
            Gender::Unspecified => write!(f, "Unspecified"),
        }
    }
}

/// An identity known to the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Login name, unique
    pub username: String,
    /// Contact email
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub role: Role,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with the given role.
    pub fn new(username: String, email: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            gender: Gender::Unspecified,
            role,
            created_at: Utc::now(),
        }
    }

    /// "First Last", falling back to the username when both are blank.
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }
}

/// A sport, which owns its specific statistic definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sport {
    pub id: Uuid,
    pub name: String,
}

/// A campus teams are based at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campus {
    pub id: Uuid,
    pub name: String,
}

/// A team. Every team plays exactly one sport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub sport_id: Uuid,
    pub campus_id: Option<Uuid>,
    /// Gender assigned to athletes enrolled onto this team
    pub gender: Gender,
}

impl Team {
    /// Create a new team for a sport.
    pub fn new(name: String, sport_id: Uuid, gender: Gender) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            sport_id,
            campus_id: None,
            gender,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Coach profile attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
}

/// Athlete profile attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Team determines the athlete's sport; None blocks stats entry
    pub team_id: Option<Uuid>,
    pub coach_id: Option<Uuid>,
    pub birthday: Option<NaiveDate>,
    pub contact_details: String,
}

impl Athlete {
    /// Create a blank athlete profile for a user.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            team_id: None,
            coach_id: None,
            birthday: None,
            contact_details: String::new(),
        }
    }
}

/// The authenticated identity making a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user: User,
    /// Coach profile, when the user has one
    pub coach: Option<Coach>,
    /// Athlete profile, when the user has one
    pub athlete: Option<Athlete>,
}

impl Actor {
    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Administrator
    }
}

/// Athlete joined with the related rows needed for lists and detail pages.
#[derive(Debug, Clone, PartialEq)]
pub struct AthleteSummary {
    pub athlete: Athlete,
    pub user: User,
    pub team: Option<Team>,
    pub sport: Option<Sport>,
    pub campus: Option<Campus>,
    /// Coach id and display name
    pub coach: Option<(Uuid, String)>,
}
