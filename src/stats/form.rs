//! Dynamic statistics forms.
//!
//! The field set of a scorecard is not fixed: it is synthesized per request
//! from the statistics that apply to the athlete's sport. The same field
//! descriptors drive rendering (pre-filled values) and validation, so a
//! statistic's short code is its only field identity on both paths.

use std::collections::{BTreeMap, HashMap};

use crate::stats::registry::{ApplicableStatistics, StatisticDefinition};

/// Key of the year field on the scorecard form.
pub const YEAR_FIELD: &str = "year";

/// Default longest accepted statistic value, in characters.
pub const DEFAULT_MAX_VALUE_LENGTH: usize = 64;

const REQUIRED_MESSAGE: &str = "This field is required.";
const NOT_A_NUMBER_MESSAGE: &str = "Enter a whole number.";

/// What a form field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Year,
    Statistic,
}

/// One input of a dynamic form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Submitted key; the statistic's short code for statistic fields
    pub key: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    fn statistic(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required: false,
            kind: FieldKind::Statistic,
        }
    }
}

/// One optional free-text field per applicable statistic, universal first.
pub fn statistic_fields(applicable: &ApplicableStatistics) -> Vec<FieldDescriptor> {
    applicable
        .entries()
        .into_iter()
        .map(|(code, name)| FieldDescriptor::statistic(code, name))
        .collect()
}

/// Field-level validation messages keyed by field key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// A validated scorecard submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorecard {
    pub year: i32,
    /// Non-empty, trimmed values keyed by short code
    pub values: BTreeMap<String, String>,
}

/// Per-year statistics form for one athlete.
#[derive(Debug, Clone)]
pub struct ScorecardForm {
    fields: Vec<FieldDescriptor>,
    values: HashMap<String, String>,
    errors: ValidationErrors,
    max_value_length: usize,
}

/// Build the scorecard form for a sport's applicable statistics.
///
/// `initial` pre-fills fields by short code; the year defaults to
/// `current_year` unless `initial` carries one.
pub fn build_form(
    applicable: &ApplicableStatistics,
    initial: &HashMap<String, String>,
    current_year: i32,
) -> ScorecardForm {
    let mut fields = vec![FieldDescriptor {
        key: YEAR_FIELD.to_string(),
        label: "Year".to_string(),
        required: true,
        kind: FieldKind::Year,
    }];
    fields.extend(statistic_fields(applicable));

    let mut values: HashMap<String, String> = fields
        .iter()
        .filter_map(|f| initial.get(&f.key).map(|v| (f.key.clone(), v.clone())))
        .collect();
    values
        .entry(YEAR_FIELD.to_string())
        .or_insert_with(|| current_year.to_string());

    ScorecardForm {
        fields,
        values,
        errors: ValidationErrors::default(),
        max_value_length: DEFAULT_MAX_VALUE_LENGTH,
    }
}

impl ScorecardForm {
    /// Override the longest accepted statistic value.
    pub fn with_max_value_length(mut self, max_value_length: usize) -> Self {
        self.max_value_length = max_value_length;
        self
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Current (initial or submitted) value of a field.
    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Validate a raw submission against this form's fields.
    ///
    /// Keys that are not fields are ignored. Blank statistic values are
    /// dropped rather than reported.
    pub fn validate(&self, raw: &HashMap<String, String>) -> Result<Scorecard, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let year = match raw.get(YEAR_FIELD).map(|v| v.trim()) {
            None | Some("") => {
                errors.add(YEAR_FIELD, REQUIRED_MESSAGE);
                None
            }
            Some(text) => match text.parse::<i32>() {
                Ok(year) => Some(year),
                Err(_) => {
                    errors.add(YEAR_FIELD, NOT_A_NUMBER_MESSAGE);
                    None
                }
            },
        };

        let values = clean_statistic_values(&self.fields, raw, self.max_value_length, &mut errors);

        match year {
            Some(year) if errors.is_empty() => Ok(Scorecard { year, values }),
            _ => Err(errors),
        }
    }

    /// Replace values with a rejected submission and attach its errors, for
    /// re-rendering with the user's input preserved.
    pub fn rebind(mut self, raw: &HashMap<String, String>, errors: ValidationErrors) -> Self {
        self.values = self
            .fields
            .iter()
            .filter_map(|f| raw.get(&f.key).map(|v| (f.key.clone(), v.clone())))
            .collect();
        self.errors = errors;
        self
    }
}

/// Per-game statistics form: sport-specific fields only, no year.
#[derive(Debug, Clone)]
pub struct GameReportForm {
    fields: Vec<FieldDescriptor>,
    values: HashMap<String, String>,
    errors: ValidationErrors,
    max_value_length: usize,
}

/// Build a game report form from a sport's own statistic definitions.
pub fn build_game_report_form(
    specific: &[StatisticDefinition],
    initial: &HashMap<String, String>,
) -> GameReportForm {
    let fields: Vec<FieldDescriptor> = specific
        .iter()
        .map(|d| FieldDescriptor::statistic(&d.short_code, &d.display_name))
        .collect();
    let values = fields
        .iter()
        .filter_map(|f| initial.get(&f.key).map(|v| (f.key.clone(), v.clone())))
        .collect();

    GameReportForm {
        fields,
        values,
        errors: ValidationErrors::default(),
        max_value_length: DEFAULT_MAX_VALUE_LENGTH,
    }
}

impl GameReportForm {
    pub fn with_max_value_length(mut self, max_value_length: usize) -> Self {
        self.max_value_length = max_value_length;
        self
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn value(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key)
    }

    /// Non-empty values keyed by short code.
    pub fn validate(
        &self,
        raw: &HashMap<String, String>,
    ) -> Result<BTreeMap<String, String>, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let values = clean_statistic_values(&self.fields, raw, self.max_value_length, &mut errors);
        if errors.is_empty() {
            Ok(values)
        } else {
            Err(errors)
        }
    }

    pub fn rebind(mut self, raw: &HashMap<String, String>, errors: ValidationErrors) -> Self {
        self.values = self
            .fields
            .iter()
            .filter_map(|f| raw.get(&f.key).map(|v| (f.key.clone(), v.clone())))
            .collect();
        self.errors = errors;
        self
    }
}

fn clean_statistic_values(
    fields: &[FieldDescriptor],
    raw: &HashMap<String, String>,
    max_value_length: usize,
    errors: &mut ValidationErrors,
) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for field in fields.iter().filter(|f| f.kind == FieldKind::Statistic) {
        let Some(value) = raw.get(&field.key).map(|v| v.trim()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if value.chars().count() > max_value_length {
            errors.add(
                &field.key,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max_value_length,
                    value.chars().count()
                ),
            );
            continue;
        }
        values.insert(field.key.clone(), value.to_string());
    }
    values
}
