//!
//! policyhub data model
//! ---------------------
//! Records persisted in the document store (`Policy`, `UserRecord`), the
//! validated inputs that create or change them (`NewPolicy`, `PolicyPatch`,
//! `Credentials`) and the transient `LoginOutcome`.
//!
//! Request bodies arrive as loosely-typed JSON and are checked field by field
//! so that every violated rule is reported at once, the same way the HTTP
//! clients of this service have always received validation failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{AppError, AppResult};

/// Longest accepted policy name, in characters.
pub const POLICY_NAME_MAX_CHARS: usize = 30;

/// A stored insurance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Store-assigned opaque identifier.
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub role_number: Number,
    /// Set once by the store on insert.
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool { true }

/// Validated fields for a policy that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPolicy {
    pub name: String,
    pub role_number: Number,
}

impl NewPolicy {
    /// Materialize the record a store will persist under `id`.
    pub fn into_policy(self, id: String, created_at: DateTime<Utc>) -> Policy {
        Policy { id, name: self.name, role_number: self.role_number, created_at, enabled: true }
    }
}

/// Validated partial update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyPatch {
    pub name: Option<String>,
    pub role_number: Option<Number>,
    pub enabled: Option<bool>,
}

impl PolicyPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role_number.is_none() && self.enabled.is_none()
    }

    /// Overwrite only the supplied fields of `policy`.
    pub fn apply(&self, policy: &mut Policy) {
        if let Some(name) = &self.name { policy.name = name.clone(); }
        if let Some(rn) = &self.role_number { policy.role_number = rn.clone(); }
        if let Some(enabled) = self.enabled { policy.enabled = enabled; }
    }
}

/// Raw policy body as received over HTTP, before validation.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyInput {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default, rename = "roleNumber")]
    pub role_number: Option<Value>,
    #[serde(default)]
    pub enabled: Option<Value>,
}

impl PolicyInput {
    /// Validate a full creation body: both `name` and `roleNumber` are required.
    pub fn into_new_policy(self) -> AppResult<NewPolicy> {
        let mut errors = Vec::new();
        let name = check_name(self.name.as_ref(), true, &mut errors);
        let role_number = check_role_number(self.role_number.as_ref(), true, &mut errors);
        match (name, role_number) {
            (Some(name), Some(role_number)) if errors.is_empty() => Ok(NewPolicy { name, role_number }),
            _ => Err(AppError::validation(errors)),
        }
    }

    /// Validate a partial body: only the fields present are checked.
    pub fn into_patch(self) -> AppResult<PolicyPatch> {
        let mut errors = Vec::new();
        let name = check_name(self.name.as_ref(), false, &mut errors);
        let role_number = check_role_number(self.role_number.as_ref(), false, &mut errors);
        let enabled = match self.enabled {
            None => None,
            Some(Value::Bool(b)) => Some(b),
            Some(_) => { errors.push("enabled must be a boolean value".to_string()); None }
        };
        if !errors.is_empty() {
            return Err(AppError::validation(errors));
        }
        Ok(PolicyPatch { name, role_number, enabled })
    }
}

fn check_name(value: Option<&Value>, required: bool, errors: &mut Vec<String>) -> Option<String> {
    match value {
        None if required => {
            errors.push("name must be a string".into());
            errors.push("name should not be empty".into());
            None
        }
        None => None,
        Some(Value::String(s)) if s.is_empty() => {
            errors.push("name should not be empty".into());
            None
        }
        Some(Value::String(s)) if s.chars().count() > POLICY_NAME_MAX_CHARS => {
            errors.push(format!("name must be shorter than or equal to {} characters", POLICY_NAME_MAX_CHARS));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push("name must be a string".into());
            None
        }
    }
}

fn check_role_number(value: Option<&Value>, required: bool, errors: &mut Vec<String>) -> Option<Number> {
    match value {
        None if required => {
            errors.push("roleNumber must be a number".into());
            errors.push("roleNumber should not be empty".into());
            None
        }
        None => None,
        Some(Value::Number(n)) => Some(n.clone()),
        Some(_) => {
            errors.push("roleNumber must be a number".into());
            None
        }
    }
}

/// A persisted account. `password` always holds a PHC hash string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord").field("email", &self.email).field("password", &"<hash>").finish()
    }
}

/// Raw `{email, password}` body, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsInput {
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

/// Validated login / registration credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new<S: Into<String>>(email: S, password: S) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("email", &self.email).finish_non_exhaustive()
    }
}

impl CredentialsInput {
    pub fn into_credentials(self) -> AppResult<Credentials> {
        let mut errors = Vec::new();
        let email = match self.email {
            Some(Value::String(s)) if s.is_empty() => {
                errors.push("email should not be empty".to_string());
                None
            }
            Some(Value::String(s)) if looks_like_email(&s) => Some(s),
            Some(Value::String(_)) => {
                errors.push("email must be an email".to_string());
                None
            }
            Some(_) => {
                errors.push("email must be an email".to_string());
                None
            }
            None => {
                errors.push("email must be an email".to_string());
                errors.push("email should not be empty".to_string());
                None
            }
        };
        let password = match self.password {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::String(_)) => {
                errors.push("password should not be empty".to_string());
                None
            }
            Some(_) => {
                errors.push("password must be a string".to_string());
                None
            }
            None => {
                errors.push("password must be a string".to_string());
                errors.push("password should not be empty".to_string());
                None
            }
        };
        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok(Credentials { email, password }),
            _ => Err(AppError::validation(errors)),
        }
    }
}

// Structural check only: one '@' with non-empty local part and a dotted domain.
fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else { return false; };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}

/// Result of a login attempt. Bad credentials are an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { access_token: String },
    Rejected,
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool { matches!(self, LoginOutcome::Authenticated { .. }) }

    /// Token for the response body; empty when rejected.
    pub fn access_token(&self) -> &str {
        match self {
            LoginOutcome::Authenticated { access_token } => access_token.as_str(),
            LoginOutcome::Rejected => "",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            LoginOutcome::Authenticated { .. } => 200,
            LoginOutcome::Rejected => 400,
        }
    }
}
