use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// An authenticated account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            created_at: Utc::now(),
        }
    }

    /// Display name shown on the profile page: the email's local part
    pub fn username(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// A signed-in session handed back to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: Uuid,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

const NAME_PATTERN: &str = r"^[a-zA-Z0-9가-힣]{2,4}$";
const EMAIL_PATTERN: &str =
    r"(?i)^[0-9a-z]([-_.]?[0-9a-z])*@[0-9a-z]([-_.]?[0-9a-z])*\.[a-z]{2,3}$";

type PatternCell = OnceLock<Result<Regex, regex::Error>>;

/// Compiles `pattern` once; a bad pattern surfaces as `Internal` on every use
fn compiled(cell: &'static PatternCell, pattern: &str) -> AppResult<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| AppError::Internal(format!("validation pattern failed to compile: {}", e)))
}

fn name_regex() -> AppResult<&'static Regex> {
    static RE: PatternCell = OnceLock::new();
    compiled(&RE, NAME_PATTERN)
}

fn email_regex() -> AppResult<&'static Regex> {
    static RE: PatternCell = OnceLock::new();
    compiled(&RE, EMAIL_PATTERN)
}

pub fn is_valid_email(email: &str) -> AppResult<bool> {
    Ok(email_regex()?.is_match(email))
}

/// 8 to 10 ASCII letters/digits, with at least one of each
pub fn is_valid_signup_password(password: &str) -> bool {
    (8..=10).contains(&password.len())
        && password.chars().all(|c| c.is_ascii_alphanumeric())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_alphabetic())
}

impl Credentials {
    pub fn validate(&self) -> AppResult<()> {
        if !is_valid_email(&self.email)? {
            return Err(AppError::InvalidInput("email format is invalid".to_string()));
        }
        if self.password.chars().count() < 8 {
            return Err(AppError::InvalidInput(
                "password must be at least 8 characters".to_string(),
            ));
        }
        Ok(())
    }
}

impl SignUpForm {
    pub fn validate(&self) -> AppResult<()> {
        if !name_regex()?.is_match(&self.name) {
            return Err(AppError::InvalidInput(
                "name must be 2 to 4 letters or digits".to_string(),
            ));
        }
        if !is_valid_email(&self.email)? {
            return Err(AppError::InvalidInput("email format is invalid".to_string()));
        }
        if !is_valid_signup_password(&self.password) {
            return Err(AppError::InvalidInput(
                "password must combine letters and digits, 8 to 10 characters".to_string(),
            ));
        }
        if self.password != self.confirm_password {
            return Err(AppError::InvalidInput("passwords do not match".to_string()));
        }
        Ok(())
    }
}
