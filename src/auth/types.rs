// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The authenticated identity returned by `dj-rest-auth/user/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub pk: u64,
    pub username: String,
    pub profile_id: u64,
    #[serde(default)]
    pub profile_image: Option<String>,

    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Login response from `dj-rest-auth/login/`
/// Token strings are empty when the server only sets HTTP-only cookies.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: Session,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub access_token_expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refresh_token_expiration: Option<DateTime<Utc>>,
}

/// Sign-in form contents
#[derive(Debug, Clone, Default)]
pub struct SignInData {
    pub username: String,
    pub password: String,
}

/// Sign-up form contents
#[derive(Debug, Clone, Default)]
pub struct SignUpData {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// Which auth state a page expects its visitor to be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthExpectation {
    LoggedIn,
    LoggedOut,
}

impl FromStr for AuthExpectation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loggedIn" => Ok(AuthExpectation::LoggedIn),
            "loggedOut" => Ok(AuthExpectation::LoggedOut),
            other => Err(format!("Unknown auth expectation: {}", other)),
        }
    }
}
