//! Client-side input checks for sign-up and login forms.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email regex: {e}"))
    })
}

/// Loose `local@domain.tld` shape check.
pub fn validate_email(email: &str) -> bool {
    email_re().is_match(email)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCheck {
    pub is_valid: bool,
    pub message: &'static str,
}

pub fn validate_password(password: &str) -> PasswordCheck {
    if password.chars().count() >= MIN_PASSWORD_LENGTH {
        PasswordCheck {
            is_valid: true,
            message: "Password is valid",
        }
    } else {
        PasswordCheck {
            is_valid: false,
            message: "Password must be at least 8 characters",
        }
    }
}
