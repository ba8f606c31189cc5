// src/validation.rs

//! Input validation for account and catalog forms.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::RegisterRequest;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum length of location and shelf names.
pub const MAX_NAME_LENGTH: usize = 100;

/// A password requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    Uppercase,
    Lowercase,
    Digit,
    Special,
}

impl PasswordRule {
    pub const ALL: [PasswordRule; 5] = [
        Self::MinLength,
        Self::Uppercase,
        Self::Lowercase,
        Self::Digit,
        Self::Special,
    ];

    fn pattern(&self) -> Option<&'static Regex> {
        static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            [
                Regex::new(r"[A-Z]").expect("static regex"),
                Regex::new(r"[a-z]").expect("static regex"),
                Regex::new(r"[0-9]").expect("static regex"),
                Regex::new(r"[^A-Za-z0-9]").expect("static regex"),
            ]
        });
        match self {
            Self::MinLength => None,
            Self::Uppercase => Some(&patterns[0]),
            Self::Lowercase => Some(&patterns[1]),
            Self::Digit => Some(&patterns[2]),
            Self::Special => Some(&patterns[3]),
        }
    }

    /// Whether `password` satisfies this rule.
    pub fn is_met(&self, password: &str) -> bool {
        match self.pattern() {
            Some(pattern) => pattern.is_match(password),
            None => password.chars().count() >= MIN_PASSWORD_LENGTH,
        }
    }
}

impl fmt::Display for PasswordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength => write!(f, "at least {MIN_PASSWORD_LENGTH} characters"),
            Self::Uppercase => write!(f, "an uppercase letter"),
            Self::Lowercase => write!(f, "a lowercase letter"),
            Self::Digit => write!(f, "a number"),
            Self::Special => write!(f, "a special character"),
        }
    }
}

/// Rules `password` fails, in display order.
pub fn password_failures(password: &str) -> Vec<PasswordRule> {
    PasswordRule::ALL
        .into_iter()
        .filter(|rule| !rule.is_met(password))
        .collect()
}

/// Reject passwords failing any rule, naming every failed rule.
pub fn validate_password(password: &str) -> Result<()> {
    let failures = password_failures(password);
    if failures.is_empty() {
        return Ok(());
    }
    let missing: Vec<String> = failures.iter().map(ToString::to_string).collect();
    Err(AppError::validation(format!(
        "Password must contain {}",
        missing.join(", ")
    )))
}

/// Validate a new password and its confirmation.
pub fn validate_password_change(password: &str, confirmation: &str) -> Result<()> {
    validate_password(password)?;
    if password != confirmation {
        return Err(AppError::validation("Passwords do not match"));
    }
    Ok(())
}

/// Basic shape check of an email address.
pub fn validate_email(email: &str) -> Result<()> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let pattern =
        EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));
    if pattern.is_match(email.trim()) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "'{}' is not a valid email address",
            email.trim()
        )))
    }
}

/// Validate a location or shelf name. `kind` names the field in errors.
pub fn validate_name(kind: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation(format!("{kind} name is required")));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "{kind} name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

/// Validate a sign-up form.
pub fn validate_registration(request: &RegisterRequest) -> Result<()> {
    if request.first_name.trim().is_empty() {
        return Err(AppError::validation("First name is required"));
    }
    if request.last_name.trim().is_empty() {
        return Err(AppError::validation("Last name is required"));
    }
    validate_email(&request.email)?;
    validate_password(&request.password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(password_failures("Str0ng!pass").is_empty());
        assert!(validate_password("Str0ng!pass").is_ok());
    }

    #[test]
    fn each_rule_is_enforced() {
        assert_eq!(password_failures("Sh0rt!"), vec![PasswordRule::MinLength]);
        assert_eq!(password_failures("lower0case!"), vec![PasswordRule::Uppercase]);
        assert_eq!(password_failures("UPPER0CASE!"), vec![PasswordRule::Lowercase]);
        assert_eq!(password_failures("NoDigits!!"), vec![PasswordRule::Digit]);
        assert_eq!(password_failures("NoSpecial00"), vec![PasswordRule::Special]);
    }

    #[test]
    fn error_lists_every_failure() {
        let err = validate_password("abc").unwrap_err().to_string();
        assert!(err.contains("at least 8 characters"));
        assert!(err.contains("an uppercase letter"));
        assert!(err.contains("a number"));
        assert!(err.contains("a special character"));
        assert!(!err.contains("a lowercase letter"));
    }

    #[test]
    fn password_change_requires_match() {
        assert!(validate_password_change("Str0ng!pass", "Str0ng!pass").is_ok());
        assert!(validate_password_change("Str0ng!pass", "Str0ng!pasz").is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("reader@example.org").is_ok());
        assert!(validate_email(" reader@example.org ").is_ok());
        assert!(validate_email("reader@example").is_err());
        assert!(validate_email("two words@example.org").is_err());
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("Shelf", "  Hall closet ").unwrap(), "Hall closet");
        assert!(validate_name("Shelf", "   ").is_err());
        assert!(validate_name("Location", &"x".repeat(101)).is_err());
    }

    #[test]
    fn registration_checks_all_fields() {
        let mut request = RegisterRequest {
            email: "reader@example.org".into(),
            password: "Str0ng!pass".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            turnstile_token: None,
        };
        assert!(validate_registration(&request).is_ok());
        request.last_name = " ".into();
        assert!(validate_registration(&request).is_err());
    }
}
