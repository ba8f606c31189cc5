//! User, session, and account payloads.

use serde::{Deserialize, Serialize};

/// Role of an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse a role name as typed on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// How the account signs in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Email,
    Google,
}

/// A signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub auth_provider: AuthProvider,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub user_role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.user_role == UserRole::Admin
    }

    /// Full name, or the email when no name is set.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// A user as listed on the admin screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub books_added: u32,
    #[serde(default)]
    pub locations_joined: u32,
}

/// An authenticated session returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Sign-in payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Cloudflare Turnstile response token
    #[serde(rename = "turnstileToken", skip_serializing_if = "Option::is_none")]
    pub turnstile_token: Option<String>,
}

/// Account creation payload.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "turnstileToken", skip_serializing_if = "Option::is_none")]
    pub turnstile_token: Option<String>,
}

/// Profile edit payload.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_user_flattens_user_fields() {
        let json = r#"{
            "id": 1,
            "email": "ada@example.com",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "auth_provider": "google",
            "email_verified": true,
            "user_role": "admin",
            "books_added": 42,
            "locations_joined": 2
        }"#;
        let admin: AdminUser = serde_json::from_str(json).unwrap();
        assert!(admin.user.is_admin());
        assert_eq!(admin.user.auth_provider, AuthProvider::Google);
        assert_eq!(admin.books_added, 42);
        assert_eq!(admin.user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user = User {
            id: 1,
            email: "x@example.com".into(),
            first_name: " ".into(),
            last_name: String::new(),
            auth_provider: AuthProvider::Email,
            email_verified: false,
            user_role: UserRole::User,
        };
        assert_eq!(user.display_name(), "x@example.com");
    }

    #[test]
    fn role_parse() {
        assert_eq!(UserRole::parse("Admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("owner"), None);
    }
}
