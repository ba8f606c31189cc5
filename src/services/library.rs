// src/services/library.rs

//! LibraryCard REST API client.
//!
//! Every call maps one-to-one onto an API endpoint. Non-success
//! responses become `Unauthorized` (401), `NotFound` (404) or `Api`
//! errors whose message is taken from the response body.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    AdminUser, ApiConfig, Book, BookUpdate, Invitation, Location, LoginRequest, NewBook,
    NewLocation, NewShelf, ProfileUpdate, RegisterRequest, RemovalRequest, Session, Shelf, User,
    UserRole,
};
use crate::services::BookStore;
use crate::utils::http;
use crate::validation;

/// Map a failed status and its body to an error.
pub fn status_error(status: StatusCode, body: &str) -> AppError {
    let message = http::error_message(status.as_u16(), body);
    match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::api(status.as_u16(), message),
    }
}

/// Client for the LibraryCard API.
#[derive(Clone)]
pub struct LibraryClient {
    base_url: Url,
    client: Client,
    token: Option<String>,
}

impl LibraryClient {
    /// Create an anonymous client.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base = format!("{}/", config.base_url.trim().trim_end_matches('/'));
        Ok(Self {
            base_url: Url::parse(&base)?,
            client: http::create_client(&config.user_agent, config.timeout_secs)?,
            token: None,
        })
    }

    /// Attach a session token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Absolute URL for an API path such as `api/books/3`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Like `request`, but fails early when no session token is set.
    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        if self.token.is_none() {
            return Err(AppError::Unauthorized(
                "no session token; run `librarycard login` first".into(),
            ));
        }
        self.request(method, path)
    }

    async fn read_body(response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            log::debug!("API responded {}: {}", status, body);
            Err(status_error(status, &body))
        }
    }

    async fn execute<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let body = Self::read_body(builder.send().await?).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn execute_empty(builder: RequestBuilder) -> Result<()> {
        Self::read_body(builder.send().await?).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Self::execute(self.authed(Method::GET, path)?).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        Self::execute(self.authed(method, path)?.json(body)).await
    }

    async fn post_empty<B: Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> Result<()> {
        Self::execute_empty(self.authed(Method::POST, path)?.json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        Self::execute_empty(self.authed(Method::DELETE, path)?).await
    }

    // --- Auth ---

    /// Sign in with email and password. Stores the returned token.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        turnstile_token: Option<String>,
    ) -> Result<Session> {
        validation::validate_email(email)?;
        let body = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            turnstile_token,
        };
        let session: Session =
            Self::execute(self.request(Method::POST, "api/auth/login")?.json(&body)).await?;
        self.token = Some(session.token.clone());
        log::info!("Signed in as {}", session.user.email);
        Ok(session)
    }

    /// Create an account. Stores the returned token.
    pub async fn register(&mut self, request: &RegisterRequest) -> Result<Session> {
        validation::validate_registration(request)?;
        let session: Session =
            Self::execute(self.request(Method::POST, "api/auth/register")?.json(request)).await?;
        self.token = Some(session.token.clone());
        Ok(session)
    }

    /// Ask for a password reset email.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        validation::validate_email(email)?;
        let builder = self
            .request(Method::POST, "api/auth/forgot-password")?
            .json(&json!({ "email": email.trim() }));
        Self::execute_empty(builder).await
    }

    /// Complete a reset with the emailed token.
    pub async fn reset_password(&self, token: &str, password: &str, confirmation: &str) -> Result<()> {
        validation::validate_password_change(password, confirmation)?;
        if token.trim().is_empty() {
            return Err(AppError::validation("Reset token is missing"));
        }
        let builder = self
            .request(Method::POST, "api/auth/reset-password")?
            .json(&json!({ "token": token.trim(), "password": password }));
        Self::execute_empty(builder).await
    }

    pub async fn current_user(&self) -> Result<User> {
        self.get("api/auth/me").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        if let Some(email) = &update.email {
            validation::validate_email(email)?;
        }
        self.send_json(Method::PUT, "api/users/profile", update).await
    }

    pub async fn change_password(
        &self,
        current: &str,
        new: &str,
        confirmation: &str,
    ) -> Result<()> {
        validation::validate_password_change(new, confirmation)?;
        let body = json!({ "currentPassword": current, "newPassword": new });
        Self::execute_empty(self.authed(Method::PUT, "api/users/password")?.json(&body)).await
    }

    // --- Books ---

    pub async fn list_books(&self, location_id: Option<i64>) -> Result<Vec<Book>> {
        let mut builder = self.authed(Method::GET, "api/books")?;
        if let Some(id) = location_id {
            builder = builder.query(&[("location_id", id)]);
        }
        Self::execute(builder).await
    }

    pub async fn get_book(&self, id: i64) -> Result<Book> {
        self.get(&format!("api/books/{id}")).await
    }

    pub async fn add_book(&self, book: &NewBook) -> Result<Book> {
        if book.metadata.title.trim().is_empty() {
            return Err(AppError::validation("Book title is required"));
        }
        self.send_json(Method::POST, "api/books", book).await
    }

    pub async fn update_book(&self, id: i64, update: &BookUpdate) -> Result<Book> {
        self.send_json(Method::PUT, &format!("api/books/{id}"), update)
            .await
    }

    pub async fn delete_book(&self, id: i64) -> Result<()> {
        self.delete(&format!("api/books/{id}")).await
    }

    pub async fn move_book(&self, id: i64, shelf_id: i64) -> Result<Book> {
        let update = BookUpdate {
            shelf_id: Some(shelf_id),
            ..BookUpdate::default()
        };
        self.update_book(id, &update).await
    }

    pub async fn checkout_book(&self, id: i64) -> Result<Book> {
        self.send_json(Method::POST, &format!("api/books/{id}/checkout"), &json!({}))
            .await
    }

    pub async fn return_book(&self, id: i64) -> Result<Book> {
        self.send_json(Method::POST, &format!("api/books/{id}/return"), &json!({}))
            .await
    }

    // --- Locations ---

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        self.get("api/locations").await
    }

    pub async fn create_location(&self, location: &NewLocation) -> Result<Location> {
        let location = NewLocation {
            name: validation::validate_name("Location", &location.name)?,
            description: location.description.clone(),
        };
        self.send_json(Method::POST, "api/locations", &location).await
    }

    pub async fn update_location(&self, id: i64, location: &NewLocation) -> Result<Location> {
        let location = NewLocation {
            name: validation::validate_name("Location", &location.name)?,
            description: location.description.clone(),
        };
        self.send_json(Method::PUT, &format!("api/locations/{id}"), &location)
            .await
    }

    pub async fn delete_location(&self, id: i64) -> Result<()> {
        self.delete(&format!("api/locations/{id}")).await
    }

    /// Leave a location shared with you.
    pub async fn leave_location(&self, id: i64) -> Result<()> {
        self.post_empty(&format!("api/locations/{id}/leave"), &json!({}))
            .await
    }

    // --- Shelves ---

    pub async fn list_shelves(&self, location_id: i64) -> Result<Vec<Shelf>> {
        self.get(&format!("api/locations/{location_id}/shelves"))
            .await
    }

    pub async fn create_shelf(&self, location_id: i64, name: &str) -> Result<Shelf> {
        let shelf = NewShelf {
            name: validation::validate_name("Shelf", name)?,
            location_id,
        };
        self.send_json(Method::POST, "api/shelves", &shelf).await
    }

    pub async fn rename_shelf(&self, id: i64, name: &str) -> Result<Shelf> {
        let name = validation::validate_name("Shelf", name)?;
        self.send_json(Method::PUT, &format!("api/shelves/{id}"), &json!({ "name": name }))
            .await
    }

    pub async fn delete_shelf(&self, id: i64) -> Result<()> {
        self.delete(&format!("api/shelves/{id}")).await
    }

    // --- Invitations ---

    pub async fn list_invitations(&self, location_id: i64) -> Result<Vec<Invitation>> {
        self.get(&format!("api/locations/{location_id}/invitations"))
            .await
    }

    pub async fn invite(&self, location_id: i64, email: &str) -> Result<Invitation> {
        validation::validate_email(email)?;
        let body = json!({ "location_id": location_id, "email": email.trim() });
        self.send_json(Method::POST, "api/invitations", &body).await
    }

    pub async fn revoke_invitation(&self, id: i64) -> Result<()> {
        self.delete(&format!("api/invitations/{id}")).await
    }

    /// Join the location an invitation token points at.
    pub async fn accept_invitation(&self, token: &str) -> Result<Location> {
        if token.trim().is_empty() {
            return Err(AppError::validation("Invitation token is missing"));
        }
        let body = json!({ "token": token.trim() });
        self.send_json(Method::POST, "api/invitations/accept", &body)
            .await
    }

    // --- Removal requests ---

    pub async fn request_removal(&self, book_id: i64, reason: Option<&str>) -> Result<RemovalRequest> {
        let body = json!({ "book_id": book_id, "reason": reason.map(str::trim) });
        self.send_json(Method::POST, "api/removal-requests", &body)
            .await
    }

    pub async fn list_removal_requests(&self) -> Result<Vec<RemovalRequest>> {
        self.get("api/admin/removal-requests").await
    }

    pub async fn approve_removal(&self, id: i64) -> Result<RemovalRequest> {
        self.send_json(
            Method::POST,
            &format!("api/admin/removal-requests/{id}/approve"),
            &json!({}),
        )
        .await
    }

    pub async fn deny_removal(&self, id: i64) -> Result<RemovalRequest> {
        self.send_json(
            Method::POST,
            &format!("api/admin/removal-requests/{id}/deny"),
            &json!({}),
        )
        .await
    }

    // --- Admin ---

    pub async fn list_users(&self) -> Result<Vec<AdminUser>> {
        self.get("api/admin/users").await
    }

    pub async fn set_user_role(&self, user_id: i64, role: UserRole) -> Result<AdminUser> {
        let body = json!({ "role": role.as_str() });
        self.send_json(Method::PUT, &format!("api/admin/users/{user_id}/role"), &body)
            .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<()> {
        self.delete(&format!("api/admin/users/{user_id}")).await
    }

    pub async fn list_all_locations(&self) -> Result<Vec<Location>> {
        self.get("api/admin/locations").await
    }

    /// Hand a location to another user.
    pub async fn transfer_ownership(&self, location_id: i64, new_owner_id: i64) -> Result<Location> {
        let body = json!({ "new_owner_id": new_owner_id });
        self.send_json(
            Method::POST,
            &format!("api/admin/locations/{location_id}/transfer"),
            &body,
        )
        .await
    }
}

#[async_trait]
impl BookStore for LibraryClient {
    async fn list_books(&self, location_id: Option<i64>) -> Result<Vec<Book>> {
        LibraryClient::list_books(self, location_id).await
    }

    async fn add_book(&self, book: NewBook) -> Result<Book> {
        LibraryClient::add_book(self, &book).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> LibraryClient {
        let config = ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        };
        LibraryClient::new(&config).unwrap()
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let c = client("https://example.org/v2");
        assert_eq!(
            c.endpoint("api/books/3").unwrap().as_str(),
            "https://example.org/v2/api/books/3"
        );
        assert_eq!(
            c.endpoint("/api/books").unwrap().as_str(),
            "https://example.org/v2/api/books"
        );
    }

    #[test]
    fn status_errors_are_classified() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, r#"{"error": "Token expired"}"#),
            AppError::Unauthorized(m) if m == "Token expired"
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, ""),
            AppError::NotFound(m) if m == "Request failed with status 404"
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "Shelf exists"),
            AppError::Api { status: 409, message } if message == "Shelf exists"
        ));
    }

    #[tokio::test]
    async fn authed_calls_need_a_token() {
        let c = client("https://example.org");
        assert!(c.list_books(None).await.unwrap_err().is_unauthorized());
        assert!(c.list_locations().await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn blank_location_name_is_rejected_once() {
        let c = client("https://example.org").with_token("t");
        let blank = NewLocation {
            name: "  ".into(),
            description: None,
        };
        assert!(matches!(
            c.create_location(&blank).await,
            Err(AppError::Validation(m)) if m == "Location name is required"
        ));
    }

    #[tokio::test]
    async fn inputs_are_validated_before_sending() {
        let c = client("https://example.org").with_token("t");
        assert!(matches!(
            c.create_shelf(1, "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            c.invite(1, "not-an-email").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            c.reset_password("tok", "weak", "weak").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            c.accept_invitation(" ").await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn token_management() {
        let mut c = client("https://example.org");
        assert!(c.token().is_none());
        c.set_token(Some("abc".into()));
        assert_eq!(c.token(), Some("abc"));
    }
}
