// src/models/mod.rs

//! Domain models for the LibraryCard client.
//!
//! These mirror the JSON shapes of the LibraryCard API and the metadata
//! providers; the API owns persistence and integrity.

mod book;
mod config;
mod library;
mod user;

// Re-export all public types
pub use book::{Book, BookMetadata, BookStatus, BookUpdate, Enrichment, NewBook, published_year};
pub use config::{
    API_URL_ENV, ApiConfig, Config, LoggingConfig, MetadataConfig, StorageConfig, VisionConfig,
};
pub use library::{
    Invitation, InvitationStatus, Location, NewLocation, NewShelf, RemovalRequest, RemovalStatus,
    Shelf,
};
pub use user::{
    AdminUser, AuthProvider, LoginRequest, ProfileUpdate, RegisterRequest, Session, User, UserRole,
};
