// src/lib.rs

//! LibraryCard client library: book metadata, catalog rules, and the
//! LibraryCard REST API.

pub mod catalog;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
pub mod validation;
