//! # notifyhub-core
//!
//! Core crate for the NotifyHub notification client. Contains the
//! collaborator traits (push transport, REST history API, credentials),
//! configuration schemas, pagination/sorting types, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other NotifyHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
