//! Shared library for the campaign Lambda functions.
//!
//! This crate provides configuration, persistence, identity resolution, and the
//! invitation workflow used across all Lambda functions.

pub mod auth;
pub mod campaigns;
pub mod characters;
pub mod config;
pub mod db;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod identity;
pub mod invites;
pub mod mailer;
pub mod models;
pub mod queue;
pub mod secrets;
pub mod sessions;
pub mod store;

pub use auth::{Principal, Role, RoleSet};
pub use config::Config;
pub use error::{Error, Result};
pub use store::PgStore;
