//! # Reviewer Service Shared Library
//!
//! This crate contains the domain types, persistence port and reviewer
//! assignment engine used by the Reviewer Service API server.
//!
//! ## Module Organization
//!
//! - `models`: Team, user and pull request types
//! - `repository`: Persistence port (traits) with PostgreSQL and in-memory backends
//! - `service`: Reviewer selection, pull request lifecycle and team lifecycle
//! - `db`: Connection pool and migrations

pub mod db;
pub mod models;
pub mod repository;
pub mod service;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
