//! API route handlers
//!
//! This module contains all route handlers organized by resource:
//!
//! - `health`: Health check endpoint
//! - `teams`: Team creation, lookup and member deactivation
//! - `users`: User activation and review listings
//! - `pull_requests`: Pull request creation, merge and reviewer reassignment
//! - `stats`: Review load statistics

pub mod health;
pub mod pull_requests;
pub mod stats;
pub mod teams;
pub mod users;
