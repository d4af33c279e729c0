//! Domain models for the Reviewer Service
//!
//! # Models
//!
//! - `team`: Teams and their member listings
//! - `user`: Users (reviewers and authors) bound to a team
//! - `pull_request`: Pull requests, their status state machine and reviewers
//!
//! Persistence lives in `crate::repository`; these types carry no
//! database handles of their own.

pub mod pull_request;
pub mod team;
pub mod user;

pub use pull_request::{PullRequest, PullRequestStatus, MAX_REVIEWERS};
pub use team::{Team, TeamId};
pub use user::{TeamMember, User};
