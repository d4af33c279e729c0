//! Assignment engine
//!
//! - [`selection`]: reviewer selection policy and randomness sources
//! - [`pull_request`]: pull request lifecycle (create, merge, reassign)
//! - [`team`]: teams and cascading deactivation
//! - [`user`]: user activation
//!
//! Services hold no state of their own; every call reloads what it needs
//! through the repositories.
//!
//! # Example
//!
//! ```
//! use reviewer_shared::repository::Repositories;
//! use reviewer_shared::service::{selection::ReviewerSelector, Services};
//!
//! let services = Services::new(&Repositories::in_memory(), ReviewerSelector::entropy());
//! ```

pub mod error;
pub mod pull_request;
pub mod selection;
pub mod team;
pub mod user;

pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use pull_request::{PullRequestService, Reassignment};
pub use selection::{EntropySource, FixedSource, RandomSource, ReviewerSelector};
pub use team::{DeactivationReport, ReassignedSlot, TeamService, UnreplacedSlot};
pub use user::UserService;

use std::sync::Arc;

use crate::repository::Repositories;

/// All services wired to one set of repositories
#[derive(Clone)]
pub struct Services {
    pub pull_requests: Arc<PullRequestService>,
    pub teams: Arc<TeamService>,
    pub users: Arc<UserService>,
}

impl Services {
    pub fn new(repositories: &Repositories, selector: ReviewerSelector) -> Self {
        let pull_requests = Arc::new(PullRequestService::new(repositories, selector));
        let teams = Arc::new(TeamService::new(repositories, pull_requests.clone()));
        let users = Arc::new(UserService::new(repositories));

        Self {
            pull_requests,
            teams,
            users,
        }
    }
}
