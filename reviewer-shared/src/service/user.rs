//! User activation.

use std::sync::Arc;

use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::models::User;
use crate::repository::{Repositories, UserRepository};

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repositories: &Repositories) -> Self {
        Self {
            users: repositories.users.clone(),
        }
    }

    /// Sets the active flag and returns the user as stored afterwards.
    ///
    /// Does not touch the user's open reviews.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user does not exist.
    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> ServiceResult<User> {
        self.users.set_active(user_id, is_active).await?;

        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))?;

        info!(user_id = %user_id, is_active, "User activity updated");
        Ok(user)
    }
}
