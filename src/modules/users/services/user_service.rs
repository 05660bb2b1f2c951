use super::super::models::User;
use super::super::repositories::UserRepository;
use crate::core::{AppError, Result};
use std::sync::Arc;
use tracing::info;

/// Borrower lookups and the delinquent flag
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// # Returns
    /// * `AppError::NotFound` when the user does not exist
    pub async fn get_user(&self, user_id: i64) -> Result<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {} not found", user_id)))
    }

    pub async fn is_delinquent(&self, user_id: i64) -> Result<bool> {
        Ok(self.get_user(user_id).await?.is_delinquent)
    }

    pub async fn mark_delinquent(&self, user_id: i64) -> Result<()> {
        self.set_flag(user_id, true).await
    }

    pub async fn mark_not_delinquent(&self, user_id: i64) -> Result<()> {
        self.set_flag(user_id, false).await
    }

    async fn set_flag(&self, user_id: i64, is_delinquent: bool) -> Result<()> {
        if !self.user_repo.set_delinquent(user_id, is_delinquent).await? {
            return Err(AppError::not_found(format!("User {} not found", user_id)));
        }

        info!(user_id = user_id, is_delinquent = is_delinquent, "User delinquency updated");
        Ok(())
    }
}
