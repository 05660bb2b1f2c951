use super::super::models::User;
use crate::core::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Set the delinquent flag
    ///
    /// # Returns
    /// * `Result<bool>` - `false` when no user has this id
    async fn set_delinquent(&self, id: i64, is_delinquent: bool) -> Result<bool>;
}

pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, is_delinquent, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_delinquent(&self, id: i64, is_delinquent: bool) -> Result<bool> {
        // Affected rows is zero when the flag already matches, so check existence first
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET is_delinquent = ? WHERE id = ?")
            .bind(is_delinquent)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(true)
    }
}
