use super::super::models::BillingConfig;
use crate::core::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Read-only access to named billing parameters
#[async_trait]
pub trait BillingConfigRepository: Send + Sync {
    /// Find a config row by its lower-case name
    async fn find_by_name(&self, name: &str) -> Result<Option<BillingConfig>>;
}

pub struct MySqlBillingConfigRepository {
    pool: MySqlPool,
}

impl MySqlBillingConfigRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingConfigRepository for MySqlBillingConfigRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<BillingConfig>> {
        let config = sqlx::query_as::<_, BillingConfig>(
            r#"
            SELECT id, name, value, created_at, updated_at
            FROM billing_configs
            WHERE name = ?
            LIMIT 1
            "#,
        )
        .bind(name.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }
}
