//! # Branch Repository

use market_core::Branch;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for branch database operations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    pub async fn insert(&self, branch: &Branch) -> DbResult<()> {
        debug!(id = %branch.id, name = %branch.name, "Inserting branch");

        sqlx::query("INSERT INTO branches (id, name, address, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&branch.id)
            .bind(&branch.name)
            .bind(&branch.address)
            .bind(branch.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            "SELECT id, name, address, created_at FROM branches WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }
}
