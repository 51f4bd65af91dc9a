//! SQLite implementation of the ScoredStore.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{StoreError, StoreResult};
use crate::domain::ports::ScoredStore;

#[derive(Clone)]
pub struct SqliteScoredStore {
    pool: SqlitePool,
}

impl SqliteScoredStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Score of `member` in the set at `key`, if present.
    pub async fn score(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let row: Option<(f64,)> =
            sqlx::query_as("SELECT score FROM scored_elements WHERE key = ? AND member = ?")
                .bind(key)
                .bind(member)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(score,)| score))
    }
}

#[async_trait]
impl ScoredStore for SqliteScoredStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"SELECT EXISTS (SELECT 1 FROM scored_elements WHERE key = ?1)
                   OR EXISTS (SELECT 1 FROM scalars WHERE key = ?1)"#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn exists_in_scored_set(&self, key: &str, member: &str) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM scored_elements WHERE key = ? AND member = ?)",
        )
        .bind(key)
        .bind(member)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn set_element_by_score(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO scored_elements (key, member, score)
               VALUES (?, ?, ?)
               ON CONFLICT (key, member) DO UPDATE SET
                   score = excluded.score,
                   updated_at = datetime('now')"#,
        )
        .bind(key)
        .bind(member)
        .bind(score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_scored_element(
        &self,
        key: &str,
        member: &str,
        delta: f64,
    ) -> StoreResult<f64> {
        let (score,): (f64,) = sqlx::query_as(
            r#"INSERT INTO scored_elements (key, member, score)
               VALUES (?, ?, ?)
               ON CONFLICT (key, member) DO UPDATE SET
                   score = scored_elements.score + excluded.score,
                   updated_at = datetime('now')
               RETURNING score"#,
        )
        .bind(key)
        .bind(member)
        .bind(delta)
        .fetch_one(&self.pool)
        .await?;
        Ok(score)
    }

    async fn get_highest_scored_elements(&self, key: &str, n: usize) -> StoreResult<Vec<String>> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT member FROM scored_elements
               WHERE key = ?
               ORDER BY score DESC, member DESC
               LIMIT ?"#,
        )
        .bind(key)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(member,)| member).collect())
    }

    async fn get_random_from_scored_set(&self, key: &str) -> StoreResult<String> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT member FROM scored_elements WHERE key = ? ORDER BY RANDOM() LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(member,)| member)
            .ok_or_else(|| StoreError::EmptySet(key.to_string()))
    }

    async fn get(&self, key: &str) -> StoreResult<String> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM scalars WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(value,)| value)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO scalars (key, value) VALUES (?, ?)
               ON CONFLICT (key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = datetime('now')"#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM scored_elements WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM scalars WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
