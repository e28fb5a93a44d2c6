//! Category database repository

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

/// Category record from database
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug)]
pub struct CreateCategory {
    pub name: String,
}

/// Input for updating a category
#[derive(Debug)]
pub struct UpdateCategory {
    pub name: String,
}

pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all categories in insertion order
    pub async fn list(&self) -> Result<Vec<CategoryRecord>> {
        let records = sqlx::query_as::<_, CategoryRecord>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM categories
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get a category by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<CategoryRecord>> {
        let record = sqlx::query_as::<_, CategoryRecord>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM categories
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Create a new category
    pub async fn create(&self, input: CreateCategory) -> Result<CategoryRecord> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, CategoryRecord>(
            r#"
            INSERT INTO categories (name, created_at, updated_at)
            VALUES (?, ?, ?)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    /// Update a category, returning `None` when it does not exist
    pub async fn update(&self, id: i64, input: UpdateCategory) -> Result<Option<CategoryRecord>> {
        let record = sqlx::query_as::<_, CategoryRecord>(
            r#"
            UPDATE categories
            SET name = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Delete a category. Products referencing it are removed by the
    /// store's cascade.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
