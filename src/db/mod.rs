//! Database connection and operations

pub mod categories;
pub mod products;

use std::str::FromStr;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use categories::{CategoryRecord, CategoryRepository, CreateCategory, UpdateCategory};
pub use products::{
    CreateProduct, ProductRepository, ProductRecord, TablePage, UpdateProduct,
};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool.
    ///
    /// Foreign keys are enabled on every connection so the category ->
    /// product cascade delete is enforced by the store. An in-memory URL is
    /// pinned to a single connection, otherwise each pooled connection would
    /// see its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get a category repository
    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    /// Get a product repository
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> Database {
    let db = Database::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory database");
    db.migrate().await.expect("migrations");
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_the_database_file_and_persists_across_pools() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("stockroom.db").display());

        {
            let db = Database::connect(&url, 5).await.unwrap();
            db.migrate().await.unwrap();
            db.categories()
                .create(CreateCategory {
                    name: "Electronics".to_string(),
                })
                .await
                .unwrap();
        }

        let db = Database::connect(&url, 5).await.unwrap();
        db.migrate().await.unwrap();
        let categories = db.categories().list().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Electronics");
    }
}
