//! Product database repository
//!
//! Products always come back with their category name attached (read-only
//! LEFT JOIN) so the listing can search and display it without per-row
//! lookups. Price is stored as canonical two-fractional-digit text; the
//! stored text is what substring search runs against, and ordering casts it
//! to REAL so "10.00" sorts after "9.00".

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::datatable::{
    Column, Predicate, TableRequest, compile_predicates, order_clause, searchable_exprs,
};

/// Grid columns of the product listing, in the order the admin page
/// declares them. `id` is an opaque sequential identifier (neither orderable
/// nor searchable), `category` is searched through the joined relation but
/// not independently orderable, and `actions` exists only in the response.
pub const PRODUCT_COLUMNS: &[Column] = &[
    Column {
        name: "id",
        expr: Some("products.id"),
        order_expr: None,
        orderable: false,
        searchable: false,
    },
    Column {
        name: "name",
        expr: Some("products.name"),
        order_expr: None,
        orderable: true,
        searchable: true,
    },
    Column {
        name: "description",
        expr: Some("products.description"),
        order_expr: None,
        orderable: true,
        searchable: true,
    },
    Column {
        name: "price",
        expr: Some("products.price"),
        order_expr: Some("CAST(products.price AS REAL)"),
        orderable: true,
        searchable: true,
    },
    Column {
        name: "category",
        expr: Some("categories.name"),
        order_expr: None,
        orderable: false,
        searchable: true,
    },
    Column {
        name: "actions",
        expr: None,
        order_expr: None,
        orderable: false,
        searchable: false,
    },
];

const SELECT_COLUMNS: &str = "products.id, products.name, products.description, \
     products.price, products.category_id, categories.name AS category_name, \
     products.created_at, products.updated_at";

const FROM_JOIN: &str = "FROM products LEFT JOIN categories ON categories.id = products.category_id";

const DEFAULT_ORDER: &str = "products.id ASC";

/// Product record from database, with the joined category name
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, SqliteRow> for ProductRecord {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let price_text: String = row.try_get("price")?;
        let price = price_text
            .parse::<Decimal>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price,
            category_id: row.try_get("category_id")?,
            category_name: row.try_get("category_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Input for creating a product
#[derive(Debug)]
pub struct CreateProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
}

/// Input for updating a product (full replacement, all fields validated)
#[derive(Debug)]
pub struct UpdateProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
}

/// One page of the filtered product listing plus the envelope counts
#[derive(Debug)]
pub struct TablePage {
    pub rows: Vec<ProductRecord>,
    /// Row count ignoring all filters
    pub total: i64,
    /// Row count after filters, before paging
    pub filtered: i64,
}

/// Normalize a price to exactly two fractional digits before storage
fn canonical_price(price: Decimal) -> String {
    let mut price = price;
    price.rescale(2);
    price.to_string()
}

pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all products with category names, in insertion order
    pub async fn list(&self) -> Result<Vec<ProductRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} {FROM_JOIN} ORDER BY {DEFAULT_ORDER}");
        let records = sqlx::query_as::<_, ProductRecord>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Get a product by ID, with its category name
    pub async fn get_by_id(&self, id: i64) -> Result<Option<ProductRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} {FROM_JOIN} WHERE products.id = ?");
        let record = sqlx::query_as::<_, ProductRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Create a new product
    pub async fn create(&self, input: CreateProduct) -> Result<ProductRecord> {
        let now = Utc::now();
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO products (name, description, price, category_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(canonical_price(input.price))
        .bind(input.category_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow!("inserted product {id} disappeared"))
    }

    /// Update a product, returning `None` when it does not exist
    pub async fn update(&self, id: i64, input: UpdateProduct) -> Result<Option<ProductRecord>> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?, description = ?, price = ?, category_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(canonical_price(input.price))
        .bind(input.category_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete a product
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Run the grid listing query: compile the request's filters, count
    /// total and filtered rows, and fetch the requested page in the
    /// requested order.
    pub async fn data_table(&self, req: &TableRequest) -> Result<TablePage> {
        let mut predicates = Vec::new();

        if let Some(value) = req.category_filter() {
            predicates.push(Predicate::Equality {
                column: "products.category_id",
                value: value.to_string(),
            });
        }

        if let Some(term) = req.search_term() {
            predicates.push(Predicate::SubstringAny {
                columns: searchable_exprs(PRODUCT_COLUMNS),
                term: term.to_string(),
            });
        }

        let filter = compile_predicates(&predicates);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) {FROM_JOIN} {}", filter.where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for bind in &filter.binds {
            count_query = count_query.bind(bind);
        }
        let filtered = count_query.fetch_one(&self.pool).await?;

        let order = order_clause(PRODUCT_COLUMNS, req, DEFAULT_ORDER);
        let limit = match req.page_length() {
            Some(_) => "LIMIT ? OFFSET ?",
            None => "",
        };
        let data_sql = format!(
            "SELECT {SELECT_COLUMNS} {FROM_JOIN} {} {order} {limit}",
            filter.where_clause
        );

        let mut data_query = sqlx::query_as::<_, ProductRecord>(&data_sql);
        for bind in &filter.binds {
            data_query = data_query.bind(bind);
        }
        if let Some(length) = req.page_length() {
            data_query = data_query.bind(length).bind(req.offset());
        }

        let rows = data_query.fetch_all(&self.pool).await?;

        tracing::debug!(
            total,
            filtered,
            returned = rows.len(),
            search = req.search_term().unwrap_or(""),
            category = req.category_filter().unwrap_or(""),
            "Product listing fetched"
        );

        Ok(TablePage {
            rows,
            total,
            filtered,
        })
    }

    /// Count products ignoring all filters
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
