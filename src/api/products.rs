//! Product management endpoints
//!
//! Alongside the CRUD routes this module serves `/products-data`, the
//! server-side feed for the admin page's AJAX grid: filtered, searched,
//! sorted, and paged in the store, wrapped in the DataTables envelope.

use axum::http::StatusCode;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::datatable::{RowAction, TableRequest, TableResponse, row_actions};
use crate::db::{CreateProduct, ProductRecord, UpdateProduct};
use crate::error::{ApiError, FieldErrors};

/// Form body for creating or updating a product. Fields arrive as the admin
/// form sends them (price as free text, validated as numeric); everything is
/// optional at the wire level so validation can report every missing field.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProductSaved {
    pub message: &'static str,
    pub product: ProductRecord,
}

/// One row of the grid response. `category` is the joined name with a `-`
/// placeholder when unresolvable; `actions` are structured operation
/// descriptors, never markup.
#[derive(Debug, Serialize)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: String,
    pub actions: Vec<RowAction>,
}

impl From<ProductRecord> for ProductRow {
    fn from(record: ProductRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            price: record.price,
            category: record.category_name.unwrap_or_else(|| "-".to_string()),
            actions: row_actions(record.id),
        }
    }
}

#[derive(Debug, Default)]
struct ValidatedFields {
    name: Option<String>,
    price: Option<Decimal>,
    errors: FieldErrors,
}

/// Field-shape validation: everything that can be checked without the store.
fn validate_fields(form: &ProductForm) -> ValidatedFields {
    let mut v = ValidatedFields::default();

    let name = form.name.as_deref().map(str::trim).unwrap_or("");
    if name.is_empty() {
        v.errors
            .entry("name")
            .or_default()
            .push("The name field is required.".to_string());
    } else if name.chars().count() > 255 {
        v.errors
            .entry("name")
            .or_default()
            .push("The name may not be greater than 255 characters.".to_string());
    } else {
        v.name = Some(name.to_string());
    }

    match form.price.as_deref().map(str::trim) {
        None | Some("") => {
            v.errors
                .entry("price")
                .or_default()
                .push("The price field is required.".to_string());
        }
        Some(raw) => match raw.parse::<Decimal>() {
            Ok(price) => v.price = Some(price),
            Err(_) => {
                v.errors
                    .entry("price")
                    .or_default()
                    .push("The price must be a number.".to_string());
            }
        },
    }

    if form.category_id.is_none() {
        v.errors
            .entry("category_id")
            .or_default()
            .push("The category id field is required.".to_string());
    }

    v
}

/// Full validation, including the category existence check. Reports every
/// failing field in one response; nothing is written on failure.
async fn validated(state: &AppState, form: &ProductForm) -> Result<CreateProduct, ApiError> {
    let mut v = validate_fields(form);

    if let Some(id) = form.category_id
        && state.db.categories().get_by_id(id).await?.is_none()
    {
        v.errors
            .entry("category_id")
            .or_default()
            .push("The selected category id is invalid.".to_string());
    }

    match (v.name, v.price, form.category_id) {
        (Some(name), Some(price), Some(category_id)) if v.errors.is_empty() => Ok(CreateProduct {
            name,
            description: form.description.clone(),
            price,
            category_id,
        }),
        _ => Err(ApiError::Validation(v.errors)),
    }
}

/// List all products with their category names
async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<ProductRecord>>, ApiError> {
    let products = state.db.products().list().await?;
    Ok(Json(products))
}

/// Grid feed: filtered, searched, sorted, paged product rows in the
/// DataTables envelope, echoing the caller's `draw` token
async fn products_data(
    State(state): State<AppState>,
    Query(req): Query<TableRequest>,
) -> Result<Json<TableResponse<ProductRow>>, ApiError> {
    let page = state.db.products().data_table(&req).await?;

    Ok(Json(TableResponse {
        draw: req.draw().to_string(),
        records_total: page.total,
        records_filtered: page.filtered,
        data: page.rows.into_iter().map(ProductRow::from).collect(),
    }))
}

/// Get a single product by ID
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProductRecord>, ApiError> {
    let product = state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("product"))?;

    Ok(Json(product))
}

/// Create a new product
async fn create_product(
    State(state): State<AppState>,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<ProductSaved>), ApiError> {
    let input = validated(&state, &form).await?;

    let product = state.db.products().create(input).await?;
    tracing::info!(id = product.id, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductSaved {
            message: "Product added successfully!",
            product,
        }),
    ))
}

/// Update an existing product
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<ProductForm>,
) -> Result<Json<ProductSaved>, ApiError> {
    // Resolve the target before validating, so an unknown id is a 404 even
    // when the body is also invalid.
    if state.db.products().get_by_id(id).await?.is_none() {
        return Err(ApiError::NotFound("product"));
    }

    let input = validated(&state, &form).await?;

    let product = state
        .db
        .products()
        .update(
            id,
            UpdateProduct {
                name: input.name,
                description: input.description,
                price: input.price,
                category_id: input.category_id,
            },
        )
        .await?
        .ok_or(ApiError::NotFound("product"))?;

    Ok(Json(ProductSaved {
        message: "Product updated successfully!",
        product,
    }))
}

/// Delete a product
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.db.products().delete(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("product"));
    }
    tracing::info!(id, "Product deleted");

    Ok(Json(serde_json::json!({
        "message": "Product deleted successfully!"
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products-data", get(products_data))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::http::Uri;
    use chrono::Utc;

    use crate::config::Config;
    use crate::db::{self, CreateCategory};

    async fn test_state() -> AppState {
        AppState {
            config: Arc::new(Config {
                port: 0,
                database_url: "sqlite::memory:".to_string(),
                database_max_connections: 1,
            }),
            db: db::test_db().await,
        }
    }

    async fn seed_catalog(state: &AppState) -> (i64, i64) {
        let electronics = state
            .db
            .categories()
            .create(CreateCategory {
                name: "Electronics".to_string(),
            })
            .await
            .unwrap()
            .id;
        let books = state
            .db
            .categories()
            .create(CreateCategory {
                name: "Books".to_string(),
            })
            .await
            .unwrap()
            .id;

        state
            .db
            .products()
            .create(CreateProduct {
                name: "Phone".to_string(),
                description: Some("flagship".to_string()),
                price: "599.00".parse().unwrap(),
                category_id: electronics,
            })
            .await
            .unwrap();
        state
            .db
            .products()
            .create(CreateProduct {
                name: "Novel".to_string(),
                description: Some("paperback".to_string()),
                price: "15.00".parse().unwrap(),
                category_id: books,
            })
            .await
            .unwrap();

        (electronics, books)
    }

    #[tokio::test]
    async fn bracketed_query_keys_reach_the_grid_and_draw_is_echoed() {
        let state = test_state().await;
        seed_catalog(&state).await;

        // The widget sends its parameters as flat bracketed keys,
        // percent-encoded on the wire.
        let uri: Uri = "/api/products-data?draw=7&start=0&length=10\
                        &search%5Bvalue%5D=pho\
                        &order%5B0%5D%5Bcolumn%5D=3&order%5B0%5D%5Bdir%5D=desc\
                        &category_id="
            .parse()
            .unwrap();
        let Query(req) = Query::<TableRequest>::try_from_uri(&uri).unwrap();

        assert_eq!(req.draw(), "7");
        assert_eq!(req.search_term(), Some("pho"));
        assert_eq!(req.order_column, Some(3));
        assert_eq!(req.order_dir.as_deref(), Some("desc"));
        assert_eq!(req.page_length(), Some(10));
        assert_eq!(req.category_filter(), None);

        let Json(response) = products_data(State(state), Query(req)).await.unwrap();
        assert_eq!(response.draw, "7");
        assert_eq!(response.records_total, 2);
        assert_eq!(response.records_filtered, 1);
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].name, "Phone");
    }

    #[tokio::test]
    async fn updating_a_missing_product_is_not_found_before_validation() {
        let state = test_state().await;
        seed_catalog(&state).await;

        let form = ProductForm {
            name: Some("Phone".to_string()),
            description: None,
            price: Some("599.00".to_string()),
            category_id: Some(9999),
        };

        // Unknown product id wins over the invalid category in the body.
        let err = update_product(State(state.clone()), Path(9999), Json(form))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("product")));

        // With an existing product the same body is a validation failure.
        let existing = state.db.products().list().await.unwrap()[0].id;
        let form = ProductForm {
            name: Some("Phone".to_string()),
            description: None,
            price: Some("599.00".to_string()),
            category_id: Some(9999),
        };
        let err = update_product(State(state), Path(existing), Json(form))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn empty_form_reports_every_required_field_at_once() {
        let v = validate_fields(&ProductForm::default());
        assert!(v.errors.contains_key("name"));
        assert!(v.errors.contains_key("price"));
        assert!(v.errors.contains_key("category_id"));
        assert_eq!(v.errors.len(), 3);
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let form = ProductForm {
            name: Some("Phone".to_string()),
            price: Some("cheap".to_string()),
            category_id: Some(1),
            ..Default::default()
        };
        let v = validate_fields(&form);
        assert_eq!(
            v.errors.get("price").map(Vec::as_slice),
            Some(&["The price must be a number.".to_string()][..])
        );
        assert!(!v.errors.contains_key("name"));
    }

    #[test]
    fn well_formed_fields_pass_shape_validation() {
        let form = ProductForm {
            name: Some("Phone".to_string()),
            description: Some("flagship".to_string()),
            price: Some("599.00".to_string()),
            category_id: Some(1),
        };
        let v = validate_fields(&form);
        assert!(v.errors.is_empty());
        assert_eq!(v.name.as_deref(), Some("Phone"));
        assert_eq!(v.price, Some("599.00".parse().unwrap()));
    }

    #[test]
    fn row_formatter_falls_back_to_dash_without_a_category() {
        let now = Utc::now();
        let record = ProductRecord {
            id: 7,
            name: "Phone".to_string(),
            description: None,
            price: "599.00".parse().unwrap(),
            category_id: 1,
            category_name: None,
            created_at: now,
            updated_at: now,
        };

        let row = ProductRow::from(record);
        assert_eq!(row.category, "-");
        assert_eq!(row.actions.len(), 3);
        assert!(row.actions.iter().all(|a| a.id == 7));
    }

    #[test]
    fn row_formatter_passes_fields_through() {
        let now = Utc::now();
        let record = ProductRecord {
            id: 1,
            name: "Novel".to_string(),
            description: Some("paperback".to_string()),
            price: "15.00".parse().unwrap(),
            category_id: 2,
            category_name: Some("Books".to_string()),
            created_at: now,
            updated_at: now,
        };

        let row = ProductRow::from(record);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Novel");
        assert_eq!(json["description"], "paperback");
        assert_eq!(json["price"], "15.00");
        assert_eq!(json["category"], "Books");
    }
}
