//! Category management endpoints

use axum::http::StatusCode;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::db::{CategoryRecord, CreateCategory, UpdateCategory};
use crate::error::{ApiError, FieldErrors};

/// Form body for creating or updating a category. All fields optional at
/// the wire level so validation can report what is missing.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategorySaved {
    pub message: &'static str,
    pub category: CategoryRecord,
}

/// Validate a category form, reporting every failing field at once.
fn validate(form: &CategoryForm) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = form.name.as_deref().map(str::trim).unwrap_or("");
    if name.is_empty() {
        errors
            .entry("name")
            .or_default()
            .push("The name field is required.".to_string());
    } else if name.chars().count() > 255 {
        errors
            .entry("name")
            .or_default()
            .push("The name may not be greater than 255 characters.".to_string());
    }

    if errors.is_empty() {
        Ok(name.to_string())
    } else {
        Err(errors)
    }
}

/// List all categories (also feeds the product page's filter dropdown)
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryRecord>>, ApiError> {
    let categories = state.db.categories().list().await?;
    Ok(Json(categories))
}

/// Get a single category by ID
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryRecord>, ApiError> {
    let category = state
        .db
        .categories()
        .get_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("category"))?;

    Ok(Json(category))
}

/// Create a new category
async fn create_category(
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> Result<(StatusCode, Json<CategorySaved>), ApiError> {
    let name = validate(&form).map_err(ApiError::Validation)?;

    let category = state.db.categories().create(CreateCategory { name }).await?;
    tracing::info!(id = category.id, "Category created");

    Ok((
        StatusCode::CREATED,
        Json(CategorySaved {
            message: "Category added successfully!",
            category,
        }),
    ))
}

/// Update an existing category
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<CategorySaved>, ApiError> {
    let name = validate(&form).map_err(ApiError::Validation)?;

    let category = state
        .db
        .categories()
        .update(id, UpdateCategory { name })
        .await?
        .ok_or(ApiError::NotFound("category"))?;

    Ok(Json(CategorySaved {
        message: "Category updated successfully!",
        category,
    }))
}

/// Delete a category; its products are removed by the store's cascade
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.db.categories().delete(id).await?;
    if !deleted {
        return Err(ApiError::NotFound("category"));
    }
    tracing::info!(id, "Category deleted");

    Ok(Json(serde_json::json!({
        "message": "Category deleted successfully!"
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}
