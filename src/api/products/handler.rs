//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::db::repository::product;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, MAX_URL_LEN, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};

/// 商品列表查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// 按分类名过滤
    pub category: Option<String>,
    /// 大小写不敏感的子串搜索 (名称 / 描述 / 分类)
    pub query: Option<String>,
}

fn validate_create(data: &ProductCreate) -> AppResult<()> {
    validate_required_text(&data.name, "name", MAX_NAME_LEN)?;
    validate_required_text(&data.category, "category", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&data.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&data.image, "image", MAX_URL_LEN)?;
    if !data.price.is_finite() || data.price < 0.0 {
        return Err(AppError::validation("Price must be non-negative"));
    }
    if data.stock.is_some_and(|s| s < 0) {
        return Err(AppError::validation("Stock must be non-negative"));
    }
    Ok(())
}

fn validate_update(data: &ProductUpdate) -> AppResult<()> {
    if let Some(ref name) = data.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(ref category) = data.category {
        validate_required_text(category, "category", MAX_SHORT_TEXT_LEN)?;
    }
    validate_optional_text(&data.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&data.image, "image", MAX_URL_LEN)?;
    if data.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(AppError::validation("Price must be non-negative"));
    }
    if data.stock.is_some_and(|s| s < 0) {
        return Err(AppError::validation("Stock must be non-negative"));
    }
    Ok(())
}

/// GET /api/products - 获取商品列表 (支持 ?category= 和 ?query=)
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<ProductQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = if let Some(ref query) = params.query
        && !query.trim().is_empty()
    {
        product::search(&state.pool, query.trim()).await?
    } else if let Some(ref category) = params.category {
        product::find_by_category(&state.pool, category).await?
    } else {
        product::find_all(&state.pool).await?
    };

    Ok(Json(products))
}

/// GET /api/products/{id} - 获取单个商品
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = product::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;
    Ok(Json(product))
}

/// POST /api/products - 创建商品 (管理员)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    validate_create(&payload)?;
    let product = product::create(&state.pool, payload).await?;
    tracing::info!(product_id = %product.id, name = %product.name, "Product created");
    Ok(Json(product))
}

/// PUT /api/products/{id} - 更新商品 (管理员，部分字段)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    validate_update(&payload)?;
    let product = product::update(&state.pool, &id, payload).await?;
    Ok(Json(product))
}

/// DELETE /api/products/{id} - 删除商品 (管理员)
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !product::delete(&state.pool, &id).await? {
        return Err(AppError::not_found(format!("Product {id} not found")));
    }
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}
