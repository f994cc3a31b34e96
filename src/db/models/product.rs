//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity (商品)
///
/// `in_stock` is redundantly stored and must always equal `stock > 0`;
/// every writer that touches `stock` recomputes it in the same statement.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    /// Category name (free-text link, matched by value)
    pub category: String,
    pub stock: i64,
    pub in_stock: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: Option<String>,
    pub category: String,
    pub stock: Option<i64>,
}

/// Update product payload - omitted fields keep their previous values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i64>,
}
