//! Order API Handlers

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Order, OrderCreate, OrderStatus};
use crate::db::repository::{member, order};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};

/// 订单查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    /// 单个订单 ID
    pub id: Option<String>,
    /// 某会员的订单列表
    pub member_id: Option<String>,
}

/// 状态更新请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// GET /api/orders - 查询订单
///
/// - `?id=` 单个订单 (本人或管理员)
/// - `?memberId=` 某会员的订单 (本人或管理员)
/// - 无参数: 全部订单 (管理员)
pub async fn list(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<OrderQuery>,
) -> AppResult<Json<serde_json::Value>> {
    if let Some(ref id) = params.id {
        let found = order::find_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
        if !user.can_access(&found.member_id) {
            return Err(AppError::forbidden("Cannot access another member's order"));
        }
        return Ok(Json(serde_json::to_value(found).map_err(|e| {
            AppError::internal(format!("Serialization failed: {e}"))
        })?));
    }

    let orders = if let Some(ref member_id) = params.member_id {
        if !user.can_access(member_id) {
            return Err(AppError::forbidden("Cannot access another member's orders"));
        }
        order::find_by_member(&state.pool, member_id).await?
    } else {
        if !user.is_admin() {
            return Err(AppError::forbidden("Administrator access required"));
        }
        order::find_all(&state.pool).await?
    };

    Ok(Json(serde_json::to_value(orders).map_err(|e| {
        AppError::internal(format!("Serialization failed: {e}"))
    })?))
}

/// POST /api/orders - 下单 (登录会员)
///
/// 非管理员只能为自己下单。创建、快照与扣减库存在仓储层的
/// 单个事务内完成。
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<Order>> {
    if !user.can_access(&payload.member_id) {
        return Err(AppError::forbidden("Cannot place an order for another member"));
    }

    validate_required_text(&payload.pickup_info.name, "pickup name", MAX_NAME_LEN)?;
    validate_required_text(
        &payload.pickup_info.phone,
        "pickup phone",
        MAX_SHORT_TEXT_LEN,
    )?;
    validate_optional_text(&payload.pickup_info.note, "pickup note", MAX_NOTE_LEN)?;

    if member::find_by_id(&state.pool, &payload.member_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found(format!(
            "Member {} not found",
            payload.member_id
        )));
    }

    let placed = order::place(&state.pool, payload).await?;
    tracing::info!(order_id = %placed.id, member_id = %placed.member_id, total = placed.total, "Order placed");
    Ok(Json(placed))
}

/// PUT /api/orders/{id} - 订单状态流转 (管理员)
///
/// 取消回补库存；从取消状态重新激活时重新扣减，
/// 库存不足则整体失败。
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> AppResult<Json<Order>> {
    let updated = order::update_status(&state.pool, &id, payload.status).await?;
    tracing::info!(order_id = %id, status = %payload.status.as_str(), "Order status updated");
    Ok(Json(updated))
}

/// DELETE /api/orders/{id} - 删除订单 (管理员)
///
/// 未取消的订单先回补库存再删除。
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !order::delete(&state.pool, &id).await? {
        return Err(AppError::not_found(format!("Order {id} not found")));
    }
    tracing::info!(order_id = %id, "Order deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}
