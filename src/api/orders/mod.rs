//! Order API 模块
//!
//! 下单与查询要求登录；状态流转与删除要求管理员。

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", order_routes())
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).merge(post(handler::create)))
        .route(
            "/{id}",
            put(handler::update_status)
                .merge(delete(handler::delete))
                .route_layer(middleware::from_fn(require_admin)),
        )
}
