//! Category API 模块
//!
//! 读取接口公开，写入接口要求管理员。

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/categories", category_routes())
}

fn category_routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/",
            get(handler::list)
                .merge(post(handler::create).route_layer(middleware::from_fn(require_admin))),
        )
        .route(
            "/{id}",
            get(handler::get_by_id).merge(
                put(handler::update)
                    .merge(delete(handler::delete))
                    .route_layer(middleware::from_fn(require_admin)),
            ),
        )
}
