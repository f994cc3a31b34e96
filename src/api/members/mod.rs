//! Member API 模块
//!
//! 注册与登录公开；会员资料操作要求本人或管理员；
//! 列表与角色管理要求管理员。

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/members", member_routes())
}

fn member_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::register))
        .route("/login", post(handler::login))
        .route(
            "/all",
            get(handler::list).route_layer(middleware::from_fn(require_admin)),
        )
        .route(
            "/{id}",
            get(handler::get_by_id)
                .merge(put(handler::update))
                .merge(patch(handler::change_password))
                .merge(axum::routing::delete(handler::delete)),
        )
        .route(
            "/{id}/role",
            put(handler::update_role).route_layer(middleware::from_fn(require_admin)),
        )
}
