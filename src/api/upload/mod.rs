//! Upload Routes
//!
//! 商品图片上传接口，要求登录。上传后的文件由 `/uploads` 静态路由对外提供。

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/upload", post(handler::upload))
}
