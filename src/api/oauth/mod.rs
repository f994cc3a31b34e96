//! Google OAuth 路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/auth/google | GET | 跳转 Google 授权页 | 无 |
//! | /api/auth/google/callback | GET | 授权回调，签发会话后跳回前端 | 无 |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/auth/google", get(handler::authorize))
        .route("/api/auth/google/callback", get(handler::callback))
}
