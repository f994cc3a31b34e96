//! 认证中间件
//!
//! 为 JWT 认证和授权提供 Axum 中间件

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppError;
use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::db::repository::member;
use crate::security_log;

/// 公共路由 — 无需令牌即可访问
///
/// - 商品与分类的读取接口 (店面浏览)
/// - 会员注册与登录
/// - Google OAuth 跳转与回调
/// - 健康检查
fn is_public_api_route(method: &http::Method, path: &str) -> bool {
    if method == http::Method::GET
        && (path == "/api/products"
            || path.starts_with("/api/products/")
            || path == "/api/categories"
            || path.starts_with("/api/categories/"))
    {
        return true;
    }

    if method == http::Method::POST && (path == "/api/members" || path == "/api/members/login") {
        return true;
    }

    path.starts_with("/api/auth/google") || path == "/api/health"
}

/// 认证中间件 - 要求会员登录
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT。
/// 验证成功后将 [`CurrentUser`] 注入请求扩展 (`req.extensions_mut().insert(user)`)。
///
/// 除签名与过期校验外，还会比对会员记录：令牌签发时间早于
/// `password_changed_at` 的会话 (改密后的旧令牌) 以及已删除会员的
/// 令牌一律拒绝。
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 Unauthorized |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 / 失效会话 | 401 InvalidToken |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    // 允许 CORS 预检的 OPTIONS 请求 (跳过认证)
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过认证 (静态上传目录、404)
    if !path.starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    if is_public_api_route(req.method(), path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::unauthorized());
        }
    };

    let claims = match state.jwt.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            security_log!(
                "WARN",
                "auth_failed",
                error = format!("{}", e),
                uri = format!("{:?}", req.uri())
            );

            return match e {
                crate::auth::JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            };
        }
    };

    // 比对会员记录: 已删除或改密后的旧令牌失效
    let user = CurrentUser::from(claims);
    let record = member::find_by_id(&state.pool, &user.id)
        .await?
        .ok_or_else(|| {
            security_log!("WARN", "auth_member_gone", member_id = user.id.clone());
            AppError::invalid_token("Session is no longer valid")
        })?;

    if user.issued_at * 1000 < record.password_changed_at {
        security_log!("WARN", "auth_stale_session", member_id = user.id.clone());
        return Err(AppError::invalid_token("Session is no longer valid"));
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// 管理员中间件 - 要求管理员角色
///
/// 检查 `CurrentUser.role == admin`
///
/// # 错误
///
/// 非管理员返回 403 Forbidden
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::unauthorized())?;
    if !user.is_admin() {
        security_log!(
            "WARN",
            "admin_required",
            member_id = user.id.clone(),
            role = user.role.as_str()
        );
        return Err(AppError::forbidden("Administrator access required"));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_reads_are_public_writes_are_not() {
        assert!(is_public_api_route(&http::Method::GET, "/api/products"));
        assert!(is_public_api_route(
            &http::Method::GET,
            "/api/products/p123"
        ));
        assert!(is_public_api_route(&http::Method::GET, "/api/categories"));
        assert!(!is_public_api_route(&http::Method::POST, "/api/products"));
        assert!(!is_public_api_route(
            &http::Method::DELETE,
            "/api/products/p123"
        ));
    }

    #[test]
    fn register_and_login_are_public() {
        assert!(is_public_api_route(&http::Method::POST, "/api/members"));
        assert!(is_public_api_route(
            &http::Method::POST,
            "/api/members/login"
        ));
        assert!(!is_public_api_route(&http::Method::GET, "/api/members"));
        assert!(!is_public_api_route(
            &http::Method::GET,
            "/api/members/m123"
        ));
    }

    #[test]
    fn oauth_and_health_are_public() {
        assert!(is_public_api_route(&http::Method::GET, "/api/auth/google"));
        assert!(is_public_api_route(
            &http::Method::GET,
            "/api/auth/google/callback"
        ));
        assert!(is_public_api_route(&http::Method::GET, "/api/health"));
        assert!(!is_public_api_route(&http::Method::POST, "/api/orders"));
    }
}
