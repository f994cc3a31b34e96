//! Google OAuth Handlers
//!
//! 授权码流程：跳转授权页 → 回调换取 access_token → 拉取用户资料 →
//! 按 google_id 登录 / 按邮箱关联 / 新建会员 → 带令牌跳回前端。
//! 提供方故障不抛 500，而是带 `error=` 跳回前端登录页。

use axum::extract::{Query, State};
use axum::response::Redirect;
use serde::Deserialize;
use url::Url;

use crate::core::ServerState;
use crate::db::models::{Member, MemberRegister};
use crate::db::repository::member;
use crate::security_log;
use crate::utils::{AppError, AppResult};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// 回调查询参数
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Google token 接口响应
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Google userinfo 接口响应
#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// GET /api/auth/google - 跳转 Google 授权页
pub async fn authorize(State(state): State<ServerState>) -> AppResult<Redirect> {
    let config = &state.config;
    if config.google_client_id.is_empty() {
        return Err(AppError::validation("Google OAuth is not configured"));
    }

    let mut url = Url::parse(GOOGLE_AUTH_URL)
        .map_err(|e| AppError::internal(format!("Invalid auth URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.google_client_id)
        .append_pair("redirect_uri", &config.google_redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", "openid email profile");

    Ok(Redirect::temporary(url.as_str()))
}

/// 带错误信息跳回前端登录页
fn redirect_with_error(frontend_url: &str, message: &str) -> Redirect {
    let target = Url::parse(frontend_url)
        .ok()
        .and_then(|base| base.join("/login").ok())
        .map(|mut u| {
            u.query_pairs_mut().append_pair("error", message);
            u.to_string()
        })
        .unwrap_or_else(|| format!("{frontend_url}/login"));
    Redirect::temporary(&target)
}

/// 用授权码换取 Google 用户资料
async fn fetch_profile(state: &ServerState, code: &str) -> Result<GoogleProfile, String> {
    let config = &state.config;
    let client = reqwest::Client::new();

    let token: TokenResponse = client
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", &config.google_client_id),
            ("client_secret", &config.google_client_secret),
            ("redirect_uri", &config.google_redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| format!("Token exchange failed: {e}"))?
        .error_for_status()
        .map_err(|e| format!("Token exchange rejected: {e}"))?
        .json()
        .await
        .map_err(|e| format!("Malformed token response: {e}"))?;

    client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|e| format!("Userinfo request failed: {e}"))?
        .error_for_status()
        .map_err(|e| format!("Userinfo request rejected: {e}"))?
        .json()
        .await
        .map_err(|e| format!("Malformed userinfo response: {e}"))
}

/// 按 google_id 登录；否则按邮箱关联既有会员；否则新建会员
async fn find_or_create_member(
    state: &ServerState,
    profile: &GoogleProfile,
) -> Result<Member, AppError> {
    if let Some(existing) = member::find_by_google_id(&state.pool, &profile.id).await? {
        return Ok(existing);
    }

    if let Some(ref email) = profile.email
        && let Some(existing) = member::find_by_email(&state.pool, email).await?
    {
        member::link_google_id(&state.pool, &existing.id, &profile.id).await?;
        security_log!(
            "INFO",
            "google_account_linked",
            member_id = existing.id.clone()
        );
        return member::find_by_id(&state.pool, &existing.id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found"));
    }

    let name = profile
        .name
        .clone()
        .or_else(|| profile.email.clone())
        .unwrap_or_else(|| "Google User".to_string());

    let created = member::create(
        &state.pool,
        MemberRegister {
            name,
            email: profile.email.clone(),
            phone: None,
            password: None,
            google_id: Some(profile.id.clone()),
            avatar: profile.picture.clone(),
            role: None,
        },
        None,
    )
    .await?;
    tracing::info!(member_id = %created.id, "Member created via Google OAuth");
    Ok(created)
}

/// GET /api/auth/google/callback - 授权回调
pub async fn callback(
    State(state): State<ServerState>,
    Query(params): Query<CallbackQuery>,
) -> Redirect {
    let frontend = state.config.frontend_url.clone();

    if let Some(ref error) = params.error {
        return redirect_with_error(&frontend, error);
    }
    let Some(ref code) = params.code else {
        return redirect_with_error(&frontend, "Missing authorization code");
    };

    let profile = match fetch_profile(&state, code).await {
        Ok(p) => p,
        Err(msg) => {
            tracing::warn!(error = %msg, "Google OAuth exchange failed");
            return redirect_with_error(&frontend, "Google sign-in failed");
        }
    };

    let found = match find_or_create_member(&state, &profile).await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "Google OAuth member resolution failed");
            return redirect_with_error(&frontend, "Google sign-in failed");
        }
    };

    let token = match state.jwt.generate_token(&found.id, &found.name, found.role) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "Token generation failed after OAuth");
            return redirect_with_error(&frontend, "Google sign-in failed");
        }
    };

    if let Err(e) = member::touch_last_login(&state.pool, &found.id).await {
        tracing::warn!(error = %e, member_id = %found.id, "Failed to stamp last login");
    }

    let target = Url::parse(&frontend)
        .ok()
        .and_then(|base| base.join("/login").ok())
        .map(|mut u| {
            u.query_pairs_mut()
                .append_pair("google", "1")
                .append_pair("memberId", &found.id)
                .append_pair("token", &token);
            u.to_string()
        })
        .unwrap_or_else(|| format!("{frontend}/login"));

    Redirect::temporary(&target)
}
