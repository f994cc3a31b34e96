//! Member API Handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Member, MemberRegister, MemberRole, MemberUpdate, PasswordChange};
use crate::db::repository::member;
use crate::security_log;
use crate::utils::validation::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text,
    validate_required_text, validate_password,
};
use crate::utils::{AppError, AppResult};

/// 登录 / 注册成功响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub member: Member,
    pub token: String,
}

/// 登录请求体
///
/// 两种方式：email 或 phone + password，或 googleId (OAuth 回调后)。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub google_id: Option<String>,
}

/// 角色更新请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdate {
    pub role: MemberRole,
}

/// 签发令牌并更新最近登录时间
async fn issue_session(state: &ServerState, member: Member) -> AppResult<AuthResponse> {
    let token = state
        .jwt
        .generate_token(&member.id, &member.name, member.role)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    member::touch_last_login(&state.pool, &member.id).await?;

    Ok(AuthResponse { member, token })
}

/// POST /api/members - 注册会员 (公开)
///
/// name + (email | phone) 必填；除非携带 googleId，否则必须提供密码。
pub async fn register(
    State(state): State<ServerState>,
    Json(mut payload): Json<MemberRegister>,
) -> AppResult<Json<AuthResponse>> {
    // 公开注册一律 basic，角色只能由管理员后续调整
    payload.role = None;

    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.email, "email", MAX_EMAIL_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;

    if payload.email.is_none() && payload.phone.is_none() && payload.google_id.is_none() {
        return Err(AppError::validation("Email or phone number is required"));
    }

    let password_hash = match (&payload.password, &payload.google_id) {
        (Some(password), _) => {
            validate_password(password)?;
            Some(
                Member::hash_password(password)
                    .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?,
            )
        }
        (None, Some(_)) => None,
        (None, None) => {
            return Err(AppError::validation("Password is required"));
        }
    };

    let created = member::create(&state.pool, payload, password_hash).await?;
    tracing::info!(member_id = %created.id, "Member registered");

    let session = issue_session(&state, created).await?;
    Ok(Json(session))
}

/// POST /api/members/login - 会员登录 (公开)
///
/// 无此会员 → 404；密码错误 → 401。
pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<Json<AuthResponse>> {
    // OAuth 回调后的 googleId 登录，无需密码
    if let Some(ref google_id) = payload.google_id {
        let found = member::find_by_google_id(&state.pool, google_id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found"))?;
        let session = issue_session(&state, found).await?;
        return Ok(Json(session));
    }

    let found = if let Some(ref email) = payload.email {
        member::find_by_email(&state.pool, email).await?
    } else if let Some(ref phone) = payload.phone {
        member::find_by_phone(&state.pool, phone).await?
    } else {
        return Err(AppError::validation("Email or phone number is required"));
    };

    let found = found.ok_or_else(|| AppError::not_found("Member not found"))?;

    let password = payload
        .password
        .as_deref()
        .ok_or_else(|| AppError::validation("Password is required"))?;

    let ok = found
        .verify_password(password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
    if !ok {
        security_log!("WARN", "login_failed", member_id = found.id.clone());
        return Err(AppError::unauthorized());
    }

    let session = issue_session(&state, found).await?;
    Ok(Json(session))
}

/// GET /api/members/all - 获取所有会员 (管理员)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Member>>> {
    let members = member::find_all(&state.pool).await?;
    Ok(Json(members))
}

/// GET /api/members/{id} - 获取会员资料 (本人或管理员)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<Member>> {
    if !user.can_access(&id) {
        return Err(AppError::forbidden("Cannot access another member's profile"));
    }

    let found = member::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Member {id} not found")))?;
    Ok(Json(found))
}

/// PUT /api/members/{id} - 更新会员资料 (本人或管理员)
pub async fn update(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<MemberUpdate>,
) -> AppResult<Json<Member>> {
    if !user.can_access(&id) {
        return Err(AppError::forbidden("Cannot modify another member's profile"));
    }

    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.email, "email", MAX_EMAIL_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;

    let updated = member::update(&state.pool, &id, payload).await?;
    Ok(Json(updated))
}

/// PATCH /api/members/{id} - 修改密码 (本人)
///
/// 校验当前密码后写入新哈希；`password_changed_at` 前移，
/// 此前签发的所有令牌随之失效，需要重新登录。
pub async fn change_password(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<PasswordChange>,
) -> AppResult<Json<serde_json::Value>> {
    if user.id != id {
        return Err(AppError::forbidden("Cannot change another member's password"));
    }

    let found = member::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Member {id} not found")))?;

    if found.password_hash.is_none() {
        return Err(AppError::validation(
            "This account has no password set; sign in with Google",
        ));
    }

    let ok = found
        .verify_password(&payload.current_password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
    if !ok {
        security_log!("WARN", "password_change_denied", member_id = id.clone());
        return Err(AppError::unauthorized());
    }

    validate_password(&payload.new_password)?;
    let new_hash = Member::hash_password(&payload.new_password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    member::update_password(&state.pool, &id, &new_hash).await?;
    security_log!("INFO", "password_changed", member_id = id.clone());

    Ok(Json(serde_json::json!({ "success": true })))
}

/// PUT /api/members/{id}/role - 调整会员角色 (管理员)
pub async fn update_role(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<RoleUpdate>,
) -> AppResult<Json<Member>> {
    member::update_role(&state.pool, &id, payload.role).await?;
    let updated = member::find_by_id(&state.pool, &id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Member {id} not found")))?;
    tracing::info!(member_id = %id, role = %payload.role.as_str(), "Member role updated");
    Ok(Json(updated))
}

/// DELETE /api/members/{id} - 删除会员 (本人或管理员)
pub async fn delete(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !user.can_access(&id) {
        return Err(AppError::forbidden("Cannot delete another member's account"));
    }

    if !member::delete(&state.pool, &id).await? {
        return Err(AppError::not_found(format!("Member {id} not found")));
    }
    security_log!("INFO", "member_deleted", member_id = id.clone());
    Ok(Json(serde_json::json!({ "success": true })))
}
