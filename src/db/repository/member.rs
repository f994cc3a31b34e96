//! Member Repository

use sqlx::SqlitePool;

use super::{RepoError, RepoResult};
use crate::db::models::{Member, MemberRegister, MemberRole, MemberUpdate};
use crate::utils::{id, time};

const MEMBER_SELECT: &str = "SELECT id, name, email, phone, password_hash, google_id, avatar, role, points, password_changed_at, last_login, created_at, updated_at FROM members";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Member>> {
    let sql = format!("{MEMBER_SELECT} ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Member>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Member>> {
    find_by_field(pool, "id", id).await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<Member>> {
    find_by_field(pool, "email", email).await
}

pub async fn find_by_phone(pool: &SqlitePool, phone: &str) -> RepoResult<Option<Member>> {
    find_by_field(pool, "phone", phone).await
}

pub async fn find_by_google_id(pool: &SqlitePool, google_id: &str) -> RepoResult<Option<Member>> {
    find_by_field(pool, "google_id", google_id).await
}

async fn find_by_field(pool: &SqlitePool, field: &str, value: &str) -> RepoResult<Option<Member>> {
    // `field` is always one of the fixed column names above, never user input
    let sql = format!("{MEMBER_SELECT} WHERE {field} = ? LIMIT 1");
    let row = sqlx::query_as::<_, Member>(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Uniqueness pre-checks shared by register and profile update.
/// `exclude_id` skips the member being updated.
async fn check_unique(
    pool: &SqlitePool,
    email: Option<&str>,
    phone: Option<&str>,
    google_id: Option<&str>,
    exclude_id: Option<&str>,
) -> RepoResult<()> {
    let conflicts = |other: &Member| exclude_id.is_none_or(|id| other.id != id);

    if let Some(email) = email
        && let Some(other) = find_by_email(pool, email).await?
        && conflicts(&other)
    {
        return Err(RepoError::Duplicate("Email already exists".into()));
    }
    if let Some(phone) = phone
        && let Some(other) = find_by_phone(pool, phone).await?
        && conflicts(&other)
    {
        return Err(RepoError::Duplicate("Phone number already exists".into()));
    }
    if let Some(google_id) = google_id
        && let Some(other) = find_by_google_id(pool, google_id).await?
        && conflicts(&other)
    {
        return Err(RepoError::Duplicate(
            "Google account already registered".into(),
        ));
    }
    Ok(())
}

/// Register a member. The caller has already validated required fields and
/// hashed the password (if any).
pub async fn create(
    pool: &SqlitePool,
    data: MemberRegister,
    password_hash: Option<String>,
) -> RepoResult<Member> {
    check_unique(
        pool,
        data.email.as_deref(),
        data.phone.as_deref(),
        data.google_id.as_deref(),
        None,
    )
    .await?;

    let now = time::now_millis();
    let id = id::next_id('m');
    let role = data.role.unwrap_or_default();

    sqlx::query(
        "INSERT INTO members (id, name, email, phone, password_hash, google_id, avatar, role, points, password_changed_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?9)",
    )
    .bind(&id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&password_hash)
    .bind(&data.google_id)
    .bind(&data.avatar)
    .bind(role)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, &id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create member".into()))
}

/// Profile update (name required, contact fields optional)
pub async fn update(pool: &SqlitePool, id: &str, data: MemberUpdate) -> RepoResult<Member> {
    if find_by_id(pool, id).await?.is_none() {
        return Err(RepoError::NotFound(format!("Member {id} not found")));
    }

    check_unique(
        pool,
        data.email.as_deref(),
        data.phone.as_deref(),
        None,
        Some(id),
    )
    .await?;

    let now = time::now_millis();
    sqlx::query(
        "UPDATE members SET name = ?1, email = COALESCE(?2, email), phone = COALESCE(?3, phone), avatar = COALESCE(?4, avatar), updated_at = ?5 WHERE id = ?6",
    )
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.avatar)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Member {id} not found")))
}

/// Replace the password hash and move the token-invalidation cutoff forward
pub async fn update_password(pool: &SqlitePool, id: &str, password_hash: &str) -> RepoResult<()> {
    let now = time::now_millis();
    let rows = sqlx::query(
        "UPDATE members SET password_hash = ?1, password_changed_at = ?2, updated_at = ?2 WHERE id = ?3",
    )
    .bind(password_hash)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Member {id} not found")));
    }
    Ok(())
}

/// Link an external identity to an existing member
pub async fn link_google_id(pool: &SqlitePool, id: &str, google_id: &str) -> RepoResult<()> {
    check_unique(pool, None, None, Some(google_id), Some(id)).await?;
    let now = time::now_millis();
    sqlx::query("UPDATE members SET google_id = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(google_id)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_role(pool: &SqlitePool, id: &str, role: MemberRole) -> RepoResult<()> {
    let now = time::now_millis();
    let rows = sqlx::query("UPDATE members SET role = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(role)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Member {id} not found")));
    }
    Ok(())
}

pub async fn touch_last_login(pool: &SqlitePool, id: &str) -> RepoResult<()> {
    let now = time::now_millis();
    sqlx::query("UPDATE members SET last_login = ?1, updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: &str) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM members WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn register(email: Option<&str>, phone: Option<&str>) -> MemberRegister {
        MemberRegister {
            name: "Alex".into(),
            email: email.map(Into::into),
            phone: phone.map(Into::into),
            password: Some("longenough".into()),
            google_id: None,
            avatar: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let pool = test_pool().await;
        create(&pool, register(Some("a@example.com"), None), None)
            .await
            .unwrap();
        let err = create(&pool, register(Some("a@example.com"), None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(msg) if msg.contains("Email")));
    }

    #[tokio::test]
    async fn duplicate_phone_conflicts() {
        let pool = test_pool().await;
        create(&pool, register(None, Some("0911222333")), None)
            .await
            .unwrap();
        let err = create(&pool, register(Some("b@example.com"), Some("0911222333")), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(msg) if msg.contains("Phone")));
    }

    #[tokio::test]
    async fn update_may_keep_own_contact_fields() {
        let pool = test_pool().await;
        let m = create(&pool, register(Some("a@example.com"), Some("0911")), None)
            .await
            .unwrap();

        // Re-submitting the member's own email must not conflict
        let updated = update(
            &pool,
            &m.id,
            MemberUpdate {
                name: "Alex Chen".into(),
                email: Some("a@example.com".into()),
                phone: None,
                avatar: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Alex Chen");
        assert_eq!(updated.phone.as_deref(), Some("0911"));
    }

    #[tokio::test]
    async fn update_rejects_taken_email() {
        let pool = test_pool().await;
        create(&pool, register(Some("a@example.com"), None), None)
            .await
            .unwrap();
        let other = create(&pool, register(Some("b@example.com"), None), None)
            .await
            .unwrap();

        let err = update(
            &pool,
            &other.id,
            MemberUpdate {
                name: "Other".into(),
                email: Some("a@example.com".into()),
                phone: None,
                avatar: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn password_change_moves_cutoff() {
        let pool = test_pool().await;
        let hash = Member::hash_password("first-password").unwrap();
        let m = create(&pool, register(Some("a@example.com"), None), Some(hash))
            .await
            .unwrap();
        assert_eq!(m.password_changed_at, 0);

        let new_hash = Member::hash_password("second-password").unwrap();
        update_password(&pool, &m.id, &new_hash).await.unwrap();

        let reloaded = find_by_id(&pool, &m.id).await.unwrap().unwrap();
        assert!(reloaded.password_changed_at > 0);
        assert!(reloaded.verify_password("second-password").unwrap());
        assert!(!reloaded.verify_password("first-password").unwrap());
    }

    #[tokio::test]
    async fn google_link_respects_uniqueness() {
        let pool = test_pool().await;
        let a = create(&pool, register(Some("a@example.com"), None), None)
            .await
            .unwrap();
        let b = create(&pool, register(Some("b@example.com"), None), None)
            .await
            .unwrap();

        link_google_id(&pool, &a.id, "google-123").await.unwrap();
        let err = link_google_id(&pool, &b.id, "google-123").await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }
}
