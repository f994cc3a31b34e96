//! Member Model

use serde::{Deserialize, Serialize};

/// Member role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MemberRole {
    Basic,
    Vip,
    Admin,
}

impl Default for MemberRole {
    fn default() -> Self {
        Self::Basic
    }
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Vip => "vip",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(Self::Basic),
            "vip" => Some(Self::Vip),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Member entity (会员)
///
/// At least one of email / phone / google_id is always set. The password
/// hash never leaves the server; `password_changed_at` is the cutoff used
/// to reject JWTs issued before the last password change.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub role: MemberRole,
    pub points: i64,
    #[serde(default, skip_serializing)]
    pub password_changed_at: i64,
    pub last_login: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Member {
    /// Verify a password against the stored argon2 hash
    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let Some(ref stored) = self.password_hash else {
            return Ok(false);
        };
        let parsed_hash = PasswordHash::new(stored)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using argon2
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }
}

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRegister {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Required unless `google_id` is given
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub role: Option<MemberRole>,
}

/// Profile update payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// Password change payload (PATCH)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = Member::hash_password("correct horse battery").unwrap();
        let member = Member {
            id: "m1".into(),
            name: "Test".into(),
            email: Some("t@example.com".into()),
            phone: None,
            password_hash: Some(hash),
            google_id: None,
            avatar: None,
            role: MemberRole::Basic,
            points: 0,
            password_changed_at: 0,
            last_login: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(member.verify_password("correct horse battery").unwrap());
        assert!(!member.verify_password("wrong").unwrap());
    }

    #[test]
    fn serialized_member_never_leaks_hash() {
        let member = Member {
            id: "m1".into(),
            name: "Test".into(),
            email: None,
            phone: Some("0912345678".into()),
            password_hash: Some("secret-hash".into()),
            google_id: None,
            avatar: None,
            role: MemberRole::Vip,
            points: 10,
            password_changed_at: 42,
            last_login: None,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_string(&member).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("passwordChangedAt"));
        assert!(json.contains("\"role\":\"vip\""));
    }

    #[test]
    fn role_parse_rejects_unknown() {
        assert_eq!(MemberRole::parse("vip"), Some(MemberRole::Vip));
        assert_eq!(MemberRole::parse("superuser"), None);
    }
}
