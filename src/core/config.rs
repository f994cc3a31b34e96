use crate::auth::JwtConfig;

/// 服务器配置 - 店面后端的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、上传文件、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | JWT_SECRET | (开发环境随机) | JWT 密钥，至少 32 字节 |
/// | JWT_EXPIRATION_MINUTES | 1440 | 令牌过期时间 (分钟) |
/// | GOOGLE_CLIENT_ID | (空) | Google OAuth 客户端 ID |
/// | GOOGLE_CLIENT_SECRET | (空) | Google OAuth 客户端密钥 |
/// | GOOGLE_REDIRECT_URI | http://localhost:3000/api/auth/google/callback | OAuth 回调地址 |
/// | FRONTEND_URL | http://localhost:5173 | 前端地址 (OAuth 成功后跳转) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/storefront HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、上传文件、日志
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === Google OAuth ===
    /// Google OAuth 客户端 ID (为空则禁用 OAuth 登录)
    pub google_client_id: String,
    /// Google OAuth 客户端密钥
    pub google_client_secret: String,
    /// OAuth 回调地址
    pub google_redirect_uri: String,
    /// 前端地址 (OAuth 成功后跳转)
    pub frontend_url: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig {
                secret: load_jwt_secret(&environment),
                expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1440), // 默认 24 小时
                issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront".into()),
                audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "storefront-web".into()),
            },
            environment,

            google_client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            google_redirect_uri: std::env::var("GOOGLE_REDIRECT_URI").unwrap_or_else(|_| {
                "http://localhost:3000/api/auth/google/callback".into()
            }),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        }
    }

    /// SQLite 数据库文件路径
    pub fn database_path(&self) -> String {
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| format!("{}/storefront.db", self.work_dir))
    }

    /// 上传文件目录
    pub fn upload_dir(&self) -> String {
        format!("{}/uploads", self.work_dir)
    }

    /// 日志目录
    pub fn log_dir(&self) -> String {
        format!("{}/logs", self.work_dir)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 从环境变量安全地加载 JWT 密钥
///
/// 生产环境必须设置 JWT_SECRET (至少 32 字节)，否则直接退出；
/// 开发环境未设置时生成一次性随机密钥 (重启后旧令牌全部失效)。
fn load_jwt_secret(environment: &str) -> String {
    match std::env::var("JWT_SECRET") {
        Ok(secret) if secret.len() >= 32 => secret,
        Ok(_) => {
            panic!("JWT_SECRET must be at least 32 characters long");
        }
        Err(_) => {
            if environment == "production" {
                panic!("JWT_SECRET environment variable must be set in production!");
            }
            tracing::warn!(
                "⚠️  JWT_SECRET not set! Generating temporary key for development; \
                 existing sessions will not survive a restart."
            );
            generate_dev_jwt_secret()
        }
    }
}

/// 生成开发环境一次性 JWT 密钥 (可打印字符)
fn generate_dev_jwt_secret() -> String {
    use ring::rand::{SecureRandom, SystemRandom};

    let allowed_chars =
        "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+";
    let chars: Vec<char> = allowed_chars.chars().collect();

    let rng = SystemRandom::new();
    let mut bytes = [0u8; 64];
    if rng.fill(&mut bytes).is_err() {
        // 随机数生成失败时退回固定的开发密钥
        return "StorefrontDevelopmentOnlySecretKey2026!".to_string();
    }

    bytes
        .iter()
        .map(|b| chars[*b as usize % chars.len()])
        .collect()
}
