use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// ServerState 是店面后端的核心数据结构。
/// 使用 Arc / Pool 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | jwt | Arc<JwtService> | JWT 认证服务 |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt: Arc<JwtService>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 创建工作目录和上传目录，打开数据库并应用迁移。
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(config.upload_dir())
            .await
            .map_err(|e| AppError::internal(format!("Failed to create upload dir: {e}")))?;

        let db = DbService::new(&config.database_path()).await?;
        let jwt = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config: config.clone(),
            pool: db.pool,
            jwt,
        })
    }
}
