use storefront::{Config, Server, ServerState, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载 .env (可选) 与配置
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // 2. 初始化日志 (控制台 + 按日滚动文件)
    std::fs::create_dir_all(config.log_dir())?;
    init_logger_with_file(None, Some(&config.log_dir()));

    print_banner();
    tracing::info!("🛍️  Storefront server starting...");

    // 3. 初始化服务器状态 (目录、数据库、JWT)
    let state = ServerState::initialize(&config).await?;

    // 4. 启动 HTTP 服务器
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
