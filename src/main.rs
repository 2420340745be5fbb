mod app;
mod auth;
mod common;
mod db;
mod device;
mod estimator;
mod features;
mod health;
mod history;
mod model;
mod predict;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::{AppContext, create_app};
use model::arg::Args;
use model::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 中的变量（如 JWT_SECRET_KEY）在读取配置前加载
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter = match args.log_level.as_deref() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let config = Config::load(&config_path).map_err(|e| {
        tracing::error!("加载配置失败: {:#}", e);
        e
    })?;
    match config.config_path() {
        Some(path) if path.exists() => tracing::info!(path = %path.display(), "配置已加载"),
        _ => tracing::info!(path = %config_path, "配置文件不存在，使用默认配置"),
    }

    let ctx = AppContext::build(config)?;
    if !ctx.adapter.is_available() {
        tracing::warn!("模型不可用，预测接口将返回 503，健康检查仍可访问");
    }

    let app = create_app(&ctx);
    let addr = ctx.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("服务启动: http://{}", addr);
    tracing::info!("API 端点:");
    tracing::info!("  POST /predict");
    tracing::info!("  POST /predict/batch");
    tracing::info!("  POST /predict/explain");
    tracing::info!("  GET  /predict/features");
    tracing::info!("  GET  /predict/history");
    tracing::info!("  GET  /device/saved");
    tracing::info!("  POST /auth/register");
    tracing::info!("  POST /auth/login");
    tracing::info!("  GET  /health");

    axum::serve(listener, app).await?;
    Ok(())
}
