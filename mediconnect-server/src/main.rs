//! MediConnect分诊服务主程序

use anyhow::{Context, Result};
use clap::Parser;
use mediconnect_admin::{
    init_logging, ConfigManager, DatabaseBackend, DatabaseConfig, MediConnectConfig,
    ModelConfig, ModelProvider,
};
use mediconnect_core::{DiagnosisModel, Doctor, TriageStore};
use mediconnect_database::{DatabasePool, MemoryStore, PgStore};
use mediconnect_integration::{CannedDiagnosisModel, HttpModelConnector};
use mediconnect_web::{AppState, AuthService, WebServer};
use mediconnect_workflow::TriageEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "mediconnect-server")]
#[command(about = "MediConnect 农村医疗分诊服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听主机，覆盖配置
    #[arg(long)]
    host: Option<String>,

    /// 监听端口，覆盖配置
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志过滤指令，覆盖配置
    #[arg(short, long)]
    log_level: Option<String>,

    /// 不写入演示医生数据
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    apply_overrides(&mut config, &args);

    init_logging(&config.logging, args.log_level.as_deref())?;

    info!("Starting MediConnect server...");
    info!("  Storage backend: {:?}", config.database.backend);
    info!("  Model provider: {:?}", config.model.provider);
    info!("  Doctors in fixtures: {}", config.fixtures.doctors.len());

    let store = build_store(&config.database, &config.fixtures.doctors).await?;
    let model = build_model(&config.model)?;
    let engine = Arc::new(TriageEngine::new(store, model));
    let auth = AuthService::new(config.fixtures.asha_workers.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let server = WebServer::new(addr, AppState::new(engine, auth));
    if let Err(e) = server.run().await {
        error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}

fn apply_overrides(config: &mut MediConnectConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_seed {
        config.database.seed_doctors = false;
    }
}

/// 按配置创建存储后端
async fn build_store(
    database: &DatabaseConfig,
    doctors: &[Doctor],
) -> Result<Arc<dyn TriageStore>> {
    let seed = if database.seed_doctors { doctors.to_vec() } else { Vec::new() };

    match database.backend {
        DatabaseBackend::Memory => {
            info!("Using in-memory store with {} doctor(s)", seed.len());
            Ok(Arc::new(MemoryStore::with_doctors(seed)))
        }
        DatabaseBackend::Postgres => {
            let url = database
                .url
                .as_deref()
                .context("database.url is required for the postgres backend")?;
            let pool = DatabasePool::connect(url, database.max_connections).await?;
            let store = PgStore::new(pool);

            store.queries().create_tables().await?;
            store.queries().seed_doctors(&seed).await?;
            Ok(Arc::new(store))
        }
    }
}

/// 按配置创建诊断模型
fn build_model(model: &ModelConfig) -> Result<Arc<dyn DiagnosisModel>> {
    match model.provider {
        ModelProvider::Http => Ok(Arc::new(HttpModelConnector::new(model.to_http_config())?)),
        ModelProvider::Canned => {
            info!("Using canned diagnosis model");
            Ok(Arc::new(CannedDiagnosisModel::default()))
        }
    }
}
