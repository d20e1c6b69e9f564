//! 配置管理
//!
//! 配置来源按优先级叠加：
//! - 内置默认值（含演示用ASHA工作者和医生数据）
//! - 可选配置文件（TOML/YAML/JSON，按扩展名识别）
//! - `MEDICONNECT_` 前缀的环境变量，层级分隔符为 `__`

use anyhow::{Context, Result};
use config::{Config, Environment, File, Source};
use mediconnect_core::{AshaWorker, Doctor, Specialization};
use mediconnect_integration::{AuthenticationConfig, HttpModelConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "MEDICONNECT";

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<MediConnectConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 分诊服务完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediConnectConfig {
    /// HTTP服务配置
    pub server: ServerConfig,
    /// 存储配置
    pub database: DatabaseConfig,
    /// 诊断模型配置
    pub model: ModelConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 演示数据
    pub fixtures: FixturesConfig,
}

/// HTTP服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Memory,
    Postgres,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    /// 数据库连接URL，postgres后端必填
    pub url: Option<String>,
    pub max_connections: u32,
    /// 启动时写入演示医生数据
    pub seed_doctors: bool,
}

/// 诊断模型提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Http,
    #[default]
    Canned,
}

/// 诊断模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub endpoint: String,
    pub model_id: String,
    pub max_gen_len: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub timeout_secs: u64,
    pub auth: AuthenticationConfig,
}

impl ModelConfig {
    /// 转换为HTTP连接器配置
    pub fn to_http_config(&self) -> HttpModelConfig {
        HttpModelConfig {
            endpoint: self.endpoint.clone(),
            model_id: self.model_id.clone(),
            max_gen_len: self.max_gen_len,
            temperature: self.temperature,
            top_p: self.top_p,
            timeout_secs: self.timeout_secs,
            authentication: self.auth.clone(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 过滤指令，例如 `info` 或 `info,mediconnect_workflow=debug`
    pub level: String,
    pub with_target: bool,
    pub ansi: bool,
}

/// 演示数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    pub asha_workers: Vec<AshaWorker>,
    pub doctors: Vec<Doctor>,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: String,
    /// 验证函数
    validator: fn(&MediConnectConfig) -> Result<()>,
    /// 错误消息
    error_message: String,
}

impl ConfigManager {
    /// 创建配置管理器并验证初始配置
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从文件和环境变量加载配置
    pub fn load_config(config_path: Option<&str>) -> Result<MediConnectConfig> {
        let file = config_path.map(File::with_name);
        let config = Self::load_layers(file, Self::environment())?;

        match config_path {
            Some(path) => info!("Configuration loaded from {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_layers<F>(file: Option<F>, environment: Environment) -> Result<MediConnectConfig>
    where
        F: Source + Send + Sync + 'static,
    {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }

        let settings = builder
            .add_source(environment)
            .build()
            .context("Failed to build configuration")?;

        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// 获取配置
    pub async fn get_config(&self) -> MediConnectConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 更新配置，新配置需通过验证
    pub async fn update_config(&self, new_config: MediConnectConfig) -> Result<()> {
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;

        info!("Configuration updated");
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.update_config(new_config).await
    }

    /// 按点分路径读取配置值，例如 `server.port`
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.read().await;
        let mut current = serde_json::to_value(&*config)
            .context("Failed to serialize config to JSON")?;

        for part in path.split('.') {
            current = current
                .get_mut(part)
                .map(serde_json::Value::take)
                .with_context(|| format!("Configuration path not found: {}", path))?;
        }

        serde_json::from_value(current).context("Failed to deserialize configuration value")
    }

    /// 验证当前配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

impl ConfigValidator {
    /// 创建配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "server.port".to_string(),
                validator: |config| {
                    if config.server.port == 0 {
                        Err(anyhow::anyhow!("Server port cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid server port".to_string(),
            },
            ValidationRule {
                field_path: "database.max_connections".to_string(),
                validator: |config| {
                    if config.database.max_connections == 0 {
                        Err(anyhow::anyhow!("Database max connections cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid database max connections".to_string(),
            },
            ValidationRule {
                field_path: "database.url".to_string(),
                validator: |config| {
                    let missing = config
                        .database
                        .url
                        .as_deref()
                        .map(|url| url.trim().is_empty())
                        .unwrap_or(true);
                    if config.database.backend == DatabaseBackend::Postgres && missing {
                        Err(anyhow::anyhow!("Postgres backend requires database.url"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid database url".to_string(),
            },
            ValidationRule {
                field_path: "model.endpoint".to_string(),
                validator: |config| {
                    if config.model.provider == ModelProvider::Http
                        && config.model.endpoint.trim().is_empty()
                    {
                        Err(anyhow::anyhow!("HTTP model provider requires model.endpoint"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid model endpoint".to_string(),
            },
            ValidationRule {
                field_path: "model.temperature".to_string(),
                validator: |config| {
                    if (0.0..=1.0).contains(&config.model.temperature) {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!(
                            "Temperature {} outside 0-1",
                            config.model.temperature
                        ))
                    }
                },
                error_message: "Invalid model temperature".to_string(),
            },
            ValidationRule {
                field_path: "fixtures.doctors".to_string(),
                validator: |config| {
                    let mut seen = HashSet::new();
                    for doctor in &config.fixtures.doctors {
                        if !seen.insert(doctor.doctor_id.as_str()) {
                            return Err(anyhow::anyhow!(
                                "Duplicate doctor id {}",
                                doctor.doctor_id
                            ));
                        }
                    }
                    Ok(())
                },
                error_message: "Invalid doctor fixtures".to_string(),
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &MediConnectConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Memory,
            url: None,
            max_connections: 10,
            seed_doctors: true,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let http = HttpModelConfig::default();
        Self {
            provider: ModelProvider::Canned,
            endpoint: http.endpoint,
            model_id: http.model_id,
            max_gen_len: http.max_gen_len,
            temperature: http.temperature,
            top_p: http.top_p,
            timeout_secs: http.timeout_secs,
            auth: http.authentication,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: true,
            ansi: true,
        }
    }
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            asha_workers: vec![AshaWorker {
                asha_worker_id: "ASHA-001".to_string(),
                name: "Amita Devi".to_string(),
                block: "Bikram".to_string(),
                district: "Patna".to_string(),
                phone: "+919876543210".to_string(),
                lat: 25.5921,
                lng: 85.1376,
                pin: "1234".to_string(),
            }],
            doctors: vec![
                demo_doctor("DR-001", "Dr. Priya Patel", Specialization::Gynaecologist, 25.5941, 85.1376),
                demo_doctor("DR-002", "Dr. Ramesh Sharma", Specialization::GeneralPhysician, 25.6121, 85.1534),
                demo_doctor("DR-003", "Dr. Anita Singh", Specialization::Paediatrician, 25.5712, 85.1892),
            ],
        }
    }
}

fn demo_doctor(id: &str, name: &str, specialization: Specialization, lat: f64, lng: f64) -> Doctor {
    Doctor {
        doctor_id: id.to_string(),
        name: name.to_string(),
        specialization,
        lat,
        lng,
        is_available: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{FileFormat, FileSourceFile, Map};

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigManager::environment().source(Some(source))
    }

    fn from_toml(content: &str, vars: &[(&str, &str)]) -> Result<MediConnectConfig> {
        ConfigManager::load_layers(Some(File::from_str(content, FileFormat::Toml)), env(vars))
    }

    #[test]
    fn test_defaults_carry_demo_fixtures() {
        let config = ConfigManager::load_layers(None::<File<FileSourceFile, FileFormat>>, env(&[]))
            .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.backend, DatabaseBackend::Memory);
        assert_eq!(config.model.provider, ModelProvider::Canned);
        assert_eq!(config.model.max_gen_len, 800);
        assert_eq!(config.fixtures.asha_workers[0].name, "Amita Devi");
        assert_eq!(config.fixtures.doctors.len(), 3);
        assert_eq!(
            config.fixtures.doctors[2].specialization,
            Specialization::Paediatrician
        );
        ConfigValidator::new().validate(&config).unwrap();
    }

    #[test]
    fn test_file_values_override_defaults() {
        let config = from_toml(
            r#"
            [server]
            port = 9100

            [model]
            provider = "http"
            endpoint = "http://localhost:9000/invoke"
            temperature = 0.2

            [model.auth]
            type = "bearer_token"
            token = "secret"
            "#,
            &[],
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.provider, ModelProvider::Http);
        assert_eq!(
            config.model.auth,
            AuthenticationConfig::BearerToken { token: "secret".to_string() }
        );

        let http = config.model.to_http_config();
        assert_eq!(http.endpoint, "http://localhost:9000/invoke");
        assert_eq!(http.temperature, 0.2);
        assert_eq!(http.top_p, 0.9);
    }

    #[test]
    fn test_environment_overrides_file() {
        let config = from_toml(
            "[server]\nport = 9100\n",
            &[
                ("MEDICONNECT_SERVER__PORT", "9200"),
                ("MEDICONNECT_LOGGING__LEVEL", "debug"),
            ],
        )
        .unwrap();

        assert_eq!(config.server.port, 9200);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_fixture_doctors_from_file() {
        let config = from_toml(
            r#"
            [[fixtures.doctors]]
            doctor_id = "DR-900"
            name = "Dr. Field"
            specialization = "Dermatologist"
            lat = 25.0
            lng = 85.0
            is_available = false
            "#,
            &[],
        )
        .unwrap();

        assert_eq!(config.fixtures.doctors.len(), 1);
        assert_eq!(
            config.fixtures.doctors[0].specialization,
            Specialization::Other("Dermatologist".to_string())
        );
        assert_eq!(config.fixtures.asha_workers.len(), 1);
    }

    #[test]
    fn test_validator_rejects_bad_values() {
        let validator = ConfigValidator::new();

        let mut config = MediConnectConfig::default();
        config.server.port = 0;
        assert!(validator.validate(&config).is_err());

        let mut config = MediConnectConfig::default();
        config.database.backend = DatabaseBackend::Postgres;
        let err = validator.validate(&config).unwrap_err();
        assert!(err.to_string().contains("database.url"));

        let mut config = MediConnectConfig::default();
        config.model.provider = ModelProvider::Http;
        assert!(validator.validate(&config).is_err());

        let mut config = MediConnectConfig::default();
        config.model.temperature = 1.5;
        assert!(validator.validate(&config).is_err());

        let mut config = MediConnectConfig::default();
        let duplicate = config.fixtures.doctors[0].clone();
        config.fixtures.doctors.push(duplicate);
        assert!(validator.validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_manager_update_and_get_value() {
        let manager = ConfigManager {
            config: Arc::new(RwLock::new(MediConnectConfig::default())),
            config_path: None,
            validator: ConfigValidator::new(),
        };

        let port: u16 = manager.get_value("server.port").await.unwrap();
        assert_eq!(port, 8000);
        assert!(manager.get_value::<u16>("server.missing").await.is_err());

        let mut rejected = manager.get_config().await;
        rejected.database.max_connections = 0;
        assert!(manager.update_config(rejected).await.is_err());
        assert_eq!(manager.get_config().await.database.max_connections, 10);

        let mut accepted = manager.get_config().await;
        accepted.logging.level = "warn".to_string();
        manager.update_config(accepted).await.unwrap();
        let level: String = manager.get_value("logging.level").await.unwrap();
        assert_eq!(level, "warn");
        manager.validate_config().await.unwrap();
    }
}
