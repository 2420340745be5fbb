use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 未配置 JWT 密钥时使用的开发密钥
const DEV_JWT_SECRET: &str = "dev-jwt-secret-change-me";

/// JWT 密钥环境变量
pub const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// 模型文件路径（JSON）
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// 预测日志路径
    #[serde(default = "default_prediction_log_path")]
    pub prediction_log_path: PathBuf,

    /// SQLite 数据库路径
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// JWT 签名密钥（可选，未配置时读取环境变量 JWT_SECRET_KEY）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,

    /// Token 有效期（分钟）
    #[serde(default = "default_jwt_expiry_minutes")]
    pub jwt_expiry_minutes: u64,

    /// 允许跨域的来源
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// 请求体上限（字节），主要限制批量上传
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub debug: bool,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models-ai/lgb_model.json")
}

fn default_prediction_log_path() -> PathBuf {
    PathBuf::from("logs/predict.log")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("db/database.db")
}

fn default_jwt_expiry_minutes() -> u64 {
    60
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_path: default_model_path(),
            prediction_log_path: default_prediction_log_path(),
            database_path: default_database_path(),
            jwt_secret: None,
            jwt_expiry_minutes: default_jwt_expiry_minutes(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
            debug: false,
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 监听地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 有效的 JWT 密钥
    ///
    /// 优先配置文件，其次环境变量，最后回退到开发密钥
    pub fn effective_jwt_secret(&self) -> String {
        if let Some(secret) = self.jwt_secret.as_deref().filter(|s| !s.is_empty()) {
            return secret.to_string();
        }
        match std::env::var(JWT_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("未配置 JWT 密钥，使用开发默认值，请勿用于生产环境");
                DEV_JWT_SECRET.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.model_path, PathBuf::from("models-ai/lgb_model.json"));
        assert_eq!(config.prediction_log_path, PathBuf::from("logs/predict.log"));
        assert_eq!(config.jwt_expiry_minutes, 60);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!config.debug);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.config_path(), Some(path.as_path()));
    }

    #[test]
    fn test_load_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"port": 8000, "modelPath": "m.json", "jwtSecret": "s3cret", "maxUploadBytes": 1024}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.model_path, PathBuf::from("m.json"));
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.effective_jwt_secret(), "s3cret");
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(Config::load(&path).is_err());
    }
}
