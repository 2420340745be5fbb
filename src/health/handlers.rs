//! 健康检查处理器

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use super::HealthState;
use crate::estimator::adapter::ModelInfo;

const SERVICE_MESSAGE: &str = "DevicePricePro API is running";

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
pub struct BasicHealth {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,
}

#[derive(Debug, Serialize)]
pub struct Components {
    pub database: ComponentStatus,
    pub ml_model: ComponentStatus,
}

#[derive(Debug, Serialize)]
pub struct DetailedHealth {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub components: Components,
    pub environment: super::EnvironmentInfo,
    pub system: SystemInfo,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub pid: u32,
    pub uptime_secs: u64,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadinessCheck {
    pub name: &'static str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub checks: Vec<ReadinessCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Liveness {
    pub alive: bool,
    pub timestamp: String,
    pub uptime_secs: u64,
}

/// 数据库连通性（阻塞调用放到 blocking 线程）
async fn ping_database(state: &HealthState) -> Result<(), String> {
    let db = state.db.clone();
    match tokio::task::spawn_blocking(move || db.ping()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(e) => Err(e.to_string()),
    }
}

/// GET /, GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(BasicHealth {
        status: "healthy",
        message: SERVICE_MESSAGE,
        timestamp: now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /health/detailed
pub async fn detailed_health(State(state): State<HealthState>) -> impl IntoResponse {
    let database = match ping_database(&state).await {
        Ok(()) => ComponentStatus {
            status: "healthy",
            message: "Database connection successful".to_string(),
            model: None,
        },
        Err(e) => {
            tracing::warn!("数据库健康检查失败: {}", e);
            ComponentStatus {
                status: "unhealthy",
                message: format!("Database connection failed: {}", e),
                model: None,
            }
        }
    };

    let info = state.adapter.info();
    let ml_model = if info.loaded {
        ComponentStatus {
            status: "healthy",
            message: "ML model loaded successfully".to_string(),
            model: Some(info),
        }
    } else {
        ComponentStatus {
            status: "unhealthy",
            message: info
                .reason
                .clone()
                .unwrap_or_else(|| "ML model not loaded".to_string()),
            model: Some(info),
        }
    };

    let status = if database.status == "healthy" && ml_model.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealth {
        status,
        timestamp: now(),
        version: env!("CARGO_PKG_VERSION"),
        components: Components { database, ml_model },
        environment: state.environment.clone(),
        system: SystemInfo {
            pid: std::process::id(),
            uptime_secs: state.started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}

/// GET /health/ready
///
/// 所有检查就绪时返回 200，否则 503
pub async fn readiness_check(State(state): State<HealthState>) -> impl IntoResponse {
    let mut checks = Vec::with_capacity(2);

    checks.push(match ping_database(&state).await {
        Ok(()) => ReadinessCheck {
            name: "database",
            status: "ready",
            error: None,
        },
        Err(e) => ReadinessCheck {
            name: "database",
            status: "not_ready",
            error: Some(e),
        },
    });

    checks.push(if state.adapter.is_available() {
        ReadinessCheck {
            name: "ml_model",
            status: "ready",
            error: None,
        }
    } else {
        ReadinessCheck {
            name: "ml_model",
            status: "not_ready",
            error: state.adapter.info().reason,
        }
    });

    let ready = checks.iter().all(|check| check.status == "ready");
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(Readiness {
            ready,
            checks,
            timestamp: now(),
        }),
    )
}

/// GET /health/live
pub async fn liveness_check(State(state): State<HealthState>) -> impl IntoResponse {
    Json(Liveness {
        alive: true,
        timestamp: now(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
