//! 健康检查
//!
//! 基础存活、详细组件状态、就绪 / 存活探针

mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{Router, routing::get};
use serde::Serialize;

use crate::db::Database;
use crate::estimator::ModelAdapter;

pub use handlers::health_check;
use handlers::{detailed_health, liveness_check, readiness_check};

/// 运行环境信息（详细健康检查展示）
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentInfo {
    pub debug_mode: bool,
    pub model_path: String,
    pub database_path: String,
    pub prediction_log_path: String,
}

/// 健康检查状态
#[derive(Clone)]
pub struct HealthState {
    pub db: Database,
    pub adapter: Arc<ModelAdapter>,
    pub environment: EnvironmentInfo,
    pub started_at: Instant,
}

/// 创建健康检查路由
///
/// # 端点
/// - `GET /` - 基础健康检查
/// - `GET /detailed` - 数据库与模型状态
/// - `GET /ready` - 就绪探针（未就绪 503）
/// - `GET /live` - 存活探针
pub fn create_health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/detailed", get(detailed_health))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::adapter::tests::ConstantEstimator;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn state(adapter: ModelAdapter) -> HealthState {
        HealthState {
            db: Database::open_in_memory().unwrap(),
            adapter: Arc::new(adapter),
            environment: EnvironmentInfo {
                debug_mode: false,
                model_path: "models-ai/lgb_model.json".to_string(),
                database_path: ":memory:".to_string(),
                prediction_log_path: "logs/predict.log".to_string(),
            },
            started_at: Instant::now(),
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ready_when_model_loaded() {
        let app = create_health_router(state(ModelAdapter::from_estimator(Arc::new(
            ConstantEstimator { tier: 0 },
        ))));

        let (status, body) = get_json(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get_json(app.clone(), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);

        let (_, body) = get_json(app.clone(), "/detailed").await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["components"]["ml_model"]["model"]["model_type"], "ConstantEstimator");

        let (status, body) = get_json(app, "/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alive"], true);
    }

    #[tokio::test]
    async fn test_not_ready_without_model() {
        let app = create_health_router(state(ModelAdapter::unavailable(
            "models-ai/lgb_model.json",
            "Model file not found at models-ai/lgb_model.json",
        )));

        let (status, body) = get_json(app.clone(), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);
        assert_eq!(body["checks"][1]["status"], "not_ready");

        let (status, body) = get_json(app, "/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["components"]["database"]["status"], "healthy");
        assert_eq!(body["components"]["ml_model"]["status"], "unhealthy");
    }
}
