//! 应用装配
//!
//! 启动时构建唯一的 `AppContext`，再由它生成完整路由

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

use crate::auth::{AuthService, JwtManager, create_auth_router, identity_middleware};
use crate::db::Database;
use crate::device::create_device_router;
use crate::estimator::ModelAdapter;
use crate::health::{EnvironmentInfo, HealthState, create_health_router, health_check};
use crate::history::{PredictionLog, create_history_router};
use crate::model::config::Config;
use crate::predict::{PredictionService, create_predict_router};

/// 进程内共享的服务实例
pub struct AppContext {
    pub config: Config,
    pub adapter: Arc<ModelAdapter>,
    pub log: Arc<PredictionLog>,
    pub db: Database,
    pub jwt: JwtManager,
    pub predictions: Arc<PredictionService>,
    pub auth: Arc<AuthService>,
    pub started_at: Instant,
}

impl AppContext {
    /// 按配置构建
    ///
    /// 模型加载失败不会中断启动，数据库打开失败会
    pub fn build(config: Config) -> anyhow::Result<Self> {
        let adapter = Arc::new(ModelAdapter::load(&config.model_path));
        let db = Database::open(&config.database_path).context("初始化数据库失败")?;
        let log = Arc::new(PredictionLog::new(&config.prediction_log_path));
        let jwt = JwtManager::new(&config.effective_jwt_secret(), config.jwt_expiry_minutes);

        Ok(Self::assemble(config, adapter, db, log, jwt))
    }

    fn assemble(
        config: Config,
        adapter: Arc<ModelAdapter>,
        db: Database,
        log: Arc<PredictionLog>,
        jwt: JwtManager,
    ) -> Self {
        let predictions = Arc::new(PredictionService::new(
            adapter.clone(),
            log.clone(),
            Some(db.clone()),
        ));
        let auth = Arc::new(AuthService::new(db.clone(), jwt.clone()));

        Self {
            config,
            adapter,
            log,
            db,
            jwt,
            predictions,
            auth,
            started_at: Instant::now(),
        }
    }

    fn environment(&self) -> EnvironmentInfo {
        EnvironmentInfo {
            debug_mode: self.config.debug,
            model_path: self.config.model_path.display().to_string(),
            database_path: self.config.database_path.display().to_string(),
            prediction_log_path: self.config.prediction_log_path.display().to_string(),
        }
    }
}

/// CORS 配置
///
/// 只允许配置中的来源，并允许携带凭据
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("忽略无效的 CORS 来源: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// 创建完整应用路由
pub fn create_app(ctx: &AppContext) -> Router {
    let identity = middleware::from_fn_with_state(ctx.jwt.clone(), identity_middleware);

    let predict = create_predict_router(ctx.predictions.clone())
        .merge(create_history_router(ctx.log.clone()))
        .layer(identity.clone());
    let device = create_device_router(ctx.db.clone())
        .merge(create_history_router(ctx.log.clone()))
        .layer(identity);

    let health = create_health_router(HealthState {
        db: ctx.db.clone(),
        adapter: ctx.adapter.clone(),
        environment: ctx.environment(),
        started_at: ctx.started_at,
    });

    Router::new()
        .route("/", get(health_check))
        .nest("/health", health)
        .nest("/predict", predict)
        .nest("/device", device)
        .nest("/auth", create_auth_router(ctx.auth.clone()))
        .layer(DefaultBodyLimit::max(ctx.config.max_upload_bytes))
        .layer(cors_layer(&ctx.config.cors_origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::artifact::tests::ram_tier_artifact;
    use crate::features::schema::RAW_FEATURES;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_context(dir: &tempfile::TempDir) -> AppContext {
        let model_path = dir.path().join("models").join("model.json");
        std::fs::create_dir_all(model_path.parent().unwrap()).unwrap();
        std::fs::write(&model_path, ram_tier_artifact().to_string()).unwrap();

        let mut config = Config::default();
        config.model_path = model_path;
        config.prediction_log_path = dir.path().join("logs").join("predict.log");
        config.database_path = dir.path().join("db").join("database.db");
        config.jwt_secret = Some("test-secret".to_string());
        let adapter = Arc::new(ModelAdapter::load(&config.model_path));
        let db = Database::open(&config.database_path).unwrap();
        let log = Arc::new(PredictionLog::new(&config.prediction_log_path));
        let jwt = JwtManager::new("test-secret", 60);

        let mut ctx = AppContext::assemble(config, adapter, db.clone(), log, jwt.clone());
        ctx.auth = Arc::new(AuthService::new(db, jwt).with_bcrypt_cost(4));
        ctx
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn device(ram: f64) -> Value {
        let mut device = json!({"brand": "Acme", "model": "X1"});
        for name in RAW_FEATURES {
            device[name] = json!(1);
        }
        device["ram"] = json!(ram);
        device
    }

    #[tokio::test]
    async fn test_anonymous_and_user_flows_are_separated() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(&dir);
        let app = create_app(&ctx);

        let (status, body) = send(&app, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, _) = send(&app, "GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);

        // 匿名预测
        let (status, body) = send(&app, "POST", "/predict", None, Some(device(3500.0))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_price_range"], 3);

        // 注册、登录后预测
        let (status, _) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"name": "alice", "email": "a@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "a@example.com", "password": "pw"})),
        )
        .await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "POST", "/predict", Some(&token), Some(device(500.0))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, "GET", "/predict/history", None, None).await;
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["predictions"][0]["predicted_price_range"], 3);

        let (_, body) = send(&app, "GET", "/device/history", Some(&token), None).await;
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["predictions"][0]["predicted_price_range"], 0);

        let (status, body) = send(&app, "GET", "/device/saved", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["devices"][0]["input_data"]["ram"], 500.0);

        let (status, _) = send(&app, "GET", "/device/saved", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_app(&test_context(&dir));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/predict")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }
}
