//! 预测历史 API 路由

use std::sync::Arc;

use axum::{Router, routing::get};

use super::handlers::{HistoryState, get_history, get_history_debug};
use super::log::PredictionLog;

/// 创建历史 API 路由
///
/// # 端点
/// - `GET /history` - 当前身份的预测历史（最新在前）
/// - `GET /history/debug` - 日志文件概况
///
/// 挂载在 `/predict` 与 `/device` 下
pub fn create_history_router(log: Arc<PredictionLog>) -> Router {
    Router::new()
        .route("/history", get(get_history))
        .route("/history/debug", get(get_history_debug))
        .with_state(HistoryState { log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtManager, identity_middleware};
    use crate::history::log::{LogEntry, LoggedFeatures, PredictionLogRecord};
    use axum::{body::Body, middleware};
    use http::{Request, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    fn record(user: &str) -> PredictionLogRecord {
        PredictionLogRecord::new(
            user,
            2,
            95.0,
            LogEntry::Single {
                brand: "Acme".to_string(),
                model: "X1".to_string(),
                features: LoggedFeatures::default(),
            },
        )
    }

    async fn get_json(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_identity() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(PredictionLog::new(dir.path().join("predict.log")));
        log.append(&record("anonymous_user")).unwrap();
        log.append(&record("9")).unwrap();
        log.append(&record("9")).unwrap();

        let jwt = JwtManager::new("secret", 60);
        let token = jwt.generate_token(9).unwrap();
        let app = create_history_router(log)
            .layer(middleware::from_fn_with_state(jwt, identity_middleware));

        let (status, body) = get_json(app.clone(), "/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["log_file_exists"], true);

        let (_, body) = get_json(app.clone(), "/history", Some(&token)).await;
        assert_eq!(body["total_count"], 2);
        assert_eq!(body["predictions"][0]["predictedPriceRange"], 2);

        let (status, body) = get_json(app, "/history/debug", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], "9");
        assert_eq!(body["total_lines"], 3);
        assert_eq!(body["user_lines"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_without_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(PredictionLog::new(dir.path().join("predict.log")));

        let (status, body) = get_json(create_history_router(log), "/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 0);
        assert_eq!(body["log_file_exists"], false);
    }
}
