//! 预测 API 路由

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{explain, get_features, predict_batch, predict_single};
use super::service::PredictionService;

/// 预测 API 状态
#[derive(Clone)]
pub struct PredictState {
    pub service: Arc<PredictionService>,
}

/// 创建预测 API 路由
///
/// # 端点
/// - `POST /` - 单条预测
/// - `POST /batch` - CSV 批量预测（multipart 字段 `file`）
/// - `POST /explain` - 预测及特征重要性
/// - `GET /features` - 特征说明与模型状态
pub fn create_predict_router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/", post(predict_single))
        .route("/batch", post(predict_batch))
        .route("/explain", post(explain))
        .route("/features", get(get_features))
        .with_state(PredictState { service })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::ModelAdapter;
    use crate::estimator::adapter::tests::ConstantEstimator;
    use crate::history::PredictionLog;
    use axum::body::Body;
    use http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-DEVICE-PRICE-BOUNDARY";

    fn router(adapter: ModelAdapter, dir: &tempfile::TempDir) -> Router {
        let log = PredictionLog::new(dir.path().join("predict.log"));
        let service = PredictionService::new(Arc::new(adapter), Arc::new(log), None);
        create_predict_router(Arc::new(service))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_file(file_name: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = file_name,
            c = content
        );
        Request::builder()
            .method("POST")
            .uri("/batch")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn device() -> Value {
        let mut device = json!({});
        for name in crate::features::schema::RAW_FEATURES {
            device[name] = json!(1);
        }
        device
    }

    #[tokio::test]
    async fn test_predict_single_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(ModelAdapter::from_estimator(Arc::new(ConstantEstimator { tier: 3 })), &dir);

        let (status, body) = send(app.clone(), post_json("/", &device().to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_price_range"], 3);
        assert_eq!(body["confidence"], 95.0);
        assert!(body["probabilities"].is_null());

        let (status, body) = send(app.clone(), post_json("/", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "No data provided");

        let (status, body) = send(app, post_json("/", r#"{"ram": 1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_model_unavailable_returns_503() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ModelAdapter::unavailable("models-ai/lgb_model.json", "Model file not found");
        let app = router(adapter, &dir);

        for request in [
            post_json("/", &device().to_string()),
            post_json("/explain", ""),
            post_file("phones.csv", "a,b\n1,2"),
        ] {
            let (status, body) = send(app.clone(), request).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body["error"]["type"], "model_unavailable");
            assert_eq!(body["expected_path"], "models-ai/lgb_model.json");
        }

        let request = Request::builder().uri("/features").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_loaded"], false);
        assert_eq!(body["features"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_batch_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(ModelAdapter::from_estimator(Arc::new(ConstantEstimator { tier: 1 })), &dir);

        let header_line = crate::features::schema::RAW_FEATURES.join(",");
        let row = vec!["1"; 20].join(",");
        let csv = format!("{}\n{}\n{}", header_line, row, row);

        let (status, body) = send(app.clone(), post_file("phones.csv", &csv)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_processed"], 2);
        assert_eq!(body["successful_predictions"], 2);
        assert!(body.get("errors").is_none());

        let (status, body) = send(app.clone(), post_file("phones.txt", &csv)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "File must be a CSV");

        let (status, body) = send(app, post_file("phones.csv", "ram\n1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "schema_error");
        assert_eq!(body["found_columns"], json!(["ram"]));
    }
}
