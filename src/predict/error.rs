//! 预测服务错误类型

use axum::http::StatusCode;
use thiserror::Error;

use super::types::PredictErrorResponse;
use crate::features::ValidationError;

/// 模型不可用时返回给调用方的固定提示
pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "ML model not available. Please ensure the model is trained and placed in the models directory.";

/// 预测服务错误
#[derive(Debug, Error)]
pub enum PredictError {
    /// 请求格式错误（无请求体、无文件、非 CSV 等）
    #[error("{0}")]
    BadRequest(String),

    /// 原始字段缺失或格式错误
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 批量文件缺少必需列
    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema {
        missing: Vec<String>,
        required: Vec<String>,
        found: Vec<String>,
    },

    /// 模型未加载
    #[error("模型不可用: {reason}")]
    ModelUnavailable {
        reason: String,
        expected_path: String,
    },

    /// 底层模型推理失败（细节只写日志）
    #[error("模型推理失败: {0}")]
    Inference(String),

    /// 其他内部错误
    #[error("{0}")]
    Internal(String),
}

impl PredictError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::BadRequest(_)
            | PredictError::Validation(_)
            | PredictError::Schema { .. } => StatusCode::BAD_REQUEST,
            PredictError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::Inference(_) | PredictError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 转换为 API 错误响应
    pub fn into_response(self) -> PredictErrorResponse {
        match self {
            PredictError::BadRequest(msg) => PredictErrorResponse::new("invalid_request", msg),
            PredictError::Validation(e) => {
                PredictErrorResponse::new("validation_error", e.to_string())
            }
            PredictError::Schema {
                missing,
                required,
                found,
            } => {
                let mut response = PredictErrorResponse::new(
                    "schema_error",
                    format!("Missing required columns: {}", missing.join(", ")),
                );
                response.required_columns = Some(required);
                response.found_columns = Some(found);
                response
            }
            PredictError::ModelUnavailable { expected_path, .. } => {
                let mut response =
                    PredictErrorResponse::new("model_unavailable", MODEL_UNAVAILABLE_MESSAGE);
                response.expected_path = Some(expected_path);
                response
            }
            PredictError::Inference(_) => {
                PredictErrorResponse::new("inference_error", "Prediction failed")
            }
            PredictError::Internal(msg) => PredictErrorResponse::new("internal_error", msg),
        }
    }
}
