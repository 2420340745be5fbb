//! 预测 API 类型定义

use std::collections::BTreeMap;

use serde::Serialize;

use crate::estimator::ImportanceSource;
use crate::features::RawDeviceRecord;

// ============ 单条预测 ============

/// 单条预测响应
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    /// 价格档位
    pub predicted_price_range: i64,
    /// 置信度百分比（无概率输出时为默认值）
    pub confidence: f64,
    /// 各类别概率（模型不支持时为 null）
    pub probabilities: Option<Vec<f64>>,
    /// 关键设备参数回显
    pub device_features: DeviceFeatureEcho,
}

/// 关键设备参数回显
#[derive(Debug, Clone, Serialize)]
pub struct DeviceFeatureEcho {
    pub battery_power: f64,
    pub ram: f64,
    pub internal_memory: f64,
    pub camera_front: f64,
    pub camera_primary: f64,
    pub screen_height: f64,
    pub screen_width: f64,
    pub pixel_height: f64,
    pub pixel_width: f64,
    pub has_bluetooth: bool,
    pub has_dual_sim: bool,
    pub has_4g: bool,
    pub has_3g: bool,
    pub has_touch_screen: bool,
    pub has_wifi: bool,
}

impl From<&RawDeviceRecord> for DeviceFeatureEcho {
    fn from(raw: &RawDeviceRecord) -> Self {
        Self {
            battery_power: raw.battery_power,
            ram: raw.ram,
            internal_memory: raw.int_memory,
            camera_front: raw.fc,
            camera_primary: raw.pc,
            screen_height: raw.sc_h,
            screen_width: raw.sc_w,
            pixel_height: raw.px_height,
            pixel_width: raw.px_width,
            has_bluetooth: raw.has_bluetooth(),
            has_dual_sim: raw.has_dual_sim(),
            has_4g: raw.has_4g(),
            has_3g: raw.has_3g(),
            has_touch_screen: raw.has_touch_screen(),
            has_wifi: raw.has_wifi(),
        }
    }
}

// ============ 批量预测 ============

/// 批量预测中单行的结果
#[derive(Debug, Clone, Serialize)]
pub struct BatchRowPrediction {
    /// 数据行号（从 1 开始）
    pub row: usize,
    pub predicted_price_range: i64,
    pub battery_power: f64,
    pub ram: f64,
    pub int_memory: f64,
}

/// 批量预测响应
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub total_processed: usize,
    pub successful_predictions: usize,
    pub errors_count: usize,
    pub predictions: Vec<BatchRowPrediction>,
    /// 前 10 条行级错误
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// 未返回的行级错误数量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_errors: Option<usize>,
}

// ============ 预测解释 ============

/// 预测解释响应
#[derive(Debug, Clone, Serialize)]
pub struct ExplainResponse {
    pub predicted_price_range: i64,
    pub feature_importance: BTreeMap<String, f64>,
    pub importance_source: ImportanceSource,
    /// 绝对值最大的 5 个特征，降序
    pub top_features: Vec<(String, f64)>,
    pub device_summary: DeviceSummary,
    pub explanation: &'static str,
    pub model_info: ModelSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub battery_power: f64,
    pub ram: f64,
    pub internal_memory: f64,
    pub screen_size: String,
    pub camera_quality: String,
    pub connectivity: Connectivity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Connectivity {
    pub wifi: bool,
    #[serde(rename = "4g")]
    pub four_g: bool,
    #[serde(rename = "3g")]
    pub three_g: bool,
    pub bluetooth: bool,
}

impl From<&RawDeviceRecord> for DeviceSummary {
    fn from(raw: &RawDeviceRecord) -> Self {
        Self {
            battery_power: raw.battery_power,
            ram: raw.ram,
            internal_memory: raw.int_memory,
            screen_size: format!("{}x{}", raw.sc_h, raw.sc_w),
            camera_quality: format!("Primary: {}MP, Front: {}MP", raw.pc, raw.fc),
            connectivity: Connectivity {
                wifi: raw.has_wifi(),
                four_g: raw.has_4g(),
                three_g: raw.has_3g(),
                bluetooth: raw.has_bluetooth(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub model_type: String,
    pub features_count: usize,
}

// ============ 特征说明 ============

/// `GET /predict/features` 响应
#[derive(Debug, Clone, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<&'static str>,
    pub feature_descriptions: BTreeMap<&'static str, &'static str>,
    pub model_path: String,
    pub model_exists: bool,
    pub model_loaded: bool,
    /// 实际传给模型的列顺序（模型不可用时为 null）
    pub feature_order: Option<Vec<String>>,
    pub prediction_log_path: String,
    pub log_exists: bool,
}

// ============ 错误响应 ============

/// 预测 API 错误响应
#[derive(Debug, Serialize)]
pub struct PredictErrorResponse {
    pub error: PredictErrorBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_columns: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PredictErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl PredictErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: PredictErrorBody {
                error_type: error_type.into(),
                message: message.into(),
            },
            expected_path: None,
            required_columns: None,
            found_columns: None,
        }
    }
}
