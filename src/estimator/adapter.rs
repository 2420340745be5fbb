//! 模型适配器
//!
//! 负责：
//! - 启动时加载模型文件（失败不崩溃，进入不可用状态）
//! - 一次性探测模型能力（概率输出、特征重要性、声明列顺序）
//! - 按模型要求的列顺序投影特征向量

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::Estimator;
use super::artifact::ArtifactModel;
use crate::features::EngineeredFeatures;
use crate::features::schema::default_feature_order;
use crate::predict::PredictError;

/// 模型重要性缩放常数（降级近似：|特征值| / 1000）
const APPROXIMATE_IMPORTANCE_SCALE: f64 = 1000.0;

/// 特征重要性来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceSource {
    /// 树模型自带的重要性
    Native,
    /// 线性模型系数
    Coefficients,
    /// 按特征值近似，不是真正的重要性
    Approximate,
}

/// 加载时探测到的模型能力
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub supports_probability: bool,
    pub importance: ImportanceSource,
    pub declared_feature_order: Option<Vec<String>>,
}

/// 模型状态摘要（健康检查 / 特征接口使用）
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub path: String,
    pub loaded: bool,
    pub model_type: Option<String>,
    pub fingerprint: Option<String>,
    pub feature_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

struct LoadedModel {
    estimator: Arc<dyn Estimator>,
    capabilities: Capabilities,
    /// 实际传给模型的列顺序
    feature_order: Vec<String>,
    /// 探测时缓存的重要性权重（Native / Coefficients）
    importance_weights: Option<Vec<f64>>,
    model_type: String,
    fingerprint: Option<String>,
}

enum ModelState {
    Ready(LoadedModel),
    Unavailable { reason: String },
}

/// 预训练模型适配器（进程启动时构建一次，只读共享）
pub struct ModelAdapter {
    path: PathBuf,
    state: ModelState,
}

impl ModelAdapter {
    /// 从模型文件加载
    ///
    /// 文件缺失或损坏时返回不可用状态的适配器，不会返回错误
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("Model file not found at {}", path.display())
                } else {
                    format!("读取模型文件失败: {}", e)
                };
                tracing::error!(path = %path.display(), "{}", reason);
                return Self::unavailable(path, reason);
            }
        };

        let fingerprint = hex::encode(Sha256::digest(&bytes));
        let model = std::str::from_utf8(&bytes)
            .map_err(anyhow::Error::from)
            .and_then(ArtifactModel::from_json);

        match model {
            Ok(model) => {
                let adapter = Self::build(path, Arc::new(model), Some(fingerprint));
                if let ModelState::Ready(loaded) = &adapter.state {
                    tracing::info!(
                        path = %adapter.path.display(),
                        model_type = %loaded.model_type,
                        features = loaded.feature_order.len(),
                        fingerprint = %loaded.fingerprint.as_deref().unwrap_or("-"),
                        "模型加载成功"
                    );
                }
                adapter
            }
            Err(e) => {
                let reason = format!("Error loading model: {:#}", e);
                tracing::error!(path = %path.display(), "{}", reason);
                Self::unavailable(path, reason)
            }
        }
    }

    /// 直接包装一个已构建的估计器（测试替身）
    #[cfg(test)]
    pub fn from_estimator(estimator: Arc<dyn Estimator>) -> Self {
        Self::build(PathBuf::from("<in-memory>"), estimator, None)
    }

    /// 构建不可用状态的适配器
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: ModelState::Unavailable {
                reason: reason.into(),
            },
        }
    }

    fn build(path: PathBuf, estimator: Arc<dyn Estimator>, fingerprint: Option<String>) -> Self {
        let declared_feature_order = estimator.feature_names();
        let (importance, importance_weights) = match estimator.feature_importances() {
            Some(weights) => (ImportanceSource::Native, Some(weights)),
            None => match estimator.coefficients() {
                Some(weights) => (ImportanceSource::Coefficients, Some(weights)),
                None => (ImportanceSource::Approximate, None),
            },
        };

        let capabilities = Capabilities {
            supports_probability: estimator.supports_probability(),
            importance,
            declared_feature_order: declared_feature_order.clone(),
        };
        let feature_order = declared_feature_order.unwrap_or_else(default_feature_order);
        let model_type = estimator.model_type();

        Self {
            path,
            state: ModelState::Ready(LoadedModel {
                estimator,
                capabilities,
                feature_order,
                importance_weights,
                model_type,
                fingerprint,
            }),
        }
    }

    /// 模型文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 模型是否可用
    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    /// 模型类型名称
    pub fn model_type(&self) -> Option<&str> {
        match &self.state {
            ModelState::Ready(loaded) => Some(&loaded.model_type),
            ModelState::Unavailable { .. } => None,
        }
    }

    /// 模型能力
    #[cfg(test)]
    pub fn capabilities(&self) -> Option<&Capabilities> {
        match &self.state {
            ModelState::Ready(loaded) => Some(&loaded.capabilities),
            ModelState::Unavailable { .. } => None,
        }
    }

    /// 模型不可用时返回 `ModelUnavailable`
    pub fn ensure_available(&self) -> Result<(), PredictError> {
        self.loaded().map(|_| ())
    }

    /// 传给模型的列顺序
    pub fn feature_order(&self) -> Result<&[String], PredictError> {
        Ok(&self.loaded()?.feature_order)
    }

    /// 状态摘要
    pub fn info(&self) -> ModelInfo {
        let path = self.path.display().to_string();
        match &self.state {
            ModelState::Ready(loaded) => ModelInfo {
                path,
                loaded: true,
                model_type: Some(loaded.model_type.clone()),
                fingerprint: loaded.fingerprint.clone(),
                feature_count: loaded.feature_order.len(),
                capabilities: Some(loaded.capabilities.clone()),
                reason: None,
            },
            ModelState::Unavailable { reason } => ModelInfo {
                path,
                loaded: false,
                model_type: None,
                fingerprint: None,
                feature_count: 0,
                capabilities: None,
                reason: Some(reason.clone()),
            },
        }
    }

    fn loaded(&self) -> Result<&LoadedModel, PredictError> {
        match &self.state {
            ModelState::Ready(loaded) => Ok(loaded),
            ModelState::Unavailable { reason } => Err(PredictError::ModelUnavailable {
                reason: reason.clone(),
                expected_path: self.path.display().to_string(),
            }),
        }
    }

    /// 预测价格档位
    pub fn predict(&self, features: &EngineeredFeatures) -> Result<i64, PredictError> {
        let loaded = self.loaded()?;
        let row = features.ordered(&loaded.feature_order);
        loaded.estimator.predict(&row).map_err(|e| {
            tracing::error!(model_type = %loaded.model_type, "模型推理失败: {:#}", e);
            PredictError::Inference(format!("{:#}", e))
        })
    }

    /// 各类别概率
    ///
    /// 模型不支持或概率计算失败时返回 `Ok(None)`
    pub fn predict_proba(
        &self,
        features: &EngineeredFeatures,
    ) -> Result<Option<Vec<f64>>, PredictError> {
        let loaded = self.loaded()?;
        if !loaded.capabilities.supports_probability {
            return Ok(None);
        }

        let row = features.ordered(&loaded.feature_order);
        match loaded.estimator.predict_proba(&row) {
            Ok(proba) => Ok(Some(proba)),
            Err(e) => {
                tracing::warn!(model_type = %loaded.model_type, "概率计算失败，忽略: {:#}", e);
                Ok(None)
            }
        }
    }

    /// 特征重要性（按列顺序）
    ///
    /// 优先使用模型自带重要性，其次线性系数，最后按 |特征值| / 1000 近似
    pub fn feature_importance(
        &self,
        features: &EngineeredFeatures,
    ) -> Result<(Vec<(String, f64)>, ImportanceSource), PredictError> {
        let loaded = self.loaded()?;
        let source = loaded.capabilities.importance;

        let entries = match &loaded.importance_weights {
            Some(weights) => loaded
                .feature_order
                .iter()
                .cloned()
                .zip(weights.iter().copied())
                .collect(),
            None => loaded
                .feature_order
                .iter()
                .map(|name| {
                    let value = features.get(name).unwrap_or(0.0);
                    (name.clone(), value.abs() / APPROXIMATE_IMPORTANCE_SCALE)
                })
                .collect(),
        };

        Ok((entries, source))
    }
}
