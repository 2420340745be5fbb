//! 预训练模型适配层
//!
//! # 结构
//! - [`Estimator`]：底层估计器接口（真实模型文件或测试替身）
//! - [`artifact`]：JSON 模型文件（树集成 / 线性分类器）的加载与求值
//! - [`adapter`]：能力探测、列顺序对齐、不可用状态

pub mod adapter;
pub mod artifact;

pub use adapter::{ImportanceSource, ModelAdapter};

/// 已加载的、只读的估计器
///
/// 实现必须可在多线程间共享且求值过程不修改内部状态
pub trait Estimator: Send + Sync {
    /// 模型类型名称（如 `LGBMClassifier`）
    fn model_type(&self) -> String;

    /// 模型声明的输入列顺序
    fn feature_names(&self) -> Option<Vec<String>> {
        None
    }

    /// 是否支持概率输出
    fn supports_probability(&self) -> bool {
        false
    }

    /// 预测单行的价格档位
    fn predict(&self, row: &[f64]) -> anyhow::Result<i64>;

    /// 预测单行的各类别概率
    fn predict_proba(&self, _row: &[f64]) -> anyhow::Result<Vec<f64>> {
        anyhow::bail!("{} 不支持概率输出", self.model_type())
    }

    /// 树模型的特征重要性
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// 线性模型的系数
    fn coefficients(&self) -> Option<Vec<f64>> {
        None
    }
}
