//! JSON 模型文件
//!
//! 训练流水线导出的模型描述，支持两种估计器：
//! - `gbdt`：梯度提升树集成（多分类 softmax / 二分类 sigmoid）
//! - `linear`：线性分类器（logits = W·x + b）
//!
//! 结构在加载时一次性校验，求值阶段不再检查下标。

use anyhow::{Context, bail, ensure};
use serde::Deserialize;

use super::Estimator;
use crate::features::schema::MODEL_FEATURES;

/// 模型文件顶层结构
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelArtifact {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    /// 模型声明的列顺序（可选）
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// 类别标签（默认 0..k）
    #[serde(default)]
    pub classes: Option<Vec<i64>>,
    pub estimator: EstimatorSpec,
}

fn default_model_type() -> String {
    "GradientBoostingClassifier".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EstimatorSpec {
    Gbdt(TreeEnsemble),
    Linear(LinearModel),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEnsemble {
    /// 输出维度；1 表示二分类
    pub num_class: usize,
    #[serde(default)]
    pub init_score: Vec<f64>,
    pub trees: Vec<Tree>,
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    #[serde(default)]
    pub class_index: usize,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default, rename = "defaultLeft")]
        default_left: bool,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearModel {
    /// 每个输出一行；单行表示二分类
    pub coefficients: Vec<Vec<f64>>,
    #[serde(default)]
    pub intercept: Vec<f64>,
}

/// 通过校验、可直接求值的模型
#[derive(Debug, Clone)]
pub struct ArtifactModel {
    model_type: String,
    feature_names: Option<Vec<String>>,
    classes: Vec<i64>,
    width: usize,
    spec: EstimatorSpec,
}

impl ArtifactModel {
    /// 从 JSON 文本解析并校验
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_str(content).context("模型文件 JSON 解析失败")?;
        Self::from_artifact(artifact)
    }

    /// 校验模型结构
    pub fn from_artifact(artifact: ModelArtifact) -> anyhow::Result<Self> {
        let width = artifact
            .feature_names
            .as_ref()
            .map(|names| names.len())
            .unwrap_or(MODEL_FEATURES.len());
        ensure!(width > 0, "featureNames 不能为空");

        let outputs = match &artifact.estimator {
            EstimatorSpec::Gbdt(ensemble) => validate_ensemble(ensemble, width)?,
            EstimatorSpec::Linear(linear) => validate_linear(linear, width)?,
        };
        let n_classes = if outputs == 1 { 2 } else { outputs };

        let classes = match artifact.classes {
            Some(classes) => {
                ensure!(
                    classes.len() == n_classes,
                    "classes 数量 {} 与模型输出 {} 不一致",
                    classes.len(),
                    n_classes
                );
                classes
            }
            None => (0..n_classes as i64).collect(),
        };

        Ok(Self {
            model_type: artifact.model_type,
            feature_names: artifact.feature_names,
            classes,
            width,
            spec: artifact.estimator,
        })
    }

    /// 原始输出（树叶值之和 / logits）
    fn raw_scores(&self, row: &[f64]) -> anyhow::Result<Vec<f64>> {
        ensure!(
            row.len() == self.width,
            "特征向量长度 {} 与模型输入 {} 不一致",
            row.len(),
            self.width
        );

        let scores = match &self.spec {
            EstimatorSpec::Gbdt(ensemble) => {
                let mut scores = if ensemble.init_score.is_empty() {
                    vec![0.0; ensemble.num_class]
                } else {
                    ensemble.init_score.clone()
                };
                for tree in &ensemble.trees {
                    scores[tree.class_index] += traverse(tree, row);
                }
                scores
            }
            EstimatorSpec::Linear(linear) => linear
                .coefficients
                .iter()
                .enumerate()
                .map(|(i, weights)| {
                    let bias = linear.intercept.get(i).copied().unwrap_or(0.0);
                    weights.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + bias
                })
                .collect(),
        };
        Ok(scores)
    }
}

impl Estimator for ArtifactModel {
    fn model_type(&self) -> String {
        self.model_type.clone()
    }

    fn feature_names(&self) -> Option<Vec<String>> {
        self.feature_names.clone()
    }

    fn supports_probability(&self) -> bool {
        true
    }

    fn predict(&self, row: &[f64]) -> anyhow::Result<i64> {
        let proba = self.predict_proba(row)?;
        let best = argmax(&proba).context("模型没有输出")?;
        Ok(self.classes[best])
    }

    fn predict_proba(&self, row: &[f64]) -> anyhow::Result<Vec<f64>> {
        let scores = self.raw_scores(row)?;
        if scores.len() == 1 {
            let p = sigmoid(scores[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&scores))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        match &self.spec {
            EstimatorSpec::Gbdt(ensemble) => ensemble.feature_importances.clone(),
            EstimatorSpec::Linear(_) => None,
        }
    }

    fn coefficients(&self) -> Option<Vec<f64>> {
        match &self.spec {
            EstimatorSpec::Linear(linear) => linear.coefficients.first().cloned(),
            EstimatorSpec::Gbdt(_) => None,
        }
    }
}

fn validate_ensemble(ensemble: &TreeEnsemble, width: usize) -> anyhow::Result<usize> {
    ensure!(ensemble.num_class > 0, "numClass 必须大于 0");
    ensure!(!ensemble.trees.is_empty(), "模型不包含任何树");
    if !ensemble.init_score.is_empty() {
        ensure!(
            ensemble.init_score.len() == ensemble.num_class,
            "initScore 长度与 numClass 不一致"
        );
    }
    if let Some(importances) = &ensemble.feature_importances {
        ensure!(
            importances.len() == width,
            "featureImportances 长度 {} 与特征数 {} 不一致",
            importances.len(),
            width
        );
    }

    for (t, tree) in ensemble.trees.iter().enumerate() {
        ensure!(
            tree.class_index < ensemble.num_class,
            "第 {} 棵树的 classIndex 越界",
            t
        );
        ensure!(!tree.nodes.is_empty(), "第 {} 棵树没有节点", t);
        for (i, node) in tree.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                ensure!(*feature < width, "第 {} 棵树节点 {} 的特征下标越界", t, i);
                // 子节点必须位于父节点之后，保证遍历必然终止
                for child in [*left, *right] {
                    if child <= i || child >= tree.nodes.len() {
                        bail!("第 {} 棵树节点 {} 的子节点 {} 非法", t, i, child);
                    }
                }
            }
        }
    }

    Ok(ensemble.num_class)
}

fn validate_linear(linear: &LinearModel, width: usize) -> anyhow::Result<usize> {
    ensure!(!linear.coefficients.is_empty(), "coefficients 不能为空");
    for (i, row) in linear.coefficients.iter().enumerate() {
        ensure!(
            row.len() == width,
            "coefficients 第 {} 行长度 {} 与特征数 {} 不一致",
            i,
            row.len(),
            width
        );
    }
    if !linear.intercept.is_empty() {
        ensure!(
            linear.intercept.len() == linear.coefficients.len(),
            "intercept 长度与 coefficients 行数不一致"
        );
    }
    Ok(linear.coefficients.len())
}

/// 从根节点走到叶子，`value <= threshold` 走左子树，NaN 按 defaultLeft
fn traverse(tree: &Tree, row: &[f64]) -> f64 {
    let mut index = 0;
    loop {
        match &tree.nodes[index] {
            Node::Leaf { leaf } => return *leaf,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                default_left,
            } => {
                let value = row[*feature];
                let go_left = if value.is_nan() {
                    *default_left
                } else {
                    value <= *threshold
                };
                index = if go_left { *left } else { *right };
            }
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// 最大值下标，并列时取第一个
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.iter().copied().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// 两个特征、四分类的小型树模型：按 ram 分档
    pub(crate) fn ram_tier_artifact() -> serde_json::Value {
        let tree = |class: usize, low: f64, high: f64| {
            json!({
                "classIndex": class,
                "nodes": [
                    {"feature": 0, "threshold": 2000.0, "left": 1, "right": 2},
                    {"leaf": low},
                    {"leaf": high}
                ]
            })
        };
        json!({
            "modelType": "LGBMClassifier",
            "featureNames": ["ram", "battery_power"],
            "estimator": {
                "kind": "gbdt",
                "numClass": 4,
                "trees": [
                    tree(0, 2.0, -1.0),
                    tree(1, 0.5, -1.0),
                    tree(2, -1.0, 0.5),
                    tree(3, -1.0, 2.0)
                ],
                "featureImportances": [120.0, 30.0]
            }
        })
    }

    #[test]
    fn test_gbdt_multiclass_prediction() {
        let model = ArtifactModel::from_json(&ram_tier_artifact().to_string()).unwrap();

        assert_eq!(model.predict(&[1000.0, 1500.0]).unwrap(), 0);
        assert_eq!(model.predict(&[3500.0, 1500.0]).unwrap(), 3);

        let proba = model.predict_proba(&[3500.0, 1500.0]).unwrap();
        assert_eq!(proba.len(), 4);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba[3] > proba[2]);
        assert_eq!(
            model.feature_names(),
            Some(vec!["ram".to_string(), "battery_power".to_string()])
        );
        assert_eq!(model.feature_importances(), Some(vec![120.0, 30.0]));
        assert!(model.coefficients().is_none());
    }

    #[test]
    fn test_nan_follows_default_direction() {
        let artifact = json!({
            "featureNames": ["x"],
            "classes": [10, 20],
            "estimator": {
                "kind": "gbdt",
                "numClass": 1,
                "trees": [{"nodes": [
                    {"feature": 0, "threshold": 0.5, "left": 1, "right": 2, "defaultLeft": true},
                    {"leaf": -3.0},
                    {"leaf": 3.0}
                ]}]
            }
        });
        let model = ArtifactModel::from_json(&artifact.to_string()).unwrap();

        assert_eq!(model.predict(&[f64::NAN]).unwrap(), 10);
        assert_eq!(model.predict(&[1.0]).unwrap(), 20);
        let proba = model.predict_proba(&[1.0]).unwrap();
        assert!((proba[1] - sigmoid(3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_linear_model() {
        let artifact = json!({
            "modelType": "LogisticRegression",
            "featureNames": ["a", "b"],
            "estimator": {
                "kind": "linear",
                "coefficients": [[1.0, 0.0], [0.0, 1.0], [-1.0, -1.0]],
                "intercept": [0.0, 0.0, 0.0]
            }
        });
        let model = ArtifactModel::from_json(&artifact.to_string()).unwrap();

        assert_eq!(model.predict(&[5.0, 1.0]).unwrap(), 0);
        assert_eq!(model.predict(&[1.0, 5.0]).unwrap(), 1);
        assert_eq!(model.coefficients(), Some(vec![1.0, 0.0]));
        assert!(model.feature_importances().is_none());
    }

    #[test]
    fn test_default_width_is_fixed_order() {
        let weights = vec![0.1; 32];
        let artifact = json!({
            "estimator": {
                "kind": "linear",
                "coefficients": [weights]
            }
        });
        let model = ArtifactModel::from_json(&artifact.to_string()).unwrap();
        assert!(model.feature_names().is_none());
        assert!(model.predict(&[1.0; 32]).is_ok());
        assert!(model.predict(&[1.0; 3]).is_err());
    }

    #[test]
    fn test_rejects_invalid_structures() {
        let backwards = json!({
            "featureNames": ["x"],
            "estimator": {"kind": "gbdt", "numClass": 2, "trees": [{"nodes": [
                {"leaf": 1.0},
                {"feature": 0, "threshold": 1.0, "left": 0, "right": 0}
            ]}]}
        });
        assert!(ArtifactModel::from_json(&backwards.to_string()).is_err());

        let bad_feature = json!({
            "featureNames": ["x"],
            "estimator": {"kind": "gbdt", "numClass": 2, "trees": [{"nodes": [
                {"feature": 4, "threshold": 1.0, "left": 1, "right": 2},
                {"leaf": 1.0}, {"leaf": 2.0}
            ]}]}
        });
        assert!(ArtifactModel::from_json(&bad_feature.to_string()).is_err());

        let bad_classes = json!({
            "featureNames": ["x"],
            "classes": [0, 1, 2],
            "estimator": {"kind": "linear", "coefficients": [[1.0], [2.0]]}
        });
        assert!(ArtifactModel::from_json(&bad_classes.to_string()).is_err());

        assert!(ArtifactModel::from_json("not json").is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), Some(0));
        assert_eq!(argmax(&[0.1, 0.6, 0.3]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
