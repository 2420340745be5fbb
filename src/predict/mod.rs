//! 价格档位预测
//!
//! 单条 / 批量 / 解释 三种预测入口，以及特征说明接口

pub mod error;
mod handlers;
mod router;
pub mod service;
pub mod types;

pub use error::PredictError;
pub use router::create_predict_router;
pub use service::PredictionService;
