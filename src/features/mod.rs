//! 设备特征模块
//!
//! 输入校验与特征工程，预测流水线的前两步

pub mod engineer;
pub mod schema;
pub mod types;
pub mod validate;

pub use engineer::engineer;
pub use types::{EngineeredFeatures, RawDeviceRecord};
pub use validate::{ValidationError, validate};
