//! 设备特征名称表
//!
//! 原始特征（调用方提供）与模型列顺序的唯一来源

/// 调用方必须提供的 20 个原始特征（声明顺序）
pub const RAW_FEATURES: [&str; 20] = [
    "battery_power",
    "blue",
    "clock_speed",
    "dual_sim",
    "fc",
    "four_g",
    "int_memory",
    "m_dep",
    "mobile_wt",
    "n_cores",
    "pc",
    "px_height",
    "px_width",
    "ram",
    "sc_h",
    "sc_w",
    "talk_time",
    "three_g",
    "touch_screen",
    "wifi",
];

/// 数值型原始特征
pub const NUMERIC_FIELDS: [&str; 14] = [
    "battery_power",
    "clock_speed",
    "fc",
    "int_memory",
    "m_dep",
    "mobile_wt",
    "n_cores",
    "pc",
    "px_height",
    "px_width",
    "ram",
    "sc_h",
    "sc_w",
    "talk_time",
];

/// 布尔型原始特征（归一为 0/1）
pub const BOOLEAN_FIELDS: [&str; 6] = [
    "blue",
    "dual_sim",
    "four_g",
    "three_g",
    "touch_screen",
    "wifi",
];

/// 模型未声明列顺序时使用的固定列顺序
///
/// 前 20 列为原始特征，其后为派生特征
pub const MODEL_FEATURES: [&str; 32] = [
    "battery_power",
    "blue",
    "clock_speed",
    "dual_sim",
    "fc",
    "four_g",
    "int_memory",
    "m_dep",
    "mobile_wt",
    "n_cores",
    "pc",
    "px_height",
    "px_width",
    "ram",
    "sc_h",
    "sc_w",
    "talk_time",
    "three_g",
    "touch_screen",
    "wifi",
    "px_area",
    "ppi_proxy",
    "mem_ratio",
    "battery_per_wt",
    "camera_total",
    "log_ram",
    "log_px_area",
    "log_px_width",
    "log_px_height",
    "log_battery_power",
    "log_int_memory",
    "connectivity_score",
];

/// 原始特征说明（`GET /predict/features`）
pub const FEATURE_DESCRIPTIONS: [(&str, &str); 20] = [
    ("battery_power", "Total energy a battery can store in mAh"),
    ("blue", "Has bluetooth (1/0)"),
    ("clock_speed", "Speed at which microprocessor executes instructions"),
    ("dual_sim", "Has dual sim support (1/0)"),
    ("fc", "Front Camera mega pixels"),
    ("four_g", "Has 4G support (1/0)"),
    ("int_memory", "Internal Memory in GB"),
    ("m_dep", "Mobile Depth in cm"),
    ("mobile_wt", "Weight of mobile phone"),
    ("n_cores", "Number of cores of processor"),
    ("pc", "Primary Camera mega pixels"),
    ("px_height", "Pixel Resolution Height"),
    ("px_width", "Pixel Resolution Width"),
    ("ram", "Random Access Memory in MB"),
    ("sc_h", "Screen Height of mobile in cm"),
    ("sc_w", "Screen Width of mobile in cm"),
    ("talk_time", "Longest time that battery will last during calls"),
    ("three_g", "Has 3G support (1/0)"),
    ("touch_screen", "Has touch screen (1/0)"),
    ("wifi", "Has wifi support (1/0)"),
];

/// 固定列顺序（拥有所有权的版本）
pub fn default_feature_order() -> Vec<String> {
    MODEL_FEATURES.iter().map(|s| s.to_string()).collect()
}
