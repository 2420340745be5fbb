//! 特征工程：原始规格 → 模型所需的完整特征集

use super::types::{EngineeredFeatures, RawDeviceRecord};

/// 防止除零的极小量
const EPSILON: f64 = 1e-5;

/// 计算派生特征
///
/// 纯函数，对任意输入（包括全 0）都返回完整结果
pub fn engineer(raw: &RawDeviceRecord) -> EngineeredFeatures {
    let px_area = raw.px_width * raw.px_height;
    let diagonal = (raw.sc_h.powi(2) + raw.sc_w.powi(2)).sqrt();

    let connectivity_score = [
        raw.blue,
        raw.wifi,
        raw.four_g,
        raw.three_g,
        raw.dual_sim,
        raw.touch_screen,
    ]
    .iter()
    .filter(|flag| **flag != 0.0)
    .count() as f64;

    EngineeredFeatures {
        raw: *raw,
        camera_total: raw.fc + raw.pc,
        px_area,
        log_px_width: raw.px_width.ln_1p(),
        log_px_height: raw.px_height.ln_1p(),
        log_px_area: px_area.ln_1p(),
        battery_per_wt: raw.battery_power / (raw.mobile_wt + EPSILON),
        mem_ratio: raw.ram / (raw.int_memory + EPSILON),
        log_battery_power: raw.battery_power.ln_1p(),
        log_ram: raw.ram.ln_1p(),
        log_int_memory: raw.int_memory.ln_1p(),
        ppi_proxy: px_area.sqrt() / (diagonal + EPSILON),
        connectivity_score,
    }
}
