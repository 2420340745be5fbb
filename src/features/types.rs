//! 设备特征类型定义

use serde::Serialize;

/// 校验后的原始设备规格
///
/// 布尔字段已归一为 0.0 / 1.0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RawDeviceRecord {
    pub battery_power: f64,
    pub blue: f64,
    pub clock_speed: f64,
    pub dual_sim: f64,
    pub fc: f64,
    pub four_g: f64,
    pub int_memory: f64,
    pub m_dep: f64,
    pub mobile_wt: f64,
    pub n_cores: f64,
    pub pc: f64,
    pub px_height: f64,
    pub px_width: f64,
    pub ram: f64,
    pub sc_h: f64,
    pub sc_w: f64,
    pub talk_time: f64,
    pub three_g: f64,
    pub touch_screen: f64,
    pub wifi: f64,
}

impl RawDeviceRecord {
    /// 按特征名读取
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "battery_power" => self.battery_power,
            "blue" => self.blue,
            "clock_speed" => self.clock_speed,
            "dual_sim" => self.dual_sim,
            "fc" => self.fc,
            "four_g" => self.four_g,
            "int_memory" => self.int_memory,
            "m_dep" => self.m_dep,
            "mobile_wt" => self.mobile_wt,
            "n_cores" => self.n_cores,
            "pc" => self.pc,
            "px_height" => self.px_height,
            "px_width" => self.px_width,
            "ram" => self.ram,
            "sc_h" => self.sc_h,
            "sc_w" => self.sc_w,
            "talk_time" => self.talk_time,
            "three_g" => self.three_g,
            "touch_screen" => self.touch_screen,
            "wifi" => self.wifi,
            _ => return None,
        };
        Some(value)
    }

    /// 按特征名写入，未知名称返回 false
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        let slot = match name {
            "battery_power" => &mut self.battery_power,
            "blue" => &mut self.blue,
            "clock_speed" => &mut self.clock_speed,
            "dual_sim" => &mut self.dual_sim,
            "fc" => &mut self.fc,
            "four_g" => &mut self.four_g,
            "int_memory" => &mut self.int_memory,
            "m_dep" => &mut self.m_dep,
            "mobile_wt" => &mut self.mobile_wt,
            "n_cores" => &mut self.n_cores,
            "pc" => &mut self.pc,
            "px_height" => &mut self.px_height,
            "px_width" => &mut self.px_width,
            "ram" => &mut self.ram,
            "sc_h" => &mut self.sc_h,
            "sc_w" => &mut self.sc_w,
            "talk_time" => &mut self.talk_time,
            "three_g" => &mut self.three_g,
            "touch_screen" => &mut self.touch_screen,
            "wifi" => &mut self.wifi,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn has_bluetooth(&self) -> bool {
        self.blue != 0.0
    }

    pub fn has_dual_sim(&self) -> bool {
        self.dual_sim != 0.0
    }

    pub fn has_4g(&self) -> bool {
        self.four_g != 0.0
    }

    pub fn has_3g(&self) -> bool {
        self.three_g != 0.0
    }

    pub fn has_touch_screen(&self) -> bool {
        self.touch_screen != 0.0
    }

    pub fn has_wifi(&self) -> bool {
        self.wifi != 0.0
    }
}

/// 原始特征 + 派生特征
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineeredFeatures {
    #[serde(flatten)]
    pub raw: RawDeviceRecord,
    pub camera_total: f64,
    pub px_area: f64,
    pub log_px_width: f64,
    pub log_px_height: f64,
    pub log_px_area: f64,
    pub battery_per_wt: f64,
    pub mem_ratio: f64,
    pub log_battery_power: f64,
    pub log_ram: f64,
    pub log_int_memory: f64,
    pub ppi_proxy: f64,
    pub connectivity_score: f64,
}

impl EngineeredFeatures {
    /// 按特征名读取（原始特征或派生特征）
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "camera_total" => self.camera_total,
            "px_area" => self.px_area,
            "log_px_width" => self.log_px_width,
            "log_px_height" => self.log_px_height,
            "log_px_area" => self.log_px_area,
            "battery_per_wt" => self.battery_per_wt,
            "mem_ratio" => self.mem_ratio,
            "log_battery_power" => self.log_battery_power,
            "log_ram" => self.log_ram,
            "log_int_memory" => self.log_int_memory,
            "ppi_proxy" => self.ppi_proxy,
            "connectivity_score" => self.connectivity_score,
            other => return self.raw.get(other),
        };
        Some(value)
    }

    /// 按给定列顺序投影为特征向量，未知列填 0
    pub fn ordered<S: AsRef<str>>(&self, order: &[S]) -> Vec<f64> {
        order
            .iter()
            .map(|name| self.get(name.as_ref()).unwrap_or(0.0))
            .collect()
    }
}
