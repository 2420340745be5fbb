use clap::Parser;

/// 手机价格档位预测服务
#[derive(Parser, Debug)]
#[command(name = "device-price-rs", version, about)]
pub struct Args {
    /// 配置文件路径（默认 config.json）
    #[arg(short, long)]
    pub config: Option<String>,

    /// 日志级别（覆盖 RUST_LOG，例如 debug、info、device_price_rs=trace）
    #[arg(long)]
    pub log_level: Option<String>,
}
