//! 日志初始化
//!
//! 默认级别为 `info`，可以用 `RUST_LOG` 覆盖（例如 `RUST_LOG=content_assessor=debug`）。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化全局日志；重复调用时保留已有的订阅者
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
