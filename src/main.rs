use anyhow::Result;
use content_assessor::{logger, App, Config};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置：设置了 CONFIG_FILE 时读取 TOML，否则读取环境变量
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => Config::from_toml_file(Path::new(&path))?,
        Err(_) => Config::from_env(),
    };

    // 初始化并运行应用
    let stats = App::initialize(config).await?.run().await?;
    if stats.failed > 0 {
        tracing::warn!("⚠️ {} 个内容单元分析失败", stats.failed);
    }

    Ok(())
}
