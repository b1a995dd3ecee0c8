//! Tollgate 入口：初始化日志、加载并校验配置、构建会话并运行交互循环。

use anyhow::Context;
use tollgate::config::load_config;
use tollgate::core::AgentBuilder;
use tollgate::observability;
use tollgate::ui::StdioConsole;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load configuration")?;
    cfg.validate().context("Invalid configuration")?;

    let session = AgentBuilder::new(cfg)
        .with_system_prompt_from_file()
        .build()
        .await
        .context("Failed to create agent")?;

    let mut console = StdioConsole::new();
    session.run(&mut console).await.context("Session failed")?;
    Ok(())
}
