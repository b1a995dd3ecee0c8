//! Tollgate - 带授权与人工审批挂起 / 恢复的命令行智能体
//!
//! 模块划分：
//! - **auth**: 授权服务边界（等待用户在外部完成授权）
//! - **config**: 应用配置加载（.env + TOML + 环境变量）与启动校验
//! - **core**: 错误类型、轮次状态机与编排器、会话主循环、构建器
//! - **interrupt**: 中断分类、决策收集、恢复命令编码
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 对话历史
//! - **runner**: 运行器接口、ReAct 运行器、检查点
//! - **tools**: 工具描述、本地注册表、Arcade 后端与执行器
//! - **ui**: 行式控制台

pub mod auth;
pub mod config;
pub mod core;
pub mod interrupt;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod runner;
pub mod tools;
pub mod ui;

#[cfg(test)]
mod http_stub;
