//! 决策收集器
//!
//! 每个分类后的中断产出恰好一个 Decision：
//! - 授权型：展示 URL，阻塞等待授权服务完成；失败或报错记为拒绝，不中止本轮
//! - 审批型：展示工具名与参数，阻塞等待操作者 y/n
//! - 未识别：直接拒绝，不做任何 I/O
//!
//! 多个中断严格按发出顺序逐个处理。

use std::sync::Arc;

use crate::auth::{AuthStatus, AuthorizationService};
use crate::interrupt::{Decision, Interrupt, InterruptKind};
use crate::ui::{Console, Tone};

const APPROVAL_PROMPT: &str = "Do you approve this tool call? (y/n) ";

/// 决策收集器：持有授权服务
#[derive(Clone)]
pub struct DecisionCollector {
    auth: Arc<dyn AuthorizationService>,
}

impl DecisionCollector {
    pub fn new(auth: Arc<dyn AuthorizationService>) -> Self {
        Self { auth }
    }

    /// 按顺序为每个中断收集决策，返回与输入等长、同序的列表
    pub async fn collect_all(
        &self,
        interrupts: &[Interrupt],
        console: &mut dyn Console,
    ) -> Vec<Decision> {
        let mut decisions = Vec::with_capacity(interrupts.len());
        for interrupt in interrupts {
            decisions.push(self.collect(interrupt, console).await);
        }
        decisions
    }

    pub async fn collect(&self, interrupt: &Interrupt, console: &mut dyn Console) -> Decision {
        match &interrupt.kind {
            InterruptKind::AuthorizationRequired {
                tool_name,
                authorization,
            } => {
                console.write(
                    Tone::Notice,
                    &format!("⚙️: Authorization required for tool call {tool_name}"),
                );
                console.write(
                    Tone::Notice,
                    &format!("⚙️: Please authorize in your browser {}", authorization.url),
                );
                console.write(
                    Tone::Notice,
                    &format!(
                        "⚙️: Waiting for you to complete authorization ({})...",
                        authorization.id
                    ),
                );
                match self.auth.wait_for_completion(&authorization.id).await {
                    Ok(AuthStatus::Completed) => {
                        tracing::info!(tool = %tool_name, id = %authorization.id, "authorization completed");
                        console.write(Tone::Success, "⚙️: Authorization granted. Resuming execution...");
                        Decision::allow()
                    }
                    Ok(AuthStatus::Failed(reason)) => {
                        tracing::error!(tool = %tool_name, id = %authorization.id, "authorization failed: {}", reason);
                        console.write(
                            Tone::Error,
                            &format!("⚙️: Authorization failed: {reason}"),
                        );
                        Decision::deny()
                    }
                    Err(e) => {
                        tracing::error!(tool = %tool_name, id = %authorization.id, "error waiting for authorization: {}", e);
                        console.write(
                            Tone::Error,
                            &format!("⚙️: Error waiting for authorization to complete: {e}"),
                        );
                        Decision::deny()
                    }
                }
            }
            InterruptKind::ApprovalRequired { tool_name, input } => {
                console.write(
                    Tone::Notice,
                    &format!("⚙️: Human in the loop required for tool call {tool_name}"),
                );
                let rendered = serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
                console.write(
                    Tone::Notice,
                    &format!("⚙️: Please approve the tool call {rendered}"),
                );
                let authorized = confirm(console).await;
                tracing::info!(tool = %tool_name, authorized, "approval decision");
                Decision { authorized }
            }
            InterruptKind::Unspecified => {
                tracing::warn!(index = interrupt.index, "unspecified interrupt, denying");
                Decision::deny()
            }
        }
    }
}

/// 询问 y/n；无法识别时重问，输入关闭或读取失败按拒绝
async fn confirm(console: &mut dyn Console) -> bool {
    loop {
        match console.read_line(APPROVAL_PROMPT).await {
            Ok(Some(answer)) => match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => console.write(Tone::Notice, "Please answer 'y' or 'n'."),
            },
            Ok(None) => return false,
            Err(e) => {
                tracing::error!("failed to read approval: {}", e);
                return false;
            }
        }
    }
}
