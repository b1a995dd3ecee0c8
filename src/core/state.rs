//! 轮次状态机
//!
//! Streaming(input) → AwaitingDecisions(interrupts) → Resuming(decisions) → Streaming(resume) … → Done；
//! 任一运行器错误 → Failed。每个状态携带进入下一状态所需的数据。

use std::fmt;

use crate::interrupt::{Decision, Interrupt};
use crate::runner::RunInput;

/// 一个轮次（Turn）所处的阶段
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPhase {
    /// 正在消费一次 Pass 的更新流
    Streaming(RunInput),
    /// Pass 结束且带有中断，等待逐个决策
    AwaitingDecisions(Vec<Interrupt>),
    /// 决策已收集，准备提交恢复命令
    Resuming(Vec<Decision>),
    Done,
    Failed,
}

impl TurnPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnPhase::Done | TurnPhase::Failed)
    }

    /// 日志用的短名
    pub fn name(&self) -> &'static str {
        match self {
            TurnPhase::Streaming(RunInput::Message(_)) => "streaming",
            TurnPhase::Streaming(RunInput::Resume(_)) => "streaming(resume)",
            TurnPhase::AwaitingDecisions(_) => "awaiting_decisions",
            TurnPhase::Resuming(_) => "resuming",
            TurnPhase::Done => "done",
            TurnPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 轮次结束后的统计
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// 流式 Pass 次数（首次 + 每次恢复）
    pub passes: usize,
    /// 提交的恢复命令数
    pub resumes: usize,
    /// 收到的中断总数
    pub interrupts: usize,
    pub phase: TurnPhase,
}
