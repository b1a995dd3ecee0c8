//! 内存检查点：按会话 id 保存对话历史与挂起状态
//!
//! 同一会话同一时刻只有一个活动轮次访问检查点；RwLock 仅保证 store 本身可跨任务共享。

use std::collections::HashMap;

use serde_json::json;
use tokio::sync::RwLock;

use crate::auth::AuthorizationResponse;
use crate::interrupt::InterruptPayload;
use crate::memory::ConversationMemory;
use crate::runner::ToolCall;

/// 工具调用在执行前的闸门
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// 可直接执行
    Open,
    /// 工具不在目录中，回写错误观察
    Unknown,
    /// 等待外部授权
    Authorization(AuthorizationResponse),
    /// 等待人工批准
    Approval,
}

impl Gate {
    /// 需要决策的闸门才产生中断
    pub fn is_gated(&self) -> bool {
        matches!(self, Gate::Authorization(_) | Gate::Approval)
    }

    pub fn interrupt_payload(&self, call: &ToolCall) -> Option<InterruptPayload> {
        match self {
            Gate::Authorization(resp) => Some(InterruptPayload::new(json!({
                "authorization_required": true,
                "tool_name": call.tool,
                "authorization_response": resp,
            }))),
            Gate::Approval => Some(InterruptPayload::new(json!({
                "hitl_required": true,
                "tool_name": call.tool,
                "input": call.args,
            }))),
            Gate::Open | Gate::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub call: ToolCall,
    pub gate: Gate,
}

/// 挂起点：一步中的全部工具调用（含无需决策的），恢复时按原顺序执行
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSuspension {
    pub calls: Vec<PendingCall>,
    /// 挂起时已走的步数（恢复后继续计数）
    pub step: usize,
}

impl PendingSuspension {
    pub fn gated_count(&self) -> usize {
        self.calls.iter().filter(|c| c.gate.is_gated()).count()
    }

    /// 与 gated 调用一一对应、同序的中断载荷
    pub fn interrupts(&self) -> Vec<InterruptPayload> {
        self.calls
            .iter()
            .filter_map(|c| c.gate.interrupt_payload(&c.call))
            .collect()
    }
}

/// 单个会话的检查点
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    pub conversation: ConversationMemory,
    pub pending: Option<PendingSuspension>,
}

/// 检查点存储（进程内，不持久化）
#[derive(Debug, Default)]
pub struct CheckpointStore {
    threads: RwLock<HashMap<String, Checkpoint>>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取会话检查点，不存在时返回空检查点
    pub async fn load(&self, thread_id: &str) -> Checkpoint {
        self.threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn save(&self, thread_id: &str, checkpoint: Checkpoint) {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), checkpoint);
    }

    pub async fn has_pending(&self, thread_id: &str) -> bool {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(|c| c.pending.is_some())
            .unwrap_or(false)
    }
}
