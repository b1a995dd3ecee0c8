//! 中断协议：分类（classifier）、决策收集（collector）、恢复命令编码（resume）
//!
//! 运行器在一次 Pass 中挂起时发出若干 InterruptPayload；编排器按发出顺序分类、逐个收集决策，
//! 再编码为 ResumeCommand 交回运行器。决策 i 必须对应中断 i。

pub mod classifier;
pub mod collector;
pub mod resume;

use serde::{Deserialize, Serialize};

use crate::auth::AuthorizationResponse;

pub use classifier::classify;
pub use collector::DecisionCollector;
pub use resume::{encode, ResumeCommand, ResumeValue};

/// 运行器发出的原始挂起载荷（结构不透明，至少带 value 对象）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptPayload {
    pub value: serde_json::Value,
}

impl InterruptPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }
}

/// 分类后的中断：发出顺序中的位置 + 类型
#[derive(Debug, Clone, PartialEq)]
pub struct Interrupt {
    pub index: usize,
    pub kind: InterruptKind,
}

/// 中断类型，只有这三种；新增类型须同时扩展此枚举与 classify
#[derive(Debug, Clone, PartialEq)]
pub enum InterruptKind {
    /// 需要用户在外部授权服务完成授权
    AuthorizationRequired {
        tool_name: String,
        authorization: AuthorizationResponse,
    },
    /// 需要操作者直接批准（human-in-the-loop）
    ApprovalRequired {
        tool_name: String,
        input: serde_json::Value,
    },
    /// 无法识别，按拒绝处理
    Unspecified,
}

impl Interrupt {
    pub fn tool_name(&self) -> Option<&str> {
        match &self.kind {
            InterruptKind::AuthorizationRequired { tool_name, .. }
            | InterruptKind::ApprovalRequired { tool_name, .. } => Some(tool_name),
            InterruptKind::Unspecified => None,
        }
    }
}

/// 单个中断的决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub authorized: bool,
}

impl Decision {
    pub fn allow() -> Self {
        Self { authorized: true }
    }

    pub fn deny() -> Self {
        Self { authorized: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_wire_shape_is_value_only() {
        let payload = InterruptPayload::new(json!({"hitl_required": true}));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"value": {"hitl_required": true}})
        );
        let parsed: InterruptPayload =
            serde_json::from_value(json!({"id": "ignored", "value": {"tool_name": "X"}})).unwrap();
        assert_eq!(parsed.value["tool_name"], "X");
    }
}
