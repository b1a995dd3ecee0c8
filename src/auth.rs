//! 授权服务边界
//!
//! 工具需要外部授权（OAuth 等）时，运行器抛出带 AuthorizationResponse 的中断；
//! DecisionCollector 通过 AuthorizationService::wait_for_completion 阻塞等待用户在浏览器中完成授权。

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 授权请求的响应：授权 id、用户访问的 URL、当前状态（pending / completed / failed）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl AuthorizationResponse {
    /// 授权已完成（无需用户再操作）
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("completed")
    }
}

/// 授权等待的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Completed,
    Failed(String),
}

/// 授权服务：按授权 id 等待完成，无超时（由服务端长轮询决定节奏）
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn wait_for_completion(&self, authorization_id: &str) -> Result<AuthStatus, AgentError>;
}

/// 固定结果的授权服务：本地模式下直接视为已授权，测试中可模拟失败 / 报错
#[derive(Debug)]
pub struct StaticAuthorizer {
    outcome: Result<AuthStatus, String>,
    awaited: Mutex<Vec<String>>,
}

impl StaticAuthorizer {
    pub fn granting() -> Self {
        Self::with_outcome(Ok(AuthStatus::Completed))
    }

    pub fn denying(reason: impl Into<String>) -> Self {
        Self::with_outcome(Ok(AuthStatus::Failed(reason.into())))
    }

    /// wait_for_completion 返回 Err（模拟网络故障）
    pub fn erroring(message: impl Into<String>) -> Self {
        Self::with_outcome(Err(message.into()))
    }

    fn with_outcome(outcome: Result<AuthStatus, String>) -> Self {
        Self {
            outcome,
            awaited: Mutex::new(Vec::new()),
        }
    }

    /// 已等待过的授权 id（按调用顺序）
    pub fn awaited(&self) -> Vec<String> {
        self.awaited
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuthorizationService for StaticAuthorizer {
    async fn wait_for_completion(&self, authorization_id: &str) -> Result<AuthStatus, AgentError> {
        if let Ok(mut ids) = self.awaited.lock() {
            ids.push(authorization_id.to_string());
        }
        self.outcome
            .clone()
            .map_err(AgentError::Authorization)
    }
}
