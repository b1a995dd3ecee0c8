//! 本地工具来源：未配置 ARCADE_API_KEY 时使用
//!
//! 工具组按名匹配（忽略大小写），单独点名的工具按工具名匹配；本地工具总是已授权。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::AuthorizationResponse;
use crate::core::AgentError;
use crate::tools::{dedup_and_truncate, ToolBackend, ToolDescriptor, ToolProvider, ToolRegistry};

pub struct LocalToolProvider {
    registry: Arc<ToolRegistry>,
}

impl LocalToolProvider {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

#[async_trait]
impl ToolProvider for LocalToolProvider {
    async fn resolve(
        &self,
        _identity: &str,
        groups: &[String],
        tools: &[String],
        limit: usize,
    ) -> Result<Vec<ToolDescriptor>, AgentError> {
        let all = self.registry.descriptors();
        let by_group = all
            .iter()
            .filter(|d| groups.iter().any(|g| g.eq_ignore_ascii_case(&d.toolkit)))
            .cloned();
        let by_name = all.iter().filter(|d| tools.contains(&d.name)).cloned();
        Ok(dedup_and_truncate(by_group.chain(by_name).collect(), limit))
    }
}

#[async_trait]
impl ToolBackend for LocalToolProvider {
    async fn authorize(
        &self,
        tool: &ToolDescriptor,
        identity: &str,
    ) -> Result<AuthorizationResponse, AgentError> {
        Ok(AuthorizationResponse {
            id: format!("local:{}:{}", identity, tool.name),
            url: String::new(),
            status: Some("completed".to_string()),
        })
    }

    async fn execute(
        &self,
        tool: &ToolDescriptor,
        input: Value,
        _identity: &str,
    ) -> Result<String, AgentError> {
        self.registry
            .execute(&tool.qualified_name, input)
            .await
            .map_err(AgentError::ToolExecutionFailed)
    }
}
