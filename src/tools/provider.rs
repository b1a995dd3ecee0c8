//! 工具提供方与工具后端
//!
//! ToolProvider::resolve 按身份把「工具组 + 单独点名的工具」解析为有上限的工具描述列表；
//! ToolBackend 负责对单个工具发起授权与执行。Arcade（远程）与本地注册表各实现一份。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthorizationResponse;
use crate::core::AgentError;

/// 可调用工具的描述（供 LLM 理解与运行器路由）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// 暴露给 LLM 的名称，如 GoogleJobs_SearchJobs
    pub name: String,
    /// 后端调用用的全名，如 GoogleJobs.SearchJobs
    pub qualified_name: String,
    pub description: String,
    pub toolkit: String,
    /// 参数 JSON Schema
    pub parameters: Value,
    /// 执行前是否需要用户授权
    pub requires_authorization: bool,
}

#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// 解析工具组与单独工具，结果不超过 limit（多出的直接截断，不报错）
    async fn resolve(
        &self,
        identity: &str,
        groups: &[String],
        tools: &[String],
        limit: usize,
    ) -> Result<Vec<ToolDescriptor>, AgentError>;
}

#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// 为 identity 申请使用该工具的授权；status 为 completed 表示已授权
    async fn authorize(
        &self,
        tool: &ToolDescriptor,
        identity: &str,
    ) -> Result<AuthorizationResponse, AgentError>;

    async fn execute(
        &self,
        tool: &ToolDescriptor,
        input: Value,
        identity: &str,
    ) -> Result<String, AgentError>;
}

/// 按名称去重（保留先出现者）并截断到 limit
pub fn dedup_and_truncate(tools: Vec<ToolDescriptor>, limit: usize) -> Vec<ToolDescriptor> {
    let mut seen = std::collections::HashSet::new();
    tools
        .into_iter()
        .filter(|t| seen.insert(t.name.clone()))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            qualified_name: name.into(),
            description: String::new(),
            toolkit: "T".into(),
            parameters: serde_json::json!({}),
            requires_authorization: false,
        }
    }

    #[test]
    fn test_dedup_and_truncate() {
        let out = dedup_and_truncate(vec![tool("a"), tool("b"), tool("a"), tool("c")], 2);
        let names: Vec<_> = out.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(dedup_and_truncate(vec![tool("a")], 0).is_empty());
    }
}
