//! 本地工具注册表
//!
//! 所有本地工具实现 Tool trait（name / description / execute），由 ToolRegistry 按名注册与查找；
//! 没有配置 Arcade 时，LocalToolProvider 用它作为工具来源。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::ToolDescriptor;

/// 本地工具所属工具组名
pub const LOCAL_TOOLKIT: &str = "Local";

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 参数 JSON Schema，默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 工具注册表：按名称有序存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String, String> {
        let tool = self.tools.get(name).ok_or_else(|| format!("Unknown tool: {name}"))?;
        tool.execute(args).await
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// 所有工具的描述（本地工具不需要授权）
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|(name, tool)| ToolDescriptor {
                name: name.clone(),
                qualified_name: name.clone(),
                description: tool.description().to_string(),
                toolkit: LOCAL_TOOLKIT.to_string(),
                parameters: tool.parameters_schema(),
                requires_authorization: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::EchoTool;

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert_eq!(registry.tool_names(), vec!["echo".to_string()]);
        let out = registry.execute("echo", serde_json::json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, "hi");
        assert!(registry.execute("nope", Value::Null).await.is_err());
    }

    #[test]
    fn test_descriptors_are_local() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let d = &registry.descriptors()[0];
        assert_eq!(d.toolkit, LOCAL_TOOLKIT);
        assert!(!d.requires_authorization);
        assert_eq!(d.parameters["required"][0], "text");
    }
}
