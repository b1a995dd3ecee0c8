//! 工具调用 JSON Schema 生成（schemars）
//!
//! 将「合法 tool call」的 JSON 结构与可用工具清单注入 system prompt，减少 LLM 输出格式错误。

use schemars::{schema_for, JsonSchema};
use std::collections::HashMap;

use crate::tools::ToolDescriptor;

/// 工具调用请求格式：与运行器解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，取自 Available tools 列表
    pub tool: String,
    /// 工具参数，键为参数名
    pub args: HashMap<String, serde_json::Value>,
}

/// 返回工具调用的 JSON Schema 字符串
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

/// 渲染 prompt 中的 Available tools 段落：名称、描述、参数 schema
pub fn render_tool_catalog(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return "No tools are available. Answer directly.".to_string();
    }
    let mut out = String::from("Available tools:\n");
    for t in tools {
        out.push_str(&format!(
            "- {}: {}\n  parameters: {}\n",
            t.name, t.description, t.parameters
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mentions_fields() {
        let schema = tool_call_schema_json();
        assert!(schema.contains("\"tool\""));
        assert!(schema.contains("\"args\""));
    }

    #[test]
    fn test_render_empty_catalog() {
        assert!(render_tool_catalog(&[]).contains("No tools"));
    }
}
