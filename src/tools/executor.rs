//! 工具执行器
//!
//! 持有 ToolBackend 与全局超时，execute 在超时内调用后端，
//! 超时转为 AgentError::ToolTimeout；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::auth::AuthorizationResponse;
use crate::core::AgentError;
use crate::tools::{ToolBackend, ToolDescriptor};

/// 工具执行器：对每次调用施加超时，并记录审计日志
#[derive(Clone)]
pub struct ToolExecutor {
    backend: Arc<dyn ToolBackend>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(backend: Arc<dyn ToolBackend>, timeout_secs: u64) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub async fn authorize(
        &self,
        tool: &ToolDescriptor,
        identity: &str,
    ) -> Result<AuthorizationResponse, AgentError> {
        match timeout(self.timeout, self.backend.authorize(tool, identity)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::ToolTimeout(format!("authorize {}", tool.name))),
        }
    }

    /// 执行指定工具；超时返回 ToolTimeout；输出 JSON 审计日志
    pub async fn execute(
        &self,
        tool: &ToolDescriptor,
        args: serde_json::Value,
        identity: &str,
    ) -> Result<String, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, self.backend.execute(tool, args, identity)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool.name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(r) => r,
            Err(_) => Err(AgentError::ToolTimeout(tool.name.clone())),
        }
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct SlowBackend;

    #[async_trait]
    impl ToolBackend for SlowBackend {
        async fn authorize(
            &self,
            _tool: &ToolDescriptor,
            _identity: &str,
        ) -> Result<AuthorizationResponse, AgentError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(AgentError::Authorization("unreachable".into()))
        }

        async fn execute(
            &self,
            _tool: &ToolDescriptor,
            input: Value,
            _identity: &str,
        ) -> Result<String, AgentError> {
            if input.get("slow").is_some() {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok("done".into())
        }
    }

    fn tool() -> ToolDescriptor {
        ToolDescriptor {
            name: "slow".into(),
            qualified_name: "slow".into(),
            description: String::new(),
            toolkit: "T".into(),
            parameters: json!({}),
            requires_authorization: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_timeout() {
        let executor = ToolExecutor::new(Arc::new(SlowBackend), 1);
        let err = executor.execute(&tool(), json!({"slow": true}), "u").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(name) if name == "slow"));
        assert_eq!(executor.execute(&tool(), json!({}), "u").await.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_authorize_timeout() {
        let executor = ToolExecutor::new(Arc::new(SlowBackend), 1);
        assert!(matches!(
            executor.authorize(&tool(), "u").await,
            Err(AgentError::ToolTimeout(_))
        ));
    }

    #[test]
    fn test_args_preview_truncates() {
        let long = json!({"text": "x".repeat(500)});
        assert!(args_preview(&long).ends_with("..."));
        assert_eq!(args_preview(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
