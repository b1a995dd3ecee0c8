//! Arcade 工具平台客户端
//!
//! 同时实现 ToolProvider（列出工具）、ToolBackend（授权 / 执行）与 AuthorizationService（长轮询授权状态）。
//! 接口：
//! - GET  /v1/tools?toolkit=..&limit=..&user_id=..   列出工具组
//! - GET  /v1/tools/{name}?user_id=..                单个工具定义
//! - POST /v1/tools/authorize                        申请授权
//! - POST /v1/tools/execute                          执行工具
//! - GET  /v1/auth/status?id=..&wait=..              等待授权完成

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{AuthStatus, AuthorizationResponse, AuthorizationService};
use crate::config::ArcadeSection;
use crate::core::AgentError;
use crate::tools::{dedup_and_truncate, ToolBackend, ToolDescriptor, ToolProvider};

pub const ARCADE_BASE_URL: &str = "https://api.arcade.dev";

pub struct ArcadeClient {
    client: Client,
    base_url: String,
    api_key: String,
    auth_wait_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ListToolsResponse {
    #[serde(default)]
    items: Vec<ArcadeTool>,
}

#[derive(Debug, Deserialize)]
struct ArcadeTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    toolkit: Option<ArcadeToolkit>,
    #[serde(default)]
    input: Option<ArcadeInput>,
    #[serde(default)]
    requirements: Option<ArcadeRequirements>,
}

#[derive(Debug, Deserialize)]
struct ArcadeToolkit {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ArcadeInput {
    #[serde(default)]
    parameters: Vec<ArcadeParameter>,
}

#[derive(Debug, Deserialize)]
struct ArcadeParameter {
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    value_schema: Option<ArcadeValueSchema>,
}

#[derive(Debug, Deserialize)]
struct ArcadeValueSchema {
    val_type: String,
}

#[derive(Debug, Deserialize)]
struct ArcadeRequirements {
    #[serde(default)]
    authorization: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    output: Option<ExecuteOutput>,
}

#[derive(Debug, Deserialize)]
struct ExecuteOutput {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<ExecuteError>,
}

#[derive(Debug, Deserialize)]
struct ExecuteError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AuthStatusResponse {
    status: String,
}

impl ArcadeTool {
    fn into_descriptor(self) -> ToolDescriptor {
        let toolkit = self
            .toolkit
            .map(|t| t.name)
            .unwrap_or_else(|| "Arcade".to_string());
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for p in self.input.map(|i| i.parameters).unwrap_or_default() {
            let ty = p
                .value_schema
                .map(|v| json_type_of(&v.val_type))
                .unwrap_or("string");
            properties.insert(
                p.name.clone(),
                json!({"type": ty, "description": p.description.unwrap_or_default()}),
            );
            if p.required {
                required.push(Value::String(p.name));
            }
        }
        let requires_authorization = self
            .requirements
            .and_then(|r| r.authorization)
            .map(|a| !a.is_null())
            .unwrap_or(false);
        ToolDescriptor {
            name: format!("{}_{}", toolkit, self.name),
            qualified_name: format!("{}.{}", toolkit, self.name),
            description: self.description.unwrap_or_default(),
            toolkit,
            parameters: json!({"type": "object", "properties": properties, "required": required}),
            requires_authorization,
        }
    }
}

/// Arcade 的 val_type 映射到 JSON Schema type
fn json_type_of(val_type: &str) -> &'static str {
    match val_type {
        "integer" => "integer",
        "number" => "number",
        "boolean" => "boolean",
        "array" => "array",
        "json" => "object",
        _ => "string",
    }
}

/// 执行结果转为给 LLM 的观察文本
fn render_output(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

impl ArcadeClient {
    /// HTTP 客户端无法创建（如 TLS 后端初始化失败）时返回 Transport 错误
    pub fn new(
        base_url: &str,
        api_key: &str,
        request_timeout_secs: u64,
        auth_wait_secs: u64,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            // 长轮询授权状态时服务端最多挂起 auth_wait_secs，请求超时需留出余量
            .timeout(Duration::from_secs(request_timeout_secs.max(auth_wait_secs + 5)))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            auth_wait_secs,
        })
    }

    pub fn from_config(section: &ArcadeSection, api_key: &str) -> Result<Self, AgentError> {
        Self::new(
            section.base_url.as_deref().unwrap_or(ARCADE_BASE_URL),
            api_key,
            section.request_timeout_secs,
            section.auth_wait_secs,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AgentError> {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<T>().await?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, AgentError> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ToolProvider for ArcadeClient {
    async fn resolve(
        &self,
        identity: &str,
        groups: &[String],
        tools: &[String],
        limit: usize,
    ) -> Result<Vec<ToolDescriptor>, AgentError> {
        let mut found = Vec::new();
        for group in groups {
            let list: ListToolsResponse = self
                .get_json(
                    "/v1/tools",
                    &[
                        ("toolkit", group.clone()),
                        ("limit", limit.to_string()),
                        ("user_id", identity.to_string()),
                    ],
                )
                .await?;
            tracing::debug!(toolkit = %group, count = list.items.len(), "resolved toolkit");
            found.extend(list.items.into_iter().map(ArcadeTool::into_descriptor));
        }
        for name in tools {
            let tool: ArcadeTool = self
                .get_json(&format!("/v1/tools/{name}"), &[("user_id", identity.to_string())])
                .await?;
            found.push(tool.into_descriptor());
        }
        Ok(dedup_and_truncate(found, limit))
    }
}

#[async_trait]
impl ToolBackend for ArcadeClient {
    async fn authorize(
        &self,
        tool: &ToolDescriptor,
        identity: &str,
    ) -> Result<AuthorizationResponse, AgentError> {
        self.post_json(
            "/v1/tools/authorize",
            &json!({"tool_name": tool.qualified_name, "user_id": identity}),
        )
        .await
    }

    async fn execute(
        &self,
        tool: &ToolDescriptor,
        input: Value,
        identity: &str,
    ) -> Result<String, AgentError> {
        let resp: ExecuteResponse = self
            .post_json(
                "/v1/tools/execute",
                &json!({"tool_name": tool.qualified_name, "input": input, "user_id": identity}),
            )
            .await?;
        match resp.output {
            Some(ExecuteOutput { error: Some(err), .. }) => {
                Err(AgentError::ToolExecutionFailed(err.message))
            }
            Some(ExecuteOutput { value, .. }) => Ok(render_output(value)),
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl AuthorizationService for ArcadeClient {
    async fn wait_for_completion(&self, authorization_id: &str) -> Result<AuthStatus, AgentError> {
        loop {
            let resp: AuthStatusResponse = self
                .get_json(
                    "/v1/auth/status",
                    &[
                        ("id", authorization_id.to_string()),
                        ("wait", self.auth_wait_secs.to_string()),
                    ],
                )
                .await?;
            match resp.status.as_str() {
                "pending" => {
                    tracing::debug!(id = %authorization_id, "authorization still pending");
                    continue;
                }
                "completed" => return Ok(AuthStatus::Completed),
                other => return Ok(AuthStatus::Failed(format!("authorization {other}"))),
            }
        }
    }
}
