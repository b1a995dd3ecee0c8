//! 中断分类器
//!
//! 按载荷结构判断类型，先匹配先得：authorization_required → hitl_required → Unspecified。
//! 纯函数，无副作用；缺字段的授权载荷同样落入 Unspecified（按拒绝处理）。

use serde_json::Value;

use crate::auth::AuthorizationResponse;
use crate::interrupt::{Interrupt, InterruptKind, InterruptPayload};

const UNKNOWN_TOOL: &str = "unknown";

/// 对第 index 个载荷分类
pub fn classify(index: usize, payload: &InterruptPayload) -> Interrupt {
    let value = &payload.value;
    let kind = if truthy(value.get("authorization_required")) {
        match authorization_of(value) {
            Some(authorization) => InterruptKind::AuthorizationRequired {
                tool_name: tool_name_of(value),
                authorization,
            },
            None => {
                tracing::warn!(index, "authorization interrupt without id/url, treating as unspecified");
                InterruptKind::Unspecified
            }
        }
    } else if truthy(value.get("hitl_required")) {
        InterruptKind::ApprovalRequired {
            tool_name: tool_name_of(value),
            input: value.get("input").cloned().unwrap_or(Value::Null),
        }
    } else {
        InterruptKind::Unspecified
    };
    Interrupt { index, kind }
}

/// JSON 真值：false / null / 0 / "" / 缺失为假
fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn tool_name_of(value: &Value) -> String {
    value
        .get("tool_name")
        .and_then(|v| v.as_str())
        .unwrap_or(UNKNOWN_TOOL)
        .to_string()
}

fn authorization_of(value: &Value) -> Option<AuthorizationResponse> {
    let resp = value.get("authorization_response")?;
    let id = resp.get("id")?.as_str()?;
    let url = resp.get("url")?.as_str()?;
    Some(AuthorizationResponse {
        id: id.to_string(),
        url: url.to_string(),
        status: resp.get("status").and_then(|s| s.as_str()).map(String::from),
    })
}
