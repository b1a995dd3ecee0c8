//! 脚本运行器（测试替身）
//!
//! 每次 stream 弹出一个预置 Pass：若干更新、可选的流中错误，或直接启动失败；并记录每次调用的输入。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use crate::core::AgentError;
use crate::runner::{AgentRunner, AgentUpdate, RunConfig, RunInput, UpdateStream};

#[derive(Debug)]
enum ScriptedPass {
    Updates {
        updates: Vec<AgentUpdate>,
        error: Option<String>,
    },
    FailToStart(String),
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    passes: Mutex<VecDeque<ScriptedPass>>,
    calls: Mutex<Vec<(RunInput, String)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个正常结束的 Pass
    pub fn push_pass(&self, updates: Vec<AgentUpdate>) -> &Self {
        self.push(ScriptedPass::Updates { updates, error: None })
    }

    /// 追加一个在给定更新之后以 LLM 错误中断的 Pass
    pub fn push_failing_pass(&self, updates: Vec<AgentUpdate>, error: impl Into<String>) -> &Self {
        self.push(ScriptedPass::Updates {
            updates,
            error: Some(error.into()),
        })
    }

    /// 追加一次启动失败
    pub fn push_start_failure(&self, error: impl Into<String>) -> &Self {
        self.push(ScriptedPass::FailToStart(error.into()))
    }

    fn push(&self, pass: ScriptedPass) -> &Self {
        if let Ok(mut q) = self.passes.lock() {
            q.push_back(pass);
        }
        self
    }

    /// 收到的 (输入, thread_id)，按调用顺序
    pub fn calls(&self) -> Vec<(RunInput, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.passes.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn stream(&self, input: RunInput, config: &RunConfig) -> Result<UpdateStream, AgentError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((input, config.thread_id.clone()));
        }
        let pass = self.passes.lock().ok().and_then(|mut q| q.pop_front());
        match pass {
            Some(ScriptedPass::Updates { updates, error }) => {
                let items = updates
                    .into_iter()
                    .map(Ok)
                    .chain(error.map(|e| Err(AgentError::LlmError(e))));
                Ok(Box::pin(stream::iter(items.collect::<Vec<_>>())))
            }
            Some(ScriptedPass::FailToStart(e)) => Err(AgentError::Transport(e)),
            None => Err(AgentError::Transport("no scripted pass left".into())),
        }
    }
}
