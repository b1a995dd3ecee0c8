//! 轮次编排器：驱动一次用户输入的完整挂起 / 恢复循环
//!
//! 每个 Pass：按序消费运行器更新，消息立即输出，中断按发出顺序累积；
//! Pass 结束时若无中断则轮次完成，否则分类 → 逐个收集决策 → 编码恢复命令 → 作为下一次 Pass 的输入。
//! 恢复次数不设上限，由运行器最终给出无中断的 Pass 结束。

use std::sync::Arc;

use futures_util::StreamExt;

use crate::core::{AgentError, TurnPhase, TurnReport};
use crate::interrupt::{classify, encode, DecisionCollector, InterruptPayload};
use crate::runner::{AgentRunner, AgentUpdate, RunConfig, RunInput};
use crate::ui::{Console, Tone};

pub struct TurnOrchestrator {
    runner: Arc<dyn AgentRunner>,
    collector: DecisionCollector,
}

impl TurnOrchestrator {
    pub fn new(runner: Arc<dyn AgentRunner>, collector: DecisionCollector) -> Self {
        Self { runner, collector }
    }

    /// 执行一个轮次，直到某次 Pass 不再产生中断；运行器任何错误使本轮失败并原样返回
    pub async fn run_turn(
        &self,
        config: &RunConfig,
        console: &mut dyn Console,
        user_input: &str,
    ) -> Result<TurnReport, AgentError> {
        tracing::info!(thread = %config.thread_id, "turn started");
        let mut phase = TurnPhase::Streaming(RunInput::Message(user_input.to_string()));
        let mut passes = 0;
        let mut resumes = 0;
        let mut interrupts = 0;

        while !phase.is_terminal() {
            tracing::debug!(thread = %config.thread_id, phase = %phase, "turn phase");
            phase = match phase {
                TurnPhase::Streaming(input) => {
                    passes += 1;
                    match self.stream_pass(input, config, console).await {
                        Ok(payloads) if payloads.is_empty() => TurnPhase::Done,
                        Ok(payloads) => {
                            interrupts += payloads.len();
                            TurnPhase::AwaitingDecisions(
                                payloads
                                    .iter()
                                    .enumerate()
                                    .map(|(i, p)| classify(i, p))
                                    .collect(),
                            )
                        }
                        Err(e) => {
                            tracing::debug!(thread = %config.thread_id, phase = %TurnPhase::Failed, "turn phase");
                            tracing::warn!(thread = %config.thread_id, passes, "turn failed: {}", e);
                            return Err(e);
                        }
                    }
                }
                TurnPhase::AwaitingDecisions(pending) => {
                    TurnPhase::Resuming(self.collector.collect_all(&pending, console).await)
                }
                TurnPhase::Resuming(decisions) => {
                    resumes += 1;
                    TurnPhase::Streaming(RunInput::Resume(encode(decisions)))
                }
                terminal => terminal,
            };
        }

        tracing::info!(thread = %config.thread_id, passes, resumes, "turn finished");
        Ok(TurnReport {
            passes,
            resumes,
            interrupts,
            phase,
        })
    }

    /// 消费一次 Pass 的更新流，返回按发出顺序累积的中断
    async fn stream_pass(
        &self,
        input: RunInput,
        config: &RunConfig,
        console: &mut dyn Console,
    ) -> Result<Vec<InterruptPayload>, AgentError> {
        let mut updates = match input {
            RunInput::Resume(command) => self.runner.resume(command, config).await?,
            message => self.runner.stream(message, config).await?,
        };
        let mut pending = Vec::new();
        while let Some(update) = updates.next().await {
            match update? {
                AgentUpdate::Messages(messages) => {
                    for m in messages {
                        console.write(Tone::Agent, &format!("🤖: {}", m.formatted()));
                    }
                }
                AgentUpdate::Interrupts(list) => pending.extend(list),
            }
        }
        Ok(pending)
    }
}
