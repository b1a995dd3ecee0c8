//! 行式交互界面
//!
//! Console 抽象一次读一行、写一行；StdioConsole 用 tokio stdin + LinesCodec 读取，crossterm 着色输出；
//! ScriptedConsole 预置输入并记录全部输出，供测试驱动会话。

use std::collections::VecDeque;
use std::io::{self, Write};

use async_trait::async_trait;
use crossterm::style::Stylize;
use futures_util::StreamExt;
use tokio::io::Stdin;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// 输出语气（决定颜色）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    /// 智能体流式消息
    Agent,
    /// 授权 / 审批等系统提示
    Notice,
    Success,
    Error,
}

/// 交互界面：read_line 返回 None 表示输入已关闭
#[async_trait]
pub trait Console: Send {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn write(&mut self, tone: Tone, line: &str);

    fn write_line(&mut self, line: &str) {
        self.write(Tone::Plain, line);
    }
}

/// 标准输入输出
pub struct StdioConsole {
    lines: FramedRead<Stdin, LinesCodec>,
}

impl StdioConsole {
    pub fn new() -> Self {
        Self {
            lines: FramedRead::new(tokio::io::stdin(), LinesCodec::new()),
        }
    }
}

impl Default for StdioConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdioConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut out = io::stdout();
        write!(out, "{prompt}")?;
        out.flush()?;
        match self.lines.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(LinesCodecError::Io(e))) => Err(e),
            Some(Err(e)) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }

    fn write(&mut self, tone: Tone, line: &str) {
        let styled = match tone {
            Tone::Plain | Tone::Agent => line.to_string(),
            Tone::Notice => line.yellow().to_string(),
            Tone::Success => line.green().to_string(),
            Tone::Error => line.red().to_string(),
        };
        if let Err(e) = writeln!(io::stdout(), "{styled}") {
            tracing::warn!("stdout write failed: {}", e);
        }
    }
}

/// 脚本化界面：按序返回预置输入，记录提示与输出
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<(Tone, String)>,
}

impl ScriptedConsole {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// 所有输出行（不含颜色）
    pub fn lines(&self) -> Vec<&str> {
        self.output.iter().map(|(_, l)| l.as_str()).collect()
    }

    pub fn lines_with_tone(&self, tone: Tone) -> Vec<&str> {
        self.output
            .iter()
            .filter(|(t, _)| *t == tone)
            .map(|(_, l)| l.as_str())
            .collect()
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// 剩余未消费的输入行数
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.output.iter().any(|(_, l)| l.contains(needle))
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.input.pop_front())
    }

    fn write(&mut self, tone: Tone, line: &str) {
        self.output.push((tone, line.to_string()));
    }
}
