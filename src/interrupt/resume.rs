//! 恢复命令编码
//!
//! 运行器的恢复协议：只有一个中断时携带裸决策 `{"authorized": true}`，
//! 多个中断时携带与中断同序的决策数组。此不对称是协议约定，不能统一成数组。

use serde::{Deserialize, Serialize};

use crate::interrupt::Decision;

/// 恢复载荷：单个决策或有序决策列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResumeValue {
    Single(Decision),
    Many(Vec<Decision>),
}

/// 交回运行器、从挂起点继续执行的命令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeCommand {
    pub resume: ResumeValue,
}

impl ResumeCommand {
    /// 展开为有序决策列表（运行器按位置与挂起的中断配对）
    pub fn decisions(&self) -> Vec<Decision> {
        match &self.resume {
            ResumeValue::Single(d) => vec![*d],
            ResumeValue::Many(ds) => ds.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.resume {
            ResumeValue::Single(_) => 1,
            ResumeValue::Many(ds) => ds.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 将本次 Pass 的决策编码为恢复命令；恰好一个时不包数组
pub fn encode(mut decisions: Vec<Decision>) -> ResumeCommand {
    let resume = if decisions.len() == 1 {
        ResumeValue::Single(decisions.remove(0))
    } else {
        ResumeValue::Many(decisions)
    };
    ResumeCommand { resume }
}
