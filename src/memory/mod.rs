//! 记忆层：短期对话历史（按会话保存在运行器检查点中）

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
