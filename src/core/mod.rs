//! 核心编排层：错误、轮次状态机、轮次编排器、会话主循环与构建器

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod state;

pub use builder::{AgentBuilder, ToolStack};
pub use error::AgentError;
pub use orchestrator::TurnOrchestrator;
pub use session::{Session, SessionKey};
pub use state::{TurnPhase, TurnReport};
