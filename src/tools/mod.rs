//! 工具层：工具描述与来源（本地注册表 / Arcade）、执行器、调用格式 schema

pub mod arcade;
pub mod echo;
pub mod executor;
pub mod local;
pub mod provider;
pub mod registry;
pub mod schema;

pub use arcade::ArcadeClient;
pub use echo::EchoTool;
pub use executor::ToolExecutor;
pub use local::LocalToolProvider;
pub use provider::{dedup_and_truncate, ToolBackend, ToolDescriptor, ToolProvider};
pub use registry::{Tool, ToolRegistry, LOCAL_TOOLKIT};
pub use schema::{render_tool_catalog, tool_call_schema_json};
