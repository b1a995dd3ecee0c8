//! 交互界面：行式控制台（stdin / stdout），测试用脚本控制台

pub mod console;

pub use console::{Console, ScriptedConsole, StdioConsole, Tone};
