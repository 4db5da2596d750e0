//! Assistant adapters: where each assistant expects skills, commands, agents,
//! instructions and MCP servers, and how module content is rendered for it.

pub mod assistant;
pub mod claude;
pub mod convert;
pub mod cursor;
pub mod error;
pub mod gemini;
pub mod managed;
pub mod mcp;
pub mod opencode;
pub mod target;

pub use {
    assistant::{Assistant, Root, Scope},
    error::{Error, Result},
    managed::SkillEntry,
    target::{Target, copy_dir, remove_path},
};
