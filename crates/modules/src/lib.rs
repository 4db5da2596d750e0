//! Module descriptors: discovery, frontmatter parsing, and validation.
//!
//! A module is a directory holding `skills/<name>/SKILL.md`, `commands/*.md`,
//! `agents/*.md`, an optional `mcps.json` sidecar and an optional `AGENTS.md`
//! instructions file. The content may live at the root or under `module/`
//! (or `lola-module/`).

pub mod error;
pub mod frontmatter;
pub mod module;
pub mod name;
pub mod scaffold;
pub mod source;
pub mod validate;

pub use {
    error::{Error, Result},
    module::{INSTRUCTIONS_FILE, Module},
    name::validate_module_name,
    scaffold::{ScaffoldOptions, init_module, scaffold_module},
    source::{SourceInfo, SourceKind},
    validate::{AgentModel, ValidationReport},
};
