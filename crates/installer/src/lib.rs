//! Installation registry and the install/update/uninstall engine.
//!
//! The registry (`installed.yml`) remembers which final item names each
//! module got in each (assistant, scope, project) slot. The engine diffs
//! that against the module's current content and drives the assistant
//! adapters from `lola-targets` to converge the generated files.

pub mod engine;
pub mod error;
pub mod naming;
pub mod registry;
pub mod report;
pub mod staging;

pub use {
    engine::Installer,
    error::{Error, Result},
    registry::{InstallFilter, Installation, InstallationRegistry, ItemKind},
    report::{InstallReport, ItemFailure, TargetReport, UninstallReport, UpdateReport},
};
