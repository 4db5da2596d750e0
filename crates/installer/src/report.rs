//! Outcomes handed back to the CLI for display.

use std::path::PathBuf;

use lola_targets::{Assistant, Scope};

use crate::registry::{Installation, ItemKind};

/// One item that could not be generated or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub kind: ItemKind,
    pub name: String,
    pub reason: String,
}

/// What happened for one module in one (assistant, scope, project) slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub module: String,
    pub assistant: Assistant,
    pub scope: Scope,
    pub project_path: Option<PathBuf>,
    pub skills: Vec<String>,
    pub commands: Vec<String>,
    pub agents: Vec<String>,
    pub mcps: Vec<String>,
    pub instructions: bool,
    /// Items from the previous installation that are no longer declared.
    pub orphans_removed: Vec<(ItemKind, String)>,
    pub failures: Vec<ItemFailure>,
    /// Content skipped because the assistant cannot take it here.
    pub skipped: Vec<String>,
    /// Whether an installation record exists for the slot afterwards.
    pub recorded: bool,
}

impl TargetReport {
    pub(crate) fn for_slot(slot: &Installation) -> Self {
        Self {
            module: slot.module.clone(),
            assistant: slot.assistant,
            scope: slot.scope,
            project_path: slot.project_path.clone(),
            skills: Vec::new(),
            commands: Vec::new(),
            agents: Vec::new(),
            mcps: Vec::new(),
            instructions: false,
            orphans_removed: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            recorded: false,
        }
    }

    pub(crate) fn fail(&mut self, kind: ItemKind, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(
            module = %self.module,
            assistant = %self.assistant,
            kind = %kind,
            item = name,
            reason = %reason,
            "item not installed"
        );
        self.failures.push(ItemFailure {
            kind,
            name: name.to_string(),
            reason,
        });
    }

    pub fn installed_count(&self) -> usize {
        self.skills.len()
            + self.commands.len()
            + self.agents.len()
            + self.mcps.len()
            + usize::from(self.instructions)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub module: String,
    /// Non-fatal validation findings.
    pub warnings: Vec<String>,
    pub targets: Vec<TargetReport>,
}

impl InstallReport {
    pub fn failure_count(&self) -> usize {
        self.targets.iter().map(|t| t.failures.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: Vec<TargetReport>,
    /// Records whose project directory no longer exists. Left in place.
    pub stale: Vec<Installation>,
    /// Modules whose update was skipped, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl UpdateReport {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.stale.is_empty() && self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    pub removed: Vec<Installation>,
    /// Generated files, sections and MCP entries actually deleted.
    pub artifacts_removed: usize,
    pub failures: Vec<ItemFailure>,
}

impl UninstallReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}
