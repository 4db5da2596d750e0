//! Install, update and uninstall.
//!
//! Every operation reconciles one module in one (assistant, scope, project)
//! slot: the module on disk is the desired state, the registry record is the
//! previous state. Items that disappeared are removed first, then everything
//! still declared is regenerated, then the record is replaced wholesale.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use {
    lola_config::{LolaHome, MCPS_FILE, SKILL_FILE},
    lola_modules::{INSTRUCTIONS_FILE, Module, validate_module_name},
    lola_targets::{Assistant, Root, Scope, SkillEntry, Target, remove_path},
};

use crate::{
    error::{Error, Result},
    naming::{holder, plan_names, prefixed},
    registry::{InstallFilter, Installation, InstallationRegistry, ItemKind},
    report::{InstallReport, ItemFailure, TargetReport, UninstallReport, UpdateReport},
    staging,
};

const SOURCE_MISSING: &str = "source file missing";

/// `(declared item, final installed name)` pairs for one item kind.
type Planned = Vec<(String, String)>;

/// The reconciliation engine. Owns the registry for the lifetime of one
/// CLI invocation.
pub struct Installer {
    home: LolaHome,
    user_home: PathBuf,
    registry: InstallationRegistry,
}

impl Installer {
    /// Open the registry under `home`. `user_home` anchors user-scope paths.
    pub fn new(home: LolaHome, user_home: impl Into<PathBuf>) -> Result<Self> {
        let registry = InstallationRegistry::load(home.installed_file())?;
        Ok(Self {
            home,
            user_home: user_home.into(),
            registry,
        })
    }

    pub fn home(&self) -> &LolaHome {
        &self.home
    }

    pub fn registry(&self) -> &InstallationRegistry {
        &self.registry
    }

    /// Scan a registered module. The name is checked before it touches a path.
    pub fn load_module(&self, name: &str) -> Result<Module> {
        validate_module_name(name)?;
        let dir = self.home.modules_dir().join(name);
        if !dir.is_dir() {
            return Err(Error::module_not_found(name));
        }
        Module::load(&dir).ok_or_else(|| Error::InvalidModule {
            name: name.to_string(),
        })
    }

    // ── Install ─────────────────────────────────────────────────────────────

    /// Install `name` for each assistant at `scope`.
    ///
    /// Validation errors abort before anything is written. Per-item failures
    /// are collected in the report.
    pub fn install(
        &mut self,
        name: &str,
        assistants: &[Assistant],
        scope: Scope,
        project_path: Option<&Path>,
    ) -> Result<InstallReport> {
        let module = self.load_module(name)?;
        let validation = module.validate_or_error()?;
        let root = Root::resolve(scope, project_path, &self.user_home)?;
        if let Some(project) = root.project_path()
            && !project.is_dir()
        {
            return Err(Error::project_not_found(project));
        }

        let staged = staging::staging_dir(&self.home, &root, &module.name);
        staging::stage(&module, &staged)?;

        let mut report = InstallReport {
            module: module.name.clone(),
            warnings: validation.warnings,
            targets: Vec::new(),
        };
        for &assistant in assistants {
            let slot = Installation::new(&module.name, assistant, &root);
            let previous = self.registry.get(&slot).cloned();
            let target = self.reconcile(&module, &staged, slot, &root, previous.as_ref())?;
            report.targets.push(target);
        }
        tracing::info!(
            module = %module.name,
            scope = %scope,
            targets = report.targets.len(),
            failures = report.failure_count(),
            "install finished"
        );
        Ok(report)
    }

    // ── Update ──────────────────────────────────────────────────────────────

    /// Re-apply the current module content to every matching installation.
    ///
    /// Stale project paths and modules that no longer load or validate are
    /// reported and left untouched; other modules still update.
    pub fn update(
        &mut self,
        module: Option<&str>,
        assistant: Option<Assistant>,
    ) -> Result<UpdateReport> {
        if let Some(name) = module {
            validate_module_name(name)?;
        }
        let filter = InstallFilter {
            module: module.map(str::to_string),
            assistant,
            ..InstallFilter::default()
        };
        let records: Vec<Installation> = self
            .registry
            .matching(&filter)
            .into_iter()
            .cloned()
            .collect();

        let mut report = UpdateReport::default();
        let mut modules: HashMap<String, Option<Module>> = HashMap::new();
        let mut staged: HashSet<PathBuf> = HashSet::new();

        for record in records {
            if record.is_stale() {
                tracing::warn!(
                    module = %record.module,
                    assistant = %record.assistant,
                    path = ?record.project_path,
                    "project path no longer exists, skipping"
                );
                report.stale.push(record);
                continue;
            }

            if !modules.contains_key(&record.module) {
                let loaded = match self.load_valid(&record.module) {
                    Ok(module) => Some(module),
                    Err(e) => {
                        tracing::warn!(module = %record.module, error = %e, "skipping module update");
                        report.skipped.push((record.module.clone(), e.to_string()));
                        None
                    },
                };
                modules.insert(record.module.clone(), loaded);
            }
            let Some(Some(module)) = modules.get(&record.module) else {
                continue;
            };

            match self.update_record(module, &record, &mut staged) {
                Ok(target) => report.updated.push(target),
                Err(e) => {
                    tracing::warn!(
                        module = %record.module,
                        assistant = %record.assistant,
                        error = %e,
                        "update failed"
                    );
                    report
                        .skipped
                        .push((record.module.clone(), format!("{}: {e}", record.assistant)));
                },
            }
        }
        tracing::info!(
            updated = report.updated.len(),
            stale = report.stale.len(),
            skipped = report.skipped.len(),
            "update finished"
        );
        Ok(report)
    }

    fn load_valid(&self, name: &str) -> Result<Module> {
        let module = self.load_module(name)?;
        module.validate_or_error()?;
        Ok(module)
    }

    fn update_record(
        &mut self,
        module: &Module,
        record: &Installation,
        staged: &mut HashSet<PathBuf>,
    ) -> Result<TargetReport> {
        let root = record.root(&self.user_home)?;
        let dest = staging::staging_dir(&self.home, &root, &module.name);
        if staged.insert(dest.clone()) {
            staging::stage(module, &dest)?;
        }
        let slot = Installation::new(&module.name, record.assistant, &root);
        self.reconcile(module, &dest, slot, &root, Some(record))
    }

    // ── Uninstall ───────────────────────────────────────────────────────────

    /// Records an uninstall with `filter` would affect.
    pub fn plan_uninstall(&self, filter: &InstallFilter) -> Vec<Installation> {
        self.registry
            .matching(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Remove every generated artifact of each matching record, then the
    /// record itself, then the staged copy once nothing else uses it.
    pub fn uninstall(&mut self, filter: &InstallFilter) -> Result<UninstallReport> {
        let mut report = UninstallReport::default();
        for record in self.plan_uninstall(filter) {
            let root = record.root(&self.user_home)?;
            remove_artifacts(&record, &root, &mut report);
            self.registry.remove_key(&record)?;

            let still_staged = self
                .registry
                .all()
                .iter()
                .any(|other| other.same_staging(&record));
            if !still_staged {
                staging::unstage(&staging::staging_dir(&self.home, &root, &record.module))?;
            }
            tracing::info!(
                module = %record.module,
                assistant = %record.assistant,
                scope = %record.scope,
                "uninstalled"
            );
            report.removed.push(record);
        }
        Ok(report)
    }

    /// Uninstall a module everywhere and delete it from the module registry.
    pub fn remove_module(&mut self, name: &str) -> Result<UninstallReport> {
        validate_module_name(name)?;
        let dir = self.home.modules_dir().join(name);
        if !dir.exists() && self.registry.find(name).is_empty() {
            return Err(Error::module_not_found(name));
        }
        let report = self.uninstall(&InstallFilter::module(name))?;
        remove_path(&dir)?;
        tracing::info!(module = name, "module removed");
        Ok(report)
    }

    // ── Reconciliation ──────────────────────────────────────────────────────

    fn plan(&self, slot: &Installation, kind: ItemKind, items: &[String]) -> Planned {
        plan_names(&self.registry, slot, kind, items)
    }

    fn reconcile(
        &mut self,
        module: &Module,
        staged: &Path,
        slot: Installation,
        root: &Root,
        previous: Option<&Installation>,
    ) -> Result<TargetReport> {
        let target = slot.assistant.target();
        let mut report = TargetReport::for_slot(&slot);

        let skills = if target.skills_allowed(root.scope()) {
            self.plan(&slot, ItemKind::Skill, &module.skills)
        } else {
            if !module.skills.is_empty() {
                report.skipped.push(format!(
                    "skills: {} does not support skills at {} scope",
                    slot.assistant, slot.scope
                ));
            }
            Vec::new()
        };
        let commands = self.plan(&slot, ItemKind::Command, &module.commands);
        let agents = if target.supports_agents() {
            self.plan(&slot, ItemKind::Agent, &module.agents)
        } else {
            if !module.agents.is_empty() {
                report
                    .skipped
                    .push(format!("agents: {} does not support agents", slot.assistant));
            }
            Vec::new()
        };

        if let Some(previous) = previous {
            remove_orphans(target, root, previous, &skills, &commands, &agents, &mut report)?;
        }

        generate_skills(target, module, staged, root, &skills, previous, &mut report)?;

        let command_dir = target.command_path(root);
        for (item, name) in &commands {
            let source = module.command_file_in(staged, item);
            let result = target.generate_command(&source, &command_dir, name);
            if generated(&mut report, ItemKind::Command, name, result) {
                report.commands.push(name.clone());
            }
        }

        if !agents.is_empty() {
            let agent_dir = target.agent_path(root)?;
            for (item, name) in &agents {
                let source = module.agent_file_in(staged, item);
                let result = target.generate_agent(&source, &agent_dir, name);
                if generated(&mut report, ItemKind::Agent, name, result) {
                    report.agents.push(name.clone());
                }
            }
        }

        sync_mcps(
            target,
            module,
            staged,
            root,
            &self.registry,
            &slot,
            previous,
            &mut report,
        );
        sync_instructions(target, module, staged, root, previous, &mut report);

        let mut record = slot;
        record.skills = report.skills.clone();
        record.commands = report.commands.clone();
        record.agents = report.agents.clone();
        record.mcps = report.mcps.clone();
        record.has_instructions = report.instructions;

        if record.is_empty() {
            // Nothing was generated: the previous artifacts go with the record.
            if let Some(previous) = previous {
                let mut removal = UninstallReport::default();
                remove_artifacts(previous, root, &mut removal);
                report.failures.extend(removal.failures);
                self.registry.remove_key(&record)?;
            }
        } else {
            self.registry.add(record)?;
            report.recorded = true;
        }
        tracing::debug!(
            module = %module.name,
            assistant = %report.assistant,
            installed = report.installed_count(),
            failures = report.failures.len(),
            "reconciled"
        );
        Ok(report)
    }
}

/// Record a generator's outcome. `true` if the item now exists.
fn generated(
    report: &mut TargetReport,
    kind: ItemKind,
    name: &str,
    result: lola_targets::Result<bool>,
) -> bool {
    match result {
        Ok(true) => true,
        Ok(false) => {
            report.fail(kind, name, SOURCE_MISSING);
            false
        },
        Err(e) => {
            report.fail(kind, name, e.to_string());
            false
        },
    }
}

fn orphans(previous: &Installation, kind: ItemKind, planned: &Planned) -> Vec<String> {
    previous
        .names(kind)
        .iter()
        .filter(|name| !planned.iter().any(|(_, planned)| planned == *name))
        .cloned()
        .collect()
}

fn note_orphan(
    report: &mut TargetReport,
    kind: ItemKind,
    name: String,
    result: lola_targets::Result<bool>,
) {
    match result {
        Ok(_) => report.orphans_removed.push((kind, name)),
        Err(e) => report.fail(kind, &name, format!("could not remove: {e}")),
    }
}

/// Delete previously installed items that are no longer declared.
///
/// Managed skill sections are rewritten as a whole afterwards, so their
/// orphans are only noted here.
fn remove_orphans(
    target: &dyn Target,
    root: &Root,
    previous: &Installation,
    skills: &Planned,
    commands: &Planned,
    agents: &Planned,
    report: &mut TargetReport,
) -> Result<()> {
    let orphan_skills = orphans(previous, ItemKind::Skill, skills);
    if target.uses_managed_section() {
        report
            .orphans_removed
            .extend(orphan_skills.into_iter().map(|name| (ItemKind::Skill, name)));
    } else if !orphan_skills.is_empty() {
        let dir = target.skill_path(root)?;
        for name in orphan_skills {
            let result = target.remove_skill(&dir, &name);
            note_orphan(report, ItemKind::Skill, name, result);
        }
    }

    let dir = target.command_path(root);
    for name in orphans(previous, ItemKind::Command, commands) {
        let result = target.remove_command(&dir, &name);
        note_orphan(report, ItemKind::Command, name, result);
    }

    let orphan_agents = orphans(previous, ItemKind::Agent, agents);
    if !orphan_agents.is_empty() && target.supports_agents() {
        let dir = target.agent_path(root)?;
        for name in orphan_agents {
            let result = target.remove_agent(&dir, &name);
            note_orphan(report, ItemKind::Agent, name, result);
        }
    }
    Ok(())
}

fn generate_skills(
    target: &dyn Target,
    module: &Module,
    staged: &Path,
    root: &Root,
    skills: &Planned,
    previous: Option<&Installation>,
    report: &mut TargetReport,
) -> Result<()> {
    let had_skills = previous.is_some_and(|p| !p.skills.is_empty());
    if skills.is_empty() && !had_skills {
        return Ok(());
    }
    let dest = target.skill_path(root)?;

    if !target.uses_managed_section() {
        for (item, name) in skills {
            let source = module.skill_dir_in(staged, item);
            let result = target.generate_skill(&source, &dest, name, root);
            if generated(report, ItemKind::Skill, name, result) {
                report.skills.push(name.clone());
            }
        }
        return Ok(());
    }

    let mut entries = Vec::new();
    for (item, name) in skills {
        let dir = module.skill_dir_in(staged, item);
        if dir.join(SKILL_FILE).is_file() {
            entries.push(SkillEntry {
                name: name.clone(),
                description: module.skill_description_in(staged, item),
                dir,
            });
        } else {
            report.fail(ItemKind::Skill, name, SOURCE_MISSING);
        }
    }
    match target.write_skill_section(&dest, &module.name, &entries, root) {
        Ok(_) => report
            .skills
            .extend(entries.into_iter().map(|entry| entry.name)),
        Err(e) => {
            for entry in &entries {
                report.fail(ItemKind::Skill, &entry.name, e.to_string());
            }
        },
    }
    Ok(())
}

/// Replace the module's servers in the assistant's MCP config.
///
/// Only the keys the previous record lists are removed first. A key another
/// module in the slot already holds is reported and left alone.
#[allow(clippy::too_many_arguments)]
fn sync_mcps(
    target: &dyn Target,
    module: &Module,
    staged: &Path,
    root: &Root,
    registry: &InstallationRegistry,
    slot: &Installation,
    previous: Option<&Installation>,
    report: &mut TargetReport,
) {
    let had_mcps = previous.is_some_and(|p| !p.mcps.is_empty());
    if module.mcps.is_empty() && !had_mcps {
        return;
    }
    let path = target.mcp_path(root);
    if let Some(previous) = previous
        && let Err(e) = target.remove_mcps(&path, &previous.mcps)
    {
        report.fail(ItemKind::Mcp, MCPS_FILE, format!("could not remove: {e}"));
        return;
    }

    if !module.mcps.is_empty() {
        match module.mcp_servers_in(staged) {
            Some(mut servers) => {
                servers.retain(|server, _| {
                    let key = prefixed(&module.name, server);
                    match holder(registry, slot, ItemKind::Mcp, &key) {
                        Some(owner) => {
                            report.fail(
                                ItemKind::Mcp,
                                &key,
                                format!("key already installed by module '{owner}'"),
                            );
                            false
                        },
                        None => true,
                    }
                });
                match target.merge_mcps(&path, &module.name, &servers) {
                    Ok(_) => {
                        report.mcps = servers
                            .keys()
                            .map(|server| prefixed(&module.name, server))
                            .collect();
                    },
                    Err(e) => report.fail(ItemKind::Mcp, MCPS_FILE, e.to_string()),
                }
            },
            None => report.fail(ItemKind::Mcp, MCPS_FILE, SOURCE_MISSING),
        }
    }

    if let Some(previous) = previous {
        for name in &previous.mcps {
            if !report.mcps.contains(name) {
                report.orphans_removed.push((ItemKind::Mcp, name.clone()));
            }
        }
    }
}

fn sync_instructions(
    target: &dyn Target,
    module: &Module,
    staged: &Path,
    root: &Root,
    previous: Option<&Installation>,
    report: &mut TargetReport,
) {
    let had_instructions = previous.is_some_and(|p| p.has_instructions);
    let Some(dest) = target.instructions_path(root) else {
        if module.has_instructions {
            report.skipped.push(format!(
                "instructions: {} has no instructions file at {} scope",
                report.assistant, report.scope
            ));
        }
        return;
    };

    if module.has_instructions {
        let source = module.instructions_file_in(staged);
        let result = target.generate_instructions(&source, &dest, &module.name);
        if generated(report, ItemKind::Instructions, INSTRUCTIONS_FILE, result) {
            report.instructions = true;
        }
    } else if had_instructions {
        let result = target.remove_instructions(&dest, &module.name);
        note_orphan(
            report,
            ItemKind::Instructions,
            INSTRUCTIONS_FILE.to_string(),
            result,
        );
    }
}

/// Count a removal in the uninstall report.
fn tally(
    report: &mut UninstallReport,
    record: &Installation,
    kind: ItemKind,
    name: &str,
    result: lola_targets::Result<bool>,
) {
    match result {
        Ok(true) => report.artifacts_removed += 1,
        Ok(false) => {},
        Err(e) => {
            tracing::warn!(
                module = %record.module,
                assistant = %record.assistant,
                kind = %kind,
                item = name,
                error = %e,
                "could not remove item"
            );
            report.failures.push(ItemFailure {
                kind,
                name: name.to_string(),
                reason: e.to_string(),
            });
        },
    }
}

/// Invoke the remover for every item a record lists.
fn remove_artifacts(record: &Installation, root: &Root, report: &mut UninstallReport) {
    let target = record.assistant.target();
    let module = record.module.as_str();

    if !record.skills.is_empty() {
        match target.skill_path(root) {
            Ok(dest) if target.uses_managed_section() => {
                let result = target.remove_skill_section(&dest, module);
                tally(report, record, ItemKind::Skill, module, result);
            },
            Ok(dest) => {
                for name in &record.skills {
                    let result = target.remove_skill(&dest, name);
                    tally(report, record, ItemKind::Skill, name, result);
                }
            },
            Err(e) => tally(report, record, ItemKind::Skill, module, Err(e)),
        }
    }

    let command_dir = target.command_path(root);
    for name in &record.commands {
        let result = target.remove_command(&command_dir, name);
        tally(report, record, ItemKind::Command, name, result);
    }

    if !record.agents.is_empty() {
        match target.agent_path(root) {
            Ok(dir) => {
                for name in &record.agents {
                    let result = target.remove_agent(&dir, name);
                    tally(report, record, ItemKind::Agent, name, result);
                }
            },
            Err(e) => tally(report, record, ItemKind::Agent, module, Err(e)),
        }
    }

    if !record.mcps.is_empty() {
        let result = target.remove_mcps(&target.mcp_path(root), &record.mcps);
        tally(report, record, ItemKind::Mcp, module, result);
    }

    if record.has_instructions
        && let Some(dest) = target.instructions_path(root)
    {
        let result = target.remove_instructions(&dest, module);
        tally(report, record, ItemKind::Instructions, module, result);
    }
}
