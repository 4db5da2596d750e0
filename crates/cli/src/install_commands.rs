//! `lola install`, `uninstall`, `update` and `list`.

use std::{collections::BTreeMap, path::PathBuf};

use {
    anyhow::{Context, Result},
    clap::Args,
    lola_config::{InstallConfig, LolaHome},
    lola_installer::{InstallFilter, Installation, TargetReport},
    lola_market::{CatalogModule, MarketRegistry, parse_market_ref},
    lola_targets::{Assistant, Scope},
};

use crate::{App, prompt};

#[derive(Args)]
pub struct InstallArgs {
    /// Module name, or `@marketplace/module`.
    pub module: String,
    /// Assistant to install to (repeatable). Defaults to config.toml, then all.
    #[arg(short = 'a', long = "assistant")]
    pub assistants: Vec<Assistant>,
    /// `project` or `user`.
    #[arg(short, long)]
    pub scope: Option<Scope>,
    /// Project directory for project scope (default: current directory).
    pub project_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct UninstallArgs {
    pub module: String,
    #[arg(short, long)]
    pub assistant: Option<Assistant>,
    #[arg(short, long)]
    pub scope: Option<Scope>,
    /// Only the installation in this project directory.
    pub project_path: Option<PathBuf>,
    /// Do not ask before removing several installations.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Only this module.
    pub module: Option<String>,
    #[arg(short, long)]
    pub assistant: Option<Assistant>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short, long)]
    pub assistant: Option<Assistant>,
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

// ── Argument resolution ─────────────────────────────────────────────────────

fn resolve_assistants(requested: &[Assistant], config: &InstallConfig) -> Result<Vec<Assistant>> {
    let mut assistants = if !requested.is_empty() {
        requested.to_vec()
    } else if !config.assistants.is_empty() {
        config
            .assistants
            .iter()
            .map(|name| {
                name.parse::<Assistant>()
                    .context("invalid [install] assistants in config.toml")
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        Assistant::ALL.to_vec()
    };
    let mut seen = Vec::new();
    assistants.retain(|a| {
        let fresh = !seen.contains(a);
        seen.push(*a);
        fresh
    });
    Ok(assistants)
}

fn resolve_scope(requested: Option<Scope>, config: &InstallConfig) -> Result<Scope> {
    if let Some(scope) = requested {
        return Ok(scope);
    }
    match config.scope.as_deref() {
        Some(raw) => raw
            .parse()
            .context("invalid [install] scope in config.toml"),
        None => Ok(Scope::Project),
    }
}

/// Absolute form of a project directory, defaulting to the current one.
fn project_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    Ok(std::fs::canonicalize(&path).or_else(|_| std::path::absolute(&path))?)
}

/// Turn the install argument into a registered module name, fetching it
/// from a marketplace when needed.
fn resolve_module(home: &LolaHome, requested: &str) -> Result<String> {
    let markets = MarketRegistry::new(home);
    if let Some((market, module)) = parse_market_ref(requested) {
        let entry = markets.find(market, module)?;
        return fetch_from_market(home, market, &entry);
    }

    if lola_modules::validate_module_name(requested).is_err()
        || home.modules_dir().join(requested).exists()
    {
        return Ok(requested.to_string());
    }
    match markets.search(requested)?.into_iter().next() {
        Some(hit) => fetch_from_market(home, &hit.market, &hit.module),
        None => Ok(requested.to_string()),
    }
}

fn fetch_from_market(home: &LolaHome, market: &str, entry: &CatalogModule) -> Result<String> {
    println!(
        "Fetching '{}' {} from marketplace '{market}'",
        entry.name, entry.version
    );
    let module = lola_sources::add_module(&entry.repository, &home.modules_dir(), Some(&entry.name))
        .with_context(|| format!("cannot fetch '{}' from {}", entry.name, entry.repository))?;
    Ok(module.name)
}

// ── Output ──────────────────────────────────────────────────────────────────

fn location(scope: Scope, project_path: Option<&PathBuf>) -> String {
    match (scope, project_path) {
        (Scope::Project, Some(path)) => format!("project {}", path.display()),
        (scope, _) => scope.to_string(),
    }
}

fn counts(report: &TargetReport) -> String {
    let mut parts = Vec::new();
    for (count, label) in [
        (report.skills.len(), "skill"),
        (report.commands.len(), "command"),
        (report.agents.len(), "agent"),
        (report.mcps.len(), "MCP server"),
        (usize::from(report.instructions), "instructions file"),
    ] {
        match count {
            0 => {},
            1 => parts.push(format!("1 {label}")),
            n => parts.push(format!("{n} {label}s")),
        }
    }
    if parts.is_empty() {
        "nothing installed".to_string()
    } else {
        parts.join(", ")
    }
}

fn print_target(report: &TargetReport) {
    println!(
        "  {} ({}): {}",
        report.assistant,
        location(report.scope, report.project_path.as_ref()),
        counts(report)
    );
    for (kind, name) in &report.orphans_removed {
        println!("    - removed {kind} {name}");
    }
    for note in &report.skipped {
        println!("    ↳ {note}");
    }
    for failure in &report.failures {
        println!(
            "    ✗ {} {}: {}",
            failure.kind, failure.name, failure.reason
        );
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

pub fn handle_install(app: &App, args: InstallArgs) -> Result<()> {
    let assistants = resolve_assistants(&args.assistants, &app.config.install)?;
    let scope = resolve_scope(args.scope, &app.config.install)?;
    let project = match scope {
        Scope::Project => Some(project_dir(args.project_path)?),
        Scope::User => None,
    };

    let mut installer = app.installer()?;
    let name = resolve_module(&app.home, &args.module)?;
    let report = installer.install(&name, &assistants, scope, project.as_deref())?;

    for warning in &report.warnings {
        println!("{warning}");
    }
    println!("Installed '{}':", report.module);
    for target in &report.targets {
        print_target(target);
    }
    if report.failure_count() > 0 {
        println!("{} item(s) failed to install.", report.failure_count());
    }
    Ok(())
}

pub fn handle_uninstall(app: &App, args: UninstallArgs) -> Result<()> {
    let mut installer = app.installer()?;
    let filter = InstallFilter {
        module: Some(args.module.clone()),
        assistant: args.assistant,
        scope: args.scope,
        project_path: args.project_path.map(|p| project_dir(Some(p))).transpose()?,
    };

    let planned = installer.plan_uninstall(&filter);
    if planned.is_empty() {
        println!("No installations found for '{}'.", args.module);
        return Ok(());
    }
    if planned.len() > 1 && !args.force {
        println!("This will remove {} installations:", planned.len());
        for inst in &planned {
            println!(
                "  {} ({})",
                inst.assistant,
                location(inst.scope, inst.project_path.as_ref())
            );
        }
        if !prompt::confirm("Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let report = installer.uninstall(&filter)?;
    println!(
        "Uninstalled '{}' from {} installation(s), {} item(s) removed.",
        args.module,
        report.removed.len(),
        report.artifacts_removed
    );
    for failure in &report.failures {
        println!(
            "  ✗ {} {}: {}",
            failure.kind, failure.name, failure.reason
        );
    }
    Ok(())
}

pub fn handle_update(app: &App, args: UpdateArgs) -> Result<()> {
    let mut installer = app.installer()?;
    let report = installer.update(args.module.as_deref(), args.assistant)?;
    if report.is_empty() {
        println!("No installations to update.");
        return Ok(());
    }

    let mut current = None;
    for target in &report.updated {
        if current != Some(&target.module) {
            println!("Updated '{}':", target.module);
            current = Some(&target.module);
        }
        print_target(target);
    }
    for (module, reason) in &report.skipped {
        println!("Skipped '{module}': {reason}");
    }
    for inst in &report.stale {
        println!(
            "Stale: '{}' for {} in {} (directory no longer exists; run `lola uninstall {}` to forget it)",
            inst.module,
            inst.assistant,
            inst.project_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            inst.module
        );
    }
    Ok(())
}

/// Installations grouped by module, then by (scope, project).
type Grouped<'a> = BTreeMap<&'a str, BTreeMap<String, Vec<&'a Installation>>>;

fn group_installations<'a>(installations: &[&'a Installation]) -> Grouped<'a> {
    let mut grouped: Grouped<'a> = BTreeMap::new();
    for inst in installations {
        grouped
            .entry(inst.module.as_str())
            .or_default()
            .entry(location(inst.scope, inst.project_path.as_ref()))
            .or_default()
            .push(inst);
    }
    grouped
}

pub fn handle_list(app: &App, args: ListArgs) -> Result<()> {
    let installer = app.installer()?;
    let filter = InstallFilter {
        assistant: args.assistant,
        ..InstallFilter::default()
    };
    let installations = installer.registry().matching(&filter);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&installations)?);
        return Ok(());
    }
    if installations.is_empty() {
        println!("No modules installed.");
        return Ok(());
    }

    for (module, places) in group_installations(&installations) {
        println!("{module}");
        for (place, records) in places {
            println!("  {place}");
            for inst in records {
                let stale = if inst.is_stale() {
                    " (stale)"
                } else {
                    ""
                };
                println!(
                    "    {}{stale}: {} skills, {} commands, {} agents, {} MCP servers{}",
                    inst.assistant,
                    inst.skills.len(),
                    inst.commands.len(),
                    inst.agents.len(),
                    inst.mcps.len(),
                    if inst.has_instructions {
                        ", instructions"
                    } else {
                        ""
                    }
                );
            }
        }
    }
    Ok(())
}
