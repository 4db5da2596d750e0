//! `lola mod ...`: the module registry.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    lola_config::LolaHome,
    lola_modules::{Module, ScaffoldOptions, SourceInfo},
};

use crate::{App, prompt};

#[derive(Subcommand)]
pub enum ModAction {
    /// Register a module from a git URL, folder, or tarball.
    Add {
        source: String,
        /// Module name (default: derived from the source).
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List registered modules.
    #[command(alias = "list")]
    Ls,
    /// Show what a module contains.
    Info { name: String },
    /// Uninstall a module everywhere and delete it from the registry.
    #[command(alias = "remove")]
    Rm {
        name: String,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        force: bool,
    },
    /// Re-fetch modules from their recorded sources.
    Update { name: Option<String> },
    /// Scaffold a new module.
    Init {
        /// Create this subdirectory (default: the current directory).
        name: Option<String>,
        /// Name of the example skill.
        #[arg(long, default_value = "example-skill")]
        skill: String,
        #[arg(long)]
        no_skill: bool,
        /// Name of the example command.
        #[arg(long, default_value = "example-command")]
        command: String,
        #[arg(long)]
        no_command: bool,
        /// Name of the example agent.
        #[arg(long, default_value = "example-agent")]
        agent: String,
        #[arg(long)]
        no_agent: bool,
        /// Skip the example mcps.json.
        #[arg(long)]
        no_mcps: bool,
        /// Skip the example AGENTS.md.
        #[arg(long)]
        no_instructions: bool,
    },
}

pub fn handle_mod(app: &App, action: ModAction) -> Result<()> {
    match action {
        ModAction::Add { source, name } => add(&app.home, &source, name.as_deref()),
        ModAction::Ls => list(&app.home),
        ModAction::Info { name } => info(&app.home, &name),
        ModAction::Rm { name, force } => remove(app, &name, force),
        ModAction::Update { name } => update(&app.home, name.as_deref()),
        ModAction::Init {
            name,
            skill,
            no_skill,
            command,
            no_command,
            agent,
            no_agent,
            no_mcps,
            no_instructions,
        } => {
            let options = ScaffoldOptions {
                skill: (!no_skill).then_some(skill),
                command: (!no_command).then_some(command),
                agent: (!no_agent).then_some(agent),
                mcps: !no_mcps,
                instructions: !no_instructions,
            };
            init(name.as_deref(), &options)
        },
    }
}

fn summary(module: &Module) -> String {
    let mut parts = vec![
        format!("{} skills", module.skills.len()),
        format!("{} commands", module.commands.len()),
        format!("{} agents", module.agents.len()),
    ];
    if !module.mcps.is_empty() {
        parts.push(format!("{} MCP servers", module.mcps.len()));
    }
    if module.has_instructions {
        parts.push("instructions".to_string());
    }
    parts.join(", ")
}

/// Registered module directories in name order. Scratch directories left by
/// an interrupted fetch are hidden and skipped.
fn module_dirs(home: &LolaHome) -> Result<Vec<PathBuf>> {
    let dir = home.modules_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if path.is_dir() && !hidden {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn registered(home: &LolaHome, name: &str) -> Result<PathBuf> {
    lola_modules::validate_module_name(name)?;
    let dir = home.modules_dir().join(name);
    if !dir.is_dir() {
        bail!("module '{name}' not found. Add it with `lola mod add <source>`");
    }
    Ok(dir)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn add(home: &LolaHome, source: &str, name: Option<&str>) -> Result<()> {
    home.ensure_dirs()?;
    let module = lola_sources::add_module(source, &home.modules_dir(), name)
        .with_context(|| format!("cannot add module from {source}"))?;
    println!("Added '{}': {}", module.name, summary(&module));

    let report = module.validate();
    for warning in &report.warnings {
        println!("  {warning}");
    }
    if !report.is_ok() {
        println!("  The module has validation errors and cannot be installed yet:");
        for error in &report.errors {
            println!("    - {error}");
        }
    }
    Ok(())
}

fn list(home: &LolaHome) -> Result<()> {
    let dirs = module_dirs(home)?;
    if dirs.is_empty() {
        println!("No modules registered. Add one with `lola mod add <source>`.");
        return Ok(());
    }
    for dir in dirs {
        match Module::load(&dir) {
            Some(module) => println!("  {}: {}", module.name, summary(&module)),
            None => println!("  {}: (no content found)", dir_name(&dir)),
        }
    }
    Ok(())
}

fn info(home: &LolaHome, name: &str) -> Result<()> {
    let dir = registered(home, name)?;
    let Some(module) = Module::load(&dir) else {
        bail!("'{name}' does not contain any skills, commands, agents, MCP servers or instructions");
    };

    println!("Name:   {}", module.name);
    println!("Path:   {}", module.path.display());
    match SourceInfo::load(&dir)? {
        Some(source) => println!("Source: {} ({})", source.source, source.kind),
        None => println!("Source: (not recorded)"),
    }

    if !module.skills.is_empty() {
        println!("\nSkills:");
        for skill in &module.skills {
            let description = module.skill_description_in(&module.path, skill);
            if description.is_empty() {
                println!("  {skill}");
            } else {
                println!("  {skill}: {description}");
            }
        }
    }
    for (label, items) in [
        ("Commands", &module.commands),
        ("Agents", &module.agents),
        ("MCP servers", &module.mcps),
    ] {
        if !items.is_empty() {
            println!("\n{label}:");
            for item in items {
                println!("  {item}");
            }
        }
    }
    if module.has_instructions {
        println!("\nInstructions: {}", lola_modules::INSTRUCTIONS_FILE);
    }

    let report = module.validate();
    if report.is_ok() && report.warnings.is_empty() {
        println!("\nValidation: ok");
    } else {
        println!("\nValidation:");
        for error in &report.errors {
            println!("  ✗ {error}");
        }
        for warning in &report.warnings {
            println!("  ! {warning}");
        }
    }
    Ok(())
}

fn remove(app: &App, name: &str, force: bool) -> Result<()> {
    let mut installer = app.installer()?;
    let installed = installer.registry().find(name).len();
    if !force {
        let question = format!(
            "Remove module '{name}' and uninstall it from {installed} installation(s)?"
        );
        if !prompt::confirm(&question)? {
            println!("Cancelled.");
            return Ok(());
        }
    }
    let report = installer.remove_module(name)?;
    println!(
        "Removed '{name}' ({} installation(s) uninstalled, {} item(s) removed).",
        report.removed.len(),
        report.artifacts_removed
    );
    for failure in &report.failures {
        println!("  ✗ {} {}: {}", failure.kind, failure.name, failure.reason);
    }
    Ok(())
}

fn update(home: &LolaHome, name: Option<&str>) -> Result<()> {
    let dirs = match name {
        Some(name) => vec![registered(home, name)?],
        None => module_dirs(home)?,
    };
    if dirs.is_empty() {
        println!("No modules registered.");
        return Ok(());
    }

    let mut updated = 0;
    for dir in dirs {
        let module = dir_name(&dir);
        match lola_sources::update_module(&dir) {
            Ok(source) => {
                updated += 1;
                println!("Updated '{module}' from {}", source.source);
            },
            Err(lola_sources::Error::NoSourceInfo { .. }) => {
                println!("Skipped '{module}': no recorded source");
            },
            Err(e) if name.is_some() => {
                return Err(e).with_context(|| format!("cannot update '{module}'"));
            },
            Err(e) => println!("Failed to update '{module}': {e}"),
        }
    }
    if updated > 0 {
        println!("Run `lola update` to regenerate installed files.");
    }
    Ok(())
}

fn init(name: Option<&str>, options: &ScaffoldOptions) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let (dir, created) = lola_modules::init_module(&cwd, name, options)?;
    if created.is_empty() {
        println!("Nothing to create in {}: all files already exist.", dir.display());
        return Ok(());
    }
    println!("Initialized module in {}:", dir.display());
    for file in &created {
        println!("  {file}");
    }
    Ok(())
}
