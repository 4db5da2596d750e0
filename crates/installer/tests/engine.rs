//! End-to-end reconciliation tests against temp directories.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    lola_config::LolaHome,
    lola_installer::{Error, InstallFilter, Installation, InstallationRegistry, Installer},
    lola_modules::Module,
    lola_targets::{Assistant, Scope},
    serde_json::Value,
};

// ── Fixtures ────────────────────────────────────────────────────────────────

struct Env {
    _tmp: tempfile::TempDir,
    home: LolaHome,
    user: PathBuf,
    project: PathBuf,
}

impl Env {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let home = LolaHome::new(tmp.path().join("lola"));
        let user = tmp.path().join("user");
        let project = tmp.path().join("p1");
        std::fs::create_dir_all(home.modules_dir()).unwrap();
        std::fs::create_dir_all(&user).unwrap();
        std::fs::create_dir_all(&project).unwrap();
        Self {
            _tmp: tmp,
            home,
            user,
            project,
        }
    }

    fn installer(&self) -> Installer {
        Installer::new(self.home.clone(), &self.user).unwrap()
    }

    fn module_dir(&self, name: &str) -> PathBuf {
        self.home.modules_dir().join(name)
    }

    fn write(&self, module: &str, rel: &str, content: &str) {
        let path = self.module_dir(module).join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn skill(&self, module: &str, skill: &str) {
        self.write(
            module,
            &format!("skills/{skill}/SKILL.md"),
            "---\ndescription: desc\n---\nDo the thing.\n",
        );
    }

    fn command(&self, module: &str, command: &str) {
        self.write(
            module,
            &format!("commands/{command}.md"),
            "---\ndescription: Run it\n---\nRun $ARGUMENTS\n",
        );
    }

    fn agent(&self, module: &str, agent: &str) {
        self.write(
            module,
            &format!("agents/{agent}.md"),
            "---\ndescription: Helper\n---\nHelp out.\n",
        );
    }

    fn record(&self, module: &str, assistant: Assistant) -> Installation {
        let registry = InstallationRegistry::load(self.home.installed_file()).unwrap();
        registry
            .find(module)
            .into_iter()
            .find(|r| r.assistant == assistant)
            .cloned()
            .unwrap()
    }

    fn project_files(&self) -> BTreeMap<PathBuf, String> {
        snapshot(&self.project)
    }
}

fn snapshot(dir: &Path) -> BTreeMap<PathBuf, String> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(dir).unwrap().to_path_buf(),
                std::fs::read_to_string(e.path()).unwrap(),
            )
        })
        .collect()
}

fn install(env: &Env, module: &str, assistants: &[Assistant]) {
    env.installer()
        .install(module, assistants, Scope::Project, Some(&env.project))
        .unwrap();
}

// ── Install ─────────────────────────────────────────────────────────────────

#[test]
fn demo_skill_installs_for_claude_in_project() {
    let env = Env::new();
    env.skill("demo", "a");

    let report = env
        .installer()
        .install("demo", &[Assistant::ClaudeCode], Scope::Project, Some(&env.project))
        .unwrap();
    assert_eq!(report.targets.len(), 1);
    assert!(report.targets[0].recorded);

    let registry = InstallationRegistry::load(env.home.installed_file()).unwrap();
    let records = registry.find("demo");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].skills, vec!["a".to_string()]);
    assert_eq!(records[0].project_path.as_deref(), Some(env.project.as_path()));

    assert!(env.project.join(".claude/skills/a/SKILL.md").is_file());
    assert!(env.project.join(".lola/modules/demo/skills/a/SKILL.md").is_file());
}

#[test]
fn install_twice_is_idempotent() {
    let env = Env::new();
    env.skill("demo", "a");
    env.command("demo", "go");
    env.agent("demo", "helper");
    env.write("demo", "mcps.json", r#"{"mcpServers": {"gh": {"command": "gh"}}}"#);
    env.write("demo", "AGENTS.md", "Be nice.\n");
    let all = [Assistant::ClaudeCode, Assistant::Cursor, Assistant::GeminiCli, Assistant::OpenCode];

    install(&env, "demo", &all);
    let registry_once = std::fs::read_to_string(env.home.installed_file()).unwrap();
    let files_once = env.project_files();

    install(&env, "demo", &all);
    assert_eq!(std::fs::read_to_string(env.home.installed_file()).unwrap(), registry_once);
    assert_eq!(env.project_files(), files_once);

    let registry = InstallationRegistry::load(env.home.installed_file()).unwrap();
    assert_eq!(registry.all().len(), all.len());
}

#[test]
fn invalid_module_is_refused_before_writing() {
    let env = Env::new();
    env.write("demo", "skills/a/SKILL.md", "---\nname: a\n---\nNo description here.\n");

    let module = Module::load(&env.module_dir("demo")).unwrap();
    let (ok, errors) = module.validate().into_parts();
    assert!(!ok);
    assert_eq!(
        errors,
        vec!["skills/a/SKILL.md: Missing required 'description' field in frontmatter".to_string()]
    );

    let err = env
        .installer()
        .install("demo", &[Assistant::ClaudeCode], Scope::Project, Some(&env.project))
        .unwrap_err();
    assert!(matches!(err, Error::Modules(lola_modules::Error::Validation { .. })));
    assert!(env.project_files().is_empty());
    assert!(!env.home.installed_file().exists());
}

#[test]
fn unknown_and_unsafe_module_names_are_rejected() {
    let env = Env::new();
    let mut installer = env.installer();
    let missing = installer
        .install("ghost", &[Assistant::ClaudeCode], Scope::Project, Some(&env.project))
        .unwrap_err();
    assert!(matches!(missing, Error::ModuleNotFound { .. }));

    let traversal = installer
        .install("../etc", &[Assistant::ClaudeCode], Scope::Project, Some(&env.project))
        .unwrap_err();
    assert!(matches!(traversal, Error::Modules(lola_modules::Error::InvalidName { .. })));
}

#[test]
fn missing_project_directory_is_an_error() {
    let env = Env::new();
    env.command("demo", "go");
    let gone = env.project.join("nope");
    let err = env
        .installer()
        .install("demo", &[Assistant::ClaudeCode], Scope::Project, Some(&gone))
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound { .. }));
}

#[test]
fn user_scope_skips_skills_where_unsupported() {
    let env = Env::new();
    env.skill("demo", "a");
    env.command("demo", "go");

    let report = env
        .installer()
        .install("demo", &[Assistant::Cursor, Assistant::GeminiCli], Scope::User, None)
        .unwrap();
    for target in &report.targets {
        assert!(target.skills.is_empty());
        assert_eq!(target.commands, vec!["go".to_string()]);
        assert!(!target.skipped.is_empty());
    }
    assert!(env.user.join(".cursor/commands/go.md").is_file());
    assert!(env.user.join(".gemini/commands/go.toml").is_file());
    assert!(!env.user.join(".gemini/GEMINI.md").exists());
    assert!(env.home.user_staging_dir().join("demo").is_dir());
}

#[test]
fn agents_skipped_for_gemini() {
    let env = Env::new();
    env.agent("demo", "helper");
    env.command("demo", "go");

    let report = env
        .installer()
        .install("demo", &[Assistant::GeminiCli], Scope::Project, Some(&env.project))
        .unwrap();
    assert!(report.targets[0].agents.is_empty());
    assert!(report.targets[0].failures.is_empty());
    assert!(env.record("demo", Assistant::GeminiCli).agents.is_empty());
}

#[test]
fn managed_section_lists_skills_and_instructions() {
    let env = Env::new();
    env.skill("demo", "a");
    env.write("demo", "AGENTS.md", "Prefer small diffs.\n");
    std::fs::write(env.project.join("GEMINI.md"), "# Project notes\n").unwrap();

    install(&env, "demo", &[Assistant::GeminiCli]);
    let gemini = std::fs::read_to_string(env.project.join("GEMINI.md")).unwrap();
    assert!(gemini.starts_with("# Project notes\n"));
    assert!(gemini.contains("<!-- lola:skills:start -->"));
    assert!(gemini.contains("#### a\n**When to use:** desc\n"));
    assert!(gemini.contains("`.lola/modules/demo/skills/a/SKILL.md`"));
    assert!(gemini.contains("Prefer small diffs."));

    let record = env.record("demo", Assistant::GeminiCli);
    assert_eq!(record.skills, vec!["a".to_string()]);
    assert!(record.has_instructions);
}

// ── Update ──────────────────────────────────────────────────────────────────

#[test]
fn update_removes_dropped_items_and_keeps_the_rest() {
    let env = Env::new();
    env.skill("demo", "a");
    env.skill("demo", "b");
    env.command("demo", "go");
    env.command("demo", "stay");
    install(&env, "demo", &[Assistant::ClaudeCode]);
    assert!(env.project.join(".claude/skills/b").is_dir());

    std::fs::remove_dir_all(env.module_dir("demo").join("skills/b")).unwrap();
    std::fs::remove_file(env.module_dir("demo").join("commands/go.md")).unwrap();
    let kept_before = std::fs::read_to_string(env.project.join(".claude/commands/stay.md")).unwrap();

    let report = env.installer().update(Some("demo"), None).unwrap();
    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].orphans_removed.len(), 2);

    assert!(!env.project.join(".claude/skills/b").exists());
    assert!(!env.project.join(".claude/commands/go.md").exists());
    assert!(env.project.join(".claude/skills/a/SKILL.md").is_file());
    assert_eq!(
        std::fs::read_to_string(env.project.join(".claude/commands/stay.md")).unwrap(),
        kept_before
    );

    let record = env.record("demo", Assistant::ClaudeCode);
    assert_eq!(record.skills, vec!["a".to_string()]);
    assert_eq!(record.commands, vec!["stay".to_string()]);
}

#[test]
fn update_drops_managed_section_when_skills_vanish() {
    let env = Env::new();
    env.skill("demo", "a");
    env.command("demo", "go");
    install(&env, "demo", &[Assistant::OpenCode]);
    assert!(env.project.join("AGENTS.md").is_file());

    std::fs::remove_dir_all(env.module_dir("demo").join("skills")).unwrap();
    env.installer().update(None, Some(Assistant::OpenCode)).unwrap();

    assert!(!env.project.join("AGENTS.md").exists());
    let record = env.record("demo", Assistant::OpenCode);
    assert!(record.skills.is_empty());
    assert_eq!(record.commands, vec!["go".to_string()]);
}

#[test]
fn update_reapplies_changed_content_from_registry_copy() {
    let env = Env::new();
    env.command("demo", "go");
    install(&env, "demo", &[Assistant::ClaudeCode]);

    env.write("demo", "commands/go.md", "---\ndescription: Run it\n---\nNew body\n");
    let staged = env.project.join(".lola/modules/demo/commands/go.md");
    assert!(!std::fs::read_to_string(&staged).unwrap().contains("New body"));

    env.installer().update(Some("demo"), None).unwrap();
    assert!(std::fs::read_to_string(&staged).unwrap().contains("New body"));
    assert!(
        std::fs::read_to_string(env.project.join(".claude/commands/go.md"))
            .unwrap()
            .contains("New body")
    );
}

#[test]
fn update_where_everything_fails_removes_previous_artifacts() {
    let env = Env::new();
    env.skill("demo", "a");
    env.command("demo", "go");
    install(&env, "demo", &[Assistant::ClaudeCode]);
    let skill_dir = env.project.join(".claude/skills/a");
    let command = env.project.join(".claude/commands/go.md");
    assert!(skill_dir.join("SKILL.md").is_file());

    // Block regeneration of both items.
    std::fs::remove_dir_all(&skill_dir).unwrap();
    std::fs::write(&skill_dir, "not a directory").unwrap();
    std::fs::remove_file(&command).unwrap();
    std::fs::create_dir(&command).unwrap();

    let report = env.installer().update(Some("demo"), None).unwrap();
    assert_eq!(report.updated.len(), 1);
    assert!(!report.updated[0].recorded);
    assert!(!report.updated[0].failures.is_empty());

    let registry = InstallationRegistry::load(env.home.installed_file()).unwrap();
    assert!(registry.find("demo").is_empty());
    assert!(!skill_dir.exists());
    assert!(!command.exists());
}

#[test]
fn stale_project_is_reported_and_kept() {
    let env = Env::new();
    env.command("demo", "go");
    install(&env, "demo", &[Assistant::ClaudeCode]);
    std::fs::remove_dir_all(&env.project).unwrap();

    let report = env.installer().update(None, None).unwrap();
    assert_eq!(report.stale.len(), 1);
    assert!(report.updated.is_empty());
    let registry = InstallationRegistry::load(env.home.installed_file()).unwrap();
    assert_eq!(registry.find("demo").len(), 1);
}

#[test]
fn update_skips_invalid_module_but_updates_others() {
    let env = Env::new();
    env.command("good", "go");
    env.skill("bad", "a");
    install(&env, "good", &[Assistant::ClaudeCode]);
    install(&env, "bad", &[Assistant::ClaudeCode]);

    env.write("bad", "skills/a/SKILL.md", "---\nname: a\n---\n");
    let report = env.installer().update(None, None).unwrap();
    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].module, "good");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "bad");
}

// ── Name collisions ─────────────────────────────────────────────────────────

#[test]
fn shared_skill_name_goes_to_first_installer() {
    let env = Env::new();
    env.skill("m1", "shared");
    env.skill("m2", "shared");
    install(&env, "m1", &[Assistant::ClaudeCode]);
    install(&env, "m2", &[Assistant::ClaudeCode]);

    let check = |env: &Env| {
        assert_eq!(env.record("m1", Assistant::ClaudeCode).skills, vec!["shared".to_string()]);
        assert_eq!(
            env.record("m2", Assistant::ClaudeCode).skills,
            vec!["m2-shared".to_string()]
        );
        assert!(env.project.join(".claude/skills/shared/SKILL.md").is_file());
        assert!(env.project.join(".claude/skills/m2-shared/SKILL.md").is_file());
    };
    check(&env);

    env.installer().update(Some("m2"), None).unwrap();
    check(&env);
    env.installer().update(Some("m1"), None).unwrap();
    check(&env);
    env.installer().update(None, None).unwrap();
    check(&env);
    install(&env, "m2", &[Assistant::ClaudeCode]);
    check(&env);
}

#[test]
fn collisions_are_per_slot() {
    let env = Env::new();
    env.command("m1", "go");
    env.command("m2", "go");
    install(&env, "m1", &[Assistant::ClaudeCode]);
    install(&env, "m2", &[Assistant::Cursor]);

    assert_eq!(env.record("m1", Assistant::ClaudeCode).commands, vec!["go".to_string()]);
    assert_eq!(env.record("m2", Assistant::Cursor).commands, vec!["go".to_string()]);
}

#[test]
fn short_name_freed_by_uninstall_is_reclaimable() {
    let env = Env::new();
    env.skill("m1", "shared");
    env.skill("m2", "shared");
    install(&env, "m1", &[Assistant::ClaudeCode]);
    install(&env, "m2", &[Assistant::ClaudeCode]);

    env.installer().uninstall(&InstallFilter::module("m1")).unwrap();
    env.installer().update(Some("m2"), None).unwrap();

    assert_eq!(env.record("m2", Assistant::ClaudeCode).skills, vec!["shared".to_string()]);
    assert!(env.project.join(".claude/skills/shared").is_dir());
    assert!(!env.project.join(".claude/skills/m2-shared").exists());
}

#[test]
fn prefixed_fallback_never_takes_another_modules_name() {
    let env = Env::new();
    env.skill("m3", "m2-shared");
    env.skill("m1", "shared");
    env.skill("m2", "shared");
    install(&env, "m3", &[Assistant::ClaudeCode]);
    install(&env, "m1", &[Assistant::ClaudeCode]);
    install(&env, "m2", &[Assistant::ClaudeCode]);

    assert_eq!(
        env.record("m3", Assistant::ClaudeCode).skills,
        vec!["m2-shared".to_string()]
    );
    assert_eq!(
        env.record("m2", Assistant::ClaudeCode).skills,
        vec!["m2-shared-2".to_string()]
    );

    env.installer().uninstall(&InstallFilter::module("m2")).unwrap();
    assert!(env.project.join(".claude/skills/m2-shared/SKILL.md").is_file());
    assert!(env.project.join(".claude/skills/shared/SKILL.md").is_file());
    assert!(!env.project.join(".claude/skills/m2-shared-2").exists());
}

#[test]
fn mcp_servers_of_prefix_overlapping_modules_coexist() {
    let env = Env::new();
    env.write("foo-bar", "mcps.json", r#"{"mcpServers": {"b": {"command": "b"}}}"#);
    env.write("foo", "mcps.json", r#"{"mcpServers": {"a": {"command": "a"}}}"#);
    install(&env, "foo-bar", &[Assistant::ClaudeCode]);
    install(&env, "foo", &[Assistant::ClaudeCode]);

    let read_mcp = || -> Value {
        serde_json::from_str(&std::fs::read_to_string(env.project.join(".mcp.json")).unwrap())
            .unwrap()
    };
    let config = read_mcp();
    assert!(config["mcpServers"]["foo-a"].is_object());
    assert!(config["mcpServers"]["foo-bar-b"].is_object());

    env.installer().update(Some("foo"), None).unwrap();
    assert!(read_mcp()["mcpServers"]["foo-bar-b"].is_object());

    env.installer().uninstall(&InstallFilter::module("foo")).unwrap();
    let config = read_mcp();
    assert!(config["mcpServers"].get("foo-a").is_none());
    assert!(config["mcpServers"]["foo-bar-b"].is_object());
    assert_eq!(
        env.record("foo-bar", Assistant::ClaudeCode).mcps,
        vec!["foo-bar-b".to_string()]
    );
}

#[test]
fn mcp_key_held_by_another_module_is_not_overwritten() {
    let env = Env::new();
    env.write("foo-bar", "mcps.json", r#"{"mcpServers": {"b": {"command": "mine"}}}"#);
    env.write("foo", "mcps.json", r#"{"mcpServers": {"bar-b": {"command": "theirs"}}}"#);
    install(&env, "foo-bar", &[Assistant::ClaudeCode]);

    let report = env
        .installer()
        .install("foo", &[Assistant::ClaudeCode], Scope::Project, Some(&env.project))
        .unwrap();
    assert_eq!(report.targets[0].failures.len(), 1);
    assert_eq!(report.targets[0].failures[0].name, "foo-bar-b");
    assert!(!report.targets[0].recorded);

    let config: Value =
        serde_json::from_str(&std::fs::read_to_string(env.project.join(".mcp.json")).unwrap())
            .unwrap();
    assert_eq!(config["mcpServers"]["foo-bar-b"]["command"], "mine");
}

// ── Uninstall ───────────────────────────────────────────────────────────────

#[test]
fn uninstall_removes_every_artifact() {
    let env = Env::new();
    env.skill("demo", "a");
    env.command("demo", "go");
    env.agent("demo", "helper");
    env.write("demo", "mcps.json", r#"{"mcpServers": {"gh": {"command": "gh"}}}"#);
    env.write("demo", "AGENTS.md", "Be nice.\n");
    std::fs::write(env.project.join("CLAUDE.md"), "# Mine\n").unwrap();
    let all = [Assistant::ClaudeCode, Assistant::Cursor, Assistant::GeminiCli, Assistant::OpenCode];
    install(&env, "demo", &all);

    let mcp: Value =
        serde_json::from_str(&std::fs::read_to_string(env.project.join(".mcp.json")).unwrap())
            .unwrap();
    assert!(mcp["mcpServers"]["demo-gh"].is_object());
    assert_eq!(env.record("demo", Assistant::ClaudeCode).mcps, vec!["demo-gh".to_string()]);

    let mut installer = env.installer();
    let planned = installer.plan_uninstall(&InstallFilter::module("demo"));
    assert_eq!(planned.len(), all.len());
    let report = installer.uninstall(&InstallFilter::module("demo")).unwrap();
    assert_eq!(report.removed.len(), all.len());
    assert!(report.failures.is_empty());
    assert!(report.artifacts_removed > 0);

    assert!(installer.registry().find("demo").is_empty());
    assert_eq!(
        std::fs::read_to_string(env.project.join("CLAUDE.md")).unwrap(),
        "# Mine\n"
    );
    let leftovers: Vec<PathBuf> = env.project_files().into_keys().collect();
    assert_eq!(leftovers, vec![PathBuf::from("CLAUDE.md")]);
}

#[test]
fn uninstall_with_no_matches_changes_nothing() {
    let env = Env::new();
    env.command("demo", "go");
    install(&env, "demo", &[Assistant::ClaudeCode]);
    let before = env.project_files();
    let registry_before = std::fs::read_to_string(env.home.installed_file()).unwrap();

    let report = env
        .installer()
        .uninstall(&InstallFilter::module("ghost"))
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(env.project_files(), before);
    assert_eq!(
        std::fs::read_to_string(env.home.installed_file()).unwrap(),
        registry_before
    );
}

#[test]
fn staged_copy_survives_while_another_assistant_uses_it() {
    let env = Env::new();
    env.command("demo", "go");
    install(&env, "demo", &[Assistant::ClaudeCode, Assistant::Cursor]);
    let staged = env.project.join(".lola/modules/demo");

    env.installer()
        .uninstall(&InstallFilter {
            module: Some("demo".into()),
            assistant: Some(Assistant::ClaudeCode),
            ..InstallFilter::default()
        })
        .unwrap();
    assert!(staged.is_dir());
    assert!(env.project.join(".cursor/commands/go.md").is_file());

    env.installer()
        .uninstall(&InstallFilter::module("demo"))
        .unwrap();
    assert!(!staged.exists());
}

#[test]
fn remove_module_uninstalls_and_deletes_registry_copy() {
    let env = Env::new();
    env.command("demo", "go");
    install(&env, "demo", &[Assistant::ClaudeCode]);

    let report = env.installer().remove_module("demo").unwrap();
    assert_eq!(report.removed.len(), 1);
    assert!(!env.module_dir("demo").exists());
    assert!(!env.project.join(".claude/commands/go.md").exists());

    let again = env.installer().remove_module("demo").unwrap_err();
    assert!(matches!(again, Error::ModuleNotFound { .. }));
}
