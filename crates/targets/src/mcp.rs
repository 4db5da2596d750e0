//! Merging module MCP servers into an assistant's shared JSON config.
//!
//! Servers are keyed `{module}-{name}` so several modules can share one file.

use std::{path::Path, sync::LazyLock};

use {
    regex::Regex,
    serde_json::{Map, Value, json},
};

use crate::error::Result;

/// How a config file lays out its servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpLayout {
    /// `{"mcpServers": {name: {command, args, env}}}`
    Standard,
    /// opencode's `{"$schema": .., "mcp": {name: {type, command: [..], environment}}}`
    OpenCode,
}

const OPENCODE_SCHEMA: &str = "https://opencode.ai/config.json";

#[allow(clippy::unwrap_used)]
static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

impl McpLayout {
    fn servers_key(self) -> &'static str {
        match self {
            Self::Standard => "mcpServers",
            Self::OpenCode => "mcp",
        }
    }

    fn convert(self, server: &Value) -> Value {
        match self {
            Self::Standard => server.clone(),
            Self::OpenCode => to_opencode(server),
        }
    }

    /// Keys that may remain in an otherwise empty file before it is deleted.
    fn boilerplate_keys(self) -> &'static [&'static str] {
        match self {
            Self::Standard => &[],
            Self::OpenCode => &["$schema"],
        }
    }
}

/// `{command, args, env}` to `{type: local, command: [command, ..args], environment}`.
fn to_opencode(server: &Value) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), json!("local"));

    let command = server.get("command").and_then(Value::as_str).unwrap_or_default();
    if !command.is_empty() {
        let mut argv = vec![json!(command)];
        if let Some(args) = server.get("args").and_then(Value::as_array) {
            argv.extend(args.iter().cloned());
        }
        out.insert("command".into(), Value::Array(argv));
    }

    if let Some(env) = server.get("env").and_then(Value::as_object)
        && !env.is_empty()
    {
        let environment: Map<String, Value> = env
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => Value::String(ENV_VAR.replace_all(s, "{env:$1}").into_owned()),
                    other => other.clone(),
                };
                (k.clone(), v)
            })
            .collect();
        out.insert("environment".into(), Value::Object(environment));
    }
    Value::Object(out)
}

/// Read a JSON object, treating a missing or malformed file as `{}`.
fn read_object(path: &Path) -> Result<Option<Map<String, Value>>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) | Err(_) => {
            tracing::debug!(path = %path.display(), "existing MCP config is not a JSON object");
            Ok(None)
        },
    }
}

fn write_object(path: &Path, config: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(config)?;
    std::fs::write(path, format!("{text}\n"))?;
    Ok(())
}

/// Merge `servers` into the config at `path` under `{module}-{name}`.
///
/// Returns `false` without touching the file when `servers` is empty.
pub fn merge_servers(
    path: &Path,
    layout: McpLayout,
    module: &str,
    servers: &Map<String, Value>,
) -> Result<bool> {
    if servers.is_empty() {
        return Ok(false);
    }
    let mut config = read_object(path)?.unwrap_or_default();
    if layout == McpLayout::OpenCode && !config.contains_key("$schema") {
        config.insert("$schema".into(), json!(OPENCODE_SCHEMA));
    }

    let key = layout.servers_key();
    let mut entries = match config.remove(key) {
        Some(Value::Object(entries)) => entries,
        _ => Map::new(),
    };
    for (name, server) in servers {
        entries.insert(format!("{module}-{name}"), layout.convert(server));
    }
    config.insert(key.into(), Value::Object(entries));

    write_object(path, &config)?;
    Ok(true)
}

/// Remove the servers named `keys` from the config at `path`.
///
/// `keys` are the full `{module}-{name}` keys recorded at install time, so a
/// module never touches servers another module merged. The file is deleted
/// once no servers and no foreign keys remain. A missing or malformed file
/// is left alone.
pub fn remove_servers(path: &Path, layout: McpLayout, keys: &[String]) -> Result<bool> {
    if keys.is_empty() {
        return Ok(false);
    }
    let Some(mut config) = read_object(path)? else {
        return Ok(false);
    };
    let key = layout.servers_key();
    let Some(Value::Object(entries)) = config.get_mut(key) else {
        return Ok(false);
    };
    let before = entries.len();
    entries.retain(|name, _| !keys.contains(name));
    if entries.len() == before {
        return Ok(false);
    }
    let emptied = entries.is_empty();

    let only_ours = config
        .keys()
        .all(|k| k == key || layout.boilerplate_keys().contains(&k.as_str()));
    if emptied && only_ours {
        std::fs::remove_file(path)?;
    } else {
        write_object(path, &config)?;
    }
    Ok(true)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn servers(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn read(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn merge_prefixes_and_preserves_other_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".mcp.json");
        std::fs::write(
            &path,
            r#"{"theme": "dark", "mcpServers": {"mine": {"command": "x"}}}"#,
        )
        .unwrap();

        let merged = merge_servers(
            &path,
            McpLayout::Standard,
            "demo",
            &servers(json!({"github": {"command": "gh", "args": ["mcp"]}})),
        )
        .unwrap();
        assert!(merged);

        let config = read(&path);
        assert_eq!(config["theme"], "dark");
        assert_eq!(config["mcpServers"]["mine"]["command"], "x");
        assert_eq!(config["mcpServers"]["demo-github"]["args"][0], "mcp");
        assert!(std::fs::read_to_string(&path).unwrap().ends_with("}\n"));
    }

    #[test]
    fn malformed_config_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{broken").unwrap();
        assert!(!remove_servers(&path, McpLayout::Standard, &keys(&["demo-a"])).unwrap());
        merge_servers(&path, McpLayout::Standard, "demo", &servers(json!({"a": {}}))).unwrap();
        assert!(read(&path)["mcpServers"]["demo-a"].is_object());
    }

    #[test]
    fn empty_server_set_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".mcp.json");
        assert!(!merge_servers(&path, McpLayout::Standard, "demo", &Map::new()).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn remove_deletes_file_only_when_nothing_else_remains() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".mcp.json");
        merge_servers(&path, McpLayout::Standard, "a", &servers(json!({"s": {}}))).unwrap();
        merge_servers(&path, McpLayout::Standard, "b", &servers(json!({"s": {}}))).unwrap();

        assert!(remove_servers(&path, McpLayout::Standard, &keys(&["a-s"])).unwrap());
        let config = read(&path);
        assert!(config["mcpServers"].get("a-s").is_none());
        assert!(config["mcpServers"].get("b-s").is_some());

        assert!(remove_servers(&path, McpLayout::Standard, &keys(&["b-s"])).unwrap());
        assert!(!path.exists());

        let user = tmp.path().join(".claude.json");
        std::fs::write(&user, r#"{"projects": {}, "mcpServers": {"c-s": {}}}"#).unwrap();
        assert!(remove_servers(&user, McpLayout::Standard, &keys(&["c-s"])).unwrap());
        assert_eq!(read(&user), json!({"projects": {}, "mcpServers": {}}));
    }

    #[test]
    fn opencode_layout_converts_servers() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("opencode.json");
        merge_servers(
            &path,
            McpLayout::OpenCode,
            "demo",
            &servers(json!({
                "gh": {"command": "npx", "args": ["-y", "gh-mcp"], "env": {"TOKEN": "${GH_TOKEN}", "N": 3}}
            })),
        )
        .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with("{\n  \"$schema\""));
        let config = read(&path);
        assert_eq!(config["$schema"], OPENCODE_SCHEMA);
        assert_eq!(
            config["mcp"]["demo-gh"],
            json!({
                "type": "local",
                "command": ["npx", "-y", "gh-mcp"],
                "environment": {"TOKEN": "{env:GH_TOKEN}", "N": 3}
            })
        );

        assert!(remove_servers(&path, McpLayout::OpenCode, &keys(&["demo-gh"])).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn removal_spares_modules_sharing_a_name_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".mcp.json");
        merge_servers(&path, McpLayout::Standard, "foo-bar", &servers(json!({"b": {}}))).unwrap();
        merge_servers(&path, McpLayout::Standard, "foo", &servers(json!({"a": {}}))).unwrap();

        assert!(remove_servers(&path, McpLayout::Standard, &keys(&["foo-a"])).unwrap());
        let config = read(&path);
        assert!(config["mcpServers"].get("foo-a").is_none());
        assert!(config["mcpServers"]["foo-bar-b"].is_object());

        assert!(!remove_servers(&path, McpLayout::Standard, &keys(&["foo-a"])).unwrap());
        assert!(!remove_servers(&path, McpLayout::Standard, &[]).unwrap());
        assert!(path.is_file());
    }
}
