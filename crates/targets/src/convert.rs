//! Content conversion between the module source format and assistant formats.

use std::sync::LazyLock;

use {
    lola_modules::frontmatter,
    regex::{Captures, Regex},
    serde::Serialize,
    serde_yaml::Value,
};

use crate::error::Result;

// Literal patterns; compiling them cannot fail.
#[allow(clippy::unwrap_used)]
static POSITIONAL_ARG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").unwrap());

#[allow(clippy::unwrap_used)]
static PARENT_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\s|^|"|'|\(|`)(\.\./[^\s"')\]`]+)"#).unwrap());

#[allow(clippy::unwrap_used)]
static DOT_RELATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\s|^|"|'|\(|`)(\./([^\s"')\]`]+))"#).unwrap());

/// Whether a prompt uses `$1`-style positional placeholders.
pub fn has_positional_args(content: &str) -> bool {
    POSITIONAL_ARG.is_match(content)
}

/// Convert `$ARGUMENTS` to gemini's `{{args}}`.
///
/// Positional placeholders cannot be bound by gemini, so they stay in the body
/// and an `Arguments: {{args}}` line is prepended for the model to read.
pub fn gemini_args(content: &str) -> String {
    let result = content.replace("$ARGUMENTS", "{{args}}");
    if has_positional_args(&result) {
        format!("Arguments: {{{{args}}}}\n\n{result}")
    } else {
        result
    }
}

/// Point `./x` and `../x` references in a skill body at `assets`.
pub fn rewrite_relative_paths(content: &str, assets: &str) -> String {
    let result = PARENT_RELATIVE.replace_all(content, |caps: &Captures<'_>| {
        format!("{}{assets}/{}", &caps[1], &caps[2])
    });
    let result = DOT_RELATIVE.replace_all(&result, |caps: &Captures<'_>| {
        format!("{}{assets}/{}", &caps[1], &caps[3])
    });
    collapse_slashes(&result)
}

/// Collapse runs of `/` unless they follow a `:` (URL schemes).
fn collapse_slashes(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut prev = None;
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' && prev != Some(':') {
            while chars.peek() == Some(&'/') {
                chars.next();
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Cursor rule frontmatter. The description goes through the YAML emitter
/// so `: `, `#` and quotes survive.
fn mdc_header(description: &str, always_apply: bool) -> Result<String> {
    let description = serde_yaml::to_string(description)?;
    Ok(format!(
        "---\ndescription: {}\nglobs:\nalwaysApply: {always_apply}\n---\n\n",
        description.trim_end()
    ))
}

/// Render a SKILL.md as a cursor `.mdc` rule.
pub fn skill_to_mdc(skill_md: &str, assets: Option<&str>) -> Result<String> {
    let doc = frontmatter::parse(skill_md);
    let header = mdc_header(doc.get_str("description").unwrap_or_default(), false)?;
    let body = match assets {
        Some(assets) => rewrite_relative_paths(&doc.body, assets),
        None => doc.body,
    };
    Ok(format!("{header}{body}"))
}

/// Render module instructions as an always-applied cursor rule.
pub fn instructions_to_mdc(module: &str, instructions: &str) -> Result<String> {
    let header = mdc_header(&format!("{module} module instructions"), true)?;
    Ok(format!("{header}{instructions}"))
}

#[derive(Serialize)]
struct GeminiCommand<'a> {
    description: &'a str,
    prompt: &'a str,
}

/// Render a markdown command as a gemini `.toml` command.
pub fn command_to_gemini_toml(command_md: &str) -> Result<String> {
    let doc = frontmatter::parse(command_md);
    let description = doc.get_str("description").unwrap_or_default();
    let prompt = gemini_args(&doc.body);
    Ok(toml::to_string(&GeminiCommand {
        description,
        prompt: prompt.trim_end(),
    })?)
}

/// Rewrite an agent's frontmatter.
///
/// `set` fields always overwrite, `defaults` only fill in missing keys.
/// A file without usable frontmatter gets a fresh header.
pub fn rewrite_agent(
    agent_md: &str,
    set: &[(&str, &str)],
    defaults: &[(&str, &str)],
) -> Result<String> {
    let (mut meta, body) = frontmatter::parse(agent_md).into_metadata();
    for (key, value) in set {
        meta.insert(Value::from(*key), Value::from(*value));
    }
    for (key, value) in defaults {
        let key = Value::from(*key);
        if !meta.contains_key(&key) {
            meta.insert(key, Value::from(*value));
        }
    }
    Ok(frontmatter::render(&meta, &body)?)
}
