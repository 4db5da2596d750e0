//! Marker-delimited sections lola owns inside shared markdown files.
//!
//! Everything outside the markers belongs to the user and is never touched.
//! Two sections exist: the skills listing (one `### <module>` block per
//! module, in installation order) and the instructions section (one
//! `<!-- lola:module:NAME:start -->` block per module, sorted by name).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{assistant::Root, error::Result};

pub const SKILLS_START: &str = "<!-- lola:skills:start -->";
pub const SKILLS_END: &str = "<!-- lola:skills:end -->";
pub const INSTRUCTIONS_START: &str = "<!-- lola:instructions:start -->";
pub const INSTRUCTIONS_END: &str = "<!-- lola:instructions:end -->";

const SKILLS_HEADER: &str = "## Lola Skills

These skills are installed by Lola and provide specialized capabilities.
When a task matches a skill's description, read the skill's SKILL.md file
to learn the detailed instructions and workflows.

**How to use skills:**
1. Check if your task matches any skill description below
2. Use `read_file` to read the skill's SKILL.md for detailed instructions
3. Follow the instructions in the SKILL.md file

";

/// One skill listed in a managed skills section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillEntry {
    /// Final installed name.
    pub name: String,
    pub description: String,
    /// Directory holding the skill's SKILL.md.
    pub dir: PathBuf,
}

/// Byte range of a marker pair and the content between them.
struct Section {
    start: usize,
    end: usize,
    inner_start: usize,
    inner_end: usize,
}

fn find_section(content: &str, start_marker: &str, end_marker: &str) -> Option<Section> {
    let start = content.find(start_marker)?;
    let inner_start = start + start_marker.len();
    let inner_end = inner_start + content[inner_start..].find(end_marker)?;
    Some(Section {
        start,
        end: inner_end + end_marker.len(),
        inner_start,
        inner_end,
    })
}

fn append_section(content: &str, section: &str) -> String {
    let head = content.trim_end();
    if head.is_empty() {
        section.to_string()
    } else {
        format!("{head}\n\n{section}")
    }
}

/// Drop a section and the blank lines before it. `header` is dropped too
/// when it directly precedes the section.
fn strip_section(content: &str, section: &Section, header: Option<&str>) -> String {
    let mut prefix = &content[..section.start];
    if let Some(header) = header {
        prefix = prefix.strip_suffix(header).unwrap_or(prefix);
    }
    format!(
        "{}{}",
        prefix.trim_end_matches('\n'),
        &content[section.end..]
    )
}

// ── Skills section ──────────────────────────────────────────────────────────

/// Render a module's `### <module>` block.
pub fn skills_block(module: &str, skills: &[SkillEntry], root: &Root) -> String {
    let mut block = format!("\n### {module}\n\n");
    for skill in skills {
        let path = root.display_path(&skill.dir).join(lola_config::SKILL_FILE);
        block.push_str(&format!(
            "#### {}\n**When to use:** {}\n**Instructions:** Read `{}` for detailed guidance.\n\n",
            skill.name,
            skill.description,
            path.display()
        ));
    }
    block
}

/// Byte ranges of each `### ` heading line inside a section body, keyed by
/// module name, in document order.
fn module_headings(inner: &str) -> Vec<(String, usize)> {
    let mut offset = 0;
    let mut headings = Vec::new();
    for line in inner.split_inclusive('\n') {
        if let Some(name) = line.strip_prefix("### ") {
            headings.push((name.trim_end_matches(['\r', '\n']).to_string(), offset));
        }
        offset += line.len();
    }
    headings
}

/// Span of `module`'s block: from its heading to the next heading or the end.
fn module_span(inner: &str, module: &str) -> Option<(usize, usize, bool)> {
    let headings = module_headings(inner);
    let idx = headings.iter().position(|(name, _)| name == module)?;
    let start = headings[idx].1;
    match headings.get(idx + 1) {
        Some((_, next)) => Some((start, *next, true)),
        None => Some((start, inner.len(), false)),
    }
}

/// Insert or replace `module`'s block, leaving every other block as is.
pub fn upsert_skills(content: &str, module: &str, block: &str) -> String {
    let Some(section) = find_section(content, SKILLS_START, SKILLS_END) else {
        return append_section(
            content,
            &format!("{SKILLS_HEADER}{SKILLS_START}\n{block}{SKILLS_END}\n"),
        );
    };
    let inner = &content[section.inner_start..section.inner_end];
    let new_inner = match module_span(inner, module) {
        Some((start, end, followed)) => {
            let body = block.strip_prefix('\n').unwrap_or(block);
            let sep = if followed { "\n" } else { "" };
            format!("{}{body}{sep}{}", &inner[..start], &inner[end..])
        },
        None => format!("{inner}{block}"),
    };
    format!(
        "{}{new_inner}{}",
        &content[..section.inner_start],
        &content[section.inner_end..]
    )
}

/// Remove `module`'s block. `None` when there is nothing to remove.
///
/// The whole section, header included, goes once no block is left.
pub fn remove_skills(content: &str, module: &str) -> Option<String> {
    let section = find_section(content, SKILLS_START, SKILLS_END)?;
    let inner = &content[section.inner_start..section.inner_end];
    let (start, end, _) = module_span(inner, module)?;
    let new_inner = format!("{}{}", &inner[..start], &inner[end..]);
    if module_headings(&new_inner).is_empty() {
        return Some(strip_section(content, &section, Some(SKILLS_HEADER)));
    }
    Some(format!(
        "{}{new_inner}{}",
        &content[..section.inner_start],
        &content[section.inner_end..]
    ))
}

// ── Instructions section ────────────────────────────────────────────────────

fn module_markers(module: &str) -> (String, String) {
    (
        format!("<!-- lola:module:{module}:start -->"),
        format!("<!-- lola:module:{module}:end -->"),
    )
}

/// Every well-formed module block in a section body.
fn instruction_blocks(inner: &str) -> BTreeMap<String, String> {
    const PREFIX: &str = "<!-- lola:module:";
    const START_SUFFIX: &str = ":start -->";
    let mut blocks = BTreeMap::new();
    let mut rest = inner;
    while let Some(pos) = rest.find(PREFIX) {
        let candidate = &rest[pos..];
        let after = &candidate[PREFIX.len()..];
        let Some(name_end) = after.find(START_SUFFIX) else {
            break;
        };
        let name = &after[..name_end];
        if name.contains(':') || name.contains('\n') {
            rest = after;
            continue;
        }
        let (_, end_marker) = module_markers(name);
        match candidate.find(&end_marker) {
            Some(end) => {
                let block_end = end + end_marker.len();
                blocks.insert(name.to_string(), candidate[..block_end].trim().to_string());
                rest = &candidate[block_end..];
            },
            None => rest = after,
        }
    }
    blocks
}

fn render_instructions(blocks: &BTreeMap<String, String>) -> String {
    let joined: Vec<&str> = blocks.values().map(String::as_str).collect();
    format!("{INSTRUCTIONS_START}\n{}\n{INSTRUCTIONS_END}", joined.join("\n\n"))
}

/// Insert or replace `module`'s instructions, keeping blocks sorted by name.
pub fn upsert_instructions(content: &str, module: &str, instructions: &str) -> String {
    let (start, end) = module_markers(module);
    let block = format!("{start}\n{}\n{end}", instructions.trim());
    let Some(section) = find_section(content, INSTRUCTIONS_START, INSTRUCTIONS_END) else {
        return append_section(
            content,
            &format!("{INSTRUCTIONS_START}\n{block}\n{INSTRUCTIONS_END}\n"),
        );
    };
    let mut blocks = instruction_blocks(&content[section.inner_start..section.inner_end]);
    blocks.insert(module.to_string(), block);
    format!(
        "{}{}{}",
        &content[..section.start],
        render_instructions(&blocks),
        &content[section.end..]
    )
}

/// Remove `module`'s instructions. `None` when there is nothing to remove.
pub fn remove_instructions(content: &str, module: &str) -> Option<String> {
    let section = find_section(content, INSTRUCTIONS_START, INSTRUCTIONS_END)?;
    let mut blocks = instruction_blocks(&content[section.inner_start..section.inner_end]);
    blocks.remove(module)?;
    if blocks.is_empty() {
        return Some(strip_section(content, &section, None));
    }
    Some(format!(
        "{}{}{}",
        &content[..section.start],
        render_instructions(&blocks),
        &content[section.end..]
    ))
}

// ── File helpers ────────────────────────────────────────────────────────────

/// Apply `edit` to the file at `path`, creating it when missing.
pub(crate) fn edit_file(path: &Path, edit: impl FnOnce(&str) -> String) -> Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, edit(&content))?;
    Ok(())
}

/// Apply a removal to the file at `path`. A file left with nothing but
/// whitespace is deleted. Returns whether anything changed.
pub(crate) fn remove_from_file(
    path: &Path,
    remove: impl FnOnce(&str) -> Option<String>,
) -> Result<bool> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let Some(updated) = remove(&content) else {
        return Ok(false);
    };
    if updated.trim().is_empty() {
        std::fs::remove_file(path)?;
        tracing::debug!(path = %path.display(), "removed emptied managed file");
    } else {
        std::fs::write(path, updated)?;
    }
    Ok(true)
}
