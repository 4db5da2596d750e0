//! YAML frontmatter reader.
//!
//! Parsing never fails: a document without frontmatter or with frontmatter
//! that does not parse still yields its body, and the outcome is reported
//! through [`Frontmatter`] instead of an error.

use std::path::Path;

use serde_yaml::{Mapping, Value};

/// Outcome of reading the `---` delimited header of a markdown document.
#[derive(Debug, Clone, PartialEq)]
pub enum Frontmatter {
    /// A well-formed mapping (possibly empty).
    Present(Mapping),
    /// The document does not start with `---`.
    Missing,
    /// A header exists but is unclosed, not YAML, or not a mapping.
    Malformed(String),
}

/// A markdown document split into frontmatter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub body: String,
}

impl Document {
    /// The metadata mapping, or `None` when missing or malformed.
    pub fn metadata(&self) -> Option<&Mapping> {
        match &self.frontmatter {
            Frontmatter::Present(map) => Some(map),
            _ => None,
        }
    }

    /// Metadata as an owned mapping; empty when missing or malformed.
    pub fn into_metadata(self) -> (Mapping, String) {
        match self.frontmatter {
            Frontmatter::Present(map) => (map, self.body),
            _ => (Mapping::new(), self.body),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata()?.get(key)
    }

    /// A string field, `None` if absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// A string field that is present and non-blank.
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|s| !s.trim().is_empty())
    }
}

/// Split `content` into frontmatter and body.
pub fn parse(content: &str) -> Document {
    let trimmed = content.trim_start();
    let Some(after_open) = trimmed.strip_prefix("---") else {
        return missing(content);
    };
    let Some((first_line, rest)) = after_open.split_once('\n') else {
        return malformed(content, "missing closing --- for frontmatter");
    };
    if !first_line.trim().is_empty() {
        // `----` or `--- text` is not a frontmatter delimiter.
        return missing(content);
    }

    let mut header_len = 0;
    let mut body_start = None;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            body_start = Some(header_len + line.len());
            break;
        }
        header_len += line.len();
    }
    let Some(body_start) = body_start else {
        return malformed(content, "missing closing --- for frontmatter");
    };

    let header = &rest[..header_len];
    let body = rest[body_start..].trim_start_matches(['\r', '\n']).to_string();

    if header.trim().is_empty() {
        return Document {
            frontmatter: Frontmatter::Present(Mapping::new()),
            body,
        };
    }
    let frontmatter = match serde_yaml::from_str::<Value>(header) {
        Ok(Value::Mapping(map)) => Frontmatter::Present(map),
        Ok(Value::Null) => Frontmatter::Present(Mapping::new()),
        Ok(_) => Frontmatter::Malformed("frontmatter is not a mapping".into()),
        Err(e) => Frontmatter::Malformed(e.to_string()),
    };
    Document { frontmatter, body }
}

/// Read and parse a file. Only I/O failures are errors.
pub fn read(path: &Path) -> std::io::Result<Document> {
    Ok(parse(&std::fs::read_to_string(path)?))
}

/// Render a mapping and body back into a frontmatter document.
pub fn render(metadata: &Mapping, body: &str) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(metadata)?;
    Ok(format!("---\n{}\n---\n{body}", yaml.trim_end()))
}

fn missing(content: &str) -> Document {
    Document {
        frontmatter: Frontmatter::Missing,
        body: content.to_string(),
    }
}

fn malformed(content: &str, reason: &str) -> Document {
    Document {
        frontmatter: Frontmatter::Malformed(reason.to_string()),
        body: content.to_string(),
    }
}
