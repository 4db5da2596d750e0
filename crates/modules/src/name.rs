use crate::error::{Error, Result};

/// Reject names that would escape or alias a directory when joined onto a path.
///
/// Module and marketplace names are interpolated directly into destination
/// paths, so this runs before anything touches the filesystem.
pub fn validate_module_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "name cannot be empty"));
    }
    if name == "." || name == ".." {
        return Err(Error::invalid_name(name, "path traversal is not allowed"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::invalid_name(
            name,
            "path separators are not allowed",
        ));
    }
    if name.starts_with('.') {
        return Err(Error::invalid_name(name, "name cannot start with '.'"));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid_name(
            name,
            "control characters are not allowed",
        ));
    }
    Ok(())
}
