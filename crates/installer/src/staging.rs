//! Per-root copies of module content.
//!
//! Generators read from the staged copy, not the global registry copy, so a
//! later `mod update` only reaches an installation through `lola update`.

use std::path::{Path, PathBuf};

use {
    lola_config::LolaHome,
    lola_modules::Module,
    lola_targets::{Root, copy_dir, remove_path},
};

use crate::error::Result;

/// Directory name for project-local state inside a project.
pub const PROJECT_STATE_DIR: &str = ".lola";

/// Where `module` is staged for installations under `root`.
pub fn staging_dir(home: &LolaHome, root: &Root, module: &str) -> PathBuf {
    match root {
        Root::Project(project) => project.join(PROJECT_STATE_DIR).join("modules").join(module),
        Root::User(_) => home.user_staging_dir().join(module),
    }
}

/// Replace `dest` with a fresh copy of the module directory.
pub fn stage(module: &Module, dest: &Path) -> Result<()> {
    if same_location(&module.path, dest) {
        return Ok(());
    }
    remove_path(dest)?;
    copy_dir(&module.path, dest)?;
    tracing::debug!(
        module = %module.name,
        path = %dest.display(),
        "staged module content"
    );
    Ok(())
}

/// Delete a staged copy. A symlink is unlinked without touching its target.
pub fn unstage(dest: &Path) -> Result<bool> {
    let removed = remove_path(dest)?;
    if removed {
        tracing::debug!(path = %dest.display(), "removed staged module copy");
    }
    Ok(removed)
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
