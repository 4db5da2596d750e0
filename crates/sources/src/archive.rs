//! Tarball extraction.

use std::{
    fs::File,
    io::Read,
    path::{Component, Path, PathBuf},
};

use crate::error::{Error, Result};

/// Extract a `.tar`, `.tar.gz` or `.tgz` archive into `dest`.
///
/// Symlink and hard-link entries are skipped; any entry that would land
/// outside `dest` aborts the extraction.
pub fn extract_tar(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let gzipped = !archive
        .to_string_lossy()
        .to_ascii_lowercase()
        .ends_with(".tar");
    if gzipped {
        unpack(tar::Archive::new(flate2::read::GzDecoder::new(file)), dest)
    } else {
        unpack(tar::Archive::new(file), dest)
    }
}

fn unpack<R: Read>(mut archive: tar::Archive<R>, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let canonical_dest = std::fs::canonicalize(dest)?;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        let path = entry.path()?.into_owned();
        if kind.is_symlink() || kind.is_hard_link() {
            tracing::warn!(path = %path.display(), "skipping link entry in archive");
            continue;
        }
        let Some(relative) = sanitize_archive_path(&path)? else {
            continue;
        };

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
            if !std::fs::canonicalize(parent)?.starts_with(&canonical_dest) {
                return Err(Error::unsafe_archive_path(&path));
            }
        }
        if let Ok(meta) = std::fs::symlink_metadata(&target)
            && meta.file_type().is_symlink()
        {
            return Err(Error::unsafe_archive_path(&path));
        }

        if kind.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            entry.unpack(&target)?;
        }
    }
    Ok(())
}

/// Normalise an entry path. `None` for entries naming the root itself.
fn sanitize_archive_path(path: &Path) -> Result<Option<PathBuf>> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::unsafe_archive_path(path));
            },
        }
    }
    Ok((!clean.as_os_str().is_empty()).then_some(clean))
}

/// The directory holding the module inside an extracted archive: the sole
/// top-level directory when there is exactly one entry, else `extracted`.
pub fn module_root(extracted: &Path) -> Result<PathBuf> {
    let mut entries = std::fs::read_dir(extracted)?
        .collect::<std::io::Result<Vec<_>>>()?;
    if entries.len() == 1 && entries[0].file_type()?.is_dir() {
        return Ok(entries.remove(0).path());
    }
    Ok(extracted.to_path_buf())
}
