//! Fetching module sources into the module registry.

use std::{
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};

use {
    lola_modules::{Module, SourceInfo, SourceKind, validate_module_name},
    url::Url,
};

use crate::{
    archive,
    detect::{derive_name, detect_type, strip_archive_suffix},
    error::{Error, Result},
};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetch `source` into `dest_dir/<name>` and return that directory.
///
/// `name` overrides the name derived from the source. An existing directory
/// of the same name is replaced.
pub fn fetch(source: &str, dest_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let kind = detect_type(source).ok_or_else(|| Error::unrecognized(source))?;
    fetch_kind(kind, source, dest_dir, name)
}

/// Fetch `source` with an already known kind.
pub fn fetch_kind(
    kind: SourceKind,
    source: &str,
    dest_dir: &Path,
    name: Option<&str>,
) -> Result<PathBuf> {
    if let Some(name) = name {
        validate_module_name(name)?;
    }
    std::fs::create_dir_all(dest_dir)?;
    let fetched = match kind {
        SourceKind::Git => fetch_git(source, dest_dir, name)?,
        SourceKind::Folder => fetch_folder(source, dest_dir, name)?,
        SourceKind::Tar => fetch_archive(Path::new(source), dest_dir, name)?,
        SourceKind::Tarurl => fetch_tar_url(source, dest_dir, name)?,
        SourceKind::Zip | SourceKind::Zipurl => return Err(Error::UnsupportedType { kind }),
    };
    tracing::info!(%kind, source, path = %fetched.display(), "fetched module source");
    Ok(fetched)
}

/// Fetch a new module into `modules_dir` and record where it came from.
///
/// The fetch happens in a scratch directory first, so a source that does not
/// hold a valid module never replaces an existing registered copy.
pub fn add_module(source: &str, modules_dir: &Path, name: Option<&str>) -> Result<Module> {
    let kind = detect_type(source).ok_or_else(|| Error::unrecognized(source))?;
    let dir = replace_module(kind, source, modules_dir, name)?;
    SourceInfo::new(source, kind).save(&dir)?;
    Module::load(&dir).ok_or_else(|| Error::NotAModule {
        location: source.to_string(),
    })
}

/// Re-fetch a registered module from its recorded source.
pub fn update_module(module_dir: &Path) -> Result<SourceInfo> {
    let name = module_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let info = SourceInfo::load(module_dir)?.ok_or_else(|| Error::NoSourceInfo {
        module: name.clone(),
    })?;
    if info.kind.is_local() && !Path::new(&info.source).exists() {
        return Err(Error::SourceMissing {
            path: PathBuf::from(&info.source),
        });
    }
    let parent = module_dir.parent().unwrap_or(Path::new("."));
    let dir = replace_module(info.kind, &info.source, parent, Some(&name))?;
    info.save(&dir)?;
    Ok(info)
}

fn replace_module(
    kind: SourceKind,
    source: &str,
    modules_dir: &Path,
    name: Option<&str>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(modules_dir)?;
    let scratch = tempfile::Builder::new()
        .prefix(".fetch-")
        .tempdir_in(modules_dir)?;
    let fetched = fetch_kind(kind, source, scratch.path(), name)?;
    if Module::load(&fetched).is_none() {
        return Err(Error::NotAModule {
            location: source.to_string(),
        });
    }

    let Some(dir_name) = fetched.file_name() else {
        return Err(Error::unrecognized(source));
    };
    let dest = modules_dir.join(dir_name);
    remove_dir(&dest)?;
    std::fs::rename(&fetched, &dest)?;
    Ok(dest)
}

fn remove_dir(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path)?,
        Ok(_) => std::fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Resolve the final name and clear its destination.
fn prepare_dest(dest_dir: &Path, name: &str) -> Result<PathBuf> {
    validate_module_name(name)?;
    let dest = dest_dir.join(name);
    remove_dir(&dest)?;
    Ok(dest)
}

// ── Handlers ────────────────────────────────────────────────────────────────

fn fetch_git(url: &str, dest_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let name = name.map_or_else(|| derive_name(url), str::to_string);
    let dest = prepare_dest(dest_dir, &name)?;

    let output = Command::new("git")
        .args(["clone", "--depth", "1", url])
        .arg(&dest)
        .output()?;
    if !output.status.success() {
        return Err(Error::Git {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    remove_dir(&dest.join(".git"))?;
    Ok(dest)
}

fn fetch_folder(source: &str, dest_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let src = std::fs::canonicalize(source)?;
    let name = match name {
        Some(name) => name.to_string(),
        None => src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let dest = prepare_dest(dest_dir, &name)?;
    copy_tree(&src, &dest)?;
    Ok(dest)
}

fn fetch_archive(archive: &Path, dest_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let scratch = tempfile::tempdir()?;
    let extracted = scratch.path().join("extracted");
    archive::extract_tar(archive, &extracted)?;
    let root = archive::module_root(&extracted)?;

    let name = match name {
        Some(name) => name.to_string(),
        None if root != extracted => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        None => {
            let file = archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            strip_archive_suffix(&file).to_string()
        },
    };
    let dest = prepare_dest(dest_dir, &name)?;
    copy_tree(&root, &dest)?;
    Ok(dest)
}

fn fetch_tar_url(url: &str, dest_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let file_name = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.rfind(|s| !s.is_empty()))
                .map(str::to_string)
        })
        .unwrap_or_else(|| "module.tar.gz".to_string());

    let scratch = tempfile::tempdir()?;
    let archive = scratch.path().join(&file_name);
    download(url, &archive)?;
    fetch_archive(&archive, dest_dir, name)
}

fn download(url: &str, dest: &Path) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .user_agent(concat!("lola/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    let bytes = response.bytes()?;
    std::fs::write(dest, &bytes)?;
    tracing::debug!(url, bytes = bytes.len(), "downloaded archive");
    Ok(())
}

/// Copy a source tree, leaving out a top-level `.git` directory.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let walker = walkdir::WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() != 1 || e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
