//! Classifying a source string and deriving a module name from it.

use std::path::Path;

use {lola_modules::SourceKind, url::Url};

/// Archive suffixes understood by the tar handlers, longest first.
pub const TAR_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar"];

const GIT_HOSTS: &[&str] = &["github.com", "gitlab.com", "bitbucket.org"];

fn tar_suffix(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    TAR_EXTENSIONS.iter().copied().find(|ext| lower.ends_with(ext))
}

fn is_git_host(host: &str) -> bool {
    GIT_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}

/// Work out what kind of source `source` is.
///
/// Archive URLs win over git hosting URLs so that a GitHub release tarball
/// is downloaded rather than cloned. Local archives and folders must exist.
pub fn detect_type(source: &str) -> Option<SourceKind> {
    if let Ok(url) = Url::parse(source) {
        match url.scheme() {
            "http" | "https" => {
                let path = url.path().to_ascii_lowercase();
                if path.ends_with(".zip") {
                    return Some(SourceKind::Zipurl);
                }
                if tar_suffix(&path).is_some() {
                    return Some(SourceKind::Tarurl);
                }
                if source.ends_with(".git") || url.host_str().is_some_and(is_git_host) {
                    return Some(SourceKind::Git);
                }
                return None;
            },
            "git" | "ssh" => return Some(SourceKind::Git),
            _ => {},
        }
    }

    if source.starts_with("git@") || source.ends_with(".git") {
        return Some(SourceKind::Git);
    }

    let path = Path::new(source);
    if path.is_file() {
        if source.to_ascii_lowercase().ends_with(".zip") {
            return Some(SourceKind::Zip);
        }
        if tar_suffix(source).is_some() {
            return Some(SourceKind::Tar);
        }
    }
    path.is_dir().then_some(SourceKind::Folder)
}

/// Strip a recognised archive suffix.
pub fn strip_archive_suffix(name: &str) -> &str {
    match tar_suffix(name) {
        Some(ext) => &name[..name.len() - ext.len()],
        None => name,
    }
}

/// Default module name for a source: its last path segment without
/// `.git` or archive suffixes. The result still needs validating.
pub fn derive_name(source: &str) -> String {
    let trimmed = source.trim_end_matches(['/', '\\']);
    let last = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string(),
        _ => trimmed
            .rsplit(['/', '\\', ':'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let last = last.strip_suffix(".git").unwrap_or(&last);
    strip_archive_suffix(last).to_string()
}
