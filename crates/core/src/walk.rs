use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{PushError, Result};

/// A regular file under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeEntry {
    /// Forward-slash path relative to the root, no leading slash.
    pub path: String,
    /// Where to read the content from.
    pub absolute: PathBuf,
}

/// Fail unless `root` is an existing, listable directory.
pub fn ensure_source_root(root: &Path) -> Result<()> {
    let meta = fs::metadata(root).map_err(PushError::filesystem(root))?;
    if !meta.is_dir() {
        return Err(PushError::filesystem(root)(io::Error::new(
            io::ErrorKind::NotADirectory,
            "source folder is not a directory",
        )));
    }
    fs::read_dir(root).map_err(PushError::filesystem(root))?;
    Ok(())
}

/// Every regular file under `root`, directories visited before their children.
///
/// Symlinks and other non-regular entries fail the walk instead of being
/// skipped, so a push never publishes a partial snapshot.
pub fn walk(root: &Path) -> Result<Vec<RelativeEntry>> {
    ensure_source_root(root)?;
    let mut out = Vec::new();
    walk_dir(root, root, &mut out)?;
    debug!(root = %root.display(), files = out.len(), "walked source folder");
    Ok(out)
}

fn walk_dir(root: &Path, dir: &Path, out: &mut Vec<RelativeEntry>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .map_err(PushError::filesystem(dir))?
        .collect::<io::Result<Vec<_>>>()
        .map_err(PushError::filesystem(dir))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(PushError::filesystem(&path))?;

        if file_type.is_dir() {
            walk_dir(root, &path, out)?;
        } else if file_type.is_file() {
            out.push(RelativeEntry {
                path: relative_path(root, &path)?,
                absolute: path,
            });
        } else {
            return Err(PushError::UnsupportedEntry { path });
        }
    }
    Ok(())
}

/// [`ensure_source_root`] on the blocking pool.
pub async fn check_source_root(root: &Path) -> Result<()> {
    on_blocking_pool(root, ensure_source_root).await
}

/// [`walk`] on the blocking pool; directory listing is synchronous I/O.
pub async fn walk_source(root: &Path) -> Result<Vec<RelativeEntry>> {
    on_blocking_pool(root, walk).await
}

async fn on_blocking_pool<T, F>(root: &Path, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
    let owned = root.to_path_buf();
    match tokio::task::spawn_blocking(move || f(&owned)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(PushError::filesystem(root)(io::Error::other(e))),
    }
}

/// Strip the root prefix and join the remaining components with `/`.
pub fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        PushError::filesystem(path)(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path is outside source folder {}", root.display()),
        ))
    })?;

    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    PushError::filesystem(path)(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "path is not valid UTF-8",
                    ))
                })?;
                segments.push(name.replace('\\', "/"));
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(PushError::filesystem(path)(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path escapes source folder",
                )));
            }
        }
    }
    Ok(segments.join("/").trim_start_matches('/').to_string())
}
