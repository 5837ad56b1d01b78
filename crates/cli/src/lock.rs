use anyhow::{Context, Result, bail};
use autopush_api_client::Repository;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Advisory per-repository lock held for the duration of one push.
///
/// The pipeline itself never serializes pushes; this lock keeps two
/// invocations of this CLI from racing on the same branch. It is released on
/// drop. A lock whose recorded PID is no longer running is reclaimed.
#[derive(Debug)]
pub struct PushLock {
    path: PathBuf,
}

impl PushLock {
    pub fn acquire(dir: &Path, repository: &Repository) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(format!("push-{}.lock", repository.slug()));

        let mut file = match create_exclusive(&path)? {
            Some(file) => file,
            None => {
                let holder = read_pid(&path);
                match holder {
                    Some(pid) if !is_process_running(pid) => {
                        info!("Removing stale push lock {} (PID {pid})", path.display());
                        // Stale lock, clean up
                        match std::fs::remove_file(&path) {
                            Ok(()) => {}
                            Err(e) if e.kind() == ErrorKind::NotFound => {}
                            Err(e) => {
                                return Err(e).with_context(|| {
                                    format!("Failed to remove stale lock {}", path.display())
                                });
                            }
                        }
                        match create_exclusive(&path)? {
                            Some(file) => file,
                            None => bail!(busy_message(repository, None, &path)),
                        }
                    }
                    _ => bail!(busy_message(repository, holder, &path)),
                }
            }
        };
        write!(file, "{}", std::process::id())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Push lock acquired: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PushLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Could not remove push lock {}: {e}", self.path.display());
        }
    }
}

/// `None` when the file already exists.
fn create_exclusive(path: &Path) -> Result<Option<File>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to create {}", path.display())),
    }
}

/// PID recorded in a lock file. A lock still being written reads as `None`
/// and is treated as held.
fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn busy_message(repository: &Repository, pid: Option<u32>, path: &Path) -> String {
    let holder = pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string());
    format!(
        "another push for {repository} is already running (pid {holder}, lock file {})",
        path.display()
    )
}

fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };
        // SAFETY: signal 0 performs only the existence and permission check.
        let rc = unsafe { libc::kill(pid, 0) };
        // EPERM: the process exists but belongs to another user.
        rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
    #[cfg(not(unix))]
    {
        std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/NH"])
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
            .unwrap_or(true)
    }
}
