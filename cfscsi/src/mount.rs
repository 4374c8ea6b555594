//! Mount primitives: mount point detection, the `cfs-client` mount and the
//! generic unmount.

use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::CsiError;

/// Mount-invocation capability used by the node lifecycle.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Whether `path` is a mount point.  A missing path is reported as an
    /// [`std::io::ErrorKind::NotFound`] error.
    async fn is_mount_point(&self, path: &Path) -> std::io::Result<bool>;

    /// Run the mount client against a generated configuration file and wait
    /// for it to finish.
    async fn mount(&self, config_path: &Path) -> Result<(), CsiError>;

    /// Unmount whatever is mounted at `target`.
    async fn unmount(&self, target: &Path) -> Result<(), CsiError>;
}

/// [`Mounter`] backed by the `cfs-client` binary and `umount(2)`.
#[derive(Debug, Clone)]
pub struct ClientMounter {
    binary: PathBuf,
    timeout: Duration,
}

impl ClientMounter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Mounter for ClientMounter {
    async fn is_mount_point(&self, path: &Path) -> std::io::Result<bool> {
        let meta = tokio::fs::metadata(path).await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let parent_meta = tokio::fs::metadata(parent).await?;
            if meta.dev() != parent_meta.dev() {
                return Ok(true);
            }
        }
        // Bind mounts from the same device share st_dev with their parent.
        Ok(listed_in_proc_mounts(path).await)
    }

    #[instrument(skip(self), fields(binary = %self.binary.display()))]
    async fn mount(&self, config_path: &Path) -> Result<(), CsiError> {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.arg("-c").arg(config_path).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                CsiError::Internal(format!(
                    "{} did not finish within {:?}",
                    self.binary.display(),
                    self.timeout
                ))
            })?
            .map_err(|e| CsiError::Internal(format!("spawn {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CsiError::Internal(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }
        debug!("mount client finished");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn unmount(&self, target: &Path) -> Result<(), CsiError> {
        let path = target.to_path_buf();
        let umount = tokio::task::spawn_blocking(move || nix::mount::umount(&path));
        tokio::time::timeout(self.timeout, umount)
            .await
            .map_err(|_| {
                CsiError::Internal(format!(
                    "umount {} did not finish within {:?}",
                    target.display(),
                    self.timeout
                ))
            })?
            .map_err(CsiError::internal)?
            .map_err(|e| CsiError::Internal(format!("umount {}: {e}", target.display())))
    }
}

/// Return `true` if `path` is listed as a mount point in `/proc/self/mounts`.
///
/// `/proc/self/mounts` escapes whitespace in paths (`\040`); orchestrator
/// target paths never contain whitespace, so plain comparison is enough.
async fn listed_in_proc_mounts(path: &Path) -> bool {
    let Some(path) = path.to_str() else {
        return false;
    };
    let contents = match tokio::fs::read_to_string("/proc/self/mounts").await {
        Ok(c) => c,
        Err(_) => return false,
    };
    // Format: <device> <mountpoint> <fstype> <options> <dump> <pass>
    contents
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(path))
}
