//! Node-side mount lifecycle.
//!
//! A target path is either *Unmounted* or *Mounted*.  The state is never
//! stored; it is read back from the kernel through [`Mounter::is_mount_point`]
//! on every call, which makes publish and unpublish safe to repeat.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::CsiError;
use crate::mount::Mounter;
use crate::mount_config::{MountConfig, config_path, find_configs};
use crate::types::{MountRequest, is_valid_volume_name};

/// Permissions of target directories created by [`MountManager::publish`].
const TARGET_DIR_MODE: u32 = 0o750;

/// Attaches and detaches volumes at local paths.
pub struct MountManager<M> {
    mounter: M,
    config_dir: PathBuf,
    log_dir: String,
}

impl<M: Mounter> MountManager<M> {
    pub fn new(mounter: M, config_dir: impl Into<PathBuf>, log_dir: impl Into<String>) -> Self {
        Self {
            mounter,
            config_dir: config_dir.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Mount `req.volume_name` at `req.target_path`.
    ///
    /// A target that is already a mount point is accepted as is, without
    /// checking which volume is mounted there.  If the mount client fails,
    /// the configuration written for it is removed again.
    #[instrument(skip(self, req), fields(target = %req.target_path, volume = %req.volume_name))]
    pub async fn publish(&self, req: &MountRequest) -> Result<(), CsiError> {
        if !is_valid_volume_name(&req.volume_name) {
            return Err(CsiError::InvalidArgument(format!(
                "invalid volume name {:?}",
                req.volume_name
            )));
        }
        let target = Path::new(&req.target_path);
        let mounted = match self.mounter.is_mount_point(target).await {
            Ok(mounted) => mounted,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                create_target_dir(target).await?;
                false
            }
            Err(e) => {
                return Err(CsiError::Internal(format!(
                    "probe {}: {e}",
                    req.target_path
                )));
            }
        };

        if mounted {
            self.warn_on_foreign_mount(req).await;
            debug!("target already mounted, assuming idempotent retry");
            return Ok(());
        }

        if req.read_only || !req.mount_flags.is_empty() {
            debug!(
                read_only = req.read_only,
                flags = ?req.mount_flags,
                "mount options are not part of the client configuration"
            );
        }

        let cfg_path = config_path(&self.config_dir, &req.volume_name, &req.target_path);
        MountConfig::from_request(req, &self.log_dir)
            .write_to(&cfg_path)
            .await?;
        if let Err(e) = self.mounter.mount(&cfg_path).await {
            remove_config(&cfg_path).await;
            return Err(e);
        }

        info!(config = %cfg_path.display(), "volume published");
        Ok(())
    }

    /// Unmount `target_path`.
    ///
    /// Fails with [`CsiError::NotFound`] when the path is missing or nothing
    /// is mounted there.
    #[instrument(skip(self))]
    pub async fn unpublish(&self, target_path: &str) -> Result<(), CsiError> {
        let target = Path::new(target_path);
        match self.mounter.is_mount_point(target).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(CsiError::NotFound(format!(
                    "volume not mounted at {target_path}"
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CsiError::NotFound(format!(
                    "target path {target_path} not found"
                )));
            }
            Err(e) => return Err(CsiError::Internal(format!("probe {target_path}: {e}"))),
        }

        self.mounter.unmount(target).await?;

        for cfg in find_configs(&self.config_dir, target_path).await {
            remove_config(&cfg).await;
        }
        if let Err(e) = tokio::fs::remove_dir(target).await {
            warn!(error = %e, "failed to remove target directory");
        }

        info!("volume unpublished");
        Ok(())
    }

    /// Log when the configuration recorded for this target names another
    /// volume than the one being published.
    async fn warn_on_foreign_mount(&self, req: &MountRequest) {
        let mut recorded = Vec::new();
        for path in find_configs(&self.config_dir, &req.target_path).await {
            if let Ok(cfg) = MountConfig::read_from(&path).await {
                recorded.push(cfg.volname);
            }
        }
        if !recorded.is_empty() && !recorded.contains(&req.volume_name) {
            warn!(
                mounted = ?recorded,
                requested = %req.volume_name,
                "target is mounted with a different volume"
            );
        }
    }
}

async fn remove_config(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(config = %path.display(), error = %e, "failed to remove client config");
    }
}

async fn create_target_dir(target: &Path) -> Result<(), CsiError> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true).mode(TARGET_DIR_MODE);
    builder
        .create(target)
        .await
        .map_err(|e| CsiError::Internal(format!("create {}: {e}", target.display())))
}
