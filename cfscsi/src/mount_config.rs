//! `cfs-client` configuration files.
//!
//! The mount client is started with `-c <file>` where `<file>` is a JSON
//! document holding the mount point, volume name, master list and log
//! directory.  One file exists per (volume, target path) pair so concurrent
//! publishes never overwrite each other's configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::CsiError;
use crate::types::MountRequest;

/// Default directory holding generated client configurations.
pub const DEFAULT_CONFIG_DIR: &str = "/etc/cfs";

/// Default log directory handed to the mount client.
pub const DEFAULT_LOG_DIR: &str = "/export/Logs/cfs/client/";

/// Contents of a `cfs-client` configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    pub mountpoint: String,
    pub volname: String,
    /// Comma-joined master addresses, in create-time order.
    pub master: String,
    pub logpath: String,
}

impl MountConfig {
    pub fn from_request(req: &MountRequest, log_dir: &str) -> Self {
        Self {
            mountpoint: req.target_path.clone(),
            volname: req.volume_name.clone(),
            master: req.masters.join(","),
            logpath: log_dir.to_owned(),
        }
    }

    /// Indented JSON as the mount client expects it.
    pub fn to_json(&self) -> Result<String, CsiError> {
        serde_json::to_string_pretty(self).map_err(CsiError::internal)
    }

    /// Write the configuration to `path`, replacing any previous content.
    ///
    /// The file is written next to its final location and renamed into
    /// place, so the mount client never reads a half-written file.
    pub async fn write_to(&self, path: &Path) -> Result<(), CsiError> {
        let json = self.to_json()?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                CsiError::Internal(format!("create config dir {}: {e}", dir.display()))
            })?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CsiError::Internal(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| CsiError::Internal(format!("rename {}: {e}", path.display())))?;
        debug!(path = %path.display(), volname = %self.volname, "client config written");
        Ok(())
    }

    /// Read back a configuration written by [`Self::write_to`].
    pub async fn read_from(path: &Path) -> Result<Self, CsiError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CsiError::Internal(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&json).map_err(CsiError::internal)
    }
}

/// Location of the configuration file for a volume mounted at
/// `target_path`: `<config_dir>/<volname>-<digest>.json`, where the digest is
/// the first 16 hex digits of the target path's SHA-256.
pub fn config_path(config_dir: &Path, volume_name: &str, target_path: &str) -> PathBuf {
    config_dir.join(format!("{volume_name}-{}.json", target_digest(target_path)))
}

fn target_digest(target_path: &str) -> String {
    let digest = Sha256::digest(target_path.as_bytes());
    hex::encode(&digest[..8])
}

/// Every configuration file written for `target_path`, whatever volume it
/// belongs to, in file name order.
pub async fn find_configs(config_dir: &Path, target_path: &str) -> Vec<PathBuf> {
    let suffix = format!("-{}.json", target_digest(target_path));
    let mut found = Vec::new();
    let Ok(mut dir) = tokio::fs::read_dir(config_dir).await else {
        return found;
    };
    while let Ok(Some(entry)) = dir.next_entry().await {
        let path = entry.path();
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&suffix))
        {
            found.push(path);
        }
    }
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target: &str, volume: &str) -> MountRequest {
        MountRequest {
            target_path: target.to_owned(),
            volume_name: volume.to_owned(),
            masters: vec![
                "10.0.0.2:80".to_owned(),
                "10.0.0.1:80".to_owned(),
                "10.0.0.3:80".to_owned(),
            ],
            read_only: false,
            mount_flags: Vec::new(),
        }
    }

    #[test]
    fn json_has_exactly_the_client_keys() {
        let cfg = MountConfig::from_request(&request("/mnt/a", "pvc-1"), DEFAULT_LOG_DIR);
        let value: serde_json::Value = serde_json::from_str(&cfg.to_json().unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["logpath", "master", "mountpoint", "volname"]);
        assert_eq!(obj["master"], "10.0.0.2:80,10.0.0.1:80,10.0.0.3:80");
        assert_eq!(obj["mountpoint"], "/mnt/a");
        assert_eq!(obj["logpath"], DEFAULT_LOG_DIR);
        assert!(cfg.to_json().unwrap().contains('\n'));
    }

    #[test]
    fn paths_are_scoped_per_volume_and_target() {
        let dir = Path::new("/etc/cfs");
        let a = config_path(dir, "pvc-1", "/var/lib/kubelet/pods/a/volumes/pvc-1");
        let b = config_path(dir, "pvc-1", "/var/lib/kubelet/pods/b/volumes/pvc-1");
        let c = config_path(dir, "pvc-2", "/var/lib/kubelet/pods/a/volumes/pvc-1");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(
            a,
            config_path(dir, "pvc-1", "/var/lib/kubelet/pods/a/volumes/pvc-1")
        );
        assert!(a.starts_with(dir));
    }

    #[tokio::test]
    async fn write_overwrites_and_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = config_path(&tmp.path().join("cfg"), "pvc-1", "/mnt/a");

        let mut cfg = MountConfig::from_request(&request("/mnt/a", "pvc-1"), DEFAULT_LOG_DIR);
        cfg.write_to(&path).await.unwrap();
        cfg.master = "10.0.0.9:80".into();
        cfg.write_to(&path).await.unwrap();

        assert_eq!(MountConfig::read_from(&path).await.unwrap(), cfg);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn find_configs_by_target() {
        let tmp = tempfile::tempdir().unwrap();
        let b7 = config_path(tmp.path(), "pvc-7", "/mnt/b");
        let b3 = config_path(tmp.path(), "pvc-3", "/mnt/b");
        for (path, volume) in [(&b7, "pvc-7"), (&b3, "pvc-3")] {
            MountConfig::from_request(&request("/mnt/b", volume), DEFAULT_LOG_DIR)
                .write_to(path)
                .await
                .unwrap();
        }

        assert_eq!(find_configs(tmp.path(), "/mnt/b").await, vec![b3, b7]);
        assert!(find_configs(tmp.path(), "/mnt/c").await.is_empty());
        assert!(
            find_configs(&tmp.path().join("missing"), "/mnt/b")
                .await
                .is_empty()
        );
    }
}
