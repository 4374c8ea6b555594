//! Driver configuration.
//!
//! Every setting can be given as a command line flag or through the
//! environment:
//!
//! - `CFS_CSI_NODE_ID`: node identifier reported by `GetNodeInfo`.
//! - `CFS_CSI_MASTERS`: comma separated master addresses of the cluster.
//!   `DeleteVolume` always uses them, `CreateVolume` requires them and only
//!   accepts request masters naming the same set.
//! - `CFS_CSI_CLIENT_BIN`: mount client binary, `cfs-client` by default.
//! - `CFS_CSI_CONFIG_DIR`: where client configurations are generated.
//! - `CFS_CSI_LOG_DIR`: log directory handed to the mount client.
//! - `CFS_CSI_HTTP_TIMEOUT_SECS` / `CFS_CSI_MOUNT_TIMEOUT_SECS`: bounds on
//!   master requests and on a single mount client run.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::mount_config::{DEFAULT_CONFIG_DIR, DEFAULT_LOG_DIR};

#[derive(Debug, Clone, Args)]
pub struct DriverConfig {
    /// Node identifier
    #[arg(long, env = "CFS_CSI_NODE_ID", default_value = "cfs-node")]
    pub node_id: String,

    /// CFS master address (repeat or comma separate for several)
    #[arg(long = "master", env = "CFS_CSI_MASTERS", value_delimiter = ',')]
    pub masters: Vec<String>,

    /// Mount client binary
    #[arg(long, env = "CFS_CSI_CLIENT_BIN", default_value = "cfs-client")]
    pub client_binary: PathBuf,

    /// Directory for generated mount client configurations
    #[arg(long, env = "CFS_CSI_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Log directory passed to the mount client
    #[arg(long, env = "CFS_CSI_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// Timeout of a single master request, in seconds
    #[arg(long, env = "CFS_CSI_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Timeout of a single mount client run, in seconds
    #[arg(long, env = "CFS_CSI_MOUNT_TIMEOUT_SECS", default_value_t = 60)]
    pub mount_timeout_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            node_id: "cfs-node".to_owned(),
            masters: Vec::new(),
            client_binary: PathBuf::from("cfs-client"),
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            log_dir: DEFAULT_LOG_DIR.to_owned(),
            http_timeout_secs: 10,
            mount_timeout_secs: 60,
        }
    }
}

impl DriverConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn mount_timeout(&self) -> Duration {
        Duration::from_secs(self.mount_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: DriverConfig,
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "cfscsi",
            "--master",
            "10.0.0.1:80,10.0.0.2:80",
            "--master",
            "10.0.0.3:80",
            "--config-dir",
            "/run/cfs",
            "--mount-timeout-secs",
            "5",
        ]);
        assert_eq!(
            cli.config.masters,
            vec!["10.0.0.1:80", "10.0.0.2:80", "10.0.0.3:80"]
        );
        assert_eq!(cli.config.config_dir, PathBuf::from("/run/cfs"));
        assert_eq!(cli.config.mount_timeout(), Duration::from_secs(5));
        assert_eq!(cli.config.log_dir, DEFAULT_LOG_DIR);
    }

    #[test]
    fn default_matches_flag_defaults() {
        let def = DriverConfig::default();
        assert_eq!(def.client_binary, PathBuf::from("cfs-client"));
        assert_eq!(def.config_dir, PathBuf::from(DEFAULT_CONFIG_DIR));
        assert_eq!(def.http_timeout(), Duration::from_secs(10));
    }
}
