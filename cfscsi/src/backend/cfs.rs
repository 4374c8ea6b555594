//! CFS storage backend for CSI.
//!
//! [`CfsDriver`] implements [`CsiIdentity`], [`CsiController`], and
//! [`CsiNode`] on top of the CFS master admin API and the `cfs-client` mount
//! client.  It keeps no state between calls: the master list travels with
//! each volume through its volume context, and mount state is read back from
//! the kernel.
//!
//! `DeleteVolume` only carries a volume id, so deletes always go to the
//! configured masters.  Creates are therefore limited to that same cluster:
//! without configured masters, or with request masters naming a different
//! set, `CreateVolume` is refused.
//!
//! # Volume context
//!
//! ```text
//! cfsvolname  -> CFS volume name (also the volume id)
//! cfsMaster1  -> first master, as given at create time
//! cfsMaster2  -> second master
//! cfsMaster3  -> third master
//! ```

use async_trait::async_trait;
use tracing::instrument;

use crate::cluster::http::MasterClient;
use crate::cluster::{LeaderQuery, VolumeAdmin};
use crate::config::DriverConfig;
use crate::controller::CsiController;
use crate::error::CsiError;
use crate::identity::CsiIdentity;
use crate::lifecycle::MountManager;
use crate::mount::{ClientMounter, Mounter};
use crate::node::CsiNode;
use crate::provision::VolumeProvisioner;
use crate::types::*;

/// Name reported by `GetPluginInfo`.
pub const PLUGIN_NAME: &str = "csi.cfs.rk8s.io";

/// Concrete CSI backend for CFS.
pub struct CfsDriver<C, M> {
    provisioner: VolumeProvisioner<C>,
    mounts: MountManager<M>,
    /// Masters used for deletes and for requests that carry none.
    masters: Vec<String>,
    node_id: String,
}

impl CfsDriver<MasterClient, ClientMounter> {
    /// Build a driver talking to real masters and the real mount client.
    pub fn from_config(config: &DriverConfig) -> Result<Self, CsiError> {
        let cluster = MasterClient::new(config.http_timeout())?;
        let mounter = ClientMounter::new(&config.client_binary, config.mount_timeout());
        Ok(Self::new(cluster, mounter, config))
    }
}

impl<C, M> CfsDriver<C, M>
where
    C: LeaderQuery + VolumeAdmin,
    M: Mounter,
{
    pub fn new(cluster: C, mounter: M, config: &DriverConfig) -> Self {
        Self {
            provisioner: VolumeProvisioner::new(cluster),
            mounts: MountManager::new(mounter, &config.config_dir, config.log_dir.as_str()),
            masters: config.masters.clone(),
            node_id: config.node_id.clone(),
        }
    }

    /// Masters from a request, or the configured ones if it has none.
    fn masters_or_default(&self, ctx: &std::collections::HashMap<String, String>) -> Vec<String> {
        let masters = masters_from_context(ctx);
        if masters.is_empty() {
            self.masters.clone()
        } else {
            masters
        }
    }

    /// Masters to create a volume on.  They must be the configured masters,
    /// possibly reordered, or the volume could never be deleted again.
    fn masters_for_create(
        &self,
        params: &std::collections::HashMap<String, String>,
    ) -> Result<Vec<String>, CsiError> {
        if self.masters.is_empty() {
            return Err(CsiError::InvalidArgument(
                "no CFS masters configured, a created volume could not be deleted".into(),
            ));
        }
        let masters = self.masters_or_default(params);
        let mut requested = masters.clone();
        let mut configured = self.masters.clone();
        requested.sort();
        configured.sort();
        if requested != configured {
            return Err(CsiError::InvalidArgument(format!(
                "masters {masters:?} differ from the configured masters {:?}",
                self.masters
            )));
        }
        Ok(masters)
    }
}

// ---------------------------------------------------------------------------
// CsiIdentity
// ---------------------------------------------------------------------------

#[async_trait]
impl<C, M> CsiIdentity for CfsDriver<C, M>
where
    C: LeaderQuery + VolumeAdmin,
    M: Mounter,
{
    async fn get_plugin_info(&self) -> Result<PluginInfo, CsiError> {
        Ok(PluginInfo {
            name: PLUGIN_NAME.to_owned(),
            vendor_version: env!("CARGO_PKG_VERSION").to_owned(),
        })
    }

    async fn probe(&self) -> Result<bool, CsiError> {
        Ok(true)
    }

    async fn get_plugin_capabilities(&self) -> Result<Vec<PluginCapability>, CsiError> {
        Ok(vec![PluginCapability::ControllerService])
    }
}

// ---------------------------------------------------------------------------
// CsiController
// ---------------------------------------------------------------------------

#[async_trait]
impl<C, M> CsiController for CfsDriver<C, M>
where
    C: LeaderQuery + VolumeAdmin,
    M: Mounter,
{
    #[instrument(skip(self, req), fields(name = %req.name, capacity = req.capacity_bytes))]
    async fn create_volume(&self, req: CreateVolumeRequest) -> Result<Volume, CsiError> {
        if req.name.is_empty() {
            return Err(CsiError::InvalidArgument("volume name is required".into()));
        }
        if !is_valid_volume_name(&req.name) {
            return Err(CsiError::InvalidArgument(format!(
                "invalid volume name {:?}",
                req.name
            )));
        }
        if let Some(cap) = req.volume_capabilities.iter().find(|c| !c.is_supported()) {
            return Err(CsiError::InvalidArgument(format!(
                "unsupported access mode {:?}",
                cap.access_mode
            )));
        }
        let masters = self.masters_for_create(&req.parameters)?;

        let spec = self
            .provisioner
            .create(&req.name, req.capacity_bytes, &masters)
            .await?;
        Ok(spec.into_volume())
    }

    #[instrument(skip(self))]
    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), CsiError> {
        if volume_id.0.is_empty() {
            return Err(CsiError::InvalidArgument("volume id is required".into()));
        }
        self.provisioner.delete(&volume_id.0, &self.masters).await
    }

    async fn validate_volume_capabilities(
        &self,
        _volume_id: &VolumeId,
        capabilities: &[VolumeCapability],
    ) -> Result<bool, CsiError> {
        Ok(capabilities.iter().all(VolumeCapability::is_supported))
    }
}

// ---------------------------------------------------------------------------
// CsiNode
// ---------------------------------------------------------------------------

#[async_trait]
impl<C, M> CsiNode for CfsDriver<C, M>
where
    C: LeaderQuery + VolumeAdmin,
    M: Mounter,
{
    async fn stage_volume(&self, _req: NodeStageVolumeRequest) -> Result<(), CsiError> {
        Ok(())
    }

    async fn unstage_volume(
        &self,
        _volume_id: &VolumeId,
        _staging_target_path: &str,
    ) -> Result<(), CsiError> {
        Ok(())
    }

    #[instrument(skip(self, req), fields(volume_id = %req.volume_id, target = %req.target_path))]
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError> {
        if req.target_path.is_empty() {
            return Err(CsiError::InvalidArgument("target path is required".into()));
        }
        let volume_name = req
            .volume_context
            .get(CTX_VOLUME_NAME)
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| req.volume_id.0.clone());
        if volume_name.is_empty() {
            return Err(CsiError::InvalidArgument(format!(
                "volume context {CTX_VOLUME_NAME} is required"
            )));
        }
        let masters = self.masters_or_default(&req.volume_context);
        if masters.is_empty() {
            return Err(CsiError::InvalidArgument(format!(
                "volume context {} is required",
                CTX_MASTERS[0]
            )));
        }

        let mount = MountRequest {
            target_path: req.target_path,
            volume_name,
            masters,
            read_only: req.read_only,
            mount_flags: req.volume_capability.mount_flags,
        };
        self.mounts.publish(&mount).await
    }

    async fn unpublish_volume(
        &self,
        _volume_id: &VolumeId,
        target_path: &str,
    ) -> Result<(), CsiError> {
        if target_path.is_empty() {
            return Err(CsiError::InvalidArgument("target path is required".into()));
        }
        self.mounts.unpublish(target_path).await
    }

    async fn get_info(&self) -> Result<NodeInfo, CsiError> {
        Ok(NodeInfo {
            node_id: self.node_id.clone(),
            max_volumes: 0,
        })
    }
}
