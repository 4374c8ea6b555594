//! CSI Node service trait.
//!
//! The Node service runs on each worker node and attaches volumes at the
//! paths the orchestrator asks for:
//!
//! 1. **Stage** / **Unstage**: accepted for protocol completeness, no-ops.
//! 2. **Publish**: mount the volume at the target path via the mount client.
//! 3. **Unpublish**: unmount the target path.

use async_trait::async_trait;

use crate::error::CsiError;
use crate::types::{NodeInfo, NodePublishVolumeRequest, NodeStageVolumeRequest, VolumeId};

/// Node service: local mount / unmount operations.
#[async_trait]
pub trait CsiNode: Send + Sync {
    /// Stage a volume.  Always succeeds.
    async fn stage_volume(&self, req: NodeStageVolumeRequest) -> Result<(), CsiError>;

    /// Unstage a volume.  Always succeeds.
    async fn unstage_volume(
        &self,
        volume_id: &VolumeId,
        staging_target_path: &str,
    ) -> Result<(), CsiError>;

    /// Publish a volume at `req.target_path`.
    ///
    /// This is idempotent: a target that is already a mount point is left
    /// untouched and the call succeeds.
    async fn publish_volume(&self, req: NodePublishVolumeRequest) -> Result<(), CsiError>;

    /// Unpublish a volume.
    ///
    /// Fails with [`CsiError::NotFound`] when the target is missing or not
    /// mounted.
    async fn unpublish_volume(
        &self,
        volume_id: &VolumeId,
        target_path: &str,
    ) -> Result<(), CsiError>;

    /// Return information about the node on which this service is running.
    async fn get_info(&self) -> Result<NodeInfo, CsiError>;
}
