//! CSI Controller service trait.
//!
//! The Controller service provisions and removes volumes on the cluster.  It
//! holds no state of its own: everything durable lives on the CFS masters.

use async_trait::async_trait;

use crate::error::CsiError;
use crate::types::{CreateVolumeRequest, Volume, VolumeCapability, VolumeId};

/// Controller service: centralized volume management.
#[async_trait]
pub trait CsiController: Send + Sync {
    /// Provision a new volume.
    ///
    /// The returned [`Volume`] carries the `volume_context` that must be
    /// forwarded to subsequent Node operations.
    async fn create_volume(&self, req: CreateVolumeRequest) -> Result<Volume, CsiError>;

    /// Delete a volume by id.  Deleting an absent volume succeeds.
    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), CsiError>;

    /// Check whether the given capabilities are supported.
    async fn validate_volume_capabilities(
        &self,
        volume_id: &VolumeId,
        capabilities: &[VolumeCapability],
    ) -> Result<bool, CsiError>;
}
