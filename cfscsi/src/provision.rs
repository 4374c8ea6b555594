//! Volume sizing and provisioning against the CFS leader.
//!
//! CFS allocates storage in data partitions of [`PARTITION_UNIT_GIB`] GiB, so
//! every requested capacity is rounded up to a whole number of partitions.

use tracing::{info, instrument, warn};

use crate::cluster::{AdminOutcome, LeaderQuery, VolumeAdmin, resolve_leader};
use crate::error::CsiError;
use crate::types::{GIB, VolumeSpec};

/// Size of one data partition in GiB.
pub const PARTITION_UNIT_GIB: u64 = 120;

/// Capacity used when the request does not name one.
pub const DEFAULT_CAPACITY_BYTES: u64 = GIB;

/// Result of the sizing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPlan {
    pub partition_count: u64,
    /// Final size in GiB, a multiple of [`PARTITION_UNIT_GIB`].
    pub size_gib: u64,
    pub capacity_bytes: u64,
}

/// Round `required_bytes` up to whole partitions.  `0` means unspecified.
///
/// Requests whose rounded size does not fit in a `u64` byte count are
/// rejected with [`CsiError::InvalidArgument`].
pub fn plan_capacity(required_bytes: u64) -> Result<CapacityPlan, CsiError> {
    let bytes = if required_bytes == 0 {
        DEFAULT_CAPACITY_BYTES
    } else {
        required_bytes
    };
    let partition_count = bytes.div_ceil(GIB).div_ceil(PARTITION_UNIT_GIB);
    let too_large =
        || CsiError::InvalidArgument(format!("requested capacity {required_bytes} is too large"));
    let size_gib = partition_count
        .checked_mul(PARTITION_UNIT_GIB)
        .ok_or_else(too_large)?;
    let capacity_bytes = size_gib.checked_mul(GIB).ok_or_else(too_large)?;
    Ok(CapacityPlan {
        partition_count,
        size_gib,
        capacity_bytes,
    })
}

/// Drives volume create/delete against the cluster leader.
///
/// Stateless: the master list is passed into every call and the leader is
/// resolved afresh each time.
pub struct VolumeProvisioner<C> {
    cluster: C,
}

impl<C> VolumeProvisioner<C>
where
    C: LeaderQuery + VolumeAdmin,
{
    pub fn new(cluster: C) -> Self {
        Self { cluster }
    }

    /// Create volume `name` sized for `required_bytes`.
    ///
    /// If the partition allocation fails after the volume itself was
    /// created, the volume is deleted again (once) and the partition error
    /// is returned.  A name the cluster already knows fails with
    /// [`CsiError::AlreadyExists`]; its partitions are left alone.
    #[instrument(skip(self, masters), fields(masters = ?masters))]
    pub async fn create(
        &self,
        name: &str,
        required_bytes: u64,
        masters: &[String],
    ) -> Result<VolumeSpec, CsiError> {
        let plan = plan_capacity(required_bytes)?;
        let spec = VolumeSpec {
            name: name.to_owned(),
            partition_unit_bytes: PARTITION_UNIT_GIB * GIB,
            partition_count: plan.partition_count,
            capacity_bytes: plan.capacity_bytes,
            masters: masters.to_vec(),
        };

        let leader = resolve_leader(&self.cluster, masters).await?;

        match self.cluster.create_volume(&leader, name).await? {
            AdminOutcome::Done => {}
            AdminOutcome::AlreadyExists => {
                return Err(CsiError::AlreadyExists(format!(
                    "volume {name} already exists on master {leader}"
                )));
            }
            AdminOutcome::Absent => {
                return Err(CsiError::Internal(format!(
                    "master {leader} reported volume {name} absent while creating it"
                )));
            }
        }

        let partitions = match self
            .cluster
            .create_data_partitions(&leader, name, plan.partition_count)
            .await
        {
            Ok(AdminOutcome::Done) => Ok(()),
            Ok(outcome) => Err(CsiError::Internal(format!(
                "unexpected reply creating data partitions for {name}: {outcome:?}"
            ))),
            Err(e) => Err(e),
        };
        if let Err(e) = partitions {
            warn!(%name, error = %e, "data partition allocation failed, deleting volume");
            if let Err(cleanup) = self.cluster.delete_volume(&leader, name).await {
                warn!(%name, error = %cleanup, "compensating delete failed");
            }
            return Err(e);
        }

        info!(
            %name,
            size_gib = plan.size_gib,
            partitions = plan.partition_count,
            "volume created"
        );
        Ok(spec)
    }

    /// Delete volume `name`.  An absent volume counts as deleted.
    #[instrument(skip(self, masters), fields(masters = ?masters))]
    pub async fn delete(&self, name: &str, masters: &[String]) -> Result<(), CsiError> {
        let leader = resolve_leader(&self.cluster, masters).await?;
        match self.cluster.delete_volume(&leader, name).await? {
            AdminOutcome::Absent => info!(%name, "volume already absent"),
            _ => info!(%name, "volume deleted"),
        }
        Ok(())
    }
}
