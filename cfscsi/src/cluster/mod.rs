//! CFS master control plane.
//!
//! The cluster is reached through two narrow capabilities so tests can swap
//! in doubles:
//!
//! * [`LeaderQuery`]: ask a master who the current leader is.
//! * [`VolumeAdmin`]: volume and data partition administration, always
//!   issued against the leader.
//!
//! [`http::MasterClient`] implements both over plain HTTP.

pub mod http;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::CsiError;

/// Replica count requested for every new volume.
pub const REPLICAS: u32 = 3;

/// Data layout requested for volumes and their partitions.
pub const LAYOUT: &str = "extent";

/// How the cluster answered an administrative request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    /// The request was applied.
    Done,
    /// The cluster already has a volume by that name.
    AlreadyExists,
    /// The cluster does not know the volume.
    Absent,
}

/// Leader discovery against a single master.
#[async_trait]
pub trait LeaderQuery: Send + Sync {
    /// Issue a describe-cluster query to `endpoint` and return the leader
    /// address it reports.
    async fn leader_of(&self, endpoint: &str) -> Result<String, CsiError>;
}

/// Volume administration against the leader.
#[async_trait]
pub trait VolumeAdmin: Send + Sync {
    /// Create volume `name` with [`REPLICAS`] replicas and [`LAYOUT`] layout.
    async fn create_volume(&self, leader: &str, name: &str) -> Result<AdminOutcome, CsiError>;

    /// Allocate `count` data partitions for volume `name`.
    async fn create_data_partitions(
        &self,
        leader: &str,
        name: &str,
        count: u64,
    ) -> Result<AdminOutcome, CsiError>;

    /// Delete volume `name`.
    async fn delete_volume(&self, leader: &str, name: &str) -> Result<AdminOutcome, CsiError>;
}

/// Find the current leader by asking the first of `candidates`.
///
/// The remaining candidates are not consulted: a failure of the first one is
/// returned as is and the caller decides whether to try again.
pub async fn resolve_leader<Q>(query: &Q, candidates: &[String]) -> Result<String, CsiError>
where
    Q: LeaderQuery + ?Sized,
{
    let Some(candidate) = candidates.first() else {
        return Err(CsiError::InvalidArgument("no CFS master addresses given".into()));
    };
    match query.leader_of(candidate).await {
        Ok(leader) => {
            debug!(%candidate, %leader, "resolved CFS master leader");
            Ok(leader)
        }
        Err(e) => {
            warn!(%candidate, error = %e, "master did not report a leader");
            Err(e)
        }
    }
}
