//! Core CSI types: volumes, capabilities, requests and provisioning results.
//!
//! These types form the data model shared by the CSI traits, the request
//! envelope and the CFS backend.  They are all [`Serialize`]/[`Deserialize`]
//! so a host transport can carry them as JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Volume-context key carrying the CFS volume name.
pub const CTX_VOLUME_NAME: &str = "cfsvolname";

/// Parameter / volume-context keys carrying the ordered master addresses.
pub const CTX_MASTERS: [&str; 3] = ["cfsMaster1", "cfsMaster2", "cfsMaster3"];

/// One GiB in bytes.
pub const GIB: u64 = 1024 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Volume identity
// ---------------------------------------------------------------------------

/// Identifier of a volume.  For CFS this is the volume name itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VolumeId(pub String);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Access mode & capabilities
// ---------------------------------------------------------------------------

/// CSI access modes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessMode {
    SingleNodeWriter,
    SingleNodeReaderOnly,
    MultiNodeReaderOnly,
    MultiNodeSingleWriter,
    MultiNodeMultiWriter,
}

/// Describes the capabilities required from a volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeCapability {
    /// Requested access mode.
    pub access_mode: AccessMode,
    /// Additional mount flags (e.g. `"noatime"`).
    #[serde(default)]
    pub mount_flags: Vec<String>,
    /// Filesystem type, `"cfs"` for this driver.
    #[serde(default = "default_fs_type")]
    pub fs_type: String,
}

fn default_fs_type() -> String {
    "cfs".to_owned()
}

impl Default for VolumeCapability {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::MultiNodeMultiWriter,
            mount_flags: Vec::new(),
            fs_type: default_fs_type(),
        }
    }
}

impl VolumeCapability {
    /// CFS volumes are shared filesystems; only multi-node multi-writer
    /// access is offered.
    pub fn is_supported(&self) -> bool {
        self.access_mode == AccessMode::MultiNodeMultiWriter
    }
}

// ---------------------------------------------------------------------------
// Volume metadata
// ---------------------------------------------------------------------------

/// A provisioned volume as returned to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    /// Volume identifier (the CFS volume name).
    pub volume_id: VolumeId,
    /// Provisioned capacity in bytes.
    pub capacity_bytes: u64,
    /// Opaque context passed from Controller to Node operations.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Outcome of provisioning a volume on the cluster.
///
/// Computed fresh on every create call; nothing here is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    /// Size of one data partition in bytes.
    pub partition_unit_bytes: u64,
    pub partition_count: u64,
    /// Total capacity, always `partition_count * partition_unit_bytes`.
    pub capacity_bytes: u64,
    /// Master addresses in the order the caller supplied them.
    pub masters: Vec<String>,
}

impl VolumeSpec {
    /// Volume context handed back to the orchestrator and later passed into
    /// node publish requests.
    pub fn volume_context(&self) -> HashMap<String, String> {
        let mut ctx = HashMap::from([(CTX_VOLUME_NAME.to_owned(), self.name.clone())]);
        for (key, master) in CTX_MASTERS.iter().zip(&self.masters) {
            ctx.insert((*key).to_owned(), master.clone());
        }
        ctx
    }

    pub fn into_volume(self) -> Volume {
        Volume {
            volume_context: self.volume_context(),
            volume_id: VolumeId(self.name),
            capacity_bytes: self.capacity_bytes,
        }
    }
}

/// Ordered master list read from parameters or volume context.
///
/// Stops at the first missing key so that the order is never reshuffled.
pub fn masters_from_context(ctx: &HashMap<String, String>) -> Vec<String> {
    CTX_MASTERS
        .iter()
        .map_while(|key| ctx.get(*key))
        .filter(|m| !m.is_empty())
        .cloned()
        .collect()
}

/// Whether `name` can be used as a CFS volume name.
///
/// The name becomes part of a file name under the client config directory,
/// so path separators, parent references and NUL bytes are refused.
pub fn is_valid_volume_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\0']) && !name.contains("..")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request to create a new volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateVolumeRequest {
    /// Volume name, unique within the cluster.
    pub name: String,
    /// Desired capacity in bytes; `0` means unspecified.
    #[serde(default)]
    pub capacity_bytes: u64,
    /// Required capabilities.
    #[serde(default)]
    pub volume_capabilities: Vec<VolumeCapability>,
    /// Storage class parameters (`cfsMaster1..3`).
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Request to stage a volume on a node.  CFS has no staging phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStageVolumeRequest {
    pub volume_id: VolumeId,
    pub staging_target_path: String,
    #[serde(default)]
    pub volume_capability: VolumeCapability,
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Request to mount a volume at a target path on this node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePublishVolumeRequest {
    pub volume_id: VolumeId,
    /// Local path the volume must appear at.
    pub target_path: String,
    #[serde(default)]
    pub volume_capability: VolumeCapability,
    #[serde(default)]
    pub read_only: bool,
    /// Context carried from `CreateVolume`.
    #[serde(default)]
    pub volume_context: HashMap<String, String>,
}

/// Node-side mount request after the protocol fields have been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    pub target_path: String,
    pub volume_name: String,
    pub masters: Vec<String>,
    pub read_only: bool,
    pub mount_flags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Plugin & node info
// ---------------------------------------------------------------------------

/// Information about the CSI plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub vendor_version: String,
}

/// Capabilities advertised by the CSI plugin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PluginCapability {
    /// Plugin provides a Controller service.
    ControllerService,
}

/// Information about the node on which the CSI Node service runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub node_id: String,
    /// `0` means no limit.
    pub max_volumes: u64,
}
