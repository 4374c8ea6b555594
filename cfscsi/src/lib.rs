//! # cfscsi: CSI driver core for CFS
//!
//! `cfscsi` bridges a [Container Storage Interface][csi] orchestrator to a
//! CFS cluster: it finds the master leader, provisions volumes as whole
//! 120 GiB data partitions, and mounts them on worker nodes through the
//! `cfs-client` mount client.  It follows the RK8s conventions (Tokio async
//! runtime, `tracing` for observability, `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Core data model: `Volume`, `VolumeSpec`, capabilities, requests. |
//! | [`error`] | [`CsiError`] enum and its orchestrator status codes. |
//! | [`message`] | [`CsiMessage`] request/response envelope. |
//! | [`service`] | Routes envelopes to the CSI traits. |
//! | [`identity`] | [`CsiIdentity`] trait: plugin discovery & health. |
//! | [`controller`] | [`CsiController`] trait: volume create/delete. |
//! | [`node`] | [`CsiNode`] trait: stage, publish, unpublish, unstage. |
//! | [`cluster`] | Leader discovery and the CFS master admin client. |
//! | [`provision`] | Capacity planning and volume provisioning. |
//! | [`mount_config`] | `cfs-client` configuration files. |
//! | [`mount`] | Mount point detection, mount client and unmount. |
//! | [`lifecycle`] | Idempotent node publish / unpublish. |
//! | [`backend`] | The CFS driver implementing all CSI traits. |
//! | [`config`] | Driver configuration from flags and environment. |
//!
//! [csi]: https://github.com/container-storage-interface/spec

pub mod backend;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod message;
pub mod mount;
pub mod mount_config;
pub mod node;
pub mod provision;
pub mod service;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use backend::cfs::CfsDriver;
pub use controller::CsiController;
pub use error::CsiError;
pub use identity::CsiIdentity;
pub use message::CsiMessage;
pub use node::CsiNode;
pub use types::*;
