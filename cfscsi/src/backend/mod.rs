//! Storage backend implementations.
//!
//! Each backend module provides a concrete type that implements
//! [`crate::CsiIdentity`], [`crate::CsiController`], and [`crate::CsiNode`].

pub mod cfs;
