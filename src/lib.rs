//! Workspace umbrella crate.
//!
//! Re-exports the service façade so host applications can depend on
//! `mcc-workspace` alone and pick bridges through the `desktop-shims`
//! feature.

pub use core_service::*;
