//! Capability registry for the prism graphics API.
//!
//! A *capability* is a named, independently-enablable unit of driver or
//! instance functionality (a layer or extension). This crate holds the static
//! registry consumed by the negotiation layer:
//!
//! - [`ApiVersion`]: totally-ordered `major.minor.patch` triple
//! - [`CapabilityInfo`]: per-capability metadata (spec revision, prerequisite
//!   list, promotion point)
//! - [`CapabilityRegistry`]: name lookup and the version→promoted-names map,
//!   one registry per namespace (instance-level and device-level)
//!
//! The tables in `tables.rs` are committed generated output of the prism API
//! registry; everything here is immutable after process start.

mod registry;
mod tables;
mod version;

pub use registry::{device_registry, instance_registry, CapabilityRegistry, Namespace};
pub use tables::{caps, layers};
pub use version::ApiVersion;

use thiserror::Error;

/// Metadata for a single registered capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityInfo {
    /// Unique capability name within its namespace.
    pub name: &'static str,
    /// Revision of the capability's own definition.
    pub spec_version: u32,
    /// Prerequisites that must be satisfied before this capability can be
    /// enabled, in registry order.
    pub requirements: &'static [Requirement],
    /// Core API version that absorbed this capability's functionality, if any.
    /// At or past this version the explicit capability is redundant.
    pub promoted_at: Option<ApiVersion>,
}

/// A single prerequisite of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Another capability, by name. Device-level capabilities may name
    /// instance-level prerequisites; the reverse never occurs.
    Capability(&'static str),
    /// A minimum core API version. Satisfied by version negotiation alone,
    /// never by enabling anything.
    Core(ApiVersion),
}

/// One entry of a registry's promotion map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionEntry {
    /// Core version the listed capabilities were folded into.
    pub version: ApiVersion,
    /// Names promoted at exactly this version.
    pub names: &'static [&'static str],
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapsError {
    #[error("unknown {namespace} capability {name:?}")]
    NotFound { namespace: Namespace, name: String },
}
