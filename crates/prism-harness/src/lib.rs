//! Capability negotiation and device bring-up for prism layer tests.
//!
//! A test declares what it wants (required/optional/window-system
//! capabilities, required/disabled feature flags, a minimum target API
//! version); the harness negotiates that against what the driver actually
//! supports and the transitive prerequisite graph in `prism-caps`, then walks
//! the bring-up state machine:
//!
//! ```text
//! Uninitialized → InstanceCreated → PhysicalDeviceSelected → DeviceCreated → TornDown
//! ```
//!
//! Hardware/environment limitations surface as [`SetupError::Skip`] (the test
//! neither passes nor fails); setup-order bugs and non-success driver
//! statuses are hard failures. See [`Harness`] for the entry points.

mod env;
mod features;
mod harness;
mod probe;
mod render;
mod resolve;
mod surface;

pub use env::{HarnessEnv, ValidationSelect};
pub use features::{promoted_feature_flags, FeatureRequirements};
pub use harness::{BringUpPhase, Harness, SetupError, SetupResult, SkipReason};
pub use probe::AvailabilityProber;
pub use render::RenderTargets;
pub use resolve::{EnabledSet, RequestedSet};
pub use surface::{HeadlessSurface, SurfaceInformation, SurfaceProvider, WindowSurface};
