//! The prism driver/loader API boundary.
//!
//! Everything the bring-up layer needs from a driver goes through the
//! object-safe [`Driver`] trait: enumeration of layers/extensions, instance
//! and device creation, feature and format queries, window-system surface
//! plumbing, and the handful of resource constructors the harness tears down.
//! All calls are synchronous round-trips that return a [`Status`]-coded
//! result; callers must treat anything outside the small success set as
//! authoritative failure (no retries).
//!
//! The in-tree [`MockIcd`] is a deterministic software driver in the same
//! spirit as a software device model: it advertises a configurable set of
//! layers, extensions, devices and features, validates creation requests
//! against what it advertised, and tracks handle lifetimes so tests can catch
//! out-of-order teardown.

mod config;
mod driver;
mod features;
mod mock;
mod status;
mod types;

pub use config::{
    ApplicationInfo, ConfigFragment, DeviceConfig, InstanceConfig, InstanceFlags, MessageSeverity,
    QueueRequest, SurfaceDesc, SwapchainConfig, ValidationCheck,
};
pub use driver::{
    CommandBufferHandle, CommandPoolHandle, DeviceHandle, Driver, DriverResult, FramebufferHandle,
    ImageDesc, ImageHandle, ImageViewHandle, InstanceHandle, PhysicalDeviceHandle,
    QueueHandle, RenderPassDesc, RenderPassHandle, SurfaceHandle, SwapchainHandle,
};
pub use features::{DeviceFeatures, Feature};
pub use mock::{MockIcd, MockPhysicalDevice, ProbeCounters, MOCK_DEVICE_NAME};
pub use status::Status;
pub use types::{
    ColorSpace, CompositeAlpha, DeviceKind, DriverProperties, ExtensionProperties, Format,
    FormatFeatures, FormatProperties, ImageTiling, ImageUsage, LayerProperties,
    PhysicalDeviceProperties, PresentMode, QueueFamilyProperties, QueueFlags,
    SurfaceCapabilities, SurfaceFormat,
};
