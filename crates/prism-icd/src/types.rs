use bitflags::bitflags;

use prism_caps::ApiVersion;

/// Properties of an enumerable layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerProperties {
    pub name: String,
    /// Revision of the layer's own definition.
    pub spec_version: u32,
    /// Revision of this implementation of the layer.
    pub impl_version: u32,
}

/// Properties of an enumerable capability (extension).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionProperties {
    pub name: String,
    pub spec_version: u32,
}

impl ExtensionProperties {
    pub fn new(name: &str, spec_version: u32) -> Self {
        Self {
            name: name.to_owned(),
            spec_version,
        }
    }
}

/// Hardware class of a physical device, used for auto-selection ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

impl DeviceKind {
    /// Selection priority; larger wins.
    pub const fn selection_rank(self) -> u32 {
        match self {
            DeviceKind::DiscreteGpu => 4,
            DeviceKind::IntegratedGpu => 3,
            DeviceKind::VirtualGpu => 2,
            DeviceKind::Cpu => 1,
            DeviceKind::Other => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDeviceProperties {
    pub device_name: String,
    pub kind: DeviceKind,
    /// Highest core API version this device implements.
    pub api_version: ApiVersion,
}

/// Driver identification, only visible through the extended property query
/// ([`Driver::driver_properties`](crate::Driver::driver_properties)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverProperties {
    pub driver_name: String,
    pub driver_info: String,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct QueueFlags: u32 {
        const GRAPHICS = 1 << 0;
        const COMPUTE  = 1 << 1;
        const TRANSFER = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueFamilyProperties {
    pub flags: QueueFlags,
    pub count: u32,
}

/// Image formats the harness touches during bring-up. Not a full format
/// catalogue; render-target probing only needs the color/depth staples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bgra8Unorm,
    Rgba8Unorm,
    D24UnormS8Uint,
    D32Sfloat,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct FormatFeatures: u32 {
        const SAMPLED_IMAGE            = 1 << 0;
        const COLOR_ATTACHMENT         = 1 << 1;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 2;
        const TRANSFER_SRC             = 1 << 3;
        const TRANSFER_DST             = 1 << 4;
    }
}

/// Per-tiling format support, as reported by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatProperties {
    pub linear: FormatFeatures,
    pub optimal: FormatFeatures,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ImageUsage: u32 {
        const COLOR_ATTACHMENT         = 1 << 0;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 1;
        const SAMPLED                  = 1 << 2;
        const TRANSFER_SRC             = 1 << 3;
        const TRANSFER_DST             = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTiling {
    Linear,
    Optimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    pub min_extent: (u32, u32),
    pub max_extent: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    SrgbNonlinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    Fifo,
    Mailbox,
    Immediate,
    /// Shared-image modes carry requirements most tests do not want; swapchain
    /// bring-up picks a non-shared mode when one exists.
    SharedDemandRefresh,
    SharedContinuousRefresh,
}

impl PresentMode {
    pub const fn is_shared(self) -> bool {
        matches!(
            self,
            PresentMode::SharedDemandRefresh | PresentMode::SharedContinuousRefresh
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeAlpha {
    Opaque,
    Inherit,
}
