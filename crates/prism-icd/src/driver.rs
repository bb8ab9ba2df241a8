use prism_caps::ApiVersion;

use crate::config::{DeviceConfig, InstanceConfig, SurfaceDesc, SwapchainConfig};
use crate::features::DeviceFeatures;
use crate::status::Status;
use crate::types::{
    DriverProperties, ExtensionProperties, Format, FormatProperties, ImageTiling, ImageUsage,
    LayerProperties, PhysicalDeviceProperties, PresentMode, QueueFamilyProperties,
    SurfaceCapabilities, SurfaceFormat,
};

/// Driver calls return their out-value or a non-success [`Status`].
pub type DriverResult<T> = Result<T, Status>;

macro_rules! handle_types {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);
        )+
    };
}

handle_types! {
    InstanceHandle,
    PhysicalDeviceHandle,
    DeviceHandle,
    QueueHandle,
    CommandPoolHandle,
    CommandBufferHandle,
    ImageHandle,
    ImageViewHandle,
    RenderPassHandle,
    FramebufferHandle,
    SurfaceHandle,
    SwapchainHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: Format,
    pub usage: ImageUsage,
    pub tiling: ImageTiling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub color_formats: Vec<Format>,
    pub depth_stencil_format: Option<Format>,
}

/// The loader/driver boundary.
///
/// Every method is a synchronous, possibly-blocking round-trip; there are no
/// suspension points and no retries. Implementations must return `Err` only
/// with non-success status codes.
pub trait Driver {
    // ── Loader-level queries (no instance required) ─────────────────────────

    /// Highest instance-level API version the loader supports.
    fn loader_version(&self) -> ApiVersion;

    fn enumerate_instance_layers(&self) -> DriverResult<Vec<LayerProperties>>;

    /// Instance extensions provided by the driver itself (`layer` = `None`)
    /// or contributed by the named layer.
    fn enumerate_instance_extensions(
        &self,
        layer: Option<&str>,
    ) -> DriverResult<Vec<ExtensionProperties>>;

    // ── Instance lifecycle ──────────────────────────────────────────────────

    fn create_instance(&self, config: &InstanceConfig) -> DriverResult<InstanceHandle>;
    fn destroy_instance(&self, instance: InstanceHandle) -> DriverResult<()>;

    fn enumerate_physical_devices(
        &self,
        instance: InstanceHandle,
    ) -> DriverResult<Vec<PhysicalDeviceHandle>>;

    // ── Physical-device queries ─────────────────────────────────────────────

    fn physical_device_properties(
        &self,
        physical: PhysicalDeviceHandle,
    ) -> DriverResult<PhysicalDeviceProperties>;

    /// Driver identification from the extended (chained) property query.
    /// Subject to the same visibility rule as [`Driver::features2`].
    fn driver_properties(&self, physical: PhysicalDeviceHandle) -> DriverResult<DriverProperties>;

    /// Device extensions provided by the device itself (`layer` = `None`) or
    /// contributed by the named layer.
    fn enumerate_device_extensions(
        &self,
        physical: PhysicalDeviceHandle,
        layer: Option<&str>,
    ) -> DriverResult<Vec<ExtensionProperties>>;

    fn queue_family_properties(
        &self,
        physical: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<QueueFamilyProperties>>;

    /// Base-block feature query; flags outside [`DeviceFeatures::BASE`] read
    /// as unset.
    fn features(&self, physical: PhysicalDeviceHandle) -> DriverResult<DeviceFeatures>;

    /// Extended (chained) feature query covering every block. Only callable
    /// when the owning instance enabled the extended-query capability or the
    /// negotiated version includes it.
    fn features2(&self, physical: PhysicalDeviceHandle) -> DriverResult<DeviceFeatures>;

    fn format_properties(
        &self,
        physical: PhysicalDeviceHandle,
        format: Format,
    ) -> DriverResult<FormatProperties>;

    // ── Device lifecycle ────────────────────────────────────────────────────

    fn create_device(
        &self,
        physical: PhysicalDeviceHandle,
        config: &DeviceConfig,
    ) -> DriverResult<DeviceHandle>;
    fn destroy_device(&self, device: DeviceHandle) -> DriverResult<()>;
    fn device_wait_idle(&self, device: DeviceHandle) -> DriverResult<()>;
    fn get_queue(
        &self,
        device: DeviceHandle,
        family_index: u32,
        queue_index: u32,
    ) -> DriverResult<QueueHandle>;

    // ── Resources the harness owns across a test ────────────────────────────

    fn create_command_pool(
        &self,
        device: DeviceHandle,
        family_index: u32,
    ) -> DriverResult<CommandPoolHandle>;
    fn destroy_command_pool(&self, device: DeviceHandle, pool: CommandPoolHandle)
        -> DriverResult<()>;
    fn allocate_command_buffer(
        &self,
        device: DeviceHandle,
        pool: CommandPoolHandle,
    ) -> DriverResult<CommandBufferHandle>;
    fn free_command_buffer(
        &self,
        device: DeviceHandle,
        pool: CommandPoolHandle,
        buffer: CommandBufferHandle,
    ) -> DriverResult<()>;

    fn create_image(&self, device: DeviceHandle, desc: &ImageDesc) -> DriverResult<ImageHandle>;
    fn destroy_image(&self, device: DeviceHandle, image: ImageHandle) -> DriverResult<()>;
    fn create_image_view(
        &self,
        device: DeviceHandle,
        image: ImageHandle,
    ) -> DriverResult<ImageViewHandle>;
    fn destroy_image_view(&self, device: DeviceHandle, view: ImageViewHandle) -> DriverResult<()>;

    fn create_render_pass(
        &self,
        device: DeviceHandle,
        desc: &RenderPassDesc,
    ) -> DriverResult<RenderPassHandle>;
    fn destroy_render_pass(
        &self,
        device: DeviceHandle,
        render_pass: RenderPassHandle,
    ) -> DriverResult<()>;

    fn create_framebuffer(
        &self,
        device: DeviceHandle,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        width: u32,
        height: u32,
    ) -> DriverResult<FramebufferHandle>;
    fn destroy_framebuffer(
        &self,
        device: DeviceHandle,
        framebuffer: FramebufferHandle,
    ) -> DriverResult<()>;

    // ── Window-system plumbing ──────────────────────────────────────────────

    fn create_surface(
        &self,
        instance: InstanceHandle,
        desc: &SurfaceDesc,
    ) -> DriverResult<SurfaceHandle>;
    fn destroy_surface(&self, instance: InstanceHandle, surface: SurfaceHandle)
        -> DriverResult<()>;

    fn surface_supported(
        &self,
        physical: PhysicalDeviceHandle,
        family_index: u32,
        surface: SurfaceHandle,
    ) -> DriverResult<bool>;
    fn surface_capabilities(
        &self,
        physical: PhysicalDeviceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<SurfaceCapabilities>;
    fn surface_formats(
        &self,
        physical: PhysicalDeviceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<Vec<SurfaceFormat>>;
    fn surface_present_modes(
        &self,
        physical: PhysicalDeviceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<Vec<PresentMode>>;

    fn create_swapchain(
        &self,
        device: DeviceHandle,
        config: &SwapchainConfig,
    ) -> DriverResult<SwapchainHandle>;
    fn swapchain_images(
        &self,
        device: DeviceHandle,
        swapchain: SwapchainHandle,
    ) -> DriverResult<Vec<ImageHandle>>;
    fn destroy_swapchain(
        &self,
        device: DeviceHandle,
        swapchain: SwapchainHandle,
    ) -> DriverResult<()>;
}
