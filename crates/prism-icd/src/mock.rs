use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use prism_caps::{caps, device_registry, layers, ApiVersion};

use crate::config::{DeviceConfig, InstanceConfig, SurfaceDesc, SwapchainConfig};
use crate::driver::{
    CommandBufferHandle, CommandPoolHandle, DeviceHandle, Driver, DriverResult, FramebufferHandle,
    ImageDesc, ImageHandle, ImageViewHandle, InstanceHandle, PhysicalDeviceHandle, QueueHandle,
    RenderPassDesc, RenderPassHandle, SurfaceHandle, SwapchainHandle,
};
use crate::features::DeviceFeatures;
use crate::status::Status;
use crate::types::{
    ColorSpace, DeviceKind, DriverProperties, ExtensionProperties, Format, FormatFeatures,
    FormatProperties, LayerProperties, PhysicalDeviceProperties, PresentMode,
    QueueFamilyProperties, QueueFlags, SurfaceCapabilities, SurfaceFormat,
};

/// Canonical device name advertised by [`MockIcd`] devices built through
/// [`MockPhysicalDevice::conformant`]. Harness disable-gates key off it.
pub const MOCK_DEVICE_NAME: &str = "Prism Mock Device";

/// One physical device advertised by the mock driver.
#[derive(Debug, Clone)]
pub struct MockPhysicalDevice {
    pub properties: PhysicalDeviceProperties,
    pub driver: DriverProperties,
    pub extensions: Vec<ExtensionProperties>,
    pub features: DeviceFeatures,
    pub queue_families: Vec<QueueFamilyProperties>,
    pub formats: HashMap<Format, FormatProperties>,
    pub surface_support: bool,
    pub surface_formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
    pub surface_caps: SurfaceCapabilities,
}

impl MockPhysicalDevice {
    /// A fully-featured device: every registered device capability, every
    /// feature flag, color/depth staples for render targets, one graphics
    /// queue family.
    pub fn conformant(kind: DeviceKind, api_version: ApiVersion) -> Self {
        let extensions = device_registry()
            .iter()
            .map(|info| ExtensionProperties::new(info.name, info.spec_version))
            .collect();

        let color = FormatFeatures::COLOR_ATTACHMENT
            | FormatFeatures::SAMPLED_IMAGE
            | FormatFeatures::TRANSFER_SRC
            | FormatFeatures::TRANSFER_DST;
        let mut formats = HashMap::new();
        formats.insert(
            Format::Bgra8Unorm,
            FormatProperties {
                linear: color,
                optimal: color,
            },
        );
        formats.insert(
            Format::Rgba8Unorm,
            FormatProperties {
                linear: color,
                optimal: color,
            },
        );
        formats.insert(
            Format::D24UnormS8Uint,
            FormatProperties {
                linear: FormatFeatures::empty(),
                optimal: FormatFeatures::DEPTH_STENCIL_ATTACHMENT,
            },
        );
        formats.insert(
            Format::D32Sfloat,
            FormatProperties {
                linear: FormatFeatures::empty(),
                optimal: FormatFeatures::DEPTH_STENCIL_ATTACHMENT,
            },
        );

        Self {
            properties: PhysicalDeviceProperties {
                device_name: MOCK_DEVICE_NAME.to_owned(),
                kind,
                api_version,
            },
            driver: DriverProperties {
                driver_name: "prism-mock".to_owned(),
                driver_info: "software rasterizer-free mock".to_owned(),
            },
            extensions,
            features: DeviceFeatures::all(),
            queue_families: vec![
                QueueFamilyProperties {
                    flags: QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
                    count: 1,
                },
                QueueFamilyProperties {
                    flags: QueueFlags::TRANSFER,
                    count: 2,
                },
            ],
            formats,
            surface_support: true,
            surface_formats: vec![SurfaceFormat {
                format: Format::Bgra8Unorm,
                color_space: ColorSpace::SrgbNonlinear,
            }],
            present_modes: vec![PresentMode::SharedDemandRefresh, PresentMode::Fifo],
            surface_caps: SurfaceCapabilities {
                min_image_count: 2,
                min_extent: (1, 1),
                max_extent: (4096, 4096),
            },
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.properties.device_name = name.to_owned();
        self
    }

    pub fn with_features(mut self, features: DeviceFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn without_extension(mut self, name: &str) -> Self {
        self.extensions.retain(|ext| ext.name != name);
        self
    }

    pub fn with_extension(mut self, name: &str, spec_version: u32) -> Self {
        self.extensions
            .push(ExtensionProperties::new(name, spec_version));
        self
    }
}

/// Counters over driver-side enumeration calls, for asserting that probes
/// memoize.
#[derive(Debug, Default)]
pub struct ProbeCounters {
    layers: Cell<u32>,
    instance_extensions: Cell<u32>,
    device_extensions: Cell<u32>,
}

impl ProbeCounters {
    pub fn layer_enumerations(&self) -> u32 {
        self.layers.get()
    }

    pub fn instance_extension_enumerations(&self) -> u32 {
        self.instance_extensions.get()
    }

    pub fn device_extension_enumerations(&self) -> u32 {
        self.device_extensions.get()
    }
}

#[derive(Debug)]
struct InstanceState {
    effective_version: ApiVersion,
    enabled_layers: Vec<String>,
    enabled_extensions: Vec<String>,
    config: InstanceConfig,
    physical: Vec<u64>,
    devices: HashSet<u64>,
    surfaces: HashSet<u64>,
}

#[derive(Debug, Default)]
struct DeviceState {
    instance: u64,
    config: DeviceConfig,
    enabled_extensions: Vec<String>,
    queues: HashMap<(u32, u32), u64>,
    pools: HashMap<u64, HashSet<u64>>,
    images: HashSet<u64>,
    views: HashMap<u64, u64>,
    render_passes: HashSet<u64>,
    framebuffers: HashMap<u64, u64>,
    swapchains: HashMap<u64, (u64, Vec<u64>)>,
}

#[derive(Debug, Default)]
struct IcdState {
    next_handle: u64,
    instances: HashMap<u64, InstanceState>,
    physical_owner: HashMap<u64, (u64, usize)>,
    devices: HashMap<u64, DeviceState>,
    surfaces: HashMap<u64, u64>,
}

impl IcdState {
    fn alloc(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// A deterministic software driver.
///
/// Advertises whatever it was configured with, validates creation requests
/// against that, and tracks handle parent/child lifetimes so tests catch
/// out-of-order teardown as [`Status::ErrorValidationFailed`].
#[derive(Debug)]
pub struct MockIcd {
    loader_version: ApiVersion,
    layers: Vec<LayerProperties>,
    instance_extensions: Vec<ExtensionProperties>,
    layer_instance_extensions: HashMap<String, Vec<ExtensionProperties>>,
    layer_device_extensions: HashMap<String, Vec<ExtensionProperties>>,
    physical_devices: Vec<MockPhysicalDevice>,
    state: RefCell<IcdState>,
    counters: ProbeCounters,
}

impl MockIcd {
    /// An empty driver: no layers, no extensions, no devices.
    pub fn new(loader_version: ApiVersion) -> Self {
        Self {
            loader_version,
            layers: Vec::new(),
            instance_extensions: Vec::new(),
            layer_instance_extensions: HashMap::new(),
            layer_device_extensions: HashMap::new(),
            physical_devices: Vec::new(),
            state: RefCell::new(IcdState::default()),
            counters: ProbeCounters::default(),
        }
    }

    /// The stack most tests run against: a 1.3 loader, the validation layer
    /// (contributing the debug/diagnostic instance extensions), the profiles
    /// layer, the common window-system instance extensions, and one
    /// fully-featured discrete device.
    pub fn conformant() -> Self {
        Self::new(ApiVersion::V1_3)
            .with_layer(layers::VALIDATION, 2, 1)
            .with_layer_instance_extensions(
                layers::VALIDATION,
                vec![
                    ExtensionProperties::new(caps::DEBUG_UTILS, 2),
                    ExtensionProperties::new(caps::DEBUG_REPORT, 10),
                    ExtensionProperties::new(caps::VALIDATION_FEATURES, 5),
                ],
            )
            .with_layer(layers::PROFILES, 1, 1)
            .with_layer_device_extensions(
                layers::PROFILES,
                vec![ExtensionProperties::new(caps::PORTABILITY_SUBSET, 1)],
            )
            .with_instance_extension(caps::SURFACE, 25)
            .with_instance_extension(caps::SURFACE_HEADLESS, 1)
            .with_instance_extension(caps::SURFACE_XLIB, 6)
            .with_instance_extension(caps::GET_PHYSICAL_DEVICE_PROPERTIES2, 2)
            .with_instance_extension(caps::EXTERNAL_MEMORY_CAPABILITIES, 1)
            .with_instance_extension(caps::PORTABILITY_ENUMERATION, 1)
            .with_physical_device(MockPhysicalDevice::conformant(
                DeviceKind::DiscreteGpu,
                ApiVersion::V1_3,
            ))
    }

    pub fn with_layer(mut self, name: &str, spec_version: u32, impl_version: u32) -> Self {
        self.layers.push(LayerProperties {
            name: name.to_owned(),
            spec_version,
            impl_version,
        });
        self
    }

    pub fn without_layer(mut self, name: &str) -> Self {
        self.layers.retain(|layer| layer.name != name);
        self
    }

    pub fn with_layer_instance_extensions(
        mut self,
        layer: &str,
        extensions: Vec<ExtensionProperties>,
    ) -> Self {
        self.layer_instance_extensions
            .insert(layer.to_owned(), extensions);
        self
    }

    pub fn with_layer_device_extensions(
        mut self,
        layer: &str,
        extensions: Vec<ExtensionProperties>,
    ) -> Self {
        self.layer_device_extensions
            .insert(layer.to_owned(), extensions);
        self
    }

    pub fn with_instance_extension(mut self, name: &str, spec_version: u32) -> Self {
        self.instance_extensions
            .push(ExtensionProperties::new(name, spec_version));
        self
    }

    pub fn without_instance_extension(mut self, name: &str) -> Self {
        self.instance_extensions.retain(|ext| ext.name != name);
        self
    }

    pub fn with_physical_device(mut self, device: MockPhysicalDevice) -> Self {
        self.physical_devices.push(device);
        self
    }

    pub fn counters(&self) -> &ProbeCounters {
        &self.counters
    }

    /// The configuration a live instance was created with.
    pub fn instance_creation_config(&self, instance: InstanceHandle) -> Option<InstanceConfig> {
        self.state
            .borrow()
            .instances
            .get(&instance.0)
            .map(|state| state.config.clone())
    }

    /// The configuration a live device was created with.
    pub fn device_creation_config(&self, device: DeviceHandle) -> Option<DeviceConfig> {
        self.state
            .borrow()
            .devices
            .get(&device.0)
            .map(|state| state.config.clone())
    }

    fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer.name == name)
    }

    /// Instance extensions visible with the given layers enabled: the
    /// driver's own plus every enabled layer's contributions.
    fn visible_instance_extensions(&self, enabled_layers: &[String]) -> Vec<&ExtensionProperties> {
        let mut visible: Vec<&ExtensionProperties> = self.instance_extensions.iter().collect();
        for layer in enabled_layers {
            if let Some(extensions) = self.layer_instance_extensions.get(layer) {
                visible.extend(extensions.iter());
            }
        }
        visible
    }

    fn physical(&self, physical: PhysicalDeviceHandle) -> DriverResult<&MockPhysicalDevice> {
        let state = self.state.borrow();
        let (_, index) = *state
            .physical_owner
            .get(&physical.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        Ok(&self.physical_devices[index])
    }

    /// Whether the extended (chained) query path is visible from the instance
    /// that owns `physical`: its effective version includes it, or it enabled
    /// the extended-query capability explicitly.
    fn extended_query_visible(&self, physical: PhysicalDeviceHandle) -> DriverResult<bool> {
        let state = self.state.borrow();
        let (owner, _) = *state
            .physical_owner
            .get(&physical.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        let instance = &state.instances[&owner];
        Ok(instance.effective_version >= ApiVersion::V1_1
            || instance
                .enabled_extensions
                .iter()
                .any(|ext| ext == caps::GET_PHYSICAL_DEVICE_PROPERTIES2))
    }
}

impl Driver for MockIcd {
    fn loader_version(&self) -> ApiVersion {
        self.loader_version
    }

    fn enumerate_instance_layers(&self) -> DriverResult<Vec<LayerProperties>> {
        self.counters.layers.set(self.counters.layers.get() + 1);
        Ok(self.layers.clone())
    }

    fn enumerate_instance_extensions(
        &self,
        layer: Option<&str>,
    ) -> DriverResult<Vec<ExtensionProperties>> {
        self.counters
            .instance_extensions
            .set(self.counters.instance_extensions.get() + 1);
        match layer {
            None => Ok(self.instance_extensions.clone()),
            Some(layer) => {
                if !self.has_layer(layer) {
                    return Err(Status::ErrorLayerNotPresent);
                }
                Ok(self
                    .layer_instance_extensions
                    .get(layer)
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    fn create_instance(&self, config: &InstanceConfig) -> DriverResult<InstanceHandle> {
        for layer in &config.layers {
            if !self.has_layer(layer) {
                return Err(Status::ErrorLayerNotPresent);
            }
        }
        let visible = self.visible_instance_extensions(&config.layers);
        for requested in &config.extensions {
            if !visible.iter().any(|ext| &ext.name == requested) {
                return Err(Status::ErrorExtensionNotPresent);
            }
        }

        let requested = config.application.api_version;
        let effective_version = if requested.is_valid() {
            requested.min(self.loader_version)
        } else {
            ApiVersion::V1_0
        };

        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let physical: Vec<u64> = (0..self.physical_devices.len())
            .map(|index| {
                let phys = state.alloc();
                state.physical_owner.insert(phys, (handle, index));
                phys
            })
            .collect();
        state.instances.insert(
            handle,
            InstanceState {
                effective_version,
                enabled_layers: config.layers.clone(),
                enabled_extensions: config.extensions.clone(),
                config: config.clone(),
                physical,
                devices: HashSet::new(),
                surfaces: HashSet::new(),
            },
        );
        Ok(InstanceHandle(handle))
    }

    fn destroy_instance(&self, instance: InstanceHandle) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .instances
            .get(&instance.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        if !entry.devices.is_empty() || !entry.surfaces.is_empty() {
            return Err(Status::ErrorValidationFailed);
        }
        let entry = state.instances.remove(&instance.0).unwrap();
        for phys in entry.physical {
            state.physical_owner.remove(&phys);
        }
        Ok(())
    }

    fn enumerate_physical_devices(
        &self,
        instance: InstanceHandle,
    ) -> DriverResult<Vec<PhysicalDeviceHandle>> {
        let state = self.state.borrow();
        let entry = state
            .instances
            .get(&instance.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        Ok(entry.physical.iter().map(|&h| PhysicalDeviceHandle(h)).collect())
    }

    fn physical_device_properties(
        &self,
        physical: PhysicalDeviceHandle,
    ) -> DriverResult<PhysicalDeviceProperties> {
        Ok(self.physical(physical)?.properties.clone())
    }

    fn enumerate_device_extensions(
        &self,
        physical: PhysicalDeviceHandle,
        layer: Option<&str>,
    ) -> DriverResult<Vec<ExtensionProperties>> {
        self.counters
            .device_extensions
            .set(self.counters.device_extensions.get() + 1);
        let device = self.physical(physical)?;
        match layer {
            None => Ok(device.extensions.clone()),
            Some(layer) => {
                if !self.has_layer(layer) {
                    return Err(Status::ErrorLayerNotPresent);
                }
                Ok(self
                    .layer_device_extensions
                    .get(layer)
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    fn queue_family_properties(
        &self,
        physical: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<QueueFamilyProperties>> {
        Ok(self.physical(physical)?.queue_families.clone())
    }

    fn features(&self, physical: PhysicalDeviceHandle) -> DriverResult<DeviceFeatures> {
        Ok(self.physical(physical)?.features & DeviceFeatures::BASE)
    }

    fn driver_properties(&self, physical: PhysicalDeviceHandle) -> DriverResult<DriverProperties> {
        if !self.extended_query_visible(physical)? {
            return Err(Status::ErrorExtensionNotPresent);
        }
        Ok(self.physical(physical)?.driver.clone())
    }

    fn features2(&self, physical: PhysicalDeviceHandle) -> DriverResult<DeviceFeatures> {
        if !self.extended_query_visible(physical)? {
            return Err(Status::ErrorExtensionNotPresent);
        }
        Ok(self.physical(physical)?.features)
    }

    fn format_properties(
        &self,
        physical: PhysicalDeviceHandle,
        format: Format,
    ) -> DriverResult<FormatProperties> {
        Ok(self
            .physical(physical)?
            .formats
            .get(&format)
            .copied()
            .unwrap_or_default())
    }

    fn create_device(
        &self,
        physical: PhysicalDeviceHandle,
        config: &DeviceConfig,
    ) -> DriverResult<DeviceHandle> {
        let device = self.physical(physical)?;

        let mut state = self.state.borrow_mut();
        let (owner, _) = state.physical_owner[&physical.0];
        let enabled_layers = state.instances[&owner].enabled_layers.clone();

        for requested in &config.extensions {
            let native = device.extensions.iter().any(|ext| &ext.name == requested);
            let layered = enabled_layers.iter().any(|layer| {
                self.layer_device_extensions
                    .get(layer)
                    .is_some_and(|exts| exts.iter().any(|ext| &ext.name == requested))
            });
            if !native && !layered {
                return Err(Status::ErrorExtensionNotPresent);
            }
        }

        let requested_features = config.requested_features();
        if !device.features.contains(requested_features) {
            return Err(Status::ErrorFeatureNotPresent);
        }

        for queue in &config.queues {
            let family = device
                .queue_families
                .get(queue.family_index as usize)
                .ok_or(Status::ErrorValidationFailed)?;
            if queue.priorities.len() as u32 > family.count {
                return Err(Status::ErrorValidationFailed);
            }
        }

        let handle = state.alloc();
        state.devices.insert(
            handle,
            DeviceState {
                instance: owner,
                config: config.clone(),
                enabled_extensions: config.extensions.clone(),
                ..DeviceState::default()
            },
        );
        state.instances.get_mut(&owner).unwrap().devices.insert(handle);
        Ok(DeviceHandle(handle))
    }

    fn destroy_device(&self, device: DeviceHandle) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        if !entry.pools.is_empty()
            || !entry.images.is_empty()
            || !entry.views.is_empty()
            || !entry.render_passes.is_empty()
            || !entry.framebuffers.is_empty()
            || !entry.swapchains.is_empty()
        {
            return Err(Status::ErrorValidationFailed);
        }
        let entry = state.devices.remove(&device.0).unwrap();
        if let Some(instance) = state.instances.get_mut(&entry.instance) {
            instance.devices.remove(&device.0);
        }
        Ok(())
    }

    fn device_wait_idle(&self, device: DeviceHandle) -> DriverResult<()> {
        let state = self.state.borrow();
        state
            .devices
            .get(&device.0)
            .map(|_| ())
            .ok_or(Status::ErrorUnknownHandle)
    }

    fn get_queue(
        &self,
        device: DeviceHandle,
        family_index: u32,
        queue_index: u32,
    ) -> DriverResult<QueueHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        let queue = *entry
            .queues
            .entry((family_index, queue_index))
            .or_insert(handle);
        Ok(QueueHandle(queue))
    }

    fn create_command_pool(
        &self,
        device: DeviceHandle,
        _family_index: u32,
    ) -> DriverResult<CommandPoolHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        entry.pools.insert(handle, HashSet::new());
        Ok(CommandPoolHandle(handle))
    }

    fn destroy_command_pool(
        &self,
        device: DeviceHandle,
        pool: CommandPoolHandle,
    ) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        // Destroying a pool frees its remaining command buffers.
        entry
            .pools
            .remove(&pool.0)
            .map(|_| ())
            .ok_or(Status::ErrorUnknownHandle)
    }

    fn allocate_command_buffer(
        &self,
        device: DeviceHandle,
        pool: CommandPoolHandle,
    ) -> DriverResult<CommandBufferHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        let buffers = entry.pools.get_mut(&pool.0).ok_or(Status::ErrorUnknownHandle)?;
        buffers.insert(handle);
        Ok(CommandBufferHandle(handle))
    }

    fn free_command_buffer(
        &self,
        device: DeviceHandle,
        pool: CommandPoolHandle,
        buffer: CommandBufferHandle,
    ) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        let buffers = entry.pools.get_mut(&pool.0).ok_or(Status::ErrorUnknownHandle)?;
        if !buffers.remove(&buffer.0) {
            return Err(Status::ErrorUnknownHandle);
        }
        Ok(())
    }

    fn create_image(&self, device: DeviceHandle, _desc: &ImageDesc) -> DriverResult<ImageHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        entry.images.insert(handle);
        Ok(ImageHandle(handle))
    }

    fn destroy_image(&self, device: DeviceHandle, image: ImageHandle) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        if entry.views.values().any(|&img| img == image.0) {
            return Err(Status::ErrorValidationFailed);
        }
        if !entry.images.remove(&image.0) {
            return Err(Status::ErrorUnknownHandle);
        }
        Ok(())
    }

    fn create_image_view(
        &self,
        device: DeviceHandle,
        image: ImageHandle,
    ) -> DriverResult<ImageViewHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        let swapchain_owned = entry
            .swapchains
            .values()
            .any(|(_, images)| images.contains(&image.0));
        if !entry.images.contains(&image.0) && !swapchain_owned {
            return Err(Status::ErrorUnknownHandle);
        }
        entry.views.insert(handle, image.0);
        Ok(ImageViewHandle(handle))
    }

    fn destroy_image_view(&self, device: DeviceHandle, view: ImageViewHandle) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        entry
            .views
            .remove(&view.0)
            .map(|_| ())
            .ok_or(Status::ErrorUnknownHandle)
    }

    fn create_render_pass(
        &self,
        device: DeviceHandle,
        _desc: &RenderPassDesc,
    ) -> DriverResult<RenderPassHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        entry.render_passes.insert(handle);
        Ok(RenderPassHandle(handle))
    }

    fn destroy_render_pass(
        &self,
        device: DeviceHandle,
        render_pass: RenderPassHandle,
    ) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        if entry.framebuffers.values().any(|&rp| rp == render_pass.0) {
            return Err(Status::ErrorValidationFailed);
        }
        if !entry.render_passes.remove(&render_pass.0) {
            return Err(Status::ErrorUnknownHandle);
        }
        Ok(())
    }

    fn create_framebuffer(
        &self,
        device: DeviceHandle,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        _width: u32,
        _height: u32,
    ) -> DriverResult<FramebufferHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        if !entry.render_passes.contains(&render_pass.0) {
            return Err(Status::ErrorUnknownHandle);
        }
        for view in attachments {
            if !entry.views.contains_key(&view.0) {
                return Err(Status::ErrorUnknownHandle);
            }
        }
        entry.framebuffers.insert(handle, render_pass.0);
        Ok(FramebufferHandle(handle))
    }

    fn destroy_framebuffer(
        &self,
        device: DeviceHandle,
        framebuffer: FramebufferHandle,
    ) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        entry
            .framebuffers
            .remove(&framebuffer.0)
            .map(|_| ())
            .ok_or(Status::ErrorUnknownHandle)
    }

    fn create_surface(
        &self,
        instance: InstanceHandle,
        desc: &SurfaceDesc,
    ) -> DriverResult<SurfaceHandle> {
        let mut state = self.state.borrow_mut();
        let handle = state.alloc();
        let entry = state
            .instances
            .get_mut(&instance.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        let satisfied = |name: &str| entry.enabled_extensions.iter().any(|ext| ext == name);
        let wsi_enabled = match desc {
            SurfaceDesc::Headless => satisfied(caps::SURFACE_HEADLESS),
            SurfaceDesc::Window { .. } => {
                satisfied(caps::SURFACE_XLIB) || satisfied(caps::SURFACE_WIN32)
            }
        };
        if !wsi_enabled {
            return Err(Status::ErrorExtensionNotPresent);
        }
        entry.surfaces.insert(handle);
        state.surfaces.insert(handle, instance.0);
        Ok(SurfaceHandle(handle))
    }

    fn destroy_surface(
        &self,
        instance: InstanceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        if state.surfaces.get(&surface.0) != Some(&instance.0) {
            return Err(Status::ErrorUnknownHandle);
        }
        let has_live_swapchain = state
            .devices
            .values()
            .any(|dev| dev.swapchains.values().any(|(s, _)| *s == surface.0));
        if has_live_swapchain {
            return Err(Status::ErrorValidationFailed);
        }
        state.surfaces.remove(&surface.0);
        if let Some(entry) = state.instances.get_mut(&instance.0) {
            entry.surfaces.remove(&surface.0);
        }
        Ok(())
    }

    fn surface_supported(
        &self,
        physical: PhysicalDeviceHandle,
        family_index: u32,
        surface: SurfaceHandle,
    ) -> DriverResult<bool> {
        let device = self.physical(physical)?;
        let state = self.state.borrow();
        if !state.surfaces.contains_key(&surface.0) {
            return Err(Status::ErrorSurfaceLost);
        }
        if family_index as usize >= device.queue_families.len() {
            return Err(Status::ErrorValidationFailed);
        }
        Ok(device.surface_support)
    }

    fn surface_capabilities(
        &self,
        physical: PhysicalDeviceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<SurfaceCapabilities> {
        if !self.state.borrow().surfaces.contains_key(&surface.0) {
            return Err(Status::ErrorSurfaceLost);
        }
        Ok(self.physical(physical)?.surface_caps)
    }

    fn surface_formats(
        &self,
        physical: PhysicalDeviceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<Vec<SurfaceFormat>> {
        if !self.state.borrow().surfaces.contains_key(&surface.0) {
            return Err(Status::ErrorSurfaceLost);
        }
        Ok(self.physical(physical)?.surface_formats.clone())
    }

    fn surface_present_modes(
        &self,
        physical: PhysicalDeviceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<Vec<PresentMode>> {
        if !self.state.borrow().surfaces.contains_key(&surface.0) {
            return Err(Status::ErrorSurfaceLost);
        }
        Ok(self.physical(physical)?.present_modes.clone())
    }

    fn create_swapchain(
        &self,
        device: DeviceHandle,
        config: &SwapchainConfig,
    ) -> DriverResult<SwapchainHandle> {
        let mut state = self.state.borrow_mut();
        if !state.surfaces.contains_key(&config.surface.0) {
            return Err(Status::ErrorSurfaceLost);
        }
        {
            let entry = state
                .devices
                .get(&device.0)
                .ok_or(Status::ErrorUnknownHandle)?;
            if !entry
                .enabled_extensions
                .iter()
                .any(|ext| ext == caps::SWAPCHAIN)
            {
                return Err(Status::ErrorExtensionNotPresent);
            }
        }
        let image_count = config.min_image_count.max(1);
        let images: Vec<u64> = (0..image_count).map(|_| state.alloc()).collect();
        let handle = state.alloc();
        state
            .devices
            .get_mut(&device.0)
            .unwrap()
            .swapchains
            .insert(handle, (config.surface.0, images));
        Ok(SwapchainHandle(handle))
    }

    fn swapchain_images(
        &self,
        device: DeviceHandle,
        swapchain: SwapchainHandle,
    ) -> DriverResult<Vec<ImageHandle>> {
        let state = self.state.borrow();
        let entry = state
            .devices
            .get(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        let (_, images) = entry
            .swapchains
            .get(&swapchain.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        Ok(images.iter().map(|&h| ImageHandle(h)).collect())
    }

    fn destroy_swapchain(
        &self,
        device: DeviceHandle,
        swapchain: SwapchainHandle,
    ) -> DriverResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .devices
            .get_mut(&device.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        // Swapchain images die with the swapchain; any view onto them must
        // already be gone.
        let (_, images) = entry
            .swapchains
            .get(&swapchain.0)
            .ok_or(Status::ErrorUnknownHandle)?;
        if entry.views.values().any(|view| images.contains(view)) {
            return Err(Status::ErrorValidationFailed);
        }
        entry.swapchains.remove(&swapchain.0);
        Ok(())
    }
}
