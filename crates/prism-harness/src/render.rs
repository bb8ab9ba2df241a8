use prism_icd::{
    Driver, DriverResult, FramebufferHandle, ImageHandle, ImageViewHandle, PhysicalDeviceHandle,
    RenderPassHandle, Format, FormatFeatures, ImageTiling,
};

/// Render-target objects owned by the harness across a test.
///
/// Thin bookkeeping only: the harness creates these so teardown ordering has
/// something real to exercise, not to render with.
#[derive(Debug, Default)]
pub struct RenderTargets {
    pub(crate) format: Option<Format>,
    pub(crate) render_pass: Option<RenderPassHandle>,
    pub(crate) framebuffer: Option<FramebufferHandle>,
    pub(crate) images: Vec<ImageHandle>,
    pub(crate) views: Vec<ImageViewHandle>,
}

impl RenderTargets {
    pub fn render_pass(&self) -> Option<RenderPassHandle> {
        self.render_pass
    }

    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    pub fn views(&self) -> &[ImageViewHandle] {
        &self.views
    }

    pub fn format(&self) -> Option<Format> {
        self.format
    }
}

/// Pick a color format usable as a render target: bgra8 if either tiling
/// supports color attachment, else rgba8, else `None` (no usable target).
pub(crate) fn select_render_target_format(
    driver: &dyn Driver,
    physical: PhysicalDeviceHandle,
) -> DriverResult<Option<Format>> {
    for format in [Format::Bgra8Unorm, Format::Rgba8Unorm] {
        let props = driver.format_properties(physical, format)?;
        if props.linear.contains(FormatFeatures::COLOR_ATTACHMENT)
            || props.optimal.contains(FormatFeatures::COLOR_ATTACHMENT)
        {
            return Ok(Some(format));
        }
    }
    Ok(None)
}

/// Pick the tiling a target image should use for `format`: linear when it
/// supports color attachment, else optimal when it does, else `None`.
pub(crate) fn select_target_tiling(
    driver: &dyn Driver,
    physical: PhysicalDeviceHandle,
    format: Format,
) -> DriverResult<Option<ImageTiling>> {
    let props = driver.format_properties(physical, format)?;
    if props.linear.contains(FormatFeatures::COLOR_ATTACHMENT) {
        return Ok(Some(ImageTiling::Linear));
    }
    if props.optimal.contains(FormatFeatures::COLOR_ATTACHMENT) {
        return Ok(Some(ImageTiling::Optimal));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_caps::ApiVersion;
    use prism_icd::{
        DeviceKind, FormatProperties, InstanceConfig, MockIcd, MockPhysicalDevice,
    };

    fn first_physical(icd: &MockIcd) -> PhysicalDeviceHandle {
        let instance = icd
            .create_instance(&InstanceConfig::new("t", ApiVersion::V1_3))
            .unwrap();
        icd.enumerate_physical_devices(instance).unwrap()[0]
    }

    #[test]
    fn format_probe_prefers_bgra8() {
        let icd = MockIcd::new(ApiVersion::V1_3).with_physical_device(
            MockPhysicalDevice::conformant(DeviceKind::DiscreteGpu, ApiVersion::V1_3),
        );
        let physical = first_physical(&icd);
        assert_eq!(
            select_render_target_format(&icd, physical).unwrap(),
            Some(Format::Bgra8Unorm)
        );
    }

    #[test]
    fn format_probe_falls_back_to_rgba8_then_gives_up() {
        let mut device = MockPhysicalDevice::conformant(DeviceKind::DiscreteGpu, ApiVersion::V1_3);
        device
            .formats
            .insert(Format::Bgra8Unorm, FormatProperties::default());
        let icd = MockIcd::new(ApiVersion::V1_3).with_physical_device(device);
        let physical = first_physical(&icd);
        assert_eq!(
            select_render_target_format(&icd, physical).unwrap(),
            Some(Format::Rgba8Unorm)
        );

        let mut bare = MockPhysicalDevice::conformant(DeviceKind::DiscreteGpu, ApiVersion::V1_3);
        bare.formats.clear();
        let icd = MockIcd::new(ApiVersion::V1_3).with_physical_device(bare);
        let physical = first_physical(&icd);
        assert_eq!(select_render_target_format(&icd, physical).unwrap(), None);
    }
}
