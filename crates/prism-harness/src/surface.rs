use prism_caps::caps;
use prism_icd::{
    CompositeAlpha, Driver, DriverResult, InstanceHandle, PresentMode, SurfaceCapabilities,
    SurfaceDesc, SurfaceFormat, SurfaceHandle,
};

use crate::resolve::EnabledSet;

/// One window-system backend.
///
/// Each implementation owns whatever windowing context its platform needs and
/// names the instance capability that must be enabled for it to work; the
/// harness selects an implementation at runtime from the enabled set.
pub trait SurfaceProvider {
    /// Instance capability this provider depends on.
    fn capability(&self) -> &'static str;

    fn create_surface(
        &mut self,
        driver: &dyn Driver,
        instance: InstanceHandle,
    ) -> DriverResult<SurfaceHandle>;

    /// Tear down window-system resources. Called after the surface handle
    /// itself has been destroyed; must be safe to call when nothing was ever
    /// created.
    fn destroy_context(&mut self);
}

/// Surface without any window system behind it.
#[derive(Debug, Default)]
pub struct HeadlessSurface;

impl SurfaceProvider for HeadlessSurface {
    fn capability(&self) -> &'static str {
        caps::SURFACE_HEADLESS
    }

    fn create_surface(
        &mut self,
        driver: &dyn Driver,
        instance: InstanceHandle,
    ) -> DriverResult<SurfaceHandle> {
        driver.create_surface(instance, &SurfaceDesc::Headless)
    }

    fn destroy_context(&mut self) {}
}

/// Windowed surface for one of the windowing-system capabilities.
#[derive(Debug)]
pub struct WindowSurface {
    capability: &'static str,
    width: u32,
    height: u32,
    window_open: bool,
}

impl WindowSurface {
    /// Whether the backing window currently exists.
    pub fn window_open(&self) -> bool {
        self.window_open
    }

    pub fn xlib(width: u32, height: u32) -> Self {
        Self {
            capability: caps::SURFACE_XLIB,
            width,
            height,
            window_open: false,
        }
    }

    pub fn win32(width: u32, height: u32) -> Self {
        Self {
            capability: caps::SURFACE_WIN32,
            width,
            height,
            window_open: false,
        }
    }
}

impl SurfaceProvider for WindowSurface {
    fn capability(&self) -> &'static str {
        self.capability
    }

    fn create_surface(
        &mut self,
        driver: &dyn Driver,
        instance: InstanceHandle,
    ) -> DriverResult<SurfaceHandle> {
        self.window_open = true;
        driver.create_surface(
            instance,
            &SurfaceDesc::Window {
                width: self.width,
                height: self.height,
            },
        )
    }

    fn destroy_context(&mut self) {
        self.window_open = false;
    }
}

/// Pick a provider for the first enabled window-system capability.
pub(crate) fn select_provider(enabled: &EnabledSet) -> Option<Box<dyn SurfaceProvider>> {
    if enabled.contains(caps::SURFACE_HEADLESS) {
        return Some(Box::<HeadlessSurface>::default());
    }
    if enabled.contains(caps::SURFACE_XLIB) {
        return Some(Box::new(WindowSurface::xlib(256, 256)));
    }
    if enabled.contains(caps::SURFACE_WIN32) {
        return Some(Box::new(WindowSurface::win32(256, 256)));
    }
    None
}

/// Everything a swapchain creation needs to know about a surface.
#[derive(Debug, Clone)]
pub struct SurfaceInformation {
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
    /// First non-shared present mode, when the driver offers one. Shared
    /// modes carry obligations most tests do not want.
    pub non_shared_present_mode: Option<PresentMode>,
    pub composite_alpha: CompositeAlpha,
}

impl SurfaceInformation {
    pub(crate) fn gather(
        driver: &dyn Driver,
        physical: prism_icd::PhysicalDeviceHandle,
        surface: SurfaceHandle,
    ) -> DriverResult<Self> {
        let capabilities = driver.surface_capabilities(physical, surface)?;
        let formats = driver.surface_formats(physical, surface)?;
        let present_modes = driver.surface_present_modes(physical, surface)?;
        let non_shared_present_mode = present_modes
            .iter()
            .copied()
            .find(|mode| !mode.is_shared());
        Ok(Self {
            capabilities,
            formats,
            present_modes,
            non_shared_present_mode,
            composite_alpha: CompositeAlpha::Opaque,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_caps::ApiVersion;
    use prism_icd::{Driver as _, InstanceConfig, MockIcd};

    #[test]
    fn window_provider_tracks_its_window_context() {
        let icd = MockIcd::conformant();
        let mut config = InstanceConfig::new("t", ApiVersion::V1_3);
        config.extensions.push(caps::SURFACE.to_owned());
        config.extensions.push(caps::SURFACE_XLIB.to_owned());
        let instance = icd.create_instance(&config).unwrap();

        let mut provider = WindowSurface::xlib(64, 64);
        assert!(!provider.window_open());
        let surface = provider.create_surface(&icd, instance).unwrap();
        assert!(provider.window_open());

        icd.destroy_surface(instance, surface).unwrap();
        provider.destroy_context();
        assert!(!provider.window_open());
    }

    #[test]
    fn provider_selection_prefers_headless() {
        let mut enabled = EnabledSet::default();
        assert!(select_provider(&enabled).is_none());

        enabled.insert(caps::SURFACE_XLIB.to_owned());
        assert_eq!(
            select_provider(&enabled).unwrap().capability(),
            caps::SURFACE_XLIB
        );

        enabled.insert(caps::SURFACE_HEADLESS.to_owned());
        assert_eq!(
            select_provider(&enabled).unwrap().capability(),
            caps::SURFACE_HEADLESS
        );
    }
}
