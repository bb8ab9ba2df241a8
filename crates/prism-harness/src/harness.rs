use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{debug, info, warn};

use prism_caps::{caps, device_registry, instance_registry, ApiVersion};
use prism_icd::{
    CommandBufferHandle, CommandPoolHandle, ConfigFragment, DeviceConfig, DeviceFeatures,
    DeviceHandle, Driver, Feature, Format, ImageDesc, ImageHandle, ImageUsage, InstanceConfig,
    InstanceFlags, InstanceHandle, MessageSeverity, PhysicalDeviceHandle,
    PhysicalDeviceProperties, QueueFlags, QueueHandle, QueueRequest, RenderPassDesc, Status,
    SurfaceHandle, SwapchainConfig, SwapchainHandle, ValidationCheck, MOCK_DEVICE_NAME,
};

use crate::env::{HarnessEnv, ValidationSelect};
use crate::features::{promoted_feature_flags, FeatureRequirements};
use crate::probe::AvailabilityProber;
use crate::render::{select_render_target_format, select_target_tiling, RenderTargets};
use crate::resolve::{
    plan_device_additions, plan_instance_additions, EnabledSet, RequestedSet, ResolveCtx,
};
use crate::surface::{select_provider, SurfaceInformation, SurfaceProvider};

/// Where a harness is in its bring-up. Transitions are strictly forward and
/// never skip a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BringUpPhase {
    Uninitialized,
    InstanceCreated,
    PhysicalDeviceSelected,
    DeviceCreated,
    TornDown,
}

/// Why a test was skipped: an environment or hardware limitation, explicitly
/// distinct from both pass and fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    VersionTooLow {
        required: ApiVersion,
        available: ApiVersion,
    },
    RequiredCapabilitiesUnsupported {
        names: Vec<String>,
    },
    NoWindowSystemSupport,
    RequiredFeatureUnavailable {
        feature: Feature,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::VersionTooLow {
                required,
                available,
            } => write!(f, "at least API version {required} is required, have {available}"),
            SkipReason::RequiredCapabilitiesUnsupported { names } => {
                write!(f, "required capabilities not supported: {}", names.join(", "))
            }
            SkipReason::NoWindowSystemSupport => {
                f.write_str("no requested window-system capability is supported")
            }
            SkipReason::RequiredFeatureUnavailable { feature } => {
                write!(f, "required feature {feature} is not available on device")
            }
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SetupError {
    /// Environment/hardware limitation: abort the rest of the test body
    /// without failing it.
    #[error("skipped: {0}")]
    Skip(SkipReason),
    /// Non-success status from a driver call. Hard failure.
    #[error("driver call failed: {0}")]
    Driver(Status),
    /// A feature flag registered as both required and disabled. Hard failure.
    #[error("conflicting requirement for feature {0}")]
    ConflictingFeature(Feature),
    /// The driver enumerated no physical devices at all. Hard failure.
    #[error("no physical device available")]
    NoPhysicalDevice,
    /// Bring-up operations called out of order. Hard failure.
    #[error("bring-up order violation: {0}")]
    Invariant(&'static str),
}

impl SetupError {
    pub fn is_skip(&self) -> bool {
        matches!(self, SetupError::Skip(_))
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            SetupError::Skip(reason) => Some(reason),
            _ => None,
        }
    }
}

pub type SetupResult<T = ()> = Result<T, SetupError>;

/// One-per-process latch for the driver-info print.
static DRIVER_INFO_PRINTED: OnceLock<()> = OnceLock::new();

/// Per-test negotiation state plus every live object bring-up creates.
///
/// A test declares its wants through the `add_*` methods, then drives
/// [`Harness::init_instance`] and [`Harness::init_device`]; teardown releases
/// everything in dependency order and is idempotent. Nothing is shared
/// between harnesses except the process-wide driver-info latch.
pub struct Harness<'d> {
    driver: &'d dyn Driver,
    env: HarnessEnv,
    prober: AvailabilityProber<'d>,
    phase: BringUpPhase,

    target_version: ApiVersion,
    allow_promoted: bool,
    requested: RequestedSet,
    features: FeatureRequirements,
    layers: Vec<String>,
    instance_enabled: EnabledSet,
    device_enabled: EnabledSet,
    diagnostics: Vec<String>,

    width: u32,
    height: u32,

    instance: Option<InstanceHandle>,
    physical: Option<PhysicalDeviceHandle>,
    physical_properties: Option<PhysicalDeviceProperties>,
    device_version: ApiVersion,
    device: Option<DeviceHandle>,
    graphics_family: Option<u32>,
    queue: Option<QueueHandle>,
    command_pool: Option<CommandPoolHandle>,
    command_buffer: Option<CommandBufferHandle>,
    surface_provider: Option<Box<dyn SurfaceProvider>>,
    surface: Option<SurfaceHandle>,
    surface_info: Option<SurfaceInformation>,
    swapchain: Option<SwapchainHandle>,
    swapchain_images: Vec<ImageHandle>,
    render: RenderTargets,
}

impl<'d> Harness<'d> {
    pub fn new(driver: &'d dyn Driver) -> Self {
        Self::with_env(driver, HarnessEnv::from_env())
    }

    pub fn with_env(driver: &'d dyn Driver, env: HarnessEnv) -> Self {
        Self {
            driver,
            env,
            prober: AvailabilityProber::new(driver),
            phase: BringUpPhase::Uninitialized,
            target_version: ApiVersion::V1_0,
            allow_promoted: false,
            requested: RequestedSet::default(),
            features: FeatureRequirements::default(),
            layers: vec![prism_caps::layers::VALIDATION.to_owned()],
            instance_enabled: EnabledSet::default(),
            device_enabled: EnabledSet::default(),
            diagnostics: Vec::new(),
            width: 256,
            height: 256,
            instance: None,
            physical: None,
            physical_properties: None,
            device_version: ApiVersion::INVALID,
            device: None,
            graphics_family: None,
            queue: None,
            command_pool: None,
            command_buffer: None,
            surface_provider: None,
            surface: None,
            surface_info: None,
            swapchain: None,
            swapchain_images: Vec::new(),
            render: RenderTargets::default(),
        }
    }

    // ── Declaration phase ───────────────────────────────────────────────────

    /// Minimum API version the test targets; bring-up skips when the
    /// negotiated usable version is lower.
    pub fn set_target_version(&mut self, version: ApiVersion) {
        assert_eq!(
            self.phase,
            BringUpPhase::Uninitialized,
            "target version must be set before bring-up"
        );
        self.target_version = version;
    }

    /// Keep promoted capabilities in the explicit enabled sets instead of
    /// relying on their core-version form.
    pub fn set_allow_promoted(&mut self, allow: bool) {
        self.allow_promoted = allow;
    }

    pub fn add_layer(&mut self, name: &str) {
        assert_eq!(
            self.phase,
            BringUpPhase::Uninitialized,
            "layers must be requested before bring-up"
        );
        if !self.layers.iter().any(|layer| layer == name) {
            self.layers.push(name.to_owned());
        }
    }

    /// Declare a capability the test cannot run without. Bring-up skips if it
    /// (or any transitive prerequisite) cannot be enabled.
    pub fn add_required(&mut self, name: &str) {
        assert_eq!(
            self.phase,
            BringUpPhase::Uninitialized,
            "requests are frozen once bring-up begins"
        );
        self.requested.add_required(name);
        self.add_requested_instance_capability(name);
    }

    /// Declare a capability the test can use but does not need.
    pub fn add_optional(&mut self, name: &str) {
        assert_eq!(
            self.phase,
            BringUpPhase::Uninitialized,
            "requests are frozen once bring-up begins"
        );
        self.requested.add_optional(name);
        self.add_requested_instance_capability(name);
    }

    /// Declare a window-system capability; at least one of those declared
    /// must be enableable or bring-up skips.
    pub fn add_window_system(&mut self, name: &str) {
        assert_eq!(
            self.phase,
            BringUpPhase::Uninitialized,
            "requests are frozen once bring-up begins"
        );
        self.requested.add_window_system(name);
        self.add_requested_instance_capability(name);
    }

    pub fn add_required_feature(&mut self, feature: Feature) -> SetupResult {
        self.features.add_required(feature)
    }

    pub fn add_disabled_feature(&mut self, feature: Feature) -> SetupResult {
        self.features.add_disabled(feature)
    }

    // ── Resolution ──────────────────────────────────────────────────────────

    fn resolve_ctx(&self) -> ResolveCtx<'_, 'd> {
        ResolveCtx {
            prober: &self.prober,
            enabled_layers: &self.layers,
            physical: self.physical,
            instance_promotion_version: self.target_version,
            device_promotion_version: self.device_version,
            allow_promoted: self.allow_promoted,
        }
    }

    fn add_requested_instance_capability(&mut self, name: &str) -> bool {
        let plan = {
            let ctx = self.resolve_ctx();
            plan_instance_additions(name, &ctx, &self.instance_enabled)
        };
        match plan {
            Some(additions) => {
                for addition in additions {
                    self.instance_enabled.insert(addition);
                }
                true
            }
            None => false,
        }
    }

    fn add_requested_device_capability(&mut self, name: &str) -> bool {
        let plan = {
            let ctx = self.resolve_ctx();
            plan_device_additions(name, &ctx, &self.device_enabled)
        };
        match plan {
            Some(additions) => {
                for addition in additions {
                    self.device_enabled.insert(addition);
                }
                true
            }
            None => false,
        }
    }

    /// Whether `name` is enabled (or promotion-satisfied) in either scope.
    pub fn capability_enabled(&self, name: &str) -> bool {
        let ctx = self.resolve_ctx();
        ctx.can_enable_device(name, &self.device_enabled)
            || ctx.can_enable_instance(name, &self.instance_enabled)
    }

    /// Required capabilities that cannot be enabled in either scope.
    pub fn required_capabilities_unsupported(&self) -> Vec<String> {
        let ctx = self.resolve_ctx();
        self.requested
            .required
            .iter()
            .filter(|name| {
                !ctx.can_enable_device(name, &self.device_enabled)
                    && !ctx.can_enable_instance(name, &self.instance_enabled)
            })
            .cloned()
            .collect()
    }

    // ── Bring-up: instance + physical device ────────────────────────────────

    pub fn init_instance(&mut self) -> SetupResult {
        self.init_instance_with(Vec::new())
    }

    /// Create the instance and select a physical device. `extra` fragments
    /// are moved into the creation config ahead of the harness's own.
    pub fn init_instance_with(&mut self, extra: Vec<ConfigFragment>) -> SetupResult {
        if self.phase != BringUpPhase::Uninitialized {
            return Err(SetupError::Invariant(
                "init_instance called with an instance already created",
            ));
        }

        // The driver-info print needs the extended property query.
        if self.env.print_driver_info
            && DRIVER_INFO_PRINTED.get().is_none()
            && self
                .prober
                .instance_extension_supported(caps::GET_PHYSICAL_DEVICE_PROPERTIES2, 0)
        {
            self.instance_enabled
                .insert(caps::GET_PHYSICAL_DEVICE_PROPERTIES2.to_owned());
        }

        if self.env.emulate_portability {
            self.requested.add_required(caps::PORTABILITY_ENUMERATION);
            self.add_requested_instance_capability(caps::PORTABILITY_ENUMERATION);
            self.requested.add_required(caps::PORTABILITY_SUBSET);
            self.add_requested_instance_capability(caps::PORTABILITY_SUBSET);
        }

        // Promotion rewrite: names satisfied by the target core version leave
        // the pending lists instead of being enabled explicitly.
        if !self.allow_promoted {
            let target = self.target_version;
            let promoted =
                |name: &String| instance_registry().promoted_by(name, target);
            self.requested.required.retain(|name| !promoted(name));
            self.requested.optional.retain(|name| !promoted(name));
            self.instance_enabled.retain(|name| !promoted(name));
        }

        // Drop unsupported layers and instance capabilities, non-fatally.
        let unsupported_layers: Vec<String> = self
            .layers
            .iter()
            .filter(|layer| !self.prober.instance_layer_supported(layer, 0, 0))
            .cloned()
            .collect();
        for layer in &unsupported_layers {
            self.diagnose(format!(
                "init_instance: requested layer {layer:?} is not supported; it will be disabled"
            ));
        }
        self.layers.retain(|layer| !unsupported_layers.contains(layer));

        let unsupported_extensions: Vec<String> = self
            .instance_enabled
            .names()
            .iter()
            .filter(|name| !self.prober.instance_extension_supported(name, 0))
            .cloned()
            .collect();
        for name in &unsupported_extensions {
            self.diagnose(format!(
                "init_instance: requested capability {name:?} is not supported; it will be disabled"
            ));
        }
        self.instance_enabled
            .retain(|name| !unsupported_extensions.contains(name));

        let mut config = InstanceConfig::new("prism_layer_tests", self.target_version);
        config.layers = self.layers.clone();
        config.extensions = self.instance_enabled.names().to_vec();
        if self.instance_enabled.contains(caps::PORTABILITY_ENUMERATION) {
            config.flags |= InstanceFlags::ENUMERATE_PORTABILITY;
        }
        config.fragments = self.compose_instance_fragments(extra);

        let instance = self
            .driver
            .create_instance(&config)
            .map_err(SetupError::Driver)?;
        self.instance = Some(instance);
        self.phase = BringUpPhase::InstanceCreated;
        debug!(layers = ?config.layers, extensions = ?config.extensions, "instance created");

        self.select_physical_device(instance)?;

        // Usable version is whatever both ends actually speak.
        let properties = self
            .physical_properties
            .as_ref()
            .expect("selection just completed");
        let available = self.driver.loader_version().min(properties.api_version);
        if available < self.target_version {
            return Err(SetupError::Skip(SkipReason::VersionTooLow {
                required: self.target_version,
                available,
            }));
        }

        let required: Vec<String> = self.requested.required.clone();
        for name in &required {
            self.add_requested_device_capability(name);
        }
        let missing = self.required_capabilities_unsupported();
        if !missing.is_empty() {
            return Err(SetupError::Skip(SkipReason::RequiredCapabilitiesUnsupported {
                names: missing,
            }));
        }

        // Of the window-system requests, one enableable capability suffices.
        if !self.requested.window_system.is_empty() {
            let ctx = self.resolve_ctx();
            let any_supported = self
                .requested
                .window_system
                .iter()
                .any(|name| ctx.can_enable_instance(name, &self.instance_enabled));
            if !any_supported {
                return Err(SetupError::Skip(SkipReason::NoWindowSystemSupport));
            }
        }

        let optional: Vec<String> = self.requested.optional.clone();
        for name in &optional {
            self.add_requested_device_capability(name);
        }

        Ok(())
    }

    fn compose_instance_fragments(&self, extra: Vec<ConfigFragment>) -> Vec<ConfigFragment> {
        let mut fragments = extra;

        if !fragments
            .iter()
            .any(|f| matches!(f, ConfigFragment::DebugMessenger { .. }))
        {
            fragments.insert(
                0,
                ConfigFragment::DebugMessenger {
                    min_severity: MessageSeverity::Warning,
                },
            );
        }

        let validation_of = |fragments: &mut Vec<ConfigFragment>| -> Option<usize> {
            fragments
                .iter()
                .position(|f| matches!(f, ConfigFragment::ValidationFeatures { .. }))
        };

        // A falsy disable-core-validation env strips any disable list so every
        // core message is delivered.
        if self.env.force_core_validation {
            if let Some(index) = validation_of(&mut fragments) {
                if let ConfigFragment::ValidationFeatures { disabled, .. } = &mut fragments[index] {
                    disabled.clear();
                }
            }
        }

        if let Some(select) = self.env.validation {
            let index = match validation_of(&mut fragments) {
                Some(index) => index,
                None => {
                    fragments.push(ConfigFragment::ValidationFeatures {
                        enabled: Vec::new(),
                        disabled: Vec::new(),
                    });
                    fragments.len() - 1
                }
            };
            if let ConfigFragment::ValidationFeatures { enabled, disabled } = &mut fragments[index]
            {
                match select {
                    ValidationSelect::All => {
                        *enabled = vec![
                            ValidationCheck::Synchronization,
                            ValidationCheck::BestPractices,
                            ValidationCheck::GpuAssisted,
                            ValidationCheck::DebugPrintf,
                        ];
                        disabled.clear();
                    }
                    ValidationSelect::Core => {
                        disabled.clear();
                    }
                    ValidationSelect::None => {
                        enabled.clear();
                        *disabled = vec![ValidationCheck::All];
                    }
                }
            }
        }

        fragments
    }

    fn select_physical_device(&mut self, instance: InstanceHandle) -> SetupResult {
        let physical_devices = self
            .driver
            .enumerate_physical_devices(instance)
            .map_err(SetupError::Driver)?;
        if physical_devices.is_empty() {
            return Err(SetupError::NoPhysicalDevice);
        }

        let (selected, properties) = match self.env.device_index {
            Some(index) if index < physical_devices.len() => {
                let physical = physical_devices[index];
                let properties = self
                    .driver
                    .physical_device_properties(physical)
                    .map_err(SetupError::Driver)?;
                (physical, properties)
            }
            _ => {
                // Rank by device class; the first device of the best class wins.
                let mut best = physical_devices[0];
                let mut best_properties = self
                    .driver
                    .physical_device_properties(best)
                    .map_err(SetupError::Driver)?;
                for &candidate in &physical_devices[1..] {
                    let properties = self
                        .driver
                        .physical_device_properties(candidate)
                        .map_err(SetupError::Driver)?;
                    if properties.kind.selection_rank() > best_properties.kind.selection_rank() {
                        best = candidate;
                        best_properties = properties;
                    }
                }
                (best, best_properties)
            }
        };

        if self.env.print_driver_info && DRIVER_INFO_PRINTED.get().is_none() {
            match self.driver.driver_properties(selected) {
                Ok(driver) => {
                    DRIVER_INFO_PRINTED.get_or_init(|| {
                        info!(
                            driver_name = %driver.driver_name,
                            driver_info = %driver.driver_info,
                            "driver info"
                        );
                    });
                }
                Err(status) => debug!("driver info query unavailable: {status}"),
            }
        }

        self.device_version = self.target_version.min(properties.api_version);
        self.physical = Some(selected);
        self.physical_properties = Some(properties);
        self.phase = BringUpPhase::PhysicalDeviceSelected;
        Ok(())
    }

    // ── Bring-up: device ────────────────────────────────────────────────────

    pub fn init_device(&mut self) -> SetupResult {
        self.init_device_with(None, Vec::new())
    }

    /// Create the logical device.
    ///
    /// With no override, the feature-requirement set gates continuation: the
    /// reported feature struct is queried (extended two-struct chain when
    /// available), a missing required flag skips the test, disabled flags are
    /// forced off, and the resulting set is requested wholesale. An explicit
    /// `features_override` bypasses all of that, as does supplying fragments
    /// that carry their own feature blocks.
    pub fn init_device_with(
        &mut self,
        features_override: Option<DeviceFeatures>,
        extra: Vec<ConfigFragment>,
    ) -> SetupResult {
        if self.phase != BringUpPhase::PhysicalDeviceSelected {
            return Err(SetupError::Invariant(
                "init_device requires a selected physical device",
            ));
        }
        let physical = self.physical.expect("phase implies physical device");

        let request_features = match features_override {
            Some(features) => features,
            None => {
                let reported = if self.extended_query_available() {
                    self.driver.features2(physical)
                } else {
                    self.driver.features(physical)
                }
                .map_err(SetupError::Driver)?;

                if let Some(feature) = self.features.any_required_disabled(reported) {
                    return Err(SetupError::Skip(SkipReason::RequiredFeatureUnavailable {
                        feature,
                    }));
                }
                let mut outgoing = reported;
                self.features.enforce_disabled(&mut outgoing);
                outgoing
            }
        };

        let mut config = DeviceConfig {
            extensions: Vec::new(),
            features: request_features,
            queues: Vec::new(),
            fragments: extra,
        };

        // Promotion rewrite: drop names folded into the negotiated device
        // version, synthesizing core-block feature bits for the capabilities
        // that have no extension-level flag of their own.
        if !self.allow_promoted {
            let version = self.device_version;
            let mut synthesized: Vec<(ApiVersion, DeviceFeatures)> = Vec::new();
            let mut drop_promoted = |name: &String| -> bool {
                if !device_registry().promoted_by(name, version) {
                    return false;
                }
                let flags = promoted_feature_flags(name);
                if !flags.is_empty() {
                    let block = device_registry()
                        .get(name)
                        .and_then(|info| info.promoted_at)
                        .unwrap_or(version);
                    let mut mask = DeviceFeatures::empty();
                    for feature in flags {
                        mask |= feature.mask();
                    }
                    synthesized.push((block, mask));
                }
                true
            };
            self.requested.required.retain(|name| !drop_promoted(name));
            self.requested.optional.retain(|name| !drop_promoted(name));
            self.device_enabled.retain(|name| !drop_promoted(name));
            for (block, mask) in synthesized {
                *config.core_features_mut(block) |= mask;
            }
        }

        // Drop unsupported device capabilities, non-fatally.
        let unsupported: Vec<String> = {
            let ctx = self.resolve_ctx();
            self.device_enabled
                .names()
                .iter()
                .filter(|name| {
                    !ctx.prober.device_extension_supported(
                        ctx.physical,
                        ctx.enabled_layers,
                        name,
                        0,
                    )
                })
                .cloned()
                .collect()
        };
        for name in &unsupported {
            self.diagnose(format!(
                "init_device: requested capability {name:?} is not supported; it will be disabled"
            ));
        }
        self.device_enabled.retain(|name| !unsupported.contains(name));

        let families = self
            .driver
            .queue_family_properties(physical)
            .map_err(SetupError::Driver)?;
        let graphics_family = families
            .iter()
            .position(|family| family.flags.contains(QueueFlags::GRAPHICS))
            .ok_or(SetupError::Invariant("no graphics-capable queue family"))?
            as u32;

        config.extensions = self.device_enabled.names().to_vec();
        config.queues = vec![QueueRequest {
            family_index: graphics_family,
            priorities: vec![1.0],
        }];

        let device = self
            .driver
            .create_device(physical, &config)
            .map_err(SetupError::Driver)?;
        self.device = Some(device);
        self.graphics_family = Some(graphics_family);
        self.phase = BringUpPhase::DeviceCreated;
        debug!(extensions = ?config.extensions, "device created");

        self.queue = Some(
            self.driver
                .get_queue(device, graphics_family, 0)
                .map_err(SetupError::Driver)?,
        );
        let pool = self
            .driver
            .create_command_pool(device, graphics_family)
            .map_err(SetupError::Driver)?;
        self.command_pool = Some(pool);
        self.command_buffer = Some(
            self.driver
                .allocate_command_buffer(device, pool)
                .map_err(SetupError::Driver)?,
        );
        Ok(())
    }

    /// Whether the extended (chained) feature/property query can be used:
    /// either the capability is enabled explicitly or the negotiated instance
    /// version absorbed it.
    fn extended_query_available(&self) -> bool {
        if self
            .instance_enabled
            .contains(caps::GET_PHYSICAL_DEVICE_PROPERTIES2)
        {
            return true;
        }
        let effective = self.target_version.min(self.driver.loader_version());
        effective >= ApiVersion::V1_1
    }

    // ── Window-system bring-up ──────────────────────────────────────────────

    /// Create a surface through the provider matching the first enabled
    /// window-system capability.
    pub fn init_surface(&mut self) -> SetupResult {
        let provider = select_provider(&self.instance_enabled)
            .ok_or(SetupError::Skip(SkipReason::NoWindowSystemSupport))?;
        self.init_surface_with(provider)
    }

    pub fn init_surface_with(&mut self, mut provider: Box<dyn SurfaceProvider>) -> SetupResult {
        let instance = self
            .instance
            .ok_or(SetupError::Invariant("init_surface requires an instance"))?;
        if self.surface.is_some() {
            return Err(SetupError::Invariant("surface already created"));
        }
        let surface = provider
            .create_surface(self.driver, instance)
            .map_err(SetupError::Driver)?;
        self.surface = Some(surface);
        self.surface_provider = Some(provider);
        Ok(())
    }

    /// Create a swapchain over the surface (creating the surface first if
    /// needed), with the queried surface parameters.
    pub fn init_swapchain(&mut self, usage: ImageUsage) -> SetupResult {
        let device = self
            .device
            .ok_or(SetupError::Invariant("init_swapchain requires a device"))?;
        if self.surface.is_none() {
            self.init_surface()?;
        }
        let surface = self.surface.expect("surface created above");
        let physical = self.physical.expect("device implies physical");
        let family = self.graphics_family.expect("device implies queue family");

        let supported = self
            .driver
            .surface_supported(physical, family, surface)
            .map_err(SetupError::Driver)?;
        if !supported {
            // The graphics queue cannot present here; an environment
            // limitation, not a defect.
            return Err(SetupError::Skip(SkipReason::NoWindowSystemSupport));
        }

        let info = SurfaceInformation::gather(self.driver, physical, surface)
            .map_err(SetupError::Driver)?;
        let format = info
            .formats
            .first()
            .copied()
            .ok_or(SetupError::Invariant("surface reports no formats"))?;
        let present_mode = info
            .non_shared_present_mode
            .or_else(|| info.present_modes.first().copied())
            .ok_or(SetupError::Invariant("surface reports no present modes"))?;

        let config = SwapchainConfig {
            surface,
            min_image_count: info.capabilities.min_image_count,
            format,
            extent: info.capabilities.min_extent,
            usage,
            present_mode,
            composite_alpha: info.composite_alpha,
            old_swapchain: None,
        };
        let swapchain = self
            .driver
            .create_swapchain(device, &config)
            .map_err(SetupError::Driver)?;
        self.swapchain_images = self
            .driver
            .swapchain_images(device, swapchain)
            .map_err(SetupError::Driver)?;
        self.swapchain = Some(swapchain);
        self.surface_info = Some(info);
        Ok(())
    }

    // ── Render-target bring-up ──────────────────────────────────────────────

    /// Create `targets` color render targets plus the render pass and
    /// framebuffer binding them.
    pub fn init_render_target(&mut self, targets: u32) -> SetupResult {
        let device = self
            .device
            .ok_or(SetupError::Invariant("init_render_target requires a device"))?;
        let physical = self.physical.expect("device implies physical");

        let format = select_render_target_format(self.driver, physical)
            .map_err(SetupError::Driver)?
            .ok_or(SetupError::Invariant("no usable render-target format"))?;
        let tiling = select_target_tiling(self.driver, physical, format)
            .map_err(SetupError::Driver)?
            .ok_or(SetupError::Invariant("no usable render-target tiling"))?;

        for _ in 0..targets {
            let image = self
                .driver
                .create_image(
                    device,
                    &ImageDesc {
                        width: self.width,
                        height: self.height,
                        mip_levels: 1,
                        format,
                        usage: ImageUsage::COLOR_ATTACHMENT
                            | ImageUsage::TRANSFER_SRC
                            | ImageUsage::TRANSFER_DST,
                        tiling,
                    },
                )
                .map_err(SetupError::Driver)?;
            let view = self
                .driver
                .create_image_view(device, image)
                .map_err(SetupError::Driver)?;
            self.render.images.push(image);
            self.render.views.push(view);
        }

        let render_pass = self
            .driver
            .create_render_pass(
                device,
                &RenderPassDesc {
                    color_formats: vec![format; targets as usize],
                    depth_stencil_format: None,
                },
            )
            .map_err(SetupError::Driver)?;
        let framebuffer = self
            .driver
            .create_framebuffer(device, render_pass, &self.render.views, self.width, self.height)
            .map_err(SetupError::Driver)?;

        self.render.format = Some(format);
        self.render.render_pass = Some(render_pass);
        self.render.framebuffer = Some(framebuffer);
        Ok(())
    }

    /// Create a single render target with no render pass or framebuffer, for
    /// dynamic-rendering style tests.
    pub fn init_dynamic_render_target(&mut self, format: Option<Format>) -> SetupResult {
        let device = self
            .device
            .ok_or(SetupError::Invariant("init_render_target requires a device"))?;
        let physical = self.physical.expect("device implies physical");

        let format = match format {
            Some(format) => format,
            None => select_render_target_format(self.driver, physical)
                .map_err(SetupError::Driver)?
                .ok_or(SetupError::Invariant("no usable render-target format"))?,
        };
        let tiling = select_target_tiling(self.driver, physical, format)
            .map_err(SetupError::Driver)?
            .ok_or(SetupError::Invariant("no usable render-target tiling"))?;

        let image = self
            .driver
            .create_image(
                device,
                &ImageDesc {
                    width: self.width,
                    height: self.height,
                    mip_levels: 1,
                    format,
                    usage: ImageUsage::COLOR_ATTACHMENT
                        | ImageUsage::TRANSFER_SRC
                        | ImageUsage::TRANSFER_DST,
                    tiling,
                },
            )
            .map_err(SetupError::Driver)?;
        let view = self
            .driver
            .create_image_view(device, image)
            .map_err(SetupError::Driver)?;
        self.render.images.push(image);
        self.render.views.push(view);
        self.render.format = Some(format);
        Ok(())
    }

    // ── Teardown ────────────────────────────────────────────────────────────

    /// Release everything in dependency order. Safe to call at any phase,
    /// any number of times; individual release failures are logged and do not
    /// stop the rest of teardown.
    pub fn shutdown(&mut self) {
        let Some(instance) = self.instance else {
            return;
        };

        if let Some(device) = self.device {
            log_teardown("device_wait_idle", self.driver.device_wait_idle(device));

            if let Some(buffer) = self.command_buffer.take() {
                if let Some(pool) = self.command_pool {
                    log_teardown(
                        "free_command_buffer",
                        self.driver.free_command_buffer(device, pool, buffer),
                    );
                }
            }
            if let Some(pool) = self.command_pool.take() {
                log_teardown(
                    "destroy_command_pool",
                    self.driver.destroy_command_pool(device, pool),
                );
            }

            if let Some(framebuffer) = self.render.framebuffer.take() {
                log_teardown(
                    "destroy_framebuffer",
                    self.driver.destroy_framebuffer(device, framebuffer),
                );
            }
            if let Some(render_pass) = self.render.render_pass.take() {
                log_teardown(
                    "destroy_render_pass",
                    self.driver.destroy_render_pass(device, render_pass),
                );
            }
            for view in std::mem::take(&mut self.render.views) {
                log_teardown("destroy_image_view", self.driver.destroy_image_view(device, view));
            }
            for image in std::mem::take(&mut self.render.images) {
                log_teardown("destroy_image", self.driver.destroy_image(device, image));
            }

            if let Some(swapchain) = self.swapchain.take() {
                self.swapchain_images.clear();
                log_teardown(
                    "destroy_swapchain",
                    self.driver.destroy_swapchain(device, swapchain),
                );
            }
        }

        if let Some(device) = self.device.take() {
            log_teardown("destroy_device", self.driver.destroy_device(device));
        }

        if let Some(surface) = self.surface.take() {
            log_teardown(
                "destroy_surface",
                self.driver.destroy_surface(instance, surface),
            );
        }
        if let Some(mut provider) = self.surface_provider.take() {
            provider.destroy_context();
        }

        log_teardown("destroy_instance", self.driver.destroy_instance(instance));
        self.instance = None;
        self.physical = None;
        self.physical_properties = None;
        self.queue = None;
        self.graphics_family = None;
        self.surface_info = None;
        self.phase = BringUpPhase::TornDown;
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn phase(&self) -> BringUpPhase {
        self.phase
    }

    pub fn instance(&self) -> Option<InstanceHandle> {
        self.instance
    }

    pub fn physical_device(&self) -> Option<PhysicalDeviceHandle> {
        self.physical
    }

    pub fn physical_device_properties(&self) -> Option<&PhysicalDeviceProperties> {
        self.physical_properties.as_ref()
    }

    pub fn device(&self) -> Option<DeviceHandle> {
        self.device
    }

    pub fn queue(&self) -> Option<QueueHandle> {
        self.queue
    }

    pub fn command_buffer(&self) -> Option<CommandBufferHandle> {
        self.command_buffer
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface
    }

    pub fn surface_info(&self) -> Option<&SurfaceInformation> {
        self.surface_info.as_ref()
    }

    pub fn swapchain(&self) -> Option<SwapchainHandle> {
        self.swapchain
    }

    pub fn swapchain_images(&self) -> &[ImageHandle] {
        &self.swapchain_images
    }

    pub fn render_targets(&self) -> &RenderTargets {
        &self.render
    }

    pub fn instance_capabilities(&self) -> &EnabledSet {
        &self.instance_enabled
    }

    pub fn device_capabilities(&self) -> &EnabledSet {
        &self.device_enabled
    }

    pub fn enabled_layers(&self) -> &[String] {
        &self.layers
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// The version the selected device actually speaks for this test.
    pub fn device_version(&self) -> ApiVersion {
        self.device_version
    }

    /// Whether the selected device is the software mock, honoring the
    /// ignore-disable-checks override.
    pub fn is_mock_device(&self) -> bool {
        if self.env.ignore_disable_checks {
            return false;
        }
        self.physical_properties
            .as_ref()
            .is_some_and(|props| props.device_name == MOCK_DEVICE_NAME)
    }

    fn diagnose(&mut self, message: String) {
        warn!("{message}");
        self.diagnostics.push(message);
    }
}

impl Drop for Harness<'_> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn log_teardown(what: &str, result: Result<(), Status>) {
    if let Err(status) = result {
        warn!("teardown: {what} failed: {status}");
    }
}
