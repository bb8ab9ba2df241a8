use prism_caps::{device_registry, instance_registry, ApiVersion, Requirement};
use prism_icd::PhysicalDeviceHandle;

use crate::probe::AvailabilityProber;

/// What a test declared it wants, split by obligation.
///
/// Window-system requests are special: only one of them needs to be
/// enableable for bring-up to proceed.
#[derive(Debug, Default, Clone)]
pub struct RequestedSet {
    pub(crate) required: Vec<String>,
    pub(crate) optional: Vec<String>,
    pub(crate) window_system: Vec<String>,
}

impl RequestedSet {
    fn push_unique(list: &mut Vec<String>, name: &str) {
        if !list.iter().any(|n| n == name) {
            list.push(name.to_owned());
        }
    }

    pub fn add_required(&mut self, name: &str) {
        Self::push_unique(&mut self.required, name);
    }

    pub fn add_optional(&mut self, name: &str) {
        Self::push_unique(&mut self.optional, name);
    }

    pub fn add_window_system(&mut self, name: &str) {
        Self::push_unique(&mut self.window_system, name);
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn optional(&self) -> &[String] {
        &self.optional
    }

    pub fn window_system(&self) -> &[String] {
        &self.window_system
    }
}

/// The capability names that will actually be handed to a creation call.
///
/// Grown only by the resolver: every member is either directly requested or a
/// transitive prerequisite of something requested, and was confirmed
/// supported when it was added.
#[derive(Debug, Default, Clone)]
pub struct EnabledSet {
    names: Vec<String>,
}

impl EnabledSet {
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String) {
        if !self.contains(&name) {
            self.names.push(name);
        }
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&String) -> bool) {
        self.names.retain(keep);
    }
}

/// Everything requirement resolution consults, borrowed from the harness.
pub(crate) struct ResolveCtx<'a, 'd> {
    pub prober: &'a AvailabilityProber<'d>,
    pub enabled_layers: &'a [String],
    pub physical: Option<PhysicalDeviceHandle>,
    /// Promotion floor for instance capabilities: the target API version.
    pub instance_promotion_version: ApiVersion,
    /// Promotion floor for device capabilities: min(target, device version).
    /// Invalid until a physical device is selected.
    pub device_promotion_version: ApiVersion,
    pub allow_promoted: bool,
}

impl ResolveCtx<'_, '_> {
    pub fn instance_promoted(&self, name: &str) -> bool {
        !self.allow_promoted
            && instance_registry().promoted_by(name, self.instance_promotion_version)
    }

    pub fn device_promoted(&self, name: &str) -> bool {
        !self.allow_promoted && device_registry().promoted_by(name, self.device_promotion_version)
    }

    /// Enabled already, or implicitly satisfied by core promotion.
    pub fn can_enable_instance(&self, name: &str, enabled: &EnabledSet) -> bool {
        self.instance_promoted(name) || enabled.contains(name)
    }

    pub fn can_enable_device(&self, name: &str, enabled: &EnabledSet) -> bool {
        self.device_promoted(name) || enabled.contains(name)
    }
}

/// Plan the instance-side additions needed to satisfy `name`.
///
/// The walk is pure: on success the caller merges the returned names (in
/// prerequisite-first order) into the instance EnabledSet; on failure nothing
/// is merged, so a failing branch never leaves partial additions behind.
///
/// A name registered as an instance capability is probed and planned here. A
/// name not in the instance namespace is assumed device-level: its transitive
/// instance prerequisites are planned, but its own support check is deferred
/// to device-side resolution.
pub(crate) fn plan_instance_additions(
    name: &str,
    ctx: &ResolveCtx<'_, '_>,
    enabled: &EnabledSet,
) -> Option<Vec<String>> {
    let mut additions = Vec::new();
    walk_instance(name, ctx, enabled, &mut additions).then_some(additions)
}

fn walk_instance(
    name: &str,
    ctx: &ResolveCtx<'_, '_>,
    enabled: &EnabledSet,
    additions: &mut Vec<String>,
) -> bool {
    if ctx.can_enable_instance(name, enabled) || additions.iter().any(|n| n == name) {
        return true;
    }

    if instance_registry().contains(name) {
        if !ctx.prober.instance_extension_supported(name, 0) {
            return false;
        }
        let info = instance_registry().get(name).unwrap();
        for req in info.requirements {
            match req {
                Requirement::Core(_) => continue,
                Requirement::Capability(req_name) => {
                    if !walk_instance(req_name, ctx, enabled, additions) {
                        return false;
                    }
                }
            }
        }
        additions.push(name.to_owned());
        return true;
    }

    // Device-level (or unknown): pull in its instance prerequisites only.
    let requirements = device_registry()
        .get(name)
        .map(|info| info.requirements)
        .unwrap_or(&[]);
    for req in requirements {
        match req {
            Requirement::Core(_) => continue,
            Requirement::Capability(req_name) => {
                if !walk_instance(req_name, ctx, enabled, additions) {
                    return false;
                }
            }
        }
    }
    true
}

/// Plan the device-side additions needed to satisfy `name`.
///
/// Mirrors [`plan_instance_additions`] for the device namespace; a name
/// registered as an instance capability is considered automatically satisfied
/// here (instance capabilities never gate device enablement — only their own
/// prerequisites matter, and those were handled on the instance side).
pub(crate) fn plan_device_additions(
    name: &str,
    ctx: &ResolveCtx<'_, '_>,
    enabled: &EnabledSet,
) -> Option<Vec<String>> {
    let mut additions = Vec::new();
    walk_device(name, ctx, enabled, &mut additions).then_some(additions)
}

fn walk_device(
    name: &str,
    ctx: &ResolveCtx<'_, '_>,
    enabled: &EnabledSet,
    additions: &mut Vec<String>,
) -> bool {
    if ctx.can_enable_device(name, enabled) || additions.iter().any(|n| n == name) {
        return true;
    }

    if instance_registry().contains(name) {
        return true;
    }

    if !ctx
        .prober
        .device_extension_supported(ctx.physical, ctx.enabled_layers, name, 0)
    {
        return false;
    }
    additions.push(name.to_owned());

    let requirements = device_registry()
        .get(name)
        .map(|info| info.requirements)
        .unwrap_or(&[]);
    for req in requirements {
        match req {
            Requirement::Core(_) => continue,
            Requirement::Capability(req_name) => {
                if !walk_device(req_name, ctx, enabled, additions) {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_caps::caps;
    use prism_icd::{DeviceKind, Driver, InstanceConfig, MockIcd, MockPhysicalDevice};

    fn ctx<'a, 'd>(
        prober: &'a AvailabilityProber<'d>,
        physical: Option<PhysicalDeviceHandle>,
        version: ApiVersion,
    ) -> ResolveCtx<'a, 'd> {
        ResolveCtx {
            prober,
            enabled_layers: &[],
            physical,
            instance_promotion_version: version,
            device_promotion_version: version,
            allow_promoted: false,
        }
    }

    fn icd_with_device(device: MockPhysicalDevice) -> (MockIcd, PhysicalDeviceHandle) {
        let icd = MockIcd::new(ApiVersion::V1_3)
            .with_instance_extension(caps::SURFACE, 25)
            .with_instance_extension(caps::GET_PHYSICAL_DEVICE_PROPERTIES2, 2)
            .with_instance_extension(caps::EXTERNAL_MEMORY_CAPABILITIES, 1)
            .with_physical_device(device);
        let instance = icd
            .create_instance(&InstanceConfig::new("t", ApiVersion::V1_3))
            .unwrap();
        let physical = icd.enumerate_physical_devices(instance).unwrap()[0];
        (icd, physical)
    }

    #[test]
    fn instance_plan_orders_prerequisites_first() {
        let (icd, _) = icd_with_device(MockPhysicalDevice::conformant(
            DeviceKind::DiscreteGpu,
            ApiVersion::V1_3,
        ));
        let prober = AvailabilityProber::new(&icd);
        // 1.0: nothing is promoted, so gpdp2 resolves explicitly.
        let ctx = ctx(&prober, None, ApiVersion::V1_0);
        let enabled = EnabledSet::default();

        let plan =
            plan_instance_additions(caps::EXTERNAL_MEMORY_CAPABILITIES, &ctx, &enabled).unwrap();
        assert_eq!(
            plan,
            vec![
                caps::GET_PHYSICAL_DEVICE_PROPERTIES2.to_owned(),
                caps::EXTERNAL_MEMORY_CAPABILITIES.to_owned(),
            ]
        );
    }

    #[test]
    fn device_name_at_instance_stage_plans_instance_prerequisites_only() {
        let (icd, _) = icd_with_device(MockPhysicalDevice::conformant(
            DeviceKind::DiscreteGpu,
            ApiVersion::V1_3,
        ));
        let prober = AvailabilityProber::new(&icd);
        let ctx = ctx(&prober, None, ApiVersion::V1_0);
        let enabled = EnabledSet::default();

        let plan = plan_instance_additions(caps::SWAPCHAIN, &ctx, &enabled).unwrap();
        assert_eq!(plan, vec![caps::SURFACE.to_owned()]);
    }

    #[test]
    fn unsupported_instance_link_fails_the_whole_plan() {
        // Driver without the surface extension: swapchain's instance
        // prerequisite cannot be satisfied.
        let icd = MockIcd::new(ApiVersion::V1_3)
            .with_physical_device(MockPhysicalDevice::conformant(
                DeviceKind::DiscreteGpu,
                ApiVersion::V1_3,
            ));
        let prober = AvailabilityProber::new(&icd);
        let ctx = ctx(&prober, None, ApiVersion::V1_0);
        let enabled = EnabledSet::default();

        assert!(plan_instance_additions(caps::SWAPCHAIN, &ctx, &enabled).is_none());
        assert!(plan_instance_additions(caps::SURFACE_HEADLESS, &ctx, &enabled).is_none());
    }

    #[test]
    fn device_plan_resolves_diamond_dependencies_once() {
        let (icd, physical) = icd_with_device(MockPhysicalDevice::conformant(
            DeviceKind::DiscreteGpu,
            ApiVersion::V1_3,
        ));
        let prober = AvailabilityProber::new(&icd);
        // 1.0 floor: maintenance3 and descriptor_indexing both resolve
        // explicitly; gpdp2 (instance) is auto-satisfied on the device side.
        let ctx = ctx(&prober, Some(physical), ApiVersion::V1_0);
        let enabled = EnabledSet::default();

        let plan = plan_device_additions(caps::DESCRIPTOR_INDEXING, &ctx, &enabled).unwrap();
        assert_eq!(
            plan,
            vec![
                caps::DESCRIPTOR_INDEXING.to_owned(),
                caps::MAINTENANCE3.to_owned(),
            ]
        );
    }

    #[test]
    fn promotion_short_circuits_prerequisites() {
        // descriptor_indexing's prerequisite maintenance3 is promoted at 1.1,
        // so at a 1.1 floor it never appears in the plan even if the driver
        // does not advertise it standalone.
        let (icd, physical) = icd_with_device(
            MockPhysicalDevice::conformant(DeviceKind::DiscreteGpu, ApiVersion::V1_1)
                .without_extension(caps::MAINTENANCE3),
        );
        let prober = AvailabilityProber::new(&icd);
        let ctx = ctx(&prober, Some(physical), ApiVersion::V1_1);
        let enabled = EnabledSet::default();

        let plan = plan_device_additions(caps::DESCRIPTOR_INDEXING, &ctx, &enabled).unwrap();
        assert_eq!(plan, vec![caps::DESCRIPTOR_INDEXING.to_owned()]);
    }

    #[test]
    fn failing_branch_adds_nothing() {
        // maintenance3 missing and nothing promoted at 1.0: the
        // descriptor_indexing chain breaks, and the plan reports no partial
        // additions even though descriptor_indexing itself probed supported.
        let (icd, physical) = icd_with_device(
            MockPhysicalDevice::conformant(DeviceKind::DiscreteGpu, ApiVersion::V1_3)
                .without_extension(caps::MAINTENANCE3),
        );
        let prober = AvailabilityProber::new(&icd);
        let ctx = ctx(&prober, Some(physical), ApiVersion::V1_0);
        let enabled = EnabledSet::default();

        assert!(plan_device_additions(caps::DESCRIPTOR_INDEXING, &ctx, &enabled).is_none());
    }

    #[test]
    fn already_enabled_names_plan_to_nothing() {
        let (icd, physical) = icd_with_device(MockPhysicalDevice::conformant(
            DeviceKind::DiscreteGpu,
            ApiVersion::V1_3,
        ));
        let prober = AvailabilityProber::new(&icd);
        let ctx = ctx(&prober, Some(physical), ApiVersion::V1_0);

        let mut enabled = EnabledSet::default();
        for name in plan_device_additions(caps::TIMELINE_SEMAPHORE, &ctx, &enabled).unwrap() {
            enabled.insert(name);
        }
        assert!(enabled.contains(caps::TIMELINE_SEMAPHORE));

        // Second resolution of the same name is a no-op: idempotent.
        let replan = plan_device_additions(caps::TIMELINE_SEMAPHORE, &ctx, &enabled).unwrap();
        assert!(replan.is_empty());
    }

    #[test]
    fn allow_promoted_keeps_explicit_enablement() {
        let (icd, physical) = icd_with_device(MockPhysicalDevice::conformant(
            DeviceKind::DiscreteGpu,
            ApiVersion::V1_3,
        ));
        let prober = AvailabilityProber::new(&icd);
        let mut ctx = ctx(&prober, Some(physical), ApiVersion::V1_3);
        ctx.allow_promoted = true;
        let enabled = EnabledSet::default();

        let plan = plan_device_additions(caps::TIMELINE_SEMAPHORE, &ctx, &enabled).unwrap();
        assert_eq!(plan, vec![caps::TIMELINE_SEMAPHORE.to_owned()]);
    }
}
