use std::cell::RefCell;
use std::collections::HashMap;

use once_cell::unsync::OnceCell;
use tracing::{error, warn};

use prism_caps::caps;
use prism_icd::{Driver, ExtensionProperties, LayerProperties, PhysicalDeviceHandle};

/// Debug/diagnostic capabilities assumed layer-provided and therefore always
/// reported supported: probing them before layers are configured would lie.
const ASSUMED_SUPPORTED: &[&str] = &[
    caps::DEBUG_UTILS,
    caps::DEBUG_REPORT,
    caps::VALIDATION_FEATURES,
];

/// Memoizing view of what the driver supports.
///
/// Each enumeration is performed at most once per prober lifetime and cached;
/// a prober is only valid for one instance context, so a fresh context means
/// constructing a fresh prober.
pub struct AvailabilityProber<'d> {
    driver: &'d dyn Driver,
    layers: OnceCell<Vec<LayerProperties>>,
    instance_extensions: OnceCell<Vec<ExtensionProperties>>,
    device_extensions: RefCell<HashMap<(u64, Option<String>), Vec<ExtensionProperties>>>,
}

impl<'d> AvailabilityProber<'d> {
    pub fn new(driver: &'d dyn Driver) -> Self {
        Self {
            driver,
            layers: OnceCell::new(),
            instance_extensions: OnceCell::new(),
            device_extensions: RefCell::new(HashMap::new()),
        }
    }

    fn layer_list(&self) -> &[LayerProperties] {
        self.layers.get_or_init(|| {
            self.driver.enumerate_instance_layers().unwrap_or_else(|status| {
                warn!("layer enumeration failed: {status}");
                Vec::new()
            })
        })
    }

    fn instance_extension_list(&self) -> &[ExtensionProperties] {
        self.instance_extensions.get_or_init(|| {
            self.driver
                .enumerate_instance_extensions(None)
                .unwrap_or_else(|status| {
                    warn!("instance extension enumeration failed: {status}");
                    Vec::new()
                })
        })
    }

    /// True iff a layer of that name is enumerable and both version fields
    /// meet or exceed the minimums.
    pub fn instance_layer_supported(
        &self,
        name: &str,
        min_spec_version: u32,
        min_impl_version: u32,
    ) -> bool {
        self.layer_list().iter().any(|layer| {
            layer.name == name
                && layer.spec_version >= min_spec_version
                && layer.impl_version >= min_impl_version
        })
    }

    /// True iff an instance capability of that name is enumerable with
    /// sufficient spec version, or is on the assumed-supported debug list.
    pub fn instance_extension_supported(&self, name: &str, min_spec_version: u32) -> bool {
        if ASSUMED_SUPPORTED.contains(&name) {
            return true;
        }
        self.instance_extension_list()
            .iter()
            .any(|ext| ext.name == name && ext.spec_version >= min_spec_version)
    }

    /// True iff a device capability of that name is visible on `physical`,
    /// either natively or contributed by one of the enabled instance layers.
    ///
    /// Probing before an instance and physical device exist is a
    /// test-authoring bug: it raises a diagnostic and reports unsupported.
    pub fn device_extension_supported(
        &self,
        physical: Option<PhysicalDeviceHandle>,
        enabled_layers: &[String],
        name: &str,
        min_spec_version: u32,
    ) -> bool {
        let Some(physical) = physical else {
            error!("device capability {name:?} probed before physical-device selection");
            return false;
        };

        if self
            .device_list(physical, None)
            .iter()
            .any(|ext| ext.name == name && ext.spec_version >= min_spec_version)
        {
            return true;
        }
        enabled_layers.iter().any(|layer| {
            self.device_list(physical, Some(layer))
                .iter()
                .any(|ext| ext.name == name && ext.spec_version >= min_spec_version)
        })
    }

    fn device_list(
        &self,
        physical: PhysicalDeviceHandle,
        layer: Option<&str>,
    ) -> Vec<ExtensionProperties> {
        let key = (physical.0, layer.map(str::to_owned));
        if let Some(cached) = self.device_extensions.borrow().get(&key) {
            return cached.clone();
        }
        let list = self
            .driver
            .enumerate_device_extensions(physical, layer)
            .unwrap_or_else(|status| {
                warn!("device extension enumeration failed: {status}");
                Vec::new()
            });
        self.device_extensions.borrow_mut().insert(key, list.clone());
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_caps::{layers, ApiVersion};
    use prism_icd::{InstanceConfig, MockIcd};

    #[test]
    fn enumerations_are_memoized() {
        let icd = MockIcd::conformant();
        let prober = AvailabilityProber::new(&icd);

        assert!(prober.instance_layer_supported(layers::VALIDATION, 1, 1));
        assert!(prober.instance_layer_supported(layers::PROFILES, 1, 1));
        assert!(!prober.instance_layer_supported("prism.layer.nonexistent", 0, 0));
        assert_eq!(icd.counters().layer_enumerations(), 1);

        assert!(prober.instance_extension_supported(caps::SURFACE, 1));
        assert!(prober.instance_extension_supported(caps::SURFACE, 25));
        assert!(!prober.instance_extension_supported(caps::SURFACE, 26));
        assert_eq!(icd.counters().instance_extension_enumerations(), 1);
    }

    #[test]
    fn debug_extensions_are_assumed_supported() {
        // An empty driver enumerates nothing, yet the layer-provided debug
        // capabilities still probe as supported.
        let icd = MockIcd::new(ApiVersion::V1_0);
        let prober = AvailabilityProber::new(&icd);
        assert!(prober.instance_extension_supported(caps::DEBUG_UTILS, 1));
        assert!(prober.instance_extension_supported(caps::DEBUG_REPORT, 1));
        assert!(prober.instance_extension_supported(caps::VALIDATION_FEATURES, 1));
        assert!(!prober.instance_extension_supported(caps::SURFACE, 1));
    }

    #[test]
    fn layer_version_minimums_are_both_checked() {
        let icd = MockIcd::new(ApiVersion::V1_0).with_layer(layers::VALIDATION, 2, 3);
        let prober = AvailabilityProber::new(&icd);
        assert!(prober.instance_layer_supported(layers::VALIDATION, 2, 3));
        assert!(!prober.instance_layer_supported(layers::VALIDATION, 3, 3));
        assert!(!prober.instance_layer_supported(layers::VALIDATION, 2, 4));
    }

    #[test]
    fn device_probe_before_selection_reports_unsupported() {
        let icd = MockIcd::conformant();
        let prober = AvailabilityProber::new(&icd);
        assert!(!prober.device_extension_supported(None, &[], caps::SWAPCHAIN, 1));
    }

    #[test]
    fn device_probe_unions_layer_contributions() {
        let icd = MockIcd::conformant();
        let instance = icd
            .create_instance(&InstanceConfig::new("t", ApiVersion::V1_3))
            .unwrap();
        let physical = icd.enumerate_physical_devices(instance).unwrap()[0];
        // Strip the native copy so only the profiles layer can provide it.
        let stripped = MockIcd::conformant()
            .with_physical_device(
                prism_icd::MockPhysicalDevice::conformant(
                    prism_icd::DeviceKind::DiscreteGpu,
                    ApiVersion::V1_3,
                )
                .without_extension(caps::PORTABILITY_SUBSET),
            );
        let s_instance = stripped
            .create_instance(&InstanceConfig::new("t", ApiVersion::V1_3))
            .unwrap();
        let s_physical = stripped.enumerate_physical_devices(s_instance).unwrap()[1];

        let prober = AvailabilityProber::new(&icd);
        assert!(prober.device_extension_supported(Some(physical), &[], caps::SWAPCHAIN, 1));

        let s_prober = AvailabilityProber::new(&stripped);
        assert!(!s_prober.device_extension_supported(
            Some(s_physical),
            &[],
            caps::PORTABILITY_SUBSET,
            1
        ));
        assert!(s_prober.device_extension_supported(
            Some(s_physical),
            &[layers::PROFILES.to_owned()],
            caps::PORTABILITY_SUBSET,
            1
        ));
    }

    #[test]
    fn device_lists_are_cached_per_physical_and_layer() {
        let icd = MockIcd::conformant();
        let instance = icd
            .create_instance(&InstanceConfig::new("t", ApiVersion::V1_3))
            .unwrap();
        let physical = icd.enumerate_physical_devices(instance).unwrap()[0];
        let prober = AvailabilityProber::new(&icd);

        for _ in 0..3 {
            prober.device_extension_supported(Some(physical), &[], caps::SWAPCHAIN, 1);
        }
        assert_eq!(icd.counters().device_extension_enumerations(), 1);
    }
}
