use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::tables::{DEVICE_CAPS, DEVICE_PROMOTIONS, INSTANCE_CAPS, INSTANCE_PROMOTIONS};
use crate::{ApiVersion, CapabilityInfo, CapsError, PromotionEntry};

/// Which of the two disjoint capability namespaces a registry covers.
///
/// Device-level capabilities may depend on instance-level ones; the reverse
/// never occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Instance,
    Device,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Instance => f.write_str("instance"),
            Namespace::Device => f.write_str("device"),
        }
    }
}

/// Read-only lookup over one namespace of the capability tables.
pub struct CapabilityRegistry {
    namespace: Namespace,
    entries: &'static [CapabilityInfo],
    promotions: &'static [PromotionEntry],
    by_name: HashMap<&'static str, usize>,
}

impl CapabilityRegistry {
    fn build(
        namespace: Namespace,
        entries: &'static [CapabilityInfo],
        promotions: &'static [PromotionEntry],
    ) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, info)| (info.name, i))
            .collect();
        Self {
            namespace,
            entries,
            promotions,
            by_name,
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Look a capability up, or `None` if the name is unknown here.
    pub fn get(&self, name: &str) -> Option<&'static CapabilityInfo> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Look a capability up, failing with [`CapsError::NotFound`].
    pub fn info(&self, name: &str) -> Result<&'static CapabilityInfo, CapsError> {
        self.get(name).ok_or_else(|| CapsError::NotFound {
            namespace: self.namespace,
            name: name.to_owned(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static CapabilityInfo> {
        self.entries.iter()
    }

    /// The promotion map, ordered ascending by version.
    pub fn promotion_map(&self) -> &'static [PromotionEntry] {
        self.promotions
    }

    /// Whether `name` is promoted into core at or before `version`.
    ///
    /// An invalid `version` satisfies nothing.
    pub fn promoted_by(&self, name: &str, version: ApiVersion) -> bool {
        if !version.is_valid() {
            return false;
        }
        self.promotions
            .iter()
            .take_while(|entry| entry.version <= version)
            .any(|entry| entry.names.contains(&name))
    }
}

static INSTANCE_REGISTRY: Lazy<CapabilityRegistry> = Lazy::new(|| {
    CapabilityRegistry::build(Namespace::Instance, INSTANCE_CAPS, INSTANCE_PROMOTIONS)
});

static DEVICE_REGISTRY: Lazy<CapabilityRegistry> =
    Lazy::new(|| CapabilityRegistry::build(Namespace::Device, DEVICE_CAPS, DEVICE_PROMOTIONS));

/// The instance-level capability namespace.
pub fn instance_registry() -> &'static CapabilityRegistry {
    &INSTANCE_REGISTRY
}

/// The device-level capability namespace.
pub fn device_registry() -> &'static CapabilityRegistry {
    &DEVICE_REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::caps;
    use crate::Requirement;

    #[test]
    fn namespaces_are_disjoint() {
        for info in instance_registry().iter() {
            assert!(
                !device_registry().contains(info.name),
                "{} registered in both namespaces",
                info.name
            );
        }
    }

    #[test]
    fn lookup_hits_and_misses() {
        let info = instance_registry().info(caps::SURFACE).unwrap();
        assert_eq!(info.spec_version, 25);

        let err = instance_registry().info(caps::SWAPCHAIN).unwrap_err();
        assert_eq!(
            err,
            CapsError::NotFound {
                namespace: Namespace::Instance,
                name: caps::SWAPCHAIN.to_owned(),
            }
        );
        assert!(device_registry().contains(caps::SWAPCHAIN));
    }

    #[test]
    fn promotion_map_is_sorted_ascending() {
        for registry in [instance_registry(), device_registry()] {
            let versions: Vec<_> = registry.promotion_map().iter().map(|e| e.version).collect();
            let mut sorted = versions.clone();
            sorted.sort();
            assert_eq!(versions, sorted);
        }
    }

    #[test]
    fn promotion_map_matches_per_capability_metadata() {
        for registry in [instance_registry(), device_registry()] {
            for entry in registry.promotion_map() {
                for name in entry.names {
                    let info = registry.info(name).unwrap();
                    assert_eq!(info.promoted_at, Some(entry.version), "{name}");
                }
            }
            for info in registry.iter() {
                if let Some(version) = info.promoted_at {
                    assert!(registry.promoted_by(info.name, version), "{}", info.name);
                }
            }
        }
    }

    #[test]
    fn promoted_by_respects_version_floor() {
        let device = device_registry();
        assert!(!device.promoted_by(caps::TIMELINE_SEMAPHORE, ApiVersion::V1_1));
        assert!(device.promoted_by(caps::TIMELINE_SEMAPHORE, ApiVersion::V1_2));
        assert!(device.promoted_by(caps::MAINTENANCE1, ApiVersion::V1_3));
        assert!(!device.promoted_by(caps::SWAPCHAIN, ApiVersion::V1_3));
        assert!(!device.promoted_by(caps::TIMELINE_SEMAPHORE, ApiVersion::INVALID));
    }

    #[test]
    fn requirements_resolve_within_known_namespaces() {
        // Every named prerequisite must exist in one of the two namespaces.
        for registry in [instance_registry(), device_registry()] {
            for info in registry.iter() {
                for req in info.requirements {
                    if let Requirement::Capability(name) = req {
                        assert!(
                            instance_registry().contains(name) || device_registry().contains(name),
                            "{} requires unknown capability {name}",
                            info.name
                        );
                    }
                }
            }
        }
    }
}
