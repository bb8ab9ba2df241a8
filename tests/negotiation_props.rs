//! Property tests over the requirement resolver, driven through the public
//! harness API against the software driver.

use proptest::prelude::*;

use prism_caps::{caps, device_registry, instance_registry, ApiVersion};
use prism_harness::{Harness, HarnessEnv};
use prism_icd::MockIcd;

/// Names a test may request, spanning both namespaces and the unregistered
/// case.
const REQUESTABLE: &[&str] = &[
    caps::SURFACE,
    caps::SURFACE_HEADLESS,
    caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
    caps::EXTERNAL_MEMORY_CAPABILITIES,
    caps::SWAPCHAIN,
    caps::MAINTENANCE1,
    caps::MAINTENANCE3,
    caps::TIMELINE_SEMAPHORE,
    caps::DRAW_INDIRECT_COUNT,
    caps::SAMPLER_FILTER_MINMAX,
    caps::SHADER_VIEWPORT_INDEX_LAYER,
    caps::DESCRIPTOR_INDEXING,
    caps::BUFFER_DEVICE_ADDRESS,
    caps::FORMAT_FEATURE_FLAGS2,
    caps::FILTER_CUBIC,
    "prism.ext.unregistered",
];

fn requests() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::collection::vec(proptest::sample::select(REQUESTABLE), 0..12)
}

fn versions() -> impl Strategy<Value = ApiVersion> {
    proptest::sample::select(vec![
        ApiVersion::V1_0,
        ApiVersion::V1_1,
        ApiVersion::V1_2,
        ApiVersion::V1_3,
    ])
}

fn enabled_sets(
    names: &[&str],
    target: ApiVersion,
) -> (Vec<String>, Vec<String>) {
    let icd = MockIcd::conformant();
    let mut harness = Harness::with_env(&icd, HarnessEnv::default());
    harness.set_target_version(target);
    for name in names {
        harness.add_optional(name);
    }
    harness.init_instance().expect("optional requests never skip");
    (
        harness.instance_capabilities().names().to_vec(),
        harness.device_capabilities().names().to_vec(),
    )
}

proptest! {
    // Requesting a set twice (element-wise duplication) yields exactly the
    // same enabled sets as requesting it once.
    #[test]
    fn resolution_is_idempotent(names in requests(), target in versions()) {
        let (instance_once, device_once) = enabled_sets(&names, target);

        let doubled: Vec<&str> = names
            .iter()
            .flat_map(|name| [*name, *name])
            .collect();
        let (instance_twice, device_twice) = enabled_sets(&doubled, target);

        prop_assert_eq!(instance_once, instance_twice);
        prop_assert_eq!(device_once, device_twice);
    }

    // Enabled sets never hold duplicates, and every member is known to the
    // namespace it was enabled in.
    #[test]
    fn enabled_sets_are_duplicate_free_and_namespaced(
        names in requests(),
        target in versions(),
    ) {
        let (instance, device) = enabled_sets(&names, target);

        for (set, registry) in [
            (&instance, instance_registry()),
            (&device, device_registry()),
        ] {
            let mut seen = std::collections::HashSet::new();
            for name in set.iter() {
                prop_assert!(seen.insert(name.clone()), "duplicate {name}");
                prop_assert!(registry.contains(name), "{name} not in namespace");
            }
        }
    }

    // With promotion in effect, nothing promoted at or below the target ever
    // reaches an enabled set.
    #[test]
    fn promoted_names_never_reach_enabled_sets(
        names in requests(),
        target in versions(),
    ) {
        let (instance, device) = enabled_sets(&names, target);

        for name in &instance {
            prop_assert!(
                !instance_registry().promoted_by(name, target),
                "{name} is promoted at {target} yet explicitly enabled"
            );
        }
        for name in &device {
            prop_assert!(
                !device_registry().promoted_by(name, target),
                "{name} is promoted at {target} yet explicitly enabled"
            );
        }
    }

    // Every enabled name is either directly requested or a transitive
    // prerequisite of a requested name.
    #[test]
    fn enabled_sets_are_closed_over_requests(
        names in requests(),
        target in versions(),
    ) {
        let (instance, device) = enabled_sets(&names, target);

        let mut reachable: Vec<&str> = names.clone();
        let mut cursor = 0;
        while cursor < reachable.len() {
            let name = reachable[cursor];
            cursor += 1;
            let info = instance_registry()
                .get(name)
                .or_else(|| device_registry().get(name));
            if let Some(info) = info {
                for req in info.requirements {
                    if let prism_caps::Requirement::Capability(req_name) = *req {
                        if !reachable.contains(&req_name) {
                            reachable.push(req_name);
                        }
                    }
                }
            }
        }

        for name in instance.iter().chain(device.iter()) {
            prop_assert!(
                reachable.iter().any(|r| r == name),
                "{name} enabled but never requested nor required transitively"
            );
        }
    }
}
