use prism_caps::caps;
use prism_icd::{DeviceFeatures, Feature};

use crate::harness::SetupError;

/// Feature flags whose source capability has no extension-level feature bit:
/// once the capability is folded into a core version, the only way to keep it
/// on is to set these flags in the core feature block. Dropping the
/// capability name without this rewrite would silently lose it.
pub fn promoted_feature_flags(capability: &str) -> &'static [Feature] {
    match capability {
        c if c == caps::DRAW_INDIRECT_COUNT => &[Feature::DrawIndirectCount],
        c if c == caps::SAMPLER_FILTER_MINMAX => &[Feature::SamplerFilterMinmax],
        c if c == caps::SHADER_VIEWPORT_INDEX_LAYER => &[
            Feature::ShaderOutputViewportIndex,
            Feature::ShaderOutputLayer,
        ],
        _ => &[],
    }
}

/// Required and disabled feature flags accumulated across a test's setup.
///
/// A flag must not be simultaneously required and disabled; the conflicting
/// registration itself fails as a test-authoring bug rather than either side
/// silently winning.
#[derive(Debug, Default, Clone)]
pub struct FeatureRequirements {
    required: Vec<Feature>,
    disabled: Vec<Feature>,
}

impl FeatureRequirements {
    pub fn add_required(&mut self, feature: Feature) -> Result<(), SetupError> {
        if self.disabled.contains(&feature) {
            return Err(SetupError::ConflictingFeature(feature));
        }
        if !self.required.contains(&feature) {
            self.required.push(feature);
        }
        Ok(())
    }

    pub fn add_disabled(&mut self, feature: Feature) -> Result<(), SetupError> {
        if self.required.contains(&feature) {
            return Err(SetupError::ConflictingFeature(feature));
        }
        if !self.disabled.contains(&feature) {
            self.disabled.push(feature);
        }
        Ok(())
    }

    pub fn required(&self) -> &[Feature] {
        &self.required
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.disabled.is_empty()
    }

    /// First required flag the device reports unavailable, if any.
    pub fn any_required_disabled(&self, reported: DeviceFeatures) -> Option<Feature> {
        self.required
            .iter()
            .copied()
            .find(|feature| !reported.contains(feature.mask()))
    }

    /// Force every disabled-by-request flag off in the outgoing feature set,
    /// regardless of what the driver reported.
    pub fn enforce_disabled(&self, features: &mut DeviceFeatures) {
        for feature in &self.disabled {
            features.remove(feature.mask());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_registration_is_rejected() {
        let mut reqs = FeatureRequirements::default();
        reqs.add_required(Feature::SamplerAnisotropy).unwrap();
        assert!(matches!(
            reqs.add_disabled(Feature::SamplerAnisotropy),
            Err(SetupError::ConflictingFeature(Feature::SamplerAnisotropy))
        ));

        let mut reqs = FeatureRequirements::default();
        reqs.add_disabled(Feature::WideLines).unwrap();
        assert!(reqs.add_required(Feature::WideLines).is_err());
    }

    #[test]
    fn registration_is_idempotent() {
        let mut reqs = FeatureRequirements::default();
        reqs.add_required(Feature::DepthClamp).unwrap();
        reqs.add_required(Feature::DepthClamp).unwrap();
        assert_eq!(reqs.required().len(), 1);
    }

    #[test]
    fn first_unavailable_required_flag_is_reported() {
        let mut reqs = FeatureRequirements::default();
        reqs.add_required(Feature::SamplerAnisotropy).unwrap();
        reqs.add_required(Feature::TimelineSemaphore).unwrap();

        let reported = DeviceFeatures::SAMPLER_ANISOTROPY;
        assert_eq!(
            reqs.any_required_disabled(reported),
            Some(Feature::TimelineSemaphore)
        );
        assert_eq!(reqs.any_required_disabled(DeviceFeatures::all()), None);
    }

    #[test]
    fn enforce_disabled_overrides_driver_report() {
        let mut reqs = FeatureRequirements::default();
        reqs.add_disabled(Feature::WideLines).unwrap();
        reqs.add_disabled(Feature::GeometryShader).unwrap();

        let mut outgoing = DeviceFeatures::all();
        reqs.enforce_disabled(&mut outgoing);
        assert!(!outgoing.contains(DeviceFeatures::WIDE_LINES));
        assert!(!outgoing.contains(DeviceFeatures::GEOMETRY_SHADER));
        assert!(outgoing.contains(DeviceFeatures::SAMPLER_ANISOTROPY));
    }

    #[test]
    fn promoted_flag_map_covers_the_featureless_capabilities() {
        assert_eq!(
            promoted_feature_flags(caps::DRAW_INDIRECT_COUNT),
            &[Feature::DrawIndirectCount]
        );
        assert_eq!(
            promoted_feature_flags(caps::SHADER_VIEWPORT_INDEX_LAYER).len(),
            2
        );
        assert!(promoted_feature_flags(caps::TIMELINE_SEMAPHORE).is_empty());
        assert!(promoted_feature_flags(caps::SWAPCHAIN).is_empty());
    }
}
