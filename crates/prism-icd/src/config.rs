use bitflags::bitflags;

use prism_caps::ApiVersion;

use crate::features::DeviceFeatures;
use crate::types::{CompositeAlpha, ImageUsage, PresentMode, SurfaceFormat};
use crate::driver::{SurfaceHandle, SwapchainHandle};

/// Classes of validation diagnostics a test run can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCheck {
    /// Everything the validation layer implements.
    All,
    Synchronization,
    BestPractices,
    GpuAssisted,
    DebugPrintf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
}

/// One owned piece of auxiliary creation configuration.
///
/// Fragments replace an intrusive extension-struct chain: a caller hands the
/// harness a `Vec<ConfigFragment>` by value and the harness concatenates its
/// own fragments onto it, so there is never a borrowed chain to restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFragment {
    ValidationFeatures {
        enabled: Vec<ValidationCheck>,
        disabled: Vec<ValidationCheck>,
    },
    DebugMessenger {
        min_severity: MessageSeverity,
    },
    /// A core-version feature block spliced into device creation. Carries the
    /// flags that became expressible only through the block once their source
    /// capability was folded into `version`.
    CoreFeatures {
        version: ApiVersion,
        features: DeviceFeatures,
    },
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct InstanceFlags: u32 {
        /// Enumerate devices behind a portability (non-conformant) driver.
        const ENUMERATE_PORTABILITY = 1 << 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub application_name: String,
    /// API version the application targets; the loader negotiates downward.
    pub api_version: ApiVersion,
}

/// Everything instance creation consumes, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub application: ApplicationInfo,
    pub layers: Vec<String>,
    pub extensions: Vec<String>,
    pub flags: InstanceFlags,
    pub fragments: Vec<ConfigFragment>,
}

impl InstanceConfig {
    pub fn new(application_name: &str, api_version: ApiVersion) -> Self {
        Self {
            application: ApplicationInfo {
                application_name: application_name.to_owned(),
                api_version,
            },
            layers: Vec::new(),
            extensions: Vec::new(),
            flags: InstanceFlags::empty(),
            fragments: Vec::new(),
        }
    }

    /// The validation-features fragment, if one is present.
    pub fn validation_features_mut(
        &mut self,
    ) -> Option<(&mut Vec<ValidationCheck>, &mut Vec<ValidationCheck>)> {
        self.fragments.iter_mut().find_map(|fragment| match fragment {
            ConfigFragment::ValidationFeatures { enabled, disabled } => Some((enabled, disabled)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueRequest {
    pub family_index: u32,
    pub priorities: Vec<f32>,
}

/// Everything device creation consumes, owned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceConfig {
    pub extensions: Vec<String>,
    /// Base feature block requested at creation.
    pub features: DeviceFeatures,
    pub queues: Vec<QueueRequest>,
    pub fragments: Vec<ConfigFragment>,
}

impl DeviceConfig {
    /// The feature set of the core block for `version`, inserting an empty
    /// block if none exists yet.
    pub fn core_features_mut(&mut self, version: ApiVersion) -> &mut DeviceFeatures {
        let position = self.fragments.iter().position(|fragment| {
            matches!(fragment, ConfigFragment::CoreFeatures { version: v, .. } if *v == version)
        });
        let index = match position {
            Some(index) => index,
            None => {
                self.fragments.push(ConfigFragment::CoreFeatures {
                    version,
                    features: DeviceFeatures::empty(),
                });
                self.fragments.len() - 1
            }
        };
        match &mut self.fragments[index] {
            ConfigFragment::CoreFeatures { features, .. } => features,
            _ => unreachable!("position() matched a CoreFeatures fragment"),
        }
    }

    /// Every feature bit requested across the base block and all core blocks.
    pub fn requested_features(&self) -> DeviceFeatures {
        let mut all = self.features;
        for fragment in &self.fragments {
            if let ConfigFragment::CoreFeatures { features, .. } = fragment {
                all |= *features;
            }
        }
        all
    }
}

/// What a surface provider asks the driver to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceDesc {
    Headless,
    Window { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainConfig {
    pub surface: SurfaceHandle,
    pub min_image_count: u32,
    pub format: SurfaceFormat,
    pub extent: (u32, u32),
    pub usage: ImageUsage,
    pub present_mode: PresentMode,
    pub composite_alpha: CompositeAlpha,
    pub old_swapchain: Option<SwapchainHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_features_block_is_find_or_insert() {
        let mut config = DeviceConfig::default();
        *config.core_features_mut(ApiVersion::V1_2) |= DeviceFeatures::DRAW_INDIRECT_COUNT;
        *config.core_features_mut(ApiVersion::V1_2) |= DeviceFeatures::SAMPLER_FILTER_MINMAX;

        let blocks: Vec<_> = config
            .fragments
            .iter()
            .filter(|f| matches!(f, ConfigFragment::CoreFeatures { .. }))
            .collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            config.requested_features(),
            DeviceFeatures::DRAW_INDIRECT_COUNT | DeviceFeatures::SAMPLER_FILTER_MINMAX
        );
    }

    #[test]
    fn distinct_versions_get_distinct_blocks() {
        let mut config = DeviceConfig::default();
        *config.core_features_mut(ApiVersion::V1_1) |= DeviceFeatures::SAMPLER_ANISOTROPY;
        *config.core_features_mut(ApiVersion::V1_2) |= DeviceFeatures::TIMELINE_SEMAPHORE;
        assert_eq!(config.fragments.len(), 2);
    }
}
