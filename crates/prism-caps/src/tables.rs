//! Capability and layer tables for the prism API.
//!
//! Generated from the prism API registry (registry rev 47); do not edit by
//! hand. Ordering inside each table is registry order and is load-bearing for
//! nothing except stable diagnostics.

use crate::{ApiVersion, CapabilityInfo, PromotionEntry, Requirement};

/// Canonical capability name constants.
pub mod caps {
    // Instance-level.
    pub const DEBUG_UTILS: &str = "prism.ext.debug_utils";
    pub const DEBUG_REPORT: &str = "prism.ext.debug_report";
    pub const VALIDATION_FEATURES: &str = "prism.ext.validation_features";
    pub const SURFACE: &str = "prism.ext.surface";
    pub const GET_PHYSICAL_DEVICE_PROPERTIES2: &str = "prism.ext.get_physical_device_properties2";
    pub const EXTERNAL_MEMORY_CAPABILITIES: &str = "prism.ext.external_memory_capabilities";
    pub const SURFACE_HEADLESS: &str = "prism.ext.surface_headless";
    pub const SURFACE_XLIB: &str = "prism.ext.surface_xlib";
    pub const SURFACE_WIN32: &str = "prism.ext.surface_win32";
    pub const PORTABILITY_ENUMERATION: &str = "prism.ext.portability_enumeration";

    // Device-level.
    pub const SWAPCHAIN: &str = "prism.ext.swapchain";
    pub const MAINTENANCE1: &str = "prism.ext.maintenance1";
    pub const MAINTENANCE2: &str = "prism.ext.maintenance2";
    pub const MAINTENANCE3: &str = "prism.ext.maintenance3";
    pub const TIMELINE_SEMAPHORE: &str = "prism.ext.timeline_semaphore";
    pub const DRAW_INDIRECT_COUNT: &str = "prism.ext.draw_indirect_count";
    pub const SAMPLER_FILTER_MINMAX: &str = "prism.ext.sampler_filter_minmax";
    pub const SHADER_VIEWPORT_INDEX_LAYER: &str = "prism.ext.shader_viewport_index_layer";
    pub const DESCRIPTOR_INDEXING: &str = "prism.ext.descriptor_indexing";
    pub const BUFFER_DEVICE_ADDRESS: &str = "prism.ext.buffer_device_address";
    pub const FORMAT_FEATURE_FLAGS2: &str = "prism.ext.format_feature_flags2";
    pub const PORTABILITY_SUBSET: &str = "prism.ext.portability_subset";
    pub const FILTER_CUBIC: &str = "prism.ext.filter_cubic";
}

/// Canonical layer name constants.
pub mod layers {
    pub const VALIDATION: &str = "prism.layer.validation";
    pub const PROFILES: &str = "prism.layer.profiles";
}

pub(crate) static INSTANCE_CAPS: &[CapabilityInfo] = &[
    CapabilityInfo {
        name: caps::DEBUG_UTILS,
        spec_version: 2,
        requirements: &[],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::DEBUG_REPORT,
        spec_version: 10,
        requirements: &[],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::VALIDATION_FEATURES,
        spec_version: 5,
        requirements: &[],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::SURFACE,
        spec_version: 25,
        requirements: &[],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        spec_version: 2,
        requirements: &[],
        promoted_at: Some(ApiVersion::V1_1),
    },
    CapabilityInfo {
        name: caps::EXTERNAL_MEMORY_CAPABILITIES,
        spec_version: 1,
        requirements: &[Requirement::Capability(
            caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        )],
        promoted_at: Some(ApiVersion::V1_1),
    },
    CapabilityInfo {
        name: caps::SURFACE_HEADLESS,
        spec_version: 1,
        requirements: &[Requirement::Capability(caps::SURFACE)],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::SURFACE_XLIB,
        spec_version: 6,
        requirements: &[Requirement::Capability(caps::SURFACE)],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::SURFACE_WIN32,
        spec_version: 6,
        requirements: &[Requirement::Capability(caps::SURFACE)],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::PORTABILITY_ENUMERATION,
        spec_version: 1,
        requirements: &[],
        promoted_at: None,
    },
];

pub(crate) static DEVICE_CAPS: &[CapabilityInfo] = &[
    CapabilityInfo {
        name: caps::SWAPCHAIN,
        spec_version: 70,
        requirements: &[Requirement::Capability(caps::SURFACE)],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::MAINTENANCE1,
        spec_version: 2,
        requirements: &[],
        promoted_at: Some(ApiVersion::V1_1),
    },
    CapabilityInfo {
        name: caps::MAINTENANCE2,
        spec_version: 1,
        requirements: &[],
        promoted_at: Some(ApiVersion::V1_1),
    },
    CapabilityInfo {
        name: caps::MAINTENANCE3,
        spec_version: 1,
        requirements: &[Requirement::Capability(
            caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        )],
        promoted_at: Some(ApiVersion::V1_1),
    },
    CapabilityInfo {
        name: caps::TIMELINE_SEMAPHORE,
        spec_version: 2,
        requirements: &[
            Requirement::Capability(caps::GET_PHYSICAL_DEVICE_PROPERTIES2),
            Requirement::Core(ApiVersion::V1_0),
        ],
        promoted_at: Some(ApiVersion::V1_2),
    },
    CapabilityInfo {
        name: caps::DRAW_INDIRECT_COUNT,
        spec_version: 1,
        requirements: &[],
        promoted_at: Some(ApiVersion::V1_2),
    },
    CapabilityInfo {
        name: caps::SAMPLER_FILTER_MINMAX,
        spec_version: 2,
        requirements: &[Requirement::Capability(
            caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        )],
        promoted_at: Some(ApiVersion::V1_2),
    },
    CapabilityInfo {
        name: caps::SHADER_VIEWPORT_INDEX_LAYER,
        spec_version: 1,
        requirements: &[],
        promoted_at: Some(ApiVersion::V1_2),
    },
    CapabilityInfo {
        name: caps::DESCRIPTOR_INDEXING,
        spec_version: 2,
        requirements: &[
            Requirement::Capability(caps::GET_PHYSICAL_DEVICE_PROPERTIES2),
            Requirement::Capability(caps::MAINTENANCE3),
        ],
        promoted_at: Some(ApiVersion::V1_2),
    },
    CapabilityInfo {
        name: caps::BUFFER_DEVICE_ADDRESS,
        spec_version: 1,
        requirements: &[Requirement::Capability(
            caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        )],
        promoted_at: Some(ApiVersion::V1_2),
    },
    CapabilityInfo {
        name: caps::FORMAT_FEATURE_FLAGS2,
        spec_version: 2,
        requirements: &[Requirement::Capability(
            caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        )],
        promoted_at: Some(ApiVersion::V1_3),
    },
    CapabilityInfo {
        name: caps::PORTABILITY_SUBSET,
        spec_version: 1,
        requirements: &[Requirement::Capability(
            caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        )],
        promoted_at: None,
    },
    CapabilityInfo {
        name: caps::FILTER_CUBIC,
        spec_version: 3,
        requirements: &[],
        promoted_at: None,
    },
];

pub(crate) static INSTANCE_PROMOTIONS: &[PromotionEntry] = &[PromotionEntry {
    version: ApiVersion::V1_1,
    names: &[
        caps::GET_PHYSICAL_DEVICE_PROPERTIES2,
        caps::EXTERNAL_MEMORY_CAPABILITIES,
    ],
}];

pub(crate) static DEVICE_PROMOTIONS: &[PromotionEntry] = &[
    PromotionEntry {
        version: ApiVersion::V1_1,
        names: &[caps::MAINTENANCE1, caps::MAINTENANCE2, caps::MAINTENANCE3],
    },
    PromotionEntry {
        version: ApiVersion::V1_2,
        names: &[
            caps::TIMELINE_SEMAPHORE,
            caps::DRAW_INDIRECT_COUNT,
            caps::SAMPLER_FILTER_MINMAX,
            caps::SHADER_VIEWPORT_INDEX_LAYER,
            caps::DESCRIPTOR_INDEXING,
            caps::BUFFER_DEVICE_ADDRESS,
        ],
    },
    PromotionEntry {
        version: ApiVersion::V1_3,
        names: &[caps::FORMAT_FEATURE_FLAGS2],
    },
];
