use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Boolean feature flags reported by a physical device and requested at
    /// device creation.
    ///
    /// The low word holds the base (1.0) feature block, queryable through
    /// [`Driver::features`](crate::Driver::features); everything above it
    /// belongs to later core-version blocks and is only visible through the
    /// extended query ([`Driver::features2`](crate::Driver::features2)).
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct DeviceFeatures: u64 {
        // Base (1.0) block.
        const ROBUST_BUFFER_ACCESS        = 1 << 0;
        const FULL_DRAW_INDEX_UINT32      = 1 << 1;
        const SAMPLER_ANISOTROPY          = 1 << 2;
        const DEPTH_CLAMP                 = 1 << 3;
        const MULTI_VIEWPORT              = 1 << 4;
        const FILL_MODE_NON_SOLID         = 1 << 5;
        const WIDE_LINES                  = 1 << 6;
        const GEOMETRY_SHADER             = 1 << 7;
        const TESSELLATION_SHADER         = 1 << 8;

        // 1.2 block.
        const DRAW_INDIRECT_COUNT         = 1 << 16;
        const SAMPLER_FILTER_MINMAX       = 1 << 17;
        const SHADER_OUTPUT_VIEWPORT_INDEX = 1 << 18;
        const SHADER_OUTPUT_LAYER         = 1 << 19;
        const TIMELINE_SEMAPHORE          = 1 << 20;
        const DESCRIPTOR_INDEXING         = 1 << 21;
        const BUFFER_DEVICE_ADDRESS       = 1 << 22;
    }
}

impl DeviceFeatures {
    /// The base feature block visible without the extended query.
    pub const BASE: Self = Self::from_bits_truncate(0xffff);
}

/// A single named feature flag.
///
/// Exists so required/disabled bookkeeping can surface the missing flag by
/// name in skip diagnostics rather than as a raw bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    RobustBufferAccess,
    FullDrawIndexUint32,
    SamplerAnisotropy,
    DepthClamp,
    MultiViewport,
    FillModeNonSolid,
    WideLines,
    GeometryShader,
    TessellationShader,
    DrawIndirectCount,
    SamplerFilterMinmax,
    ShaderOutputViewportIndex,
    ShaderOutputLayer,
    TimelineSemaphore,
    DescriptorIndexing,
    BufferDeviceAddress,
}

impl Feature {
    /// The bit this flag occupies in [`DeviceFeatures`].
    pub const fn mask(self) -> DeviceFeatures {
        match self {
            Feature::RobustBufferAccess => DeviceFeatures::ROBUST_BUFFER_ACCESS,
            Feature::FullDrawIndexUint32 => DeviceFeatures::FULL_DRAW_INDEX_UINT32,
            Feature::SamplerAnisotropy => DeviceFeatures::SAMPLER_ANISOTROPY,
            Feature::DepthClamp => DeviceFeatures::DEPTH_CLAMP,
            Feature::MultiViewport => DeviceFeatures::MULTI_VIEWPORT,
            Feature::FillModeNonSolid => DeviceFeatures::FILL_MODE_NON_SOLID,
            Feature::WideLines => DeviceFeatures::WIDE_LINES,
            Feature::GeometryShader => DeviceFeatures::GEOMETRY_SHADER,
            Feature::TessellationShader => DeviceFeatures::TESSELLATION_SHADER,
            Feature::DrawIndirectCount => DeviceFeatures::DRAW_INDIRECT_COUNT,
            Feature::SamplerFilterMinmax => DeviceFeatures::SAMPLER_FILTER_MINMAX,
            Feature::ShaderOutputViewportIndex => DeviceFeatures::SHADER_OUTPUT_VIEWPORT_INDEX,
            Feature::ShaderOutputLayer => DeviceFeatures::SHADER_OUTPUT_LAYER,
            Feature::TimelineSemaphore => DeviceFeatures::TIMELINE_SEMAPHORE,
            Feature::DescriptorIndexing => DeviceFeatures::DESCRIPTOR_INDEXING,
            Feature::BufferDeviceAddress => DeviceFeatures::BUFFER_DEVICE_ADDRESS,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Feature::RobustBufferAccess => "robust_buffer_access",
            Feature::FullDrawIndexUint32 => "full_draw_index_uint32",
            Feature::SamplerAnisotropy => "sampler_anisotropy",
            Feature::DepthClamp => "depth_clamp",
            Feature::MultiViewport => "multi_viewport",
            Feature::FillModeNonSolid => "fill_mode_non_solid",
            Feature::WideLines => "wide_lines",
            Feature::GeometryShader => "geometry_shader",
            Feature::TessellationShader => "tessellation_shader",
            Feature::DrawIndirectCount => "draw_indirect_count",
            Feature::SamplerFilterMinmax => "sampler_filter_minmax",
            Feature::ShaderOutputViewportIndex => "shader_output_viewport_index",
            Feature::ShaderOutputLayer => "shader_output_layer",
            Feature::TimelineSemaphore => "timeline_semaphore",
            Feature::DescriptorIndexing => "descriptor_indexing",
            Feature::BufferDeviceAddress => "buffer_device_address",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[Feature] = &[
        Feature::RobustBufferAccess,
        Feature::FullDrawIndexUint32,
        Feature::SamplerAnisotropy,
        Feature::DepthClamp,
        Feature::MultiViewport,
        Feature::FillModeNonSolid,
        Feature::WideLines,
        Feature::GeometryShader,
        Feature::TessellationShader,
        Feature::DrawIndirectCount,
        Feature::SamplerFilterMinmax,
        Feature::ShaderOutputViewportIndex,
        Feature::ShaderOutputLayer,
        Feature::TimelineSemaphore,
        Feature::DescriptorIndexing,
        Feature::BufferDeviceAddress,
    ];

    #[test]
    fn masks_are_single_distinct_bits() {
        let mut seen = DeviceFeatures::empty();
        for &feature in ALL {
            let mask = feature.mask();
            assert_eq!(mask.bits().count_ones(), 1, "{feature}");
            assert!(!seen.intersects(mask), "{feature} reuses a bit");
            seen |= mask;
        }
    }

    #[test]
    fn base_mask_splits_blocks() {
        assert!(DeviceFeatures::BASE.contains(Feature::SamplerAnisotropy.mask()));
        assert!(!DeviceFeatures::BASE.contains(Feature::TimelineSemaphore.mask()));
    }
}
