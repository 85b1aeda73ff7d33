use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Post-processing applied while a file is loaded.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FileLoadingFlags: u32 {
        const PRE_TRANSFORM_VERTICES = 0x1;
        const PRE_MULTIPLY_VERTEX_COLORS = 0x2;
        const FLIP_Y = 0x4;
        const DONT_LOAD_IMAGES = 0x8;
    }
}

bitflags! {
    /// Controls the draw traversal. Without any of the alpha filters every primitive is drawn.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RenderFlags: u32 {
        const BIND_IMAGES = 0x1;
        const RENDER_OPAQUE_NODES = 0x2;
        const RENDER_ALPHA_MASKED_NODES = 0x4;
        const RENDER_ALPHA_BLENDED_NODES = 0x8;
    }
}

bitflags! {
    /// Images a material descriptor set exposes, bound in this order.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DescriptorBindingFlags: u32 {
        const IMAGE_BASE_COLOR = 0x1;
        const IMAGE_NORMAL_MAP = 0x2;
    }
}

impl Default for DescriptorBindingFlags {
    fn default() -> Self {
        DescriptorBindingFlags::IMAGE_BASE_COLOR
    }
}

impl RenderFlags {
    pub const ALPHA_FILTERS: RenderFlags = RenderFlags::RENDER_OPAQUE_NODES
        .union(RenderFlags::RENDER_ALPHA_MASKED_NODES)
        .union(RenderFlags::RENDER_ALPHA_BLENDED_NODES);
}
