pub mod buffer;
pub mod command_buffer;
pub mod context;
pub mod descriptor_set;
pub mod image;
pub mod image_view;
pub mod sampler;

use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VulkanError {
    #[error("{call} failed: {result}")]
    Vk {
        call: &'static str,
        result: vk::Result,
    },
    #[error("could not load the vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),
    #[error("no physical device with a graphics queue was found")]
    NoSuitableDevice,
    #[error("no memory type matches {0:?}")]
    NoMemoryType(vk::MemoryPropertyFlags),
    #[error("no queue family supports {0:?}")]
    NoQueueFamily(vk::QueueFlags),
    #[error("no supported depth format")]
    NoDepthFormat,
    #[error("format {format:?} does not support {feature:?} with optimal tiling")]
    UnsupportedFormatFeature {
        format: vk::Format,
        feature: vk::FormatFeatureFlags,
    },
}

pub type VulkanResult<T> = Result<T, VulkanError>;

/// Attaches the name of the failing Vulkan call to a raw `vk::Result`.
pub(crate) trait VkResultExt<T> {
    fn on(self, call: &'static str) -> VulkanResult<T>;
}

impl<T> VkResultExt<T> for Result<T, vk::Result> {
    fn on(self, call: &'static str) -> VulkanResult<T> {
        self.map_err(|result| VulkanError::Vk { call, result })
    }
}

pub fn find_memorytype_index(
    memory_req: &vk::MemoryRequirements,
    memory_prop: &vk::PhysicalDeviceMemoryProperties,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    memory_prop.memory_types[..memory_prop.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            (memory_req.memory_type_bits & (1 << index)) != 0
                && memory_type.property_flags & flags == flags
        })
        .map(|(index, _memory_type)| index as u32)
}
