use std::sync::Arc;

use ash::vk;

use crate::model::DescriptorBindingFlags;
use crate::vulkan::context::Context;
use crate::vulkan::{VkResultExt, VulkanResult};

/// Set layouts every [`GpuModel`](super::GpuModel) created with them shares: one uniform
/// buffer per mesh node and the material images selected by `binding_flags`.
pub struct ModelDescriptorLayouts {
    ubo_descriptor_set_layout: vk::DescriptorSetLayout,
    image_descriptor_set_layout: vk::DescriptorSetLayout,
    binding_flags: DescriptorBindingFlags,

    context: Arc<Context>,
}

impl ModelDescriptorLayouts {
    pub fn new(context: Arc<Context>, binding_flags: DescriptorBindingFlags) -> VulkanResult<Self> {
        let device = &context.device;

        let ubo_descriptor_set_layout = {
            let bindings = [vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_count(1)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .build()];

            let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

            unsafe { device.create_descriptor_set_layout(&create_info, None) }
                .on("vkCreateDescriptorSetLayout")?
        };

        let image_descriptor_set_layout = {
            let bindings = image_bindings(binding_flags);
            let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

            match unsafe { device.create_descriptor_set_layout(&create_info, None) }
                .on("vkCreateDescriptorSetLayout")
            {
                Ok(layout) => layout,
                Err(err) => {
                    unsafe { device.destroy_descriptor_set_layout(ubo_descriptor_set_layout, None) };
                    return Err(err);
                }
            }
        };

        Ok(Self {
            ubo_descriptor_set_layout,
            image_descriptor_set_layout,
            binding_flags,
            context,
        })
    }

    pub fn ubo(&self) -> vk::DescriptorSetLayout {
        self.ubo_descriptor_set_layout
    }

    pub fn image(&self) -> vk::DescriptorSetLayout {
        self.image_descriptor_set_layout
    }

    pub fn binding_flags(&self) -> DescriptorBindingFlags {
        self.binding_flags
    }
}

impl Drop for ModelDescriptorLayouts {
    fn drop(&mut self) {
        let device = &self.context.device;

        unsafe { device.destroy_descriptor_set_layout(self.ubo_descriptor_set_layout, None) };
        unsafe { device.destroy_descriptor_set_layout(self.image_descriptor_set_layout, None) };
    }
}

/// Base color first, then the normal map, numbered from 0 without gaps.
pub fn image_bindings(flags: DescriptorBindingFlags) -> Vec<vk::DescriptorSetLayoutBinding> {
    [
        DescriptorBindingFlags::IMAGE_BASE_COLOR,
        DescriptorBindingFlags::IMAGE_NORMAL_MAP,
    ]
    .into_iter()
    .filter(|flag| flags.contains(*flag))
    .enumerate()
    .map(|(binding, _)| {
        vk::DescriptorSetLayoutBinding::builder()
            .binding(binding as u32)
            .descriptor_count(1)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)
            .build()
    })
    .collect()
}
