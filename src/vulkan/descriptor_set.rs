use ash::vk;

use super::buffer::Buffer;
use super::context::Context;
use super::image_view::ImageView;
use super::sampler::Sampler;
use super::{VkResultExt, VulkanResult};

/// Set allocated from a pool the caller owns; it is released together with the pool.
pub struct DescriptorSet {
    pub inner: vk::DescriptorSet,
}

impl DescriptorSet {
    pub fn new(
        context: &Context,
        descriptor_pool: vk::DescriptorPool,
        set_layout: vk::DescriptorSetLayout,
        write_descriptor_sets: &[WriteDescriptorSet],
    ) -> VulkanResult<Self> {
        let device = &context.device;
        let allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(descriptor_pool)
            .set_layouts(std::slice::from_ref(&set_layout));

        let descriptor_set = unsafe { device.allocate_descriptor_sets(&allocate_info) }
            .on("vkAllocateDescriptorSets")?[0];

        let write_descriptor_sets: Vec<vk::WriteDescriptorSet> = write_descriptor_sets
            .iter()
            .map(|write| {
                let vk_write = vk::WriteDescriptorSet::builder()
                    .dst_binding(write.binding)
                    .descriptor_type(write.info.descriptor_type())
                    .dst_set(descriptor_set);

                match &write.info {
                    DescriptorInfo::Buffer(info) => {
                        vk_write.buffer_info(std::slice::from_ref(info)).build()
                    }
                    DescriptorInfo::SampledImage(info) => {
                        vk_write.image_info(std::slice::from_ref(info)).build()
                    }
                }
            })
            .collect();

        unsafe { device.update_descriptor_sets(&write_descriptor_sets, &[]) };

        Ok(Self {
            inner: descriptor_set,
        })
    }
}

pub struct WriteDescriptorSet {
    binding: u32,
    info: DescriptorInfo,
}

pub enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    SampledImage(vk::DescriptorImageInfo),
}

impl DescriptorInfo {
    pub fn descriptor_type(&self) -> vk::DescriptorType {
        match self {
            DescriptorInfo::Buffer(_) => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorInfo::SampledImage(_) => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        }
    }
}

impl WriteDescriptorSet {
    pub fn buffer<T>(binding: u32, buffer: &Buffer<T>) -> WriteDescriptorSet {
        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::Buffer(buffer.descriptor_info()),
        }
    }

    pub fn image_view_sampler(
        binding: u32,
        image_view: &ImageView,
        sampler: &Sampler,
    ) -> WriteDescriptorSet {
        let info = vk::DescriptorImageInfo::builder()
            .sampler(sampler.inner)
            .image_view(image_view.inner)
            .image_layout(image_view.image.layout)
            .build();

        WriteDescriptorSet::image(binding, info)
    }

    pub fn image(binding: u32, info: vk::DescriptorImageInfo) -> WriteDescriptorSet {
        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::SampledImage(info),
        }
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn descriptor_type(&self) -> vk::DescriptorType {
        self.info.descriptor_type()
    }
}
