use std::{ops::BitOr, sync::Arc};

use ash::vk::{
    self, AccessFlags, Extent3D, Format, ImageCreateFlags, ImageLayout, ImageSubresourceRange,
    ImageTiling, ImageType, ImageUsageFlags, PipelineStageFlags, SampleCountFlags, SharingMode,
};

use super::buffer::Buffer;
use super::context::Context;
use super::{VkResultExt, VulkanError, VulkanResult};

pub struct Image {
    pub inner: vk::Image,
    pub memory: vk::DeviceMemory,

    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub layout: vk::ImageLayout,
    pub mip_levels: u32,

    context: Arc<Context>,
}

impl Image {
    pub fn new(context: Arc<Context>, create_info: &vk::ImageCreateInfo) -> VulkanResult<Image> {
        let device = &context.device;

        let image = unsafe { device.create_image(create_info, None) }.on("vkCreateImage")?;

        let memory_requirements = unsafe { device.get_image_memory_requirements(image) };

        let memory = context
            .find_memory_type(&memory_requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .and_then(|memory_type_index| {
                let allocate_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(memory_requirements.size)
                    .memory_type_index(memory_type_index);

                unsafe { device.allocate_memory(&allocate_info, None) }.on("vkAllocateMemory")
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_image(image, None) };
                return Err(err);
            }
        };

        let image = Self {
            inner: image,
            memory,
            format: create_info.format,
            extent: create_info.extent,
            layout: create_info.initial_layout,
            mip_levels: create_info.mip_levels,
            context,
        };

        let device = &image.context.device;
        unsafe { device.bind_image_memory(image.inner, image.memory, 0) }
            .on("vkBindImageMemory")?;

        Ok(image)
    }

    /// Copies `buffer` into mip level 0, blits the remaining levels from it and leaves the whole
    /// image in `SHADER_READ_ONLY_OPTIMAL`.
    pub fn copy_from_buffer_for_texture<T>(
        &mut self,
        command_buffer: vk::CommandBuffer,
        buffer: &Buffer<T>,
    ) -> VulkanResult<()> {
        let num_levels = self.mip_levels;
        let device = &self.context.device;

        if num_levels > 1 {
            let features = self
                .context
                .format_properties(self.format)
                .optimal_tiling_features;
            check_mip_blit_support(self.format, features)?;
        }

        // all levels go to TRANSFER_DST_OPTIMAL, level 0 receives the copy
        self.insert_image_memory_barrier(
            command_buffer,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            PipelineStageFlags::TOP_OF_PIPE,
            PipelineStageFlags::TRANSFER,
            AccessFlags::empty(),
            AccessFlags::TRANSFER_WRITE,
            self.full_subresource_range(vk::ImageAspectFlags::COLOR),
        );

        let buffer_image_copy = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: self.extent,
        };

        unsafe {
            device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer.inner,
                self.inner,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&buffer_image_copy),
            )
        };

        for level in 1..num_levels {
            let src_size = Self::extent_to_offset(Self::mip_extent(self.extent, level - 1));
            let dst_size = Self::extent_to_offset(Self::mip_extent(self.extent, level));

            self.insert_image_memory_barrier(
                command_buffer,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                PipelineStageFlags::TRANSFER,
                PipelineStageFlags::TRANSFER,
                AccessFlags::TRANSFER_WRITE,
                AccessFlags::TRANSFER_READ,
                Self::single_level_range(level - 1),
            );

            let blit = vk::ImageBlit::builder()
                .src_offsets([vk::Offset3D::default(), src_size])
                .src_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level - 1,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .dst_offsets([vk::Offset3D::default(), dst_size])
                .dst_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: level,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .build();

            unsafe {
                device.cmd_blit_image(
                    command_buffer,
                    self.inner,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.inner,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    std::slice::from_ref(&blit),
                    vk::Filter::LINEAR,
                )
            };

            self.insert_image_memory_barrier(
                command_buffer,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                PipelineStageFlags::TRANSFER,
                PipelineStageFlags::FRAGMENT_SHADER,
                AccessFlags::TRANSFER_READ,
                AccessFlags::SHADER_READ,
                Self::single_level_range(level - 1),
            );
        }

        // the last level was only ever written to
        self.insert_image_memory_barrier(
            command_buffer,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            PipelineStageFlags::TRANSFER,
            PipelineStageFlags::FRAGMENT_SHADER,
            AccessFlags::TRANSFER_WRITE,
            AccessFlags::SHADER_READ,
            Self::single_level_range(num_levels - 1),
        );
        self.layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_image_memory_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_stage_mask: PipelineStageFlags,
        dst_stage_mask: PipelineStageFlags,
        src_access_mask: AccessFlags,
        dst_access_mask: AccessFlags,
        subresource_range: ImageSubresourceRange,
    ) {
        let barrier = vk::ImageMemoryBarrier {
            old_layout,
            new_layout,
            src_access_mask,
            dst_access_mask,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image: self.inner,
            subresource_range,
            ..Default::default()
        };

        unsafe {
            self.context.device.cmd_pipeline_barrier(
                command_buffer,
                src_stage_mask,
                dst_stage_mask,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(&barrier),
            )
        };
    }

    fn single_level_range(level: u32) -> ImageSubresourceRange {
        ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: level,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    pub fn max_mip_levels(extent: vk::Extent3D) -> u32 {
        // ⌊log2(max(width_0, height_0, depth_0))⌋ + 1
        32 - [extent.width, extent.height, extent.depth]
            .into_iter()
            .fold(0, BitOr::bitor)
            .leading_zeros()
    }

    pub fn mip_level(base_extent: vk::Extent3D, level: u32) -> Option<vk::Extent3D> {
        if level == 0 {
            Some(base_extent)
        } else if level >= Self::max_mip_levels(base_extent) {
            None
        } else {
            Some(Self::mip_extent(base_extent, level))
        }
    }

    fn mip_extent(base_extent: vk::Extent3D, level: u32) -> vk::Extent3D {
        Extent3D {
            width: (base_extent.width >> level).max(1),
            height: (base_extent.height >> level).max(1),
            depth: (base_extent.depth >> level).max(1),
        }
    }

    pub fn extent_to_offset(extent: vk::Extent3D) -> vk::Offset3D {
        vk::Offset3D {
            x: extent.width as i32,
            y: extent.height as i32,
            z: extent.depth as i32,
        }
    }

    pub fn full_subresource_range(
        &self,
        aspect_mask: vk::ImageAspectFlags,
    ) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

/// Mip levels are generated with linear blits, so the format needs blit source and
/// destination support plus linear filtering.
fn check_mip_blit_support(format: vk::Format, features: vk::FormatFeatureFlags) -> VulkanResult<()> {
    let required = vk::FormatFeatureFlags::BLIT_SRC
        | vk::FormatFeatureFlags::BLIT_DST
        | vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR;
    if features.contains(required) {
        Ok(())
    } else {
        Err(VulkanError::UnsupportedFormatFeature {
            format,
            feature: required & !features,
        })
    }
}

pub fn simple_image_create_info() -> vk::ImageCreateInfo {
    vk::ImageCreateInfo {
        flags: ImageCreateFlags::empty(),
        image_type: ImageType::TYPE_2D,
        format: Format::UNDEFINED,
        extent: Extent3D {
            width: 0,
            height: 0,
            depth: 0,
        },
        mip_levels: 1,
        array_layers: 1,
        samples: SampleCountFlags::TYPE_1,
        tiling: ImageTiling::OPTIMAL,
        usage: ImageUsageFlags::empty(),
        sharing_mode: SharingMode::EXCLUSIVE,
        initial_layout: ImageLayout::UNDEFINED,
        ..Default::default()
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_image(self.inner, None) };
        unsafe { self.context.device.free_memory(self.memory, None) };
    }
}
