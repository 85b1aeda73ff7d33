use std::path::Path;
use std::sync::Arc;

use ash::vk;

use crate::error::ModelResult;
use crate::model::TextureImage;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_buffer::OneTimeCommandBuffer;
use crate::vulkan::context::Context;
use crate::vulkan::descriptor_set::WriteDescriptorSet;
use crate::vulkan::image::{simple_image_create_info, Image};
use crate::vulkan::image_view::ImageView;
use crate::vulkan::sampler::Sampler;
use crate::vulkan::VulkanResult;

const MAX_ANISOTROPY: f32 = 8.0;

#[derive(Clone, Copy, Debug)]
pub struct TextureOptions {
    pub format: vk::Format,
    pub address_mode: vk::SamplerAddressMode,
    pub generate_mipmaps: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            format: vk::Format::R8G8B8A8_UNORM,
            address_mode: vk::SamplerAddressMode::MIRRORED_REPEAT,
            generate_mipmaps: true,
        }
    }
}

/// Sampled 2D image with its view and sampler, in `SHADER_READ_ONLY_OPTIMAL`.
pub struct Texture2D {
    pub image_view: Arc<ImageView>,
    pub sampler: Arc<Sampler>,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
}

impl Texture2D {
    pub fn from_rgba8(
        context: Arc<Context>,
        pixels: &[u8],
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> VulkanResult<Self> {
        assert_eq!(pixels.len(), (width * height * 4) as usize);

        let staging_buffer: Buffer<u8> =
            Buffer::new_with_data(context.clone(), vk::BufferUsageFlags::TRANSFER_SRC, pixels)?;

        let extent = vk::Extent3D {
            width,
            height,
            depth: 1,
        };
        let mip_levels = if options.generate_mipmaps {
            Image::max_mip_levels(extent)
        } else {
            1
        };

        let mut image = Image::new(
            context.clone(),
            &vk::ImageCreateInfo {
                format: options.format,
                extent,
                mip_levels,
                usage: vk::ImageUsageFlags::SAMPLED
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::TRANSFER_SRC,
                ..simple_image_create_info()
            },
        )?;

        let command_buffer = OneTimeCommandBuffer::begin(context.clone())?;
        image.copy_from_buffer_for_texture(*command_buffer, &staging_buffer)?;
        command_buffer.flush()?;

        let image_view = Arc::new(ImageView::new_default(
            context.clone(),
            Arc::new(image),
            vk::ImageAspectFlags::COLOR,
        )?);

        let anisotropy = context.enabled_features.sampler_anisotropy == vk::TRUE;
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(options.address_mode)
            .address_mode_v(options.address_mode)
            .address_mode_w(options.address_mode)
            .compare_op(vk::CompareOp::NEVER)
            .min_lod(0.0)
            .max_lod(mip_levels as f32)
            .anisotropy_enable(anisotropy)
            .max_anisotropy(if anisotropy {
                MAX_ANISOTROPY.min(context.physical_device_properties.limits.max_sampler_anisotropy)
            } else {
                1.0
            })
            .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE);
        let sampler = Arc::new(Sampler::new(context, &sampler_info)?);

        Ok(Self {
            image_view,
            sampler,
            width,
            height,
            mip_levels,
        })
    }

    /// Decodes any format the `image` crate reads and uploads it as RGBA8.
    pub fn from_file(
        context: Arc<Context>,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> ModelResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)?.into_rgba8();
        let (width, height) = decoded.dimensions();
        log::debug!("Texture {:?}: {}x{}", path, width, height);
        Ok(Self::from_rgba8(
            context,
            decoded.as_raw(),
            width,
            height,
            options,
        )?)
    }

    pub fn from_gltf_image(context: Arc<Context>, image: &TextureImage) -> VulkanResult<Self> {
        Self::from_rgba8(
            context,
            &image.pixels,
            image.width,
            image.height,
            TextureOptions::default(),
        )
    }

    /// 1x1 transparent black, bound where a material has no texture.
    pub fn empty(context: Arc<Context>) -> VulkanResult<Self> {
        Self::from_rgba8(
            context,
            &[0; 4],
            1,
            1,
            TextureOptions {
                address_mode: vk::SamplerAddressMode::REPEAT,
                generate_mipmaps: false,
                ..Default::default()
            },
        )
    }

    pub fn descriptor(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler.inner,
            image_view: self.image_view.inner,
            image_layout: self.image_view.image.layout,
        }
    }

    pub fn write_descriptor(&self, binding: u32) -> WriteDescriptorSet {
        WriteDescriptorSet::image_view_sampler(binding, &self.image_view, &self.sampler)
    }
}
