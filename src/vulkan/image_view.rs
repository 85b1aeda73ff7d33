use std::sync::Arc;

use ash::vk;

use super::context::Context;
use super::image::Image;
use super::{VkResultExt, VulkanResult};

pub struct ImageView {
    pub inner: vk::ImageView,

    pub image: Arc<Image>,
    context: Arc<Context>,
    aspect_mask: vk::ImageAspectFlags,
}

impl ImageView {
    pub fn new_default(
        context: Arc<Context>,
        image: Arc<Image>,
        aspect_mask: vk::ImageAspectFlags,
    ) -> VulkanResult<Self> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::R,
                g: vk::ComponentSwizzle::G,
                b: vk::ComponentSwizzle::B,
                a: vk::ComponentSwizzle::A,
            })
            .subresource_range(image.full_subresource_range(aspect_mask))
            .image(image.inner);

        let inner = unsafe { context.device.create_image_view(&create_info, None) }
            .on("vkCreateImageView")?;

        Ok(Self {
            inner,
            image,
            context,
            aspect_mask,
        })
    }

    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        self.image.full_subresource_range(self.aspect_mask)
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_image_view(self.inner, None) };
    }
}
