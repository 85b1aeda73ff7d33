use std::sync::Arc;

use ash::vk;

use super::context::Context;
use super::{VkResultExt, VulkanResult};

pub struct Sampler {
    pub inner: vk::Sampler,
    context: Arc<Context>,
}

impl Sampler {
    pub fn new(context: Arc<Context>, create_info: &vk::SamplerCreateInfo) -> VulkanResult<Self> {
        let inner = unsafe { context.device.create_sampler(create_info, None) }
            .on("vkCreateSampler")?;
        Ok(Self { inner, context })
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_sampler(self.inner, None) };
    }
}
