use std::ops::Deref;
use std::sync::Arc;

use ash::vk;

use super::context::Context;
use super::{VkResultExt, VulkanResult};

/// Primary command buffer from the context's pool, recorded once and flushed synchronously.
/// Freed on drop, whether or not it was flushed.
pub struct OneTimeCommandBuffer {
    inner: vk::CommandBuffer,
    context: Arc<Context>,
}

impl OneTimeCommandBuffer {
    pub fn begin(context: Arc<Context>) -> VulkanResult<Self> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(context.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let inner = unsafe { context.device.allocate_command_buffers(&allocate_info) }
            .on("vkAllocateCommandBuffers")?[0];

        let command_buffer = Self { inner, context };

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            command_buffer
                .context
                .device
                .begin_command_buffer(command_buffer.inner, &begin_info)
        }
        .on("vkBeginCommandBuffer")?;

        Ok(command_buffer)
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Ends recording, submits to the graphics queue and blocks on a fence until it finished.
    pub fn flush(self) -> VulkanResult<()> {
        let device = &self.context.device;

        unsafe { device.end_command_buffer(self.inner) }.on("vkEndCommandBuffer")?;

        let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default(), None) }
            .on("vkCreateFence")?;

        let submit_info =
            vk::SubmitInfo::builder().command_buffers(std::slice::from_ref(&self.inner));

        let result = unsafe {
            device.queue_submit(
                self.context.queue,
                std::slice::from_ref(&submit_info),
                fence,
            )
        }
        .on("vkQueueSubmit")
        .and_then(|_| {
            unsafe { device.wait_for_fences(std::slice::from_ref(&fence), true, u64::MAX) }
                .on("vkWaitForFences")
        });

        unsafe { device.destroy_fence(fence, None) };

        result
    }
}

impl Deref for OneTimeCommandBuffer {
    type Target = vk::CommandBuffer;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Drop for OneTimeCommandBuffer {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device
                .free_command_buffers(self.context.command_pool, std::slice::from_ref(&self.inner))
        };
    }
}
