use std::ffi::c_void;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use ash::vk;

use super::command_buffer::OneTimeCommandBuffer;
use super::context::Context;
use super::{VkResultExt, VulkanResult};

pub trait IntoSlice<T> {
    fn as_sliced(&self) -> &[T];
}

impl<T> IntoSlice<T> for T {
    fn as_sliced(&self) -> &[T] {
        std::slice::from_ref(self)
    }
}

impl<T> IntoSlice<T> for [T] {
    fn as_sliced(&self) -> &[T] {
        self
    }
}

impl<T> IntoSlice<T> for Vec<T> {
    fn as_sliced(&self) -> &[T] {
        self
    }
}

/// A buffer with its own memory allocation. `T` is the element type the buffer is filled with.
pub struct Buffer<T> {
    pub inner: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    mapped: Option<*mut c_void>,
    context: Arc<Context>,
    _marker: PhantomData<T>,
}

impl<T> Buffer<T> {
    pub fn new(
        context: Arc<Context>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_property_flags: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Buffer<T>> {
        let device = &context.device;

        let create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&create_info, None) }.on("vkCreateBuffer")?;

        let buffer_memory_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory = context
            .find_memory_type(&buffer_memory_requirements, memory_property_flags)
            .and_then(|memory_type_index| {
                let allocate_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(buffer_memory_requirements.size)
                    .memory_type_index(memory_type_index);

                unsafe { device.allocate_memory(&allocate_info, None) }.on("vkAllocateMemory")
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(err);
            }
        };

        // From here on Drop cleans up.
        let buffer = Buffer {
            inner: buffer,
            memory,
            size,
            usage,
            mapped: None,
            context,
            _marker: PhantomData,
        };

        let device = &buffer.context.device;
        unsafe { device.bind_buffer_memory(buffer.inner, buffer.memory, 0) }
            .on("vkBindBufferMemory")?;

        Ok(buffer)
    }

    /// Host visible and coherent buffer that already contains `data`.
    pub fn new_with_data<U: IntoSlice<T> + ?Sized>(
        context: Arc<Context>,
        usage: vk::BufferUsageFlags,
        data: &U,
    ) -> VulkanResult<Buffer<T>> {
        let data = data.as_sliced();
        let buffer = Buffer::new(
            context,
            std::mem::size_of_val(data) as vk::DeviceSize,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.copy_data(data)?;
        Ok(buffer)
    }

    /// Device local buffer filled through a staging buffer and a one-time copy.
    pub fn new_device_local_with_data<U: IntoSlice<T> + ?Sized>(
        context: Arc<Context>,
        usage: vk::BufferUsageFlags,
        data: &U,
    ) -> VulkanResult<Buffer<T>> {
        let staging_buffer =
            Buffer::new_with_data(context.clone(), vk::BufferUsageFlags::TRANSFER_SRC, data)?;

        let buffer = Buffer::new(
            context.clone(),
            staging_buffer.size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        let command_buffer = OneTimeCommandBuffer::begin(context)?;
        buffer.copy_from(*command_buffer, &staging_buffer);
        command_buffer.flush()?;

        Ok(buffer)
    }

    pub fn copy_data<U: IntoSlice<T> + ?Sized>(&self, data: &U) -> VulkanResult<()> {
        let data = data.as_sliced();
        assert!(std::mem::size_of_val(data) as vk::DeviceSize <= self.size);

        let device = &self.context.device;
        let buffer_ptr = match self.mapped {
            Some(ptr) => ptr,
            None => unsafe {
                device.map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
            }
            .on("vkMapMemory")?,
        } as *mut T;

        unsafe { buffer_ptr.copy_from_nonoverlapping(data.as_ptr(), data.len()) };

        if self.mapped.is_none() {
            unsafe { device.unmap_memory(self.memory) };
        }
        Ok(())
    }

    /// Keeps the memory mapped until the buffer is dropped or [`Buffer::unmap`] is called.
    pub fn map(&mut self) -> VulkanResult<()> {
        if self.mapped.is_none() {
            let ptr = unsafe {
                self.context.device.map_memory(
                    self.memory,
                    0,
                    vk::WHOLE_SIZE,
                    vk::MemoryMapFlags::empty(),
                )
            }
            .on("vkMapMemory")?;
            self.mapped = Some(ptr);
        }
        Ok(())
    }

    pub fn unmap(&mut self) {
        if self.mapped.take().is_some() {
            unsafe { self.context.device.unmap_memory(self.memory) };
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    pub fn copy_from(&self, command_buffer: vk::CommandBuffer, other: &Buffer<T>) {
        assert!(other.usage.contains(vk::BufferUsageFlags::TRANSFER_SRC));
        assert!(self.usage.contains(vk::BufferUsageFlags::TRANSFER_DST));

        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: other.size.min(self.size),
        };

        unsafe {
            self.context.device.cmd_copy_buffer(
                command_buffer,
                other.inner,
                self.inner,
                std::slice::from_ref(&region),
            )
        };
    }

    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.inner,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }
}

impl<T> Drop for Buffer<T> {
    fn drop(&mut self) {
        self.unmap();
        let device = &self.context.device;
        unsafe { device.destroy_buffer(self.inner, None) };
        unsafe { device.free_memory(self.memory, None) };
    }
}

impl<T> Deref for Buffer<T> {
    type Target = vk::Buffer;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
