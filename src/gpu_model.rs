mod descriptor_layouts;

pub use descriptor_layouts::*;

use std::sync::Arc;

use ash::vk;

use crate::error::{ModelError, ModelResult};
use crate::model::{
    DescriptorBindingFlags, DrawRecorder, MeshUniform, Model, NodeId, RenderFlags, Vertex,
};
use crate::texture::Texture2D;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;
use crate::vulkan::descriptor_set::{DescriptorSet, WriteDescriptorSet};
use crate::vulkan::{VkResultExt, VulkanResult};

/// A [`Model`] with its geometry, textures and per-node uniforms uploaded to the device.
pub struct GpuModel {
    pub model: Model,
    pub vertices: Buffer<Vertex>,
    pub indices: Buffer<u32>,
    /// One per glTF image, same order as `model.images`.
    pub textures: Vec<Texture2D>,
    pub empty_texture: Texture2D,
    node_uniforms: Vec<Option<NodeUniform>>,
    material_sets: Vec<Option<DescriptorSet>>,
    buffers_bound: bool,

    // Sets are freed with the pool, keep it after everything that refers to them.
    _descriptor_pool: DescriptorPool,
    context: Arc<Context>,
}

struct NodeUniform {
    buffer: Buffer<MeshUniform>,
    descriptor_set: DescriptorSet,
}

struct DescriptorPool {
    inner: vk::DescriptorPool,
    context: Arc<Context>,
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device
                .destroy_descriptor_pool(self.inner, None)
        };
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PoolSizes {
    uniform_buffers: u32,
    image_samplers: u32,
    max_sets: u32,
}

impl PoolSizes {
    fn for_model(model: &Model, binding_flags: DescriptorBindingFlags) -> Self {
        let uniform_buffers = model
            .nodes
            .iter()
            .filter(|node| node.mesh.is_some())
            .count() as u32;
        let image_bindings = binding_flags.bits().count_ones();
        let textured_materials = if image_bindings == 0 {
            0
        } else {
            textured_materials(model).count() as u32
        };

        Self {
            uniform_buffers,
            image_samplers: textured_materials * image_bindings,
            max_sets: uniform_buffers + textured_materials,
        }
    }
}

/// Materials that get an image descriptor set.
fn textured_materials(model: &Model) -> impl Iterator<Item = usize> + '_ {
    model
        .materials
        .iter()
        .enumerate()
        .filter(|(_, material)| material.base_color_texture.is_some())
        .map(|(i, _)| i)
}

impl GpuModel {
    pub fn new(
        context: Arc<Context>,
        model: Model,
        layouts: &ModelDescriptorLayouts,
        extra_buffer_usage: vk::BufferUsageFlags,
    ) -> ModelResult<Self> {
        if model.vertices.is_empty() || model.indices.is_empty() {
            return Err(ModelError::EmptyGeometry);
        }
        let binding_flags = layouts.binding_flags();

        let vertices: Buffer<Vertex> = Buffer::new_device_local_with_data(
            context.clone(),
            vk::BufferUsageFlags::VERTEX_BUFFER | extra_buffer_usage,
            &model.vertices,
        )?;
        let indices: Buffer<u32> = Buffer::new_device_local_with_data(
            context.clone(),
            vk::BufferUsageFlags::INDEX_BUFFER | extra_buffer_usage,
            &model.indices,
        )?;

        let textures = model
            .images
            .iter()
            .map(|image| Texture2D::from_gltf_image(context.clone(), image))
            .collect::<VulkanResult<Vec<_>>>()?;
        let empty_texture = Texture2D::empty(context.clone())?;

        let sizes = PoolSizes::for_model(&model, binding_flags);
        log::debug!("Descriptor pool for {:?}", sizes);
        let descriptor_pool = create_descriptor_pool(context.clone(), sizes)?;

        let node_uniforms = model
            .nodes
            .iter()
            .map(|node| {
                node.mesh
                    .as_ref()
                    .map(|mesh| {
                        create_node_uniform(&context, &descriptor_pool, layouts, &mesh.uniform)
                    })
                    .transpose()
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let mut material_sets: Vec<Option<DescriptorSet>> =
            model.materials.iter().map(|_| None).collect();
        if !binding_flags.is_empty() {
            for material_index in textured_materials(&model) {
                let material = &model.materials[material_index];
                let texture = |index: Option<usize>| {
                    index
                        .and_then(|i| textures.get(i))
                        .unwrap_or(&empty_texture)
                };

                let mut writes = Vec::new();
                if binding_flags.contains(DescriptorBindingFlags::IMAGE_BASE_COLOR) {
                    let binding = writes.len() as u32;
                    writes.push(texture(material.base_color_texture).write_descriptor(binding));
                }
                if binding_flags.contains(DescriptorBindingFlags::IMAGE_NORMAL_MAP) {
                    let binding = writes.len() as u32;
                    writes.push(texture(material.normal_texture).write_descriptor(binding));
                }

                material_sets[material_index] = Some(DescriptorSet::new(
                    &context,
                    descriptor_pool.inner,
                    layouts.image(),
                    &writes,
                )?);
            }
        }

        Ok(Self {
            model,
            vertices,
            indices,
            textures,
            empty_texture,
            node_uniforms,
            material_sets,
            buffers_bound: false,
            _descriptor_pool: descriptor_pool,
            context,
        })
    }

    /// Binds the vertex and index buffers. The following [`GpuModel::draw`] skips its own
    /// binding.
    pub fn bind_buffers(&mut self, command_buffer: vk::CommandBuffer) {
        let device = &self.context.device;
        unsafe {
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[self.vertices.inner], &[0]);
            device.cmd_bind_index_buffer(command_buffer, self.indices.inner, 0, vk::IndexType::UINT32);
        }
        self.buffers_bound = true;
    }

    /// Records the whole scene. Material image sets go to set number `bind_image_set` of
    /// `pipeline_layout` when `render_flags` has `BIND_IMAGES`.
    pub fn draw(
        &mut self,
        command_buffer: vk::CommandBuffer,
        render_flags: RenderFlags,
        pipeline_layout: vk::PipelineLayout,
        bind_image_set: u32,
    ) {
        if !self.buffers_bound {
            self.bind_buffers(command_buffer);
        }

        let mut recorder = CommandRecorder {
            device: &self.context.device,
            command_buffer,
            pipeline_layout,
            bind_image_set,
            material_sets: &self.material_sets,
        };
        self.model.draw(&mut recorder, render_flags);
        // the next draw may target another command buffer
        self.buffers_bound = false;
    }

    /// Poses the model and writes the new uniforms to the mapped buffers.
    pub fn update_animation(&mut self, index: usize, time: f32) -> ModelResult<bool> {
        let updated = self.model.update_animation(index, time)?;
        if updated {
            self.write_uniforms()?;
        }
        Ok(updated)
    }

    /// Copies every mesh uniform of `model` to the device, for callers that edit node
    /// transforms directly and then call [`Model::update`].
    pub fn write_uniforms(&self) -> VulkanResult<()> {
        for (node, uniform) in self.model.nodes.iter().zip(&self.node_uniforms) {
            if let (Some(mesh), Some(uniform)) = (&node.mesh, uniform) {
                uniform.buffer.copy_data(&mesh.uniform)?;
            }
        }
        Ok(())
    }

    /// Set with the node's [`MeshUniform`] at binding 0, `None` for nodes without a mesh.
    pub fn node_descriptor_set(&self, node: NodeId) -> Option<vk::DescriptorSet> {
        self.node_uniforms
            .get(node.0)?
            .as_ref()
            .map(|uniform| uniform.descriptor_set.inner)
    }

    pub fn material_descriptor_set(&self, material: usize) -> Option<vk::DescriptorSet> {
        self.material_sets
            .get(material)?
            .as_ref()
            .map(|set| set.inner)
    }
}

fn create_descriptor_pool(context: Arc<Context>, sizes: PoolSizes) -> VulkanResult<DescriptorPool> {
    let pool_sizes: Vec<_> = [
        (vk::DescriptorType::UNIFORM_BUFFER, sizes.uniform_buffers),
        (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, sizes.image_samplers),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(ty, descriptor_count)| vk::DescriptorPoolSize {
        ty,
        descriptor_count,
    })
    .collect();

    let create_info = vk::DescriptorPoolCreateInfo::builder()
        .max_sets(sizes.max_sets.max(1))
        .pool_sizes(&pool_sizes);

    let inner = unsafe { context.device.create_descriptor_pool(&create_info, None) }
        .on("vkCreateDescriptorPool")?;

    Ok(DescriptorPool { inner, context })
}

fn create_node_uniform(
    context: &Arc<Context>,
    descriptor_pool: &DescriptorPool,
    layouts: &ModelDescriptorLayouts,
    uniform: &MeshUniform,
) -> VulkanResult<NodeUniform> {
    let mut buffer: Buffer<MeshUniform> = Buffer::new(
        context.clone(),
        std::mem::size_of::<MeshUniform>() as vk::DeviceSize,
        vk::BufferUsageFlags::UNIFORM_BUFFER,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    buffer.map()?;
    buffer.copy_data(uniform)?;

    let descriptor_set = DescriptorSet::new(
        context,
        descriptor_pool.inner,
        layouts.ubo(),
        &[WriteDescriptorSet::buffer(0, &buffer)],
    )?;

    Ok(NodeUniform {
        buffer,
        descriptor_set,
    })
}

struct CommandRecorder<'a> {
    device: &'a ash::Device,
    command_buffer: vk::CommandBuffer,
    pipeline_layout: vk::PipelineLayout,
    bind_image_set: u32,
    material_sets: &'a [Option<DescriptorSet>],
}

impl DrawRecorder for CommandRecorder<'_> {
    fn bind_material(&mut self, material: usize) {
        // untextured materials have no set and keep whatever is bound
        let Some(Some(set)) = self.material_sets.get(material) else {
            return;
        };
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                self.bind_image_set,
                &[set.inner],
                &[],
            )
        };
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32) {
        unsafe {
            self.device
                .cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, 0, 0)
        };
    }
}
