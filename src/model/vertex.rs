use ash::vk;
use ultraviolet::{Vec2, Vec3, Vec4};

use crate::offset_of;

#[derive(Clone, Debug, Copy, PartialEq)]
#[repr(C)]
pub struct Vertex {
    pub pos: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec4,
    pub joint0: Vec4,
    pub weight0: Vec4,
    pub tangent: Vec4,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            pos: Vec3::zero(),
            normal: Vec3::zero(),
            uv: Vec2::zero(),
            color: Vec4::one(),
            joint0: Vec4::zero(),
            weight0: Vec4::zero(),
            tangent: Vec4::zero(),
        }
    }
}

/// Vertex attributes a pipeline can pick from [`Vertex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexComponent {
    Position,
    Normal,
    Uv,
    Color,
    Tangent,
    Joint0,
    Weight0,
}

impl VertexComponent {
    fn format_and_offset(self) -> (vk::Format, u32) {
        match self {
            VertexComponent::Position => {
                (vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, pos))
            }
            VertexComponent::Normal => {
                (vk::Format::R32G32B32_SFLOAT, offset_of!(Vertex, normal))
            }
            VertexComponent::Uv => (vk::Format::R32G32_SFLOAT, offset_of!(Vertex, uv)),
            VertexComponent::Color => (
                vk::Format::R32G32B32A32_SFLOAT,
                offset_of!(Vertex, color),
            ),
            VertexComponent::Tangent => (
                vk::Format::R32G32B32A32_SFLOAT,
                offset_of!(Vertex, tangent),
            ),
            VertexComponent::Joint0 => (
                vk::Format::R32G32B32A32_SFLOAT,
                offset_of!(Vertex, joint0),
            ),
            VertexComponent::Weight0 => (
                vk::Format::R32G32B32A32_SFLOAT,
                offset_of!(Vertex, weight0),
            ),
        }
    }
}

impl Vertex {
    pub fn input_binding_description(binding: u32) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn input_attribute_description(
        binding: u32,
        location: u32,
        component: VertexComponent,
    ) -> vk::VertexInputAttributeDescription {
        let (format, offset) = component.format_and_offset();
        vk::VertexInputAttributeDescription {
            location,
            binding,
            format,
            offset,
        }
    }

    /// Locations follow the order of `components`, starting at 0.
    pub fn input_attribute_descriptions(
        binding: u32,
        components: &[VertexComponent],
    ) -> Vec<vk::VertexInputAttributeDescription> {
        components
            .iter()
            .enumerate()
            .map(|(location, component)| {
                Self::input_attribute_description(binding, location as u32, *component)
            })
            .collect()
    }
}

/// Owns the description arrays a `vk::PipelineVertexInputStateCreateInfo` points into.
pub struct VertexInputState {
    pub binding_descriptions: [vk::VertexInputBindingDescription; 1],
    pub attribute_descriptions: Vec<vk::VertexInputAttributeDescription>,
}

impl VertexInputState {
    pub fn new(components: &[VertexComponent]) -> Self {
        Self {
            binding_descriptions: [Vertex::input_binding_description(0)],
            attribute_descriptions: Vertex::input_attribute_descriptions(0, components),
        }
    }

    /// The returned struct borrows `self`, keep it alive until the pipeline is created.
    pub fn create_info(&self) -> vk::PipelineVertexInputStateCreateInfo {
        vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&self.binding_descriptions)
            .vertex_attribute_descriptions(&self.attribute_descriptions)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), (3 + 3 + 2 + 4 + 4 + 4 + 4) * 4);
        assert_eq!(Vertex::input_binding_description(0).stride, 96);
    }

    #[test]
    fn locations_follow_component_order() {
        let descriptions = Vertex::input_attribute_descriptions(
            0,
            &[
                VertexComponent::Position,
                VertexComponent::Normal,
                VertexComponent::Uv,
                VertexComponent::Color,
            ],
        );

        let summary: Vec<_> = descriptions
            .iter()
            .map(|d| (d.location, d.format, d.offset))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, vk::Format::R32G32B32_SFLOAT, 0),
                (1, vk::Format::R32G32B32_SFLOAT, 12),
                (2, vk::Format::R32G32_SFLOAT, 24),
                (3, vk::Format::R32G32B32A32_SFLOAT, 32),
            ]
        );
    }

    #[test]
    fn skinning_attributes_point_at_joint_data() {
        let joint = Vertex::input_attribute_description(1, 5, VertexComponent::Joint0);
        assert_eq!(joint.binding, 1);
        assert_eq!(joint.location, 5);
        assert_eq!(joint.offset, 48);

        let tangent = Vertex::input_attribute_description(0, 6, VertexComponent::Tangent);
        assert_eq!(tangent.offset, 80);
    }

    #[test]
    fn vertex_input_state_points_into_owned_arrays() {
        let state = VertexInputState::new(&[VertexComponent::Position, VertexComponent::Uv]);
        let create_info = state.create_info();
        assert_eq!(create_info.vertex_binding_description_count, 1);
        assert_eq!(create_info.vertex_attribute_description_count, 2);
        assert_eq!(
            create_info.p_vertex_attribute_descriptions,
            state.attribute_descriptions.as_ptr()
        );
    }
}
