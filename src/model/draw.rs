use super::flags::RenderFlags;
use super::material::AlphaMode;
use super::{Model, NodeId};

/// Receives the commands of a draw traversal. [`GpuModel`](crate::gpu_model::GpuModel)
/// records them into a Vulkan command buffer.
pub trait DrawRecorder {
    /// Called before the primitives of a mesh node are drawn.
    fn begin_node(&mut self, _node: NodeId) {}

    fn bind_material(&mut self, material: usize);

    fn draw_indexed(&mut self, index_count: u32, first_index: u32);
}

impl RenderFlags {
    /// With no alpha filter set everything is drawn, otherwise any matching filter admits the mode.
    pub fn admits(self, alpha_mode: AlphaMode) -> bool {
        let filters = self & RenderFlags::ALPHA_FILTERS;
        if filters.is_empty() {
            return true;
        }
        match alpha_mode {
            AlphaMode::Opaque => filters.contains(RenderFlags::RENDER_OPAQUE_NODES),
            AlphaMode::Mask => filters.contains(RenderFlags::RENDER_ALPHA_MASKED_NODES),
            AlphaMode::Blend => filters.contains(RenderFlags::RENDER_ALPHA_BLENDED_NODES),
        }
    }
}

impl Model {
    /// Depth-first over the root nodes, each node before its children.
    pub fn draw(&self, recorder: &mut impl DrawRecorder, flags: RenderFlags) {
        for root in &self.root_nodes {
            self.draw_node(*root, recorder, flags);
        }
    }

    fn draw_node(&self, id: NodeId, recorder: &mut impl DrawRecorder, flags: RenderFlags) {
        let node = self.node(id);
        if let Some(mesh) = &node.mesh {
            recorder.begin_node(id);
            for primitive in &mesh.primitives {
                let material = &self.materials[primitive.material];
                if !flags.admits(material.alpha_mode) {
                    continue;
                }
                if flags.contains(RenderFlags::BIND_IMAGES) {
                    recorder.bind_material(primitive.material);
                }
                recorder.draw_indexed(primitive.index_count, primitive.first_index);
            }
        }
        for child in &node.children {
            self.draw_node(*child, recorder, flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::test_gltf::{triangle_mesh, GlbBuilder};
    use crate::model::FileLoadingFlags;

    #[derive(Debug, PartialEq)]
    enum Command {
        Node(usize),
        Material(usize),
        Draw(u32, u32),
    }

    #[derive(Default)]
    struct Recording(Vec<Command>);

    impl DrawRecorder for Recording {
        fn begin_node(&mut self, node: NodeId) {
            self.0.push(Command::Node(node.0));
        }

        fn bind_material(&mut self, material: usize) {
            self.0.push(Command::Material(material));
        }

        fn draw_indexed(&mut self, index_count: u32, first_index: u32) {
            self.0.push(Command::Draw(index_count, first_index));
        }
    }

    /// Opaque parent with a blended child and a masked sibling root.
    fn model() -> Model {
        let mut glb = GlbBuilder::new();
        let opaque = triangle_mesh(&mut glb, Some(0));
        let blended = triangle_mesh(&mut glb, Some(1));
        let masked = triangle_mesh(&mut glb, Some(2));
        let json = json!({
            "asset": {"version": "2.0"},
            "scenes": [{"nodes": [0, 2]}],
            "nodes": [
                {"mesh": 0, "children": [1]},
                {"mesh": 1},
                {"mesh": 2}
            ],
            "meshes": [opaque, blended, masked],
            "materials": [
                {"name": "opaque"},
                {"name": "glass", "alphaMode": "BLEND"},
                {"name": "leaves", "alphaMode": "MASK", "alphaCutoff": 0.25}
            ]
        });
        glb.load(json, FileLoadingFlags::empty())
    }

    fn record(model: &Model, flags: RenderFlags) -> Vec<Command> {
        let mut recording = Recording::default();
        model.draw(&mut recording, flags);
        recording.0
    }

    #[test]
    fn parents_draw_before_children() {
        let model = model();
        // the child is loaded first, so its geometry starts the index buffer
        assert_eq!(
            record(&model, RenderFlags::empty()),
            vec![
                Command::Node(1),
                Command::Draw(3, 3),
                Command::Node(0),
                Command::Draw(3, 0),
                Command::Node(2),
                Command::Draw(3, 6),
            ]
        );
    }

    #[test]
    fn bind_images_binds_each_material() {
        let model = model();
        let commands = record(
            &model,
            RenderFlags::BIND_IMAGES | RenderFlags::RENDER_ALPHA_BLENDED_NODES,
        );
        assert_eq!(
            commands,
            vec![
                Command::Node(1),
                Command::Node(0),
                Command::Material(1),
                Command::Draw(3, 0),
                Command::Node(2),
            ]
        );
    }

    #[test]
    fn alpha_filters_combine() {
        let model = model();
        let draws = |flags| {
            record(&model, flags)
                .into_iter()
                .filter(|c| matches!(c, Command::Draw(..)))
                .count()
        };
        assert_eq!(draws(RenderFlags::RENDER_OPAQUE_NODES), 1);
        assert_eq!(draws(RenderFlags::RENDER_ALPHA_MASKED_NODES), 1);
        assert_eq!(
            draws(RenderFlags::RENDER_OPAQUE_NODES | RenderFlags::RENDER_ALPHA_MASKED_NODES),
            2
        );
        assert_eq!(draws(RenderFlags::ALPHA_FILTERS), 3);
    }

    #[test]
    fn admits_everything_without_filters() {
        assert!(RenderFlags::BIND_IMAGES.admits(AlphaMode::Blend));
        assert!(!RenderFlags::RENDER_OPAQUE_NODES.admits(AlphaMode::Mask));
    }
}
