use std::path::Path;

use gltf::accessor::{DataType, Dimensions as AccessorDimensions};
use gltf::animation::Property;
use gltf::Gltf;
use ultraviolet::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::error::{ModelError, ModelResult};

use super::animation::{Animation, AnimationChannel, AnimationSampler, ChannelPath};
use super::mesh::{Dimensions, Mesh, MeshUniform, Primitive};
use super::transform::{mat4_from_cols, Transform};
use super::{
    FileLoadingFlags, Material, Model, Node, NodeId, Skin, TextureImage, Vertex,
};

const SPECULAR_GLOSSINESS: &str = "KHR_materials_pbrSpecularGlossiness";

impl Model {
    /// Loads a `.gltf` or `.glb` file. External buffers and images resolve relative to it.
    pub fn load_from_file(
        path: impl AsRef<Path>,
        flags: FileLoadingFlags,
        scale: f32,
    ) -> ModelResult<Model> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let model = Model::load_from_slice(&bytes, path.parent(), flags, scale)?;
        log::info!(
            "Loaded {:?}: {} nodes, {} vertices, {} indices, {} materials, {} animations",
            path,
            model.nodes.len(),
            model.vertices.len(),
            model.indices.len(),
            model.materials.len(),
            model.animations.len()
        );
        Ok(model)
    }

    pub fn load_from_slice(
        bytes: &[u8],
        base_dir: Option<&Path>,
        flags: FileLoadingFlags,
        scale: f32,
    ) -> ModelResult<Model> {
        let Gltf { document, blob } = Gltf::from_slice(bytes)?;
        let buffers = gltf::import_buffers(&document, base_dir, blob)?;

        let mut loader = ModelLoader {
            buffers: &buffers,
            model: Model {
                nodes: Vec::new(),
                root_nodes: Vec::new(),
                skins: Vec::new(),
                images: Vec::new(),
                materials: Vec::new(),
                animations: Vec::new(),
                vertices: Vec::new(),
                indices: Vec::new(),
                dimensions: Dimensions::empty(),
                metallic_roughness_workflow: true,
                extensions: document.extensions_used().map(str::to_owned).collect(),
                file_loading_flags: flags,
                scale,
            },
        };

        if !flags.contains(FileLoadingFlags::DONT_LOAD_IMAGES) {
            let images = gltf::import_images(&document, base_dir, &buffers)?;
            loader.load_images(&document, images)?;
        }
        loader.load_materials(&document);

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or(ModelError::NoScene)?;
        for node in scene.nodes() {
            let id = loader.load_node(&node)?;
            loader.model.root_nodes.push(id);
        }

        loader.load_animations(&document);
        loader.load_skins(&document);

        let mut model = loader.model;
        for node in &mut model.nodes {
            if node.skin.is_some_and(|skin| skin >= model.skins.len()) {
                node.skin = None;
            }
        }

        if model
            .extensions
            .iter()
            .any(|extension| extension == SPECULAR_GLOSSINESS)
        {
            model.metallic_roughness_workflow = false;
        }

        model.update();
        model.post_process_vertices();
        model.dimensions = model.scene_dimensions();

        Ok(model)
    }

    /// Applies the vertex flags in order: pre-transform, flip Y, pre-multiply colors.
    /// Primitive bounds are refreshed from the final positions.
    fn post_process_vertices(&mut self) {
        let flags = self.file_loading_flags;
        let pre_transform = flags.contains(FileLoadingFlags::PRE_TRANSFORM_VERTICES);
        let flip_y = flags.contains(FileLoadingFlags::FLIP_Y);
        let pre_multiply = flags.contains(FileLoadingFlags::PRE_MULTIPLY_VERTEX_COLORS);

        for i in 0..self.nodes.len() {
            let Some(mesh) = &self.nodes[i].mesh else {
                continue;
            };
            let world = self.world_matrix(NodeId(i));
            let normal_matrix = upper_3x3(&world);

            let mut bounds = Vec::with_capacity(mesh.primitives.len());
            for primitive in &mesh.primitives {
                let base_color = self.materials[primitive.material].base_color_factor;
                let range = primitive.first_vertex as usize
                    ..(primitive.first_vertex + primitive.vertex_count) as usize;

                for vertex in &mut self.vertices[range.clone()] {
                    if pre_transform {
                        vertex.pos = world.transform_point3(vertex.pos);
                        vertex.normal = normalized_or_zero(normal_matrix * vertex.normal);
                    }
                    if flip_y {
                        vertex.pos.y *= -1.0;
                        vertex.normal.y *= -1.0;
                    }
                    if pre_multiply {
                        vertex.color = vertex.color * base_color;
                    }
                }

                bounds.push(bounds_of(&self.vertices[range]));
            }

            if let Some(mesh) = self.nodes[i].mesh.as_mut() {
                for (primitive, dimensions) in mesh.primitives.iter_mut().zip(bounds) {
                    primitive.dimensions = dimensions;
                }
            }
        }
    }
}

struct ModelLoader<'a> {
    buffers: &'a [gltf::buffer::Data],
    model: Model,
}

impl<'a> ModelLoader<'a> {
    fn buffer_data(&self) -> impl Clone + Fn(gltf::Buffer<'_>) -> Option<&'a [u8]> {
        let buffers = self.buffers;
        move |buffer: gltf::Buffer<'_>| buffers.get(buffer.index()).map(|data| &data.0[..])
    }

    fn load_images(
        &mut self,
        document: &gltf::Document,
        images: Vec<gltf::image::Data>,
    ) -> ModelResult<()> {
        for (image, data) in document.images().zip(images) {
            let texture_image = TextureImage::from_gltf(image.index(), image.name(), data)?;
            log::debug!(
                "Image {} {:?}: {}x{}",
                image.index(),
                texture_image.name,
                texture_image.width,
                texture_image.height
            );
            self.model.images.push(texture_image);
        }
        Ok(())
    }

    fn texture_index(&self, texture: gltf::Texture<'_>) -> Option<usize> {
        let source = texture.source().index();
        (source < self.model.images.len()).then_some(source)
    }

    fn load_materials(&mut self, document: &gltf::Document) {
        for material in document.materials() {
            let pbr = material.pbr_metallic_roughness();
            let loaded = Material {
                name: material
                    .name()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("{}", material.index().unwrap_or_default())),
                base_color_factor: Vec4::from(pbr.base_color_factor()),
                metallic_factor: pbr.metallic_factor(),
                roughness_factor: pbr.roughness_factor(),
                emissive_factor: Vec3::from(material.emissive_factor())
                    * material.emissive_strength().unwrap_or(1.0),
                alpha_mode: material.alpha_mode().into(),
                alpha_cutoff: material.alpha_cutoff().unwrap_or(1.0),
                double_sided: material.double_sided(),
                base_color_texture: pbr
                    .base_color_texture()
                    .and_then(|info| self.texture_index(info.texture())),
                metallic_roughness_texture: pbr
                    .metallic_roughness_texture()
                    .and_then(|info| self.texture_index(info.texture())),
                normal_texture: material
                    .normal_texture()
                    .and_then(|info| self.texture_index(info.texture())),
                occlusion_texture: material
                    .occlusion_texture()
                    .and_then(|info| self.texture_index(info.texture())),
                emissive_texture: material
                    .emissive_texture()
                    .and_then(|info| self.texture_index(info.texture())),
            };
            self.model.materials.push(loaded);
        }

        self.model.materials.push(Material::default());
    }

    /// Children are loaded first, so their geometry precedes the node's own in the shared
    /// buffers and their ids are smaller.
    fn load_node(&mut self, node: &gltf::Node<'_>) -> ModelResult<NodeId> {
        let children = node
            .children()
            .map(|child| self.load_node(&child))
            .collect::<ModelResult<Vec<_>>>()?;

        let (transform, matrix) = match node.transform() {
            gltf::scene::Transform::Matrix { matrix } => {
                (Transform::default(), mat4_from_cols(matrix))
            }
            gltf::scene::Transform::Decomposed {
                translation,
                rotation,
                scale,
            } => (
                Transform::from_arrays(translation, rotation, scale),
                Mat4::identity(),
            ),
        };

        let mesh = match node.mesh() {
            Some(mesh) => Some(self.load_mesh(&mesh)?),
            None => None,
        };

        let id = NodeId(self.model.nodes.len());
        for child in &children {
            self.model.nodes[child.0].parent = Some(id);
        }

        self.model.nodes.push(Node {
            index: node.index(),
            name: node.name().map(str::to_owned).unwrap_or_default(),
            parent: None,
            children,
            transform,
            matrix,
            mesh,
            skin: node.skin().map(|skin| skin.index()),
        });

        Ok(id)
    }

    fn load_mesh(&mut self, mesh: &gltf::Mesh<'_>) -> ModelResult<Mesh> {
        let mut primitives = Vec::new();

        for primitive in mesh.primitives() {
            let Some(indices_accessor) = primitive.indices() else {
                log::warn!(
                    "Skipping primitive {} of mesh {}: only indexed geometry is supported",
                    primitive.index(),
                    mesh.index()
                );
                continue;
            };

            let reader = primitive.reader(self.buffer_data());

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or(ModelError::MissingPositions {
                    mesh: mesh.index(),
                    primitive: primitive.index(),
                })?
                .collect();
            let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
            let uvs: Option<Vec<[f32; 2]>> =
                reader.read_tex_coords(0).map(|uv| uv.into_f32().collect());
            let colors: Option<Vec<[f32; 4]>> =
                reader.read_colors(0).map(|c| c.into_rgba_f32().collect());
            let tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(|t| t.collect());
            let skinning = reader
                .read_joints(0)
                .zip(reader.read_weights(0))
                .map(|(joints, weights)| {
                    (
                        joints.into_u16().collect::<Vec<_>>(),
                        weights.into_f32().collect::<Vec<_>>(),
                    )
                });

            let first_vertex = self.model.vertices.len() as u32;
            let first_index = self.model.indices.len() as u32;
            let vertex_count = positions.len() as u32;

            for (i, position) in positions.iter().enumerate() {
                let mut vertex = Vertex {
                    pos: Vec3::from(*position),
                    ..Default::default()
                };
                if let Some(normal) = normals.as_ref().and_then(|n| n.get(i)) {
                    vertex.normal = normalized_or_zero(Vec3::from(*normal));
                }
                if let Some(uv) = uvs.as_ref().and_then(|uv| uv.get(i)) {
                    vertex.uv = Vec2::from(*uv);
                }
                if let Some(color) = colors.as_ref().and_then(|c| c.get(i)) {
                    vertex.color = Vec4::from(*color);
                }
                if let Some(tangent) = tangents.as_ref().and_then(|t| t.get(i)) {
                    vertex.tangent = Vec4::from(*tangent);
                }
                if let Some((joints, weights)) = &skinning {
                    if let (Some(joint), Some(weight)) = (joints.get(i), weights.get(i)) {
                        vertex.joint0 = Vec4::from(joint.map(f32::from));
                        vertex.weight0 = Vec4::from(*weight);
                    }
                }
                self.model.vertices.push(vertex);
            }

            let indices = reader
                .read_indices()
                .ok_or(ModelError::UnsupportedAccessor {
                    accessor: indices_accessor.index(),
                    reason: "index data is not readable",
                })?
                .into_u32();
            for index in indices {
                if index >= vertex_count {
                    return Err(ModelError::UnsupportedAccessor {
                        accessor: indices_accessor.index(),
                        reason: "index exceeds the vertex count",
                    });
                }
                self.model.indices.push(index + first_vertex);
            }
            let index_count = self.model.indices.len() as u32 - first_index;

            let default_material = self.model.materials.len() - 1;
            let material = primitive
                .material()
                .index()
                .filter(|index| *index < default_material)
                .unwrap_or(default_material);

            let vertices = &self.model.vertices[first_vertex as usize..];
            primitives.push(Primitive {
                first_index,
                index_count,
                first_vertex,
                vertex_count,
                material,
                dimensions: bounds_of(vertices),
            });
        }

        Ok(Mesh {
            name: mesh.name().map(str::to_owned).unwrap_or_default(),
            primitives,
            uniform: MeshUniform::default(),
        })
    }

    fn load_animations(&mut self, document: &gltf::Document) {
        for animation in document.animations() {
            let get_buffer_data = self.buffer_data();

            let samplers: Vec<AnimationSampler> = animation
                .samplers()
                .map(|sampler| AnimationSampler {
                    interpolation: sampler.interpolation().into(),
                    inputs: read_inputs(sampler.input(), get_buffer_data.clone()),
                    outputs: read_outputs(sampler.output(), get_buffer_data.clone()),
                })
                .collect();

            let (start, end) = samplers
                .iter()
                .flat_map(|sampler| sampler.inputs.iter().copied())
                .fold(None, |range: Option<(f32, f32)>, input| match range {
                    Some((start, end)) => Some((start.min(input), end.max(input))),
                    None => Some((input, input)),
                })
                .unwrap_or((0.0, 0.0));

            let mut channels = Vec::new();
            for channel in animation.channels() {
                let target = channel.target();
                let path = match target.property() {
                    Property::Translation => ChannelPath::Translation,
                    Property::Rotation => ChannelPath::Rotation,
                    Property::Scale => ChannelPath::Scale,
                    Property::MorphTargetWeights => {
                        log::warn!(
                            "Animation {}: morph target weights are not supported, skipping channel",
                            animation.index()
                        );
                        continue;
                    }
                };

                let Some(node) = self.model.node_from_index(target.node().index()) else {
                    log::warn!(
                        "Animation {}: channel targets node {} which is not in the scene",
                        animation.index(),
                        target.node().index()
                    );
                    continue;
                };

                channels.push(AnimationChannel {
                    path,
                    node,
                    sampler: channel.sampler().index(),
                });
            }

            let name = animation
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| animation.index().to_string());
            log::debug!(
                "Animation {:?}: {} channels, {}s to {}s",
                name,
                channels.len(),
                start,
                end
            );

            self.model.animations.push(Animation {
                name,
                samplers,
                channels,
                start,
                end,
            });
        }
    }

    fn load_skins(&mut self, document: &gltf::Document) {
        for skin in document.skins() {
            let inverse_bind_matrices = skin
                .reader(self.buffer_data())
                .read_inverse_bind_matrices()
                .map(|matrices| matrices.map(mat4_from_cols).collect())
                .unwrap_or_default();

            let joints = skin
                .joints()
                .filter_map(|joint| self.model.node_from_index(joint.index()))
                .collect();

            self.model.skins.push(Skin {
                name: skin.name().map(str::to_owned).unwrap_or_default(),
                skeleton_root: skin
                    .skeleton()
                    .and_then(|root| self.model.node_from_index(root.index())),
                inverse_bind_matrices,
                joints,
            });
        }
    }
}

fn read_inputs<'a, 's, F>(accessor: gltf::Accessor<'a>, get_buffer_data: F) -> Vec<f32>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    if accessor.data_type() != DataType::F32 || accessor.dimensions() != AccessorDimensions::Scalar
    {
        log::warn!(
            "Accessor {}: animation inputs must be float scalars",
            accessor.index()
        );
        return Vec::new();
    }
    gltf::accessor::Iter::<f32>::new(accessor, get_buffer_data)
        .map(|iter| iter.collect())
        .unwrap_or_default()
}

fn read_outputs<'a, 's, F>(accessor: gltf::Accessor<'a>, get_buffer_data: F) -> Vec<Vec4>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    if accessor.data_type() != DataType::F32 {
        log::warn!(
            "Accessor {}: only float animation outputs are supported",
            accessor.index()
        );
        return Vec::new();
    }

    let index = accessor.index();
    match accessor.dimensions() {
        AccessorDimensions::Vec3 => gltf::accessor::Iter::<[f32; 3]>::new(accessor, get_buffer_data)
            .map(|iter| iter.map(|[x, y, z]| Vec4::new(x, y, z, 0.0)).collect())
            .unwrap_or_default(),
        AccessorDimensions::Vec4 => gltf::accessor::Iter::<[f32; 4]>::new(accessor, get_buffer_data)
            .map(|iter| iter.map(Vec4::from).collect())
            .unwrap_or_default(),
        other => {
            log::warn!("Accessor {}: unsupported animation output type {:?}", index, other);
            Vec::new()
        }
    }
}

fn normalized_or_zero(v: Vec3) -> Vec3 {
    if v.mag_sq() > 0.0 {
        v.normalized()
    } else {
        Vec3::zero()
    }
}

fn upper_3x3(matrix: &Mat4) -> Mat3 {
    let column = |c: usize| {
        let col = matrix.cols[c];
        Vec3::new(col.x, col.y, col.z)
    };
    Mat3::new(column(0), column(1), column(2))
}

fn bounds_of(vertices: &[Vertex]) -> Dimensions {
    let (min, max) = vertices.iter().fold(
        (Vec3::broadcast(f32::MAX), Vec3::broadcast(-f32::MAX)),
        |(min, max), vertex| (min.min_by_component(vertex.pos), max.max_by_component(vertex.pos)),
    );
    Dimensions::new(min, max)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use ultraviolet::{Vec3, Vec4};

    use super::*;
    use crate::model::test_gltf::{triangle_mesh, GlbBuilder};
    use crate::model::transform::assert_vec3_near;
    use crate::model::{AlphaMode, Interpolation};

    fn single_node(glb: GlbBuilder, mesh: serde_json::Value, flags: FileLoadingFlags) -> Model {
        glb.load(
            json!({
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0]}],
                "nodes": [{"mesh": 0, "translation": [0.0, 0.0, 5.0]}],
                "meshes": [mesh]
            }),
            flags,
        )
    }

    #[test]
    fn missing_attributes_get_defaults() {
        let mut glb = GlbBuilder::new();
        let mesh = triangle_mesh(&mut glb, None);
        let model = single_node(glb, mesh, FileLoadingFlags::empty());

        assert_eq!(model.vertices.len(), 3);
        let vertex = model.vertices[1];
        assert_eq!(vertex.pos, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(vertex.normal, Vec3::zero());
        assert_eq!(vertex.color, Vec4::one());
        assert_eq!(vertex.tangent, Vec4::zero());
        assert_eq!(vertex.joint0, Vec4::zero());
        assert_eq!(vertex.weight0, Vec4::zero());
    }

    #[test]
    fn attributes_are_read_and_normalized() {
        let mut glb = GlbBuilder::new();
        let positions = glb.push_vec3s(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let normals = glb.push_vec3s(&[[0.0, 0.0, 2.0]; 3]);
        let uvs = glb.push_vec2s(&[[0.0, 0.0], [1.0, 0.0], [0.5, 1.0]]);
        let colors = glb.push_vec3s(&[[1.0, 0.0, 0.0]; 3]);
        let joints = glb.push_joints(&[[1, 2, 0, 0]; 3]);
        let weights = glb.push_vec4s(&[[0.5, 0.5, 0.0, 0.0]; 3]);
        let indices = glb.push_indices_u32(&[0, 1, 2]);
        let mesh = json!({"primitives": [{
            "attributes": {
                "POSITION": positions,
                "NORMAL": normals,
                "TEXCOORD_0": uvs,
                "COLOR_0": colors,
                "JOINTS_0": joints,
                "WEIGHTS_0": weights
            },
            "indices": indices
        }]});
        let model = single_node(glb, mesh, FileLoadingFlags::empty());

        let vertex = model.vertices[2];
        assert_vec3_near(vertex.normal, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(vertex.uv, Vec2::new(0.5, 1.0));
        assert_eq!(vertex.color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(vertex.joint0, Vec4::new(1.0, 2.0, 0.0, 0.0));
        assert_eq!(vertex.weight0, Vec4::new(0.5, 0.5, 0.0, 0.0));
    }

    #[test]
    fn indices_are_rebased_per_primitive() {
        let mut glb = GlbBuilder::new();
        let first = glb.push_vec3s(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let first_indices = glb.push_indices_u8(&[2, 1, 0]);
        let second = glb.push_vec3s(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0; 3]]);
        let second_indices = glb.push_indices_u32(&[0, 1, 2, 2, 1, 3]);
        let unindexed = glb.push_vec3s(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let mesh = json!({"primitives": [
            {"attributes": {"POSITION": first}, "indices": first_indices},
            {"attributes": {"POSITION": unindexed}},
            {"attributes": {"POSITION": second}, "indices": second_indices}
        ]});
        let model = single_node(glb, mesh, FileLoadingFlags::empty());

        assert_eq!(model.indices, vec![2, 1, 0, 3, 4, 5, 5, 4, 6]);
        let primitives = &model.nodes[0].mesh.as_ref().unwrap().primitives;
        assert_eq!(primitives.len(), 2);
        assert_eq!(
            (primitives[1].first_index, primitives[1].index_count),
            (3, 6)
        );
        assert_eq!(
            (primitives[1].first_vertex, primitives[1].vertex_count),
            (3, 4)
        );
        assert_eq!(model.vertices.len(), 7);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut glb = GlbBuilder::new();
        let positions = glb.push_vec3s(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let indices = glb.push_indices_u16(&[0, 1, 3]);
        let mesh = json!({"primitives": [{"attributes": {"POSITION": positions}, "indices": indices}]});
        let json = json!({
            "asset": {"version": "2.0"},
            "scenes": [{"nodes": [0]}],
            "nodes": [{"mesh": 0}],
            "meshes": [mesh]
        });
        let glb = glb.build(json);
        assert!(matches!(
            Model::load_from_slice(&glb, None, FileLoadingFlags::empty(), 1.0),
            Err(ModelError::UnsupportedAccessor { .. })
        ));
    }

    #[test]
    fn materials_end_with_the_default() {
        let mut glb = GlbBuilder::new();
        let with_material = triangle_mesh(&mut glb, Some(0));
        let without_material = triangle_mesh(&mut glb, None);
        let model = glb.load(
            json!({
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0, 1]}],
                "nodes": [{"mesh": 0}, {"mesh": 1}],
                "meshes": [with_material, without_material],
                "materials": [{
                    "name": "leaves",
                    "alphaMode": "MASK",
                    "alphaCutoff": 0.25,
                    "doubleSided": true,
                    "emissiveFactor": [1.0, 0.5, 0.0],
                    "pbrMetallicRoughness": {
                        "baseColorFactor": [0.5, 1.0, 1.0, 1.0],
                        "metallicFactor": 0.0,
                        "roughnessFactor": 0.75
                    }
                }]
            }),
            FileLoadingFlags::empty(),
        );

        assert_eq!(model.materials.len(), 2);
        assert_eq!(model.default_material(), 1);
        let leaves = &model.materials[0];
        assert_eq!(leaves.name, "leaves");
        assert_eq!(leaves.alpha_mode, AlphaMode::Mask);
        assert_eq!(leaves.alpha_cutoff, 0.25);
        assert!(leaves.double_sided);
        assert_eq!(leaves.base_color_factor, Vec4::new(0.5, 1.0, 1.0, 1.0));
        assert_eq!(leaves.metallic_factor, 0.0);
        assert_eq!(leaves.roughness_factor, 0.75);
        assert_eq!(leaves.emissive_factor, Vec3::new(1.0, 0.5, 0.0));

        let default = &model.materials[1];
        assert_eq!(default.alpha_cutoff, 1.0);
        assert_eq!(default.metallic_factor, 1.0);

        let materials: Vec<_> = model
            .linear_nodes()
            .map(|(_, node)| node.mesh.as_ref().unwrap().primitives[0].material)
            .collect();
        assert_eq!(materials, vec![0, 1]);
    }

    fn textured(flags: FileLoadingFlags) -> Model {
        let mut glb = GlbBuilder::new();
        let mesh = triangle_mesh(&mut glb, Some(0));
        let image = glb.push_png(2, 1, &[255, 0, 0, 0, 255, 0]);
        glb.load(
            json!({
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0]}],
                "nodes": [{"mesh": 0}],
                "meshes": [mesh],
                "images": [image],
                "textures": [{"source": 0}],
                "materials": [{
                    "pbrMetallicRoughness": {"baseColorTexture": {"index": 0}},
                    "normalTexture": {"index": 0}
                }]
            }),
            flags,
        )
    }

    #[test]
    fn images_are_decoded_to_rgba() {
        let model = textured(FileLoadingFlags::empty());
        assert_eq!(model.images.len(), 1);
        let image = &model.images[0];
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.pixels, vec![255, 0, 0, 255, 0, 255, 0, 255]);
        assert_eq!(model.materials[0].base_color_texture, Some(0));
        assert_eq!(model.materials[0].normal_texture, Some(0));
        assert_eq!(model.materials[0].occlusion_texture, None);
    }

    #[test]
    fn skipping_images_drops_texture_references() {
        let model = textured(FileLoadingFlags::DONT_LOAD_IMAGES);
        assert!(model.images.is_empty());
        assert_eq!(model.materials[0].base_color_texture, None);
    }

    #[test]
    fn flip_y_and_pre_transform_rewrite_vertices() {
        let mut glb = GlbBuilder::new();
        let positions = glb.push_vec3s(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let normals = glb.push_vec3s(&[[0.0, 1.0, 0.0]; 3]);
        let indices = glb.push_indices_u16(&[0, 1, 2]);
        let mesh = json!({"primitives": [{
            "attributes": {"POSITION": positions, "NORMAL": normals},
            "indices": indices
        }]});
        let model = single_node(
            glb,
            mesh,
            FileLoadingFlags::PRE_TRANSFORM_VERTICES | FileLoadingFlags::FLIP_Y,
        );

        assert_vec3_near(model.vertices[2].pos, Vec3::new(0.0, -1.0, 5.0));
        assert_vec3_near(model.vertices[2].normal, Vec3::new(0.0, -1.0, 0.0));
        // already in world space, the node matrix is not applied again
        assert_vec3_near(model.dimensions.min, Vec3::new(0.0, -1.0, 5.0));
        assert_vec3_near(model.dimensions.max, Vec3::new(1.0, 0.0, 5.0));
    }

    #[test]
    fn pre_multiplied_colors_take_the_base_color() {
        let mut glb = GlbBuilder::new();
        let mesh = triangle_mesh(&mut glb, Some(0));
        let model = glb.load(
            json!({
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0]}],
                "nodes": [{"mesh": 0}],
                "meshes": [mesh],
                "materials": [{"pbrMetallicRoughness": {"baseColorFactor": [0.5, 0.25, 1.0, 1.0]}}]
            }),
            FileLoadingFlags::PRE_MULTIPLY_VERTEX_COLORS,
        );
        assert_eq!(model.vertices[0].color, Vec4::new(0.5, 0.25, 1.0, 1.0));
    }

    #[test]
    fn matrix_nodes_keep_their_matrix() {
        let mut glb = GlbBuilder::new();
        let mesh = triangle_mesh(&mut glb, None);
        let model = glb.load(
            json!({
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0]}],
                "nodes": [{
                    "mesh": 0,
                    "matrix": [2.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 3.0, 0.0, 0.0, 1.0]
                }],
                "meshes": [mesh]
            }),
            FileLoadingFlags::empty(),
        );
        let node = &model.nodes[0];
        assert_eq!(node.transform, Transform::default());
        assert_vec3_near(
            node.local_matrix().transform_point3(Vec3::one()),
            Vec3::new(5.0, 2.0, 2.0),
        );
        assert_vec3_near(model.dimensions.max, Vec3::new(5.0, 2.0, 0.0));
    }

    #[test]
    fn animations_skip_unsupported_channels() {
        let mut glb = GlbBuilder::new();
        let mesh = triangle_mesh(&mut glb, None);
        let times = glb.push_f32s(&[0.5, 2.0]);
        let translations = glb.push_vec3s(&[[0.0; 3], [1.0; 3]]);
        let rotations = glb.push_vec4s(&[[0.0, 0.0, 0.0, 1.0]; 2]);
        let weights = glb.push_f32s(&[0.0, 1.0]);
        let model = glb.load(
            json!({
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0]}],
                "nodes": [{"mesh": 0}, {"name": "outside"}],
                "meshes": [mesh],
                "animations": [
                    {
                        "name": "walk",
                        "samplers": [
                            {"input": times, "output": translations},
                            {"input": times, "output": rotations, "interpolation": "STEP"},
                            {"input": times, "output": weights}
                        ],
                        "channels": [
                            {"sampler": 0, "target": {"node": 0, "path": "translation"}},
                            {"sampler": 1, "target": {"node": 0, "path": "rotation"}},
                            {"sampler": 2, "target": {"node": 0, "path": "weights"}},
                            {"sampler": 0, "target": {"node": 1, "path": "translation"}}
                        ]
                    }
                ]
            }),
            FileLoadingFlags::empty(),
        );

        let animation = &model.animations[0];
        assert_eq!(animation.name, "walk");
        assert_eq!((animation.start, animation.end), (0.5, 2.0));
        assert_eq!(animation.samplers.len(), 3);
        assert_eq!(animation.samplers[1].interpolation, Interpolation::Step);
        assert!(animation.samplers[2].outputs.is_empty());
        let paths: Vec<_> = animation.channels.iter().map(|c| c.path).collect();
        assert_eq!(paths, vec![ChannelPath::Translation, ChannelPath::Rotation]);
        assert_eq!(animation.samplers[0].outputs[1], Vec4::new(1.0, 1.0, 1.0, 0.0));
    }

    #[test]
    fn skins_resolve_joints_and_skeleton() {
        let mut glb = GlbBuilder::new();
        let mesh = triangle_mesh(&mut glb, None);
        let model = glb.load(
            json!({
                "asset": {"version": "2.0"},
                "scenes": [{"nodes": [0, 1]}],
                "nodes": [{"mesh": 0, "skin": 0}, {"children": [2]}, {}],
                "meshes": [mesh],
                "skins": [{"joints": [1, 2], "skeleton": 1}]
            }),
            FileLoadingFlags::empty(),
        );

        let skin = &model.skins[0];
        assert_eq!(skin.skeleton_root, model.node_from_index(1));
        assert_eq!(
            skin.joints,
            vec![
                model.node_from_index(1).unwrap(),
                model.node_from_index(2).unwrap()
            ]
        );
        assert!(skin.inverse_bind_matrices.is_empty());
        assert_eq!(model.nodes[0].skin, Some(0));
        assert_eq!(
            model.nodes[0].mesh.as_ref().unwrap().uniform.joint_count,
            2.0
        );
    }

    #[test]
    fn specular_glossiness_disables_metallic_roughness() {
        let mut glb = GlbBuilder::new();
        let mesh = triangle_mesh(&mut glb, None);
        let model = glb.load(
            json!({
                "asset": {"version": "2.0"},
                "extensionsUsed": ["KHR_materials_pbrSpecularGlossiness"],
                "scenes": [{"nodes": [0]}],
                "nodes": [{"mesh": 0}],
                "meshes": [mesh]
            }),
            FileLoadingFlags::empty(),
        );
        assert!(!model.metallic_roughness_workflow);
    }

    #[test]
    fn document_without_scene_is_an_error() {
        let glb = GlbBuilder::new().build(json!({"asset": {"version": "2.0"}}));
        assert!(matches!(
            Model::load_from_slice(&glb, None, FileLoadingFlags::empty(), 1.0),
            Err(ModelError::NoScene)
        ));
    }
}
