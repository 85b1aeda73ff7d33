use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use ash::vk;
use clap::Parser;
use env_logger::Env;
use vkgltf::config::AnimationConfig;
use vkgltf::model::{DrawRecorder, FileLoadingFlags, NodeId, RenderFlags};
use vkgltf::{ConfigFileLoader, Context, GpuModel, Model, ModelDescriptorLayouts};

/// Print the structure of a glTF file: node tree, materials, animations and bounds.
#[derive(Parser)]
struct Options {
    /// The .gltf or .glb file. Falls back to `model.path` from the config file.
    path: Option<PathBuf>,

    /// JSON config file, created with defaults if missing.
    #[clap(long, env = "VKGLTF_CONFIG")]
    config: Option<PathBuf>,

    #[clap(long)]
    flip_y: bool,

    /// Bake node transforms into the vertices.
    #[clap(long)]
    pre_transform: bool,

    #[clap(long)]
    no_images: bool,

    /// Pose this animation before printing.
    #[clap(long)]
    animation: Option<usize>,

    /// Seconds into the animation.
    #[clap(long, default_value_t = 0.0)]
    time: f32,

    /// Create a Vulkan device and upload the model.
    #[clap(long)]
    upload: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let options = Options::parse();
    let mut config = match &options.config {
        Some(path) => ConfigFileLoader::new(path).get_or_load_config()?.clone(),
        None => vkgltf::Config::default(),
    };

    let mut switches = FileLoadingFlags::empty();
    switches.set(FileLoadingFlags::FLIP_Y, options.flip_y);
    switches.set(FileLoadingFlags::PRE_TRANSFORM_VERTICES, options.pre_transform);
    switches.set(FileLoadingFlags::DONT_LOAD_IMAGES, options.no_images);
    let animation = options.animation.map(|index| AnimationConfig {
        index,
        time: options.time,
    });

    let model_config = &mut config.model;
    model_config.merge_overrides(switches, animation);

    let path = options
        .path
        .or_else(|| model_config.path.clone())
        .context("no model path given")?;

    let mut model = Model::load_from_file(
        &path,
        model_config.file_loading_flags,
        model_config.scale,
    )
    .with_context(|| format!("loading {:?}", path))?;

    if let Some(animation) = model_config.animation {
        let updated = model.update_animation(animation.index, animation.time)?;
        log::info!(
            "Animation {} at {}s {}",
            animation.index,
            animation.time,
            if updated { "applied" } else { "had no keyframes" }
        );
    }

    print_model(&model);
    print_draw_summary(&model, model_config.render_flags);

    if options.upload {
        let context = Arc::new(Context::new(&config.device)?);
        let layouts =
            ModelDescriptorLayouts::new(context.clone(), config.model.descriptor_binding_flags)?;
        let gpu_model = GpuModel::new(context.clone(), model, &layouts, vk::BufferUsageFlags::empty())?;
        println!(
            "\nUploaded {} vertices, {} indices and {} textures",
            gpu_model.model.vertices.len(),
            gpu_model.model.indices.len(),
            gpu_model.textures.len()
        );
        context.wait_idle()?;
    }

    Ok(())
}

fn print_model(model: &Model) {
    println!("Nodes:");
    for root in &model.root_nodes {
        print_node(model, *root, 1);
    }

    println!("\nMaterials:");
    for (i, material) in model.materials.iter().enumerate() {
        println!(
            "  {:>3} {:<24} {:?} base color {:?} metallic {} roughness {}",
            i,
            material.name,
            material.alpha_mode,
            material.base_color_texture,
            material.metallic_factor,
            material.roughness_factor
        );
    }

    if !model.animations.is_empty() {
        println!("\nAnimations:");
        for (i, animation) in model.animations.iter().enumerate() {
            println!(
                "  {:>3} {:<24} {:.3}s..{:.3}s, {} channels",
                i,
                animation.name,
                animation.start,
                animation.end,
                animation.channels.len()
            );
        }
    }

    let dimensions = &model.dimensions;
    println!(
        "\n{} vertices, {} indices, {} images",
        model.vertices.len(),
        model.indices.len(),
        model.images.len()
    );
    println!(
        "Bounds {:?}..{:?}, center {:?}, radius {}",
        dimensions.min, dimensions.max, dimensions.center, dimensions.radius
    );
}

/// Counts what a draw with `render_flags` would record.
#[derive(Default)]
struct DrawCounter {
    nodes: usize,
    material_binds: usize,
    draws: usize,
    indices: u64,
}

impl DrawRecorder for DrawCounter {
    fn begin_node(&mut self, _node: NodeId) {
        self.nodes += 1;
    }

    fn bind_material(&mut self, _material: usize) {
        self.material_binds += 1;
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32) {
        self.draws += 1;
        self.indices += u64::from(index_count);
    }
}

fn print_draw_summary(model: &Model, render_flags: RenderFlags) {
    let mut counter = DrawCounter::default();
    model.draw(&mut counter, render_flags);
    println!(
        "Drawing with {:?}: {} mesh nodes, {} draws ({} indices), {} material binds",
        render_flags, counter.nodes, counter.draws, counter.indices, counter.material_binds
    );
}

fn print_node(model: &Model, id: NodeId, depth: usize) {
    let node = model.node(id);
    let mut line = format!("{:indent$}{} ({})", "", node.name, node.index, indent = depth * 2);
    if let Some(mesh) = &node.mesh {
        line += &format!(" mesh {:?}, {} primitives", mesh.name, mesh.primitives.len());
    }
    if let Some(skin) = node.skin {
        line += &format!(" skin {}", skin);
    }
    println!("{}", line);

    for child in &node.children {
        print_node(model, *child, depth + 1);
    }
}
