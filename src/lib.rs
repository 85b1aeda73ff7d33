//! Loads glTF 2.0 scenes into a flat node hierarchy with shared vertex and index arrays,
//! animates them on the CPU and uploads them for drawing with Vulkan.

pub mod config;
pub mod error;
pub mod gpu_model;
pub mod model;
pub mod texture;
pub mod utility;
pub mod vulkan;

pub use config::{Config, ConfigFileLoader, DeviceConfig, ModelConfig};
pub use error::{ConfigError, ModelError, ModelResult};
pub use gpu_model::{GpuModel, ModelDescriptorLayouts};
pub use model::Model;
pub use texture::Texture2D;
pub use vulkan::context::Context;
