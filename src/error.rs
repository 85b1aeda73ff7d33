use thiserror::Error;

use crate::vulkan::VulkanError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("could not read glTF data: {0}")]
    Gltf(#[from] gltf::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("the document does not contain a scene")]
    NoScene,
    #[error("primitive {primitive} of mesh {mesh} has no POSITION attribute")]
    MissingPositions { mesh: usize, primitive: usize },
    #[error("accessor {accessor}: {reason}")]
    UnsupportedAccessor {
        accessor: usize,
        reason: &'static str,
    },
    #[error("image {index} does not match its dimensions")]
    InvalidImage { index: usize },
    #[error("no animation with index {index}, the model has {count}")]
    AnimationOutOfRange { index: usize, count: usize },
    #[error("the model has no indexed geometry to upload")]
    EmptyGeometry,
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Vulkan(#[from] VulkanError),
}

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access config file {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("config file {path:?} is not valid: {source}")]
    Json {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
}
