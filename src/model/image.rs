use gltf::image::Format;

use crate::error::{ModelError, ModelResult};

/// Decoded image in RGBA8, ready for upload.
#[derive(Clone, Debug)]
pub struct TextureImage {
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Most devices do not support three channel formats, so everything is widened to RGBA8.
    pub fn from_gltf(index: usize, name: Option<&str>, data: gltf::image::Data) -> ModelResult<Self> {
        let texel_count = (data.width * data.height) as usize;
        let pixels = match data.format {
            Format::R8G8B8A8 => data.pixels,
            Format::R8G8B8 => expand(&data.pixels, 3, |t| [t[0], t[1], t[2], 255]),
            Format::R8G8 => expand(&data.pixels, 2, |t| [t[0], t[1], 0, 255]),
            Format::R8 => expand(&data.pixels, 1, |t| [t[0], t[0], t[0], 255]),
            Format::R16G16B16A16 => expand(&data.pixels, 8, |t| [t[1], t[3], t[5], t[7]]),
            Format::R16G16B16 => expand(&data.pixels, 6, |t| [t[1], t[3], t[5], 255]),
            Format::R16G16 => expand(&data.pixels, 4, |t| [t[1], t[3], 0, 255]),
            Format::R16 => expand(&data.pixels, 2, |t| [t[1], t[1], t[1], 255]),
            Format::R32G32B32FLOAT => expand(&data.pixels, 12, |t| {
                [unorm(&t[0..4]), unorm(&t[4..8]), unorm(&t[8..12]), 255]
            }),
            Format::R32G32B32A32FLOAT => expand(&data.pixels, 16, |t| {
                [
                    unorm(&t[0..4]),
                    unorm(&t[4..8]),
                    unorm(&t[8..12]),
                    unorm(&t[12..16]),
                ]
            }),
        };

        if pixels.len() != texel_count * 4 {
            return Err(ModelError::InvalidImage { index });
        }

        Ok(Self {
            name: name.map(str::to_owned),
            width: data.width,
            height: data.height,
            pixels,
        })
    }
}

fn expand(pixels: &[u8], stride: usize, texel: impl Fn(&[u8]) -> [u8; 4]) -> Vec<u8> {
    pixels.chunks_exact(stride).flat_map(texel).collect()
}

fn unorm(bytes: &[u8]) -> u8 {
    let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
