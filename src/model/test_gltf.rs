//! In-memory GLB documents for tests.

use serde_json::{json, Value};
use ultraviolet::Mat4;

use super::{FileLoadingFlags, Model};

const FLOAT: u32 = 5126;
const UNSIGNED_BYTE: u32 = 5121;
const UNSIGNED_SHORT: u32 = 5123;
const UNSIGNED_INT: u32 = 5125;

#[derive(Default)]
pub(crate) struct GlbBuilder {
    bin: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a 4-byte aligned buffer view and returns its index.
    pub fn push_view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        }));
        self.bin.extend_from_slice(bytes);
        self.buffer_views.len() - 1
    }

    fn push_accessor(
        &mut self,
        bytes: &[u8],
        component_type: u32,
        count: usize,
        ty: &str,
        bounds: Option<(Vec<f32>, Vec<f32>)>,
    ) -> usize {
        let view = self.push_view(bytes);
        let mut accessor = json!({
            "bufferView": view,
            "componentType": component_type,
            "count": count,
            "type": ty,
        });
        if let Some((min, max)) = bounds {
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    pub fn push_f32s(&mut self, values: &[f32]) -> usize {
        let bytes = float_bytes(values.iter());
        let min = values.iter().copied().fold(f32::MAX, f32::min);
        let max = values.iter().copied().fold(f32::MIN, f32::max);
        self.push_accessor(&bytes, FLOAT, values.len(), "SCALAR", Some((vec![min], vec![max])))
    }

    pub fn push_vec2s(&mut self, values: &[[f32; 2]]) -> usize {
        let bytes = float_bytes(values.iter().flatten());
        self.push_accessor(&bytes, FLOAT, values.len(), "VEC2", None)
    }

    /// Always writes min and max, as POSITION accessors require them.
    pub fn push_vec3s(&mut self, values: &[[f32; 3]]) -> usize {
        let bytes = float_bytes(values.iter().flatten());
        let mut min = vec![f32::MAX; 3];
        let mut max = vec![f32::MIN; 3];
        for value in values {
            for axis in 0..3 {
                min[axis] = min[axis].min(value[axis]);
                max[axis] = max[axis].max(value[axis]);
            }
        }
        self.push_accessor(&bytes, FLOAT, values.len(), "VEC3", Some((min, max)))
    }

    pub fn push_vec4s(&mut self, values: &[[f32; 4]]) -> usize {
        let bytes = float_bytes(values.iter().flatten());
        self.push_accessor(&bytes, FLOAT, values.len(), "VEC4", None)
    }

    pub fn push_mat4s(&mut self, values: &[Mat4]) -> usize {
        let columns: Vec<f32> = values
            .iter()
            .flat_map(|m| m.cols)
            .flat_map(|c| [c.x, c.y, c.z, c.w])
            .collect();
        let bytes = float_bytes(columns.iter());
        self.push_accessor(&bytes, FLOAT, values.len(), "MAT4", None)
    }

    pub fn push_joints(&mut self, values: &[[u16; 4]]) -> usize {
        let bytes: Vec<u8> = values
            .iter()
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        self.push_accessor(&bytes, UNSIGNED_SHORT, values.len(), "VEC4", None)
    }

    pub fn push_indices_u8(&mut self, values: &[u8]) -> usize {
        self.push_accessor(values, UNSIGNED_BYTE, values.len(), "SCALAR", None)
    }

    pub fn push_indices_u16(&mut self, values: &[u16]) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.push_accessor(&bytes, UNSIGNED_SHORT, values.len(), "SCALAR", None)
    }

    pub fn push_indices_u32(&mut self, values: &[u32]) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.push_accessor(&bytes, UNSIGNED_INT, values.len(), "SCALAR", None)
    }

    /// Encodes an RGB image as PNG into a buffer view, returns the JSON image entry.
    pub fn push_png(&mut self, width: u32, height: u32, rgb: &[u8]) -> Value {
        let image = image::RgbImage::from_raw(width, height, rgb.to_vec())
            .expect("pixel count matches the dimensions");
        let mut png = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .expect("png encoding");
        let view = self.push_view(png.get_ref());
        json!({"bufferView": view, "mimeType": "image/png"})
    }

    /// Adds `accessors`, `bufferViews` and `buffers` to `json` and wraps it in a GLB container.
    pub fn build(mut self, mut json: Value) -> Vec<u8> {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        if !self.bin.is_empty() {
            json["accessors"] = Value::Array(self.accessors);
            json["bufferViews"] = Value::Array(self.buffer_views);
            json["buffers"] = json!([{"byteLength": self.bin.len()}]);
        }

        let mut json_bytes = serde_json::to_vec(&json).expect("json encoding");
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }

        let bin_chunk = if self.bin.is_empty() {
            0
        } else {
            8 + self.bin.len()
        };
        let total = 12 + 8 + json_bytes.len() + bin_chunk;
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        glb.extend_from_slice(&json_bytes);
        if !self.bin.is_empty() {
            glb.extend_from_slice(&(self.bin.len() as u32).to_le_bytes());
            glb.extend_from_slice(&0x004E_4942u32.to_le_bytes());
            glb.extend_from_slice(&self.bin);
        }
        glb
    }

    pub fn load(self, json: Value, flags: FileLoadingFlags) -> Model {
        let glb = self.build(json);
        Model::load_from_slice(&glb, None, flags, 1.0).expect("test document loads")
    }
}

fn float_bytes<'a>(values: impl Iterator<Item = &'a f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

/// Mesh with one triangle spanning (0,0,0)..(1,1,0), u16 indices.
pub(crate) fn triangle_mesh(glb: &mut GlbBuilder, material: Option<usize>) -> Value {
    let positions = glb.push_vec3s(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let indices = glb.push_indices_u16(&[0, 1, 2]);
    let mut primitive = json!({
        "attributes": {"POSITION": positions},
        "indices": indices,
    });
    if let Some(material) = material {
        primitive["material"] = json!(material);
    }
    json!({"primitives": [primitive]})
}
