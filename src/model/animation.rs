use ultraviolet::{Lerp, Rotor3, Vec3, Vec4};

use super::node::{Node, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(interpolation: gltf::animation::Interpolation) -> Self {
        match interpolation {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelPath {
    Translation,
    Rotation,
    Scale,
}

/// Keyframe times and values. Three component outputs are stored with `w = 0`.
/// Cubic spline samplers hold `[in_tangent, value, out_tangent]` per keyframe.
#[derive(Clone, Debug)]
pub struct AnimationSampler {
    pub interpolation: Interpolation,
    pub inputs: Vec<f32>,
    pub outputs: Vec<Vec4>,
}

#[derive(Clone, Debug)]
pub struct AnimationChannel {
    pub path: ChannelPath,
    pub node: NodeId,
    /// Index into [`Animation::samplers`].
    pub sampler: usize,
}

#[derive(Clone, Debug)]
pub struct Animation {
    pub name: String,
    pub samplers: Vec<AnimationSampler>,
    pub channels: Vec<AnimationChannel>,
    pub start: f32,
    pub end: f32,
}

impl Animation {
    pub fn duration(&self) -> f32 {
        (self.end - self.start).max(0.0)
    }

    /// Writes the pose at `time` into the channel targets. Returns whether any node changed.
    pub fn apply(&self, nodes: &mut [Node], time: f32) -> bool {
        let mut updated = false;
        for channel in &self.channels {
            let Some(sampler) = self.samplers.get(channel.sampler) else {
                continue;
            };
            let Some(value) = sampler.sample(time, channel.path) else {
                continue;
            };
            let Some(node) = nodes.get_mut(channel.node.0) else {
                continue;
            };

            match channel.path {
                ChannelPath::Translation => node.transform.translation = truncate(value),
                ChannelPath::Scale => node.transform.scale = truncate(value),
                ChannelPath::Rotation => {
                    node.transform.rotation = Rotor3::from_quaternion_array(value.into())
                }
            }
            updated = true;
        }
        updated
    }
}

impl AnimationSampler {
    fn has_enough_outputs(&self) -> bool {
        let per_keyframe = match self.interpolation {
            Interpolation::CubicSpline => 3,
            Interpolation::Linear | Interpolation::Step => 1,
        };
        self.outputs.len() >= self.inputs.len() * per_keyframe
    }

    fn value(&self, keyframe: usize) -> Vec4 {
        match self.interpolation {
            Interpolation::CubicSpline => self.outputs[keyframe * 3 + 1],
            Interpolation::Linear | Interpolation::Step => self.outputs[keyframe],
        }
    }

    /// `None` when `time` lies outside the keyframes or the sampler lacks outputs.
    pub fn sample(&self, time: f32, path: ChannelPath) -> Option<Vec4> {
        if !self.has_enough_outputs() {
            return None;
        }

        let i = self
            .inputs
            .windows(2)
            .position(|pair| time >= pair[0] && time <= pair[1])?;

        let delta = self.inputs[i + 1] - self.inputs[i];
        let u = if delta > 0.0 {
            ((time - self.inputs[i]).max(0.0) / delta).min(1.0)
        } else {
            0.0
        };

        let value = match self.interpolation {
            Interpolation::Step => self.value(i),
            Interpolation::Linear => {
                let (a, b) = (self.value(i), self.value(i + 1));
                match path {
                    ChannelPath::Rotation => slerp(a, b, u).normalized(),
                    ChannelPath::Translation | ChannelPath::Scale => a.lerp(b, u),
                }
            }
            Interpolation::CubicSpline => {
                let value = hermite(
                    self.outputs[i * 3 + 1],
                    self.outputs[i * 3 + 2] * delta,
                    self.outputs[(i + 1) * 3 + 1],
                    self.outputs[(i + 1) * 3] * delta,
                    u,
                );
                match path {
                    ChannelPath::Rotation => value.normalized(),
                    ChannelPath::Translation | ChannelPath::Scale => value,
                }
            }
        };
        Some(value)
    }
}

fn truncate(value: Vec4) -> Vec3 {
    Vec3::new(value.x, value.y, value.z)
}

/// Quaternion slerp along the shorter arc.
fn slerp(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    let mut b = b;
    let mut cos_theta = a.dot(b);
    if cos_theta < 0.0 {
        b = b * -1.0;
        cos_theta = -cos_theta;
    }

    if cos_theta > 1.0 - f32::EPSILON {
        return a.lerp(b, t);
    }

    let angle = cos_theta.acos();
    (a * ((1.0 - t) * angle).sin() + b * (t * angle).sin()) / angle.sin()
}

fn hermite(p0: Vec4, m0: Vec4, p1: Vec4, m1: Vec4, t: f32) -> Vec4 {
    let t2 = t * t;
    let t3 = t2 * t;
    p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
        + m0 * (t3 - 2.0 * t2 + t)
        + p1 * (-2.0 * t3 + 3.0 * t2)
        + m1 * (t3 - t2)
}
