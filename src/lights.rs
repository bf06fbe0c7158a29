//! Per-frame light parameters.
//!
//! Every light is a pure function of elapsed time and the camera; nothing
//! here is stored between frames.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;

pub const POINT_LIGHT_COUNT: usize = 3;

/// Peak swing of a hanging bulb, in degrees.
pub const SWING_AMPLITUDE: f32 = 10.0;
/// Angular frequency of the swing, in radians per second.
pub const SWING_FREQUENCY: f32 = 2.0;

const BULB_SCALE: f32 = 4.0;
/// Height of the swing pivot in bulb-local units.
const BULB_PIVOT_HEIGHT: f32 = 1.32;
/// Local point of the bulb that emits light.
const BULB_EMITTER: Vec4 = Vec4::new(0.0, 0.2, 0.0, 1.0);

pub const SHININESS: f32 = 128.0;

/// Distance falloff `1 / (constant + linear d + quadratic d^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub const AMBIENT: Vec3 = Vec3::splat(0.05);
    pub const DIFFUSE: Vec3 = Vec3::splat(0.8);
    pub const SPECULAR: Vec3 = Vec3::ONE;
    pub const ATTENUATION: Attenuation = Attenuation {
        constant: 1.0,
        linear: 0.09,
        quadratic: 0.032,
    };

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ambient: Self::AMBIENT,
            diffuse: Self::DIFFUSE,
            specular: Self::SPECULAR,
            attenuation: Self::ATTENUATION,
        }
    }
}

/// Flashlight carried by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Attenuation,
    /// Cosine of the inner cone angle.
    pub cut_off: f32,
    /// Cosine of the outer cone angle.
    pub outer_cut_off: f32,
}

impl SpotLight {
    pub const INNER_ANGLE: f32 = 2.5;
    pub const OUTER_ANGLE: f32 = 22.0;
    pub const ATTENUATION: Attenuation = Attenuation {
        constant: 1.0,
        linear: 0.01,
        quadratic: 0.001,
    };

    /// Places the spotlight at the camera, pointing where it looks.
    pub fn attached_to(camera: &Camera, active: bool) -> Self {
        let intensity = if active { Vec3::ONE } else { Vec3::ZERO };
        Self {
            position: camera.position,
            direction: camera.front(),
            ambient: Vec3::ZERO,
            diffuse: intensity,
            specular: intensity,
            attenuation: Self::ATTENUATION,
            cut_off: Self::INNER_ANGLE.to_radians().cos(),
            outer_cut_off: Self::OUTER_ANGLE.to_radians().cos(),
        }
    }

    pub fn is_lit(&self) -> bool {
        self.diffuse != Vec3::ZERO || self.specular != Vec3::ZERO
    }
}

/// A lamp hanging from the ceiling that sways around its pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightBulb {
    pub anchor: Vec3,
    /// Phase offset of the swing, in radians.
    pub phase: f32,
}

impl LightBulb {
    pub const fn new(anchor: Vec3, phase: f32) -> Self {
        Self { anchor, phase }
    }

    /// Swing angle in radians at `time` seconds.
    pub fn swing_angle(&self, time: f32) -> f32 {
        (SWING_AMPLITUDE * (self.phase + SWING_FREQUENCY * time).sin()).to_radians()
    }

    /// Model matrix of the bulb, rotated about its pivot.
    pub fn transform(&self, time: f32) -> Mat4 {
        let pivot = Vec3::new(0.0, BULB_PIVOT_HEIGHT, 0.0);
        Mat4::from_translation(self.anchor)
            * Mat4::from_scale(Vec3::splat(BULB_SCALE))
            * Mat4::from_translation(pivot)
            * Mat4::from_rotation_z(self.swing_angle(time))
            * Mat4::from_translation(-pivot)
    }

    /// World position of the emitter on the swung bulb.
    pub fn light_position(&self, time: f32) -> Vec3 {
        (self.transform(time) * BULB_EMITTER).truncate()
    }

    pub fn point_light(&self, time: f32) -> PointLight {
        PointLight::at(self.light_position(time))
    }
}

/// The three lamps above the table.
pub const LIGHT_BULBS: [LightBulb; POINT_LIGHT_COUNT] = [
    LightBulb::new(Vec3::new(0.0, 2.0, -3.0), 1.0),
    LightBulb::new(Vec3::new(0.0, 2.0, 0.0), 0.0),
    LightBulb::new(Vec3::new(0.0, 2.0, 3.0), 2.0),
];

/// Everything the shading stage needs to light one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLights {
    pub points: [PointLight; POINT_LIGHT_COUNT],
    pub spot: SpotLight,
    pub view_position: Vec3,
    pub shininess: f32,
}

impl FrameLights {
    pub fn compute(
        bulbs: &[LightBulb; POINT_LIGHT_COUNT],
        time: f32,
        camera: &Camera,
        spotlight_active: bool,
    ) -> Self {
        Self {
            points: bulbs.map(|bulb| bulb.point_light(time)),
            spot: SpotLight::attached_to(camera, spotlight_active),
            view_position: camera.position,
            shininess: SHININESS,
        }
    }
}
