use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec3};

use crate::app::{FramePlan, PostEffect};
use crate::lights::{Attenuation, PointLight, SpotLight, POINT_LIGHT_COUNT};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointLightUniform {
    position: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    /// constant, linear, quadratic, unused
    attenuation: [f32; 4],
}

impl From<&PointLight> for PointLightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(1.0).into(),
            ambient: light.ambient.extend(0.0).into(),
            diffuse: light.diffuse.extend(0.0).into(),
            specular: light.specular.extend(0.0).into(),
            attenuation: attenuation(light.attenuation),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SpotLightUniform {
    position: [f32; 4],
    direction: [f32; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
    specular: [f32; 4],
    attenuation: [f32; 4],
    /// cos(inner), cos(outer), unused, unused
    cone: [f32; 4],
}

impl From<&SpotLight> for SpotLightUniform {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: light.position.extend(1.0).into(),
            direction: light.direction.extend(0.0).into(),
            ambient: light.ambient.extend(0.0).into(),
            diffuse: light.diffuse.extend(0.0).into(),
            specular: light.specular.extend(0.0).into(),
            attenuation: attenuation(light.attenuation),
            cone: [light.cut_off, light.outer_cut_off, 0.0, 0.0],
        }
    }
}

fn attenuation(terms: Attenuation) -> [f32; 4] {
    [terms.constant, terms.linear, terms.quadratic, 0.0]
}

/// Per-frame camera and lighting block, bound at group 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    /// xyz: camera position, w: material shininess
    view_position: [f32; 4],
    point_lights: [PointLightUniform; POINT_LIGHT_COUNT],
    spot_light: SpotLightUniform,
}

impl FrameUniform {
    pub fn new(plan: &FramePlan) -> Self {
        let lights = &plan.lights;
        Self {
            view: plan.view.to_cols_array_2d(),
            projection: plan.projection.to_cols_array_2d(),
            view_position: lights.view_position.extend(lights.shininess).into(),
            point_lights: lights.points.each_ref().map(PointLightUniform::from),
            spot_light: SpotLightUniform::from(&lights.spot),
        }
    }

    pub fn spot_light(&self) -> &SpotLightUniform {
        &self.spot_light
    }
}

/// Per-draw transform block, bound at group 1.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
}

impl ObjectUniform {
    pub fn new(model: Mat4) -> Self {
        let normal = Mat3::from_mat4(model).inverse().transpose();
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
        }
    }
}

/// Per-material colour block, bound at group 2 next to the texture maps.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    /// rgb: diffuse colour multiplier
    tint: [f32; 4],
}

impl MaterialUniform {
    pub fn new(tint: Vec3) -> Self {
        Self {
            tint: tint.extend(1.0).into(),
        }
    }
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

/// Composite pass settings.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CompositeUniform {
    /// x: 1.0 for grayscale, 0.0 for pass-through
    effect: [f32; 4],
}

impl CompositeUniform {
    pub fn new(effect: PostEffect) -> Self {
        let grayscale = match effect {
            PostEffect::PassThrough => 0.0,
            PostEffect::Grayscale => 1.0,
        };
        Self {
            effect: [grayscale, 0.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::*;
    use crate::app::Viewer;
    use crate::config::PipelineStages;

    #[test]
    fn layouts_match_shader_blocks() {
        assert_eq!(size_of::<PointLightUniform>(), 80);
        assert_eq!(size_of::<SpotLightUniform>(), 112);
        assert_eq!(size_of::<FrameUniform>(), 64 + 64 + 16 + 3 * 80 + 112);
        assert_eq!(size_of::<ObjectUniform>(), 64 + 48);
        assert_eq!(size_of::<MaterialUniform>(), 16);
        assert_eq!(size_of::<FrameUniform>() % 16, 0);
    }

    #[test]
    fn spotlight_block_is_zero_until_toggled() {
        let mut viewer = Viewer::new(PipelineStages::all());
        let off = FrameUniform::new(&viewer.plan_frame(0.0, 1.0));
        assert_eq!(off.spot_light().diffuse, [0.0; 4]);
        assert_eq!(off.spot_light().specular, [0.0; 4]);

        viewer.key_event(crate::app::SPOTLIGHT_KEY, true);
        let on = FrameUniform::new(&viewer.plan_frame(0.0, 1.0));
        assert_eq!(on.spot_light().diffuse, [1.0, 1.0, 1.0, 0.0]);

        viewer.key_event(crate::app::SPOTLIGHT_KEY, false);
        viewer.key_event(crate::app::SPOTLIGHT_KEY, true);
        let again = FrameUniform::new(&viewer.plan_frame(0.0, 1.0));
        assert_eq!(again.spot_light(), off.spot_light());
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(20.0, 1.0, 20.0));
        let uniform = ObjectUniform::new(model);
        assert_eq!(uniform.normal[1][1], 1.0);
        assert!((uniform.normal[0][0] - 0.05).abs() < 1e-6);
    }

    #[test]
    fn composite_flag() {
        assert_eq!(CompositeUniform::new(PostEffect::Grayscale).effect[0], 1.0);
        assert_eq!(CompositeUniform::new(PostEffect::PassThrough).effect[0], 0.0);
    }
}
