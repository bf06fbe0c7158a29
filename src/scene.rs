use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::lights::{LightBulb, LIGHT_BULBS, POINT_LIGHT_COUNT};

/// Models the room is furnished with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    Table,
    Cake,
    LightBulb,
    Floor,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [Self::Table, Self::Cake, Self::LightBulb, Self::Floor];

    pub fn label(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Cake => "cake",
            Self::LightBulb => "light-bulb",
            Self::Floor => "floor",
        }
    }
}

/// Which shading path draws an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shading {
    /// Lit by the point lights and the spotlight.
    Lit,
    /// Emissive light fixture, drawn unlit.
    Emissive,
}

/// One step of a model transform, applied in listed order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransformStep {
    Translate(Vec3),
    /// Rotation of `angle` radians about `axis`.
    Rotate { axis: Vec3, angle: f32 },
    Scale(Vec3),
}

impl TransformStep {
    fn matrix(self) -> Mat4 {
        match self {
            Self::Translate(offset) => Mat4::from_translation(offset),
            Self::Rotate { axis, angle } => Mat4::from_axis_angle(axis.normalize(), angle),
            Self::Scale(factors) => Mat4::from_scale(factors),
        }
    }
}

/// Ordered list of transform steps.
///
/// Steps compose by right-multiplication, so the last step is the first one
/// applied to object-space vertices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformRecipe {
    steps: Vec<TransformStep>,
}

impl TransformRecipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(mut self, offset: Vec3) -> Self {
        self.steps.push(TransformStep::Translate(offset));
        self
    }

    pub fn rotate(mut self, axis: Vec3, angle: f32) -> Self {
        self.steps.push(TransformStep::Rotate { axis, angle });
        self
    }

    pub fn scale(mut self, factors: Vec3) -> Self {
        self.steps.push(TransformStep::Scale(factors));
        self
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.steps
            .iter()
            .fold(Mat4::IDENTITY, |model, step| model * step.matrix())
    }
}

/// A model placed at a fixed spot in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticInstance {
    pub model: ModelId,
    pub recipe: TransformRecipe,
}

/// A draw request with its model matrix already evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub model: ModelId,
    pub shading: Shading,
    pub transform: Mat4,
}

pub const TABLE_OFFSET: Vec3 = Vec3::new(0.0, -5.0, 0.0);
pub const TABLE_SCALE: f32 = 1.4;
pub const CAKE_OFFSETS: [Vec3; 6] = [
    Vec3::new(1.5, -2.15, 3.0),
    Vec3::new(-1.5, -2.15, 3.0),
    Vec3::new(1.5, -2.15, 0.0),
    Vec3::new(-1.5, -2.15, 0.0),
    Vec3::new(1.5, -2.15, -3.0),
    Vec3::new(-1.5, -2.15, -3.0),
];
/// Yaw of every cake slice, in radians.
pub const CAKE_YAW: f32 = -0.3;
pub const CAKE_SCALE: f32 = 0.1;
pub const FLOOR_OFFSET: Vec3 = Vec3::new(0.0, -5.0, 0.0);
pub const FLOOR_SCALE: Vec3 = Vec3::new(20.0, 1.0, 20.0);

/// Static furniture plus the swaying lamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub instances: Vec<StaticInstance>,
    pub bulbs: [LightBulb; POINT_LIGHT_COUNT],
}

impl Default for Room {
    fn default() -> Self {
        Self::dining_room()
    }
}

impl Room {
    /// Table with six cake slices under three lamps.
    pub fn dining_room() -> Self {
        let mut instances = vec![StaticInstance {
            model: ModelId::Table,
            recipe: TransformRecipe::new()
                .translate(TABLE_OFFSET)
                .scale(Vec3::splat(TABLE_SCALE)),
        }];
        instances.extend(CAKE_OFFSETS.iter().map(|offset| StaticInstance {
            model: ModelId::Cake,
            recipe: cake_recipe(*offset),
        }));
        instances.push(StaticInstance {
            model: ModelId::Floor,
            recipe: TransformRecipe::new()
                .translate(FLOOR_OFFSET)
                .scale(FLOOR_SCALE),
        });
        Self {
            instances,
            bulbs: LIGHT_BULBS,
        }
    }

    /// Evaluates every model matrix for the frame at `time` seconds.
    ///
    /// Light fixtures come first, matching the order they are drawn in.
    pub fn draw_list(&self, time: f32) -> Vec<DrawItem> {
        let bulbs = self.bulbs.iter().map(|bulb| DrawItem {
            model: ModelId::LightBulb,
            shading: Shading::Emissive,
            transform: bulb.transform(time),
        });
        let furniture = self.instances.iter().map(|instance| DrawItem {
            model: instance.model,
            shading: Shading::Lit,
            transform: instance.recipe.model_matrix(),
        });
        bulbs.chain(furniture).collect()
    }
}

fn cake_recipe(offset: Vec3) -> TransformRecipe {
    TransformRecipe::new()
        .translate(offset)
        .rotate(Vec3::Y, CAKE_YAW)
        .scale(Vec3::splat(CAKE_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn recipe_composes_in_listed_order() {
        let recipe = TransformRecipe::new()
            .translate(Vec3::new(1.0, 2.0, 3.0))
            .scale(Vec3::splat(2.0));
        let point = recipe.model_matrix().transform_point3(Vec3::X);
        assert_close(point, Vec3::new(3.0, 2.0, 3.0));
    }

    #[test]
    fn cake_rotation_applies_before_scale_in_product() {
        let model = cake_recipe(Vec3::ZERO).model_matrix();
        let expected = Mat4::from_rotation_y(CAKE_YAW) * Mat4::from_scale(Vec3::splat(0.1));
        assert!(model.abs_diff_eq(expected, 1e-6));
        let rotated = model.transform_vector3(Vec3::X);
        assert!((rotated.length() - CAKE_SCALE).abs() < 1e-6);
        assert!(rotated.z > 0.0);
    }

    #[test]
    fn dining_room_layout() {
        let room = Room::dining_room();
        let count = |id| room.instances.iter().filter(|i| i.model == id).count();
        assert_eq!(count(ModelId::Table), 1);
        assert_eq!(count(ModelId::Cake), 6);
        assert_eq!(count(ModelId::Floor), 1);
        assert_eq!(count(ModelId::LightBulb), 0);
    }

    #[test]
    fn draw_list_puts_bulbs_first() {
        let room = Room::dining_room();
        let items = room.draw_list(0.0);
        assert_eq!(items.len(), POINT_LIGHT_COUNT + room.instances.len());
        assert!(items[..POINT_LIGHT_COUNT]
            .iter()
            .all(|item| item.model == ModelId::LightBulb && item.shading == Shading::Emissive));
        assert!(items[POINT_LIGHT_COUNT..]
            .iter()
            .all(|item| item.shading == Shading::Lit));
    }

    #[test]
    fn static_transforms_ignore_time() {
        let room = Room::dining_room();
        let early = room.draw_list(0.0);
        let late = room.draw_list(12.5);
        assert_eq!(early[POINT_LIGHT_COUNT..], late[POINT_LIGHT_COUNT..]);
        assert_ne!(early[0].transform, late[0].transform);
    }

    #[test]
    fn floor_sits_under_table() {
        let room = Room::dining_room();
        let floor = room
            .instances
            .iter()
            .find(|i| i.model == ModelId::Floor)
            .unwrap();
        let corner = floor.recipe.model_matrix().transform_point3(Vec3::new(1.0, 0.0, 1.0));
        assert_close(corner, Vec3::new(20.0, -5.0, 20.0));
    }
}
