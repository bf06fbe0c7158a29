use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::obj::{load_obj_from_str, Material, ObjMesh, SubMesh, VERTEX_STRIDE};
use crate::scene::ModelId;
use crate::texture::TextureImage;

pub const TABLE_OBJ: &str = "resources/objects/dining_table/dining_table.obj";
pub const CAKE_OBJ: &str = "resources/objects/slice_of_cake/cake.obj";
pub const LIGHT_OBJ: &str = "resources/objects/light/light.obj";
pub const FLOOR_DIFFUSE: &str = "resources/objects/floor/floor_diffuse.png";
pub const FLOOR_SPECULAR: &str = "resources/objects/floor/floor_specular2.png";

/// Texture coordinates on the floor run to this value, tiling the maps.
pub const FLOOR_TILING: f32 = 10.0;

/// Resolves asset paths against a root directory.
#[derive(Debug, Clone, Default)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn read(&self, relative: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = self.resolve(relative);
        fs::read(&path).with_context(|| format!("unable to read {}", path.display()))
    }

    pub fn read_to_string(&self, relative: impl AsRef<Path>) -> Result<String> {
        let path = self.resolve(relative);
        fs::read_to_string(&path).with_context(|| format!("unable to read {}", path.display()))
    }

    /// Loads a model's sub-meshes and the materials they reference.
    pub fn load_model(&self, id: ModelId) -> Result<ModelData> {
        match id {
            ModelId::Table => self.load_obj_model(TABLE_OBJ),
            ModelId::Cake => self.load_obj_model(CAKE_OBJ),
            ModelId::LightBulb => self.load_obj_model(LIGHT_OBJ),
            ModelId::Floor => Ok(ModelData {
                meshes: vec![SubMesh {
                    name: "floor".into(),
                    mesh: floor_mesh(),
                    material: Some(0),
                }],
                materials: vec![Material {
                    name: "floor".into(),
                    diffuse_map: Some(FLOOR_DIFFUSE.into()),
                    specular_map: Some(FLOOR_SPECULAR.into()),
                    ..Material::default()
                }],
                base_dir: PathBuf::new(),
            }),
        }
    }

    pub fn load_texture(&self, relative: impl AsRef<Path>) -> Result<TextureImage> {
        let relative = relative.as_ref();
        let bytes = self.read(relative)?;
        TextureImage::decode(&bytes)
            .with_context(|| format!("failed to decode texture {}", relative.display()))
    }

    fn load_obj_model(&self, relative: &str) -> Result<ModelData> {
        let contents = self.read_to_string(relative)?;
        let base_dir = Path::new(relative)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let parsed = load_obj_from_str(&contents, |library| {
            self.read_to_string(base_dir.join(library))
        })
        .with_context(|| format!("failed to parse OBJ mesh {relative}"))?;

        Ok(ModelData {
            meshes: parsed.meshes,
            materials: parsed.materials,
            base_dir,
        })
    }
}

/// CPU-side geometry and materials of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub meshes: Vec<SubMesh>,
    pub materials: Vec<Material>,
    /// Directory that material texture paths are relative to.
    pub base_dir: PathBuf,
}

impl ModelData {
    pub fn diffuse_path(&self, material: usize) -> Option<PathBuf> {
        self.materials
            .get(material)?
            .diffuse_map
            .as_ref()
            .map(|map| self.base_dir.join(map))
    }

    pub fn specular_path(&self, material: usize) -> Option<PathBuf> {
        self.materials
            .get(material)?
            .specular_map
            .as_ref()
            .map(|map| self.base_dir.join(map))
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes
            .iter()
            .map(|sub| sub.mesh.vertices.len() / VERTEX_STRIDE)
            .sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|sub| sub.mesh.indices.len()).sum()
    }
}

/// Unit quad in the XZ plane facing up, two triangles. Texture rows are
/// flipped the same way OBJ texture coordinates are.
pub fn floor_mesh() -> ObjMesh {
    let t = FLOOR_TILING;
    #[rustfmt::skip]
    let vertices = vec![
        // positions        // normals       // texture coords
        1.0, 0.0, 1.0,      0.0, 1.0, 0.0,   t, 1.0 - t,
        1.0, 0.0, -1.0,     0.0, 1.0, 0.0,   t, 1.0,
        -1.0, 0.0, 1.0,     0.0, 1.0, 0.0,   0.0, 1.0 - t,
        -1.0, 0.0, -1.0,    0.0, 1.0, 0.0,   0.0, 1.0,
    ];
    ObjMesh {
        vertices,
        indices: vec![0, 1, 3, 0, 2, 3],
    }
}
