use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use log::warn;
use serde::{Deserialize, Serialize};

/// Floats per vertex: `position.xyz`, `normal.xyz`, `uv.xy`.
pub const VERTEX_STRIDE: usize = 8;

/// GPU ready mesh buffers produced from an OBJ file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjMesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

/// Geometry drawn with a single material.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubMesh {
    pub name: String,
    pub mesh: ObjMesh,
    /// Index into [`ParsedObj::materials`].
    pub material: Option<usize>,
}

/// Surface description read from an MTL library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub diffuse_color: Vec3,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Vec3::ONE,
            diffuse_map: None,
            specular_map: None,
        }
    }
}

impl From<&tobj::Material> for Material {
    fn from(material: &tobj::Material) -> Self {
        Self {
            name: material.name.clone(),
            diffuse_color: material.diffuse.map_or(Vec3::ONE, Vec3::from),
            diffuse_map: material.diffuse_texture.clone(),
            specular_map: material.specular_texture.clone(),
        }
    }
}

/// Sub-meshes of an OBJ file together with the materials they reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedObj {
    pub meshes: Vec<SubMesh>,
    pub materials: Vec<Material>,
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Parses an OBJ file from memory, splitting it wherever the material changes.
///
/// `read_mtl` receives each `mtllib` path exactly as written in the file. A
/// library that cannot be read is logged and its sub-meshes stay untextured.
/// Texture coordinates are flipped vertically so that `v = 0` addresses the
/// top row of the image.
pub fn load_obj_from_str<F>(data: &str, read_mtl: F) -> Result<ParsedObj>
where
    F: Fn(&Path) -> Result<String>,
{
    let (models, materials) = tobj::load_obj_buf(&mut data.as_bytes(), &load_options(), |path| {
        let source = read_mtl(path).map_err(|err| {
            warn!("material library {}: {err:#}", path.display());
            tobj::LoadError::OpenFileFailed
        })?;
        tobj::load_mtl_buf(&mut source.as_bytes())
    })
    .context("malformed OBJ data")?;

    let materials: Vec<Material> = match materials {
        Ok(materials) => materials.iter().map(Material::from).collect(),
        Err(err) => {
            warn!("materials unavailable: {err}");
            Vec::new()
        }
    };
    let meshes = models
        .into_iter()
        .map(|model| SubMesh {
            mesh: interleave(&model.mesh),
            material: model.mesh.material_id.filter(|id| *id < materials.len()),
            name: model.name,
        })
        .collect();

    Ok(ParsedObj { meshes, materials })
}

fn interleave(source: &tobj::Mesh) -> ObjMesh {
    let count = source.positions.len() / 3;
    let has_normals = source.normals.len() == source.positions.len();
    let has_uvs = source.texcoords.len() == count * 2;

    let mut vertices = Vec::with_capacity(count * VERTEX_STRIDE);
    for i in 0..count {
        vertices.extend_from_slice(&source.positions[i * 3..i * 3 + 3]);
        if has_normals {
            vertices.extend_from_slice(&source.normals[i * 3..i * 3 + 3]);
        } else {
            vertices.extend_from_slice(&[0.0; 3]);
        }
        let (u, v) = if has_uvs {
            (source.texcoords[i * 2], source.texcoords[i * 2 + 1])
        } else {
            (0.0, 0.0)
        };
        vertices.extend_from_slice(&[u, 1.0 - v]);
    }

    let mut mesh = ObjMesh {
        vertices,
        indices: source.indices.clone(),
    };
    if !has_normals {
        compute_normals(&mut mesh);
    }
    mesh
}

fn compute_normals(mesh: &mut ObjMesh) {
    let vertex_count = mesh.vertices.len() / VERTEX_STRIDE;
    let mut accum = vec![Vec3::ZERO; vertex_count];
    let position = |vertices: &[f32], i: usize| {
        Vec3::from_slice(&vertices[i * VERTEX_STRIDE..i * VERTEX_STRIDE + 3])
    };

    for triangle in mesh.indices.chunks_exact(3) {
        let i0 = triangle[0] as usize;
        let i1 = triangle[1] as usize;
        let i2 = triangle[2] as usize;
        let p0 = position(&mesh.vertices, i0);
        let p1 = position(&mesh.vertices, i1);
        let p2 = position(&mesh.vertices, i2);
        let normal = (p1 - p0).cross(p2 - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        let base = i * VERTEX_STRIDE;
        mesh.vertices[base + 3] = normal.x;
        mesh.vertices[base + 4] = normal.y;
        mesh.vertices[base + 5] = normal.z;
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    fn no_library(path: &Path) -> Result<String> {
        Err(anyhow!("no library {}", path.display()))
    }

    #[test]
    fn parses_simple_triangle() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let parsed = load_obj_from_str(obj, no_library).unwrap();
        assert_eq!(parsed.meshes.len(), 1);
        assert_eq!(parsed.meshes[0].mesh.indices, vec![0, 1, 2]);
        assert_eq!(parsed.meshes[0].mesh.vertices.len(), 3 * VERTEX_STRIDE);
        assert_eq!(parsed.meshes[0].material, None);
        assert!(parsed.materials.is_empty());
    }

    #[test]
    fn computes_missing_normals() {
        let obj = "\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let parsed = load_obj_from_str(obj, no_library).unwrap();
        for chunk in parsed.meshes[0].mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            let normal = Vec3::new(chunk[3], chunk[4], chunk[5]);
            assert!((normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn quads_are_triangulated_with_flipped_uvs() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1 4/4/1\n";
        let mesh = &load_obj_from_str(obj, no_library).unwrap().meshes[0].mesh;
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        let first = &mesh.vertices[..VERTEX_STRIDE];
        assert_eq!(&first[3..8], &[0.0, 0.0, 1.0, 0.0, 1.0]);
        let third = &mesh.vertices[2 * VERTEX_STRIDE..3 * VERTEX_STRIDE];
        assert_eq!(&third[6..8], &[1.0, 0.0]);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = &load_obj_from_str(obj, no_library).unwrap().meshes[0].mesh;
        assert_eq!(&mesh.vertices[VERTEX_STRIDE..VERTEX_STRIDE + 3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n";
        assert!(load_obj_from_str(obj, no_library).is_err());
    }

    #[test]
    fn splits_sub_meshes_per_material() {
        let obj = "mtllib cake.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nusemtl Sponge\nf 1 2 3\nusemtl Icing\nf 2 4 3\n";
        let mtl = "newmtl Icing\nKd 1 0.5 0.5\nmap_Kd icing.png\nmap_Ks icing_spec.png\nnewmtl Sponge\nKd 1 1 0\nmap_Kd sponge.png\n";
        let parsed = load_obj_from_str(obj, |path| {
            assert_eq!(path, Path::new("cake.mtl"));
            Ok(mtl.to_string())
        })
        .unwrap();

        assert_eq!(parsed.materials.len(), 2);
        assert_eq!(parsed.meshes.len(), 2);
        let material_of = |sub: &SubMesh| &parsed.materials[sub.material.unwrap()];
        let sponge = material_of(&parsed.meshes[0]);
        let icing = material_of(&parsed.meshes[1]);
        assert_eq!(sponge.name, "Sponge");
        assert_eq!(sponge.diffuse_map.as_deref(), Some("sponge.png"));
        assert_eq!(sponge.specular_map, None);
        assert_eq!(icing.name, "Icing");
        assert_eq!(icing.diffuse_color, Vec3::new(1.0, 0.5, 0.5));
        assert_eq!(icing.specular_map.as_deref(), Some("icing_spec.png"));
        for sub in &parsed.meshes {
            assert_eq!(sub.mesh.indices.len(), 3);
        }
    }

    #[test]
    fn unreadable_library_leaves_meshes_untextured() {
        let obj = "mtllib gone.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl Wood\nf 1 2 3\n";
        let parsed = load_obj_from_str(obj, no_library).unwrap();
        assert_eq!(parsed.meshes.len(), 1);
        assert_eq!(parsed.meshes[0].material, None);
        assert!(parsed.materials.is_empty());
    }
}
