use wgpu::util::DeviceExt;

use crate::obj::{ObjMesh, VERTEX_STRIDE};

/// Vertex layout shared by every scene pipeline.
pub(crate) const SCENE_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

pub(crate) fn scene_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &SCENE_VERTEX_ATTRIBUTES,
    }
}

pub(crate) const QUAD_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

pub(crate) fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (4 * std::mem::size_of::<f32>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &QUAD_VERTEX_ATTRIBUTES,
    }
}

/// Full-screen quad in clip space, two triangles; uv origin is top-left.
#[rustfmt::skip]
pub(crate) const SCREEN_QUAD_VERTICES: &[f32] = &[
    // positions  // texture coords
    -1.0,  1.0,   0.0, 0.0,
    -1.0, -1.0,   0.0, 1.0,
     1.0, -1.0,   1.0, 1.0,

    -1.0,  1.0,   0.0, 0.0,
     1.0, -1.0,   1.0, 1.0,
     1.0,  1.0,   1.0, 0.0,
];

pub(crate) struct MeshBuffers {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn from_mesh(device: &wgpu::Device, mesh: &ObjMesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Unit cube drawn in place of models that failed to load.
pub(crate) fn fallback_cube() -> ObjMesh {
    // (normal, tangent u, tangent v) per face
    const FACES: [[[f32; 3]; 3]; 6] = [
        [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        [[0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        [[-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
        [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]],
        [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
    ];
    const CORNERS: [(f32, f32); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

    let mut vertices = Vec::with_capacity(FACES.len() * CORNERS.len() * VERTEX_STRIDE);
    let mut indices = Vec::with_capacity(FACES.len() * 6);
    for (face, [normal, u, v]) in FACES.iter().enumerate() {
        for (s, t) in CORNERS {
            let position = [
                normal[0] * 0.5 + u[0] * s + v[0] * t,
                normal[1] * 0.5 + u[1] * s + v[1] * t,
                normal[2] * 0.5 + u[2] * s + v[2] * t,
            ];
            vertices.extend_from_slice(&position);
            vertices.extend_from_slice(normal);
            vertices.extend_from_slice(&[s + 0.5, 0.5 - t]);
        }
        let base = (face * 4) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    ObjMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn fallback_cube_faces_point_outward() {
        let cube = fallback_cube();
        assert_eq!(cube.vertices.len(), 24 * VERTEX_STRIDE);
        assert_eq!(cube.indices.len(), 36);
        for triangle in cube.indices.chunks_exact(3) {
            let corner = |i: u32| {
                let base = i as usize * VERTEX_STRIDE;
                Vec3::from_slice(&cube.vertices[base..base + 3])
            };
            let (a, b, c) = (corner(triangle[0]), corner(triangle[1]), corner(triangle[2]));
            let base = triangle[0] as usize * VERTEX_STRIDE;
            let normal = Vec3::from_slice(&cube.vertices[base + 3..base + 6]);
            let winding = (b - a).cross(c - a);
            assert!(winding.dot(normal) > 0.0);
            assert!((a.dot(normal) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn screen_quad_covers_clip_space() {
        assert_eq!(SCREEN_QUAD_VERTICES.len(), 6 * 4);
        for vertex in SCREEN_QUAD_VERTICES.chunks_exact(4) {
            assert_eq!(vertex[0].abs(), 1.0);
            assert_eq!(vertex[1].abs(), 1.0);
        }
    }

    #[test]
    fn scene_layout_matches_obj_stride() {
        assert_eq!(scene_vertex_layout().array_stride, 32);
        assert_eq!(SCENE_VERTEX_ATTRIBUTES[2].offset, 24);
    }
}
