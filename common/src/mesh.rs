//! Unit primitive meshes for instanced drawing.

use std::f32::consts::{PI, TAU};

use crate::scene::MeshKind;

/// Mesh vertex with position and normal
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn for_kind(kind: MeshKind) -> Self {
        match kind {
            MeshKind::Sphere => Self::sphere(16, 24),
            MeshKind::Cube => Self::cube(),
            MeshKind::Cylinder => Self::cylinder(24),
            MeshKind::Plane => Self::plane(),
        }
    }

    fn quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3]) {
        let base = self.vertices.len() as u32;
        self.vertices
            .extend(corners.iter().map(|&c| MeshVertex::new(c, normal)));
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Unit sphere from latitude/longitude bands.
    pub fn sphere(stacks: u32, slices: u32) -> Self {
        let mut mesh = Self::default();
        for i in 0..=stacks {
            let theta = PI * i as f32 / stacks as f32;
            let (sin_t, cos_t) = theta.sin_cos();
            for j in 0..=slices {
                let phi = TAU * j as f32 / slices as f32;
                let (sin_p, cos_p) = phi.sin_cos();
                let p = [sin_t * cos_p, sin_t * sin_p, cos_t];
                mesh.vertices.push(MeshVertex::new(p, p));
            }
        }
        let row = slices + 1;
        for i in 0..stacks {
            for j in 0..slices {
                let a = i * row + j;
                let b = a + row;
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        mesh
    }

    /// Cube spanning `[-1, 1]`, one quad per face so normals stay flat.
    pub fn cube() -> Self {
        let mut mesh = Self::default();
        for axis in 0..3 {
            for sign in [1.0f32, -1.0] {
                let mut normal = [0.0; 3];
                normal[axis] = sign;
                let u = (axis + 1) % 3;
                let v = (axis + 2) % 3;
                let corner = |a: f32, b: f32| {
                    let mut p = [0.0; 3];
                    p[axis] = sign;
                    p[u] = a;
                    p[v] = b * sign;
                    p
                };
                mesh.quad(
                    [corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)],
                    normal,
                );
            }
        }
        mesh
    }

    /// Cylinder of radius 1 along Z from -1 to 1, with caps.
    pub fn cylinder(slices: u32) -> Self {
        let mut mesh = Self::default();
        for j in 0..slices {
            let a0 = TAU * j as f32 / slices as f32;
            let a1 = TAU * (j + 1) as f32 / slices as f32;
            let (s0, c0) = a0.sin_cos();
            let (s1, c1) = a1.sin_cos();

            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(&[
                MeshVertex::new([c0, s0, -1.0], [c0, s0, 0.0]),
                MeshVertex::new([c1, s1, -1.0], [c1, s1, 0.0]),
                MeshVertex::new([c1, s1, 1.0], [c1, s1, 0.0]),
                MeshVertex::new([c0, s0, 1.0], [c0, s0, 0.0]),
            ]);
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);

            for z in [1.0f32, -1.0] {
                let base = mesh.vertices.len() as u32;
                let n = [0.0, 0.0, z];
                mesh.vertices.extend_from_slice(&[
                    MeshVertex::new([0.0, 0.0, z], n),
                    MeshVertex::new([c0, s0, z], n),
                    MeshVertex::new([c1, s1, z], n),
                ]);
                if z > 0.0 {
                    mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
                } else {
                    mesh.indices.extend_from_slice(&[base, base + 2, base + 1]);
                }
            }
        }
        mesh
    }

    /// Quad spanning `[-1, 1]` in XY facing +Z.
    pub fn plane() -> Self {
        let mut mesh = Self::default();
        mesh.quad(
            [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]],
            [0.0, 0.0, 1.0],
        );
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(mesh: &MeshData) {
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_all_meshes_are_indexed_triangles() {
        for kind in MeshKind::ALL {
            assert_valid(&MeshData::for_kind(kind));
        }
    }

    #[test]
    fn test_sphere_vertices_on_unit_sphere() {
        let mesh = MeshData::sphere(8, 12);
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        let mesh = MeshData::cube();
        assert_eq!(mesh.vertices.len(), 24);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| glam::Vec3::from(mesh.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a);
            let normal = glam::Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(normal) > 0.0);
        }
    }
}
