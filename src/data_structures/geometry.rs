//! CPU-side mesh data and the primitive shapes used by the scene.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3, VectorSpace};

use crate::data_structures::model::ModelVertex;

/// Indexed triangle list, not yet uploaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Area-weighted vertex normals, for meshes that come without any.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vector3::new(0.0_f32, 0.0, 0.0); self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa: Vector3<f32> = self.vertices[a].position.into();
            let pb: Vector3<f32> = self.vertices[b].position.into();
            let pc: Vector3<f32> = self.vertices[c].position.into();
            let face = (pb - pa).cross(pc - pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            if normal.magnitude2() > 0.0 {
                vertex.normal = normal.normalize().into();
            }
        }
    }
}

/// A flat quad in the xy plane facing +z, centred on the origin.
pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let grid_x = width_segments.max(1);
    let grid_y = height_segments.max(1);
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;

    let mut vertices = Vec::with_capacity(((grid_x + 1) * (grid_y + 1)) as usize);
    for iy in 0..=grid_y {
        let y = iy as f32 * segment_height - height / 2.0;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_width - width / 2.0;
            vertices.push(ModelVertex {
                position: [x, -y, 0.0],
                tex_coords: [ix as f32 / grid_x as f32, iy as f32 / grid_y as f32],
                normal: [0.0, 0.0, 1.0],
            });
        }
    }

    let row = grid_x + 1;
    let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + row * iy;
            let b = ix + row * (iy + 1);
            let c = (ix + 1) + row * (iy + 1);
            let d = (ix + 1) + row * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    MeshData { vertices, indices }
}

#[rustfmt::skip]
const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
    [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
    [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
    [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
];

fn icosahedron_corners() -> [Vector3<f32>; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vector3::new(-1.0, t, 0.0),
        Vector3::new(1.0, t, 0.0),
        Vector3::new(-1.0, -t, 0.0),
        Vector3::new(1.0, -t, 0.0),
        Vector3::new(0.0, -1.0, t),
        Vector3::new(0.0, 1.0, t),
        Vector3::new(0.0, -1.0, -t),
        Vector3::new(0.0, 1.0, -t),
        Vector3::new(t, 0.0, -1.0),
        Vector3::new(t, 0.0, 1.0),
        Vector3::new(-t, 0.0, -1.0),
        Vector3::new(-t, 0.0, 1.0),
    ]
}

/// Splits one icosahedron face into `(detail + 1)^2` triangles.
fn subdivide_face(
    a: Vector3<f32>,
    b: Vector3<f32>,
    c: Vector3<f32>,
    detail: u32,
    out: &mut Vec<[Vector3<f32>; 3]>,
) {
    let cols = detail as usize + 1;
    let mut grid: Vec<Vec<Vector3<f32>>> = Vec::with_capacity(cols + 1);
    for i in 0..=cols {
        let t = i as f32 / cols as f32;
        let aj = a.lerp(c, t);
        let bj = b.lerp(c, t);
        let rows = cols - i;
        let row = (0..=rows)
            .map(|j| {
                if rows == 0 {
                    aj
                } else {
                    aj.lerp(bj, j as f32 / rows as f32)
                }
            })
            .collect();
        grid.push(row);
    }

    for i in 0..cols {
        for j in 0..(2 * (cols - i) - 1) {
            let k = j / 2;
            if j % 2 == 0 {
                out.push([grid[i][k + 1], grid[i + 1][k], grid[i][k]]);
            } else {
                out.push([grid[i][k + 1], grid[i + 1][k + 1], grid[i + 1][k]]);
            }
        }
    }
}

/// A geodesic sphere: an icosahedron subdivided `detail` times and projected
/// onto a sphere of `radius`. Detail 0 keeps faceted normals, anything above
/// uses smooth ones.
pub fn icosahedron(radius: f32, detail: u32) -> MeshData {
    let corners = icosahedron_corners();
    let mut triangles = Vec::with_capacity(20 * (detail as usize + 1).pow(2));
    for [a, b, c] in ICOSAHEDRON_FACES {
        subdivide_face(corners[a], corners[b], corners[c], detail, &mut triangles);
    }

    let mut vertices = Vec::with_capacity(triangles.len() * 3);
    for triangle in triangles {
        let projected = triangle.map(|v| v.normalize());
        let face_normal = (projected[1] - projected[0])
            .cross(projected[2] - projected[0])
            .normalize();
        for unit in projected {
            let normal = if detail == 0 { face_normal } else { unit };
            vertices.push(ModelVertex {
                position: (unit * radius).into(),
                tex_coords: spherical_uv(unit),
                normal: normal.into(),
            });
        }
    }
    let indices = (0..vertices.len() as u32).collect();

    MeshData { vertices, indices }
}

fn spherical_uv(unit: Vector3<f32>) -> [f32; 2] {
    let u = unit.z.atan2(-unit.x) / (2.0 * PI) + 0.5;
    let v = 0.5 - unit.y.clamp(-1.0, 1.0).asin() / PI;
    [u, v]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_has_grid_vertices_and_two_triangles_per_cell() {
        let mesh = plane(10.0, 10.0, 4, 4);
        assert_eq!(mesh.vertices.len(), 25);
        assert_eq!(mesh.triangle_count(), 32);
        let xs = mesh.vertices.iter().map(|v| v.position[0]);
        let (min, max) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
        assert_eq!((min, max), (-5.0, 5.0));
    }

    #[test]
    fn plane_winding_faces_positive_z() {
        let mesh = plane(15.0, 52.0, 4, 4);
        let tri = &mesh.indices[0..3];
        let p = |i: u32| Vector3::from(mesh.vertices[i as usize].position);
        let normal = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
        assert!(normal.z > 0.0);
    }

    #[test]
    fn icosahedron_detail_one_has_eighty_faces_on_the_sphere() {
        let mesh = icosahedron(15.0, 1);
        assert_eq!(mesh.triangle_count(), 80);
        assert_eq!(mesh.vertices.len(), 240);
        for vertex in &mesh.vertices {
            let length = Vector3::from(vertex.position).magnitude();
            assert!((length - 15.0).abs() < 1e-3);
        }
    }

    #[test]
    fn icosahedron_faces_point_outwards() {
        let mesh = icosahedron(1.0, 0);
        for tri in mesh.indices.chunks_exact(3) {
            let p = |i: u32| Vector3::from(mesh.vertices[i as usize].position);
            let centroid = (p(tri[0]) + p(tri[1]) + p(tri[2])) / 3.0;
            let normal = Vector3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn computed_normals_match_plane_normal() {
        let mut mesh = plane(2.0, 2.0, 1, 1);
        mesh.vertices.iter_mut().for_each(|v| v.normal = [0.0; 3]);
        mesh.compute_normals();
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }
}
