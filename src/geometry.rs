use std::f32::consts::{PI, TAU};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Number of `f32` values per interleaved vertex: position, normal, color.
pub const VERTEX_STRIDE: usize = 9;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier used by the renderer to cache GPU buffers per mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Axis aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bounds, point| {
            bounds.min = bounds.min.min(point);
            bounds.max = bounds.max.max(point);
            bounds
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Center of the box, or the origin for an empty box.
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }
}

/// GPU ready triangle mesh with interleaved `position.xyz`, `normal.xyz`
/// and `color.rgb` vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    id: MeshId,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl MeshData {
    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(
            vertices
                .chunks_exact(VERTEX_STRIDE)
                .map(|chunk| Vec3::from_slice(&chunk[0..3])),
        );
        Self {
            id: MeshId::next(),
            vertices,
            indices,
            bounds,
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Accumulates triangles from several sources into one interleaved buffer.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    vertices: Vec<f32>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / VERTEX_STRIDE) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends a primitive, transforming positions and normals by `transform`.
    ///
    /// Missing normals are left zeroed and filled in by [`MeshBuilder::build`].
    pub fn append(
        &mut self,
        transform: Mat4,
        positions: &[Vec3],
        normals: Option<&[Vec3]>,
        color: Vec3,
        indices: &[u32],
    ) {
        let base = self.vertex_count();
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        for (i, position) in positions.iter().enumerate() {
            let world = transform.transform_point3(*position);
            let normal = normals
                .and_then(|normals| normals.get(i))
                .map(|normal| (normal_matrix * *normal).normalize_or_zero())
                .unwrap_or(Vec3::ZERO);
            push_vertex(&mut self.vertices, world, normal, color);
        }
        self.indices
            .extend(indices.iter().map(|index| base + index));
    }

    pub fn build(self) -> MeshData {
        let mut vertices = self.vertices;
        if needs_normals(&vertices) {
            compute_normals(&mut vertices, &self.indices);
        }
        MeshData::new(vertices, self.indices)
    }
}

fn push_vertex(vertices: &mut Vec<f32>, position: Vec3, normal: Vec3, color: Vec3) {
    vertices.extend_from_slice(&[
        position.x, position.y, position.z, normal.x, normal.y, normal.z, color.x, color.y,
        color.z,
    ]);
}

fn needs_normals(vertices: &[f32]) -> bool {
    vertices
        .chunks_exact(VERTEX_STRIDE)
        .any(|chunk| chunk[3] == 0.0 && chunk[4] == 0.0 && chunk[5] == 0.0)
}

/// Fills zeroed normals with the average of the adjacent face normals.
fn compute_normals(vertices: &mut [f32], indices: &[u32]) {
    let vertex_count = vertices.len() / VERTEX_STRIDE;
    let mut accum = vec![Vec3::ZERO; vertex_count];
    let position = |vertices: &[f32], i: usize| {
        Vec3::from_slice(&vertices[i * VERTEX_STRIDE..i * VERTEX_STRIDE + 3])
    };

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0.max(i1).max(i2) >= vertex_count {
            continue;
        }
        let p0 = position(vertices, i0);
        let normal = (position(vertices, i1) - p0).cross(position(vertices, i2) - p0);
        if normal.length_squared() > f32::EPSILON {
            let normal = normal.normalize();
            accum[i0] += normal;
            accum[i1] += normal;
            accum[i2] += normal;
        }
    }

    for (i, normal) in accum.into_iter().enumerate() {
        let offset = i * VERTEX_STRIDE;
        let existing = Vec3::from_slice(&vertices[offset + 3..offset + 6]);
        if existing != Vec3::ZERO {
            continue;
        }
        let normal = normal.normalize_or_zero();
        vertices[offset + 3] = normal.x;
        vertices[offset + 4] = normal.y;
        vertices[offset + 5] = normal.z;
    }
}

/// Generates a UV sphere centered at the origin with outward normals.
pub fn uv_sphere(radius: f32, stacks: u32, slices: u32) -> MeshData {
    let stacks = stacks.max(2);
    let slices = slices.max(3);
    let mut vertices = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize * VERTEX_STRIDE);

    for stack in 0..=stacks {
        let phi = stack as f32 / stacks as f32 * PI;
        for slice in 0..=slices {
            let theta = slice as f32 / slices as f32 * TAU;
            let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
            push_vertex(&mut vertices, normal * radius, normal, Vec3::ONE);
        }
    }

    let ring = slices + 1;
    let mut indices = Vec::with_capacity((stacks * slices * 6) as usize);
    for stack in 0..stacks {
        for slice in 0..slices {
            let i0 = stack * ring + slice;
            let i1 = i0 + 1;
            let i2 = (stack + 1) * ring + slice;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    MeshData::new(vertices, indices)
}

/// Generates a plane in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let mut vertices = Vec::with_capacity(4 * VERTEX_STRIDE);
    for corner in [
        Vec3::new(-hw, -hh, 0.0),
        Vec3::new(hw, -hh, 0.0),
        Vec3::new(hw, hh, 0.0),
        Vec3::new(-hw, hh, 0.0),
    ] {
        push_vertex(&mut vertices, corner, Vec3::Z, Vec3::ONE);
    }
    MeshData::new(vertices, vec![0, 1, 2, 0, 2, 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_computes_missing_normals() {
        let mut builder = MeshBuilder::new();
        builder.append(
            Mat4::IDENTITY,
            &[Vec3::ZERO, Vec3::X, Vec3::Y],
            None,
            Vec3::ONE,
            &[0, 1, 2],
        );
        let mesh = builder.build();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        for chunk in mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            let normal = Vec3::from_slice(&chunk[3..6]);
            assert!((normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn builder_offsets_indices_and_bakes_transform() {
        let mut builder = MeshBuilder::new();
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];
        builder.append(Mat4::IDENTITY, &triangle, None, Vec3::ONE, &[0, 1, 2]);
        builder.append(
            Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0)),
            &triangle,
            None,
            Vec3::ONE,
            &[0, 1, 2],
        );
        let mesh = builder.build();
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.bounds.max, Vec3::new(1.0, 1.0, 4.0));
        assert_eq!(mesh.bounds.center(), Vec3::new(0.5, 0.5, 2.0));
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = uv_sphere(20.0, 8, 16);
        assert_eq!(mesh.triangle_count(), 8 * 16 * 2);
        for chunk in mesh.vertices.chunks_exact(VERTEX_STRIDE) {
            let position = Vec3::from_slice(&chunk[0..3]);
            assert!((position.length() - 20.0).abs() < 1e-3);
        }
    }

    #[test]
    fn empty_bounds_center_on_origin() {
        let bounds = Aabb::from_points(std::iter::empty());
        assert!(bounds.is_empty());
        assert_eq!(bounds.center(), Vec3::ZERO);
    }

    #[test]
    fn meshes_get_distinct_ids() {
        assert_ne!(plane(1.0, 1.0).id(), plane(1.0, 1.0).id());
    }
}
