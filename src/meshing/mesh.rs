//! Mesh data structures produced by the greedy mesher.
//!
//! The vertex layout is GPU-friendly and host-agnostic: position, normal and
//! flat vertex color, all as plain floats, `Pod` so hosts can upload the
//! buffers directly.

use cgmath::Point3;

/// A single vertex of a generated voxel surface mesh.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Color: [f32; 4] (16 bytes)
///
/// Total size: 40 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Position in the object's local space, already scaled by voxel size.
    pub position: [f32; 3],
    /// Unit face normal; identical for all four vertices of a quad.
    pub normal: [f32; 3],
    /// Flat-shaded palette color of the represented voxel.
    pub color: [f32; 4],
}

/// A triangle mesh generated from a voxel grid.
///
/// An empty or fully-inactive grid yields a mesh with zero vertices; that is
/// a valid result, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoxelMesh {
    /// Vertex buffer; four vertices per merged quad.
    pub vertices: Vec<MeshVertex>,
    /// Index buffer; six indices (two triangles) per merged quad.
    pub indices: Vec<u32>,
}

impl VoxelMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        VoxelMesh::default()
    }

    /// Returns true if the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounding box of the mesh as `(min, max)`, or `None` for
    /// an empty mesh. Used for pivot placement and fallback box colliders.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = self.vertices.first()?;
        let mut min = Point3::from(first.position);
        let mut max = min;

        for vertex in &self.vertices[1..] {
            let p = vertex.position;
            min.x = min.x.min(p[0]);
            min.y = min.y.min(p[1]);
            min.z = min.z.min(p[2]);
            max.x = max.x.max(p[0]);
            max.y = max.y.max(p[1]);
            max.z = max.z.max(p[2]);
        }

        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(VoxelMesh::new().bounds().is_none());
        assert_eq!(VoxelMesh::new().triangle_count(), 0);
    }
}
