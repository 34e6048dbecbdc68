//! Mesh buffer recycling.
//!
//! Mesh regeneration is the crate's highest-frequency allocator: every
//! destruction produces at least one new vertex and index buffer. The pool
//! keeps released buffers around so their capacity is reused instead of
//! reallocated. Acquisition and release are confined to the single owning
//! cooperative thread, so no locking is involved.

use crate::meshing::VoxelMesh;

/// Pool of recycled mesh buffers.
#[derive(Debug)]
pub struct MeshPool {
    free: Vec<VoxelMesh>,
    max_pooled: usize,
}

impl MeshPool {
    /// Creates a pool that keeps at most `max_pooled` released meshes.
    pub fn new(max_pooled: usize) -> Self {
        MeshPool {
            free: Vec::new(),
            max_pooled,
        }
    }

    /// Takes a cleared mesh from the pool, or a fresh one when the pool is
    /// empty. The returned mesh has zero length but keeps its previous
    /// buffer capacity.
    pub fn acquire(&mut self) -> VoxelMesh {
        match self.free.pop() {
            Some(mut mesh) => {
                mesh.vertices.clear();
                mesh.indices.clear();
                mesh
            }
            None => VoxelMesh::new(),
        }
    }

    /// Returns a mesh to the pool; overflow beyond the cap is dropped.
    pub fn release(&mut self, mesh: VoxelMesh) {
        if self.free.len() < self.max_pooled {
            self.free.push(mesh);
        }
    }

    /// Number of meshes currently pooled.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }
}

impl Default for MeshPool {
    fn default() -> Self {
        MeshPool::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::MeshVertex;

    #[test]
    fn released_capacity_is_reused() {
        let mut pool = MeshPool::new(4);
        let mut mesh = pool.acquire();
        mesh.vertices.push(MeshVertex {
            position: [0.0; 3],
            normal: [0.0; 3],
            color: [0.0; 4],
        });
        let capacity = mesh.vertices.capacity();
        pool.release(mesh);

        let recycled = pool.acquire();
        assert!(recycled.is_empty());
        assert_eq!(recycled.vertices.capacity(), capacity);
    }

    #[test]
    fn pool_caps_at_its_limit() {
        let mut pool = MeshPool::new(1);
        pool.release(VoxelMesh::new());
        pool.release(VoxelMesh::new());
        assert_eq!(pool.pooled(), 1);
    }
}
