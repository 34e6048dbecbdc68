//! # Meshing Module
//!
//! Converts a voxel grid into a renderable triangle mesh.
//!
//! The mesher implements binary greedy meshing: for every slice boundary
//! along each axis it builds a 2D mask of exposed faces, merges identical
//! mask cells into maximal rectangles, and emits one quad per rectangle.
//! Adjacent coplanar faces with the same palette color and orientation
//! collapse into a single quad, which keeps triangle counts low even for
//! large flat surfaces.
//!
//! ## Multi-frame operation
//!
//! Meshing a large grid is too expensive to finish inside one frame of a
//! cooperative host loop, so the algorithm is exposed as a [`MeshJob`] that
//! is polled once per tick: each poll runs one axis sweep, and a final poll
//! assembles the vertex and index buffers. [`mesh_grid`] wraps the job to
//! completion for callers that do not need time slicing.

pub mod greedy;
pub mod mesh;

pub use greedy::{mesh_grid, MeshJob, MeshJobProgress};
pub use mesh::{MeshVertex, VoxelMesh};
