//! # Compound Collider Module
//!
//! Approximates a voxel grid with a small set of axis-aligned boxes suitable
//! for a physics engine, and diffs successive box sets so unchanged boxes
//! keep their physical collider handles across rebuilds.
//!
//! ## Pipeline
//!
//! 1. [`OccupancyGrid::downsample`] collapses the grid to solid/empty cells
//!    at the configured level of detail.
//! 2. [`ColliderBaker`] covers the occupancy grid with greedy boxes, doubles
//!    the LOD when the box count overflows the cap, and applies the
//!    add/remove/reuse diff against the previous box set.
//!
//! The crate never talks to a physics engine itself; boxes are exposed as
//! [`ColliderBox`] values plus opaque [`ColliderHandle`]s the host maps onto
//! its own collider instances.

pub mod baker;
pub mod occupancy;

use cgmath::Vector3;

pub use baker::{BakeReport, ColliderBaker};
pub use occupancy::OccupancyGrid;

/// One axis-aligned box of a compound collider, in downsampled cell space.
///
/// Box identity for diffing is the exact tuple of all three fields: any
/// change in position, size or LOD makes a different box. There is no
/// geometric reuse via resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderBox {
    /// Min corner in downsampled cells.
    pub min: Vector3<i32>,
    /// Size in downsampled cells; each axis at least 1.
    pub size: Vector3<i32>,
    /// The LOD the box was baked at; converts cell space back to voxels.
    pub lod: i32,
}

impl ColliderBox {
    /// Number of downsampled cells the box covers.
    pub fn cell_volume(&self) -> i32 {
        self.size.x * self.size.y * self.size.z
    }

    /// Box center in source voxel coordinates.
    pub fn center_voxels(&self) -> Vector3<f32> {
        let lod = self.lod as f32;
        Vector3::new(
            (self.min.x as f32 + self.size.x as f32 / 2.0) * lod,
            (self.min.y as f32 + self.size.y as f32 / 2.0) * lod,
            (self.min.z as f32 + self.size.z as f32 / 2.0) * lod,
        )
    }
}

/// Opaque handle standing in for one physical collider owned by the host.
///
/// Handles released by a rebuild go to a reuse pool instead of being
/// retired, so hosts can recycle the underlying collider instance. Handle
/// identity is NOT stable across rebuilds even for boxes whose contents did
/// not change; consumers caching derived state must key off
/// [`ColliderBaker::build_version`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub u64);
