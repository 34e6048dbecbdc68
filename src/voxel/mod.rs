//! # Voxel Module
//!
//! This module provides the core voxel value types shared by every other part
//! of the crate: the [`Voxel`] cell, the exact-equality [`Rgba`] palette color
//! and the [`DecodedModel`] contract produced by an external model decoder.
//!
//! ## Memory Layout
//!
//! A `Voxel` is three bytes (active flag, palette index, meshing scratch) and
//! is copied freely. Grids store voxels in a flat `Vec` in x-fastest order,
//! so a 64³ model costs under 800 KiB of voxel data regardless of shape.

use cgmath::{Point3, Vector3};

pub mod grid;

pub use grid::{SharedGrid, VoxelGrid};

/// A single cell of a voxel grid.
///
/// `active == false` means empty space. `color` indexes the owning grid's
/// palette. `face` is scratch space used by the greedy mesher to tag face
/// orientation while building slice masks; it is always `FACE_NONE` outside
/// of a meshing sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Voxel {
    /// Whether this cell contains matter.
    pub active: bool,
    /// Index into the owning grid's color palette.
    pub color: u8,
    /// Meshing scratch: face orientation tag (see `FACE_*` constants).
    pub face: u8,
}

/// No face recorded for this mask cell.
pub const FACE_NONE: u8 = 0;
/// Back face: the surface normal points toward the negative sweep axis.
pub const FACE_BACK: u8 = 1;
/// Front face: the surface normal points toward the positive sweep axis.
pub const FACE_FRONT: u8 = 2;

impl Voxel {
    /// Creates an active voxel with the given palette index.
    pub fn solid(color: u8) -> Self {
        Voxel {
            active: true,
            color,
            face: FACE_NONE,
        }
    }

    /// The canonical empty cell.
    pub fn empty() -> Self {
        Voxel::default()
    }
}

/// An RGBA color with exact byte equality, used for palette entries.
///
/// Palette deduplication and the painter's palette lookup both rely on exact
/// byte comparison, so palette colors are stored as `u8` channels rather than
/// floats.
#[repr(C)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    bytemuck::Pod,
    bytemuck::Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// An opaque color from byte channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgba([r, g, b, 255])
    }

    /// Converts to normalized float channels for vertex colors.
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.0[0] as f32 / 255.0,
            self.0[1] as f32 / 255.0,
            self.0[2] as f32 / 255.0,
            self.0[3] as f32 / 255.0,
        ]
    }

    /// Squared RGB distance to another color, used for nearest-color fallback
    /// when the palette is full.
    pub fn distance_sq(self, other: Rgba) -> i32 {
        let dr = self.0[0] as i32 - other.0[0] as i32;
        let dg = self.0[1] as i32 - other.0[1] as i32;
        let db = self.0[2] as i32 - other.0[2] as i32;
        dr * dr + dg * dg + db * db
    }
}

/// The shape of data an external model decoder yields for one sub-model:
/// a bounding size plus a flat list of voxel positions and colors.
///
/// The core never parses model files itself; a decoder collaborator produces
/// this structure and [`VoxelGrid::from_decoded_model`] consumes it.
#[derive(Debug, Clone)]
pub struct DecodedModel {
    /// Bounding size of the model in cells.
    pub size: Vector3<i32>,
    /// Source voxels as (possibly fractional) positions with their colors.
    pub voxels: Vec<(Point3<f32>, Rgba)>,
}

impl DecodedModel {
    /// Creates a decoded model from integer cell positions.
    pub fn from_cells(size: Vector3<i32>, cells: Vec<(Point3<i32>, Rgba)>) -> Self {
        DecodedModel {
            size,
            voxels: cells
                .into_iter()
                .map(|(p, c)| (Point3::new(p.x as f32, p.y as f32, p.z as f32), c))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_voxel_is_inactive() {
        let v = Voxel::empty();
        assert!(!v.active);
        assert_eq!(v.face, FACE_NONE);
    }

    #[test]
    fn color_distance_is_symmetric() {
        let a = Rgba::new(10, 20, 30);
        let b = Rgba::new(30, 20, 10);
        assert_eq!(a.distance_sq(b), b.distance_sq(a));
        assert_eq!(a.distance_sq(a), 0);
    }
}
