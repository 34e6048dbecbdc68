//! # Voxel Grid
//!
//! The dense 3D voxel container every component of the crate operates on.
//!
//! ## Storage
//!
//! Voxels live in a flat `Vec<Voxel>` of length `size.x * size.y * size.z`
//! with x varying fastest: `index = x + size.x * (y + size.y * z)`. The
//! palette is an ordered list of up to [`MAX_PALETTE_LEN`] deduplicated
//! colors, indexed by each voxel's `color` byte.
//!
//! ## Ownership and copy-on-write
//!
//! Grids are handed around as [`SharedGrid`] (`Arc<VoxelGrid>`). Mutating
//! paths call `Arc::make_mut`, which clones the grid lazily exactly when
//! another live owner still aliases the same data, for example when a cached
//! model grid has been assigned to several objects and one of them is about
//! to be painted. Dimensions never change after construction; extraction and
//! fragmentation allocate brand-new grids.

use std::sync::Arc;

use cgmath::Vector3;
use log::warn;

use super::{DecodedModel, Rgba, Voxel};

/// Maximum number of palette entries; voxels index the palette with a `u8`.
pub const MAX_PALETTE_LEN: usize = 256;

/// A shared, copy-on-write handle to a voxel grid.
pub type SharedGrid = Arc<VoxelGrid>;

/// A dense 3D grid of voxels plus its color palette.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    /// Flat voxel storage, `size.x * size.y * size.z` entries, x fastest.
    pub voxels: Vec<Voxel>,
    /// Ordered, deduplicated palette referenced by `Voxel::color`.
    pub palette: Vec<Rgba>,
    /// Grid dimensions in cells.
    pub size: Vector3<i32>,
}

impl VoxelGrid {
    /// Creates a grid of empty voxels with the given palette.
    ///
    /// # Arguments
    /// * `size` - Grid dimensions; each axis must be positive
    /// * `palette` - Palette shared by all voxels of the grid
    pub fn empty(size: Vector3<i32>, palette: Vec<Rgba>) -> Self {
        debug_assert!(size.x > 0 && size.y > 0 && size.z > 0);
        VoxelGrid {
            voxels: vec![Voxel::empty(); (size.x * size.y * size.z) as usize],
            palette,
            size,
        }
    }

    /// Builds a grid from a decoded external model.
    ///
    /// The palette is allocated from the distinct colors encountered, in
    /// first-seen order, capped at [`MAX_PALETTE_LEN`] entries (later colors
    /// reuse the nearest existing entry). Every source voxel is mapped to the
    /// cell containing it (floor of its fractional position) and marked
    /// active; out-of-bounds source voxels are silently dropped.
    pub fn from_decoded_model(model: &DecodedModel) -> Self {
        let size = model.size;
        let mut grid = VoxelGrid::empty(size, Vec::new());

        for (position, color) in &model.voxels {
            let x = position.x.floor() as i32;
            let y = position.y.floor() as i32;
            let z = position.z.floor() as i32;

            if !grid.in_bounds(x, y, z) {
                continue;
            }

            let color_index = match grid.palette.iter().position(|c| c == color) {
                Some(i) => i as u8,
                None if grid.palette.len() < MAX_PALETTE_LEN => {
                    grid.palette.push(*color);
                    (grid.palette.len() - 1) as u8
                }
                None => {
                    warn!("palette overflow while decoding model, reusing nearest color");
                    nearest_palette_index(&grid.palette, *color)
                }
            };

            let index = grid.index(x, y, z);
            grid.voxels[index] = Voxel::solid(color_index);
        }

        grid
    }

    /// Generates a grid with randomly scattered solid voxels (test helper).
    #[allow(dead_code)]
    pub fn random(size: Vector3<i32>, fill_chance: f64) -> Self {
        let mut grid = VoxelGrid::empty(size, vec![Rgba::new(128, 128, 128)]);
        for voxel in grid.voxels.iter_mut() {
            if fastrand::f64() < fill_chance {
                *voxel = Voxel::solid(0);
            }
        }
        grid
    }

    /// The total number of cells in the grid.
    pub fn volume(&self) -> usize {
        (self.size.x * self.size.y * self.size.z) as usize
    }

    /// Returns true if the coordinates lie inside the grid.
    pub fn in_bounds(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && y >= 0 && z >= 0 && x < self.size.x && y < self.size.y && z < self.size.z
    }

    /// Flat index of a cell. No bounds check; callers on hot paths are
    /// responsible for staying inside the grid.
    pub fn index(&self, x: i32, y: i32, z: i32) -> usize {
        (x + self.size.x * (y + self.size.y * z)) as usize
    }

    /// Inverse of [`VoxelGrid::index`].
    pub fn coords_of(&self, index: usize) -> (i32, i32, i32) {
        let index = index as i32;
        let x = index % self.size.x;
        let rest = index / self.size.x;
        let y = rest % self.size.y;
        let z = rest / self.size.y;
        (x, y, z)
    }

    /// Returns the voxel at the given coordinates, or an empty voxel when out
    /// of bounds. Boundary cells outside the grid are treated as empty space
    /// by the mesher and the flood fill alike.
    pub fn voxel_at(&self, x: i32, y: i32, z: i32) -> Voxel {
        if !self.in_bounds(x, y, z) {
            return Voxel::empty();
        }
        self.voxels[self.index(x, y, z)]
    }

    /// Writes a voxel at the given coordinates; out-of-bounds writes are
    /// ignored.
    pub fn set_at(&mut self, x: i32, y: i32, z: i32, voxel: Voxel) {
        if !self.in_bounds(x, y, z) {
            return;
        }
        let index = self.index(x, y, z);
        self.voxels[index] = voxel;
    }

    /// Counts active voxels with a full scan.
    ///
    /// This is O(volume) and therefore expensive for large grids; prefer
    /// [`VoxelGrid::active_count_exceeds`] when only a threshold matters.
    pub fn active_count(&self) -> usize {
        self.voxels.iter().filter(|v| v.active).count()
    }

    /// Returns true if strictly more than `threshold` voxels are active,
    /// short-circuiting as soon as the threshold is crossed.
    pub fn active_count_exceeds(&self, threshold: usize) -> bool {
        let mut count = 0;
        for voxel in &self.voxels {
            if voxel.active {
                count += 1;
                if count > threshold {
                    return true;
                }
            }
        }
        false
    }

    /// Returns true if no voxel is active, short-circuiting on the first
    /// active cell.
    pub fn is_empty(&self) -> bool {
        !self.voxels.iter().any(|v| v.active)
    }

    /// Axis-aligned bounding box of the given cell indices, as
    /// `(min, max)` inclusive. Returns `None` for an empty index set.
    pub fn bounds_of_indices(&self, indices: &[usize]) -> Option<(Vector3<i32>, Vector3<i32>)> {
        let mut iter = indices.iter();
        let first = *iter.next()?;
        let (x, y, z) = self.coords_of(first);
        let mut min = Vector3::new(x, y, z);
        let mut max = min;

        for &index in iter {
            let (x, y, z) = self.coords_of(index);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        }

        Some((min, max))
    }
}

/// Index of the palette entry closest to `color` by squared RGB distance.
/// Falls back to 0 for an empty palette.
pub fn nearest_palette_index(palette: &[Rgba], color: Rgba) -> u8 {
    let mut closest = 0u8;
    let mut closest_distance = i32::MAX;

    for (i, candidate) in palette.iter().enumerate() {
        let distance = candidate.distance_sq(color);
        if distance < closest_distance {
            closest_distance = distance;
            closest = i as u8;
        }
    }

    closest
}
