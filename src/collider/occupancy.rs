//! Level-of-detail occupancy downsampling.
//!
//! The box baker never works on the raw voxel grid: it first collapses the
//! grid into a coarse solid/empty occupancy grid at `ceil(dims / lod)`
//! resolution, then covers that with boxes. Storing one bit per cell keeps
//! even high-resolution occupancy grids cheap to rebuild every bake.

use bitvec::prelude::BitVec;
use cgmath::Vector3;

use crate::voxel::VoxelGrid;

/// A solid/empty grid downsampled from a voxel grid at a given LOD.
pub struct OccupancyGrid {
    cells: BitVec,
    /// Dimensions in downsampled cells.
    pub size: Vector3<i32>,
}

impl OccupancyGrid {
    /// Downsamples `grid` by the `lod` divisor.
    ///
    /// A downsampled cell is solid iff any active source voxel lies within
    /// its `lod x lod x lod` footprint; footprints at the far edges are
    /// clipped at the source bounds.
    ///
    /// # Arguments
    /// * `grid` - Source voxel grid
    /// * `lod` - Downsampling divisor; must be at least 1
    pub fn downsample(grid: &VoxelGrid, lod: i32) -> Self {
        debug_assert!(lod >= 1);
        let size = Vector3::new(
            div_ceil(grid.size.x, lod),
            div_ceil(grid.size.y, lod),
            div_ceil(grid.size.z, lod),
        );
        let mut cells = BitVec::repeat(false, (size.x * size.y * size.z) as usize);

        for cz in 0..size.z {
            for cy in 0..size.y {
                for cx in 0..size.x {
                    if footprint_has_active(grid, cx, cy, cz, lod) {
                        let index = (cx + size.x * (cy + size.y * cz)) as usize;
                        cells.set(index, true);
                    }
                }
            }
        }

        OccupancyGrid { cells, size }
    }

    /// Returns true if the downsampled cell is solid; out-of-bounds cells
    /// are empty.
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        if x < 0 || y < 0 || z < 0 || x >= self.size.x || y >= self.size.y || z >= self.size.z {
            return false;
        }
        self.cells[(x + self.size.x * (y + self.size.y * z)) as usize]
    }

    /// Number of solid cells.
    pub fn solid_count(&self) -> usize {
        self.cells.count_ones()
    }
}

fn div_ceil(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}

/// Scans one footprint of the source grid, clipped at the source bounds.
fn footprint_has_active(grid: &VoxelGrid, cx: i32, cy: i32, cz: i32, lod: i32) -> bool {
    let x0 = cx * lod;
    let y0 = cy * lod;
    let z0 = cz * lod;
    let x1 = (x0 + lod).min(grid.size.x);
    let y1 = (y0 + lod).min(grid.size.y);
    let z1 = (z0 + lod).min(grid.size.z);

    for z in z0..z1 {
        for y in y0..y1 {
            for x in x0..x1 {
                if grid.voxels[grid.index(x, y, z)].active {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::{Rgba, Voxel};

    #[test]
    fn lod_one_mirrors_the_grid() {
        let mut grid = VoxelGrid::empty(Vector3::new(3, 3, 3), vec![Rgba::new(0, 0, 0)]);
        grid.set_at(1, 2, 0, Voxel::solid(0));

        let occupancy = OccupancyGrid::downsample(&grid, 1);
        assert_eq!(occupancy.size, grid.size);
        assert_eq!(occupancy.solid_count(), 1);
        assert!(occupancy.is_solid(1, 2, 0));
    }

    #[test]
    fn edge_footprints_are_clipped() {
        // 3^3 grid at LOD 2 downsamples to 2^3; the far cells cover a
        // clipped 1-wide footprint.
        let mut grid = VoxelGrid::empty(Vector3::new(3, 3, 3), vec![Rgba::new(0, 0, 0)]);
        grid.set_at(2, 2, 2, Voxel::solid(0));

        let occupancy = OccupancyGrid::downsample(&grid, 2);
        assert_eq!(occupancy.size, Vector3::new(2, 2, 2));
        assert_eq!(occupancy.solid_count(), 1);
        assert!(occupancy.is_solid(1, 1, 1));
        assert!(!occupancy.is_solid(0, 0, 0));
    }

    #[test]
    fn any_active_voxel_makes_a_cell_solid() {
        let mut grid = VoxelGrid::empty(Vector3::new(4, 4, 4), vec![Rgba::new(0, 0, 0)]);
        grid.set_at(1, 0, 0, Voxel::solid(0));

        let occupancy = OccupancyGrid::downsample(&grid, 2);
        assert!(occupancy.is_solid(0, 0, 0));
    }

    #[test]
    fn out_of_bounds_cells_read_empty() {
        let grid = VoxelGrid::empty(Vector3::new(2, 2, 2), Vec::new());
        let occupancy = OccupancyGrid::downsample(&grid, 1);
        assert!(!occupancy.is_solid(-1, 0, 0));
        assert!(!occupancy.is_solid(0, 0, 2));
    }
}
