//! # Isolation Module
//!
//! Detects disconnected voxel clusters in a grid and extracts every
//! non-dominant cluster into its own independent grid, so detached pieces of
//! a destroyed object can become free-standing fragment objects.
//!
//! ## Algorithm
//!
//! A flood fill with 6-connectivity (face adjacency) walks all active,
//! unvisited voxels in grid index order and collects each connected cluster
//! as an index set. The largest cluster (ties broken by first found) stays in
//! the source grid; every other cluster is copied into a new grid sized to
//! its axis-aligned bounding box and cleared from the source. The bounding
//! box min corner is returned as the fragment's local offset so the caller
//! can place its transform correctly.
//!
//! Neighbor visitation order does not affect the resulting partition
//! (6-connected components are order independent); it only decides which
//! index happens to be found first inside a cluster.

use std::collections::VecDeque;

use bitvec::prelude::BitVec;
use cgmath::Vector3;
use log::debug;

use crate::voxel::{Voxel, VoxelGrid};

/// A cluster extracted from a source grid.
#[derive(Debug, Clone)]
pub struct ExtractedFragment {
    /// The cluster's voxels in a grid sized to its bounding box.
    pub grid: VoxelGrid,
    /// Bounding-box min corner in the source grid's cell space.
    pub offset: Vector3<i32>,
}

/// Splits `grid` into its dominant cluster plus extracted fragments.
///
/// The dominant (largest) cluster is left in place; every other cluster is
/// cleared from `grid` and returned as an [`ExtractedFragment`]. Clusters
/// smaller than `min_fragment_voxels` are cleared without producing a
/// fragment. An empty grid, or a grid whose active voxels form a single
/// cluster, is left untouched and yields no fragments.
///
/// Active voxels are redistributed, never lost: the source's active count
/// before the call equals the source's count afterwards plus the counts of
/// all extracted fragments and discarded small clusters.
pub fn isolate_clusters(grid: &mut VoxelGrid, min_fragment_voxels: usize) -> Vec<ExtractedFragment> {
    if grid.is_empty() {
        return Vec::new();
    }

    let mut visited: BitVec = BitVec::repeat(false, grid.volume());
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut largest_index = 0usize;
    let mut largest_len = 0usize;

    for start in 0..grid.voxels.len() {
        if visited[start] || !grid.voxels[start].active {
            continue;
        }

        let cluster = flood_fill(grid, start, &mut visited);
        if cluster.len() > largest_len {
            largest_len = cluster.len();
            largest_index = clusters.len();
        }
        clusters.push(cluster);
    }

    if clusters.len() <= 1 {
        return Vec::new();
    }

    debug!(
        "isolation found {} clusters, dominant has {} voxels",
        clusters.len(),
        largest_len
    );

    let mut fragments = Vec::new();
    for (i, cluster) in clusters.into_iter().enumerate() {
        if i == largest_index {
            continue;
        }

        if cluster.len() < min_fragment_voxels {
            for index in cluster {
                grid.voxels[index] = Voxel::empty();
            }
            continue;
        }

        fragments.push(extract_cluster(grid, &cluster));
    }

    fragments
}

/// Collects the connected cluster containing `start` via breadth-first
/// flood fill over face-adjacent active voxels.
fn flood_fill(grid: &VoxelGrid, start: usize, visited: &mut BitVec) -> Vec<usize> {
    let mut cluster = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited.set(start, true);

    while let Some(index) = queue.pop_front() {
        cluster.push(index);
        let (x, y, z) = grid.coords_of(index);

        for (dx, dy, dz) in [
            (1, 0, 0),
            (-1, 0, 0),
            (0, 1, 0),
            (0, -1, 0),
            (0, 0, 1),
            (0, 0, -1),
        ] {
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            if !grid.in_bounds(nx, ny, nz) {
                continue;
            }

            let neighbor = grid.index(nx, ny, nz);
            if visited[neighbor] || !grid.voxels[neighbor].active {
                continue;
            }

            visited.set(neighbor, true);
            queue.push_back(neighbor);
        }
    }

    cluster
}

/// Copies a cluster into a bounding-box-sized grid and clears it from the
/// source.
fn extract_cluster(grid: &mut VoxelGrid, cluster: &[usize]) -> ExtractedFragment {
    let (min, max) = grid
        .bounds_of_indices(cluster)
        .expect("cluster is never empty");
    let size = max - min + Vector3::new(1, 1, 1);
    let mut fragment = VoxelGrid::empty(size, grid.palette.clone());

    for &index in cluster {
        let (x, y, z) = grid.coords_of(index);
        let mut voxel = grid.voxels[index];
        voxel.active = true;

        let local = fragment.index(x - min.x, y - min.y, z - min.z);
        fragment.voxels[local] = voxel;

        grid.voxels[index] = Voxel::empty();
    }

    ExtractedFragment {
        grid: fragment,
        offset: min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::Rgba;

    fn grid_with_two_clusters() -> VoxelGrid {
        // 2x2x2 block at the origin plus an isolated voxel at (3,3,3),
        // minus one corner so the block has 7 voxels.
        let mut grid = VoxelGrid::empty(Vector3::new(4, 4, 4), vec![Rgba::new(255, 255, 255)]);
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    grid.set_at(x, y, z, Voxel::solid(0));
                }
            }
        }
        grid.set_at(1, 1, 1, Voxel::empty());
        grid.set_at(3, 3, 3, Voxel::solid(0));
        grid
    }

    #[test]
    fn single_cluster_is_a_no_op() {
        let mut grid = VoxelGrid::empty(Vector3::new(3, 3, 3), vec![Rgba::new(1, 1, 1)]);
        for x in 0..3 {
            grid.set_at(x, 0, 0, Voxel::solid(0));
        }
        let before = grid.clone();
        let fragments = isolate_clusters(&mut grid, 0);
        assert!(fragments.is_empty());
        assert_eq!(grid, before);
    }

    #[test]
    fn empty_grid_is_a_no_op() {
        let mut grid = VoxelGrid::empty(Vector3::new(2, 2, 2), Vec::new());
        assert!(isolate_clusters(&mut grid, 0).is_empty());
    }

    #[test]
    fn secondary_cluster_is_extracted_with_offset() {
        let mut grid = grid_with_two_clusters();
        let fragments = isolate_clusters(&mut grid, 0);

        assert_eq!(fragments.len(), 1);
        let fragment = &fragments[0];
        assert_eq!(fragment.grid.size, Vector3::new(1, 1, 1));
        assert_eq!(fragment.offset, Vector3::new(3, 3, 3));
        assert_eq!(fragment.grid.active_count(), 1);

        // The dominant 7-voxel cluster stays in the source.
        assert_eq!(grid.active_count(), 7);
        assert!(!grid.voxel_at(3, 3, 3).active);
    }

    #[test]
    fn active_voxels_are_conserved() {
        let mut grid = grid_with_two_clusters();
        let before = grid.active_count();
        let fragments = isolate_clusters(&mut grid, 0);
        let after: usize = grid.active_count()
            + fragments.iter().map(|f| f.grid.active_count()).sum::<usize>();
        assert_eq!(before, after);
    }

    #[test]
    fn small_clusters_are_discarded_below_threshold() {
        let mut grid = grid_with_two_clusters();
        let fragments = isolate_clusters(&mut grid, 2);
        assert!(fragments.is_empty());
        // The single stray voxel was cleared, not spawned.
        assert_eq!(grid.active_count(), 7);
    }

    #[test]
    fn fragment_mesh_bounds_match_cluster_bounds() {
        use crate::meshing::mesh_grid;

        let mut grid = grid_with_two_clusters();
        let fragments = isolate_clusters(&mut grid, 0);
        let fragment = &fragments[0];

        let voxel_size = 2.0;
        let mesh = mesh_grid(&fragment.grid, voxel_size);
        let (min, max) = mesh.bounds().unwrap();

        // A 1x1x1 fragment spans one cell: half-offset surfaces at
        // -0.5 and +0.5 cells, scaled by voxel size.
        assert_eq!(min, cgmath::Point3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, cgmath::Point3::new(1.0, 1.0, 1.0));
        let span = max - min;
        assert_eq!(
            span,
            cgmath::Vector3::new(
                fragment.grid.size.x as f32 * voxel_size,
                fragment.grid.size.y as f32 * voxel_size,
                fragment.grid.size.z as f32 * voxel_size,
            )
        );
    }
}
