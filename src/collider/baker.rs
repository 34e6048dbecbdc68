//! Greedy box cover and incremental rebuild state.
//!
//! The cover is a run-length-then-expand heuristic: for each unvisited solid
//! cell in scan order (x fastest, then y, then z) a box grows maximally
//! along X, then along Y while the entire X run at the next row stays solid
//! and unvisited, then along Z while the entire X by Y rectangle at the next
//! layer does. Ties and boundary cases resolve by scan order; the result is
//! deterministic but not a minimum-box-count optimum.

use std::collections::HashMap;

use bitvec::prelude::BitVec;
use log::{debug, warn};

use super::occupancy::OccupancyGrid;
use super::{ColliderBox, ColliderHandle};
use crate::settings::CompoundColliderSettings;
use crate::voxel::VoxelGrid;
use cgmath::Vector3;

/// What one rebuild changed, for host-side profiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeReport {
    /// Boxes instantiated by this rebuild.
    pub added: usize,
    /// Boxes released to the handle pool by this rebuild.
    pub removed: usize,
    /// Boxes left completely untouched.
    pub reused: usize,
    /// The LOD the final box set was baked at, after any overflow doubling.
    pub lod: i32,
}

/// Incremental compound-collider state for one voxel object.
///
/// Holds the current box set with its collider handles, the handle reuse
/// pool, the monotonic build version, the runtime-rebuild latch and the
/// rebuild cooldown clock.
#[derive(Debug, Default)]
pub struct ColliderBaker {
    boxes: HashMap<ColliderBox, ColliderHandle>,
    pool: Vec<ColliderHandle>,
    next_handle: u64,
    build_version: u64,
    runtime_rebuild_disabled: bool,
    last_rebuild_tick: Option<u64>,
}

impl ColliderBaker {
    /// Creates an empty baker with no boxes and version zero.
    pub fn new() -> Self {
        ColliderBaker::default()
    }

    /// Monotonic counter bumped by every applied rebuild (including pure
    /// reuse and empty-grid clears). Consumers caching derived state must
    /// treat any change as "stale, recompute"; box handle identity is not
    /// stable across versions even when contents are unchanged.
    pub fn build_version(&self) -> u64 {
        self.build_version
    }

    /// The current box set with its handles, in no particular order.
    pub fn boxes(&self) -> impl Iterator<Item = (&ColliderBox, ColliderHandle)> {
        self.boxes.iter().map(|(b, &h)| (b, h))
    }

    /// Number of boxes currently baked.
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    /// Unconditionally rebuilds the box set from the grid and applies the
    /// diff against the previous set.
    ///
    /// An empty grid skips the bake and clears the existing boxes instead.
    /// Every call bumps [`ColliderBaker::build_version`].
    pub fn rebuild(&mut self, grid: &VoxelGrid, settings: &CompoundColliderSettings) -> BakeReport {
        self.build_version += 1;

        if grid.is_empty() {
            let removed = self.release_all();
            return BakeReport {
                added: 0,
                removed,
                reused: 0,
                lod: settings.lod.max(1),
            };
        }

        let (target, lod) = self.bake_boxes(grid, settings);
        let report = self.apply_diff(target, lod);
        debug!(
            "collider rebuild v{}: {} added, {} removed, {} reused at lod {}",
            self.build_version, report.added, report.removed, report.reused, report.lod
        );
        report
    }

    /// Runtime-path rebuild: honors the one-way latch and the rebuild
    /// cooldown, and records the rebuild tick. Returns `None` when gated.
    pub fn try_runtime_rebuild(
        &mut self,
        grid: &VoxelGrid,
        settings: &CompoundColliderSettings,
        tick: u64,
    ) -> Option<BakeReport> {
        if !self.runtime_rebuild_allowed(grid, settings) {
            return None;
        }
        if let Some(last) = self.last_rebuild_tick {
            if tick.saturating_sub(last) < u64::from(settings.rebuild_cooldown_ticks) {
                return None;
            }
        }

        self.last_rebuild_tick = Some(tick);
        Some(self.rebuild(grid, settings))
    }

    /// Checks the one-way runtime-rebuild latch.
    ///
    /// Once the grid's active count drops to the configured minimum or
    /// below, runtime rebuilds are disabled for good; the existing boxes
    /// keep serving the small remnant.
    pub fn runtime_rebuild_allowed(
        &mut self,
        grid: &VoxelGrid,
        settings: &CompoundColliderSettings,
    ) -> bool {
        if self.runtime_rebuild_disabled {
            return false;
        }
        let threshold = settings.min_voxel_count_for_runtime_rebuild;
        if threshold > 0 && !grid.active_count_exceeds(threshold) {
            debug!("active count at or below {threshold}, disabling runtime collider rebuilds");
            self.runtime_rebuild_disabled = true;
            return false;
        }
        true
    }

    /// Bakes a box set, doubling the LOD while the count overflows the cap.
    fn bake_boxes(
        &self,
        grid: &VoxelGrid,
        settings: &CompoundColliderSettings,
    ) -> (Vec<ColliderBox>, i32) {
        let mut lod = settings.lod.max(1);
        let mut retries = 0;

        loop {
            let occupancy = OccupancyGrid::downsample(grid, lod);
            let boxes = greedy_cover(&occupancy, lod, settings.min_box_volume);

            if boxes.len() <= settings.max_boxes {
                return (boxes, lod);
            }
            if retries >= settings.max_lod_retries {
                warn!(
                    "box count {} still over cap {} after {} lod doublings, keeping overflow",
                    boxes.len(),
                    settings.max_boxes,
                    retries
                );
                return (boxes, lod);
            }

            debug!(
                "box count {} over cap {}, doubling lod {} -> {}",
                boxes.len(),
                settings.max_boxes,
                lod,
                lod * 2
            );
            lod *= 2;
            retries += 1;
        }
    }

    /// Applies the set difference against the previous box set.
    ///
    /// Boxes present in both sets keep their handle untouched; dropped
    /// boxes release their handle to the pool; new boxes pop from the pool
    /// or allocate a fresh handle.
    fn apply_diff(&mut self, target: Vec<ColliderBox>, lod: i32) -> BakeReport {
        let mut previous = std::mem::take(&mut self.boxes);
        let mut added = 0;
        let mut reused = 0;

        for b in target {
            match previous.remove(&b) {
                Some(handle) => {
                    reused += 1;
                    self.boxes.insert(b, handle);
                }
                None => {
                    added += 1;
                    let handle = self.acquire_handle();
                    self.boxes.insert(b, handle);
                }
            }
        }

        let removed = previous.len();
        for (_, handle) in previous {
            self.pool.push(handle);
        }

        BakeReport {
            added,
            removed,
            reused,
            lod,
        }
    }

    fn acquire_handle(&mut self) -> ColliderHandle {
        self.pool.pop().unwrap_or_else(|| {
            let handle = ColliderHandle(self.next_handle);
            self.next_handle += 1;
            handle
        })
    }

    /// Releases every box to the pool; returns how many were released.
    fn release_all(&mut self) -> usize {
        let removed = self.boxes.len();
        for (_, handle) in self.boxes.drain() {
            self.pool.push(handle);
        }
        removed
    }
}

/// Covers the occupancy grid with greedy boxes, discarding boxes below the
/// minimum cell volume.
fn greedy_cover(occupancy: &OccupancyGrid, lod: i32, min_volume: i32) -> Vec<ColliderBox> {
    let size = occupancy.size;
    let mut visited: BitVec = BitVec::repeat(false, (size.x * size.y * size.z) as usize);
    let index = |x: i32, y: i32, z: i32| (x + size.x * (y + size.y * z)) as usize;
    let mut boxes = Vec::new();

    for z in 0..size.z {
        for y in 0..size.y {
            for x in 0..size.x {
                if visited[index(x, y, z)] || !occupancy.is_solid(x, y, z) {
                    continue;
                }

                // Grow along X while cells stay solid and unvisited.
                let mut sx = 1;
                while x + sx < size.x
                    && occupancy.is_solid(x + sx, y, z)
                    && !visited[index(x + sx, y, z)]
                {
                    sx += 1;
                }

                // Grow along Y while the entire X run at the next row holds.
                let mut sy = 1;
                'grow_y: while y + sy < size.y {
                    for ix in x..x + sx {
                        if !occupancy.is_solid(ix, y + sy, z) || visited[index(ix, y + sy, z)] {
                            break 'grow_y;
                        }
                    }
                    sy += 1;
                }

                // Grow along Z while the entire X by Y rectangle holds.
                let mut sz = 1;
                'grow_z: while z + sz < size.z {
                    for iy in y..y + sy {
                        for ix in x..x + sx {
                            if !occupancy.is_solid(ix, iy, z + sz)
                                || visited[index(ix, iy, z + sz)]
                            {
                                break 'grow_z;
                            }
                        }
                    }
                    sz += 1;
                }

                for iz in z..z + sz {
                    for iy in y..y + sy {
                        for ix in x..x + sx {
                            visited.set(index(ix, iy, iz), true);
                        }
                    }
                }

                let b = ColliderBox {
                    min: Vector3::new(x, y, z),
                    size: Vector3::new(sx, sy, sz),
                    lod,
                };
                if b.cell_volume() >= min_volume {
                    boxes.push(b);
                }
            }
        }
    }

    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::{Rgba, Voxel};
    use std::collections::HashSet;

    fn settings() -> CompoundColliderSettings {
        CompoundColliderSettings {
            enabled: true,
            ..CompoundColliderSettings::default()
        }
    }

    fn solid_grid(n: i32) -> VoxelGrid {
        let mut grid = VoxelGrid::empty(Vector3::new(n, n, n), vec![Rgba::new(0, 0, 0)]);
        for voxel in grid.voxels.iter_mut() {
            *voxel = Voxel::solid(0);
        }
        grid
    }

    #[test]
    fn single_cell_bakes_one_unit_box() {
        let mut grid = VoxelGrid::empty(Vector3::new(4, 4, 4), vec![Rgba::new(0, 0, 0)]);
        grid.set_at(2, 1, 3, Voxel::solid(0));

        let mut baker = ColliderBaker::new();
        let report = baker.rebuild(&grid, &settings());

        assert_eq!(report.added, 1);
        assert_eq!(baker.box_count(), 1);
        let (b, _) = baker.boxes().next().unwrap();
        assert_eq!(b.min, Vector3::new(2, 1, 3));
        assert_eq!(b.size, Vector3::new(1, 1, 1));
        assert_eq!(b.lod, 1);
    }

    #[test]
    fn solid_cube_bakes_one_box() {
        let grid = solid_grid(4);
        let mut baker = ColliderBaker::new();
        baker.rebuild(&grid, &settings());

        assert_eq!(baker.box_count(), 1);
        let (b, _) = baker.boxes().next().unwrap();
        assert_eq!(b.size, Vector3::new(4, 4, 4));
    }

    #[test]
    fn unchanged_grid_rebakes_to_pure_reuse() {
        let grid = solid_grid(3);
        let mut baker = ColliderBaker::new();
        baker.rebuild(&grid, &settings());
        let keys_before: HashSet<ColliderBox> = baker.boxes().map(|(b, _)| *b).collect();
        let version_before = baker.build_version();

        let report = baker.rebuild(&grid, &settings());
        let keys_after: HashSet<ColliderBox> = baker.boxes().map(|(b, _)| *b).collect();

        assert_eq!(report.added, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(report.reused, 1);
        assert_eq!(keys_before, keys_after);
        assert!(baker.build_version() > version_before);
    }

    #[test]
    fn overflow_doubles_the_lod() {
        // Four diagonal voxels bake to four unit boxes at lod 1; capping at
        // two forces one doubling, which merges them pairwise.
        let mut grid = VoxelGrid::empty(Vector3::new(4, 4, 4), vec![Rgba::new(0, 0, 0)]);
        for i in 0..4 {
            grid.set_at(i, i, i, Voxel::solid(0));
        }

        let mut baker = ColliderBaker::new();
        let report = baker.rebuild(
            &grid,
            &CompoundColliderSettings {
                max_boxes: 2,
                ..settings()
            },
        );

        assert_eq!(report.lod, 2);
        assert!(baker.box_count() <= 2);
    }

    #[test]
    fn small_boxes_are_discarded_below_min_volume() {
        let mut grid = VoxelGrid::empty(Vector3::new(4, 4, 4), vec![Rgba::new(0, 0, 0)]);
        grid.set_at(0, 0, 0, Voxel::solid(0));

        let mut baker = ColliderBaker::new();
        baker.rebuild(
            &grid,
            &CompoundColliderSettings {
                min_box_volume: 2,
                ..settings()
            },
        );
        assert_eq!(baker.box_count(), 0);
    }

    #[test]
    fn empty_grid_clears_and_handles_are_recycled() {
        let mut grid = solid_grid(2);
        let mut baker = ColliderBaker::new();
        baker.rebuild(&grid, &settings());
        let original_handle = baker.boxes().next().unwrap().1;

        for voxel in grid.voxels.iter_mut() {
            *voxel = Voxel::empty();
        }
        let report = baker.rebuild(&grid, &settings());
        assert_eq!(report.removed, 1);
        assert_eq!(baker.box_count(), 0);

        // Refilling pops the pooled handle instead of allocating a new one.
        let mut grid = solid_grid(2);
        grid.set_at(0, 0, 0, Voxel::solid(0));
        baker.rebuild(&grid, &settings());
        assert_eq!(baker.boxes().next().unwrap().1, original_handle);
    }

    #[test]
    fn runtime_rebuild_latch_is_one_way() {
        let cfg = CompoundColliderSettings {
            min_voxel_count_for_runtime_rebuild: 5,
            ..settings()
        };
        let mut baker = ColliderBaker::new();

        let mut small = VoxelGrid::empty(Vector3::new(4, 4, 4), vec![Rgba::new(0, 0, 0)]);
        small.set_at(0, 0, 0, Voxel::solid(0));
        assert!(baker.try_runtime_rebuild(&small, &cfg, 0).is_none());

        // Even a large grid cannot re-enable rebuilds once latched.
        let large = solid_grid(4);
        assert!(baker.try_runtime_rebuild(&large, &cfg, 1).is_none());
    }

    #[test]
    fn rebuild_cooldown_gates_by_ticks() {
        let cfg = CompoundColliderSettings {
            rebuild_cooldown_ticks: 5,
            ..settings()
        };
        let grid = solid_grid(2);
        let mut baker = ColliderBaker::new();

        assert!(baker.try_runtime_rebuild(&grid, &cfg, 0).is_some());
        assert!(baker.try_runtime_rebuild(&grid, &cfg, 3).is_none());
        assert!(baker.try_runtime_rebuild(&grid, &cfg, 5).is_some());
    }
}
