//! Fragmentation policies for removed voxels.
//!
//! When a destruction runs in a fragmentation mode, the voxels it removes do
//! not just disappear: they are partitioned into independent fragment grids
//! the host spawns as new free-standing objects. The colors used here are
//! the ones captured before the source grid was cleared, because fragments
//! finish spawning after the source voxels are already gone.

use cgmath::Vector3;
use log::debug;

use crate::isolation::ExtractedFragment;
use crate::settings::{DestructionMode, DestructionSettings};
use crate::voxel::{Voxel, VoxelGrid};

/// Partitions the removed voxels into fragment grids per the configured
/// policy.
///
/// # Arguments
/// * `grid` - The source grid, consulted for coordinates and palette only;
///   the removed cells may already be cleared
/// * `removed` - Flat indices of the removed voxels
/// * `captured` - The removed voxels' states captured before clearing,
///   parallel to `removed`
/// * `settings` - Destruction settings selecting the policy
pub fn fragment_removed(
    grid: &VoxelGrid,
    removed: &[usize],
    captured: &[Voxel],
    settings: &DestructionSettings,
) -> Vec<ExtractedFragment> {
    debug_assert_eq!(removed.len(), captured.len());
    if removed.is_empty() {
        return Vec::new();
    }

    let fragments = match settings.mode {
        DestructionMode::Remove => Vec::new(),
        DestructionMode::SingleFragment => vec![build_fragment(grid, removed, captured)],
        DestructionMode::SphereFragments => sphere_clustered(grid, removed, captured, settings),
        DestructionMode::PerVoxelFragments => per_voxel(grid, removed, captured, settings),
    };

    debug!(
        "fragmenter produced {} fragments from {} removed voxels",
        fragments.len(),
        removed.len()
    );
    fragments
}

/// Groups removed voxels into spherical clusters of randomized radius.
///
/// Each not-yet-assigned voxel in removal order seeds a cluster that claims
/// every remaining voxel within its radius; the radius is drawn per cluster
/// from the configured min/max range.
fn sphere_clustered(
    grid: &VoxelGrid,
    removed: &[usize],
    captured: &[Voxel],
    settings: &DestructionSettings,
) -> Vec<ExtractedFragment> {
    let min_r = settings.sphere_fragments.min_sphere_radius.max(1);
    let max_r = settings.sphere_fragments.max_sphere_radius.max(min_r);

    let mut assigned = vec![false; removed.len()];
    let mut fragments = Vec::new();

    for seed in 0..removed.len() {
        if assigned[seed] {
            continue;
        }

        let radius = fastrand::i32(min_r..=max_r) as f32;
        let radius_sq = radius * radius;
        let (sx, sy, sz) = grid.coords_of(removed[seed]);

        let mut member_indices = Vec::new();
        let mut member_voxels = Vec::new();
        for i in seed..removed.len() {
            if assigned[i] {
                continue;
            }
            let (x, y, z) = grid.coords_of(removed[i]);
            let dx = (x - sx) as f32;
            let dy = (y - sy) as f32;
            let dz = (z - sz) as f32;
            if dx * dx + dy * dy + dz * dz <= radius_sq {
                assigned[i] = true;
                member_indices.push(removed[i]);
                member_voxels.push(captured[i]);
            }
        }

        fragments.push(build_fragment(grid, &member_indices, &member_voxels));
    }

    fragments
}

/// Turns every removed voxel into its own 1x1x1 fragment, up to the
/// configured cap.
fn per_voxel(
    grid: &VoxelGrid,
    removed: &[usize],
    captured: &[Voxel],
    settings: &DestructionSettings,
) -> Vec<ExtractedFragment> {
    let cap = settings.voxel_fragments.max_fragments;
    let count = if cap == 0 {
        removed.len()
    } else {
        removed.len().min(cap)
    };

    (0..count)
        .map(|i| build_fragment(grid, &removed[i..i + 1], &captured[i..i + 1]))
        .collect()
}

/// Copies a set of removed voxels into a bounding-box-sized fragment grid.
fn build_fragment(grid: &VoxelGrid, indices: &[usize], voxels: &[Voxel]) -> ExtractedFragment {
    let (min, max) = grid
        .bounds_of_indices(indices)
        .expect("fragment member set is never empty");
    let size = max - min + Vector3::new(1, 1, 1);
    let mut fragment = VoxelGrid::empty(size, grid.palette.clone());

    for (&index, &voxel) in indices.iter().zip(voxels) {
        let (x, y, z) = grid.coords_of(index);
        let mut voxel = voxel;
        voxel.active = true;
        let local = fragment.index(x - min.x, y - min.y, z - min.z);
        fragment.voxels[local] = voxel;
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

    fn grid_and_removed() -> (VoxelGrid, Vec<usize>, Vec<Voxel>) {
        let mut grid = VoxelGrid::empty(
            Vector3::new(4, 4, 4),
            vec![Rgba::new(255, 0, 0), Rgba::new(0, 255, 0)],
        );
        grid.set_at(1, 1, 1, Voxel::solid(0));
        grid.set_at(2, 1, 1, Voxel::solid(1));
        grid.set_at(3, 3, 3, Voxel::solid(0));

        let removed = vec![
            grid.index(1, 1, 1),
            grid.index(2, 1, 1),
            grid.index(3, 3, 3),
        ];
        let captured: Vec<Voxel> = removed.iter().map(|&i| grid.voxels[i]).collect();
        // Simulate the engine clearing the source before fragmenting.
        for &i in &removed {
            grid.voxels[i] = Voxel::empty();
        }
        (grid, removed, captured)
    }

    #[test]
    fn single_blob_spans_the_bounding_box() {
        let (grid, removed, captured) = grid_and_removed();
        let settings = DestructionSettings {
            mode: DestructionMode::SingleFragment,
            ..DestructionSettings::default()
        };

        let fragments = fragment_removed(&grid, &removed, &captured, &settings);
        assert_eq!(fragments.len(), 1);
        let f = &fragments[0];
        assert_eq!(f.offset, Vector3::new(1, 1, 1));
        assert_eq!(f.grid.size, Vector3::new(3, 3, 3));
        assert_eq!(f.grid.active_count(), 3);
        // Captured colors survive the source clear.
        assert_eq!(f.grid.voxel_at(1, 0, 0).color, 1);
    }

    #[test]
    fn per_voxel_spawns_unit_fragments_with_captured_colors() {
        let (grid, removed, captured) = grid_and_removed();
        let settings = DestructionSettings {
            mode: DestructionMode::PerVoxelFragments,
            ..DestructionSettings::default()
        };

        let fragments = fragment_removed(&grid, &removed, &captured, &settings);
        assert_eq!(fragments.len(), 3);
        for f in &fragments {
            assert_eq!(f.grid.size, Vector3::new(1, 1, 1));
            assert_eq!(f.grid.active_count(), 1);
        }
        assert_eq!(fragments[1].offset, Vector3::new(2, 1, 1));
        assert_eq!(fragments[1].grid.voxel_at(0, 0, 0).color, 1);
    }

    #[test]
    fn per_voxel_honors_the_fragment_cap() {
        let (grid, removed, captured) = grid_and_removed();
        let mut settings = DestructionSettings {
            mode: DestructionMode::PerVoxelFragments,
            ..DestructionSettings::default()
        };
        settings.voxel_fragments.max_fragments = 2;

        let fragments = fragment_removed(&grid, &removed, &captured, &settings);
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn sphere_clusters_cover_every_removed_voxel_once() {
        let (grid, removed, captured) = grid_and_removed();
        let mut settings = DestructionSettings {
            mode: DestructionMode::SphereFragments,
            ..DestructionSettings::default()
        };
        settings.sphere_fragments.min_sphere_radius = 1;
        settings.sphere_fragments.max_sphere_radius = 1;

        let fragments = fragment_removed(&grid, &removed, &captured, &settings);
        let total: usize = fragments.iter().map(|f| f.grid.active_count()).sum();
        assert_eq!(total, removed.len());
        // Radius 1 keeps the far corner voxel in its own cluster.
        assert_eq!(fragments.len(), 2);
    }
}
