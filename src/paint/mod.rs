//! # Paint Module
//!
//! Post-destruction color modification of voxels near an impact point.
//!
//! ## Addressing modes
//!
//! - **Mesh mode** ([`apply_paint`]): the host already projected the impact
//!   onto the mesh surface and converted it to fractional voxel-space
//!   coordinates; paint applies immediately.
//! - **Compound mode** ([`CompoundPainter`]): compound box colliders carry no
//!   precise surface point, so an impact latches onto the next voxel-removal
//!   notification from the same destruction event (within a tick-count
//!   timeout). The raw impact center is used instead of a surface
//!   projection, with an enlarged radius to compensate for the coarser
//!   addressing.
//!
//! ## Determinism
//!
//! The stochastic edge skip is a deterministic integer hash of
//! `(voxel index, seed)`, so replays with the same seed reproduce the same
//! paint pattern exactly.

use std::sync::Arc;

use cgmath::Point3;
use log::debug;

use crate::settings::{PaintBlendMode, PaintProfile};
use crate::voxel::grid::{nearest_palette_index, MAX_PALETTE_LEN};
use crate::voxel::{Rgba, SharedGrid};

/// What one paint application changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintResult {
    /// Number of voxels whose palette index actually changed. The host
    /// requests a mesh regeneration only when this is non-zero.
    pub voxels_changed: usize,
    /// Whether new palette entries were allocated.
    pub palette_grew: bool,
}

/// Paints all active voxels within a spherical radius of a fractional
/// voxel-space impact point.
///
/// Copy-on-write runs up front: when the grid is aliased by another owner,
/// the mutation clones it first and leaves the other owner untouched.
///
/// # Arguments
/// * `grid` - The target grid handle
/// * `impact` - Impact point in fractional voxel-space coordinates
/// * `radius` - Paint radius in voxels
/// * `profile` - Color, blend, noise, falloff and intensity parameters
/// * `seed` - Per-call seed for the deterministic edge-noise skip
pub fn apply_paint(
    grid: &mut SharedGrid,
    impact: Point3<f32>,
    radius: f32,
    profile: &PaintProfile,
    seed: u32,
) -> PaintResult {
    if radius <= 0.0 {
        return PaintResult::default();
    }

    let grid = Arc::make_mut(grid);
    let size = grid.size;

    let center_x = round_half_down(impact.x).clamp(0, size.x - 1);
    let center_y = round_half_down(impact.y).clamp(0, size.y - 1);
    let center_z = round_half_down(impact.z).clamp(0, size.z - 1);

    let reach = radius.ceil() as i32;
    let min_x = (center_x - reach).max(0);
    let min_y = (center_y - reach).max(0);
    let min_z = (center_z - reach).max(0);
    let max_x = (center_x + reach).min(size.x - 1);
    let max_y = (center_y + reach).min(size.y - 1);
    let max_z = (center_z + reach).min(size.z - 1);

    let radius_sq = radius * radius;
    let edge_noise = profile.noise.clamp(0.0, 1.0);
    let intensity = profile.intensity.clamp(0.0, 1.0);
    let falloff = profile.falloff.max(0.01);

    let mut result = PaintResult::default();

    for z in min_z..=max_z {
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                // Distances come from the fractional impact point, not the
                // snapped center cell.
                let dx = x as f32 - impact.x;
                let dy = y as f32 - impact.y;
                let dz = z as f32 - impact.z;
                let distance_sq = dx * dx + dy * dy + dz * dz;
                if distance_sq > radius_sq {
                    continue;
                }

                let index = grid.index(x, y, z);
                let voxel = grid.voxels[index];
                if !voxel.active {
                    continue;
                }

                let t = (distance_sq.sqrt() / radius).clamp(0.0, 1.0);
                if edge_noise > 0.0 && hash01(index, seed) < edge_noise * t {
                    continue;
                }

                let original = grid.palette[voxel.color as usize];
                let mut target = profile.target_color;

                if profile.blend_mode == PaintBlendMode::BlendToOriginal {
                    target = lerp_color(profile.target_color, original, t.powf(falloff));
                }
                if intensity < 1.0 {
                    target = lerp_color(original, target, intensity);
                }

                let new_index =
                    get_or_add_palette_index(&mut grid.palette, target, &mut result.palette_grew);
                if voxel.color != new_index {
                    grid.voxels[index].color = new_index;
                    result.voxels_changed += 1;
                }
            }
        }
    }

    result
}

/// Deferred-impact state for objects using compound box colliders.
///
/// An impact is queued rather than applied; the next voxels-removed
/// notification within the timeout budget triggers the paint, re-syncing it
/// with the voxels the coarse box geometry just exposed.
#[derive(Debug, Default)]
pub struct CompoundPainter {
    pending: Option<PendingImpact>,
    last_removed_tick: Option<u64>,
    last_removed_count: usize,
}

#[derive(Debug)]
struct PendingImpact {
    point: Point3<f32>,
    radius: f32,
    seed: u32,
    tick: u64,
}

impl CompoundPainter {
    /// Creates a painter with no pending impact.
    pub fn new() -> Self {
        CompoundPainter::default()
    }

    /// Queues an impact at the raw voxel-space center. If a voxel removal
    /// already landed this very tick, the paint applies immediately.
    ///
    /// The queued radius is enlarged by the profile's compound multiplier.
    pub fn queue_impact(
        &mut self,
        grid: &mut SharedGrid,
        point: Point3<f32>,
        radius: f32,
        profile: &PaintProfile,
        seed: u32,
        tick: u64,
    ) -> Option<PaintResult> {
        self.pending = Some(PendingImpact {
            point,
            radius: radius * profile.compound_radius_multiplier.max(1.0),
            seed,
            tick,
        });

        if self.last_removed_count > 0 && self.last_removed_tick == Some(tick) {
            return self.apply_pending(grid, profile);
        }
        None
    }

    /// Handles a voxels-removed notification; applies the latched impact if
    /// one is pending and still within its wait budget.
    pub fn notify_voxels_removed(
        &mut self,
        grid: &mut SharedGrid,
        removed_count: usize,
        profile: &PaintProfile,
        tick: u64,
    ) -> Option<PaintResult> {
        self.last_removed_tick = Some(tick);
        self.last_removed_count = removed_count;

        let pending = self.pending.as_ref()?;
        if removed_count == 0 {
            return None;
        }
        if tick.saturating_sub(pending.tick) > u64::from(profile.max_impact_wait_ticks) {
            debug!("compound paint impact expired after {} ticks", tick - pending.tick);
            self.pending = None;
            return None;
        }

        self.apply_pending(grid, profile)
    }

    fn apply_pending(&mut self, grid: &mut SharedGrid, profile: &PaintProfile) -> Option<PaintResult> {
        let pending = self.pending.take()?;
        Some(apply_paint(
            grid,
            pending.point,
            pending.radius,
            profile,
            pending.seed,
        ))
    }
}

/// Looks up an exact palette match or allocates a new entry; a full palette
/// falls back to the nearest existing color instead of growing.
fn get_or_add_palette_index(palette: &mut Vec<Rgba>, color: Rgba, grew: &mut bool) -> u8 {
    if let Some(i) = palette.iter().position(|&c| c == color) {
        return i as u8;
    }
    if palette.len() >= MAX_PALETTE_LEN {
        return nearest_palette_index(palette, color);
    }
    palette.push(color);
    *grew = true;
    (palette.len() - 1) as u8
}

/// Deterministic hash of `(voxel index, seed)` into `[0, 1]`.
pub fn hash01(index: usize, seed: u32) -> f32 {
    let mut hash = index as u32;
    hash ^= seed
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(hash << 6)
        .wrapping_add(hash >> 2);
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x7feb_352d);
    hash ^= hash >> 15;
    hash = hash.wrapping_mul(0x846c_a68b);
    hash ^= hash >> 16;
    (hash & 0x00ff_ffff) as f32 / 16_777_215.0
}

/// Rounds with ties at exactly .5 resolved toward negative infinity.
fn round_half_down(v: f32) -> i32 {
    const EPS: f32 = 1e-6;
    let f = v.floor();
    if v - f > 0.5 + EPS {
        f as i32 + 1
    } else {
        f as i32
    }
}

fn lerp_color(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Rgba([
        channel(a.0[0], b.0[0]),
        channel(a.0[1], b.0[1]),
        channel(a.0[2], b.0[2]),
        channel(a.0[3], b.0[3]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::{Voxel, VoxelGrid};
    use cgmath::Vector3;

    fn shared_solid(n: i32, color: Rgba) -> SharedGrid {
        let mut grid = VoxelGrid::empty(Vector3::new(n, n, n), vec![color]);
        for voxel in grid.voxels.iter_mut() {
            *voxel = Voxel::solid(0);
        }
        Arc::new(grid)
    }

    fn replace_profile(color: Rgba) -> PaintProfile {
        PaintProfile {
            target_color: color,
            blend_mode: PaintBlendMode::Replace,
            noise: 0.0,
            intensity: 1.0,
            ..PaintProfile::default()
        }
    }

    #[test]
    fn hash_is_deterministic_and_normalized() {
        for index in 0..512 {
            let h = hash01(index, 42);
            assert_eq!(h, hash01(index, 42));
            assert!((0.0..=1.0).contains(&h));
        }
        assert_ne!(hash01(1, 1), hash01(1, 2));
    }

    #[test]
    fn half_ties_round_toward_negative_infinity() {
        assert_eq!(round_half_down(0.5), 0);
        assert_eq!(round_half_down(1.5), 1);
        assert_eq!(round_half_down(1.51), 2);
        assert_eq!(round_half_down(-0.5), -1);
        assert_eq!(round_half_down(2.4), 2);
    }

    #[test]
    fn replace_paint_recolors_voxels_in_radius() {
        let red = Rgba::new(255, 0, 0);
        let black = Rgba::new(0, 0, 0);
        let mut grid = shared_solid(3, red);

        let result = apply_paint(
            &mut grid,
            Point3::new(1.0, 1.0, 1.0),
            1.0,
            &replace_profile(black),
            7,
        );

        // Center plus its 6 face neighbors.
        assert_eq!(result.voxels_changed, 7);
        assert!(result.palette_grew);
        assert_eq!(grid.palette, vec![red, black]);
        assert_eq!(grid.voxel_at(1, 1, 1).color, 1);
        assert_eq!(grid.voxel_at(0, 0, 0).color, 0);
    }

    #[test]
    fn painting_the_same_color_changes_nothing() {
        let red = Rgba::new(255, 0, 0);
        let mut grid = shared_solid(3, red);
        let result = apply_paint(
            &mut grid,
            Point3::new(1.0, 1.0, 1.0),
            2.0,
            &replace_profile(red),
            0,
        );
        assert_eq!(result.voxels_changed, 0);
        assert!(!result.palette_grew);
    }

    #[test]
    fn full_palette_falls_back_to_nearest_color() {
        // 256 distinct grays fill the palette completely.
        let palette: Vec<Rgba> = (0..=255).map(|v| Rgba::new(v, v, v)).collect();
        let mut grid = VoxelGrid::empty(Vector3::new(1, 1, 1), palette);
        grid.set_at(0, 0, 0, Voxel::solid(0));
        let mut grid = Arc::new(grid);

        // A 257th color must reuse the nearest entry, not grow the palette.
        let result = apply_paint(
            &mut grid,
            Point3::new(0.0, 0.0, 0.0),
            1.0,
            &replace_profile(Rgba::new(200, 201, 199)),
            0,
        );

        assert_eq!(grid.palette.len(), MAX_PALETTE_LEN);
        assert!(!result.palette_grew);
        assert_eq!(result.voxels_changed, 1);
        assert_eq!(grid.voxel_at(0, 0, 0).color, 200);
    }

    #[test]
    fn blend_to_original_leaves_the_radius_edge_untouched() {
        let red = Rgba::new(255, 0, 0);
        let mut grid = shared_solid(5, red);
        let profile = PaintProfile {
            target_color: Rgba::new(0, 0, 0),
            blend_mode: PaintBlendMode::BlendToOriginal,
            noise: 0.0,
            falloff: 1.0,
            intensity: 1.0,
            ..PaintProfile::default()
        };

        apply_paint(&mut grid, Point3::new(2.0, 2.0, 2.0), 2.0, &profile, 0);

        // t = 1 at the edge blends fully back to the original color.
        assert_eq!(grid.voxel_at(0, 2, 2).color, 0);
        // The center takes the target color outright.
        assert_ne!(grid.voxel_at(2, 2, 2).color, 0);
    }

    #[test]
    fn same_seed_reproduces_the_same_pattern() {
        let red = Rgba::new(255, 0, 0);
        let profile = PaintProfile {
            target_color: Rgba::new(0, 0, 0),
            blend_mode: PaintBlendMode::Replace,
            noise: 0.8,
            ..PaintProfile::default()
        };

        let mut a = shared_solid(6, red);
        let mut b = shared_solid(6, red);
        apply_paint(&mut a, Point3::new(2.5, 2.5, 2.5), 2.5, &profile, 99);
        apply_paint(&mut b, Point3::new(2.5, 2.5, 2.5), 2.5, &profile, 99);
        assert_eq!(*a, *b);

        let mut c = shared_solid(6, red);
        apply_paint(&mut c, Point3::new(2.5, 2.5, 2.5), 2.5, &profile, 100);
        assert_ne!(*a, *c);
    }

    #[test]
    fn aliased_grids_are_cloned_before_painting() {
        let red = Rgba::new(255, 0, 0);
        let original = shared_solid(3, red);
        let mut painted = Arc::clone(&original);

        apply_paint(
            &mut painted,
            Point3::new(1.0, 1.0, 1.0),
            2.0,
            &replace_profile(Rgba::new(0, 0, 0)),
            0,
        );

        assert_eq!(original.palette.len(), 1);
        assert_eq!(painted.palette.len(), 2);
    }

    #[test]
    fn compound_impact_latches_onto_the_next_removal() {
        let red = Rgba::new(255, 0, 0);
        let mut grid = shared_solid(3, red);
        let mut painter = CompoundPainter::new();
        let profile = replace_profile(Rgba::new(0, 0, 0));

        assert!(painter
            .queue_impact(&mut grid, Point3::new(1.0, 1.0, 1.0), 1.0, &profile, 5, 10)
            .is_none());

        let result = painter
            .notify_voxels_removed(&mut grid, 3, &profile, 12)
            .unwrap();
        assert!(result.voxels_changed > 0);

        // The latch is one-shot.
        assert!(painter
            .notify_voxels_removed(&mut grid, 3, &profile, 13)
            .is_none());
    }

    #[test]
    fn compound_impact_expires_after_the_wait_budget() {
        let red = Rgba::new(255, 0, 0);
        let mut grid = shared_solid(3, red);
        let mut painter = CompoundPainter::new();
        let profile = replace_profile(Rgba::new(0, 0, 0));

        painter.queue_impact(&mut grid, Point3::new(1.0, 1.0, 1.0), 1.0, &profile, 5, 0);
        let late = u64::from(profile.max_impact_wait_ticks) + 1;
        assert!(painter
            .notify_voxels_removed(&mut grid, 3, &profile, late)
            .is_none());
        assert_eq!(grid.palette.len(), 1);
    }
}
