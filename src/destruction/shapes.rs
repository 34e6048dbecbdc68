//! Destruction shape definitions and voxel selection.
//!
//! Shapes live in the grid's local voxel space: one unit equals one voxel
//! edge, and the center of cell `(x, y, z)` sits at integer coordinates
//! `(x, y, z)`. The caller-facing layer is responsible for transforming
//! world-space impact data into this space before building a shape.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::voxel::VoxelGrid;

/// A shape-based voxel removal request, in local voxel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DestructionShape {
    /// All voxels within Euclidean `radius` of `center`.
    Sphere { center: Point3<f32>, radius: f32 },
    /// All voxels within an axis-aligned box of `half_extent` around
    /// `center`.
    Cube {
        center: Point3<f32>,
        half_extent: f32,
    },
    /// A capsule: all voxels within `radius` of the segment `start..end`.
    Line {
        start: Point3<f32>,
        end: Point3<f32>,
        radius: f32,
    },
}

impl DestructionShape {
    /// Returns true if the shape parameters are well formed: finite
    /// coordinates and a strictly positive radius or half-extent.
    pub fn is_valid(&self) -> bool {
        match *self {
            DestructionShape::Sphere { center, radius } => {
                finite_point(center) && radius.is_finite() && radius > 0.0
            }
            DestructionShape::Cube {
                center,
                half_extent,
            } => finite_point(center) && half_extent.is_finite() && half_extent > 0.0,
            DestructionShape::Line { start, end, radius } => {
                finite_point(start) && finite_point(end) && radius.is_finite() && radius > 0.0
            }
        }
    }

    /// A representative center point, recorded as the last destruction
    /// point and used as the paint impact center in compound mode.
    pub fn center(&self) -> Point3<f32> {
        match *self {
            DestructionShape::Sphere { center, .. } => center,
            DestructionShape::Cube { center, .. } => center,
            DestructionShape::Line { start, end, .. } => Point3::new(
                (start.x + end.x) / 2.0,
                (start.y + end.y) / 2.0,
                (start.z + end.z) / 2.0,
            ),
        }
    }

    /// Axis-aligned bounds of the shape in voxel space, used to clip the
    /// selection scan.
    fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        match *self {
            DestructionShape::Sphere { center, radius } => (
                Point3::new(center.x - radius, center.y - radius, center.z - radius),
                Point3::new(center.x + radius, center.y + radius, center.z + radius),
            ),
            DestructionShape::Cube {
                center,
                half_extent,
            } => (
                Point3::new(
                    center.x - half_extent,
                    center.y - half_extent,
                    center.z - half_extent,
                ),
                Point3::new(
                    center.x + half_extent,
                    center.y + half_extent,
                    center.z + half_extent,
                ),
            ),
            DestructionShape::Line { start, end, radius } => (
                Point3::new(
                    start.x.min(end.x) - radius,
                    start.y.min(end.y) - radius,
                    start.z.min(end.z) - radius,
                ),
                Point3::new(
                    start.x.max(end.x) + radius,
                    start.y.max(end.y) + radius,
                    start.z.max(end.z) + radius,
                ),
            ),
        }
    }

    /// Returns true if a voxel center lies inside the shape.
    fn contains(&self, p: Point3<f32>) -> bool {
        match *self {
            DestructionShape::Sphere { center, radius } => {
                (p - center).magnitude2() <= radius * radius
            }
            DestructionShape::Cube {
                center,
                half_extent,
            } => {
                (p.x - center.x).abs() <= half_extent
                    && (p.y - center.y).abs() <= half_extent
                    && (p.z - center.z).abs() <= half_extent
            }
            DestructionShape::Line { start, end, radius } => {
                distance_to_segment_sq(p, start, end) <= radius * radius
            }
        }
    }
}

/// Collects the flat indices of all active voxels whose centers lie inside
/// the shape, in grid index order. The scan is clipped to the shape's
/// bounding box intersected with the grid bounds.
pub fn select_voxels(grid: &VoxelGrid, shape: &DestructionShape) -> Vec<usize> {
    let (lo, hi) = shape.bounds();
    let min = Vector3::new(
        (lo.x.floor() as i32).max(0),
        (lo.y.floor() as i32).max(0),
        (lo.z.floor() as i32).max(0),
    );
    let max = Vector3::new(
        (hi.x.ceil() as i32).min(grid.size.x - 1),
        (hi.y.ceil() as i32).min(grid.size.y - 1),
        (hi.z.ceil() as i32).min(grid.size.z - 1),
    );

    let mut selected = Vec::new();
    for z in min.z..=max.z {
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let index = grid.index(x, y, z);
                if !grid.voxels[index].active {
                    continue;
                }
                if shape.contains(Point3::new(x as f32, y as f32, z as f32)) {
                    selected.push(index);
                }
            }
        }
    }
    selected
}

fn finite_point(p: Point3<f32>) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

/// Squared distance from a point to the segment `a..b`.
fn distance_to_segment_sq(p: Point3<f32>, a: Point3<f32>, b: Point3<f32>) -> f32 {
    let ab = b - a;
    let len_sq = ab.magnitude2();
    if len_sq <= f32::EPSILON {
        return (p - a).magnitude2();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).magnitude2()
}
