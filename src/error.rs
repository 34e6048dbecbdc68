//! Error taxonomy for the destruction core.
//!
//! Configuration errors are detected at object creation time, logged, and
//! fail the spawn; they are fatal to that object instance only. Invalid
//! requests (malformed shapes, busy objects, filtered materials) never
//! surface as errors; they are rejected synchronously with a boolean return
//! and no state change. Resource exhaustion (full palette, collider cap)
//! degrades gracefully and is not represented here at all.

use thiserror::Error;

/// Fatal per-object configuration problems detected at creation time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The voxel edge length must be positive; a zero size would collapse
    /// every vertex of the generated mesh onto the origin.
    #[error("voxel size must be positive, got {0}")]
    ZeroVoxelSize(String),

    /// The decoded model contained no voxels or had non-positive dimensions.
    #[error("decoded model is empty or has invalid dimensions")]
    EmptyModel,
}
