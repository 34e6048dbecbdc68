//! # Core Module
//!
//! Shared services the world orchestrator owns and passes around
//! explicitly: the observer event bus, the mesh-buffer pool and the decoded
//! model cache. There is no ambient singleton anywhere in the crate; hosts
//! construct these (or let [`crate::world::VoxelWorld`] construct defaults)
//! and everything downstream receives them by reference.

pub mod cache;
pub mod events;
pub mod pools;

pub use cache::ModelCache;
pub use events::{EventBus, WorldEvent};
pub use pools::MeshPool;

/// Opaque handle to a voxel object owned by a world.
///
/// Ids are never reused; a torn-down object's id stays invalid forever,
/// which lets queued work detect stale targets and drop them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);
