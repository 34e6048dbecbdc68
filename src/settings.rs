//! # Settings
//!
//! Plain-data configuration objects for voxel objects and the world
//! orchestrator. Hosts construct these directly or deserialize them from JSON;
//! every struct carries serde defaults so partial configuration files work.
//!
//! These replace the engine-side ScriptableObject settings of the reference
//! behavior: there is no ambient defaults provider, a settings value is passed
//! explicitly wherever it is needed.

use serde::{Deserialize, Serialize};

use crate::voxel::Rgba;

/// What happens to a voxel object once its mesh comes back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmptyAction {
    /// Tear the object down and release its resources.
    #[default]
    Teardown,
    /// Keep the object alive but inert (host may recycle it).
    Deactivate,
}

/// Mesh generation settings for a single voxel object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// Edge length of a single voxel in world units. Must be positive.
    pub voxel_size: f32,
    /// Action taken when regeneration produces a mesh with zero vertices.
    pub empty_action: EmptyAction,
    /// Maintain `start_voxel_count` / `current_voxel_count` on the object.
    /// Costs a full grid scan per regeneration.
    pub track_voxel_count: bool,
}

impl Default for MeshSettings {
    fn default() -> Self {
        MeshSettings {
            voxel_size: 1.0,
            empty_action: EmptyAction::Teardown,
            track_voxel_count: false,
        }
    }
}

/// How removed voxels are turned into fragments, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DestructionMode {
    /// Removed voxels simply disappear.
    #[default]
    Remove,
    /// All removed voxels become one fragment object.
    SingleFragment,
    /// Removed voxels are clustered into sphere-shaped fragments.
    SphereFragments,
    /// Every removed voxel becomes its own 1x1x1 fragment.
    PerVoxelFragments,
}

/// Settings for the sphere-clustered fragmenter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereFragmenterSettings {
    /// Smallest cluster radius in cells.
    pub min_sphere_radius: i32,
    /// Largest cluster radius in cells.
    pub max_sphere_radius: i32,
}

impl Default for SphereFragmenterSettings {
    fn default() -> Self {
        SphereFragmenterSettings {
            min_sphere_radius: 2,
            max_sphere_radius: 4,
        }
    }
}

/// Settings for the per-voxel fragmenter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelFragmenterSettings {
    /// Upper bound on spawned single-voxel fragments per destruction;
    /// 0 means unlimited.
    pub max_fragments: usize,
}

impl Default for VoxelFragmenterSettings {
    fn default() -> Self {
        VoxelFragmenterSettings { max_fragments: 0 }
    }
}

/// Destruction behavior for a single voxel object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestructionSettings {
    /// Fragmentation policy applied to removed voxels.
    pub mode: DestructionMode,
    /// If a destruction would leave at most this many active voxels, the
    /// whole object is flagged for teardown instead of being re-meshed.
    pub min_remaining_voxels: usize,
    /// Defaults for [`DestructionMode::SphereFragments`].
    pub sphere_fragments: SphereFragmenterSettings,
    /// Defaults for [`DestructionMode::PerVoxelFragments`].
    pub voxel_fragments: VoxelFragmenterSettings,
}

impl Default for DestructionSettings {
    fn default() -> Self {
        DestructionSettings {
            mode: DestructionMode::Remove,
            min_remaining_voxels: 0,
            sphere_fragments: SphereFragmenterSettings::default(),
            voxel_fragments: VoxelFragmenterSettings::default(),
        }
    }
}

/// Connected-component isolation behavior for a single voxel object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationSettings {
    /// Run an isolation pass after each destruction once meshing settles.
    pub run_after_destruction: bool,
    /// Clusters with fewer voxels than this are cleared instead of spawned
    /// as fragment objects. 0 spawns every non-dominant cluster.
    pub min_fragment_voxels: usize,
}

impl Default for IsolationSettings {
    fn default() -> Self {
        IsolationSettings {
            run_after_destruction: false,
            min_fragment_voxels: 0,
        }
    }
}

/// Compound box-collider baking behavior for a single voxel object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundColliderSettings {
    /// Whether compound box colliders are active on this object at all.
    pub enabled: bool,
    /// Level-of-detail divisor; 1 bakes at full voxel resolution.
    pub lod: i32,
    /// Hard cap on the number of boxes; exceeding it doubles the LOD.
    pub max_boxes: usize,
    /// Boxes covering fewer downsampled cells than this are discarded.
    pub min_box_volume: i32,
    /// Minimum ticks between two applied rebuilds.
    pub rebuild_cooldown_ticks: u32,
    /// One-way latch: once the active voxel count drops to this value or
    /// below, runtime auto-rebuild is disabled for good. 0 disables the
    /// latch.
    pub min_voxel_count_for_runtime_rebuild: usize,
    /// How many LOD doublings the overflow handler may attempt.
    pub max_lod_retries: u32,
}

impl Default for CompoundColliderSettings {
    fn default() -> Self {
        CompoundColliderSettings {
            enabled: false,
            lod: 1,
            max_boxes: 256,
            min_box_volume: 1,
            rebuild_cooldown_ticks: 0,
            min_voxel_count_for_runtime_rebuild: 0,
            max_lod_retries: 4,
        }
    }
}

/// How a painted color interacts with the voxel's original color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaintBlendMode {
    /// The target color replaces the original outright.
    #[default]
    Replace,
    /// The target color fades back to the original toward the paint radius.
    BlendToOriginal,
}

/// Color modification profile applied by the surface painter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintProfile {
    /// The color painted at the impact center.
    pub target_color: Rgba,
    /// Blend behavior toward the edge of the paint radius.
    pub blend_mode: PaintBlendMode,
    /// Edge noise in [0, 1]: chance of skipping a voxel grows with distance.
    pub noise: f32,
    /// Falloff exponent for [`PaintBlendMode::BlendToOriginal`].
    pub falloff: f32,
    /// Overall blend of the result against the original color, in [0, 1].
    pub intensity: f32,
    /// Radius multiplier applied in compound addressing mode to compensate
    /// for the coarser box geometry.
    pub compound_radius_multiplier: f32,
    /// Ticks a queued compound-mode impact waits for a voxel-removal
    /// notification before being dropped.
    pub max_impact_wait_ticks: u32,
}

impl Default for PaintProfile {
    fn default() -> Self {
        PaintProfile {
            target_color: Rgba::new(30, 30, 30),
            blend_mode: PaintBlendMode::BlendToOriginal,
            noise: 0.35,
            falloff: 1.0,
            intensity: 1.0,
            compound_radius_multiplier: 1.5,
            max_impact_wait_ticks: 10,
        }
    }
}

/// Global per-tick budgets for the world orchestrator's shared queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBudgets {
    /// At most this many deferred teardowns complete per tick.
    pub max_teardowns_per_tick: usize,
    /// At most this many mesh regenerations start per tick.
    pub max_mesh_regens_per_tick: usize,
    /// Ticks a teardown waits in the queue before it may run.
    pub teardown_delay_ticks: u64,
}

impl Default for WorldBudgets {
    fn default() -> Self {
        WorldBudgets {
            max_teardowns_per_tick: 4,
            max_mesh_regens_per_tick: 2,
            teardown_delay_ticks: 1,
        }
    }
}
