//! Per-object lifecycle and state.
//!
//! A `VoxelObject` bundles one grid with everything the world needs to
//! drive it: the destruction state machine, the compound collider baker,
//! the deferred compound painter and the in-flight mesh job. Objects are
//! created through [`crate::world::VoxelWorld::spawn_object`]; construction
//! validates the configuration and fails with a [`ConfigError`] instead of
//! producing a half-alive object.

use cgmath::Vector3;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::collider::ColliderBaker;
use crate::core::ObjectId;
use crate::destruction::DestructionEngine;
use crate::error::ConfigError;
use crate::meshing::{MeshJob, VoxelMesh};
use crate::paint::CompoundPainter;
use crate::settings::{
    CompoundColliderSettings, DestructionSettings, IsolationSettings, MeshSettings, PaintProfile,
};
use crate::voxel::SharedGrid;

/// Everything configurable about one voxel object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSettings {
    /// Meshing parameters, including the voxel edge length.
    pub mesh: MeshSettings,
    /// Destruction behavior and fragmentation policy.
    pub destruction: DestructionSettings,
    /// Cluster isolation thresholds.
    pub isolation: IsolationSettings,
    /// Compound collider baking parameters.
    pub compound: CompoundColliderSettings,
    /// Paint profile used by impact paints targeting this object.
    pub paint: PaintProfile,
    /// Material tag checked against destruction request filters.
    pub material: Option<String>,
}

/// One voxel object owned by a world.
pub struct VoxelObject {
    pub(crate) id: ObjectId,
    pub(crate) settings: ObjectSettings,
    pub(crate) grid: SharedGrid,
    /// Placement offset in parent cells; fragments carry the bounding-box
    /// min corner they were extracted at, root objects sit at zero.
    pub(crate) origin: Vector3<i32>,
    pub(crate) mesh: Option<VoxelMesh>,
    pub(crate) mesh_job: Option<MeshJob>,
    pub(crate) destruction: DestructionEngine,
    pub(crate) collider: ColliderBaker,
    pub(crate) compound_painter: CompoundPainter,
    pub(crate) start_voxel_count: usize,
    pub(crate) current_voxel_count: usize,
    pub(crate) teardown_flagged: bool,
    pub(crate) needs_isolation: bool,
    pub(crate) deactivated: bool,
}

impl VoxelObject {
    /// Validates the configuration and wraps the grid into a live object.
    pub(crate) fn new(
        id: ObjectId,
        grid: SharedGrid,
        settings: ObjectSettings,
        origin: Vector3<i32>,
    ) -> Result<Self, ConfigError> {
        if settings.mesh.voxel_size <= 0.0 {
            return Err(ConfigError::ZeroVoxelSize(format!(
                "{} (object {id:?})",
                settings.mesh.voxel_size
            )));
        }
        if grid.is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        let voxel_count = if settings.mesh.track_voxel_count {
            grid.active_count()
        } else {
            0
        };

        Ok(VoxelObject {
            id,
            settings,
            grid,
            origin,
            mesh: None,
            mesh_job: None,
            destruction: DestructionEngine::new(),
            collider: ColliderBaker::new(),
            compound_painter: CompoundPainter::new(),
            start_voxel_count: voxel_count,
            current_voxel_count: voxel_count,
            teardown_flagged: false,
            needs_isolation: false,
            deactivated: false,
        })
    }

    /// The object's world handle.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The object's configuration.
    pub fn settings(&self) -> &ObjectSettings {
        &self.settings
    }

    /// The object's current grid handle.
    pub fn grid(&self) -> &SharedGrid {
        &self.grid
    }

    /// Placement offset of this object's grid origin, in parent cells.
    pub fn origin(&self) -> Vector3<i32> {
        self.origin
    }

    /// The most recently generated mesh, if any regeneration has finished.
    pub fn mesh(&self) -> Option<&VoxelMesh> {
        self.mesh.as_ref()
    }

    /// The compound collider state for this object.
    pub fn collider(&self) -> &ColliderBaker {
        &self.collider
    }

    /// Active voxel count at creation, when tracking is enabled.
    pub fn start_voxel_count(&self) -> usize {
        self.start_voxel_count
    }

    /// Active voxel count after the latest regeneration, when tracking is
    /// enabled.
    pub fn current_voxel_count(&self) -> usize {
        self.current_voxel_count
    }

    /// Whether the object is flagged for teardown or deactivated; such
    /// objects reject further operations.
    pub fn is_inert(&self) -> bool {
        self.teardown_flagged || self.deactivated
    }

    /// Returns true if a mesh regeneration is currently in flight.
    pub fn mesh_regeneration_active(&self) -> bool {
        self.mesh_job.is_some()
    }

    /// Swaps in a new grid. Rejected while a mesh regeneration is in
    /// flight; callers retry once the regeneration completes.
    pub(crate) fn assign_grid(&mut self, grid: SharedGrid) -> bool {
        if self.mesh_job.is_some() {
            warn!("grid assignment rejected for {:?}: mesh regeneration active", self.id);
            return false;
        }
        if grid.is_empty() {
            warn!("grid assignment rejected for {:?}: empty grid", self.id);
            return false;
        }

        if self.settings.mesh.track_voxel_count {
            let count = grid.active_count();
            self.start_voxel_count = count;
            self.current_voxel_count = count;
        }
        self.grid = grid;
        debug!("object {:?} assigned a new grid", self.id);
        true
    }

    /// Refreshes the tracked voxel count after a mutation settled.
    pub(crate) fn refresh_voxel_count(&mut self) {
        if self.settings.mesh.track_voxel_count {
            self.current_voxel_count = self.grid.active_count();
        }
    }
}
