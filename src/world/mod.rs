//! # World Module
//!
//! The orchestrator tying every component together. A [`VoxelWorld`] owns
//! its objects behind small integer handles, the shared work queues with
//! their per-tick budgets, the mesh-buffer pool, the model cache and the
//! observer event bus.
//!
//! ## Tick order
//!
//! Each [`VoxelWorld::tick`] drives, in order:
//! 1. queued mesh regenerations, up to the per-tick budget (stale entries
//!    are dropped opportunistically);
//! 2. in-flight mesh jobs, one poll each; finished meshes fire the
//!    mesh-generated event, apply the empty-mesh action and trigger any
//!    pending isolation pass;
//! 3. in-flight destructions, one step each, including fragment spawning;
//! 4. deferred teardowns, up to the per-tick budget, after their delay, and
//!    never while the target's fragmenter is still running.
//!
//! Everything runs on the single cooperative host thread. Mesh jobs work on
//! read-only grid snapshots, so a destruction landing mid-regeneration
//! triggers copy-on-write instead of mutating the snapshot under the job.

pub mod object;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};

use crate::core::{EventBus, MeshPool, ModelCache, ObjectId, WorldEvent};
use crate::destruction::{
    DestructionOutcome, DestructionPhase, DestructionProgress, DestructionShape, MaterialFilter,
};
use crate::error::ConfigError;
use crate::isolation::{isolate_clusters, ExtractedFragment};
use crate::meshing::{MeshJob, MeshJobProgress};
use crate::paint::{apply_paint, PaintResult};
use crate::settings::{EmptyAction, WorldBudgets};
use crate::voxel::{DecodedModel, SharedGrid, VoxelGrid};

pub use object::{ObjectSettings, VoxelObject};

/// The single-threaded cooperative orchestrator for voxel objects.
pub struct VoxelWorld {
    objects: HashMap<ObjectId, VoxelObject>,
    /// Creation-ordered ids, for deterministic iteration and event order.
    order: Vec<ObjectId>,
    next_id: u64,
    budgets: WorldBudgets,
    events: EventBus,
    mesh_pool: MeshPool,
    model_cache: ModelCache,
    material_filter: MaterialFilter,
    mesh_queue: VecDeque<ObjectId>,
    teardown_queue: VecDeque<(ObjectId, u64)>,
    tick: u64,
}

impl VoxelWorld {
    /// Creates an empty world with the given per-tick budgets.
    pub fn new(budgets: WorldBudgets) -> Self {
        VoxelWorld {
            objects: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            budgets,
            events: EventBus::new(),
            mesh_pool: MeshPool::default(),
            model_cache: ModelCache::default(),
            material_filter: MaterialFilter::default(),
            mesh_queue: VecDeque::new(),
            teardown_queue: VecDeque::new(),
            tick: 0,
        }
    }

    /// Ticks elapsed since the world was created.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The observer event bus; hosts subscribe here.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Replaces the global material filter applied to destruction requests.
    pub fn set_material_filter(&mut self, filter: MaterialFilter) {
        self.material_filter = filter;
    }

    /// Looks up a live object by handle.
    pub fn object(&self, id: ObjectId) -> Option<&VoxelObject> {
        self.objects.get(&id)
    }

    /// Number of live objects, fragments included.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Live object ids in creation order.
    pub fn object_ids(&self) -> &[ObjectId] {
        &self.order
    }

    /// Creates an object from a grid, queues its first mesh regeneration
    /// and bakes its initial compound colliders when enabled.
    pub fn spawn_object(
        &mut self,
        grid: SharedGrid,
        settings: ObjectSettings,
    ) -> Result<ObjectId, ConfigError> {
        self.spawn_at(grid, settings, Vector3::new(0, 0, 0), None)
    }

    /// Creates an object from a cached decoded model; the decoder closure
    /// only runs on a cache miss.
    pub fn spawn_from_model(
        &mut self,
        model_key: &str,
        settings: ObjectSettings,
        decode: impl FnOnce() -> DecodedModel,
    ) -> Result<ObjectId, ConfigError> {
        let grid = self
            .model_cache
            .get_or_insert_with(model_key, || Arc::new(VoxelGrid::from_decoded_model(&decode())));
        self.spawn_object(grid, settings)
    }

    /// Swaps an object's grid for a new one, then queues a mesh
    /// regeneration and collider rebuild. Rejected while a mesh
    /// regeneration is in flight on the object.
    pub fn assign_grid(&mut self, id: ObjectId, grid: SharedGrid) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        if object.is_inert() || !object.assign_grid(grid) {
            return false;
        }

        if object.settings.compound.enabled {
            let compound = object.settings.compound.clone();
            object.collider.rebuild(&object.grid, &compound);
        }
        self.request_mesh_regeneration(id);
        true
    }

    /// Requests a shape-based destruction on an object.
    ///
    /// Returns whether the destruction *started*; completion is
    /// asynchronous across subsequent ticks. Rejections (unknown or inert
    /// object, busy engine, malformed shape, filtered material, vetoing
    /// observer, no voxel in range) leave all state unchanged.
    pub fn request_destruction(&mut self, id: ObjectId, shape: &DestructionShape) -> bool {
        let Some(object) = self.objects.get(&id) else {
            return false;
        };
        if object.is_inert() {
            return false;
        }
        if !self.events.allows_destruction(id, shape) {
            debug!("destruction on {id:?} vetoed by observer filter");
            return false;
        }

        let object = self.objects.get_mut(&id).expect("checked above");
        object.destruction.request(
            &object.grid,
            shape,
            object.settings.material.as_deref(),
            &self.material_filter,
        )
    }

    /// Queues a mesh regeneration; duplicate queue entries are collapsed.
    pub fn request_mesh_regeneration(&mut self, id: ObjectId) {
        if !self.objects.contains_key(&id) {
            return;
        }
        if !self.mesh_queue.contains(&id) {
            self.mesh_queue.push_back(id);
        }
    }

    /// Requests a runtime compound-collider rebuild, honoring the
    /// per-object cooldown and the one-way small-object latch.
    pub fn request_collider_rebuild(&mut self, id: ObjectId) {
        let tick = self.tick;
        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        if !object.settings.compound.enabled {
            return;
        }
        let compound = object.settings.compound.clone();
        object.collider.try_runtime_rebuild(&object.grid, &compound, tick);
    }

    /// Applies an impact paint to an object, choosing the addressing mode
    /// by its collider configuration.
    ///
    /// Mesh mode paints immediately from the surface-projected point.
    /// Compound mode latches the impact onto the next voxel-removal
    /// notification and returns a zero result now.
    pub fn apply_impact_paint(
        &mut self,
        id: ObjectId,
        impact: Point3<f32>,
        radius: f32,
        seed: u32,
    ) -> PaintResult {
        let tick = self.tick;
        let Some(object) = self.objects.get_mut(&id) else {
            return PaintResult::default();
        };
        if object.is_inert() {
            return PaintResult::default();
        }
        let profile = object.settings.paint.clone();

        let result = if object.settings.compound.enabled {
            object
                .compound_painter
                .queue_impact(&mut object.grid, impact, radius, &profile, seed, tick)
                .unwrap_or_default()
        } else {
            apply_paint(&mut object.grid, impact, radius, &profile, seed)
        };

        if result.voxels_changed > 0 {
            self.request_mesh_regeneration(id);
        }
        result
    }

    /// Advances the world by one tick.
    pub fn tick(&mut self) {
        self.tick += 1;
        self.start_queued_mesh_regens();
        self.poll_mesh_jobs();
        self.step_destructions();
        self.process_teardowns();
    }

    /// Pops mesh-regeneration requests up to the per-tick budget.
    ///
    /// Entries whose target vanished or went inert are dropped without
    /// consuming budget. An object whose previous regeneration is still in
    /// flight keeps its place at the front of the queue.
    fn start_queued_mesh_regens(&mut self) {
        let mut started = 0;
        let mut deferred = Vec::new();

        while started < self.budgets.max_mesh_regens_per_tick {
            let Some(id) = self.mesh_queue.pop_front() else {
                break;
            };
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            if object.teardown_flagged {
                continue;
            }
            if object.mesh_job.is_some() {
                deferred.push(id);
                continue;
            }

            object.mesh_job = Some(MeshJob::with_buffer(
                Arc::clone(&object.grid),
                object.settings.mesh.voxel_size,
                self.mesh_pool.acquire(),
            ));
            started += 1;
        }

        for id in deferred.into_iter().rev() {
            self.mesh_queue.push_front(id);
        }
    }

    /// Polls every in-flight mesh job once; finished jobs publish their
    /// mesh and trigger follow-up work.
    fn poll_mesh_jobs(&mut self) {
        let ids: Vec<ObjectId> = self.order.clone();
        let mut pending_fragments: Vec<(ObjectId, ExtractedFragment, ObjectSettings)> = Vec::new();

        for id in ids {
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            let Some(job) = object.mesh_job.as_mut() else {
                continue;
            };
            if job.poll() == MeshJobProgress::Pending {
                continue;
            }

            let mesh = object
                .mesh_job
                .take()
                .and_then(|mut job| job.take_mesh())
                .unwrap_or_default();
            object.refresh_voxel_count();

            let empty = mesh.is_empty();
            if let Some(previous) = object.mesh.replace(mesh) {
                self.mesh_pool.release(previous);
            }

            let mesh_ref = self.objects[&id].mesh.as_ref().expect("just stored");
            self.events.emit(WorldEvent::MeshGenerated {
                object: id,
                mesh: mesh_ref,
            });

            let object = self.objects.get_mut(&id).expect("still live");
            if empty {
                match object.settings.mesh.empty_action {
                    EmptyAction::Teardown => {
                        info!("object {id:?} meshed empty, queueing teardown");
                        object.teardown_flagged = true;
                        object.needs_isolation = false;
                        self.teardown_queue.push_back((id, self.tick));
                    }
                    EmptyAction::Deactivate => {
                        object.deactivated = true;
                        object.needs_isolation = false;
                    }
                }
                continue;
            }

            // Meshing has settled; run the deferred isolation pass.
            if object.needs_isolation {
                object.needs_isolation = false;
                let min_voxels = object.settings.isolation.min_fragment_voxels;
                let fragments = isolate_clusters(Arc::make_mut(&mut object.grid), min_voxels);
                if !fragments.is_empty() {
                    let settings = object.settings.clone();
                    object.refresh_voxel_count();
                    for fragment in fragments {
                        pending_fragments.push((id, fragment, settings.clone()));
                    }
                    self.request_mesh_regeneration(id);
                    self.request_collider_rebuild(id);
                }
            }
        }

        for (parent, fragment, settings) in pending_fragments {
            self.spawn_fragment(parent, fragment, settings);
        }
    }

    /// Steps every in-flight destruction once.
    fn step_destructions(&mut self) {
        let ids: Vec<ObjectId> = self.order.clone();

        for id in ids {
            let Some(object) = self.objects.get(&id) else {
                continue;
            };

            match object.destruction.phase() {
                DestructionPhase::Destroying => {
                    // The before-removal notification carries the selected
                    // set while the voxels are still present.
                    let indices = object.destruction.pending_indices().to_vec();
                    self.events.emit(WorldEvent::BeforeVoxelsRemoved {
                        object: id,
                        indices: &indices,
                    });
                    self.step_one_destruction(id);
                }
                DestructionPhase::Fragmenting => self.step_one_destruction(id),
                _ => {}
            }
        }
    }

    fn step_one_destruction(&mut self, id: ObjectId) {
        let tick = self.tick;
        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        let settings = object.settings.destruction.clone();
        let progress = object
            .destruction
            .step(Arc::make_mut(&mut object.grid), &settings);

        let outcome = match progress {
            DestructionProgress::Pending => return,
            DestructionProgress::Complete(outcome) => outcome,
        };

        match outcome {
            DestructionOutcome::Teardown => {
                info!("object {id:?} below minimum remnant, queueing teardown");
                object.teardown_flagged = true;
                object.destruction.finish();
                self.teardown_queue.push_back((id, tick));
            }
            DestructionOutcome::Removed { removed } => {
                self.finish_removal(id, &removed, Vec::new());
            }
            DestructionOutcome::Fragmented { removed, fragments } => {
                self.finish_removal(id, &removed, fragments);
            }
        }
    }

    /// Common completion path for removals and fragmentations: events,
    /// deferred compound paint, follow-up mesh/collider work, isolation
    /// flag, fragment spawning.
    fn finish_removal(&mut self, id: ObjectId, removed: &[usize], fragments: Vec<ExtractedFragment>) {
        let tick = self.tick;
        self.events.emit(WorldEvent::VoxelsRemoved {
            object: id,
            indices: removed,
        });

        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        let profile = object.settings.paint.clone();
        let paint = object.compound_painter.notify_voxels_removed(
            &mut object.grid,
            removed.len(),
            &profile,
            tick,
        );
        if let Some(result) = paint {
            debug!("compound paint applied to {} voxels on {id:?}", result.voxels_changed);
        }

        object.refresh_voxel_count();
        if object.settings.isolation.run_after_destruction {
            object.needs_isolation = true;
        }
        let settings = object.settings.clone();
        object.destruction.finish();

        self.request_mesh_regeneration(id);
        self.request_collider_rebuild(id);

        for fragment in fragments {
            self.spawn_fragment(id, fragment, settings.clone());
        }
    }

    /// Completes deferred teardowns up to the per-tick budget.
    ///
    /// The queue is strictly FIFO: the front entry blocks the rest until
    /// its delay elapses and its fragmenter (if any) settles. Entries whose
    /// target already vanished are dropped without consuming budget.
    fn process_teardowns(&mut self) {
        let mut completed = 0;

        while completed < self.budgets.max_teardowns_per_tick {
            let Some(&(id, queued_tick)) = self.teardown_queue.front() else {
                break;
            };
            if self.tick.saturating_sub(queued_tick) < self.budgets.teardown_delay_ticks {
                break;
            }
            if let Some(object) = self.objects.get(&id) {
                let phase = object.destruction.phase();
                if phase == DestructionPhase::Fragmenting
                    || phase == DestructionPhase::FragmentProcessing
                {
                    break;
                }
            }

            self.teardown_queue.pop_front();
            let Some(mut object) = self.objects.remove(&id) else {
                continue;
            };
            if let Some(mesh) = object.mesh.take() {
                self.mesh_pool.release(mesh);
            }
            self.order.retain(|&o| o != id);
            self.events.emit(WorldEvent::ObjectTornDown { object: id });
            completed += 1;
        }
    }

    fn spawn_at(
        &mut self,
        grid: SharedGrid,
        settings: ObjectSettings,
        origin: Vector3<i32>,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId, ConfigError> {
        let id = ObjectId(self.next_id);
        let mut object = VoxelObject::new(id, grid, settings, origin).map_err(|e| {
            warn!("object creation failed: {e}");
            e
        })?;
        self.next_id += 1;

        if object.settings.compound.enabled {
            let compound = object.settings.compound.clone();
            object.collider.rebuild(&object.grid, &compound);
        }

        self.objects.insert(id, object);
        self.order.push(id);
        self.request_mesh_regeneration(id);

        if let Some(parent) = parent {
            self.events.emit(WorldEvent::FragmentSpawned {
                parent,
                fragment: id,
            });
        }
        Ok(id)
    }

    fn spawn_fragment(
        &mut self,
        parent: ObjectId,
        fragment: ExtractedFragment,
        settings: ObjectSettings,
    ) -> Option<ObjectId> {
        match self.spawn_at(
            Arc::new(fragment.grid),
            settings,
            fragment.offset,
            Some(parent),
        ) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("fragment spawn from {parent:?} failed: {e}");
                None
            }
        }
    }
}

impl Default for VoxelWorld {
    fn default() -> Self {
        VoxelWorld::new(WorldBudgets::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::{Rgba, Voxel};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn solid_grid(n: i32) -> SharedGrid {
        let mut grid = VoxelGrid::empty(Vector3::new(n, n, n), vec![Rgba::new(90, 90, 90)]);
        for voxel in grid.voxels.iter_mut() {
            *voxel = Voxel::solid(0);
        }
        Arc::new(grid)
    }

    fn sphere(x: f32, y: f32, z: f32, radius: f32) -> DestructionShape {
        DestructionShape::Sphere {
            center: Point3::new(x, y, z),
            radius,
        }
    }

    /// A mesh job needs one poll per axis sweep plus one for assembly.
    const MESH_TICKS: usize = 4;

    #[test]
    fn spawned_object_meshes_within_the_job_budget() {
        let mut world = VoxelWorld::default();
        let id = world.spawn_object(solid_grid(2), ObjectSettings::default()).unwrap();

        for _ in 0..MESH_TICKS {
            assert!(world.object(id).unwrap().mesh().is_none());
            world.tick();
        }
        let mesh = world.object(id).unwrap().mesh().unwrap();
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn mesh_budget_limits_concurrent_regenerations() {
        let budgets = WorldBudgets {
            max_mesh_regens_per_tick: 2,
            ..WorldBudgets::default()
        };
        let mut world = VoxelWorld::new(budgets);
        let ids: Vec<ObjectId> = (0..3)
            .map(|_| world.spawn_object(solid_grid(2), ObjectSettings::default()).unwrap())
            .collect();

        world.tick();
        let active: usize = ids
            .iter()
            .filter(|&&id| world.object(id).unwrap().mesh_regeneration_active())
            .count();
        assert_eq!(active, 2);
        // The third starts on the following tick, preserving arrival order.
        world.tick();
        assert!(world.object(ids[2]).unwrap().mesh_regeneration_active());
    }

    #[test]
    fn mesh_regenerations_recycle_pooled_buffers() {
        let mut world = VoxelWorld::default();
        let id = world.spawn_object(solid_grid(2), ObjectSettings::default()).unwrap();
        for _ in 0..MESH_TICKS {
            world.tick();
        }
        assert_eq!(world.mesh_pool.pooled(), 0);

        // The second regeneration releases the replaced mesh into the pool.
        world.request_mesh_regeneration(id);
        for _ in 0..MESH_TICKS {
            world.tick();
        }
        assert_eq!(world.mesh_pool.pooled(), 1);

        // The third regeneration drains the pooled buffer when it starts.
        world.request_mesh_regeneration(id);
        world.tick();
        assert_eq!(world.mesh_pool.pooled(), 0);
    }

    #[test]
    fn destruction_fires_events_in_order_and_clears_voxels() {
        let mut world = VoxelWorld::default();
        let id = world.spawn_object(solid_grid(4), ObjectSettings::default()).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            world.events_mut().subscribe(move |event| {
                let tag = match event {
                    WorldEvent::BeforeVoxelsRemoved { indices, .. } => {
                        format!("before:{}", indices.len())
                    }
                    WorldEvent::VoxelsRemoved { indices, .. } => format!("removed:{}", indices.len()),
                    _ => return,
                };
                log.borrow_mut().push(tag);
            });
        }

        assert!(world.request_destruction(id, &sphere(0.0, 0.0, 0.0, 1.0)));
        world.tick();

        assert_eq!(*log.borrow(), vec!["before:4", "removed:4"]);
        assert_eq!(world.object(id).unwrap().grid().active_count(), 60);
    }

    #[test]
    fn observer_filter_vetoes_destruction() {
        let mut world = VoxelWorld::default();
        let id = world.spawn_object(solid_grid(2), ObjectSettings::default()).unwrap();
        world.events_mut().add_destruction_filter(|_, _| false);
        assert!(!world.request_destruction(id, &sphere(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn emptying_destruction_tears_the_object_down_after_the_delay() {
        let budgets = WorldBudgets {
            teardown_delay_ticks: 2,
            ..WorldBudgets::default()
        };
        let mut world = VoxelWorld::new(budgets);
        let id = world.spawn_object(solid_grid(2), ObjectSettings::default()).unwrap();

        assert!(world.request_destruction(id, &sphere(0.5, 0.5, 0.5, 3.0)));
        world.tick();
        assert!(world.object(id).is_some());

        world.tick();
        world.tick();
        assert!(world.object(id).is_none());
        assert_eq!(world.object_count(), 0);
    }

    #[test]
    fn teardown_budget_carries_overflow_to_the_next_tick() {
        let budgets = WorldBudgets {
            max_teardowns_per_tick: 1,
            teardown_delay_ticks: 0,
            ..WorldBudgets::default()
        };
        let mut world = VoxelWorld::new(budgets);
        let a = world.spawn_object(solid_grid(2), ObjectSettings::default()).unwrap();
        let b = world.spawn_object(solid_grid(2), ObjectSettings::default()).unwrap();

        assert!(world.request_destruction(a, &sphere(0.5, 0.5, 0.5, 3.0)));
        assert!(world.request_destruction(b, &sphere(0.5, 0.5, 0.5, 3.0)));
        world.tick();
        assert_eq!(world.object_count(), 1);
        world.tick();
        assert_eq!(world.object_count(), 0);
    }

    #[test]
    fn isolation_spawns_fragments_once_meshing_settles() {
        // Two 1-voxel towers joined by a bridge voxel; destroying the
        // bridge splits the object.
        let mut grid = VoxelGrid::empty(Vector3::new(3, 1, 1), vec![Rgba::new(0, 0, 0)]);
        grid.set_at(0, 0, 0, Voxel::solid(0));
        grid.set_at(1, 0, 0, Voxel::solid(0));
        grid.set_at(2, 0, 0, Voxel::solid(0));

        let mut settings = ObjectSettings::default();
        settings.isolation.run_after_destruction = true;
        let mut world = VoxelWorld::default();
        let id = world.spawn_object(Arc::new(grid), settings).unwrap();

        let fragments = Rc::new(RefCell::new(Vec::new()));
        {
            let fragments = Rc::clone(&fragments);
            world.events_mut().subscribe(move |event| {
                if let WorldEvent::FragmentSpawned { fragment, .. } = event {
                    fragments.borrow_mut().push(*fragment);
                }
            });
        }

        assert!(world.request_destruction(id, &sphere(1.0, 0.0, 0.0, 0.5)));
        // One tick removes the bridge, then the queued regeneration has to
        // finish before the isolation pass runs.
        for _ in 0..1 + MESH_TICKS {
            world.tick();
        }

        assert_eq!(fragments.borrow().len(), 1);
        let fragment_id = fragments.borrow()[0];
        let fragment = world.object(fragment_id).unwrap();
        assert_eq!(fragment.grid().active_count(), 1);
        assert_eq!(fragment.origin(), Vector3::new(2, 0, 0));
        assert_eq!(world.object(id).unwrap().grid().active_count(), 1);
    }

    #[test]
    fn fragmentation_mode_spawns_fragment_objects() {
        let mut settings = ObjectSettings::default();
        settings.destruction.mode = crate::settings::DestructionMode::SingleFragment;
        let mut world = VoxelWorld::default();
        let id = world.spawn_object(solid_grid(4), settings).unwrap();

        assert!(world.request_destruction(id, &sphere(0.0, 0.0, 0.0, 1.0)));
        world.tick(); // clears voxels, suspends before fragmenting
        assert_eq!(world.object_count(), 1);
        world.tick(); // fragmenter completes and the fragment spawns

        assert_eq!(world.object_count(), 2);
        let fragment_id = world.object_ids()[1];
        assert_eq!(world.object(fragment_id).unwrap().grid().active_count(), 4);
    }

    #[test]
    fn cached_models_share_grids_until_painted() {
        let decoded = DecodedModel::from_cells(
            Vector3::new(2, 2, 2),
            vec![(Point3::new(0, 0, 0), Rgba::new(10, 20, 30))],
        );
        let mut world = VoxelWorld::default();
        let a = world
            .spawn_from_model("crate", ObjectSettings::default(), || decoded.clone())
            .unwrap();
        let b = world
            .spawn_from_model("crate", ObjectSettings::default(), || {
                panic!("decoder must not run on a cache hit")
            })
            .unwrap();

        assert!(Arc::ptr_eq(world.object(a).unwrap().grid(), world.object(b).unwrap().grid()));

        // Painting one owner must not recolor the other.
        world.apply_impact_paint(a, Point3::new(0.0, 0.0, 0.0), 1.0, 1);
        assert!(!Arc::ptr_eq(world.object(a).unwrap().grid(), world.object(b).unwrap().grid()));
        assert_eq!(world.object(b).unwrap().grid().palette.len(), 1);
    }

    #[test]
    fn compound_objects_defer_paint_until_voxels_are_removed() {
        let mut settings = ObjectSettings::default();
        settings.compound.enabled = true;
        settings.paint.noise = 0.0;
        settings.paint.blend_mode = crate::settings::PaintBlendMode::Replace;
        let mut world = VoxelWorld::default();
        let id = world.spawn_object(solid_grid(4), settings).unwrap();

        let queued = world.apply_impact_paint(id, Point3::new(0.0, 0.0, 0.0), 1.5, 3);
        assert_eq!(queued.voxels_changed, 0);
        assert_eq!(world.object(id).unwrap().grid().palette.len(), 1);

        assert!(world.request_destruction(id, &sphere(0.0, 0.0, 0.0, 1.0)));
        world.tick();
        // The latched paint applied alongside the removal notification.
        assert_eq!(world.object(id).unwrap().grid().palette.len(), 2);
    }
}
