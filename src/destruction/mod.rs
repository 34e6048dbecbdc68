//! # Destruction Module
//!
//! The per-object destruction state machine. A destruction is a multi-step
//! task: the shape-intersection scan runs synchronously at request time (so
//! callers immediately learn whether anything will happen), while removal,
//! fragmentation and the completion bookkeeping run across subsequent ticks
//! of the host loop.
//!
//! ## Phases
//!
//! `Idle -> Destroying -> (Removing | Fragmenting -> FragmentProcessing) -> Idle`
//!
//! Only one destruction may be in flight per object: a request arriving
//! while the phase is not `Idle` is rejected with `false` and no state
//! change. A started destruction cannot be canceled, only run to
//! completion.

pub mod fragmenter;
pub mod shapes;

use cgmath::Point3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::isolation::ExtractedFragment;
use crate::settings::{DestructionMode, DestructionSettings};
use crate::voxel::{Voxel, VoxelGrid};

pub use fragmenter::fragment_removed;
pub use shapes::{select_voxels, DestructionShape};

/// The destruction state machine's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestructionPhase {
    /// No destruction in flight; requests are accepted.
    #[default]
    Idle,
    /// A request was accepted; removal is applied on the next step.
    Destroying,
    /// Voxels were cleared (or the object was flagged for teardown);
    /// waiting for the host's bookkeeping to finish.
    Removing,
    /// Voxels were cleared and captured; the fragmenter runs on the next
    /// step.
    Fragmenting,
    /// Fragments were produced; waiting for the host to spawn them.
    FragmentProcessing,
}

/// What a completed destruction did.
#[derive(Debug)]
pub enum DestructionOutcome {
    /// Too few voxels would remain; the whole object is flagged for
    /// teardown and no per-voxel clearing happened.
    Teardown,
    /// The selected voxels were cleared with no fragmentation.
    Removed { removed: Vec<usize> },
    /// The selected voxels were cleared and partitioned into fragments.
    Fragmented {
        removed: Vec<usize>,
        fragments: Vec<ExtractedFragment>,
    },
}

/// Result of stepping an in-flight destruction once.
#[derive(Debug)]
pub enum DestructionProgress {
    /// More steps remain; poll again next tick.
    Pending,
    /// The destruction's grid work is done; the host finishes bookkeeping
    /// (mesh regen, collider rebuild, fragment spawning) and then calls
    /// [`DestructionEngine::finish`].
    Complete(DestructionOutcome),
}

/// Material tags whose objects reject destruction requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialFilter {
    /// Excluded material tags; an object with no tag is always allowed.
    pub excluded: Vec<String>,
}

impl MaterialFilter {
    /// Returns true if an object with the given material tag may be
    /// destroyed.
    pub fn allows(&self, material: Option<&str>) -> bool {
        match material {
            Some(tag) => !self.excluded.iter().any(|m| m == tag),
            None => true,
        }
    }
}

/// Per-object destruction state machine.
#[derive(Debug, Default)]
pub struct DestructionEngine {
    phase: DestructionPhase,
    selected: Vec<usize>,
    captured: Vec<Voxel>,
    last_destruction_point: Option<Point3<f32>>,
}

impl DestructionEngine {
    /// Creates an idle engine.
    pub fn new() -> Self {
        DestructionEngine::default()
    }

    /// The current phase of the state machine.
    pub fn phase(&self) -> DestructionPhase {
        self.phase
    }

    /// Returns true if a new request would be accepted.
    pub fn is_idle(&self) -> bool {
        self.phase == DestructionPhase::Idle
    }

    /// The voxel indices selected by the accepted request, available until
    /// [`DestructionEngine::finish`]. Hosts fire their before-removal
    /// notification from this set.
    pub fn pending_indices(&self) -> &[usize] {
        &self.selected
    }

    /// Center of the most recently accepted destruction shape, in local
    /// voxel space. Consumed by the painter's compound addressing mode.
    pub fn last_destruction_point(&self) -> Option<Point3<f32>> {
        self.last_destruction_point
    }

    /// Requests a destruction; returns whether it *started*, not whether it
    /// finished (finishing is asynchronous).
    ///
    /// Rejected, with no state change, when: a destruction is already in
    /// flight, the shape parameters are malformed, the object's material is
    /// excluded by the filter, or no active voxel intersects the shape.
    pub fn request(
        &mut self,
        grid: &VoxelGrid,
        shape: &DestructionShape,
        material: Option<&str>,
        filter: &MaterialFilter,
    ) -> bool {
        if self.phase != DestructionPhase::Idle {
            debug!("destruction rejected: phase {:?} not idle", self.phase);
            return false;
        }
        if !shape.is_valid() {
            debug!("destruction rejected: malformed shape {shape:?}");
            return false;
        }
        if !filter.allows(material) {
            debug!("destruction rejected: material {material:?} filtered");
            return false;
        }

        let selected = select_voxels(grid, shape);
        if selected.is_empty() {
            return false;
        }

        self.selected = selected;
        self.last_destruction_point = Some(shape.center());
        self.phase = DestructionPhase::Destroying;
        true
    }

    /// Advances the in-flight destruction by one step. Call once per tick
    /// while not idle; has no effect in the waiting phases.
    pub fn step(
        &mut self,
        grid: &mut VoxelGrid,
        settings: &DestructionSettings,
    ) -> DestructionProgress {
        match self.phase {
            DestructionPhase::Destroying => self.apply_removal(grid, settings),
            DestructionPhase::Fragmenting => self.run_fragmenter(grid, settings),
            _ => DestructionProgress::Pending,
        }
    }

    /// Completes the destruction: the host calls this once its bookkeeping
    /// (mesh regeneration, collider rebuild, fragment spawning) is queued,
    /// returning the engine to `Idle`.
    pub fn finish(&mut self) {
        self.phase = DestructionPhase::Idle;
        self.selected = Vec::new();
        self.captured = Vec::new();
    }

    fn apply_removal(
        &mut self,
        grid: &mut VoxelGrid,
        settings: &DestructionSettings,
    ) -> DestructionProgress {
        // Near-empty remnants are torn down whole instead of re-meshed;
        // per-voxel clearing is skipped entirely.
        let remaining = grid.active_count().saturating_sub(self.selected.len());
        if remaining <= settings.min_remaining_voxels {
            self.phase = DestructionPhase::Removing;
            return DestructionProgress::Complete(DestructionOutcome::Teardown);
        }

        if settings.mode == DestructionMode::Remove {
            for &index in &self.selected {
                grid.voxels[index] = Voxel::empty();
            }
            self.phase = DestructionPhase::Removing;
            return DestructionProgress::Complete(DestructionOutcome::Removed {
                removed: std::mem::take(&mut self.selected),
            });
        }

        // Fragmentation path: colors must be captured before clearing, the
        // fragmenter runs after the source grid is already empty there.
        self.captured = self.selected.iter().map(|&i| grid.voxels[i]).collect();
        for &index in &self.selected {
            grid.voxels[index] = Voxel::empty();
        }
        self.phase = DestructionPhase::Fragmenting;
        DestructionProgress::Pending
    }

    fn run_fragmenter(
        &mut self,
        grid: &VoxelGrid,
        settings: &DestructionSettings,
    ) -> DestructionProgress {
        let removed = std::mem::take(&mut self.selected);
        let captured = std::mem::take(&mut self.captured);
        let fragments = fragment_removed(grid, &removed, &captured, settings);
        self.phase = DestructionPhase::FragmentProcessing;
        DestructionProgress::Complete(DestructionOutcome::Fragmented { removed, fragments })
    }
}
