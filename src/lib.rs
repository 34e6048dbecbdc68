#![warn(missing_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Destruction
//!
//! A runtime voxel-destruction core: given a dense 3D grid of colored
//! voxels representing a solid object, it supports localized removal of
//! voxels with sphere, cube and capsule shapes, regenerates a renderable
//! surface mesh from the remaining voxels, re-derives compound box
//! collision geometry, and splits disconnected remnants into separate
//! fragment objects.
//!
//! ## Key Modules
//!
//! * `voxel` - The dense voxel grid data model and its color palette
//! * `meshing` - Binary greedy meshing into minimal-triangle surface meshes
//! * `isolation` - Connected-component detection and fragment extraction
//! * `collider` - Greedy box cover with incremental add/remove/reuse diffing
//! * `destruction` - The per-object destruction state machine and fragmenters
//! * `paint` - Post-destruction surface color modification
//! * `world` - The cooperative orchestrator with per-tick work budgets
//!
//! ## Architecture
//!
//! Everything runs on a single cooperative host thread. Expensive
//! operations (meshing, destruction) are explicit multi-step jobs polled
//! once per tick, and globally budgeted work queues spread teardown and
//! mesh-regeneration spikes across frames. Grids are shared copy-on-write:
//! many objects can alias one cached model grid until the first mutation.
//!
//! The crate deliberately stops at the host boundary: model file parsing,
//! rendering, and physics simulation are collaborator concerns. Hosts feed
//! in [`voxel::DecodedModel`] data and local voxel-space impact points, and
//! consume meshes, collider boxes and events.
//!
//! ## Usage
//!
//! ```rust
//! use cgmath::{Point3, Vector3};
//! use voxel_destruction::destruction::DestructionShape;
//! use voxel_destruction::voxel::{DecodedModel, Rgba};
//! use voxel_destruction::world::{ObjectSettings, VoxelWorld};
//!
//! let mut world = VoxelWorld::default();
//! let model = DecodedModel::from_cells(
//!     Vector3::new(2, 2, 2),
//!     vec![(Point3::new(0, 0, 0), Rgba::new(200, 60, 40))],
//! );
//! let id = world
//!     .spawn_from_model("crate-small", ObjectSettings::default(), || model)
//!     .unwrap();
//!
//! world.request_destruction(
//!     id,
//!     &DestructionShape::Sphere {
//!         center: Point3::new(0.0, 0.0, 0.0),
//!         radius: 1.0,
//!     },
//! );
//! world.tick();
//! ```

pub mod collider;
pub mod core;
pub mod destruction;
pub mod error;
pub mod isolation;
pub mod meshing;
pub mod paint;
pub mod settings;
pub mod voxel;
pub mod world;
