//! Binary greedy meshing over a voxel grid.
//!
//! ## Algorithm
//!
//! For each axis `d` (with `u`, `v` the other two axes in cyclic order) the
//! mesher walks all `dims[d] + 1` slice boundaries, from the plane below the
//! first layer to the plane above the last. At each boundary it compares the
//! voxel just below against the voxel just above (cells outside the grid
//! count as empty):
//!
//! - both active or both inactive: no face, the mask cell stays empty;
//! - only "below" inactive: the "above" voxel is recorded tagged as a back
//!   face (normal toward negative `d`);
//! - only "above" inactive: the "below" voxel is recorded tagged as a front
//!   face (normal toward positive `d`).
//!
//! A 2D pass then merges mask cells into maximal rectangles: a run is
//! extended along `u` while cells compare equal (active + color +
//! orientation), then along `v` while the entire row of the current width
//! still compares equal. Consumed cells are zeroed so every face contributes
//! to exactly one quad.
//!
//! Vertex positions use a half-cell offset (`(cell - 0.5) * voxel_size`) so
//! voxel centers sit on integer coordinates and surfaces on half-integer
//! boundaries. Winding flips with the orientation tag so all faces point
//! outward.

use log::debug;

use crate::voxel::{SharedGrid, Voxel, VoxelGrid, FACE_BACK, FACE_FRONT, FACE_NONE};

use super::mesh::{MeshVertex, VoxelMesh};

/// A merged rectangle of identical faces, produced by an axis sweep and
/// consumed by mesh assembly.
#[derive(Debug, Clone, Copy)]
struct QuadRect {
    /// Cell-space origin corner of the quad (on the slice boundary plane).
    origin: [i32; 3],
    /// Extent along the `u` axis, zero elsewhere.
    du: [i32; 3],
    /// Extent along the `v` axis, zero elsewhere.
    dv: [i32; 3],
    /// Sweep axis (0 = x, 1 = y, 2 = z).
    axis: usize,
    /// The represented voxel, tagged with its face orientation.
    voxel: Voxel,
}

/// Progress of a polled meshing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshJobProgress {
    /// More polls are needed.
    Pending,
    /// The mesh is ready to be taken.
    Finished,
}

/// Internal state of a [`MeshJob`]; each variant is one poll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeshJobState {
    /// Sweeping the given axis next.
    Sweep(usize),
    /// All masks computed; assembling vertex and index buffers next.
    Assemble,
    /// Mesh built and waiting to be taken.
    Done,
}

/// A time-sliced mesh generation task over a read-only grid snapshot.
///
/// The job owns a shared handle to the grid, so the orchestrating loop is
/// free to reassign the object's grid while the job runs; the job keeps
/// meshing its snapshot and the stale result is discarded by the caller.
///
/// Suspension points per poll: one axis sweep each for the three axes, then
/// final mesh assembly.
pub struct MeshJob {
    grid: SharedGrid,
    voxel_size: f32,
    state: MeshJobState,
    quads: Vec<QuadRect>,
    buffer: VoxelMesh,
    mesh: Option<VoxelMesh>,
}

impl MeshJob {
    /// Creates a meshing job over a snapshot of `grid`.
    pub fn new(grid: SharedGrid, voxel_size: f32) -> Self {
        MeshJob::with_buffer(grid, voxel_size, VoxelMesh::new())
    }

    /// Creates a meshing job that assembles into a recycled buffer, keeping
    /// the buffer's allocated capacity.
    pub fn with_buffer(grid: SharedGrid, voxel_size: f32, buffer: VoxelMesh) -> Self {
        MeshJob {
            grid,
            voxel_size,
            state: MeshJobState::Sweep(0),
            quads: Vec::new(),
            buffer,
            mesh: None,
        }
    }

    /// Advances the job by one step.
    ///
    /// # Returns
    /// [`MeshJobProgress::Finished`] once the mesh can be taken with
    /// [`MeshJob::take_mesh`]; [`MeshJobProgress::Pending`] otherwise.
    pub fn poll(&mut self) -> MeshJobProgress {
        match self.state {
            MeshJobState::Sweep(axis) => {
                sweep_axis(&self.grid, axis, &mut self.quads);
                self.state = if axis + 1 < 3 {
                    MeshJobState::Sweep(axis + 1)
                } else {
                    MeshJobState::Assemble
                };
                MeshJobProgress::Pending
            }
            MeshJobState::Assemble => {
                let buffer = std::mem::take(&mut self.buffer);
                let mesh = assemble(&self.grid, self.voxel_size, &self.quads, buffer);
                debug!(
                    "mesh assembled: {} quads, {} vertices",
                    self.quads.len(),
                    mesh.vertex_count()
                );
                self.mesh = Some(mesh);
                self.state = MeshJobState::Done;
                MeshJobProgress::Finished
            }
            MeshJobState::Done => MeshJobProgress::Finished,
        }
    }

    /// Returns true once [`MeshJob::poll`] has produced the final mesh.
    pub fn is_finished(&self) -> bool {
        self.state == MeshJobState::Done
    }

    /// Takes the finished mesh; `None` if the job has not finished.
    pub fn take_mesh(&mut self) -> Option<VoxelMesh> {
        self.mesh.take()
    }
}

/// Meshes a grid synchronously by driving a [`MeshJob`] to completion.
pub fn mesh_grid(grid: &VoxelGrid, voxel_size: f32) -> VoxelMesh {
    let mut job = MeshJob::new(SharedGrid::new(grid.clone()), voxel_size);
    while job.poll() == MeshJobProgress::Pending {}
    job.take_mesh().unwrap_or_default()
}

/// Runs the mask build and rectangle merge for one axis, appending the
/// merged rectangles to `quads`.
fn sweep_axis(grid: &VoxelGrid, d: usize, quads: &mut Vec<QuadRect>) {
    let dims = [grid.size.x, grid.size.y, grid.size.z];
    if dims[d] == 0 || grid.voxels.is_empty() {
        return;
    }

    let u = (d + 1) % 3;
    let v = (d + 2) % 3;
    let mask_width = dims[u] as usize;
    let mask_height = dims[v] as usize;
    let mut mask = vec![Voxel::empty(); mask_width * mask_height];

    // One unit step along the sweep axis.
    let mut q = [0i32; 3];
    q[d] = 1;

    for slice in -1..dims[d] {
        // Build the face mask for the boundary between `slice` and
        // `slice + 1`.
        let mut n = 0usize;
        let mut x = [0i32; 3];
        x[d] = slice;

        for jv in 0..dims[v] {
            x[v] = jv;
            for iu in 0..dims[u] {
                x[u] = iu;

                let below = if x[d] >= 0 {
                    grid.voxel_at(x[0], x[1], x[2])
                } else {
                    Voxel::empty()
                };
                let above = if x[d] < dims[d] - 1 {
                    grid.voxel_at(x[0] + q[0], x[1] + q[1], x[2] + q[2])
                } else {
                    Voxel::empty()
                };

                mask[n] = if below.active == above.active {
                    // Solid-solid is internal, empty-empty has nothing to
                    // mesh.
                    Voxel::empty()
                } else if !below.active {
                    Voxel {
                        face: FACE_BACK,
                        ..above
                    }
                } else {
                    Voxel {
                        face: FACE_FRONT,
                        ..below
                    }
                };
                n += 1;
            }
        }

        // Greedy rectangle merge over the mask.
        let plane = slice + 1;
        let mut n = 0usize;
        for jv in 0..mask_height {
            let mut iu = 0usize;
            while iu < mask_width {
                let cell = mask[n];
                if cell.face == FACE_NONE {
                    iu += 1;
                    n += 1;
                    continue;
                }

                // Extend along u while cells match exactly.
                let mut w = 1usize;
                while iu + w < mask_width && mask[n + w] == cell {
                    w += 1;
                }

                // Extend along v while the entire row of width w matches.
                let mut h = 1usize;
                'grow: while jv + h < mask_height {
                    for k in 0..w {
                        if mask[n + k + h * mask_width] != cell {
                            break 'grow;
                        }
                    }
                    h += 1;
                }

                let mut origin = [0i32; 3];
                origin[d] = plane;
                origin[u] = iu as i32;
                origin[v] = jv as i32;

                let mut du = [0i32; 3];
                du[u] = w as i32;
                let mut dv = [0i32; 3];
                dv[v] = h as i32;

                quads.push(QuadRect {
                    origin,
                    du,
                    dv,
                    axis: d,
                    voxel: cell,
                });

                // Zero consumed cells so each face is meshed exactly once.
                for l in 0..h {
                    for k in 0..w {
                        mask[n + k + l * mask_width] = Voxel::empty();
                    }
                }

                iu += w;
                n += w;
            }
        }
    }
}

/// Builds the final vertex and index buffers from the merged rectangles,
/// writing into `mesh` so a recycled buffer's capacity is reused.
fn assemble(grid: &VoxelGrid, voxel_size: f32, quads: &[QuadRect], mut mesh: VoxelMesh) -> VoxelMesh {
    mesh.vertices.clear();
    mesh.indices.clear();
    if grid.palette.is_empty() {
        return mesh;
    }

    for quad in quads {
        let color_index = (quad.voxel.color as usize).min(grid.palette.len() - 1);
        let color = grid.palette[color_index].to_f32();

        let sign: f32 = if quad.voxel.face == FACE_BACK { -1.0 } else { 1.0 };
        let mut normal = [0.0f32; 3];
        normal[quad.axis] = sign;

        let corner = |a: &[i32; 3]| -> [f32; 3] {
            [
                (a[0] as f32 - 0.5) * voxel_size,
                (a[1] as f32 - 0.5) * voxel_size,
                (a[2] as f32 - 0.5) * voxel_size,
            ]
        };

        let o = quad.origin;
        let c0 = o;
        let c1 = [o[0] + quad.dv[0], o[1] + quad.dv[1], o[2] + quad.dv[2]];
        let c2 = [o[0] + quad.du[0], o[1] + quad.du[1], o[2] + quad.du[2]];
        let c3 = [
            o[0] + quad.du[0] + quad.dv[0],
            o[1] + quad.du[1] + quad.dv[1],
            o[2] + quad.du[2] + quad.dv[2],
        ];

        let base = mesh.vertices.len() as u32;
        for cell in [c0, c1, c2, c3] {
            mesh.vertices.push(MeshVertex {
                position: corner(&cell),
                normal,
                color,
            });
        }

        // Winding flips with the orientation tag so every face points
        // outward.
        let order: [u32; 6] = if quad.voxel.face == FACE_BACK {
            [0, 1, 3, 3, 2, 0]
        } else {
            [0, 3, 1, 3, 0, 2]
        };
        mesh.indices.extend(order.iter().map(|i| base + i));
    }

    mesh
}
