//! Observer lists for world notifications.
//!
//! Observers are plain boxed closures dispatched in registration order, so
//! tests can rely on a deterministic callback sequence. Destruction filters
//! are a separate list: each gets a chance to veto a request before it
//! starts.

use super::ObjectId;
use crate::destruction::DestructionShape;
use crate::meshing::VoxelMesh;

/// A notification published by the world orchestrator.
#[derive(Debug)]
pub enum WorldEvent<'a> {
    /// Fires after a destruction is accepted, before the selected voxels
    /// are cleared from the grid.
    BeforeVoxelsRemoved {
        object: ObjectId,
        indices: &'a [usize],
    },
    /// Fires once the selected voxels have been cleared.
    VoxelsRemoved {
        object: ObjectId,
        indices: &'a [usize],
    },
    /// Fires when a mesh regeneration completes, including empty meshes.
    MeshGenerated { object: ObjectId, mesh: &'a VoxelMesh },
    /// Fires for every fragment object spawned from a destruction or an
    /// isolation pass.
    FragmentSpawned { parent: ObjectId, fragment: ObjectId },
    /// Fires when an object is torn down and its id becomes invalid.
    ObjectTornDown { object: ObjectId },
}

type Observer = Box<dyn FnMut(&WorldEvent<'_>)>;
type DestructionFilter = Box<dyn FnMut(ObjectId, &DestructionShape) -> bool>;

/// Registration-ordered observer and veto lists.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Observer>,
    filters: Vec<DestructionFilter>,
}

impl EventBus {
    /// Creates a bus with no observers or filters.
    pub fn new() -> Self {
        EventBus::default()
    }

    /// Registers an observer; observers fire in registration order.
    pub fn subscribe(&mut self, observer: impl FnMut(&WorldEvent<'_>) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Registers a filter that may veto destruction requests by returning
    /// `false`.
    pub fn add_destruction_filter(
        &mut self,
        filter: impl FnMut(ObjectId, &DestructionShape) -> bool + 'static,
    ) {
        self.filters.push(Box::new(filter));
    }

    /// Dispatches an event to every observer in registration order.
    pub fn emit(&mut self, event: WorldEvent<'_>) {
        for observer in self.observers.iter_mut() {
            observer(&event);
        }
    }

    /// Returns true if no registered filter vetoes the request.
    pub fn allows_destruction(&mut self, object: ObjectId, shape: &DestructionShape) -> bool {
        self.filters.iter_mut().all(|f| f(object, shape))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn observers_fire_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            bus.subscribe(move |_| order.borrow_mut().push(tag));
        }

        bus.emit(WorldEvent::ObjectTornDown {
            object: ObjectId(0),
        });
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn any_filter_can_veto_a_destruction() {
        let mut bus = EventBus::new();
        let shape = DestructionShape::Sphere {
            center: Point3::new(0.0, 0.0, 0.0),
            radius: 1.0,
        };

        assert!(bus.allows_destruction(ObjectId(1), &shape));

        bus.add_destruction_filter(|object, _| object != ObjectId(1));
        assert!(!bus.allows_destruction(ObjectId(1), &shape));
        assert!(bus.allows_destruction(ObjectId(2), &shape));
    }
}
