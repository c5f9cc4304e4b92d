//! Entity/component registry.
//!
//! Entities are generational ids. Each component type lives in its own sparse
//! set: a sparse index vector pointing into densely packed component data, so
//! iteration touches only live components and insert/remove are O(1).
//!
//! Key types
//! - [`Entity`]: index + generation handle
//! - [`SparseSet`]: per-component storage
//! - [`Registry`]: entity allocator plus the component stores
//! - [`Transform`], [`MeshRef`], [`Camera`]: the components the renderer reads

use std::sync::Arc;

use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};

pub use crate::data_structures::camera::Camera;
use crate::data_structures::model::Mesh;

/// A handle to an entity. Stale handles (the slot was freed and reused) are
/// detected through the generation and treated as dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub index: u32,
    pub generation: u32,
}

/// Densely packed storage for one component type.
#[derive(Debug)]
pub struct SparseSet<T> {
    sparse: Vec<Option<u32>>,
    dense: Vec<Entity>,
    data: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            data: Vec::new(),
        }
    }
}

impl<T> SparseSet<T> {
    /// Inserts or replaces. Returns the previous value for this entity.
    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let slot = entity.index as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        match self.sparse[slot] {
            Some(d) if self.dense[d as usize] == entity => {
                Some(std::mem::replace(&mut self.data[d as usize], value))
            }
            Some(d) => {
                // Left behind by an older generation of this slot.
                self.dense[d as usize] = entity;
                Some(std::mem::replace(&mut self.data[d as usize], value))
            }
            None => {
                self.sparse[slot] = Some(self.dense.len() as u32);
                self.dense.push(entity);
                self.data.push(value);
                None
            }
        }
    }

    /// Swap-remove; the last element fills the hole.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let d = self.dense_index(entity)?;
        self.sparse[entity.index as usize] = None;
        let last = self.dense.len() - 1;
        self.dense.swap(d, last);
        self.data.swap(d, last);
        if d != last {
            let moved = self.dense[d];
            self.sparse[moved.index as usize] = Some(d as u32);
        }
        self.dense.pop();
        self.data.pop()
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|d| &self.data[d])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(move |d| &mut self.data[d])
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense.iter().copied().zip(self.data.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.dense.iter().copied().zip(self.data.iter_mut())
    }

    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.data.clear();
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let d = (*self.sparse.get(entity.index as usize)?)? as usize;
        (self.dense[d] == entity).then_some(d)
    }
}

/// Placement of an entity. Rotation is Euler angles in degrees, applied
/// x, then y, then z. `anchor` is the placement inherited from import and is
/// identity for batched geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub anchor: Matrix4<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            anchor: Matrix4::identity(),
        }
    }
}

impl Transform {
    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn with_anchor(mut self, anchor: Matrix4<f32>) -> Self {
        self.anchor = anchor;
        self
    }

    /// `anchor * T * Rx * Ry * Rz * S`
    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.anchor
            * Matrix4::from_translation(self.position)
            * Matrix4::from_angle_x(Deg(self.rotation.x))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_z(Deg(self.rotation.z))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// Shared reference to uploaded geometry.
#[derive(Clone, Debug)]
pub struct MeshRef(pub Arc<Mesh>);

impl std::ops::Deref for MeshRef {
    type Target = Mesh;

    fn deref(&self) -> &Mesh {
        &self.0
    }
}

/// Types that have a store in [`Registry`].
pub trait Component: Sized + 'static {
    fn storage(registry: &Registry) -> &SparseSet<Self>;
    fn storage_mut(registry: &mut Registry) -> &mut SparseSet<Self>;
}

macro_rules! component {
    ($ty:ty, $field:ident) => {
        impl Component for $ty {
            fn storage(registry: &Registry) -> &SparseSet<Self> {
                &registry.$field
            }
            fn storage_mut(registry: &mut Registry) -> &mut SparseSet<Self> {
                &mut registry.$field
            }
        }
    };
}

component!(Transform, transforms);
component!(MeshRef, meshes);
component!(Camera, cameras);

#[derive(Debug, Default)]
pub struct Registry {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    transforms: SparseSet<Transform>,
    meshes: SparseSet<MeshRef>,
    cameras: SparseSet<Camera>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Entity {
                index,
                generation: self.generations[slot],
            };
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Entity {
            index,
            generation: 0,
        }
    }

    /// Frees the slot and drops every component the entity had.
    /// Returns false for dead or stale handles.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.transforms.remove(entity);
        self.meshes.remove(entity);
        self.cameras.remove(entity);
        let slot = entity.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        self.alive.get(slot).copied().unwrap_or(false) && self.generations[slot] == entity.generation
    }

    pub fn entity_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// Attaches a component. Ignored (with a warning) for dead entities.
    pub fn insert<C: Component>(&mut self, entity: Entity, component: C) -> Option<C> {
        if !self.is_alive(entity) {
            log::warn!("insert on dead entity {:?} ignored", entity);
            return None;
        }
        C::storage_mut(self).insert(entity, component)
    }

    pub fn remove<C: Component>(&mut self, entity: Entity) -> Option<C> {
        C::storage_mut(self).remove(entity)
    }

    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        C::storage(self).get(entity)
    }

    pub fn get_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        C::storage_mut(self).get_mut(entity)
    }

    pub fn query<C: Component>(&self) -> impl Iterator<Item = (Entity, &C)> {
        C::storage(self).iter()
    }

    pub fn query_mut<C: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut C)> {
        C::storage_mut(self).iter_mut()
    }

    /// Entities that have both a mesh and a transform.
    pub fn drawables(&self) -> impl Iterator<Item = (Entity, &MeshRef, &Transform)> {
        self.meshes
            .iter()
            .filter_map(move |(e, mesh)| self.transforms.get(e).map(|t| (e, mesh, t)))
    }

    /// First camera flagged active, in storage order.
    pub fn active_camera(&self) -> Option<(Entity, &Camera)> {
        self.cameras.iter().find(|(_, c)| c.active)
    }

    /// Despawns everything. Slots keep their generations, so handles from
    /// before the clear stay dead once their slot is reused.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.meshes.clear();
        self.cameras.clear();
        self.free.clear();
        for (slot, alive) in self.alive.iter_mut().enumerate().rev() {
            if *alive {
                *alive = false;
                self.generations[slot] = self.generations[slot].wrapping_add(1);
            }
            self.free.push(slot as u32);
        }
    }
}
