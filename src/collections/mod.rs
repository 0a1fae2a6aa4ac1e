//! Registries that own the renderer's resources.
//!
//! Each collection is created at renderer setup and passed by reference to
//! whatever needs it. Resources are addressed by handle; removing one leaves
//! a tombstone so every other handle keeps pointing at the same resource.

mod cameras;
mod lights;
mod meshes;
mod shaders;
mod textures;

pub use cameras::CamerasCollection;
pub use lights::{LightsCollection, LIGHTS_BLOCK, MAX_LIGHTS};
pub use meshes::MeshesCollection;
pub use shaders::{ShaderKind, StoredShaders, LIGHTS_BINDING, MATRICES_BINDING};
pub use textures::TexturesCollection;

use std::marker::PhantomData;

/// Tombstoned slot storage behind every collection.
#[derive(Debug)]
pub struct Slots<H, T> {
    slots: Vec<Option<T>>,
    live: usize,
    _handle: PhantomData<H>,
}

impl<H, T> Default for Slots<H, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            _handle: PhantomData,
        }
    }
}

impl<H, T> Slots<H, T>
where
    H: Copy + From<usize> + Into<usize>,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the next [`Slots::insert`] will return.
    pub fn next_handle(&self) -> H {
        H::from(self.slots.len())
    }

    pub fn insert(&mut self, value: T) -> H {
        let handle = self.next_handle();
        self.slots.push(Some(value));
        self.live += 1;
        handle
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        self.slots.get(handle.into())?.as_ref()
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.slots.get_mut(handle.into())?.as_mut()
    }

    pub fn remove(&mut self, handle: H) -> Option<T> {
        let value = self.slots.get_mut(handle.into())?.take();
        if value.is_some() {
            self.live -= 1;
        }
        value
    }

    /// Live resources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (H::from(index), value)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (H::from(index), value)))
    }

    pub fn handles(&self) -> Vec<H> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drops every resource in insertion order.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            drop(slot.take());
        }
        self.live = 0;
    }
}
