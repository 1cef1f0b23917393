//! Generation-checked registry of opaque handles.

use std::fmt;

use crate::errors::HandleError;

use super::opaque::{HandleKind, OpaqueHandle};

/// Stable id for a registered handle. Ids are never reused: a freed slot
/// gets a new generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    index: u32,
    generation: u32,
}

impl HandleId {
    /// Pack into one integer for hosts that pass ids as numbers.
    pub fn as_u64(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_u64(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    handle: Option<OpaqueHandle>,
}

/// Slot map from `HandleId` to `OpaqueHandle`.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: OpaqueHandle) -> HandleId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.handle = Some(handle);
            return HandleId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            handle: Some(handle),
        });
        HandleId {
            index,
            generation: 1,
        }
    }

    fn stale(id: HandleId) -> HandleError {
        HandleError::Stale { id: id.to_string() }
    }

    pub fn get(&self, id: HandleId) -> Result<&OpaqueHandle, HandleError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.handle.as_ref())
            .ok_or_else(|| Self::stale(id))
    }

    pub fn get_mut(&mut self, id: HandleId) -> Result<&mut OpaqueHandle, HandleError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.handle.as_mut())
            .ok_or_else(|| Self::stale(id))
    }

    pub fn kind(&self, id: HandleId) -> Result<HandleKind, HandleError> {
        self.get(id).map(OpaqueHandle::kind)
    }

    /// Unregister and return the handle without destroying it.
    pub fn remove(&mut self, id: HandleId) -> Result<OpaqueHandle, HandleError> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .ok_or_else(|| Self::stale(id))?;
        let handle = slot.handle.take().ok_or_else(|| Self::stale(id))?;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(id.index);
        self.live -= 1;
        Ok(handle)
    }

    /// Unregister and run the handle's destructor.
    pub fn destroy(&mut self, id: HandleId) -> Result<(), HandleError> {
        let mut handle = self.remove(id)?;
        handle.destroy()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
