//! Generation-checked arena that assigns stable slot indices to live targets.
use std::fmt::Display;

use crate::error::Error;

/// Default number of slots on a bus
pub const DEFAULT_MAX_TARGETS: usize = 16;

/// Strongly typed handle of an occupied slot. The generation distinguishes
/// successive occupants of the same index so that a handle kept past removal
/// can never address the next target plugged into that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId {
    pub index: u32,
    pub generation: u64,
}

impl TargetId {
    pub fn new(index: u32, generation: u64) -> Self {
        Self { index, generation }
    }
}

impl Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

/// Fixed capacity table mapping slot indices to live values
#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    occupied: usize,
}

impl<T> SlotTable<T> {
    /// Create a new table with the given number of slots
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                value: None,
            })
            .collect();
        Self { slots, occupied: 0 }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Returns the lowest free index, if any
    pub fn next_free(&self) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| slot.value.is_none())
            .map(|i| i as u32)
    }

    /// Reserve the lowest free slot for the value built by the given closure.
    /// The closure receives the id the value will be stored under.
    pub fn insert_with<F>(&mut self, f: F) -> Result<TargetId, Error>
    where
        F: FnOnce(TargetId) -> T,
    {
        let Some(index) = self.next_free() else {
            log::debug!("No free slot left out of {}", self.capacity());
            return Err(Error::NoFreeSlot);
        };
        let slot = &mut self.slots[index as usize];
        slot.generation += 1;
        let id = TargetId::new(index, slot.generation);
        slot.value = Some(f(id));
        self.occupied += 1;
        Ok(id)
    }

    /// Reserve the lowest free slot for the given value
    pub fn insert(&mut self, value: T) -> Result<TargetId, Error> {
        self.insert_with(|_| value)
    }

    /// Returns the value stored under the given id. Stale ids return nothing.
    pub fn get(&self, id: TargetId) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Returns the value currently occupying the given index
    pub fn get_by_index(&self, index: u32) -> Option<(TargetId, &T)> {
        let slot = self.slots.get(index as usize)?;
        let value = slot.value.as_ref()?;
        Some((TargetId::new(index, slot.generation), value))
    }

    /// Release the slot with the given id. Stale ids are left untouched.
    pub fn remove(&mut self, id: TargetId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.occupied -= 1;
        Some(value)
    }

    /// Iterate over all occupied slots in index order
    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let value = slot.value.as_ref()?;
            Some((TargetId::new(i as u32, slot.generation), value))
        })
    }

    /// Returns the ids of all occupied slots matching the given predicate
    pub fn ids_where<P>(&self, predicate: P) -> Vec<TargetId>
    where
        P: Fn(&T) -> bool,
    {
        self.iter()
            .filter(|(_, value)| predicate(value))
            .map(|(id, _)| id)
            .collect()
    }
}
