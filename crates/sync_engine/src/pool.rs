//! Fixed-capacity measurement arena.
//!
//! Slots are pre-allocated once; `acquire` hands out an exclusive `PoolSlot`
//! and `release` gives it back. No allocation happens after construction.

use std::fmt;

use contracts::{Measurement, SensorType};
use slab::Slab;

/// Exclusive handle to a checked-out pool slot
///
/// Deliberately neither `Clone` nor `Copy`: a slot has exactly one owner
/// until it is released.
#[derive(Debug, PartialEq, Eq)]
pub struct PoolSlot(usize);

/// Pre-allocated measurement records for one sensor kind
pub struct MeasurementPool {
    /// Backing storage, one entry per slot
    storage: Slab<Measurement>,
    /// Keys of free slots
    free: Vec<usize>,
    capacity: usize,
}

impl fmt::Debug for MeasurementPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementPool")
            .field("available", &self.free.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl MeasurementPool {
    /// Create a pool with `capacity` empty records of `sensor_type`
    pub fn new(sensor_type: SensorType, capacity: usize) -> Self {
        let mut storage = Slab::with_capacity(capacity);
        let mut free = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            free.push(storage.insert(Measurement::empty(sensor_type)));
        }
        // Pop from the back hands out slot 0 first
        free.reverse();

        Self {
            storage,
            free,
            capacity,
        }
    }

    /// Check out a free slot, `None` when exhausted
    #[inline]
    pub fn acquire(&mut self) -> Option<PoolSlot> {
        self.free.pop().map(PoolSlot)
    }

    /// Return a slot to the pool
    #[inline]
    pub fn release(&mut self, slot: PoolSlot) {
        debug_assert!(self.free.len() < self.capacity, "slot released twice");
        self.free.push(slot.0);
    }

    /// Read a checked-out record
    #[inline]
    pub fn get(&self, slot: &PoolSlot) -> &Measurement {
        &self.storage[slot.0]
    }

    /// Mutate a checked-out record
    #[inline]
    pub fn get_mut(&mut self, slot: &PoolSlot) -> &mut Measurement {
        &mut self.storage[slot.0]
    }

    /// Number of free slots
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Configured capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
