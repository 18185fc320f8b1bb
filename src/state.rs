//! Frame State Sharing
//!
//! The logic thread mutates per-object state while the render thread draws
//! the last published snapshot. Both sides agree on a shared [`StateIndex`];
//! publishing a frame is one atomic increment.
//!
//! ```text
//! epoch:   1        2        3
//! write:   slot 1   slot 0   slot 1
//! read:    newest slot stamped before the current epoch
//! ```
//!
//! A [`DoubleBuffered`] value carries the epoch its slot was last written in,
//! so objects the logic thread does not touch in a frame keep their latest
//! value on both sides.

use std::sync::atomic::{AtomicU64, Ordering};

use log::warn;
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};

// ============================================================================
// State Index
// ============================================================================

#[derive(Debug)]
pub struct StateIndex {
    epoch: AtomicU64,
}

impl Default for StateIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl StateIndex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            epoch: AtomicU64::new(1),
        }
    }

    /// Frame currently being written by the logic thread.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    #[inline]
    pub fn write_index(&self) -> usize {
        (self.epoch() & 1) as usize
    }

    #[inline]
    pub fn read_index(&self) -> usize {
        self.write_index() ^ 1
    }

    /// Makes everything written so far visible to readers. Returns the new
    /// write epoch.
    pub fn publish(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}

// ============================================================================
// Double-Buffered Value
// ============================================================================

#[derive(Debug)]
struct Stamped<T> {
    value: T,
    epoch: u64,
}

/// One value, two slots: the logic thread writes one while the render thread
/// reads the other.
#[derive(Debug)]
pub struct DoubleBuffered<T> {
    slots: [RwLock<Stamped<T>>; 2],
}

impl<T: Clone + Default> Default for DoubleBuffered<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> DoubleBuffered<T> {
    pub fn new(value: T) -> Self {
        Self {
            slots: [
                RwLock::new(Stamped {
                    value: value.clone(),
                    epoch: 0,
                }),
                RwLock::new(Stamped { value, epoch: 0 }),
            ],
        }
    }

    /// Mutates the write slot of the current epoch.
    ///
    /// The first write of an epoch starts from the newest value of either
    /// slot.
    pub fn update<R>(&self, index: &StateIndex, mutate: impl FnOnce(&mut T) -> R) -> R {
        let epoch = index.epoch();
        let write = (epoch & 1) as usize;

        let mut slot = self.slots[write].write();
        if slot.epoch != epoch {
            let other = self.slots[write ^ 1].read();
            if other.epoch > slot.epoch {
                slot.value = other.value.clone();
            }
            drop(other);
            slot.epoch = epoch;
        }
        mutate(&mut slot.value)
    }

    /// Latest published value.
    pub fn read(&self, index: &StateIndex) -> MappedRwLockReadGuard<'_, T> {
        let slot = self.published_slot(index.epoch());
        RwLockReadGuard::map(self.slots[slot].read(), |stamped| &stamped.value)
    }

    fn published_slot(&self, epoch: u64) -> usize {
        // One guard at a time; `update` holds a write guard while reading
        // the other slot.
        let first = self.slots[0].read().epoch;
        let second = self.slots[1].read().epoch;
        match (first < epoch, second < epoch) {
            (true, true) => usize::from(second > first),
            (false, _) => 1,
            (_, false) => 0,
        }
    }
}

// ============================================================================
// Slot Allocator
// ============================================================================

#[derive(Debug)]
struct SlotTable {
    free_list: Vec<u32>,
    in_use: Vec<bool>,
}

/// Fixed-capacity index allocator. The lock is held for a single
/// allocate or free call only.
#[derive(Debug)]
pub struct SlotAllocator {
    table: Mutex<SlotTable>,
}

impl SlotAllocator {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        // Reversed so pop() hands out the lowest slot first
        let free_list = (0..capacity).rev().collect();
        Self {
            table: Mutex::new(SlotTable {
                free_list,
                in_use: vec![false; capacity as usize],
            }),
        }
    }

    pub fn allocate(&self) -> Option<u32> {
        let mut table = self.table.lock();
        let Some(slot) = table.free_list.pop() else {
            warn!("SlotAllocator is full ({} slots).", table.in_use.len());
            return None;
        };
        table.in_use[slot as usize] = true;
        Some(slot)
    }

    /// Returns `slot` to the free list. Freeing an unallocated slot is a
    /// no-op and returns `false`.
    pub fn free(&self, slot: u32) -> bool {
        let mut table = self.table.lock();
        match table.in_use.get_mut(slot as usize) {
            Some(in_use) if *in_use => {
                *in_use = false;
                table.free_list.push(slot);
                true
            }
            _ => false,
        }
    }

    pub fn available(&self) -> usize {
        self.table.lock().free_list.len()
    }

    pub fn capacity(&self) -> usize {
        self.table.lock().in_use.len()
    }
}
