//! Reusable scratch buffers with a strict reset-on-return contract.

use super::level::LevelFill;
use crate::types::Price;
use crossbeam::queue::SegQueue;

/// Contract for items held in a [`FreeList`]: returned items are reset to
/// their zero state before reuse.
pub trait Poolable: Default + Send {
    /// Reset the item to its zero state.
    fn reset(&mut self);
}

impl<T: Send> Poolable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// Working set for one matching walk: the fills consumed so far and the
/// prices of levels emptied along the way. Pooled per book so a warm book
/// does not allocate on the hot path.
#[derive(Debug, Default)]
pub(crate) struct MatchScratch {
    pub(crate) fills: Vec<LevelFill>,
    pub(crate) emptied: Vec<Price>,
}

impl Poolable for MatchScratch {
    fn reset(&mut self) {
        self.fills.clear();
        self.emptied.clear();
    }
}

/// A bounded thread-safe free list. `get` pops a recycled item or builds a
/// fresh one; `put` resets the item and keeps it if there is room.
pub struct FreeList<T: Poolable> {
    items: SegQueue<T>,
    capacity: usize,
}

impl<T: Poolable> FreeList<T> {
    /// Create a free list that retains at most `capacity` idle items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: SegQueue::new(),
            capacity,
        }
    }

    /// Take an item from the list, or a default-constructed one.
    pub fn get(&self) -> T {
        self.items.pop().unwrap_or_default()
    }

    /// Return an item. It is reset before being made available again;
    /// items beyond the capacity are dropped.
    pub fn put(&self, mut item: T) {
        item.reset();
        if self.items.len() < self.capacity {
            self.items.push(item);
        }
    }

    /// Number of idle items currently held.
    pub fn idle(&self) -> usize {
        self.items.len()
    }
}
