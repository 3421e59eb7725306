//! Completion id ↔ slot mapping over a bounded pool of sequence slots.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::state::SequenceTable;

/// Caller-supplied identifier for one chat/completion request. Opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionId(pub u64);

impl From<u64> for CompletionId {
    #[inline]
    fn from(value: u64) -> Self {
        CompletionId(value)
    }
}

impl fmt::Display for CompletionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmpl-{}", self.0)
    }
}

/// Index of an engine sequence slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub usize);

impl SlotId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq{}", self.0)
    }
}

#[derive(Debug)]
struct Mapping {
    by_completion: HashMap<CompletionId, SlotId>,
    /// Reverse index, one entry per allocatable slot.
    by_slot: Vec<Option<CompletionId>>,
}

/// Hands out the lowest free slot to each new completion.
///
/// A slot is free when no completion maps to it and its state is not
/// generating. The mapping lock is the only lock taken here; slot states are
/// read through their atomics.
#[derive(Debug)]
pub struct SlotAllocator {
    inner: Mutex<Mapping>,
}

impl SlotAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Mapping {
                by_completion: HashMap::with_capacity(capacity),
                by_slot: vec![None; capacity],
            }),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.lock().by_slot.len()
    }

    /// Map `id` to a slot. An id that already holds a slot gets the same one
    /// back. Returns `None` without side effects when every slot is taken.
    pub fn reserve(&self, id: CompletionId, states: &SequenceTable) -> Option<SlotId> {
        let mut map = self.inner.lock();
        if let Some(&slot) = map.by_completion.get(&id) {
            return Some(slot);
        }

        let index = (0..map.by_slot.len())
            .find(|&i| map.by_slot[i].is_none() && !states.is_busy(i))?;

        let slot = SlotId(index);
        map.by_slot[index] = Some(id);
        map.by_completion.insert(id, slot);
        debug!(%id, %slot, "slot reserved");
        Some(slot)
    }

    pub fn lookup(&self, id: CompletionId) -> Option<SlotId> {
        self.inner.lock().by_completion.get(&id).copied()
    }

    /// Completion currently holding `slot`.
    pub fn owner(&self, slot: SlotId) -> Option<CompletionId> {
        self.inner.lock().by_slot.get(slot.0).copied().flatten()
    }

    /// Drop whichever mapping points at `slot`. Slot state is left untouched.
    pub fn release(&self, slot: SlotId) -> bool {
        let mut map = self.inner.lock();
        let Some(id) = map.by_slot.get_mut(slot.0).and_then(Option::take) else {
            return false;
        };
        map.by_completion.remove(&id);
        debug!(%id, %slot, "slot released");
        true
    }

    /// Number of live mappings.
    pub fn len(&self) -> usize {
        self.inner.lock().by_completion.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owner of every slot, in index order.
    pub fn owners(&self) -> Vec<Option<CompletionId>> {
        self.inner.lock().by_slot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(n: usize) -> (SlotAllocator, SequenceTable) {
        (SlotAllocator::new(n), SequenceTable::new(n))
    }

    #[test]
    fn reserves_distinct_slots_until_full() {
        let (alloc, states) = setup(3);
        let got: Vec<_> = (0..3)
            .map(|i| alloc.reserve(CompletionId(i), &states).unwrap())
            .collect();
        assert_eq!(got, vec![SlotId(0), SlotId(1), SlotId(2)]);
        assert_eq!(alloc.reserve(CompletionId(99), &states), None);
        assert_eq!(alloc.lookup(CompletionId(99)), None);
        assert_eq!(alloc.len(), 3);
    }

    #[test]
    fn same_id_gets_same_slot() {
        let (alloc, states) = setup(2);
        let a = alloc.reserve(CompletionId(5), &states).unwrap();
        let b = alloc.reserve(CompletionId(5), &states).unwrap();
        assert_eq!(a, b);
        assert_eq!(alloc.len(), 1);
    }

    #[test]
    fn lowest_free_slot_wins_after_release() {
        let (alloc, states) = setup(3);
        for i in 0..3 {
            alloc.reserve(CompletionId(i), &states);
        }
        assert!(alloc.release(SlotId(1)));
        assert_eq!(alloc.lookup(CompletionId(1)), None);
        assert_eq!(alloc.reserve(CompletionId(10), &states), Some(SlotId(1)));
        assert_eq!(alloc.owner(SlotId(1)), Some(CompletionId(10)));
    }

    #[test]
    fn skips_slots_still_generating() {
        let (alloc, states) = setup(2);
        states.get(0).unwrap().try_begin();
        assert_eq!(alloc.reserve(CompletionId(1), &states), Some(SlotId(1)));
        assert_eq!(alloc.reserve(CompletionId(2), &states), None);

        states.get(0).unwrap().finish();
        assert_eq!(alloc.reserve(CompletionId(2), &states), Some(SlotId(0)));
    }

    #[test]
    fn release_unmapped_slot_is_a_noop() {
        let (alloc, states) = setup(2);
        alloc.reserve(CompletionId(1), &states);
        assert!(!alloc.release(SlotId(1)));
        assert!(!alloc.release(SlotId(42)));
        assert_eq!(alloc.lookup(CompletionId(1)), Some(SlotId(0)));
        assert_eq!(alloc.owners(), vec![Some(CompletionId(1)), None]);
    }
}
