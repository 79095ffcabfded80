//! Core bounded ring buffer state machine.
//!
//! This module provides the raw circular FIFO used by [`crate::sync::mpmc`].
//! It owns the slot storage and the head/tail/count bookkeeping but performs
//! no synchronization of its own; the sync wrapper supplies the locking
//! discipline.
//!
//! # Invariants
//!
//! - `head` and `tail` are always in `[0, capacity)`.
//! - Live elements occupy slots `[head, head + count) mod capacity`, in
//!   insertion order.
//! - `count == 0` means empty regardless of where `head`/`tail` point;
//!   `count == capacity` means full.
//! - Slots outside the live window are uninitialized. The manual [`Drop`]
//!   impl releases exactly the live window.

use std::mem::MaybeUninit;

use thiserror::Error;

/// Error raised when constructing a ring with an unusable capacity.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// The requested capacity was zero. A zero-slot ring makes every
    /// modulo-indexed operation ill-defined, so construction refuses it
    /// instead of producing a degenerate buffer.
    #[error("ring capacity must be greater than 0")]
    InvalidCapacity,
}

/// Raw fixed-capacity circular FIFO.
///
/// Storage is a boxed slice of `MaybeUninit` slots so elements of any type
/// can be held without requiring `Default` or `Clone`. Reads move values out
/// of their slots; writes claim uninitialized slots.
pub(crate) struct RingState<T> {
    /// Slot storage. Length is the capacity, fixed at construction.
    storage: Box<[MaybeUninit<T>]>,
    /// Index of the oldest unread element. Meaningful only when `count > 0`.
    head: usize,
    /// Index the next element will be written to.
    tail: usize,
    /// Number of live elements, `0..=capacity`.
    count: usize,
}

impl<T> RingState<T> {
    /// Creates an empty ring with the given number of slots.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::InvalidCapacity`] if `capacity` is zero.
    pub(crate) fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity == 0 {
            return Err(RingError::InvalidCapacity);
        }
        let storage = (0..capacity).map(|_| MaybeUninit::uninit()).collect();
        Ok(Self {
            storage,
            head: 0,
            tail: 0,
            count: 0,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Advances an index to the next slot, wrapping to 0 at capacity.
    ///
    /// Equivalent to `(index + 1) % capacity` but avoids the division
    /// instruction, using a comparison and conditional move instead.
    #[inline]
    fn bump(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.capacity() { 0 } else { next }
    }

    /// Removes and returns the oldest element, or `None` when empty.
    pub(crate) fn read(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }

        // SAFETY: count > 0, so the head slot holds an initialized value.
        // assume_init_read moves it out, leaving the slot logically free.
        let value = unsafe { self.storage[self.head].assume_init_read() };
        self.head = self.bump(self.head);
        self.count -= 1;
        Some(value)
    }

    /// Removes and returns up to `max` oldest elements in FIFO order.
    ///
    /// Returns fewer than `max` elements when fewer are held, and an empty
    /// vector when `max` is zero or the ring is empty.
    pub(crate) fn read_batch(&mut self, max: usize) -> Vec<T> {
        let take = max.min(self.count);
        let mut drained = Vec::with_capacity(take);
        for _ in 0..take {
            // SAFETY: take <= count, so every slot visited here is inside the
            // live window and initialized.
            drained.push(unsafe { self.storage[self.head].assume_init_read() });
            self.head = self.bump(self.head);
        }
        self.count -= take;
        drained
    }

    /// Attempts to insert `value` at the tail.
    ///
    /// # Errors
    ///
    /// Returns `Err(value)` when the ring is full, leaving state untouched
    /// and handing the value back so the caller can retry.
    pub(crate) fn write(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }

        // The tail slot is outside the live window, hence uninitialized;
        // writing through MaybeUninit cannot drop a stale value.
        self.storage[self.tail].write(value);
        self.tail = self.bump(self.tail);
        self.count += 1;
        Ok(())
    }

    /// Inserts `value` unconditionally, displacing the oldest element when
    /// full.
    ///
    /// Returns `true` when an element was displaced. On a full ring the tail
    /// slot coincides with the head slot, so the oldest value is dropped and
    /// `head` advances together with `tail`; the combined update is what
    /// keeps the remaining elements in FIFO order.
    pub(crate) fn must_write(&mut self, value: T) -> bool {
        if !self.is_full() {
            let rejected = self.write(value);
            debug_assert!(rejected.is_ok());
            return false;
        }

        debug_assert_eq!(self.head, self.tail);
        // SAFETY: the ring is full, so the tail slot holds the (initialized)
        // oldest element. It must be dropped before the slot is reused.
        unsafe { self.storage[self.tail].assume_init_drop() };
        self.storage[self.tail].write(value);
        self.tail = self.bump(self.tail);
        self.head = self.tail;
        true
    }

    /// Drops all live elements and rewinds the indices.
    ///
    /// Capacity and allocation are unchanged; stale slot contents become
    /// unreachable rather than zeroed.
    pub(crate) fn reset(&mut self) {
        let mut index = self.head;
        for _ in 0..self.count {
            // SAFETY: the loop visits exactly the live window
            // [head, head + count), every slot of which is initialized.
            unsafe { self.storage[index].assume_init_drop() };
            index = self.bump(index);
        }
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Iterates the live elements in FIFO order without removing them.
    #[cfg(feature = "serde")]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let capacity = self.capacity();
        (0..self.count).map(move |offset| {
            let index = (self.head + offset) % capacity;
            // SAFETY: offset < count, so the slot is inside the live window.
            unsafe { self.storage[index].assume_init_ref() }
        })
    }
}

impl<T> Drop for RingState<T> {
    fn drop(&mut self) {
        // MaybeUninit storage never drops its contents; release the live
        // window explicitly.
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_rejects_zero_capacity() {
        let result = RingState::<u64>::new(0);
        assert_eq!(result.err(), Some(RingError::InvalidCapacity));
    }

    #[test]
    fn test_fresh_ring_is_empty() {
        let ring = RingState::<u64>::new(5).unwrap();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 5);
        assert!(!ring.is_full());
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut ring = RingState::new(3).unwrap();

        assert!(ring.write(1).is_ok());
        assert_eq!(ring.len(), 1);

        assert_eq!(ring.read(), Some(1));
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.read(), None);
    }

    #[test]
    fn test_fifo_order_across_wrap() {
        let mut ring = RingState::new(4).unwrap();

        for round in 0..5u64 {
            for i in 0..4 {
                assert!(ring.write(round * 10 + i).is_ok());
            }
            for i in 0..4 {
                assert_eq!(ring.read(), Some(round * 10 + i));
            }
            assert_eq!(ring.read(), None);
        }
    }

    #[test]
    fn test_full_write_hands_value_back() {
        let mut ring = RingState::new(2).unwrap();

        assert!(ring.write(1).is_ok());
        assert!(ring.write(2).is_ok());
        assert!(ring.is_full());

        assert_eq!(ring.write(3), Err(3));
        assert_eq!(ring.len(), 2);

        // Draining one slot makes the next write succeed.
        assert_eq!(ring.read(), Some(1));
        assert!(ring.write(3).is_ok());
    }

    #[test]
    fn test_must_write_displaces_oldest() {
        let mut ring = RingState::new(2).unwrap();

        assert!(!ring.must_write(1));
        assert!(!ring.must_write(2));
        assert!(ring.must_write(3));

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.read(), Some(2));
        assert_eq!(ring.read(), Some(3));
        assert_eq!(ring.read(), None);
    }

    #[test]
    fn test_must_write_keeps_rotating_when_full() {
        let mut ring = RingState::new(3).unwrap();

        for i in 0..10u64 {
            ring.must_write(i);
        }

        assert_eq!(ring.read_batch(3), vec![7, 8, 9]);
    }

    #[test]
    fn test_read_batch_caps_at_len() {
        let mut ring = RingState::new(8).unwrap();

        for i in 0..5u64 {
            assert!(ring.write(i).is_ok());
        }

        assert_eq!(ring.read_batch(3), vec![0, 1, 2]);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.read_batch(100), vec![3, 4]);
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_read_batch_empty_cases() {
        let mut ring = RingState::<u64>::new(4).unwrap();

        assert!(ring.read_batch(0).is_empty());
        assert!(ring.read_batch(4).is_empty());

        assert!(ring.write(1).is_ok());
        assert!(ring.read_batch(0).is_empty());
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut ring = RingState::new(2).unwrap();

        ring.reset();
        assert_eq!(ring.len(), 0);

        assert!(ring.write(1).is_ok());
        assert!(ring.write(2).is_ok());
        ring.reset();
        assert_eq!(ring.len(), 0);
        assert!(!ring.is_full());

        // Full capacity is available again after a reset.
        assert!(ring.write(3).is_ok());
        assert!(ring.write(4).is_ok());
        assert!(ring.is_full());
    }

    #[test]
    fn test_displaced_element_is_dropped_once() {
        let tracker = Arc::new(());
        let mut ring = RingState::new(2).unwrap();

        ring.must_write(Arc::clone(&tracker));
        ring.must_write(Arc::clone(&tracker));
        assert_eq!(Arc::strong_count(&tracker), 3);

        // Displaces the first clone, which must be dropped.
        ring.must_write(Arc::clone(&tracker));
        assert_eq!(Arc::strong_count(&tracker), 3);
    }

    #[test]
    fn test_reset_drops_live_elements() {
        let tracker = Arc::new(());
        let mut ring = RingState::new(4).unwrap();

        for _ in 0..3 {
            assert!(ring.write(Arc::clone(&tracker)).is_ok());
        }
        assert_eq!(Arc::strong_count(&tracker), 4);

        ring.reset();
        assert_eq!(Arc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_drop_releases_live_elements() {
        let tracker = Arc::new(());
        {
            let mut ring = RingState::new(4).unwrap();
            for _ in 0..3 {
                assert!(ring.write(Arc::clone(&tracker)).is_ok());
            }
            // Leave one slot consumed so the live window straddles state.
            drop(ring.read());
            assert_eq!(Arc::strong_count(&tracker), 3);
        }
        assert_eq!(Arc::strong_count(&tracker), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_iter_walks_live_window_in_order() {
        let mut ring = RingState::new(3).unwrap();

        for i in 0..3u64 {
            assert!(ring.write(i).is_ok());
        }
        assert_eq!(ring.read(), Some(0));
        assert!(ring.write(3).is_ok());

        let seen: Vec<u64> = ring.iter().copied().collect();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
