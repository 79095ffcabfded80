//! Lock-guarded bounded MPMC ring for in-process producer/consumer use.
//!
//! A fixed-capacity circular FIFO shared by any number of producer and
//! consumer threads through a single reader-writer lock.
//!
//! # Overview
//!
//! - [`BoundedRing`] - the shared queue; wrap it in an `Arc` to hand it to
//!   other threads
//! - Non-blocking: a full ring hands the value back from [`write`], an empty
//!   ring returns `None` from [`read`]; retry and backoff policy belongs to
//!   the caller
//! - Drop-oldest: [`must_write`] displaces the oldest element instead of
//!   rejecting the new one, for telemetry-style streams where stale samples
//!   are worth less than fresh ones
//! - Batch drain: [`read_batch`] removes up to `n` elements inside one
//!   critical section, so no writer can interleave mid-batch
//!
//! [`write`]: BoundedRing::write
//! [`read`]: BoundedRing::read
//! [`must_write`]: BoundedRing::must_write
//! [`read_batch`]: BoundedRing::read_batch
//!
//! # Example
//!
//! ```
//! use gyre::BoundedRing;
//!
//! let ring = BoundedRing::new(4)?;
//!
//! assert!(ring.write(1).is_ok());
//! assert!(ring.write(2).is_ok());
//! assert_eq!(ring.read(), Some(1));
//! assert_eq!(ring.read_batch(8), vec![2]);
//! assert_eq!(ring.read(), None);
//! # Ok::<(), gyre::RingError>(())
//! ```

use std::fmt;

use parking_lot::RwLock;

use crate::ring::{RingError, RingState};
use crate::trace::{debug, trace};

/// Fixed-capacity circular FIFO guarded by a reader-writer lock.
///
/// Every operation is linearizable: mutators (`read`, `read_batch`, `write`,
/// `must_write`, `reset`) take the lock exclusively for their whole duration,
/// while `len`, `is_empty` and `is_full` take shared access and may run
/// concurrently with each other. No operation ever blocks waiting for space
/// or data.
///
/// Elements are moved out by value on read; the ring never lends references
/// to its slots across the lock boundary.
pub struct BoundedRing<T> {
    /// Fixed at construction, so readable without touching the lock.
    capacity: usize,
    state: RwLock<RingState<T>>,
}

impl<T> BoundedRing<T> {
    /// Creates an empty ring holding at most `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::InvalidCapacity`] if `capacity` is zero; a
    /// zero-slot ring is never constructed.
    ///
    /// # Example
    ///
    /// ```
    /// use gyre::{BoundedRing, RingError};
    ///
    /// let ring = BoundedRing::<u64>::new(16)?;
    /// assert_eq!(ring.capacity(), 16);
    ///
    /// assert_eq!(BoundedRing::<u64>::new(0).err(), Some(RingError::InvalidCapacity));
    /// # Ok::<(), RingError>(())
    /// ```
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        let state = RingState::new(capacity)?;
        debug!(capacity, "created bounded ring");
        Ok(Self {
            capacity,
            state: RwLock::new(state),
        })
    }

    /// Returns the number of elements currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Returns `true` when no elements are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed capacity. Never takes the lock.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` when the ring holds `capacity` elements.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.state.read().is_full()
    }

    /// Removes and returns the oldest element.
    ///
    /// Returns `None` when the ring is empty. That is the normal empty-state
    /// signal, not a failure; callers poll or coordinate externally.
    #[must_use]
    pub fn read(&self) -> Option<T> {
        self.state.write().read()
    }

    /// Removes and returns up to `max` oldest elements in FIFO order.
    ///
    /// The whole batch is taken inside one exclusive critical section, so it
    /// observes a single consistent snapshot: concurrent writers cannot
    /// interleave between the removed elements. Returns an empty vector when
    /// `max` is zero or the ring is empty; never pads with placeholders.
    #[must_use]
    pub fn read_batch(&self, max: usize) -> Vec<T> {
        self.state.write().read_batch(max)
    }

    /// Attempts to append `value`, rejecting it when the ring is full.
    ///
    /// Never blocks and never displaces held elements.
    ///
    /// # Errors
    ///
    /// Returns `Err(value)` when the ring is full: the backpressure signal.
    /// The value is handed back so the caller can retry without cloning.
    pub fn write(&self, value: T) -> Result<(), T> {
        self.state.write().write(value)
    }

    /// Appends `value` unconditionally, displacing the oldest element when
    /// the ring is full.
    ///
    /// The displaced element is dropped silently and the survivors keep
    /// their FIFO order. On a non-full ring this is an ordinary write.
    ///
    /// # Example
    ///
    /// ```
    /// use gyre::BoundedRing;
    ///
    /// let ring = BoundedRing::new(2)?;
    /// ring.must_write(1);
    /// ring.must_write(2);
    /// ring.must_write(3); // displaces 1
    ///
    /// assert_eq!(ring.read(), Some(2));
    /// assert_eq!(ring.read(), Some(3));
    /// # Ok::<(), gyre::RingError>(())
    /// ```
    pub fn must_write(&self, value: T) {
        let displaced = self.state.write().must_write(value);
        if displaced {
            trace!("ring full, displaced oldest element");
        }
    }

    /// Drops all held elements and rewinds the ring to empty.
    ///
    /// Capacity and allocation are unchanged; a full `capacity` worth of
    /// writes succeeds immediately afterwards.
    pub fn reset(&self) {
        let mut state = self.state.write();
        debug!(dropped = state.len(), "ring reset");
        state.reset();
    }
}

impl<T> fmt::Debug for BoundedRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedRing")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::BoundedRing;

    /// Stable representation: capacity plus live elements in FIFO order.
    #[derive(Serialize, Deserialize)]
    #[serde(rename = "BoundedRing")]
    struct Repr<E> {
        capacity: usize,
        elements: Vec<E>,
    }

    impl<T: Serialize> Serialize for BoundedRing<T> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let state = self.state.read();
            let repr = Repr {
                capacity: self.capacity,
                elements: state.iter().collect::<Vec<&T>>(),
            };
            repr.serialize(serializer)
        }
    }

    impl<'de, T: Deserialize<'de>> Deserialize<'de> for BoundedRing<T> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let repr = Repr::<T>::deserialize(deserializer)?;
            let ring = Self::new(repr.capacity).map_err(D::Error::custom)?;
            for element in repr.elements {
                if ring.write(element).is_err() {
                    return Err(D::Error::custom("more elements than ring capacity"));
                }
            }
            Ok(ring)
        }
    }
}
