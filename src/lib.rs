//! Bounded FIFO ring buffers for in-process producer/consumer pipelines.
//!
//! The central type is [`BoundedRing`], a fixed-capacity circular queue
//! guarded by a single reader-writer lock. Any number of producer and
//! consumer threads can share one instance through an `Arc`; no operation
//! ever blocks waiting for space or data.
//!
//! # Overview
//!
//! - [`BoundedRing::write`] rejects on a full ring and hands the value back:
//!   the non-blocking backpressure signal
//! - [`BoundedRing::must_write`] displaces the oldest element instead, for
//!   lossy best-effort streams
//! - [`BoundedRing::read_batch`] drains up to `n` elements in one critical
//!   section
//!
//! # Example
//!
//! ```
//! use gyre::BoundedRing;
//!
//! let ring = BoundedRing::new(8)?;
//!
//! assert!(ring.write(1).is_ok());
//! assert!(ring.write(2).is_ok());
//!
//! assert_eq!(ring.read(), Some(1));
//! assert_eq!(ring.read(), Some(2));
//! assert_eq!(ring.read(), None);
//! # Ok::<(), gyre::RingError>(())
//! ```

pub(crate) mod ring;
pub mod sync;
pub mod trace;

pub use ring::RingError;
pub use sync::mpmc::BoundedRing;
