//! The connection-forwarding engine.
//!
//! One [`PortListener`] per configured port owns a bound socket and its
//! accept loop. Accepted connections are admitted through a fixed-capacity
//! [`SlotPool`]; acquiring a slot blocks the accept loop itself while the
//! pool is saturated, so backpressure accumulates in the OS listen queue
//! rather than in a queue of our own. Each admitted connection becomes a
//! [`ForwardSession`]: two concurrent copy loops relaying bytes between the
//! client and a backend channel until both directions reach end-of-stream,
//! with half-close in between so neither side loses in-flight data.

pub mod admission;
pub mod error;
pub mod listener;
pub mod session;

pub use admission::{Slot, SlotPool, DEFAULT_CAPACITY};
pub use error::{ForwardError, ForwardResult};
pub use listener::PortListener;
pub use session::{ForwardSession, SessionState};

/// Socket buffer size and copy chunk size (16 KiB).
///
/// Used for SO_SNDBUF/SO_RCVBUF on both ends and as the read granularity of
/// the copy loops.
pub const IO_BUFFER_SIZE: usize = 16 * 1024;
