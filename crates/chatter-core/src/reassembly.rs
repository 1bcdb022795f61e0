//! Fragment-to-message reassembly.
//!
//! Raw reads are chunked by the network, not by the sender's intent. The
//! buffer decouples the two: it collects fragments and emits exactly one
//! `CompleteMessage` each time it reaches capacity. A buffer that never
//! fills is never flushed unless the owner calls `flush()` explicitly.

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::message::{CompleteMessage, Fragment};

/// Number of fragments that make up one message by default.
pub const DEFAULT_FRAGMENT_CAPACITY: usize = 8;

/// Bounded, per-connection fragment accumulator.
///
/// Invariant: `len() < capacity()` between calls. The fold happens exactly
/// at the capacity boundary, so overflow cannot occur.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    fragments: Vec<Fragment>,
    capacity: usize,
}

impl ReassemblyBuffer {
    /// Creates an empty buffer that folds every `capacity` fragments.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ZeroCapacity` if `capacity` is 0.
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "fragment_capacity",
            });
        }
        Ok(Self {
            fragments: Vec::with_capacity(capacity),
            capacity,
        })
    }

    /// Appends a fragment, returning the folded message if the buffer filled.
    pub fn add(&mut self, fragment: Fragment) -> Option<CompleteMessage> {
        self.fragments.push(fragment);
        if self.fragments.len() == self.capacity {
            return self.flush();
        }
        None
    }

    /// Folds whatever is buffered into one message and empties the buffer.
    ///
    /// Author and timestamp come from the first fragment; bytes are
    /// concatenated in arrival order and decoded as UTF-8, replacing invalid
    /// sequences. Returns `None` when empty.
    pub fn flush(&mut self) -> Option<CompleteMessage> {
        let mut drained = self.fragments.drain(..);
        let first = drained.next()?;

        let mut bytes = first.data;
        for fragment in drained {
            bytes.extend_from_slice(&fragment.data);
        }
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(
            author = %first.author.short(),
            body_len = body.len(),
            "Reassembled complete message"
        );

        Some(CompleteMessage::new(body, first.author, first.received_at))
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReassemblyBuffer {
    fn default() -> Self {
        Self {
            fragments: Vec::with_capacity(DEFAULT_FRAGMENT_CAPACITY),
            capacity: DEFAULT_FRAGMENT_CAPACITY,
        }
    }
}
