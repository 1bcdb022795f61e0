//! Bounded message history replayed to newly registered clients.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{ConfigError, ConfigResult};
use crate::message::CompleteMessage;

/// Number of past messages kept for replay by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// FIFO transcript of the most recent messages.
///
/// Never holds more than `capacity` entries; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Arc<CompleteMessage>>,
    capacity: usize,
}

impl History {
    /// # Errors
    ///
    /// Returns `ConfigError::ZeroCapacity` if `capacity` is 0.
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "history_capacity",
            });
        }
        Ok(Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Appends a message, returning the evicted entry if the history was full.
    pub fn push(&mut self, msg: Arc<CompleteMessage>) -> Option<Arc<CompleteMessage>> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(msg);
        evicted
    }

    /// Iterates oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CompleteMessage>> {
        self.entries.iter()
    }

    /// Returns an ordered copy (oldest first).
    pub fn snapshot(&self) -> Vec<Arc<CompleteMessage>> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for History {
    fn default() -> Self {
        Self {
            entries: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}
