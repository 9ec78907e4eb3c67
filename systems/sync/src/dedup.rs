//! Bounded memory of already processed deliveries.

use std::collections::{HashSet, VecDeque};

/// Number of identifiers remembered unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 1_024;

/// Remembers the most recent delivery identifiers so replays from the
/// polling fallback are processed once.
#[derive(Debug)]
pub struct SeenMessages {
    capacity: usize,
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl Default for SeenMessages {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SeenMessages {
    /// Creates a memory holding at most `capacity` identifiers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    /// Records `id`, returning `true` the first time it is seen.
    pub fn first_sighting(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                let _ = self.ids.remove(&oldest);
            }
        }
        self.order.push_back(id.to_owned());
        let _ = self.ids.insert(id.to_owned());
        true
    }

    /// Number of remembered identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Reports whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
