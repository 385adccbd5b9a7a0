//! Fixed-Capacity Ring Buffer Implementation

/// Default buffer capacity (25 frames, about one second of dashcam video)
pub const DEFAULT_CAPACITY: usize = 25;

/// Fixed-capacity ring buffer that overwrites the oldest entry when full
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Pre-allocated storage
    storage: Vec<Option<T>>,
    /// Capacity of the buffer
    capacity: usize,
    /// Head position (next write slot)
    head: usize,
    /// Number of live entries
    len: usize,
    /// Total items written (for statistics)
    total_written: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be > 0");
        let storage = (0..capacity).map(|_| None).collect();
        Self {
            storage,
            capacity,
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an item into the buffer (overwrites oldest if full)
    pub fn push(&mut self, item: T) {
        self.storage[self.head] = Some(item);
        self.head = (self.head + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
        self.total_written += 1;
    }

    /// Get the number of items currently in the buffer
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len as f64 / self.capacity as f64
    }

    /// Slot index of the i-th most recent item (0 = newest)
    fn recent_index(&self, i: usize) -> usize {
        (self.head + self.capacity - 1 - i) % self.capacity
    }

    /// Most recently pushed item
    pub fn latest(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.storage[self.recent_index(0)].as_ref()
    }

    /// Iterate items from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len)
            .rev()
            .filter_map(move |i| self.storage[self.recent_index(i)].as_ref())
    }

    /// Get total items written (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.storage.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Read the last N items (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<T> {
        let count = count.min(self.len);
        (0..count)
            .filter_map(|i| self.storage[self.recent_index(i)].clone())
            .collect()
    }
}
