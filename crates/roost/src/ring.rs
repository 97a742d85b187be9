//! Fixed-capacity circular queue.
//!
//! The ring buffer backs quadtree leaf storage: inserts, evictions, and the
//! swap-based removal used by the move pass are all O(1), and the backing
//! allocation never changes after construction.

/// A fixed-capacity circular queue.
///
/// Logical index `i` maps to physical slot `(start + i) % capacity`; the
/// buffer tracks how many slots are in use and never reallocates.
///
/// # Removal order
///
/// [`RingBuffer::remove`] is swap-to-front-and-evict: it does **not**
/// preserve the order of the remaining elements. Callers that need a stable
/// removal must not use it.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    memory: Vec<Option<T>>,
    start: usize,
    used: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer with the given fixed capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut memory = Vec::with_capacity(capacity);
        memory.resize_with(capacity, || None);
        Self {
            memory,
            start: 0,
            used: 0,
        }
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Returns the number of elements currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used
    }

    /// Returns true if the buffer holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Returns true if every slot is in use.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.used == self.capacity()
    }

    fn physical(&self, index: usize) -> usize {
        (self.start + index) % self.capacity()
    }

    /// Returns the element at logical index `index`, or `None` when the
    /// index is out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.used {
            return None;
        }
        self.memory[self.physical(index)].as_ref()
    }

    /// Replaces the element at logical index `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the current length. Passing an
    /// out-of-range index is caller misuse, not a runtime condition.
    pub fn set(&mut self, index: usize, value: T) {
        assert!(
            index < self.used,
            "ring buffer index {index} out of range (len {})",
            self.used
        );
        let slot = self.physical(index);
        self.memory[slot] = Some(value);
    }

    /// Swaps two logical slots. A no-op when `a == b`.
    ///
    /// # Panics
    ///
    /// Panics if either index is not below the current length.
    pub fn swap(&mut self, a: usize, b: usize) {
        assert!(
            a < self.used && b < self.used,
            "ring buffer swap ({a}, {b}) out of range (len {})",
            self.used
        );
        if a == b {
            return;
        }
        let (a, b) = (self.physical(a), self.physical(b));
        self.memory.swap(a, b);
    }

    /// Appends an element if there is room; silently ignored when full.
    pub fn try_push(&mut self, value: T) {
        if self.is_full() {
            return;
        }
        let slot = self.physical(self.used);
        self.memory[slot] = Some(value);
        self.used += 1;
    }

    /// Appends an element, evicting and returning the oldest one first when
    /// the buffer is full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.is_full() { self.pop_first() } else { None };
        self.try_push(value);
        evicted
    }

    /// Removes and returns the oldest element.
    pub fn pop_first(&mut self) -> Option<T> {
        if self.used == 0 {
            return None;
        }
        let result = self.memory[self.start].take();
        self.start = (self.start + 1) % self.capacity();
        self.used -= 1;
        result
    }

    /// Removes and returns the element at logical index `index` by swapping
    /// it to the front and evicting it.
    ///
    /// O(1), but the remaining elements are left in arbitrary order relative
    /// to the removed slot: the old front element now sits where `index`
    /// pointed.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the current length.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.swap(0, index);
        self.pop_first()
    }

    /// Drops every element and resets the cursor.
    pub fn clear(&mut self) {
        for slot in &mut self.memory {
            *slot = None;
        }
        self.start = 0;
        self.used = 0;
    }

    /// Iterates the elements in logical (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.used).filter_map(|i| self.get(i))
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the live elements into a `Vec`, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
