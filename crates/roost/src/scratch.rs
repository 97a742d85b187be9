//! Capacity-bounded append buffer.
//!
//! Scratch arrays are allocated once and reused every tick: the quadtree
//! writes query results and move-pass escapees into them instead of
//! allocating per call. `clear` only resets the used-count, so reuse is
//! free.

use crate::Error;

/// A fixed-capacity append buffer with a used-count.
///
/// Unlike [`RingBuffer`](crate::RingBuffer) there is no eviction: the buffer
/// is a plain prefix of a pre-allocated array. The region past `len()` keeps
/// whatever values were last written there, which the quadtree move pass
/// exploits through [`mark`](ScratchArray::mark) /
/// [`truncate`](ScratchArray::truncate) windows.
#[derive(Debug, Clone)]
pub struct ScratchArray<T> {
    elements: Vec<T>,
    used: usize,
}

impl<T: Copy + Default> ScratchArray<T> {
    /// Creates an empty buffer with the given fixed capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            elements: vec![T::default(); capacity],
            used: 0,
        }
    }
}

impl<T: Copy> ScratchArray<T> {
    /// Returns the fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.elements.len()
    }

    /// Returns the number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used
    }

    /// Returns true if the buffer holds no live elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Appends an element; silently dropped when the buffer is full.
    pub fn try_push(&mut self, value: T) {
        if self.used == self.capacity() {
            return;
        }
        self.elements[self.used] = value;
        self.used += 1;
    }

    /// Appends an element, failing loudly when the buffer is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExceeded`] when every slot is in use.
    pub fn push(&mut self, value: T) -> Result<(), Error> {
        if self.used == self.capacity() {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.elements[self.used] = value;
        self.used += 1;
        Ok(())
    }

    /// Removes and returns the last element, or `None` when empty.
    pub fn try_pop(&mut self) -> Option<T> {
        if self.used == 0 {
            return None;
        }
        self.used -= 1;
        Some(self.elements[self.used])
    }

    /// Resets the used-count to zero. Contents are not wiped.
    pub fn clear(&mut self) {
        self.used = 0;
    }

    /// Returns the element at `index`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.used {
            return None;
        }
        Some(self.elements[index])
    }

    /// Replaces the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the current length.
    pub fn set(&mut self, index: usize, value: T) {
        assert!(
            index < self.used,
            "scratch index {index} out of range (len {})",
            self.used
        );
        self.elements[index] = value;
    }

    /// Returns the live prefix as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements[..self.used]
    }

    /// Returns the current used-count as a window marker.
    ///
    /// A recursive pass records `mark()`, lets callees append, then
    /// processes the window `[mark, len())` and rewinds with
    /// [`truncate`](ScratchArray::truncate).
    #[must_use]
    pub fn mark(&self) -> usize {
        self.used
    }

    /// Rewinds the used-count to a previous [`mark`](ScratchArray::mark).
    ///
    /// Elements between the new and old counts stay physically present
    /// until overwritten; [`ScratchArray::raw`] can still read them.
    ///
    /// # Panics
    ///
    /// Panics if `mark` is beyond the current length.
    pub fn truncate(&mut self, mark: usize) {
        assert!(
            mark <= self.used,
            "scratch truncate to {mark} beyond len {}",
            self.used
        );
        self.used = mark;
    }

    /// Reads a physical slot without checking the used-count.
    ///
    /// Only meaningful for slots inside a window that was just rewound with
    /// [`truncate`](ScratchArray::truncate) and not yet overwritten.
    pub(crate) fn raw(&self, index: usize) -> T {
        self.elements[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_push_beyond_capacity_is_a_noop() {
        let mut scratch = ScratchArray::new(2);
        scratch.try_push(1);
        scratch.try_push(2);
        scratch.try_push(3);
        assert_eq!(scratch.len(), 2);
        assert_eq!(scratch.as_slice(), &[1, 2]);
    }

    #[test]
    fn push_beyond_capacity_errors() {
        let mut scratch = ScratchArray::new(1);
        scratch.push(1).unwrap();
        assert_eq!(
            scratch.push(2),
            Err(Error::CapacityExceeded { capacity: 1 })
        );
    }

    #[test]
    fn pop_returns_newest_first() {
        let mut scratch = ScratchArray::new(4);
        scratch.try_push('a');
        scratch.try_push('b');
        assert_eq!(scratch.try_pop(), Some('b'));
        assert_eq!(scratch.try_pop(), Some('a'));
        assert_eq!(scratch.try_pop(), None);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut scratch = ScratchArray::new(3);
        scratch.try_push(1);
        scratch.clear();
        assert_eq!(scratch.len(), 0);
        assert_eq!(scratch.capacity(), 3);
        assert_eq!(scratch.get(0), None);
    }

    #[test]
    fn windows_survive_truncation() {
        let mut scratch = ScratchArray::new(8);
        scratch.try_push(10);
        let mark = scratch.mark();
        scratch.try_push(20);
        scratch.try_push(30);

        let end = scratch.len();
        scratch.truncate(mark);
        assert_eq!(scratch.len(), 1);

        // The rewound window is still readable until overwritten.
        assert_eq!(scratch.raw(mark), 20);
        assert_eq!(scratch.raw(end - 1), 30);
    }

    #[test]
    fn set_replaces_live_slot() {
        let mut scratch = ScratchArray::new(2);
        scratch.try_push(5);
        scratch.set(0, 9);
        assert_eq!(scratch.get(0), Some(9));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn set_out_of_range_panics() {
        let mut scratch = ScratchArray::<u32>::new(2);
        scratch.set(0, 1);
    }
}
