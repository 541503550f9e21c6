// SPDX-License-Identifier: Apache-2.0 OR MIT
// Fixed-capacity FIFO with overwrite-oldest semantics
//
// Not synchronized on its own; BoundedQueue wraps it in a mutex.

/// Fixed-capacity FIFO that evicts its oldest item when pushed while full
///
/// One slot more than the capacity is allocated so that `head == tail`
/// always means empty and `(tail + 1) % slots == head` always means full.
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    overruns: u64,
}

impl<T> RingBuffer<T> {
    /// Create a ring buffer holding at most `capacity` items
    ///
    /// A zero capacity is allowed: every push is then an overrun and the
    /// item is handed straight back.
    pub fn new(capacity: usize) -> Self {
        let slots: Vec<Option<T>> = (0..capacity + 1).map(|_| None).collect();
        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            overruns: 0,
        }
    }

    /// Append an item, evicting and returning the oldest one if full
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity() == 0 {
            self.overruns += 1;
            return Some(item);
        }

        let evicted = if self.is_full() {
            let old = self.slots[self.head].take();
            self.head = self.advance(self.head);
            self.overruns += 1;
            old
        } else {
            None
        };

        self.slots[self.tail] = Some(item);
        self.tail = self.advance(self.tail);
        evicted
    }

    /// Remove and return the oldest item
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = self.advance(self.head);
        item
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head].as_mut()
    }

    /// Item at `pos`, counting from the oldest
    pub fn get(&self, pos: usize) -> Option<&T> {
        if pos >= self.len() {
            return None;
        }
        self.slots[(self.head + pos) % self.slots.len()].as_ref()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |pos| self.get(pos))
    }

    pub fn len(&self) -> usize {
        if self.tail >= self.head {
            self.tail - self.head
        } else {
            self.slots.len() - self.head + self.tail
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        self.advance(self.tail) == self.head
    }

    /// Number of items evicted (or refused at zero capacity) so far
    pub fn overrun_counter(&self) -> u64 {
        self.overruns
    }

    pub fn reset_overrun_counter(&mut self) {
        self.overruns = 0;
    }

    /// Drop every queued item, returning how many there were
    pub fn clear(&mut self) -> usize {
        let mut cleared = 0;
        while self.pop().is_some() {
            cleared += 1;
        }
        cleared
    }

    /// Remove every queued item, oldest first
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len());
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }

    #[inline]
    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("overruns", &self.overruns)
            .finish()
    }
}
