// SPDX-License-Identifier: Apache-2.0 OR MIT
// Bounded multi-producer multi-consumer queue over RingBuffer

use super::ringbuffer::RingBuffer;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Ring buffer plus the discard count, guarded together so `len` and both
/// counters always agree
struct QueueState<T> {
    ring: RingBuffer<T>,
    discards: u64,
}

/// Blocking MPMC queue with three enqueue behaviors for a full buffer
///
/// - `enqueue_blocking` waits for room
/// - `enqueue_overwrite` evicts the oldest item (counted as an overrun)
/// - `enqueue_if_space` refuses the new item (counted as a discard)
pub struct BoundedQueue<T> {
    buffer: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(QueueState {
                ring: RingBuffer::new(capacity),
                discards: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Wait until there is room, then enqueue
    ///
    /// Blocks forever on a zero-capacity queue; pool configuration rejects
    /// that capacity.
    pub fn enqueue_blocking(&self, item: T) {
        {
            let mut buffer = self.buffer.lock();
            while buffer.ring.is_full() {
                self.not_full.wait(&mut buffer);
            }
            buffer.ring.push(item);
        }
        self.not_empty.notify_one();
    }

    /// Enqueue without waiting, evicting the oldest item when full
    pub fn enqueue_overwrite(&self, item: T) {
        let evicted = {
            let mut buffer = self.buffer.lock();
            buffer.ring.push(item)
        };
        self.not_empty.notify_one();
        // Evicted items may own sinks or barriers; drop them unlocked
        drop(evicted);
    }

    /// Enqueue only if there is room, otherwise hand the item back
    pub fn enqueue_if_space(&self, item: T) -> Result<(), T> {
        {
            let mut buffer = self.buffer.lock();
            if buffer.ring.is_full() {
                buffer.discards += 1;
                return Err(item);
            }
            buffer.ring.push(item);
        }
        self.not_empty.notify_one();
        Ok(())
    }

    /// Wait until an item is available and remove it
    pub fn dequeue_blocking(&self) -> T {
        let item = {
            let mut buffer = self.buffer.lock();
            loop {
                if let Some(item) = buffer.ring.pop() {
                    break item;
                }
                self.not_empty.wait(&mut buffer);
            }
        };
        self.not_full.notify_one();
        item
    }

    /// Wait up to `timeout` for an item
    pub fn dequeue_timed(&self, timeout: Duration) -> Option<T> {
        self.dequeue_timed_with(timeout, |item| item)
    }

    /// Like `dequeue_timed`, but runs `claim` on the item before the lock is
    /// released
    ///
    /// Whatever `claim` does happens in dequeue order across all consumers.
    pub fn dequeue_timed_with<R>(
        &self,
        timeout: Duration,
        claim: impl FnOnce(T) -> R,
    ) -> Option<R> {
        let deadline = Instant::now().checked_add(timeout);

        let claimed = {
            let mut buffer = self.buffer.lock();
            let item = loop {
                if let Some(item) = buffer.ring.pop() {
                    break item;
                }
                match deadline {
                    Some(deadline) => {
                        if self.not_empty.wait_until(&mut buffer, deadline).timed_out() {
                            // One last look: a push may have raced the timeout
                            match buffer.ring.pop() {
                                Some(item) => break item,
                                None => return None,
                            }
                        }
                    }
                    None => self.not_empty.wait(&mut buffer),
                }
            };
            claim(item)
        };
        self.not_full.notify_one();
        Some(claimed)
    }

    pub fn try_dequeue(&self) -> Option<T> {
        let item = self.buffer.lock().ring.pop();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.lock().ring.capacity()
    }

    pub fn overrun_counter(&self) -> u64 {
        self.buffer.lock().ring.overrun_counter()
    }

    pub fn reset_overrun_counter(&self) {
        self.buffer.lock().ring.reset_overrun_counter();
    }

    pub fn discard_counter(&self) -> u64 {
        self.buffer.lock().discards
    }

    pub fn reset_discard_counter(&self) {
        self.buffer.lock().discards = 0;
    }

    /// Queue length and both loss counters, read under one lock
    ///
    /// Returns `(len, overruns, discards)`.
    pub fn snapshot(&self) -> (usize, u64, u64) {
        let buffer = self.buffer.lock();
        (buffer.ring.len(), buffer.ring.overrun_counter(), buffer.discards)
    }

    /// Remove every queued item, oldest first, and wake all blocked producers
    pub fn drain(&self) -> Vec<T> {
        let drained = self.buffer.lock().ring.drain();
        self.not_full.notify_all();
        drained
    }

    /// Drop every queued item, returning how many there were
    pub fn clear(&self) -> usize {
        self.drain().len()
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buffer = self.buffer.lock();
        f.debug_struct("BoundedQueue")
            .field("buffer", &buffer.ring)
            .field("discards", &buffer.discards)
            .finish()
    }
}
