// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property-based tests for `BoundedQueue` counters and ordering.

#[cfg(test)]
mod tests {
    use logdispatch::logging::BoundedQueue;
    use proptest::prelude::*;

    proptest! {
        /// Overwriting keeps the newest items in order and counts each eviction
        #[test]
        fn test_overwrite_keeps_newest(capacity in 1usize..32, pushed in 0u32..128) {
            let queue = BoundedQueue::new(capacity);
            for i in 0..pushed {
                queue.enqueue_overwrite(i);
            }
            let evicted = (pushed as usize).saturating_sub(capacity);
            prop_assert_eq!(queue.overrun_counter(), evicted as u64);
            prop_assert_eq!(queue.discard_counter(), 0);

            let items = queue.drain();
            let expected: Vec<u32> = (evicted as u32..pushed).collect();
            prop_assert_eq!(items, expected);
        }

        /// A refused enqueue counts one discard and leaves the queue untouched
        #[test]
        fn test_if_space_on_full_queue(capacity in 1usize..32, extra in 1usize..16) {
            let queue = BoundedQueue::new(capacity);
            for i in 0..capacity {
                prop_assert!(queue.enqueue_if_space(i).is_ok());
            }
            for i in 0..extra {
                let discards = queue.discard_counter();
                prop_assert_eq!(queue.enqueue_if_space(capacity + i), Err(capacity + i));
                prop_assert_eq!(queue.discard_counter(), discards + 1);
                prop_assert_eq!(queue.len(), capacity);
                prop_assert_eq!(queue.overrun_counter(), 0);
            }
            prop_assert_eq!(queue.try_dequeue(), Some(0));
        }

        /// Whatever the policy mix, a single consumer sees accepted items in order
        #[test]
        fn test_fifo_across_policies(
            capacity in 1usize..16,
            policies in proptest::collection::vec(0u8..2, 1..100),
        ) {
            let queue = BoundedQueue::new(capacity);
            for (i, policy) in policies.iter().enumerate() {
                if *policy == 0 {
                    queue.enqueue_overwrite(i);
                } else {
                    let _ = queue.enqueue_if_space(i);
                }
            }
            let accounted = queue.len() as u64 + queue.overrun_counter() + queue.discard_counter();
            prop_assert_eq!(accounted, policies.len() as u64);

            let items = queue.drain();
            prop_assert!(items.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
