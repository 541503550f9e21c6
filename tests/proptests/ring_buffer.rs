// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property-based tests for `RingBuffer`.
//!
//! Arbitrary push/pop sequences are replayed against a `VecDeque` model
//! with the same capacity; the buffer must agree with the model on
//! contents and on how many items were overwritten.

#[cfg(test)]
mod tests {
    use logdispatch::logging::RingBuffer;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone)]
    enum Op {
        Push(u32),
        Pop,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![3 => any::<u32>().prop_map(Op::Push), 1 => Just(Op::Pop)]
    }

    proptest! {
        /// Pushing `n` items keeps the newest `min(n, capacity)` and counts the rest
        #[test]
        fn test_push_only_size_and_overrun(capacity in 0usize..64, pushed in 0usize..256) {
            let mut ring = RingBuffer::new(capacity);
            for i in 0..pushed {
                ring.push(i);
            }
            prop_assert_eq!(ring.len(), pushed.min(capacity));
            prop_assert_eq!(ring.overrun_counter(), pushed.saturating_sub(capacity) as u64);

            let kept: Vec<usize> = ring.iter().copied().collect();
            let expected: Vec<usize> = (pushed.saturating_sub(capacity)..pushed).collect();
            prop_assert_eq!(kept, expected);
        }

        /// Mixed pushes and pops behave like a bounded FIFO that evicts its head
        #[test]
        fn test_matches_bounded_fifo_model(
            capacity in 1usize..16,
            ops in proptest::collection::vec(op(), 0..200),
        ) {
            let mut ring = RingBuffer::new(capacity);
            let mut model = VecDeque::new();
            let mut overruns = 0u64;

            for op in ops {
                match op {
                    Op::Push(v) => {
                        let evicted = ring.push(v);
                        let expected = if model.len() == capacity {
                            overruns += 1;
                            model.pop_front()
                        } else {
                            None
                        };
                        model.push_back(v);
                        prop_assert_eq!(evicted, expected);
                    }
                    Op::Pop => prop_assert_eq!(ring.pop(), model.pop_front()),
                }
                prop_assert_eq!(ring.len(), model.len());
                prop_assert!(ring.len() <= ring.capacity());
                prop_assert_eq!(ring.is_full(), model.len() == capacity);
                prop_assert_eq!(ring.front(), model.front());
            }

            prop_assert_eq!(ring.overrun_counter(), overruns);
            prop_assert_eq!(ring.drain(), Vec::from(model));
            prop_assert!(ring.is_empty());
        }
    }
}
