//! Bounded MPMC queue with batch drain.
//!
//! Producers push one item at a time and signal a single waiter.
//! Consumers call [`BoundedQueue::wait_nonempty`], which blocks until the
//! queue holds at least one item or `stop` flips, then drains everything
//! into one batch. Batch semantics matter: the protocol layer processes a
//! burst of arrivals atomically with respect to its own state, which keeps
//! ordering invariants intact when many acks land back to back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    condvar: Condvar,
}

impl<T> Default for BoundedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BoundedQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Push a single item and wake one waiter.
    pub fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.condvar.notify_one();
    }

    /// Block until the queue is nonempty or `stop` is set, then drain every
    /// pending item into a batch. Returns an empty batch only when `stop`
    /// was observed with nothing left to drain.
    pub fn wait_nonempty(&self, stop: &AtomicBool) -> Vec<T> {
        let mut guard = self.items.lock();
        loop {
            if !guard.is_empty() {
                return guard.drain(..).collect();
            }
            if stop.load(Ordering::Acquire) {
                return Vec::new();
            }
            self.condvar.wait_for(&mut guard, POLL_INTERVAL);
        }
    }

    /// Wake every thread blocked in `wait_nonempty`, used by the shutdown path.
    pub fn notify_all(&self) {
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_all_pending_items_in_one_batch() {
        let q = BoundedQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        let stop = AtomicBool::new(false);
        let batch = q.wait_nonempty(&stop);
        assert_eq!(batch, vec![1, 2, 3]);
    }

    #[test]
    fn stop_unblocks_an_empty_queue() {
        let q: BoundedQueue<i32> = BoundedQueue::new();
        let stop = AtomicBool::new(true);
        let batch = q.wait_nonempty(&stop);
        assert!(batch.is_empty());
    }

    #[test]
    fn concurrent_push_wakes_waiter() {
        use std::sync::Arc;
        use std::thread;

        let q = Arc::new(BoundedQueue::new());
        let stop = Arc::new(AtomicBool::new(false));
        let q2 = q.clone();
        let stop2 = stop.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            q2.push(99);
        });

        let batch = q.wait_nonempty(&stop);
        handle.join().unwrap();
        stop.store(true, Ordering::Release);
        assert_eq!(batch, vec![99]);
    }
}
