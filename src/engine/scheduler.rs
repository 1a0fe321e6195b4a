//! Update Scheduler - Deduplicated, batched re-render requests.
//!
//! Setters never re-render synchronously. They enqueue their instance here;
//! the first enqueue into an empty batch marks a flush as scheduled, and the
//! host runs the flush at its microtask checkpoint (after the current task).
//!
//! ```text
//! set(a) set(a) set(b)      -> pending [a, b], flush scheduled once
//! checkpoint                -> render a, render b
//! ```

use std::collections::HashSet;

use crate::types::InstanceId;

#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    pending: Vec<InstanceId>,
    queued: HashSet<InstanceId>,
    flush_scheduled: bool,
}

impl Scheduler {
    /// Add an instance to the current batch. Returns `true` when this call
    /// scheduled the flush (first enqueue into an empty batch).
    pub fn enqueue(&mut self, id: InstanceId) -> bool {
        if self.queued.insert(id) {
            self.pending.push(id);
        }
        if self.flush_scheduled {
            return false;
        }
        self.flush_scheduled = true;
        true
    }

    /// Take the current batch in enqueue order. Later enqueues start a new one.
    pub fn take_batch(&mut self) -> Vec<InstanceId> {
        self.queued.clear();
        self.flush_scheduled = false;
        std::mem::take(&mut self.pending)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_enqueue_schedules_once() {
        let mut scheduler = Scheduler::default();
        assert!(scheduler.enqueue(InstanceId(1)));
        assert!(!scheduler.enqueue(InstanceId(1)));
        assert!(!scheduler.enqueue(InstanceId(2)));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_batch_order_and_dedup() {
        let mut scheduler = Scheduler::default();
        for id in [3, 1, 3, 2, 1] {
            scheduler.enqueue(InstanceId(id));
        }
        assert_eq!(
            scheduler.take_batch(),
            vec![InstanceId(3), InstanceId(1), InstanceId(2)]
        );
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_enqueue_after_take_starts_new_batch() {
        let mut scheduler = Scheduler::default();
        scheduler.enqueue(InstanceId(1));
        scheduler.take_batch();

        assert!(scheduler.enqueue(InstanceId(1)));
        assert_eq!(scheduler.take_batch(), vec![InstanceId(1)]);
    }
}
