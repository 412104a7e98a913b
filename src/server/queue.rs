use std::collections::{HashSet, VecDeque};

use crate::protocol::ClientId;

/// FIFO queue of clients seeking a partner. A client id appears at most once.
///
/// Entries can go stale when a disconnect races the queue; `dequeue_next`
/// discards those instead of handing them out.
pub(crate) struct WaitingQueue {
    order: VecDeque<ClientId>,
    members: HashSet<ClientId>,
}

/// Result of a dequeue attempt, with the number of stale entries discarded
/// along the way (reported to metrics by the pairing engine).
pub(crate) struct DequeueOutcome {
    pub partner: Option<ClientId>,
    pub stale_skipped: u64,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
        }
    }

    /// Append to the tail. Duplicate ids are ignored, guarding against
    /// repeated match requests.
    pub fn enqueue(&mut self, client_id: ClientId) -> bool {
        if !self.members.insert(client_id) {
            return false;
        }
        self.order.push_back(client_id);
        true
    }

    /// Pop the longest-waiting entry that still satisfies `is_live`,
    /// discarding stale entries until a live one is found or the queue is
    /// exhausted. This is the resolution of the "partner vanished before
    /// pairing" race.
    pub fn dequeue_next(&mut self, mut is_live: impl FnMut(&ClientId) -> bool) -> DequeueOutcome {
        let mut stale_skipped = 0;
        while let Some(candidate) = self.order.pop_front() {
            self.members.remove(&candidate);
            if is_live(&candidate) {
                return DequeueOutcome {
                    partner: Some(candidate),
                    stale_skipped,
                };
            }
            stale_skipped += 1;
        }
        DequeueOutcome {
            partner: None,
            stale_skipped,
        }
    }

    /// Delete a specific entry if present. Idempotent; used on manual
    /// cancellation and disconnect cleanup.
    pub fn remove(&mut self, client_id: &ClientId) -> bool {
        if !self.members.remove(client_id) {
            return false;
        }
        self.order.retain(|queued| queued != client_id);
        true
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.members.contains(client_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &ClientId> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn dequeue_follows_arrival_order() {
        let mut queue = WaitingQueue::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        assert_eq!(queue.dequeue_next(|_| true).partner, Some(a));
        assert_eq!(queue.dequeue_next(|_| true).partner, Some(b));
        assert_eq!(queue.dequeue_next(|_| true).partner, Some(c));
        assert_eq!(queue.dequeue_next(|_| true).partner, None);
    }

    #[test]
    fn enqueue_rejects_duplicates() {
        let mut queue = WaitingQueue::new();
        let a = Uuid::new_v4();

        assert!(queue.enqueue(a));
        assert!(!queue.enqueue(a));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn dequeue_skips_stale_entries_until_live_or_empty() {
        let mut queue = WaitingQueue::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        let outcome = queue.dequeue_next(|id| *id == c);
        assert_eq!(outcome.partner, Some(c));
        assert_eq!(outcome.stale_skipped, 2);
        assert_eq!(queue.len(), 0);

        queue.enqueue(a);
        let outcome = queue.dequeue_next(|_| false);
        assert_eq!(outcome.partner, None);
        assert_eq!(outcome.stale_skipped, 1);
    }

    #[test]
    fn remove_is_idempotent_and_preserves_order() {
        let mut queue = WaitingQueue::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        assert!(queue.remove(&b));
        assert!(!queue.remove(&b));
        assert!(!queue.contains(&b));

        assert_eq!(queue.dequeue_next(|_| true).partner, Some(a));
        assert_eq!(queue.dequeue_next(|_| true).partner, Some(c));
    }
}
