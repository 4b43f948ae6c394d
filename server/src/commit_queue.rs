//! Deferred score commits
//!
//! Each resolved throw schedules one commit for the moment its simulated
//! flight lands. Commits wait in a min-heap keyed by deadline and are
//! drained by the server tick loop, so any number can be outstanding
//! without a task or thread each, and they always apply in
//! deadline-elapsed order rather than throw order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCommit {
    pub board_index: u8,
    pub value: u8,
    pub commit_at: Instant,
    /// Ledger generation at schedule time; a mismatch at drain time means
    /// the game was reset and the commit is stale.
    pub generation: u64,
}

#[derive(Debug)]
struct Entry {
    commit: PendingCommit,
    /// Schedule order, tie-breaker for identical deadlines.
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.commit
            .commit_at
            .cmp(&other.commit.commit_at)
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Default)]
pub struct CommitQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl CommitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, commit: PendingCommit) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry { commit, seq }));
    }

    /// Removes and returns the earliest commit whose deadline has passed.
    /// Call repeatedly to drain everything due.
    pub fn pop_due(&mut self, now: Instant) -> Option<PendingCommit> {
        if self.heap.peek()?.0.commit.commit_at > now {
            return None;
        }
        self.heap.pop().map(|Reverse(entry)| entry.commit)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.commit.commit_at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn commit_at(at: Instant, board_index: u8, value: u8) -> PendingCommit {
        PendingCommit {
            board_index,
            value,
            commit_at: at,
            generation: 0,
        }
    }

    #[test]
    fn test_pops_in_deadline_order_not_insert_order() {
        let now = Instant::now();
        let mut queue = CommitQueue::new();
        // A slow far throw scheduled before a quick close one.
        queue.schedule(commit_at(now + Duration::from_millis(300), 1, 20));
        queue.schedule(commit_at(now + Duration::from_millis(100), 2, 60));

        let later = now + Duration::from_millis(400);
        assert_eq!(queue.pop_due(later).unwrap().board_index, 2);
        assert_eq!(queue.pop_due(later).unwrap().board_index, 1);
        assert!(queue.pop_due(later).is_none());
    }

    #[test]
    fn test_only_due_commits_pop() {
        let now = Instant::now();
        let mut queue = CommitQueue::new();
        queue.schedule(commit_at(now + Duration::from_millis(50), 1, 5));
        queue.schedule(commit_at(now + Duration::from_millis(500), 2, 5));

        let mid = now + Duration::from_millis(100);
        assert!(queue.pop_due(mid).is_some());
        assert!(queue.pop_due(mid).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_equal_deadlines_drain_in_schedule_order() {
        let at = Instant::now() + Duration::from_millis(10);
        let mut queue = CommitQueue::new();
        for board in 1..=4u8 {
            queue.schedule(commit_at(at, board, 1));
        }
        let later = at + Duration::from_millis(1);
        for board in 1..=4u8 {
            assert_eq!(queue.pop_due(later).unwrap().board_index, board);
        }
    }

    #[test]
    fn test_next_deadline_tracks_minimum() {
        let now = Instant::now();
        let mut queue = CommitQueue::new();
        assert!(queue.next_deadline().is_none());

        queue.schedule(commit_at(now + Duration::from_millis(200), 1, 1));
        queue.schedule(commit_at(now + Duration::from_millis(80), 2, 1));
        assert_eq!(queue.next_deadline(), Some(now + Duration::from_millis(80)));
    }

    #[test]
    fn test_generation_travels_with_commit() {
        let now = Instant::now();
        let mut queue = CommitQueue::new();
        queue.schedule(PendingCommit {
            board_index: 1,
            value: 20,
            commit_at: now,
            generation: 7,
        });
        assert_eq!(queue.pop_due(now).unwrap().generation, 7);
    }
}
