//! FIFO of matchups awaiting presentation or auto-resolution.

use std::collections::VecDeque;

/// FIFO queue of unordered pairs with duplicate suppression.
///
/// `(a, b)` and `(b, a)` count as the same pair; enqueuing a pair that is
/// already present anywhere in the queue is a no-op. The duplicate scan is
/// linear, which is fine for queues bounded by the number of tie groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchupQueue<T> {
    pairs: VecDeque<(T, T)>,
}

impl<T> Default for MatchupQueue<T> {
    fn default() -> Self {
        Self {
            pairs: VecDeque::new(),
        }
    }
}

impl<T: PartialEq> MatchupQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair at the tail unless it is already queued.
    ///
    /// Returns whether the pair was inserted.
    pub fn enqueue(&mut self, a: T, b: T) -> bool {
        if self.contains(&a, &b) {
            return false;
        }
        self.pairs.push_back((a, b));
        true
    }

    /// Remove and return the head pair.
    pub fn dequeue(&mut self) -> Option<(T, T)> {
        self.pairs.pop_front()
    }

    /// Check whether the pair `{a, b}` is queued in either orientation.
    pub fn contains(&self, a: &T, b: &T) -> bool {
        self.pairs
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Number of pending pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over pending pairs, head first.
    pub fn iter(&self) -> impl Iterator<Item = &(T, T)> {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = MatchupQueue::new();
        queue.enqueue(1, 2);
        queue.enqueue(3, 4);

        assert_eq!(queue.dequeue(), Some((1, 2)));
        assert_eq!(queue.dequeue(), Some((3, 4)));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_symmetric_dedup() {
        let mut queue = MatchupQueue::new();
        assert!(queue.enqueue("a", "b"));
        assert!(!queue.enqueue("b", "a"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pair_can_return_after_dequeue() {
        let mut queue = MatchupQueue::new();
        queue.enqueue(1, 2);
        queue.dequeue();
        assert!(queue.enqueue(2, 1));
    }
}
