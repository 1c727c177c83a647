use rand::rngs::StdRng;
use rand::seq::index;

use crate::error::ReplayError;
use crate::game::Board;

/// One unit of experience. `next_state == None` marks a terminal transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: Board,
    pub action: usize,
    pub next_state: Option<Board>,
    pub reward: f32,
}

/// Fixed-capacity ring buffer of transitions with uniform sampling.
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    position: usize,
    len: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize, rng: StdRng) -> Self {
        assert!(capacity > 0, "replay capacity must be positive");
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
            len: 0,
            rng,
        }
    }

    /// Add a transition. Overwrites the oldest when full.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Sample `batch_size` distinct transitions uniformly, without replacement.
    pub fn recall(&mut self, batch_size: usize) -> Result<Vec<Transition>, ReplayError> {
        if batch_size > self.len {
            return Err(ReplayError::InsufficientTransitions {
                requested: batch_size,
                available: self.len,
            });
        }
        let indices = index::sample(&mut self.rng, self.len, batch_size);
        Ok(indices.iter().map(|i| self.buffer[i]).collect())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored transitions, in storage (not insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Transitions are told apart by their reward.
    fn tagged(tag: usize) -> Transition {
        Transition {
            state: Board::new(),
            action: tag % 7,
            next_state: Some(Board::new()),
            reward: tag as f32,
        }
    }

    fn buffer(capacity: usize) -> ReplayBuffer {
        ReplayBuffer::new(capacity, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_push_and_len() {
        let mut buf = buffer(10);
        assert!(buf.is_empty());

        buf.push(tagged(0));
        assert_eq!(buf.len(), 1);

        for i in 1..10 {
            buf.push(tagged(i));
        }
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.capacity(), 10);
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut buf = buffer(5);
        for i in 0..8 {
            buf.push(tagged(i));
        }
        assert_eq!(buf.len(), 5);

        let mut rewards: Vec<f32> = buf.iter().map(|t| t.reward).collect();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(rewards, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_recall_returns_distinct_members() {
        let mut buf = buffer(100);
        for i in 0..50 {
            buf.push(tagged(i));
        }
        let batch = buf.recall(20).unwrap();
        assert_eq!(batch.len(), 20);

        let mut rewards: Vec<u32> = batch.iter().map(|t| t.reward as u32).collect();
        rewards.sort_unstable();
        rewards.dedup();
        assert_eq!(rewards.len(), 20, "sample contained duplicates");
        assert!(rewards.iter().all(|&r| r < 50), "sample contained foreign elements");
    }

    #[test]
    fn test_recall_whole_buffer() {
        let mut buf = buffer(4);
        for i in 0..4 {
            buf.push(tagged(i));
        }
        let mut rewards: Vec<u32> = buf.recall(4).unwrap().iter().map(|t| t.reward as u32).collect();
        rewards.sort_unstable();
        assert_eq!(rewards, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_recall_too_many_fails() {
        let mut buf = buffer(10);
        buf.push(tagged(0));
        assert_eq!(
            buf.recall(5),
            Err(ReplayError::InsufficientTransitions {
                requested: 5,
                available: 1
            })
        );
    }
}
