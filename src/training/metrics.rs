use serde::{Deserialize, Serialize};

/// Per-episode training history plus the loss of every optimization step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub steps: Vec<usize>,
    pub rewards: Vec<f32>,
    pub time_secs: Vec<f64>,
    pub learning_rates: Vec<f64>,
    pub running_loss: Vec<f32>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_episode(&mut self, steps: usize, reward: f32, time_secs: f64, learning_rate: f64) {
        self.steps.push(steps);
        self.rewards.push(reward);
        self.time_secs.push(time_secs);
        self.learning_rates.push(learning_rate);
    }

    pub fn record_loss(&mut self, loss: f32) {
        self.running_loss.push(loss);
    }

    /// Number of recorded episodes.
    pub fn episodes(&self) -> usize {
        self.steps.len()
    }

    /// Transitions produced over all recorded episodes.
    pub fn total_steps(&self) -> usize {
        self.steps.iter().sum()
    }

    /// Average reward over the last N episodes.
    pub fn average_reward(&self, last_n: usize) -> f64 {
        tail_mean(self.rewards.iter().map(|&r| r as f64), self.rewards.len(), last_n)
    }

    /// Average episode length over the last N episodes.
    pub fn average_steps(&self, last_n: usize) -> f64 {
        tail_mean(self.steps.iter().map(|&s| s as f64), self.steps.len(), last_n)
    }

    /// Average loss over the last N optimization steps.
    pub fn average_loss(&self, last_n: usize) -> f64 {
        tail_mean(
            self.running_loss.iter().map(|&l| l as f64),
            self.running_loss.len(),
            last_n,
        )
    }
}

fn tail_mean(values: impl DoubleEndedIterator<Item = f64>, len: usize, last_n: usize) -> f64 {
    let n = len.min(last_n);
    if n == 0 {
        return 0.0;
    }
    values.rev().take(n).sum::<f64>() / n as f64
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_totals() {
        let mut h = TrainingHistory::new();
        h.record_episode(10, 1.0, 0.5, 1e-2);
        h.record_episode(20, -1.0, 0.25, 1e-2);
        assert_eq!(h.episodes(), 2);
        assert_eq!(h.total_steps(), 30);
        assert!((h.average_steps(10) - 15.0).abs() < 1e-9);
        assert!(h.average_reward(10).abs() < 1e-9);
        assert!((h.average_reward(1) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_loss() {
        let mut h = TrainingHistory::new();
        assert_eq!(h.average_loss(10), 0.0);
        h.record_loss(1.0);
        h.record_loss(3.0);
        assert!((h.average_loss(10) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_statistics() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((median(&values) - 4.5).abs() < 1e-12);
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(std_dev(&[]), 0.0);
    }
}
