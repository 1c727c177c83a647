use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::agent::Agent;
use crate::error::TrainingError;
use crate::game::Board;

/// An agent that selects uniformly at random from the valid columns.
pub struct RandomAgent {
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(rng: StdRng) -> Self {
        RandomAgent { rng }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl Agent for RandomAgent {
    fn select_action(
        &mut self,
        _board: &Board,
        valid_actions: &[usize],
    ) -> Result<usize, TrainingError> {
        if valid_actions.is_empty() {
            return Err(TrainingError::NoValidActions);
        }
        let idx = self.rng.random_range(0..valid_actions.len());
        Ok(valid_actions[idx])
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ConnectFourEnv, EnvConfig};

    #[test]
    fn test_random_agent_selects_valid_action() {
        let mut agent = RandomAgent::new(StdRng::seed_from_u64(7));
        let board = Board::new();
        let valid = [0, 3, 6];

        for _ in 0..100 {
            let action = agent.select_action(&board, &valid).unwrap();
            assert!(valid.contains(&action), "Action {} is not valid", action);
        }
    }

    #[test]
    fn test_random_agent_plays_full_game() {
        let mut agent = RandomAgent::new(StdRng::seed_from_u64(11));
        let mut env = ConnectFourEnv::new(EnvConfig::default());
        let mut board = env.reset();

        let mut moves = 0;
        while !env.is_done() {
            let valid = env.valid_actions();
            let action = agent.select_action(&board, &valid).unwrap();
            board = env.step(action).unwrap().board;
            env.switch_turn();
            moves += 1;
        }
        assert!(moves >= 7 && moves <= 42);
    }

    #[test]
    fn test_random_agent_without_actions() {
        let mut agent = RandomAgent::default();
        assert!(matches!(
            agent.select_action(&Board::new(), &[]),
            Err(TrainingError::NoValidActions)
        ));
        assert_eq!(agent.name(), "Random");
    }
}
