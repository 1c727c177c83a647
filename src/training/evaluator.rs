use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::{Agent, DqnAgent, RandomAgent};
use crate::error::TrainingError;
use crate::game::{ConnectFourEnv, Player};
use crate::training::metrics::{mean, median, std_dev};
use crate::training::probes::{score_probes, BLOCK_PROBES, FINISH_PROBES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Restrict the greedy action to valid columns. When off, an invalid
    /// choice forfeits the game.
    pub enforce_valid_action: bool,
    pub episodes: usize,
    /// Evaluate every `period` training episodes.
    pub period: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            enforce_valid_action: false,
            episodes: 100,
            period: 25,
        }
    }
}

/// Summary of one evaluation run. Rates are fractions, probe scores percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub rewards_median: f64,
    pub rewards_mean: f64,
    pub rewards_std: f64,
    pub steps_median: f64,
    pub steps_mean: f64,
    pub steps_std: f64,
    pub win_rate: f64,
    pub loss_rate: f64,
    pub draw_rate: f64,
    pub finish_pct: f32,
    pub block_pct: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameResult {
    Win,
    Loss,
    Draw,
}

struct GameSummary {
    reward: f64,
    steps: usize,
    result: GameResult,
}

/// Plays the greedy policy against an opponent and scores the tactical probes.
pub struct Evaluator {
    config: EvalConfig,
    opponent: Box<dyn Agent>,
    rng: StdRng,
}

impl Evaluator {
    /// Evaluator against a uniform-random opponent. `rng` picks the agent's
    /// seat and seeds the opponent.
    pub fn new(config: EvalConfig, mut rng: StdRng) -> Self {
        let opponent = RandomAgent::new(StdRng::from_rng(&mut rng));
        Self::with_opponent(config, rng, Box::new(opponent))
    }

    pub fn with_opponent(config: EvalConfig, rng: StdRng, opponent: Box<dyn Agent>) -> Self {
        Evaluator {
            config,
            opponent,
            rng,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run `episodes` games and the probe battery with the policy frozen.
    pub fn evaluate(
        &mut self,
        agent: &mut DqnAgent,
        env: &mut ConnectFourEnv,
    ) -> Result<EvaluationRecord, TrainingError> {
        let agent = agent.inference_mode();

        let mut rewards = Vec::with_capacity(self.config.episodes);
        let mut steps = Vec::with_capacity(self.config.episodes);
        let (mut wins, mut draws) = (0usize, 0usize);

        for _ in 0..self.config.episodes {
            let seat = if self.rng.random_bool(0.5) {
                Player::One
            } else {
                Player::Two
            };
            let game = self.play_game(&agent, env, seat)?;
            rewards.push(game.reward);
            steps.push(game.steps as f64);
            match game.result {
                GameResult::Win => wins += 1,
                GameResult::Draw => draws += 1,
                GameResult::Loss => {}
            }
        }

        let finish_pct = score_probes(&FINISH_PROBES, |board, valid| {
            agent.exploit(board, valid, true)
        })?;
        let block_pct = score_probes(&BLOCK_PROBES, |board, valid| {
            agent.exploit(board, valid, true)
        })?;

        let episodes = self.config.episodes.max(1) as f64;
        let win_rate = wins as f64 / episodes;
        let draw_rate = draws as f64 / episodes;
        let record = EvaluationRecord {
            rewards_median: median(&rewards),
            rewards_mean: mean(&rewards),
            rewards_std: std_dev(&rewards),
            steps_median: median(&steps),
            steps_mean: mean(&steps),
            steps_std: std_dev(&steps),
            win_rate,
            loss_rate: 1.0 - win_rate - draw_rate,
            draw_rate,
            finish_pct,
            block_pct,
        };
        debug!(opponent = self.opponent.name(), ?record, "evaluation finished");
        Ok(record)
    }

    /// One game with the agent in `seat`. Reward and steps only count the
    /// agent's own moves.
    fn play_game(
        &mut self,
        agent: &DqnAgent,
        env: &mut ConnectFourEnv,
        seat: Player,
    ) -> Result<GameSummary, TrainingError> {
        let rewards = *env.rewards();
        let mut state = env.reset();
        let mut reward = 0.0f64;
        let mut steps = 0usize;

        loop {
            let valid_actions = env.valid_actions();
            let agent_turn = env.turn() == seat;
            let action = if agent_turn {
                let action =
                    agent.exploit(&state, &valid_actions, self.config.enforce_valid_action)?;
                if !valid_actions.contains(&action) {
                    reward += rewards.loss as f64;
                    return Ok(GameSummary {
                        reward,
                        steps,
                        result: GameResult::Loss,
                    });
                }
                action
            } else {
                self.opponent.select_action(&state, &valid_actions)?
            };

            let step = env.step(action)?;
            if agent_turn {
                steps += 1;
            }

            if step.done {
                let result = match env.winner() {
                    Some(winner) if winner == seat => {
                        reward += step.reward as f64;
                        GameResult::Win
                    }
                    Some(_) => GameResult::Loss,
                    None => GameResult::Draw,
                };
                return Ok(GameSummary {
                    reward,
                    steps,
                    result,
                });
            }

            if agent_turn {
                reward += step.reward as f64;
            }
            state = step.board;
            env.switch_turn();
        }
    }
}
