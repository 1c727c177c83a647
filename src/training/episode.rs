use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::DqnAgent;
use crate::error::TrainingError;
use crate::game::{ConnectFourEnv, RewardConfig};
use crate::training::replay_buffer::Transition;

/// How a training episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOutcome {
    /// The last mover connected four.
    Win,
    Draw,
    /// The agent picked a column that was not valid.
    Forfeit,
}

/// Transitions of one episode, unshaped, plus how it ended.
#[derive(Debug, Clone)]
pub struct EpisodeTrace {
    pub transitions: Vec<Transition>,
    pub outcome: EpisodeOutcome,
}

/// Play one episode with the agent moving for both sides.
///
/// `total_steps` is the number of transitions produced by earlier episodes; it
/// drives the exploration schedule together with the transitions of this one.
pub fn play_episode(
    agent: &mut DqnAgent,
    env: &mut ConnectFourEnv,
    total_steps: usize,
    enforce_valid: bool,
) -> Result<EpisodeTrace, TrainingError> {
    let mut transitions = Vec::new();
    let mut state = env.reset();

    loop {
        let valid_actions = env.valid_actions();
        if valid_actions.is_empty() {
            return Err(TrainingError::NoValidActions);
        }
        let steps_so_far = total_steps + transitions.len();
        let action = agent.act(&state, &valid_actions, steps_so_far, enforce_valid)?;

        if !valid_actions.contains(&action) {
            transitions.push(Transition {
                state,
                action,
                next_state: None,
                reward: env.rewards().loss,
            });
            return Ok(EpisodeTrace {
                transitions,
                outcome: EpisodeOutcome::Forfeit,
            });
        }

        let step = env.step(action)?;
        transitions.push(Transition {
            state,
            action,
            next_state: Some(step.board),
            reward: step.reward,
        });

        if step.done {
            let outcome = if env.winner().is_some() {
                EpisodeOutcome::Win
            } else {
                EpisodeOutcome::Draw
            };
            return Ok(EpisodeTrace {
                transitions,
                outcome,
            });
        }

        state = step.board;
        env.switch_turn();
    }
}

/// Charge the side that moved second-to-last with the result of the final move:
/// the loss reward after a win, the draw reward otherwise. Episodes of a single
/// transition are left as they are.
pub fn shape_rewards(transitions: &mut [Transition], outcome: EpisodeOutcome, rewards: &RewardConfig) {
    let len = transitions.len();
    if len < 2 {
        return;
    }
    transitions[len - 2].reward += match outcome {
        EpisodeOutcome::Win => rewards.loss,
        EpisodeOutcome::Draw | EpisodeOutcome::Forfeit => rewards.draw,
    };
}

/// Derive a deterministic seed for a named stream (episode index, component id).
pub fn derive_seed(base_seed: u64, stream: u64) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= stream;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= stream >> 32;
    hash
}

/// Seeded generator for `stream`, or OS entropy when no seed is configured.
pub fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(derive_seed(seed, stream)),
        None => StdRng::from_os_rng(),
    }
}
