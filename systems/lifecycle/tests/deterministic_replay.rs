use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use gridvault_core::{options::OptionValue, Action};
use gridvault_system_lifecycle::Env;

#[test]
fn deterministic_replay_produces_equal_snapshots() {
    let first = replay(&scripted_actions());
    let second = replay(&scripted_actions());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
}

fn replay(script: &[i32]) -> ReplayOutcome {
    let overrides: Vec<(String, OptionValue)> = [
        ("rand_seed", OptionValue::Int(99)),
        ("world_dim", OptionValue::Int(7)),
        ("num_keys", OptionValue::Int(2)),
        ("num_doors", OptionValue::Int(1)),
        ("timeout", OptionValue::Int(25)),
    ]
    .iter()
    .map(|(name, value)| ((*name).to_owned(), *value))
    .collect();
    let mut env = Env::create("vault", &overrides, None).expect("create environment");

    let steps = script
        .iter()
        .map(|&value| {
            let outcome = env.step(Action::new(value));
            StepRecord {
                reward_bits: outcome.reward.to_bits(),
                done: outcome.done,
                level_complete: outcome.level_complete,
                level_seed: outcome.level_seed,
            }
        })
        .collect();

    ReplayOutcome {
        steps,
        cells: env.world().grid().iter().map(|cell| cell.code()).collect(),
        agent_cell: env.world().agent().cell(),
        level_seed: env.level_seed(),
        reset_count: env.reset_count(),
    }
}

// Mixed walking, waiting, and two forced resets; the tight timeout adds a
// third kind of episode boundary to the script.
fn scripted_actions() -> Vec<i32> {
    vec![
        4, 7, 7, 5, 1, 3, -1, 5, 5, 7, 4, 1, 7, 5, 3, 1, -1, 4, 7, 7, 3, 5, 5, 1, 4, 7, 5, 3, 1, 7,
    ]
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    steps: Vec<StepRecord>,
    cells: Vec<u8>,
    agent_cell: (i32, i32),
    level_seed: i32,
    reset_count: i32,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct StepRecord {
    reward_bits: u32,
    done: bool,
    level_complete: bool,
    level_seed: i32,
}
