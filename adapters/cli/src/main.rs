#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line runner for gridvault environments.
//!
//! Builds an environment from a game name, an optional TOML config file,
//! and `name=value` overrides, then drives it with a scripted policy and
//! reports per-episode rewards read back through the channel buffers.

use std::{cell::RefCell, collections::BTreeMap, fs, path::PathBuf, rc::Rc};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::info;

use gridvault_core::{
    channels::ChannelBuffer, options::OptionValue, scene::RenderBackend, Action,
};
use gridvault_rendering::BlockRenderer;
use gridvault_system_lifecycle::{
    Env, DONE_CHANNEL, LEVEL_COMPLETE_CHANNEL, LEVEL_SEED_CHANNEL, REWARD_CHANNEL, RGB_CHANNEL,
};
use gridvault_system_resolver::NUM_ACTIONS;

#[derive(Parser, Debug)]
#[command(name = "gridvault", version, about = "Runs gridvault environments")]
struct Cli {
    /// Game variant to run; falls back to the config file, then "vault".
    game: Option<String>,

    /// Seed for the level-selection stream; shorthand for `-o rand_seed=N`.
    #[arg(long)]
    seed: Option<i32>,

    /// Number of episodes to run before exiting.
    #[arg(long, default_value_t = 3)]
    episodes: u32,

    /// Abandon an episode after this many steps.
    #[arg(long)]
    max_steps: Option<u32>,

    /// TOML file with a `[options]` table applied before `-o` overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Option override as `name=value`; repeatable. Values parse as a
    /// flag, then an int, then a float.
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    options: Vec<String>,

    /// Policy choosing the action each step.
    #[arg(long, value_enum, default_value_t = PolicyKind::Random)]
    policy: PolicyKind,

    /// Seed for the random policy.
    #[arg(long, default_value_t = 0)]
    policy_seed: u64,

    /// Render frames into the rgb channel while running.
    #[arg(long)]
    render: bool,

    /// Log debug detail instead of the default info level.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    /// Uniform random actions.
    Random,
    /// The stand-still action every step.
    Still,
}

/// Config file shape: a game name plus an `[options]` table.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    game: Option<String>,
    #[serde(default)]
    options: BTreeMap<String, toml::Value>,
}

struct Policy {
    kind: PolicyKind,
    rng: ChaCha8Rng,
}

impl Policy {
    fn new(kind: PolicyKind, seed: u64) -> Self {
        Self {
            kind,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn next_action(&mut self) -> Action {
        match self.kind {
            PolicyKind::Random => Action::new(self.rng.gen_range(0..NUM_ACTIONS)),
            PolicyKind::Still => Action::new(4),
        }
    }
}

/// Entry point for the gridvault command-line runner.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut overrides = config_overrides(&config)?;
    for raw in &cli.options {
        overrides.push(parse_override(raw)?);
    }
    if let Some(seed) = cli.seed {
        overrides.push(("rand_seed".to_owned(), OptionValue::Int(seed)));
    }

    let game = cli
        .game
        .clone()
        .or(config.game)
        .unwrap_or_else(|| "vault".to_owned());
    let renderer = cli
        .render
        .then(|| Box::new(BlockRenderer::new()) as Box<dyn RenderBackend>);

    let mut env = Env::create(&game, &overrides, renderer)
        .with_context(|| format!("create environment for `{game}`"))?;

    let reward = connect(&mut env, REWARD_CHANNEL)?;
    let done = connect(&mut env, DONE_CHANNEL)?;
    let level_seed = connect(&mut env, LEVEL_SEED_CHANNEL)?;
    let level_complete = connect(&mut env, LEVEL_COMPLETE_CHANNEL)?;
    if cli.render {
        let _ = connect(&mut env, RGB_CHANNEL)?;
    }
    env.observe();

    let mut policy = Policy::new(cli.policy, cli.policy_seed);
    info!(game = env.game_name(), episodes = cli.episodes, "starting run");

    let mut grand_total = 0.0;
    for episode in 1..=cli.episodes {
        let mut total = 0.0;
        let mut steps = 0u32;
        loop {
            let action = if cli.max_steps.is_some_and(|cap| steps >= cap) {
                Action::RESET
            } else {
                policy.next_action()
            };
            let _ = env.step(action);
            total += read_f32(&reward);
            steps += 1;
            if read_flag(&done) {
                break;
            }
        }

        let suffix = if read_flag(&level_complete) {
            " (level complete)"
        } else {
            ""
        };
        println!(
            "episode {episode}: seed {} steps {steps} reward {total:.2}{suffix}",
            read_i32(&level_seed)
        );
        grand_total += total;
    }

    println!(
        "ran {} episode(s), mean reward {:.2}",
        cli.episodes,
        grand_total / f32::max(cli.episodes as f32, 1.0)
    );
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<ConfigFile> {
    let Some(path) = path else {
        return Ok(ConfigFile::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
}

fn config_overrides(config: &ConfigFile) -> Result<Vec<(String, OptionValue)>> {
    let mut pairs = Vec::new();
    for (name, value) in &config.options {
        let value = match value {
            toml::Value::Boolean(flag) => OptionValue::Flag(*flag),
            toml::Value::Integer(int) => OptionValue::Int(
                i32::try_from(*int).with_context(|| format!("option `{name}` is out of range"))?,
            ),
            toml::Value::Float(float) => OptionValue::Float(*float as f32),
            other => bail!("option `{name}` has unsupported type {}", other.type_str()),
        };
        pairs.push((name.clone(), value));
    }
    Ok(pairs)
}

fn parse_override(raw: &str) -> Result<(String, OptionValue)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("override `{raw}` is missing `=`");
    };
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() || value.is_empty() {
        bail!("override `{raw}` needs both a name and a value");
    }
    let parsed = if let Ok(flag) = value.parse::<bool>() {
        OptionValue::Flag(flag)
    } else if let Ok(int) = value.parse::<i32>() {
        OptionValue::Int(int)
    } else if let Ok(float) = value.parse::<f32>() {
        OptionValue::Float(float)
    } else {
        bail!("override `{raw}` is neither a flag, an int, nor a float");
    };
    Ok((name.to_owned(), parsed))
}

fn connect(env: &mut Env, name: &str) -> Result<ChannelBuffer> {
    let len = env.channel_descriptor(name).byte_len();
    let memory: ChannelBuffer = Rc::new(RefCell::new(vec![0u8; len]));
    env.connect_channel(name, Rc::clone(&memory))
        .with_context(|| format!("connect channel `{name}`"))?;
    Ok(memory)
}

fn read_f32(buffer: &ChannelBuffer) -> f32 {
    let bytes = buffer.borrow();
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_i32(buffer: &ChannelBuffer) -> i32 {
    let bytes = buffer.borrow();
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_flag(buffer: &ChannelBuffer) -> bool {
    buffer.borrow()[0] != 0
}
