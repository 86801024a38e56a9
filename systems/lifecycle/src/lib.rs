#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Episode lifecycle for gridvault environments.
//!
//! [`Env`] owns one game variant and drives it through seed selection,
//! world regeneration, stepping, and channel publication. Level seeds draw
//! from a dedicated stream so level identity depends only on `rand_seed`
//! and the level range options; sequential mode instead walks the seed by
//! a fixed stride whenever a level is completed.

use tracing::debug;

use gridvault_core::{
    channels::{ChannelBuffer, ChannelSet, ElementKind, SpaceDesc},
    options::{OptionValue, Options},
    scene::{RenderBackend, Scene, SceneSprite, Surface, RENDER_HEIGHT, RENDER_WIDTH},
    Action, ObjectKind, SetupError, StepData,
};
use gridvault_system_levelgen::rng::LevelRng;
use gridvault_system_resolver::{GameCtx, GameVariant, NUM_ACTIONS};
use gridvault_system_vault::VaultGame;
use gridvault_world::World;

/// Channel carrying the per-step reward as a single `f32`.
pub const REWARD_CHANNEL: &str = "reward";
/// Channel carrying the episode-end flag as a single byte.
pub const DONE_CHANNEL: &str = "done";
/// Channel carrying the seed of the level the step ran in.
pub const LEVEL_SEED_CHANNEL: &str = "level_seed";
/// Channel carrying the level-completion flag as a single byte.
pub const LEVEL_COMPLETE_CHANNEL: &str = "level_complete";
/// Channel carrying the rendered observation as `64x64` RGB bytes.
pub const RGB_CHANNEL: &str = "rgb";

/// Seed stride between consecutive levels in sequential mode.
const SEQUENTIAL_SEED_STRIDE: i32 = 997;

/// Constructor table the environment factory selects games from.
const GAME_TABLE: &[(&str, fn() -> Box<dyn GameVariant>)] =
    &[(gridvault_system_vault::GAME_NAME, new_vault)];

fn new_vault() -> Box<dyn GameVariant> {
    Box::new(VaultGame::new())
}

fn build_game(name: &str) -> Result<Box<dyn GameVariant>, SetupError> {
    GAME_TABLE
        .iter()
        .find(|(game_name, _)| *game_name == name)
        .map(|(_, ctor)| ctor())
        .ok_or_else(|| SetupError::UnknownGame {
            name: name.to_owned(),
        })
}

/// Per-step results mirrored into the lifecycle channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Reward earned during the step.
    pub reward: f32,
    /// Whether the step ended an episode, after sequential masking.
    pub done: bool,
    /// Whether the level's objective was completed this step.
    pub level_complete: bool,
    /// Seed of the level the step ran in.
    pub level_seed: i32,
}

/// A single simulation environment bound to one game variant.
///
/// Creation applies option overrides, registers every channel, and loads
/// the first level. From then on [`Env::step`] is the only entry point a
/// training loop needs: episode boundaries, seed bookkeeping, rendering,
/// and channel publication all happen inside it.
pub struct Env {
    game: Box<dyn GameVariant>,
    world: World,
    rng: LevelRng,
    seed_rng: LevelRng,
    channels: ChannelSet,
    step_data: StepData,
    seed_low: i32,
    seed_high: i32,
    use_sequential_levels: bool,
    timeout: i32,
    default_action: Action,
    level_seed: i32,
    episodes_remaining: i32,
    cur_time: i32,
    total_reward: f32,
    reset_count: i32,
    last_episode_reward: f32,
    action: Action,
    renderer: Option<Box<dyn RenderBackend>>,
    surface: Surface,
}

impl Env {
    /// Builds an environment for the named game and loads its first level.
    ///
    /// Lifecycle options (`rand_seed`, `num_levels`, `start_level`,
    /// `use_sequential_levels`, `timeout`, `default_action`) are registered
    /// ahead of the variant's own, then `overrides` are applied and
    /// validated. Channels exist once this returns but stay disconnected;
    /// publishing into an unconnected channel is a no-op.
    ///
    /// Passing `None` for `renderer` disables frame rendering even when
    /// the `rgb` channel is connected.
    pub fn create(
        game_name: &str,
        overrides: &[(String, OptionValue)],
        renderer: Option<Box<dyn RenderBackend>>,
    ) -> Result<Self, SetupError> {
        let mut game = build_game(game_name)?;

        let mut options = Options::new();
        options.register_int("rand_seed", 0);
        options.register_int("num_levels", 0);
        options.register_int("start_level", 0);
        options.register_flag("use_sequential_levels", false);
        options.register_int("timeout", 1000);
        options.register_int("default_action", 4);
        game.register_options(&mut options);
        options.apply(overrides)?;
        game.configure(&options)?;

        let default_action = options.int("default_action");
        if !(0..NUM_ACTIONS).contains(&default_action) {
            return Err(SetupError::InvalidDefaultAction {
                action: default_action,
            });
        }

        let num_levels = options.int("num_levels");
        let start_level = options.int("start_level");
        // A non-positive num_levels opens the whole nonnegative seed space;
        // start_level only narrows positive ranges.
        let (seed_low, seed_high) = if num_levels <= 0 {
            (0, i32::MAX)
        } else {
            (start_level, start_level.saturating_add(num_levels))
        };

        let mut channels = ChannelSet::new();
        channels.register(REWARD_CHANNEL, SpaceDesc::scalar(ElementKind::F32))?;
        channels.register(DONE_CHANNEL, SpaceDesc::scalar(ElementKind::U8))?;
        channels.register(LEVEL_SEED_CHANNEL, SpaceDesc::scalar(ElementKind::I32))?;
        channels.register(LEVEL_COMPLETE_CHANNEL, SpaceDesc::scalar(ElementKind::U8))?;
        channels.register(
            RGB_CHANNEL,
            SpaceDesc::new(ElementKind::U8, vec![RENDER_HEIGHT, RENDER_WIDTH, 3]),
        )?;
        game.register_channels(&mut channels)?;

        let dim = game.world_dim();
        let mut env = Self {
            game,
            world: World::new(dim, dim),
            rng: LevelRng::from_seed(0),
            seed_rng: LevelRng::from_seed(options.int("rand_seed")),
            channels,
            step_data: StepData::default(),
            seed_low,
            seed_high,
            use_sequential_levels: options.flag("use_sequential_levels"),
            timeout: options.int("timeout"),
            default_action: Action::new(default_action),
            level_seed: 0,
            episodes_remaining: 0,
            cur_time: 0,
            total_reward: 0.0,
            reset_count: 0,
            last_episode_reward: 0.0,
            action: Action::new(default_action),
            renderer,
            surface: Surface::new(RENDER_WIDTH, RENDER_HEIGHT),
        };
        env.reset();
        Ok(env)
    }

    /// Starts a fresh episode, drawing the next level seed once the
    /// current batch is exhausted.
    ///
    /// [`Env::step`] calls this automatically whenever an episode ends;
    /// explicit calls abandon the episode in progress.
    pub fn reset(&mut self) {
        self.reset_count += 1;
        if self.episodes_remaining == 0 {
            if self.use_sequential_levels && self.step_data.level_complete {
                self.level_seed = self.level_seed.wrapping_add(SEQUENTIAL_SEED_STRIDE);
            } else {
                self.level_seed = self.seed_rng.int_range(self.seed_low, self.seed_high);
            }
            self.episodes_remaining = 1;
        } else {
            self.step_data.clear();
        }

        self.rng.reseed(self.level_seed);
        self.run_game_reset();
        debug!(
            level_seed = self.level_seed,
            reset_count = self.reset_count,
            "level generated"
        );
        self.cur_time = 0;
        self.total_reward = 0.0;
        self.episodes_remaining -= 1;
        self.action = self.default_action;
    }

    /// Advances the simulation by one action and publishes the results.
    ///
    /// The reset sentinel substitutes the default action and forces an
    /// episode boundary. Episodes also end on level completion and when
    /// the step count reaches the `timeout` option. The ended episode's
    /// total moves into [`Env::last_episode_reward`] and the next level
    /// loads before this returns. In sequential mode a completed level
    /// reports `done == false` and the follow-up level's seed advances by
    /// a fixed stride instead of being redrawn.
    ///
    /// # Panics
    ///
    /// Panics when `action` is neither the reset sentinel nor a member of
    /// the discrete action space, and when the render backend rejects the
    /// observation surface.
    #[must_use]
    pub fn step(&mut self, action: Action) -> StepOutcome {
        self.action = action;
        self.cur_time += 1;
        let mut force_reset = false;
        if self.action.is_reset() {
            self.action = self.default_action;
            force_reset = true;
        }

        self.step_data.clear();
        self.run_game_step();
        self.step_data.done = self.step_data.done || force_reset || self.cur_time >= self.timeout;
        self.total_reward += self.step_data.reward;

        // The published seed names the level this step ran in, not the one
        // an episode boundary switches to.
        let level_seed = self.level_seed;
        if self.step_data.done {
            self.last_episode_reward = self.total_reward;
            debug!(
                total_reward = self.total_reward,
                steps = self.cur_time,
                "episode ended"
            );
            self.reset();
        }
        if self.use_sequential_levels && self.step_data.level_complete {
            // Seamless level transition: the boundary stays internal.
            self.step_data.done = false;
        }

        self.render_frame();
        self.channels.write_f32(REWARD_CHANNEL, 0, self.step_data.reward);
        self.channels
            .write_u8(DONE_CHANNEL, 0, u8::from(self.step_data.done));
        self.channels.write_i32(LEVEL_SEED_CHANNEL, 0, level_seed);
        self.channels.write_u8(
            LEVEL_COMPLETE_CHANNEL,
            0,
            u8::from(self.step_data.level_complete),
        );

        StepOutcome {
            reward: self.step_data.reward,
            done: self.step_data.done,
            level_complete: self.step_data.level_complete,
            level_seed,
        }
    }

    /// Publishes the observation for a level no step has run in yet: the
    /// rendered frame and the current level seed.
    pub fn observe(&mut self) {
        self.render_frame();
        self.channels
            .write_i32(LEVEL_SEED_CHANNEL, 0, self.level_seed);
    }

    /// Connects caller-owned memory to a registered channel.
    pub fn connect_channel(
        &mut self,
        name: &str,
        memory: ChannelBuffer,
    ) -> Result<(), SetupError> {
        self.channels.connect(name, memory)
    }

    /// Shape and element kind of a registered channel.
    ///
    /// # Panics
    ///
    /// Panics when no channel is registered under `name`.
    #[must_use]
    pub fn channel_descriptor(&self, name: &str) -> &SpaceDesc {
        self.channels.descriptor(name)
    }

    /// Stable name of the game variant this environment runs.
    #[must_use]
    pub fn game_name(&self) -> &'static str {
        self.game.name()
    }

    /// Seed of the level currently loaded.
    #[must_use]
    pub fn level_seed(&self) -> i32 {
        self.level_seed
    }

    /// Number of resets performed, the initial one included.
    #[must_use]
    pub fn reset_count(&self) -> i32 {
        self.reset_count
    }

    /// Total reward banked by the most recently finished episode.
    #[must_use]
    pub fn last_episode_reward(&self) -> f32 {
        self.last_episode_reward
    }

    /// Read-only view of the simulated world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    fn run_game_reset(&mut self) {
        let mut ctx = GameCtx {
            world: &mut self.world,
            rng: &mut self.rng,
            step_data: &mut self.step_data,
            channels: &self.channels,
            action: self.action,
        };
        self.game.reset(&mut ctx);
    }

    fn run_game_step(&mut self) {
        let mut ctx = GameCtx {
            world: &mut self.world,
            rng: &mut self.rng,
            step_data: &mut self.step_data,
            channels: &self.channels,
            action: self.action,
        };
        self.game.step(&mut ctx);
    }

    fn render_frame(&mut self) {
        if !self.channels.is_connected(RGB_CHANNEL) {
            return;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let scene = build_scene(&self.world, self.game.as_ref());
        if let Err(error) = renderer.render(&scene, &mut self.surface) {
            panic!("render backend rejected the observation surface: {error}");
        }
        let surface = &self.surface;
        self.channels.fill_u8(RGB_CHANNEL, |bytes| {
            bytes.copy_from_slice(surface.bytes());
        });
    }
}

/// Snapshot of the world in the form the render backends consume.
fn build_scene(world: &World, game: &dyn GameVariant) -> Scene {
    let cells: Vec<ObjectKind> = world.grid().iter().collect();
    let sprites: Vec<SceneSprite> = world
        .entities()
        .filter(|(_, entity)| game.entity_visible(entity))
        .map(|(_, entity)| SceneSprite {
            kind: entity.kind,
            theme: entity.theme,
            x: entity.pos.x,
            y: entity.pos.y,
            rx: entity.rx,
            ry: entity.ry,
            render_z: entity.render_z,
            screen_anchored: entity.screen_anchored,
        })
        .collect();
    Scene::new(world.grid().width(), cells, sprites)
}
