#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! The vault game: a maze of themed keys, locked doors, and hazards.
//!
//! Each episode carves a maze, scatters keys and doors so the level is
//! always solvable, and optionally re-rolls wall cells into hazards.
//! Reaching the exit completes the level for a bonus; every step costs a
//! small action penalty. The full discrete state is published through the
//! `state` info channel so training loops can read the world without
//! rendering.

use glam::Vec2;

use gridvault_core::{
    channels::{ChannelSet, ElementKind, SpaceDesc},
    options::Options,
    EntityId, ObjectKind, SetupError, Theme, MAX_THEMES,
};
use gridvault_system_levelgen::maze::{self, MazeCell};
use gridvault_system_resolver::{advance, CollisionHandler, GameCtx, GameVariant, MoveMode};
use gridvault_world::{query, Entity, World};

/// Name the variant registers under in the game factory.
pub const GAME_NAME: &str = "vault";

/// Half-extent of the agent's collision box.
const AGENT_HALF: f32 = 0.375;
/// Half-extent of keys and the exit.
const PICKUP_HALF: f32 = 0.375;
/// Half-extent of doors and hazards, covering their whole cell.
const BLOCK_HALF: f32 = 0.5;
/// Screen-fraction radius of one collected-key ring icon.
const RING_ICON_RADIUS: f32 = 0.03;
/// Agent top speed in cells per step.
const MAX_SPEED: f32 = 0.75;

/// Name of the discrete state info channel.
const STATE_CHANNEL: &str = "state";
/// Elements before the grid block: agent cell, key flags, door flags.
const STATE_HEADER_LEN: usize = 1 + MAX_THEMES + MAX_THEMES;

/// Game variant state configured once and regenerated every episode.
pub struct VaultGame {
    world_dim: u32,
    num_keys: u32,
    num_doors: u32,
    wall_chance: f32,
    water_chance: f32,
    fire_chance: f32,
    grid_doors: bool,
    completion_bonus: f32,
    fire_bonus: f32,
    water_bonus: f32,
    action_bonus: f32,
    has_keys: [bool; MAX_THEMES],
}

impl VaultGame {
    /// Creates the variant with its default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            world_dim: 5,
            num_keys: 0,
            num_doors: 0,
            wall_chance: 1.0,
            water_chance: 0.0,
            fire_chance: 0.0,
            grid_doors: true,
            completion_bonus: 10.0,
            fire_bonus: -5.0,
            water_bonus: -2.0,
            action_bonus: -1.0,
            has_keys: [false; MAX_THEMES],
        }
    }

    fn publish_state(&self, ctx: &mut GameCtx<'_>) {
        let world: &World = ctx.world;
        let dim = self.world_dim as usize;
        let has_keys = self.has_keys;

        ctx.channels.fill_u8(STATE_CHANNEL, |bytes| {
            let (agent_x, agent_y) = query::agent_cell(world);
            bytes[0] = (agent_y * dim as i32 + agent_x) as u8;
            for (slot, held) in has_keys.iter().enumerate() {
                bytes[1 + slot] = u8::from(*held);
            }
            for slot in &mut bytes[1 + MAX_THEMES..STATE_HEADER_LEN] {
                *slot = 0;
            }

            for (offset, kind) in world.grid().iter().enumerate() {
                bytes[STATE_HEADER_LEN + offset] = kind.code();
            }
            for (_, entity) in world.entities() {
                if matches!(entity.kind, ObjectKind::Player | ObjectKind::RingIcon) {
                    continue;
                }
                if entity.kind == ObjectKind::LockedDoor {
                    bytes[1 + MAX_THEMES + entity.theme.index()] = 1;
                }
                let (x, y) = entity.cell();
                bytes[STATE_HEADER_LEN + y as usize * dim + x as usize] = entity.kind.code();
            }
        });
    }
}

impl Default for VaultGame {
    fn default() -> Self {
        Self::new()
    }
}

impl GameVariant for VaultGame {
    fn name(&self) -> &'static str {
        GAME_NAME
    }

    fn register_options(&self, options: &mut Options) {
        options.register_int("world_dim", 5);
        options.register_float("wall_chance", 1.0);
        options.register_float("water_chance", 0.0);
        options.register_float("fire_chance", 0.0);
        options.register_flag("grid_doors", true);
        options.register_int("num_keys", 0);
        options.register_int("num_doors", 0);
        options.register_float("completion_bonus", 10.0);
        options.register_float("fire_bonus", -5.0);
        options.register_float("water_bonus", -2.0);
        options.register_float("action_bonus", -1.0);
    }

    fn configure(&mut self, options: &Options) -> Result<(), SetupError> {
        let num_keys = options.int("num_keys");
        let num_doors = options.int("num_doors");
        if num_doors < 0 || num_doors > num_keys || num_keys > 3 {
            return Err(SetupError::InvalidCounts {
                num_keys,
                num_doors,
            });
        }
        let dim = options.int("world_dim");
        if dim < 3 || dim % 2 == 0 {
            return Err(SetupError::InvalidWorldDim { dim });
        }

        let mut wall_chance = options.float("wall_chance");
        let mut water_chance = options.float("water_chance");
        let mut fire_chance = options.float("fire_chance");
        let sum = wall_chance + water_chance + fire_chance;
        if sum > 1.0 {
            wall_chance /= sum;
            water_chance /= sum;
            fire_chance /= sum;
        }
        // Cumulative thresholds so one uniform draw decides the re-roll.
        water_chance += wall_chance;
        fire_chance += water_chance;

        self.world_dim = dim as u32;
        self.num_keys = num_keys as u32;
        self.num_doors = num_doors as u32;
        self.wall_chance = wall_chance;
        self.water_chance = water_chance;
        self.fire_chance = fire_chance;
        self.grid_doors = options.flag("grid_doors");
        self.completion_bonus = options.float("completion_bonus");
        self.fire_bonus = options.float("fire_bonus");
        self.water_bonus = options.float("water_bonus");
        self.action_bonus = options.float("action_bonus");
        Ok(())
    }

    fn register_channels(&self, channels: &mut ChannelSet) -> Result<(), SetupError> {
        let cells = self.world_dim as usize * self.world_dim as usize;
        channels.register(
            STATE_CHANNEL,
            SpaceDesc::new(ElementKind::U8, vec![STATE_HEADER_LEN + cells]),
        )
    }

    fn world_dim(&self) -> u32 {
        self.world_dim
    }

    fn reset(&mut self, ctx: &mut GameCtx<'_>) {
        self.has_keys = [false; MAX_THEMES];
        ctx.world.reset();

        let maze_dim = self.world_dim;
        let grid = maze::generate(ctx.rng, maze_dim, self.num_keys, self.num_doors);
        let off_x = ctx.rng.uniform_int(self.world_dim - maze_dim + 1) as i32;
        let off_y = ctx.rng.uniform_int(self.world_dim - maze_dim + 1) as i32;

        for (mx, my, cell) in grid.iter() {
            let x = off_x + mx;
            let y = off_y + my;
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);

            match cell {
                MazeCell::Wall => {
                    let chance = ctx.rng.uniform_float();
                    if chance < self.wall_chance {
                        ctx.world.grid_mut().set(x, y, ObjectKind::Wall);
                    } else if chance < self.water_chance {
                        ctx.world.grid_mut().set(x, y, ObjectKind::Space);
                        let _ = ctx
                            .world
                            .spawn(Entity::new(ObjectKind::Water, center, BLOCK_HALF));
                    } else if chance < self.fire_chance {
                        ctx.world.grid_mut().set(x, y, ObjectKind::Space);
                        let _ = ctx
                            .world
                            .spawn(Entity::new(ObjectKind::Fire, center, BLOCK_HALF));
                    } else {
                        ctx.world.grid_mut().set(x, y, ObjectKind::Space);
                    }
                }
                MazeCell::Space => {
                    ctx.world.grid_mut().set(x, y, ObjectKind::Space);
                }
                MazeCell::Start => {
                    ctx.world.grid_mut().set(x, y, ObjectKind::Space);
                    let _ = ctx
                        .world
                        .spawn_agent(Entity::new(ObjectKind::Player, center, AGENT_HALF));
                }
                MazeCell::Exit => {
                    ctx.world.grid_mut().set(x, y, ObjectKind::Space);
                    let _ = ctx
                        .world
                        .spawn(Entity::new(ObjectKind::Exit, center, PICKUP_HALF));
                }
                MazeCell::Key(theme) => {
                    ctx.world.grid_mut().set(x, y, ObjectKind::Space);
                    let mut key = Entity::new(ObjectKind::Key, center, PICKUP_HALF);
                    key.theme = theme;
                    let _ = ctx.world.spawn(key);
                }
                MazeCell::Door(theme) => {
                    let terrain = if self.grid_doors {
                        ObjectKind::LockedDoor
                    } else {
                        ObjectKind::Space
                    };
                    ctx.world.grid_mut().set(x, y, terrain);
                    let mut door = Entity::new(ObjectKind::LockedDoor, center, BLOCK_HALF);
                    door.theme = theme;
                    let _ = ctx.world.spawn(door);
                }
            }
        }

        for slot in 0..self.num_keys {
            let mut icon = Entity::new(
                ObjectKind::RingIcon,
                Vec2::new(
                    1.0 - RING_ICON_RADIUS * (2.0 * slot as f32 + 1.25),
                    RING_ICON_RADIUS * 0.75,
                ),
                RING_ICON_RADIUS,
            );
            icon.theme = Theme::new(slot as u8);
            icon.render_z = 1;
            icon.screen_anchored = true;
            let _ = ctx.world.spawn(icon);
        }
    }

    fn step(&mut self, ctx: &mut GameCtx<'_>) {
        advance(self, ctx, HANDLERS);
        ctx.step_data.reward += self.action_bonus;
        self.publish_state(ctx);
    }

    fn max_speed(&self) -> f32 {
        MAX_SPEED
    }

    fn move_mode(&self) -> MoveMode {
        if self.grid_doors {
            MoveMode::GridStep
        } else {
            MoveMode::Continuous
        }
    }

    fn cell_blocks(&self, cell: ObjectKind) -> bool {
        matches!(cell, ObjectKind::Wall | ObjectKind::LockedDoor)
    }

    fn entity_blocks(&self, entity: &Entity) -> bool {
        entity.kind == ObjectKind::LockedDoor && !self.has_keys[entity.theme.index()]
    }

    fn entity_visible(&self, entity: &Entity) -> bool {
        entity.kind != ObjectKind::RingIcon || self.has_keys[entity.theme.index()]
    }
}

const HANDLERS: &[(ObjectKind, CollisionHandler<VaultGame>)] = &[
    (ObjectKind::Exit, on_exit),
    (ObjectKind::Key, on_key),
    (ObjectKind::LockedDoor, on_door),
    (ObjectKind::Water, on_water),
    (ObjectKind::Fire, on_fire),
];

fn on_exit(game: &mut VaultGame, ctx: &mut GameCtx<'_>, _id: EntityId) {
    ctx.step_data.done = true;
    ctx.step_data.reward += game.completion_bonus;
    ctx.step_data.level_complete = true;
}

fn on_key(game: &mut VaultGame, ctx: &mut GameCtx<'_>, id: EntityId) {
    let Some(key) = ctx.world.entity_mut(id) else {
        return;
    };
    key.will_erase = true;
    let theme = key.theme;
    game.has_keys[theme.index()] = true;

    if game.grid_doors {
        // Matching doors stop being terrain the moment the key is held.
        let cells: Vec<(i32, i32)> = ctx
            .world
            .entities()
            .filter(|(_, entity)| {
                entity.kind == ObjectKind::LockedDoor && entity.theme == theme
            })
            .map(|(_, entity)| entity.cell())
            .collect();
        for (x, y) in cells {
            ctx.world.grid_mut().set(x, y, ObjectKind::Space);
        }
    }
}

fn on_door(game: &mut VaultGame, ctx: &mut GameCtx<'_>, id: EntityId) {
    let Some(door) = ctx.world.entity_mut(id) else {
        return;
    };
    if game.has_keys[door.theme.index()] {
        door.will_erase = true;
    }
}

fn on_water(game: &mut VaultGame, ctx: &mut GameCtx<'_>, _id: EntityId) {
    ctx.step_data.reward += game.water_bonus;
}

fn on_fire(game: &mut VaultGame, ctx: &mut GameCtx<'_>, _id: EntityId) {
    ctx.step_data.reward += game.fire_bonus;
}
