#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Action translation, movement, and collision dispatch.
//!
//! The resolver owns the per-step mechanics every game variant shares:
//! turning a discrete action into a velocity, advancing entities against
//! the variant's blocking rules, and firing the variant's collision
//! handlers once per overlapping agent/entity pair. Variants plug in
//! through the [`GameVariant`] trait plus a handler table instead of
//! overriding movement internals.

use glam::Vec2;

use gridvault_core::{
    channels::ChannelSet, options::Options, Action, EntityId, ObjectKind, SetupError, StepData,
};
use gridvault_system_levelgen::rng::LevelRng;
use gridvault_world::{query, Entity, World};

/// Number of discrete actions on the 3x3 velocity lattice.
pub const NUM_ACTIONS: i32 = 9;

/// Sub-steps used to resolve contact in continuous movement.
const GLIDE_SUB_STEPS: u32 = 8;

/// Velocity for one discrete action.
///
/// Actions index the lattice column-first: `0..=2` move left, `3..=5` hold
/// horizontally, `6..=8` move right, with the remainder selecting up, hold,
/// or down. Action `4` is the stand-still action.
///
/// # Panics
///
/// Panics when the action is outside `0..NUM_ACTIONS`. Sentinel
/// substitution happens before movement resolves, so an out-of-range value
/// here is a caller contract violation.
#[must_use]
pub fn action_velocity(action: Action, max_speed: f32) -> Vec2 {
    let value = action.get();
    assert!(
        (0..NUM_ACTIONS).contains(&value),
        "action {value} outside the discrete action space"
    );
    let vx = (value / 3 - 1) as f32;
    let vy = (value % 3 - 1) as f32;
    Vec2::new(vx * max_speed, vy * max_speed)
}

/// How the resolver advances the agent each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveMode {
    /// The agent snaps between cell centers, one cell per axis per step,
    /// and only terrain blocks. Door entities must publish their closed
    /// state into the grid for this mode to respect them.
    GridStep,
    /// Entities glide continuously along each axis and stop at contact
    /// with blocking terrain or blocking entities.
    Continuous,
}

/// Mutable episode state handed to a game variant for one reset or step.
pub struct GameCtx<'a> {
    /// World being read and mutated.
    pub world: &'a mut World,
    /// Episode random stream.
    pub rng: &'a mut LevelRng,
    /// Per-step result accumulator.
    pub step_data: &'a mut StepData,
    /// Registry for publishing game-specific info channels.
    pub channels: &'a ChannelSet,
    /// Action being resolved, already sentinel-substituted.
    pub action: Action,
}

/// Behavior contract implemented by each game variant.
///
/// The episode lifecycle drives variants exclusively through this
/// interface: options and channels at setup, then [`GameVariant::reset`]
/// and [`GameVariant::step`] while episodes run.
pub trait GameVariant {
    /// Stable name the variant is selected by at setup.
    fn name(&self) -> &'static str;

    /// Registers the variant's options with their default values.
    fn register_options(&self, options: &mut Options);

    /// Validates and caches option values after overrides were applied.
    fn configure(&mut self, options: &Options) -> Result<(), SetupError>;

    /// Registers the variant's info channels.
    fn register_channels(&self, channels: &mut ChannelSet) -> Result<(), SetupError>;

    /// Interior grid dimension of the generated world.
    fn world_dim(&self) -> u32;

    /// Regenerates the world for a fresh episode.
    fn reset(&mut self, ctx: &mut GameCtx<'_>);

    /// Runs one simulation step.
    fn step(&mut self, ctx: &mut GameCtx<'_>);

    /// Top speed applied to the agent's action velocity.
    fn max_speed(&self) -> f32;

    /// Movement mode the resolver uses for this variant.
    fn move_mode(&self) -> MoveMode;

    /// Whether a terrain cell blocks movement.
    fn cell_blocks(&self, cell: ObjectKind) -> bool;

    /// Whether an entity blocks movement.
    fn entity_blocks(&self, entity: &Entity) -> bool;

    /// Whether an entity should appear in the rendered scene.
    fn entity_visible(&self, entity: &Entity) -> bool;
}

/// Collision handler fired when the agent overlaps an entity of the
/// matching kind.
pub type CollisionHandler<G> = for<'w> fn(&mut G, &mut GameCtx<'w>, EntityId);

/// Resolves one step of movement and collisions for a game variant.
///
/// The agent's velocity comes from the current action, movement follows
/// the variant's [`MoveMode`], and handlers fire once per overlapping
/// agent/entity pair in entity insertion order. Entities marked during
/// dispatch are swept before the function returns.
///
/// # Panics
///
/// Panics when the world has no agent or the action is outside the
/// discrete action space.
pub fn advance<G: GameVariant>(
    game: &mut G,
    ctx: &mut GameCtx<'_>,
    handlers: &[(ObjectKind, CollisionHandler<G>)],
) {
    let vel = action_velocity(ctx.action, game.max_speed());
    ctx.world.agent_mut().vel = vel;

    match game.move_mode() {
        MoveMode::GridStep => grid_step_agent(game, ctx.world),
        MoveMode::Continuous => glide_entities(game, ctx.world),
    }

    for id in query::overlapping_agent(ctx.world) {
        let Some(entity) = ctx.world.entity(id) else {
            continue;
        };
        if entity.will_erase {
            continue;
        }
        let kind = entity.kind;
        if let Some((_, handler)) = handlers.iter().find(|(handled, _)| *handled == kind) {
            handler(game, ctx, id);
        }
    }

    ctx.world.sweep_erased();
}

/// One-cell agent movement snapped to cell centers.
fn grid_step_agent<G: GameVariant>(game: &G, world: &mut World) {
    let agent = *world.agent();
    let mut pos = agent.pos;

    if agent.vel.x != 0.0 {
        let target_x = (pos.x + agent.vel.x).floor() as i32;
        let row = pos.y.floor() as i32;
        if !game.cell_blocks(world.grid().get(target_x, row)) {
            pos.x = target_x as f32 + 0.5;
        }
    }
    if agent.vel.y != 0.0 {
        let column = pos.x.floor() as i32;
        let target_y = (pos.y + agent.vel.y).floor() as i32;
        if !game.cell_blocks(world.grid().get(column, target_y)) {
            pos.y = target_y as f32 + 0.5;
        }
    }

    world.agent_mut().pos = pos;
}

/// Continuous axis-separated movement for every entity with velocity.
fn glide_entities<G: GameVariant>(game: &G, world: &mut World) {
    let ids: Vec<EntityId> = world.entities().map(|(id, _)| id).collect();
    for id in ids {
        let Some(snapshot) = world.entity(id).copied() else {
            continue;
        };
        if snapshot.vel == Vec2::ZERO || snapshot.will_erase {
            continue;
        }

        let mut pos = snapshot.pos;
        pos = glide_axis(game, world, id, pos, Vec2::new(snapshot.vel.x, 0.0), &snapshot);
        pos = glide_axis(game, world, id, pos, Vec2::new(0.0, snapshot.vel.y), &snapshot);
        if let Some(entity) = world.entity_mut(id) {
            entity.pos = pos;
        }
    }
}

/// Advances one axis in sub-steps, stopping at the first blocked position.
fn glide_axis<G: GameVariant>(
    game: &G,
    world: &World,
    mover: EntityId,
    start: Vec2,
    delta: Vec2,
    mover_shape: &Entity,
) -> Vec2 {
    if delta == Vec2::ZERO {
        return start;
    }
    let step = delta / GLIDE_SUB_STEPS as f32;
    let mut pos = start;
    for _ in 0..GLIDE_SUB_STEPS {
        let next = pos + step;
        if placement_blocked(game, world, mover, next, mover_shape.rx, mover_shape.ry) {
            break;
        }
        pos = next;
    }
    pos
}

/// Whether a box of the given half-extents centered at `pos` intersects
/// blocking terrain or a blocking entity other than the mover.
fn placement_blocked<G: GameVariant>(
    game: &G,
    world: &World,
    mover: EntityId,
    pos: Vec2,
    rx: f32,
    ry: f32,
) -> bool {
    let min = pos - Vec2::new(rx, ry);
    let max = pos + Vec2::new(rx, ry);

    let x0 = min.x.floor() as i32;
    let x1 = max.x.floor() as i32;
    let y0 = min.y.floor() as i32;
    let y1 = max.y.floor() as i32;
    for cy in y0..=y1 {
        for cx in x0..=x1 {
            if !cell_box_overlap(min, max, cx, cy) {
                continue;
            }
            if game.cell_blocks(world.grid().get(cx, cy)) {
                return true;
            }
        }
    }

    for (id, entity) in world.entities() {
        if id == mover || entity.will_erase || !game.entity_blocks(entity) {
            continue;
        }
        if (pos.x - entity.pos.x).abs() < rx + entity.rx
            && (pos.y - entity.pos.y).abs() < ry + entity.ry
        {
            return true;
        }
    }
    false
}

// Flush contact along an edge does not count as overlap.
fn cell_box_overlap(min: Vec2, max: Vec2, cx: i32, cy: i32) -> bool {
    max.x > cx as f32
        && min.x < (cx + 1) as f32
        && max.y > cy as f32
        && min.y < (cy + 1) as f32
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use gridvault_core::{
        channels::ChannelSet, options::Options, Action, EntityId, ObjectKind, SetupError, StepData,
    };
    use gridvault_system_levelgen::rng::LevelRng;
    use gridvault_world::{Entity, World};

    use super::{action_velocity, advance, CollisionHandler, GameCtx, GameVariant, MoveMode};

    struct StubGame {
        mode: MoveMode,
        touched: Vec<ObjectKind>,
    }

    impl StubGame {
        fn new(mode: MoveMode) -> Self {
            Self {
                mode,
                touched: Vec::new(),
            }
        }
    }

    impl GameVariant for StubGame {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn register_options(&self, _options: &mut Options) {}

        fn configure(&mut self, _options: &Options) -> Result<(), SetupError> {
            Ok(())
        }

        fn register_channels(&self, _channels: &mut ChannelSet) -> Result<(), SetupError> {
            Ok(())
        }

        fn world_dim(&self) -> u32 {
            5
        }

        fn reset(&mut self, _ctx: &mut GameCtx<'_>) {}

        fn step(&mut self, _ctx: &mut GameCtx<'_>) {}

        fn max_speed(&self) -> f32 {
            0.75
        }

        fn move_mode(&self) -> MoveMode {
            self.mode
        }

        fn cell_blocks(&self, cell: ObjectKind) -> bool {
            matches!(cell, ObjectKind::Wall | ObjectKind::LockedDoor)
        }

        fn entity_blocks(&self, entity: &Entity) -> bool {
            entity.kind == ObjectKind::LockedDoor
        }

        fn entity_visible(&self, _entity: &Entity) -> bool {
            true
        }
    }

    fn pickup(game: &mut StubGame, ctx: &mut GameCtx<'_>, id: EntityId) {
        game.touched.push(ObjectKind::Key);
        if let Some(entity) = ctx.world.entity_mut(id) {
            entity.will_erase = true;
        }
        ctx.step_data.reward += 1.0;
    }

    fn hazard(game: &mut StubGame, ctx: &mut GameCtx<'_>, _id: EntityId) {
        game.touched.push(ObjectKind::Water);
        ctx.step_data.reward -= 2.0;
    }

    const HANDLERS: &[(ObjectKind, CollisionHandler<StubGame>)] = &[
        (ObjectKind::Key, pickup),
        (ObjectKind::Water, hazard),
    ];

    fn open_world(dim: u32) -> World {
        let mut world = World::new(dim, dim);
        world.grid_mut().fill(ObjectKind::Space);
        world
    }

    fn run_step(game: &mut StubGame, world: &mut World, action: i32) -> StepData {
        let mut rng = LevelRng::from_seed(7);
        let mut step_data = StepData::default();
        let channels = ChannelSet::new();
        let mut ctx = GameCtx {
            world,
            rng: &mut rng,
            step_data: &mut step_data,
            channels: &channels,
            action: Action::new(action),
        };
        advance(game, &mut ctx, HANDLERS);
        step_data
    }

    #[test]
    fn velocity_lattice_covers_all_directions() {
        let speed = 0.75;
        assert_eq!(action_velocity(Action::new(4), speed), Vec2::ZERO);
        assert_eq!(
            action_velocity(Action::new(0), speed),
            Vec2::new(-speed, -speed)
        );
        assert_eq!(action_velocity(Action::new(7), speed), Vec2::new(speed, 0.0));
        assert_eq!(action_velocity(Action::new(5), speed), Vec2::new(0.0, speed));
        assert_eq!(
            action_velocity(Action::new(8), speed),
            Vec2::new(speed, speed)
        );
    }

    #[test]
    #[should_panic(expected = "outside the discrete action space")]
    fn out_of_range_actions_panic() {
        let _ = action_velocity(Action::new(9), 0.75);
    }

    #[test]
    #[should_panic(expected = "outside the discrete action space")]
    fn unsubstituted_sentinel_actions_panic() {
        let _ = action_velocity(Action::RESET, 0.75);
    }

    #[test]
    fn grid_step_moves_one_cell_and_snaps_to_center() {
        let mut game = StubGame::new(MoveMode::GridStep);
        let mut world = open_world(5);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));

        let _ = run_step(&mut game, &mut world, 7);
        assert_eq!(world.agent().pos, Vec2::new(2.5, 1.5));

        let _ = run_step(&mut game, &mut world, 3);
        assert_eq!(world.agent().pos, Vec2::new(2.5, 0.5));
    }

    #[test]
    fn grid_step_refuses_blocked_cells() {
        let mut game = StubGame::new(MoveMode::GridStep);
        let mut world = open_world(5);
        world.grid_mut().set(2, 1, ObjectKind::Wall);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));

        let _ = run_step(&mut game, &mut world, 7);
        assert_eq!(world.agent().pos, Vec2::new(1.5, 1.5));
    }

    #[test]
    fn grid_step_stops_at_the_world_border() {
        let mut game = StubGame::new(MoveMode::GridStep);
        let mut world = open_world(3);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(0.5, 0.5),
            0.375,
        ));

        let _ = run_step(&mut game, &mut world, 1);
        assert_eq!(world.agent().pos, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn grid_step_consults_terrain_only() {
        let mut game = StubGame::new(MoveMode::GridStep);
        let mut world = open_world(5);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));
        // Door entity without a matching grid cell: grid-step walks through.
        let _ = world.spawn(Entity::new(ObjectKind::LockedDoor, Vec2::new(2.5, 1.5), 0.5));

        let _ = run_step(&mut game, &mut world, 7);
        assert_eq!(world.agent().pos, Vec2::new(2.5, 1.5));
    }

    #[test]
    fn glide_stops_short_of_walls() {
        let mut game = StubGame::new(MoveMode::Continuous);
        let mut world = open_world(5);
        world.grid_mut().set(2, 1, ObjectKind::Wall);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));

        let _ = run_step(&mut game, &mut world, 7);
        let pos = world.agent().pos;
        assert!(pos.x > 1.5, "agent should glide toward the wall");
        assert!(pos.x + 0.375 <= 2.0, "agent must not enter the wall cell");
        assert_eq!(pos.y, 1.5);
    }

    #[test]
    fn glide_respects_blocking_entities() {
        let mut game = StubGame::new(MoveMode::Continuous);
        let mut world = open_world(5);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));
        let _ = world.spawn(Entity::new(ObjectKind::LockedDoor, Vec2::new(2.5, 1.5), 0.5));

        let _ = run_step(&mut game, &mut world, 7);
        let pos = world.agent().pos;
        assert!(pos.x + 0.375 <= 2.0, "closed door must stop the glide");
    }

    #[test]
    fn handlers_fire_in_insertion_order_and_erased_entities_are_swept() {
        let mut game = StubGame::new(MoveMode::GridStep);
        let mut world = open_world(5);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));
        let key = world.spawn(Entity::new(ObjectKind::Key, Vec2::new(1.5, 1.5), 0.375));
        let puddle = world.spawn(Entity::new(ObjectKind::Water, Vec2::new(1.5, 1.5), 0.5));

        let step_data = run_step(&mut game, &mut world, 4);
        assert_eq!(game.touched, vec![ObjectKind::Key, ObjectKind::Water]);
        assert!((step_data.reward - (1.0 - 2.0)).abs() < f32::EPSILON);
        assert!(world.entity(key).is_none());
        assert!(world.entity(puddle).is_some());
    }

    #[test]
    fn unhandled_kinds_are_ignored() {
        let mut game = StubGame::new(MoveMode::GridStep);
        let mut world = open_world(5);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));
        let exit = world.spawn(Entity::new(ObjectKind::Exit, Vec2::new(1.5, 1.5), 0.375));

        let step_data = run_step(&mut game, &mut world, 4);
        assert!(game.touched.is_empty());
        assert_eq!(step_data.reward, 0.0);
        assert!(world.entity(exit).is_some());
    }

    #[test]
    fn handlers_fire_once_per_pair_per_step() {
        let mut game = StubGame::new(MoveMode::GridStep);
        let mut world = open_world(5);
        let _ = world.spawn_agent(Entity::new(
            ObjectKind::Player,
            Vec2::new(1.5, 1.5),
            0.375,
        ));
        let _ = world.spawn(Entity::new(ObjectKind::Water, Vec2::new(1.5, 1.5), 0.5));

        let first = run_step(&mut game, &mut world, 4);
        let second = run_step(&mut game, &mut world, 4);
        assert_eq!(game.touched, vec![ObjectKind::Water, ObjectKind::Water]);
        assert!((first.reward - -2.0).abs() < f32::EPSILON);
        assert!((second.reward - -2.0).abs() < f32::EPSILON);
    }
}
