#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for gridvault episodes.
//!
//! The world owns two things: a fixed-size grid of terrain codes and an
//! insertion-ordered arena of entities addressed by stable identifiers. The
//! grid stores static and semi-static terrain only; entity occupancy is
//! always derived from continuous positions at query time. The one
//! documented exception is the locked-door marker, which door entities may
//! publish into the grid so movement checks can treat a closed door as
//! terrain.

use glam::Vec2;

use gridvault_core::{EntityId, ObjectKind, Theme};

/// Fixed-size rectangular grid of terrain codes.
///
/// Reads outside the grid return the configured out-of-bounds kind and
/// writes outside the grid are ignored, so callers never need their own
/// bounds checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<ObjectKind>,
    out_of_bounds: ObjectKind,
}

impl Grid {
    /// Creates a grid filled with one kind.
    #[must_use]
    pub fn new(width: u32, height: u32, fill: ObjectKind, out_of_bounds: ObjectKind) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width as usize * height as usize],
            out_of_bounds,
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reads the cell at the provided coordinates.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> ObjectKind {
        match self.index(x, y) {
            Some(index) => self.cells[index],
            None => self.out_of_bounds,
        }
    }

    /// Writes the cell at the provided coordinates, ignoring out-of-bounds.
    pub fn set(&mut self, x: i32, y: i32, kind: ObjectKind) {
        if let Some(index) = self.index(x, y) {
            self.cells[index] = kind;
        }
    }

    /// Overwrites every cell with one kind.
    pub fn fill(&mut self, kind: ObjectKind) {
        self.cells.fill(kind);
    }

    /// Row-major iterator over all cells.
    pub fn iter(&self) -> impl Iterator<Item = ObjectKind> + '_ {
        self.cells.iter().copied()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32 {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }
}

/// A typed, positioned, sized game object owned by the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entity {
    /// Semantic kind of the entity.
    pub kind: ObjectKind,
    /// Continuous center position in cell units.
    pub pos: Vec2,
    /// Velocity applied by the movement resolver.
    pub vel: Vec2,
    /// Horizontal half-extent of the collision box.
    pub rx: f32,
    /// Vertical half-extent of the collision box.
    pub ry: f32,
    /// Theme index matching keys to their doors.
    pub theme: Theme,
    /// Marks the entity for removal at the end of the current step.
    pub will_erase: bool,
    /// Draw-order hint; higher values draw later.
    pub render_z: i32,
    /// Positions the entity in screen fractions instead of cell units.
    pub screen_anchored: bool,
}

impl Entity {
    /// Creates a stationary square entity centered at `pos`.
    #[must_use]
    pub fn new(kind: ObjectKind, pos: Vec2, half_extent: f32) -> Self {
        Self {
            kind,
            pos,
            vel: Vec2::ZERO,
            rx: half_extent,
            ry: half_extent,
            theme: Theme::default(),
            will_erase: false,
            render_z: 0,
            screen_anchored: false,
        }
    }

    /// Reports whether the collision boxes of two entities overlap.
    ///
    /// Boxes that merely touch along an edge do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Entity) -> bool {
        (self.pos.x - other.pos.x).abs() < self.rx + other.rx
            && (self.pos.y - other.pos.y).abs() < self.ry + other.ry
    }

    /// Grid cell containing the entity's center.
    #[must_use]
    pub fn cell(&self) -> (i32, i32) {
        (self.pos.x.floor() as i32, self.pos.y.floor() as i32)
    }
}

#[derive(Clone, Debug)]
struct EntityRecord {
    id: EntityId,
    entity: Entity,
}

/// Authoritative grid plus entity arena for one environment instance.
///
/// Entity identifiers come from a monotonically increasing counter and are
/// never reused, including across episode resets. Erasure is a two-phase
/// protocol: handlers mark entities during a step, and the arena compacts
/// only when [`World::sweep_erased`] runs at the step boundary, so no handle
/// dangles mid-iteration.
#[derive(Clone, Debug)]
pub struct World {
    grid: Grid,
    entities: Vec<EntityRecord>,
    next_id: u32,
    agent: Option<EntityId>,
}

impl World {
    /// Creates an empty world with a wall-filled grid.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            grid: Grid::new(width, height, ObjectKind::Wall, ObjectKind::Wall),
            entities: Vec::new(),
            next_id: 0,
            agent: None,
        }
    }

    /// Clears all entities and refills the grid for a fresh episode.
    ///
    /// The identifier counter keeps counting so handles from the previous
    /// episode can never resolve to new entities.
    pub fn reset(&mut self) {
        self.grid.fill(ObjectKind::Wall);
        self.entities.clear();
        self.agent = None;
    }

    /// Read-only access to the terrain grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable access to the terrain grid.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Adds an entity and returns its stable identifier.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.entities.push(EntityRecord { id, entity });
        id
    }

    /// Adds the distinguished agent entity.
    pub fn spawn_agent(&mut self, entity: Entity) -> EntityId {
        let id = self.spawn(entity);
        self.agent = Some(id);
        id
    }

    /// Identifier of the agent entity.
    ///
    /// # Panics
    ///
    /// Panics if no agent was spawned; population always spawns the agent
    /// before any query runs.
    #[must_use]
    pub fn agent_id(&self) -> EntityId {
        match self.agent {
            Some(id) => id,
            None => panic!("world has no agent; population must spawn it first"),
        }
    }

    /// Read-only access to the agent entity.
    ///
    /// # Panics
    ///
    /// Panics under the same contract as [`World::agent_id`].
    #[must_use]
    pub fn agent(&self) -> &Entity {
        let id = self.agent_id();
        match self.entity(id) {
            Some(entity) => entity,
            None => panic!("agent entity missing from the arena"),
        }
    }

    /// Mutable access to the agent entity.
    ///
    /// # Panics
    ///
    /// Panics under the same contract as [`World::agent_id`].
    pub fn agent_mut(&mut self) -> &mut Entity {
        let id = self.agent_id();
        match self.entity_mut(id) {
            Some(entity) => entity,
            None => panic!("agent entity missing from the arena"),
        }
    }

    /// Resolves an identifier to its entity, if still live.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|record| record.id == id)
            .map(|record| &record.entity)
    }

    /// Resolves an identifier to its entity mutably, if still live.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .find(|record| record.id == id)
            .map(|record| &mut record.entity)
    }

    /// Iterates over all live entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .map(|record| (record.id, &record.entity))
    }

    /// Number of live entities, the agent included.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Removes every entity marked for erasure, preserving order.
    pub fn sweep_erased(&mut self) {
        self.entities.retain(|record| !record.entity.will_erase);
    }
}

/// Query functions that provide read-only derived views of the world.
pub mod query {
    use super::World;
    use gridvault_core::EntityId;

    /// Identifiers of live non-agent entities whose boxes overlap the agent,
    /// in insertion order.
    #[must_use]
    pub fn overlapping_agent(world: &World) -> Vec<EntityId> {
        let agent_id = world.agent_id();
        let agent = *world.agent();
        world
            .entities()
            .filter(|(id, entity)| {
                *id != agent_id && !entity.will_erase && agent.overlaps(entity)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Grid cell containing the agent's center.
    #[must_use]
    pub fn agent_cell(world: &World) -> (i32, i32) {
        world.agent().cell()
    }
}

#[cfg(test)]
mod tests {
    use super::{query, Entity, Grid, World};
    use glam::Vec2;
    use gridvault_core::ObjectKind;

    fn entity_at(kind: ObjectKind, x: f32, y: f32) -> Entity {
        Entity::new(kind, Vec2::new(x, y), 0.5)
    }

    #[test]
    fn grid_reads_outside_bounds_return_the_default() {
        let grid = Grid::new(3, 3, ObjectKind::Space, ObjectKind::Wall);
        assert_eq!(grid.get(-1, 0), ObjectKind::Wall);
        assert_eq!(grid.get(0, -1), ObjectKind::Wall);
        assert_eq!(grid.get(3, 0), ObjectKind::Wall);
        assert_eq!(grid.get(0, 3), ObjectKind::Wall);
        assert_eq!(grid.get(1, 1), ObjectKind::Space);
    }

    #[test]
    fn grid_writes_outside_bounds_are_ignored() {
        let mut grid = Grid::new(2, 2, ObjectKind::Space, ObjectKind::Wall);
        grid.set(-1, 0, ObjectKind::Fire);
        grid.set(2, 2, ObjectKind::Fire);
        assert!(grid.iter().all(|kind| kind == ObjectKind::Space));

        grid.set(1, 0, ObjectKind::LockedDoor);
        assert_eq!(grid.get(1, 0), ObjectKind::LockedDoor);
    }

    #[test]
    fn spawn_assigns_increasing_ids_in_insertion_order() {
        let mut world = World::new(4, 4);
        let first = world.spawn_agent(entity_at(ObjectKind::Player, 0.5, 0.5));
        let second = world.spawn(entity_at(ObjectKind::Key, 1.5, 0.5));
        let third = world.spawn(entity_at(ObjectKind::Exit, 2.5, 0.5));
        assert!(first < second && second < third);

        let order: Vec<ObjectKind> = world.entities().map(|(_, entity)| entity.kind).collect();
        assert_eq!(
            order,
            vec![ObjectKind::Player, ObjectKind::Key, ObjectKind::Exit]
        );
    }

    #[test]
    fn sweep_removes_marked_entities_and_keeps_handles_stable() {
        let mut world = World::new(4, 4);
        let _ = world.spawn_agent(entity_at(ObjectKind::Player, 0.5, 0.5));
        let key = world.spawn(entity_at(ObjectKind::Key, 1.5, 0.5));
        let exit = world.spawn(entity_at(ObjectKind::Exit, 2.5, 0.5));

        world.entity_mut(key).expect("live key").will_erase = true;
        world.sweep_erased();

        assert!(world.entity(key).is_none());
        assert_eq!(world.entity(exit).map(|entity| entity.kind), Some(ObjectKind::Exit));
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn reset_clears_entities_but_never_reuses_ids() {
        let mut world = World::new(4, 4);
        let before = world.spawn_agent(entity_at(ObjectKind::Player, 0.5, 0.5));
        world.reset();
        assert_eq!(world.entity_count(), 0);

        let after = world.spawn_agent(entity_at(ObjectKind::Player, 1.5, 1.5));
        assert!(after > before);
        assert!(world.entity(before).is_none());
    }

    #[test]
    fn overlap_is_strict_at_touching_edges() {
        let left = entity_at(ObjectKind::Player, 0.5, 0.5);
        let touching = entity_at(ObjectKind::Key, 1.5, 0.5);
        let overlapping = entity_at(ObjectKind::Key, 1.4, 0.5);
        assert!(!left.overlaps(&touching));
        assert!(left.overlaps(&overlapping));
        assert!(overlapping.overlaps(&left));
    }

    #[test]
    fn entity_cell_floors_continuous_positions() {
        assert_eq!(entity_at(ObjectKind::Player, 0.5, 0.5).cell(), (0, 0));
        assert_eq!(entity_at(ObjectKind::Player, 2.9, 1.1).cell(), (2, 1));
    }

    #[test]
    fn overlapping_agent_skips_agent_and_erased_entities() {
        let mut world = World::new(4, 4);
        let _ = world.spawn_agent(entity_at(ObjectKind::Player, 1.5, 1.5));
        let near = world.spawn(entity_at(ObjectKind::Key, 1.7, 1.5));
        let far = world.spawn(entity_at(ObjectKind::Exit, 3.5, 3.5));
        let erased = world.spawn(entity_at(ObjectKind::Water, 1.4, 1.5));
        world.entity_mut(erased).expect("live water").will_erase = true;

        let overlapping = query::overlapping_agent(&world);
        assert_eq!(overlapping, vec![near]);
        assert!(!overlapping.contains(&far));
    }

    #[test]
    fn agent_accessors_resolve_the_distinguished_entity() {
        let mut world = World::new(4, 4);
        let id = world.spawn_agent(entity_at(ObjectKind::Player, 1.5, 1.5));
        assert_eq!(world.agent_id(), id);
        assert_eq!(world.agent().kind, ObjectKind::Player);
        assert_eq!(query::agent_cell(&world), (1, 1));

        world.agent_mut().pos = Vec2::new(2.5, 0.5);
        assert_eq!(query::agent_cell(&world), (2, 0));
    }

    #[test]
    #[should_panic(expected = "world has no agent")]
    fn agent_access_without_population_panics() {
        let world = World::new(2, 2);
        let _ = world.agent();
    }
}
