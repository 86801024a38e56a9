//! Randomized maze carving with themed key and door placement.
//!
//! The carve pass builds a perfect maze over rooms at even coordinates, so
//! every open cell is reachable from every other through exactly one route.
//! Doors are then dropped onto the start-to-exit path and each matching key
//! into the region in front of its door, which keeps every level solvable.

use std::collections::VecDeque;

use gridvault_core::Theme;

use crate::rng::LevelRng;

/// Cell marker produced by the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MazeCell {
    /// Solid cell.
    Wall,
    /// Walkable cell.
    Space,
    /// Agent start cell.
    Start,
    /// Level exit cell.
    Exit,
    /// Pickup that opens the door of the same theme.
    Key(Theme),
    /// Locked door cell.
    Door(Theme),
}

impl MazeCell {
    /// Whether the cell is walkable once its gate, if any, is open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Bordered square grid of maze cell markers.
///
/// The interior spans `[0, dim)` on both axes. Reads stay valid one cell
/// past the interior on every side and resolve to [`MazeCell::Wall`] there
/// and beyond, so neighbor scans never need bounds branches.
pub struct MazeGrid {
    dim: u32,
    cells: Vec<MazeCell>,
}

impl MazeGrid {
    fn new(dim: u32) -> Self {
        let side = (dim + 2) as usize;
        Self {
            dim,
            cells: vec![MazeCell::Wall; side * side],
        }
    }

    /// Interior dimension per axis.
    #[must_use]
    pub const fn dim(&self) -> u32 {
        self.dim
    }

    /// Reads a cell; anything outside the bordered storage is wall.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> MazeCell {
        match self.index(x, y) {
            Some(idx) => self.cells[idx],
            None => MazeCell::Wall,
        }
    }

    fn set(&mut self, x: i32, y: i32, cell: MazeCell) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = cell;
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let dim = self.dim as i32;
        if x < -1 || y < -1 || x > dim || y > dim {
            return None;
        }
        let side = (self.dim + 2) as usize;
        Some((y + 1) as usize * side + (x + 1) as usize)
    }

    /// Iterates the interior row by row.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, MazeCell)> + '_ {
        let dim = self.dim as i32;
        (0..dim).flat_map(move |y| (0..dim).map(move |x| (x, y, self.get(x, y))))
    }
}

/// Carves a maze and places the start, exit, keys, and doors.
///
/// Doors sit on the start-to-exit path with at least one free cell between
/// them. The key for door `t` only ever lands where the route back to the
/// start crosses exactly the doors before `t`, so collecting keys in theme
/// order opens every door. Keys beyond the door count favor cells off the
/// start-to-exit path. When the path is too short to fit every requested
/// door, the surplus doors are skipped and their keys placed as spares.
///
/// # Panics
///
/// Panics when `dim` is even or below 3, or when the counts break
/// `num_doors <= num_keys <= 3`.
#[must_use]
pub fn generate(rng: &mut LevelRng, dim: u32, num_keys: u32, num_doors: u32) -> MazeGrid {
    assert!(
        dim >= 3 && dim % 2 == 1,
        "maze dimension must be odd and at least 3"
    );
    assert!(
        num_doors <= num_keys && num_keys <= 3,
        "key and door counts must satisfy doors <= keys <= 3"
    );

    let mut grid = MazeGrid::new(dim);
    carve_rooms(rng, &mut grid);

    let open: Vec<(i32, i32)> = grid
        .iter()
        .filter(|&(_, _, cell)| cell.is_open())
        .map(|(x, y, _)| (x, y))
        .collect();
    let start = open[rng.uniform_int(open.len() as u32) as usize];

    let (dist, parent) = distances_from(&grid, start);
    let exit = farthest_cell(dim, &dist);
    let path = path_to(dim, &parent, start, exit);

    let placed_doors = place_doors(rng, &mut grid, &path, num_doors);
    place_matched_keys(rng, &mut grid, &parent, start, exit, placed_doors);
    place_spare_keys(rng, &mut grid, &path, start, exit, placed_doors..num_keys);

    grid.set(start.0, start.1, MazeCell::Start);
    grid.set(exit.0, exit.1, MazeCell::Exit);
    grid
}

fn linear(dim: u32, x: i32, y: i32) -> usize {
    y as usize * dim as usize + x as usize
}

/// Depth-first carving over the rooms at even coordinates.
fn carve_rooms(rng: &mut LevelRng, grid: &mut MazeGrid) {
    let rooms = ((grid.dim + 1) / 2) as i32;
    let mut visited = vec![false; (rooms * rooms) as usize];
    let mut stack = vec![(0i32, 0i32)];
    visited[0] = true;
    grid.set(0, 0, MazeCell::Space);

    while let Some(&(rx, ry)) = stack.last() {
        let mut frontier = Vec::with_capacity(4);
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let (nx, ny) = (rx + dx, ry + dy);
            if (0..rooms).contains(&nx)
                && (0..rooms).contains(&ny)
                && !visited[(ny * rooms + nx) as usize]
            {
                frontier.push((nx, ny));
            }
        }
        if frontier.is_empty() {
            let _ = stack.pop();
            continue;
        }
        let (nx, ny) = frontier[rng.uniform_int(frontier.len() as u32) as usize];
        visited[(ny * rooms + nx) as usize] = true;
        grid.set(rx + nx, ry + ny, MazeCell::Space);
        grid.set(nx * 2, ny * 2, MazeCell::Space);
        stack.push((nx, ny));
    }
}

/// Breadth-first distances and predecessors over open cells.
///
/// Unreached cells keep distance and predecessor -1.
fn distances_from(grid: &MazeGrid, start: (i32, i32)) -> (Vec<i32>, Vec<i32>) {
    let dim = grid.dim;
    let cells = dim as usize * dim as usize;
    let mut dist = vec![-1i32; cells];
    let mut parent = vec![-1i32; cells];
    let mut queue = VecDeque::new();
    dist[linear(dim, start.0, start.1)] = 0;
    queue.push_back(start);

    while let Some((x, y)) = queue.pop_front() {
        let here = linear(dim, x, y);
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let (nx, ny) = (x + dx, y + dy);
            if !grid.get(nx, ny).is_open() {
                continue;
            }
            let next = linear(dim, nx, ny);
            if dist[next] >= 0 {
                continue;
            }
            dist[next] = dist[here] + 1;
            parent[next] = here as i32;
            queue.push_back((nx, ny));
        }
    }
    (dist, parent)
}

/// Cell with maximal distance from the start, first in row order on ties.
fn farthest_cell(dim: u32, dist: &[i32]) -> (i32, i32) {
    let side = dim as i32;
    let mut best = (0, 0);
    let mut best_dist = -1;
    for y in 0..side {
        for x in 0..side {
            let d = dist[linear(dim, x, y)];
            if d > best_dist {
                best_dist = d;
                best = (x, y);
            }
        }
    }
    best
}

/// Start-to-exit cells recovered from the predecessor chain.
fn path_to(dim: u32, parent: &[i32], start: (i32, i32), exit: (i32, i32)) -> Vec<(i32, i32)> {
    let side = dim as i32;
    let start_idx = linear(dim, start.0, start.1);
    let mut here = linear(dim, exit.0, exit.1);
    let mut path = vec![exit];
    while here != start_idx {
        here = parent[here] as usize;
        path.push((here as i32 % side, here as i32 / side));
    }
    path.reverse();
    path
}

/// Drops up to `num_doors` doors onto interior path cells.
///
/// Each pick window leaves two cells after the previous door and enough
/// room for the doors still to come, so windows are never empty. Returns
/// the number of doors actually placed.
fn place_doors(
    rng: &mut LevelRng,
    grid: &mut MazeGrid,
    path: &[(i32, i32)],
    num_doors: u32,
) -> u32 {
    let len = path.len();
    let max_fit = if len >= 4 {
        num_doors.min(((len - 2) / 2) as u32)
    } else {
        0
    };

    let mut prev = 0usize;
    for t in 0..max_fit {
        let lo = prev + 2;
        let hi = len - 2 - 2 * (max_fit - 1 - t) as usize;
        let pick = lo + rng.uniform_int((hi - lo + 1) as u32) as usize;
        let (x, y) = path[pick];
        grid.set(x, y, MazeCell::Door(Theme::new(t as u8)));
        prev = pick;
    }
    max_fit
}

/// Places the key for each placed door in the region in front of it.
///
/// The cell right before door `t` on the path always qualifies for key `t`,
/// so the candidate pool is never empty.
fn place_matched_keys(
    rng: &mut LevelRng,
    grid: &mut MazeGrid,
    parent: &[i32],
    start: (i32, i32),
    exit: (i32, i32),
    placed_doors: u32,
) {
    for t in 0..placed_doors {
        let candidates: Vec<(i32, i32)> = grid
            .iter()
            .filter(|&(x, y, cell)| {
                cell == MazeCell::Space
                    && (x, y) != start
                    && (x, y) != exit
                    && doors_crossed(grid, parent, start, (x, y)) == t
            })
            .map(|(x, y, _)| (x, y))
            .collect();
        let (x, y) = candidates[rng.uniform_int(candidates.len() as u32) as usize];
        grid.set(x, y, MazeCell::Key(Theme::new(t as u8)));
    }
}

/// Places keys with no matching door, favoring cells off the exit path.
fn place_spare_keys(
    rng: &mut LevelRng,
    grid: &mut MazeGrid,
    path: &[(i32, i32)],
    start: (i32, i32),
    exit: (i32, i32),
    themes: std::ops::Range<u32>,
) {
    let dim = grid.dim;
    let mut on_path = vec![false; dim as usize * dim as usize];
    for &(x, y) in path {
        on_path[linear(dim, x, y)] = true;
    }

    for t in themes {
        let free: Vec<(i32, i32)> = grid
            .iter()
            .filter(|&(x, y, cell)| cell == MazeCell::Space && (x, y) != start && (x, y) != exit)
            .map(|(x, y, _)| (x, y))
            .collect();
        let off_path: Vec<(i32, i32)> = free
            .iter()
            .copied()
            .filter(|&(x, y)| !on_path[linear(dim, x, y)])
            .collect();
        let pool = if off_path.is_empty() { &free } else { &off_path };
        if pool.is_empty() {
            break;
        }
        let (x, y) = pool[rng.uniform_int(pool.len() as u32) as usize];
        grid.set(x, y, MazeCell::Key(Theme::new(t as u8)));
    }
}

/// Doors on the predecessor chain between a cell and the start.
fn doors_crossed(grid: &MazeGrid, parent: &[i32], start: (i32, i32), cell: (i32, i32)) -> u32 {
    let dim = grid.dim;
    let side = dim as i32;
    let start_idx = linear(dim, start.0, start.1);
    let mut here = linear(dim, cell.0, cell.1);
    let mut crossed = 0;
    while here != start_idx {
        let (x, y) = (here as i32 % side, here as i32 / side);
        if matches!(grid.get(x, y), MazeCell::Door(_)) {
            crossed += 1;
        }
        here = parent[here] as usize;
    }
    crossed
}
