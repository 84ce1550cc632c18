//! Coral maze generation and spatial queries
//!
//! The maze is a boolean wall grid built once per level by recursive division.
//! Wall lines always sit on even cell coordinates and openings on odd ones, so
//! a later wall can never seal an earlier opening: every open cell of a fresh
//! maze is reachable from every other.
//!
//! [`MazeGrid::is_wall`] is the only navigability question the rest of the
//! simulation asks.

use std::cmp::Ordering;
use std::collections::VecDeque;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Decorative sway of a single coral cell. Never affects navigability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoralSway {
    pub phase: f32,
    pub speed: f32,
    pub amplitude: f32,
}

/// A rectangle of open cells bounded by walls on all four sides
#[derive(Debug, Clone, Copy)]
struct Chamber {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

/// Wall grid for one level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMaze")]
pub struct MazeGrid {
    width: usize,
    height: usize,
    /// Row-major, `true` = coral
    cells: Vec<bool>,
    /// Row-major, only meaningful on coral cells
    #[serde(skip)]
    coral: Vec<CoralSway>,
}

/// Serialized form of a [`MazeGrid`], checked before use
#[derive(Deserialize)]
struct RawMaze {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl TryFrom<RawMaze> for MazeGrid {
    type Error = String;

    fn try_from(raw: RawMaze) -> Result<Self, Self::Error> {
        let expected = raw.width.checked_mul(raw.height).ok_or("maze dimensions overflow")?;
        if raw.cells.len() != expected {
            return Err(format!(
                "maze {}x{} needs {} cells, got {}",
                raw.width,
                raw.height,
                expected,
                raw.cells.len()
            ));
        }
        Ok(Self {
            width: raw.width,
            height: raw.height,
            cells: raw.cells,
            // Sway is cosmetic and not stored; a loaded maze starts still
            coral: vec![CoralSway::default(); expected],
        })
    }
}

impl MazeGrid {
    /// Generate a new maze.
    ///
    /// Dimensions below 4 cells on either axis produce a bordered empty room.
    pub fn generate(width: usize, height: usize, rng: &mut Pcg32) -> Self {
        let mut maze = Self::divided(width, height, rng);
        if width >= MIN_DIVISIBLE_SPAN && height >= MIN_DIVISIBLE_SPAN {
            maze.inject_openings(rng);
        }
        maze.seed_coral(rng);
        maze
    }

    /// Bordered room subdivided by recursive division, before opening injection
    fn divided(width: usize, height: usize, rng: &mut Pcg32) -> Self {
        let mut maze = Self::bordered_room(width, height);
        if width >= MIN_DIVISIBLE_SPAN && height >= MIN_DIVISIBLE_SPAN {
            maze.divide(
                Chamber {
                    x: 1,
                    y: 1,
                    w: width - 2,
                    h: height - 2,
                },
                rng,
            );
        }
        maze
    }

    /// Open room with a sealed outer ring
    fn bordered_room(width: usize, height: usize) -> Self {
        let mut cells = vec![false; width * height];
        for row in 0..height {
            for col in 0..width {
                if row == 0 || col == 0 || row == height - 1 || col == width - 1 {
                    cells[row * width + col] = true;
                }
            }
        }
        Self {
            width,
            height,
            cells,
            coral: vec![CoralSway::default(); width * height],
        }
    }

    /// Build a grid from text rows (`#` = coral, anything else = open).
    ///
    /// Short rows are padded with coral. No border is added.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut cells = vec![true; width * height];
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                cells[row * width + col] = ch == '#';
            }
        }
        Self {
            width,
            height,
            cells,
            coral: vec![CoralSway::default(); width * height],
        }
    }

    fn divide(&mut self, chamber: Chamber, rng: &mut Pcg32) {
        if chamber.w < MIN_DIVISIBLE_SPAN || chamber.h < MIN_DIVISIBLE_SPAN {
            return;
        }

        // Cut across the longer side so chambers stay roughly square
        let split_width = match chamber.w.cmp(&chamber.h) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => rng.random_bool(0.5),
        };

        if split_width {
            let wall_x = chamber.x + wall_offset(chamber.w, rng);
            let door_y = chamber.y + door_offset(chamber.h, rng);
            for y in chamber.y..chamber.y + chamber.h {
                if y != door_y {
                    self.set_wall(wall_x, y);
                }
            }

            self.divide(
                Chamber {
                    w: wall_x - chamber.x,
                    ..chamber
                },
                rng,
            );
            self.divide(
                Chamber {
                    x: wall_x + 1,
                    w: chamber.x + chamber.w - wall_x - 1,
                    ..chamber
                },
                rng,
            );
        } else {
            let wall_y = chamber.y + wall_offset(chamber.h, rng);
            let door_x = chamber.x + door_offset(chamber.w, rng);
            for x in chamber.x..chamber.x + chamber.w {
                if x != door_x {
                    self.set_wall(x, wall_y);
                }
            }

            self.divide(
                Chamber {
                    h: wall_y - chamber.y,
                    ..chamber
                },
                rng,
            );
            self.divide(
                Chamber {
                    y: wall_y + 1,
                    h: chamber.y + chamber.h - wall_y - 1,
                    ..chamber
                },
                rng,
            );
        }
    }

    /// Clear a bounded number of random coral cells that sit between two
    /// open cells, adding loops on top of the division tree.
    ///
    /// Every attempt draws from the bridging walls, so each one gets a real
    /// chance to open a cell.
    fn inject_openings(&mut self, rng: &mut Pcg32) {
        let attempts = (self.width * self.height) / OPENING_DENSITY;
        let mut candidates: Vec<(usize, usize)> = (1..self.height - 1)
            .flat_map(|row| (1..self.width - 1).map(move |col| (col, row)))
            .filter(|&(col, row)| self.cells[row * self.width + col] && self.bridges_open_cells(col, row))
            .collect();

        let mut opened = 0;
        for _ in 0..attempts {
            if candidates.is_empty() {
                break;
            }
            let pick = rng.random_range(0..candidates.len());
            if rng.random_bool(OPENING_CHANCE) {
                let (col, row) = candidates.swap_remove(pick);
                self.cells[row * self.width + col] = false;
                opened += 1;
            }
        }
        log::debug!("Injected {} openings in {} attempts", opened, attempts);
    }

    /// True if the cell has open neighbors on two opposite sides
    fn bridges_open_cells(&self, col: usize, row: usize) -> bool {
        let (c, r) = (col as i32, row as i32);
        let open = |dc: i32, dr: i32| !self.is_wall_cell(c + dc, r + dr);
        (open(-1, 0) && open(1, 0)) || (open(0, -1) && open(0, 1))
    }

    fn seed_coral(&mut self, rng: &mut Pcg32) {
        for (i, wall) in self.cells.iter().enumerate() {
            if *wall {
                self.coral[i] = CoralSway {
                    phase: rng.random_range(0.0..std::f32::consts::TAU),
                    speed: rng.random_range(0.02..0.05),
                    amplitude: rng.random_range(2.0..5.0),
                };
            }
        }
    }

    fn set_wall(&mut self, col: usize, row: usize) {
        self.cells[row * self.width + col] = true;
    }

    /// Advance decorative coral sway by one tick
    pub fn animate(&mut self) {
        for (sway, wall) in self.coral.iter_mut().zip(&self.cells) {
            if *wall {
                sway.phase = (sway.phase + sway.speed) % std::f32::consts::TAU;
            }
        }
    }

    /// Current sway offset of a coral cell (0 for open or out-of-range cells)
    pub fn coral_offset(&self, col: usize, row: usize) -> f32 {
        if col >= self.width || row >= self.height || !self.cells[row * self.width + col] {
            return 0.0;
        }
        let sway = self.coral[row * self.width + col];
        sway.phase.sin() * sway.amplitude
    }

    /// Width in cells
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells
    pub fn height(&self) -> usize {
        self.height
    }

    /// Play area size in pixels
    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32) * CELL_SIZE
    }

    /// Cell containing a continuous position, or `None` outside the grid
    pub fn cell_at(&self, pos: Vec2) -> Option<(usize, usize)> {
        if !pos.is_finite() {
            return None;
        }
        let col = (pos.x / CELL_SIZE).floor();
        let row = (pos.y / CELL_SIZE).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        (col < self.width && row < self.height).then_some((col, row))
    }

    /// Pixel center of a cell
    pub fn cell_center(col: usize, row: usize) -> Vec2 {
        Vec2::new(col as f32 + 0.5, row as f32 + 0.5) * CELL_SIZE
    }

    /// Is this continuous position inside coral? Anything outside the grid is.
    pub fn is_wall(&self, pos: Vec2) -> bool {
        match self.cell_at(pos) {
            Some((col, row)) => self.cells[row * self.width + col],
            None => true,
        }
    }

    /// [`is_wall`](Self::is_wall) on separate coordinates
    #[inline]
    pub fn is_wall_xy(&self, x: f32, y: f32) -> bool {
        self.is_wall(Vec2::new(x, y))
    }

    /// Is this cell coral? Out-of-range cells are.
    pub fn is_wall_cell(&self, col: i32, row: i32) -> bool {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return true;
        }
        self.cells[row as usize * self.width + col as usize]
    }

    /// Number of open cells
    pub fn open_cell_count(&self) -> usize {
        self.cells.iter().filter(|wall| !**wall).count()
    }

    /// Fallback spawn point: center of cell (1, 1), which division never walls
    pub fn fallback_position() -> Vec2 {
        Self::cell_center(1, 1)
    }

    /// Random open position, or [`fallback_position`](Self::fallback_position)
    /// after a bounded number of misses.
    pub fn free_position(&self, rng: &mut Pcg32) -> Vec2 {
        let size = self.pixel_size();
        if size.x > 2.0 * CELL_SIZE && size.y > 2.0 * CELL_SIZE {
            for _ in 0..FREE_POSITION_ATTEMPTS {
                let pos = Vec2::new(
                    rng.random_range(CELL_SIZE..size.x - CELL_SIZE),
                    rng.random_range(CELL_SIZE..size.y - CELL_SIZE),
                );
                if !self.is_wall(pos) {
                    return pos;
                }
            }
        }
        log::debug!("No free position after {} attempts, using fallback", FREE_POSITION_ATTEMPTS);
        Self::fallback_position()
    }

    /// Random open position at least `min_distance` from `avoid`.
    ///
    /// Gives up after a bounded number of re-rolls and returns the last candidate.
    pub fn free_position_away_from(&self, rng: &mut Pcg32, avoid: Vec2, min_distance: f32) -> Vec2 {
        let mut pos = self.free_position(rng);
        for _ in 0..SPAWN_REROLLS {
            if pos.distance(avoid) >= min_distance {
                break;
            }
            pos = self.free_position(rng);
        }
        pos
    }

    /// Breadth-first search over open cells starting at `start`.
    ///
    /// Returns, for every cell, the cell it was reached from (`None` for
    /// unreached cells and for `start` itself).
    fn flood(&self, start: (usize, usize)) -> (Vec<bool>, Vec<Option<(usize, usize)>>) {
        let mut seen = vec![false; self.cells.len()];
        let mut came_from = vec![None; self.cells.len()];
        let (sc, sr) = start;
        if self.is_wall_cell(sc as i32, sr as i32) {
            return (seen, came_from);
        }

        let mut queue = VecDeque::new();
        seen[sr * self.width + sc] = true;
        queue.push_back(start);

        while let Some((col, row)) = queue.pop_front() {
            let (c, r) = (col as i32, row as i32);
            for (nc, nr) in [(c - 1, r), (c + 1, r), (c, r - 1), (c, r + 1)] {
                if self.is_wall_cell(nc, nr) {
                    continue;
                }
                let idx = nr as usize * self.width + nc as usize;
                if !seen[idx] {
                    seen[idx] = true;
                    came_from[idx] = Some((col, row));
                    queue.push_back((nc as usize, nr as usize));
                }
            }
        }

        (seen, came_from)
    }

    /// Number of open cells reachable from `start` (0 if `start` is coral)
    pub fn reachable_open_cells(&self, start: (usize, usize)) -> usize {
        let (seen, _) = self.flood(start);
        seen.iter().filter(|s| **s).count()
    }

    /// First cell on a shortest open path from `from` to `to`.
    ///
    /// `None` when `to` is unreachable or `from == to`.
    pub fn next_step(&self, from: (usize, usize), to: (usize, usize)) -> Option<(usize, usize)> {
        if from == to || self.is_wall_cell(to.0 as i32, to.1 as i32) {
            return None;
        }
        let (_, came_from) = self.flood(from);
        let mut cell = to;
        loop {
            let prev = came_from[cell.1 * self.width + cell.0]?;
            if prev == from {
                return Some(cell);
            }
            cell = prev;
        }
    }
}

/// Offset of a wall line inside a chamber span.
///
/// Chambers start on odd coordinates, so odd offsets put the wall on an even
/// coordinate (an even distance from the bounding wall), never on the first
/// or last cell of the span.
fn wall_offset(span: usize, rng: &mut Pcg32) -> usize {
    1 + 2 * rng.random_range(0..(span - 1) / 2)
}

/// Offset of the single opening in a wall line: even, so the opening lands
/// on an odd coordinate that no later wall can occupy.
fn door_offset(span: usize, rng: &mut Pcg32) -> usize {
    2 * rng.random_range(0..span.div_ceil(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn border_is_sealed(maze: &MazeGrid) -> bool {
        let (w, h) = (maze.width() as i32, maze.height() as i32);
        (0..w).all(|c| maze.is_wall_cell(c, 0) && maze.is_wall_cell(c, h - 1))
            && (0..h).all(|r| maze.is_wall_cell(0, r) && maze.is_wall_cell(w - 1, r))
    }

    fn first_open_cell(maze: &MazeGrid) -> Option<(usize, usize)> {
        (0..maze.height())
            .flat_map(|r| (0..maze.width()).map(move |c| (c, r)))
            .find(|&(c, r)| !maze.is_wall_cell(c as i32, r as i32))
    }

    #[test]
    fn test_scenario_30x20() {
        let mut rng = Pcg32::seed_from_u64(2024);
        let maze = MazeGrid::generate(30, 20, &mut rng);

        assert!(maze.is_wall_cell(0, 0));
        assert!(maze.is_wall_xy(5.0, 5.0));
        let open = maze.open_cell_count();
        assert!(open > 0);

        let start = first_open_cell(&maze).expect("open cell");
        let reached = maze.reachable_open_cells(start);
        assert!(reached as f32 >= open as f32 * 0.95, "{reached}/{open}");
    }

    #[test]
    fn test_division_alone_is_fully_connected() {
        let mut rng = Pcg32::seed_from_u64(7);
        let maze = MazeGrid::divided(30, 20, &mut rng);
        let start = first_open_cell(&maze).expect("open cell");
        assert_eq!(maze.reachable_open_cells(start), maze.open_cell_count());
    }

    #[test]
    fn test_division_actually_divides() {
        let mut rng = Pcg32::seed_from_u64(11);
        let maze = MazeGrid::divided(30, 20, &mut rng);
        let border_cells = 2 * 30 + 2 * 18;
        let walls = 30 * 20 - maze.open_cell_count();
        assert!(walls > border_cells);
    }

    #[test]
    fn test_injection_adds_loops() {
        let mut injected = 0;
        let seeds = 100;
        for seed in 0..seeds {
            let divided = MazeGrid::divided(30, 20, &mut Pcg32::seed_from_u64(seed));
            let full = MazeGrid::generate(30, 20, &mut Pcg32::seed_from_u64(seed));
            injected += full.open_cell_count() - divided.open_cell_count();
        }
        // 30 attempts at 0.3 each: about 9 per maze
        let average = injected as f32 / seeds as f32;
        assert!(average > 6.0, "average {average}");
    }

    #[test]
    fn test_json_round_trip_keeps_walls() {
        let mut rng = Pcg32::seed_from_u64(12);
        let maze = MazeGrid::generate(12, 12, &mut rng);
        let json = serde_json::to_string(&maze).expect("serialize");
        let loaded: MazeGrid = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(loaded.cells, maze.cells);
        assert_eq!(loaded.coral_offset(0, 0), 0.0);
        assert_eq!(loaded.is_wall_xy(60.0, 60.0), maze.is_wall_xy(60.0, 60.0));
    }

    #[test]
    fn test_json_rejects_mismatched_cells() {
        let short = r#"{"width":5,"height":5,"cells":[true]}"#;
        assert!(serde_json::from_str::<MazeGrid>(short).is_err());
        let huge = format!(r#"{{"width":{},"height":2,"cells":[]}}"#, usize::MAX);
        assert!(serde_json::from_str::<MazeGrid>(&huge).is_err());
    }

    #[test]
    fn test_cell_one_one_never_walled() {
        for seed in 0..50 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let maze = MazeGrid::generate(25, 17, &mut rng);
            assert!(!maze.is_wall(MazeGrid::fallback_position()));
        }
    }

    #[test]
    fn test_small_dimensions_degrade_to_room() {
        let mut rng = Pcg32::seed_from_u64(1);
        for (w, h) in [(0, 0), (1, 1), (2, 5), (3, 3), (3, 10), (10, 3)] {
            let maze = MazeGrid::generate(w, h, &mut rng);
            assert_eq!(maze.width(), w);
            assert_eq!(maze.height(), h);
            if w > 0 && h > 0 {
                assert!(border_is_sealed(&maze));
            }
            let interior = w.saturating_sub(2) * h.saturating_sub(2);
            assert_eq!(maze.open_cell_count(), interior);
        }
    }

    #[test]
    fn test_is_wall_out_of_bounds() {
        let maze = MazeGrid::from_rows(&["###", "#.#", "###"]);
        assert!(!maze.is_wall_xy(60.0, 60.0));
        assert!(maze.is_wall_xy(-1.0, 60.0));
        assert!(maze.is_wall_xy(60.0, -0.01));
        assert!(maze.is_wall_xy(500.0, 60.0));
        assert!(maze.is_wall_xy(f32::NAN, 60.0));
        // Cell edges floor into the next cell
        assert!(!maze.is_wall_xy(40.0, 40.0));
        assert!(maze.is_wall_xy(80.0, 60.0));
    }

    #[test]
    fn test_free_position_is_open() {
        let mut rng = Pcg32::seed_from_u64(99);
        let maze = MazeGrid::generate(30, 20, &mut rng);
        for _ in 0..200 {
            let pos = maze.free_position(&mut rng);
            assert!(!maze.is_wall(pos));
        }
    }

    #[test]
    fn test_free_position_falls_back_when_solid() {
        let maze = MazeGrid::from_rows(&["#####", "#####", "#####", "#####"]);
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(maze.free_position(&mut rng), MazeGrid::fallback_position());
    }

    #[test]
    fn test_free_position_away_from() {
        let mut rng = Pcg32::seed_from_u64(5);
        let maze = MazeGrid::generate(30, 20, &mut rng);
        let avoid = Vec2::new(600.0, 400.0);
        let pos = maze.free_position_away_from(&mut rng, avoid, SPAWN_SAFE_DISTANCE);
        assert!(!maze.is_wall(pos));
        assert!(pos.distance(avoid) >= SPAWN_SAFE_DISTANCE);
    }

    #[test]
    fn test_next_step_follows_corridor() {
        let maze = MazeGrid::from_rows(&[
            "#######",
            "#.....#",
            "#####.#",
            "#.....#",
            "#######",
        ]);
        // From bottom-left the only way out is right along row 3
        assert_eq!(maze.next_step((1, 3), (1, 1)), Some((2, 3)));
        assert_eq!(maze.next_step((5, 2), (1, 1)), Some((5, 1)));
        assert_eq!(maze.next_step((1, 1), (1, 1)), None);
        assert_eq!(maze.next_step((1, 1), (0, 0)), None);
    }

    #[test]
    fn test_coral_animates_without_changing_walls() {
        let mut rng = Pcg32::seed_from_u64(8);
        let mut maze = MazeGrid::generate(12, 12, &mut rng);
        let before = maze.cells.clone();
        let offset = maze.coral_offset(0, 0);
        for _ in 0..10 {
            maze.animate();
        }
        assert_eq!(maze.cells, before);
        assert_ne!(maze.coral_offset(0, 0), offset);
        assert_eq!(maze.coral_offset(1, 1), 0.0);
    }

    proptest! {
        #[test]
        fn prop_generated_maze_is_connected(
            seed in any::<u64>(),
            width in 8usize..48,
            height in 8usize..48,
        ) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let maze = MazeGrid::generate(width, height, &mut rng);
            prop_assert!(border_is_sealed(&maze));
            let start = first_open_cell(&maze).expect("open cell");
            prop_assert_eq!(maze.reachable_open_cells(start), maze.open_cell_count());
        }

        #[test]
        fn prop_border_sealed_any_size(
            seed in any::<u64>(),
            width in 1usize..40,
            height in 1usize..40,
        ) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let maze = MazeGrid::generate(width, height, &mut rng);
            prop_assert!(border_is_sealed(&maze));
        }
    }
}
