//! Coral Maze - A diving arcade game core
//!
//! Core modules:
//! - `sim`: Simulation (maze generation, movement, enemy behavior, game rules)
//! - `settings`: Immutable per-level tuning record
//! - `highscores`: Top-10 leaderboard stored as JSON

pub mod highscores;
pub mod settings;
pub mod sim;

pub use settings::{Difficulty, GameSettings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Simulation tick rate (Hz)
    pub const TICK_RATE: u32 = 60;

    /// Side length of one maze cell in pixels
    pub const CELL_SIZE: f32 = 40.0;
    /// Default maze dimensions (cells). 30x20 fills a 1200x800 screen.
    pub const DEFAULT_MAZE_WIDTH: usize = 30;
    pub const DEFAULT_MAZE_HEIGHT: usize = 20;

    /// Maze generation
    pub const MIN_DIVISIBLE_SPAN: usize = 4;
    /// One injected-opening attempt per this many cells
    pub const OPENING_DENSITY: usize = 20;
    pub const OPENING_CHANCE: f64 = 0.3;
    pub const FREE_POSITION_ATTEMPTS: u32 = 100;
    /// Re-rolls when a spawn point lands too close to the diver
    pub const SPAWN_REROLLS: u32 = 20;
    pub const SPAWN_SAFE_DISTANCE: f32 = 100.0;

    /// Entity sizes (full collision box side, pixels)
    pub const PLAYER_SIZE: f32 = 24.0;
    pub const SHARK_SIZE: f32 = 35.0;
    pub const JELLYFISH_SIZE: f32 = 28.0;
    pub const PEARL_SIZE: f32 = 14.0;
    pub const GIANT_PEARL_SIZE: f32 = 24.0;

    /// Fraction of the gap to target velocity closed each tick
    pub const VELOCITY_EASE: f32 = 0.2;
    /// Random spread added to a wall bounce (radians)
    pub const BOUNCE_JITTER: f32 = 0.3;

    /// Anti-stuck: per-axis displacement below this counts as not moving
    pub const STUCK_EPSILON: f32 = 1.0;
    /// Anti-stuck: still ticks tolerated before a forced turn
    pub const STUCK_TICKS: u32 = 30;

    /// Enemy patrol
    pub const TURN_TIMER_MIN: u32 = 60;
    pub const TURN_TIMER_MAX: u32 = 180;
    pub const RETURN_JITTER: f32 = 0.5;
    pub const WANDER_JITTER: f32 = 1.0;
    pub const FLEE_JITTER: f32 = 0.3;

    /// Scoring
    pub const PEARL_POINTS: u32 = 10;
    pub const GIANT_PEARL_POINTS: u32 = 50;
    pub const VICTORY_BONUS: u64 = 1000;
    pub const VICTORY_BONUS_PER_LIFE: u64 = 200;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing along `heading` (radians, screen coordinates)
#[inline]
pub fn heading_vec(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

/// Heading (radians) of the vector from `from` to `to`
#[inline]
pub fn heading_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}
