//! Maze-aware movement and collision response
//!
//! Every mobile entity moves through [`Body::advance`]. Each axis is tried on
//! its own against the wall grid, so diagonal motion into a corner slides
//! along the coral instead of sticking to it. What happens on a blocked axis
//! is decided by the caller's [`WallPolicy`].

use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2, PI};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::maze::MazeGrid;
use crate::consts::*;
use crate::normalize_angle;

/// Response to a blocked axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallPolicy {
    /// Zero the blocked velocity component (the diver)
    Stop,
    /// Mirror the heading about the blocked axis with a little jitter (enemies)
    Reflect,
}

/// Which axes were blocked during a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisHits {
    pub x: bool,
    pub y: bool,
}

impl AxisHits {
    pub fn any(&self) -> bool {
        self.x || self.y
    }
}

/// Outcome of one [`Body::advance`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contact {
    /// Axes refused by the wall grid
    pub wall: AxisHits,
    /// Axes that reached the arena edge clamp
    pub edge: AxisHits,
}

/// Kinematic state shared by every mobile entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    /// Displacement per tick
    pub vel: Vec2,
    /// Direction of travel (radians)
    pub heading: f32,
    /// Half the collision box side
    pub half_size: f32,
}

impl Body {
    pub fn new(pos: Vec2, half_size: f32, heading: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            heading,
            half_size,
        }
    }

    /// Move by `vel` for one tick, resolving X then Y against the maze, then
    /// clamp into the arena and apply `policy` to whatever got in the way.
    pub fn advance(&mut self, maze: &MazeGrid, policy: WallPolicy, rng: &mut Pcg32) -> Contact {
        let mut contact = Contact::default();

        let candidate_x = self.pos.x + self.vel.x;
        if maze.is_wall_xy(candidate_x, self.pos.y) {
            contact.wall.x = true;
        } else {
            self.pos.x = candidate_x;
        }

        let candidate_y = self.pos.y + self.vel.y;
        if maze.is_wall_xy(self.pos.x, candidate_y) {
            contact.wall.y = true;
        } else {
            self.pos.y = candidate_y;
        }

        // Backstop: nothing leaves the arena even if the grid lets it
        let arena = maze.pixel_size();
        let lo = Vec2::splat(self.half_size);
        let hi = (arena - lo).max(lo);
        contact.edge.x = self.pos.x <= lo.x || self.pos.x >= hi.x;
        contact.edge.y = self.pos.y <= lo.y || self.pos.y >= hi.y;
        self.pos = self.pos.clamp(lo, hi);

        match policy {
            WallPolicy::Stop => {
                if contact.wall.x {
                    self.vel.x = 0.0;
                }
                if contact.wall.y {
                    self.vel.y = 0.0;
                }
            }
            WallPolicy::Reflect => {
                if contact.wall.x {
                    self.heading = reflect_x(self.heading) + jitter(rng, BOUNCE_JITTER);
                }
                if contact.wall.y {
                    self.heading = reflect_y(self.heading) + jitter(rng, BOUNCE_JITTER);
                }
                if contact.edge.x {
                    self.heading = reflect_x(self.heading);
                }
                if contact.edge.y {
                    self.heading = reflect_y(self.heading);
                }
                self.heading = normalize_angle(self.heading);
            }
        }

        contact
    }
}

/// Mirror a heading after hitting a wall across the X axis of travel
#[inline]
pub fn reflect_x(heading: f32) -> f32 {
    PI - heading
}

/// Mirror a heading after hitting a wall across the Y axis of travel
#[inline]
pub fn reflect_y(heading: f32) -> f32 {
    -heading
}

/// Uniform random value in `[-spread, spread]`
#[inline]
pub fn jitter(rng: &mut Pcg32, spread: f32) -> f32 {
    if spread <= 0.0 {
        return 0.0;
    }
    rng.random_range(-spread..=spread)
}

/// Close part of the gap between current and target velocity
#[inline]
pub fn ease_toward(current: Vec2, target: Vec2) -> Vec2 {
    current + (target - current) * VELOCITY_EASE
}

/// Tracks how long a body has been standing still
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StuckDetector {
    last_pos: Vec2,
    still_ticks: u32,
}

impl StuckDetector {
    pub fn new(pos: Vec2) -> Self {
        Self {
            last_pos: pos,
            still_ticks: 0,
        }
    }

    /// Record the position at the start of a tick.
    ///
    /// Returns true (and resets the counter) once the body has barely moved
    /// for more than [`STUCK_TICKS`] consecutive ticks.
    pub fn observe(&mut self, pos: Vec2) -> bool {
        let moved = (pos - self.last_pos).abs();
        self.last_pos = pos;

        if moved.x < STUCK_EPSILON && moved.y < STUCK_EPSILON {
            self.still_ticks += 1;
        } else {
            self.still_ticks = 0;
        }

        if self.still_ticks > STUCK_TICKS {
            self.still_ticks = 0;
            return true;
        }
        false
    }

    /// Consecutive still ticks so far
    pub fn still_ticks(&self) -> u32 {
        self.still_ticks
    }
}

/// Large random turn used to break out of a stuck oscillation
pub fn unstick_heading(heading: f32, rng: &mut Pcg32) -> f32 {
    normalize_angle(heading + rng.random_range(FRAC_PI_2..=PI))
}

/// Discrete 8-way movement input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveInput {
    /// Input pointing from `from` toward `to`, ignoring offsets within `deadzone`
    pub fn toward(from: Vec2, to: Vec2, deadzone: f32) -> Self {
        let d = to - from;
        Self {
            left: d.x < -deadzone,
            right: d.x > deadzone,
            up: d.y < -deadzone,
            down: d.y > deadzone,
        }
    }

    /// Unit-ish direction: each axis in {-1, 0, 1}, diagonals scaled by 1/√2
    pub fn direction(&self) -> Vec2 {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
        let dir = Vec2::new(axis(self.left, self.right), axis(self.up, self.down));
        if dir.x != 0.0 && dir.y != 0.0 {
            dir * FRAC_1_SQRT_2
        } else {
            dir
        }
    }

    /// Target velocity at `speed` pixels per tick
    pub fn target_velocity(&self, speed: f32) -> Vec2 {
        self.direction() * speed
    }
}
