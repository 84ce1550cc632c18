//! Enemy behavior: patrol and flee
//!
//! Two states. Patrolling enemies wander around their spawn point and reroll
//! their heading every 60-180 ticks. An armed diver within the fear distance
//! flips a patrolling enemy into `Feared`: it turns away from the diver and
//! swims faster until the fear timer runs out. The countdown is not extended
//! by staying close.
//!
//! This module only decides heading and speed; [`Body::advance`] does the
//! collision-aware integration.
//!
//! [`Body::advance`]: super::movement::Body::advance

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::maze::MazeGrid;
use super::movement::{WallPolicy, jitter, unstick_heading};
use super::state::{Enemy, Entity, Mood, UpdateContext};
use crate::consts::*;
use crate::{heading_between, heading_vec, normalize_angle};

/// What happened to an enemy's mood during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodChange {
    None,
    BecameFeared,
    Calmed,
}

/// Run the Patrolling/Feared state machine for one tick.
///
/// A fear countdown only starts ticking on the tick after the transition.
pub fn update_mood(enemy: &mut Enemy, ctx: &UpdateContext<'_>, rng: &mut Pcg32) -> MoodChange {
    match enemy.mood {
        Mood::Feared { ticks_left } => {
            let ticks_left = ticks_left.saturating_sub(1);
            if ticks_left == 0 {
                enemy.mood = Mood::Patrolling;
                MoodChange::Calmed
            } else {
                enemy.mood = Mood::Feared { ticks_left };
                MoodChange::None
            }
        }
        Mood::Patrolling => {
            let dist = enemy.body.pos.distance(ctx.player_pos);
            if ctx.player_armed && dist < ctx.settings.fear_distance && ctx.settings.fear_ticks > 0 {
                enemy.mood = Mood::Feared {
                    ticks_left: ctx.settings.fear_ticks,
                };
                enemy.body.heading = flee_heading(enemy.body.pos, ctx.player_pos, rng);
                MoodChange::BecameFeared
            } else {
                MoodChange::None
            }
        }
    }
}

/// Heading directly away from `threat`, with a little jitter
pub fn flee_heading(pos: Vec2, threat: Vec2, rng: &mut Pcg32) -> f32 {
    normalize_angle(heading_between(threat, pos) + jitter(rng, FLEE_JITTER))
}

/// New patrol heading: back toward the patrol center when too far out,
/// otherwise a random nudge of the current heading.
pub fn patrol_heading(enemy: &Enemy, rng: &mut Pcg32) -> f32 {
    let to_center = enemy.patrol_center - enemy.body.pos;
    if to_center.length() > enemy.patrol_radius {
        normalize_angle(to_center.y.atan2(to_center.x) + jitter(rng, RETURN_JITTER))
    } else {
        normalize_angle(enemy.body.heading + jitter(rng, WANDER_JITTER))
    }
}

/// Count down the patrol timer and reroll the heading when it expires
fn tick_patrol(enemy: &mut Enemy, rng: &mut Pcg32) {
    enemy.turn_timer = enemy.turn_timer.saturating_sub(1);
    if enemy.turn_timer == 0 {
        enemy.body.heading = patrol_heading(enemy, rng);
        enemy.turn_timer = rng.random_range(TURN_TIMER_MIN..=TURN_TIMER_MAX);
    }
}

/// Current speed including the fear boost
pub fn current_speed(enemy: &Enemy, ctx: &UpdateContext<'_>) -> f32 {
    if enemy.is_feared() {
        enemy.speed * ctx.settings.fear_speed_multiplier
    } else {
        enemy.speed
    }
}

impl Entity for Enemy {
    fn update(&mut self, maze: &MazeGrid, ctx: &UpdateContext<'_>, rng: &mut Pcg32) {
        if self.stuck.observe(self.body.pos) {
            self.body.heading = unstick_heading(self.body.heading, rng);
        }

        let change = update_mood(self, ctx, rng);
        match change {
            MoodChange::BecameFeared => {
                log::debug!("{} {} feared", self.kind.as_str(), self.id);
            }
            MoodChange::Calmed => {
                log::debug!("{} {} back on patrol", self.kind.as_str(), self.id);
            }
            MoodChange::None => {}
        }
        if self.mood == Mood::Patrolling {
            tick_patrol(self, rng);
        }

        let policy = self.wall_policy();
        self.body.vel = heading_vec(self.body.heading) * current_speed(self, ctx);
        self.body.advance(maze, policy, rng);

        self.anim_phase = (self.anim_phase + self.kind.anim_rate()) % std::f32::consts::TAU;
    }

    fn desired_heading(&self) -> f32 {
        self.body.heading
    }

    fn wall_policy(&self) -> WallPolicy {
        WallPolicy::Reflect
    }
}
