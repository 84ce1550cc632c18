//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod behavior;
pub mod maze;
pub mod movement;
pub mod state;
pub mod tick;

pub use behavior::{MoodChange, flee_heading, patrol_heading, update_mood};
pub use maze::{CoralSway, MazeGrid};
pub use movement::{AxisHits, Body, Contact, MoveInput, StuckDetector, WallPolicy};
pub use state::{
    Collider, Enemy, EnemyKind, Entity, GameEvent, GamePhase, GameState, Mood, Pearl, PearlKind,
    Player, UpdateContext,
};
pub use tick::{TickInput, tick};
