//! Game settings
//!
//! One immutable record handed to the simulation at level start. Loaded from
//! JSON when a file is given, otherwise built from a difficulty preset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{CELL_SIZE, DEFAULT_MAZE_HEIGHT, DEFAULT_MAZE_WIDTH, MIN_DIVISIBLE_SPAN};

/// Largest maze side accepted from a settings file
const MAX_MAZE_SPAN: usize = 200;

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Relaxed,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Relaxed => "Relaxed",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relaxed" | "easy" => Some(Difficulty::Relaxed),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Enemy speed multiplier for this preset
    pub fn enemy_speed_scale(&self) -> f32 {
        match self {
            Difficulty::Relaxed => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.3,
        }
    }

    /// Number of patrolling enemies
    pub fn enemy_count(&self) -> usize {
        match self {
            Difficulty::Relaxed => 4,
            Difficulty::Normal => 6,
            Difficulty::Hard => 9,
        }
    }

    /// How long a giant pearl's harpoon lasts (ticks)
    pub fn harpoon_ticks(&self) -> u32 {
        match self {
            Difficulty::Relaxed => 420,
            Difficulty::Normal => 300,
            Difficulty::Hard => 240,
        }
    }
}

/// Per-level tuning record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub difficulty: Difficulty,

    // === Maze ===
    /// Maze width in cells
    pub maze_width: usize,
    /// Maze height in cells
    pub maze_height: usize,

    // === Speeds (pixels per tick) ===
    pub player_speed: f32,
    pub shark_speed: f32,
    pub jellyfish_speed: f32,

    // === Population ===
    pub enemy_count: usize,
    pub pearl_count: usize,
    pub giant_pearl_count: usize,
    pub starting_lives: u8,

    // === Timers (ticks) ===
    /// Harpoon power-up duration
    pub harpoon_ticks: u32,
    /// Invulnerability after being hit
    pub invulnerable_ticks: u32,
    /// Fear duration once triggered
    pub fear_ticks: u32,

    // === Enemy behavior ===
    /// Distance at which an armed diver scares enemies
    pub fear_distance: f32,
    /// Speed multiplier while fleeing
    pub fear_speed_multiplier: f32,
    /// Soft leash around an enemy's spawn point
    pub patrol_radius: f32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,

            maze_width: DEFAULT_MAZE_WIDTH,
            maze_height: DEFAULT_MAZE_HEIGHT,

            player_speed: 4.0,
            shark_speed: 2.0,
            jellyfish_speed: 1.5,

            enemy_count: 6,
            pearl_count: 20,
            giant_pearl_count: 4,
            starting_lives: 3,

            harpoon_ticks: 300,
            invulnerable_ticks: 120,
            fear_ticks: 180,

            fear_distance: 120.0,
            fear_speed_multiplier: 2.5,
            patrol_radius: 150.0,
        }
    }
}

impl GameSettings {
    /// Create settings from a difficulty preset (applies preset defaults)
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        let mut settings = Self::default();
        settings.apply_difficulty(difficulty);
        settings
    }

    /// Apply a difficulty preset (updates difficulty-dependent settings)
    pub fn apply_difficulty(&mut self, difficulty: Difficulty) {
        let base = Self::default();
        self.difficulty = difficulty;
        self.shark_speed = base.shark_speed * difficulty.enemy_speed_scale();
        self.jellyfish_speed = base.jellyfish_speed * difficulty.enemy_speed_scale();
        self.enemy_count = difficulty.enemy_count();
        self.harpoon_ticks = difficulty.harpoon_ticks();
    }

    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings.validated()
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read {}: {} - using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Fastest an enemy can legally move (pixels per tick)
    fn max_enemy_speed(&self) -> f32 {
        (CELL_SIZE - 1.0) / self.fear_speed_multiplier.max(1.0)
    }

    /// Clamp every field into a range the simulation can honor.
    ///
    /// Speeds stay below one cell per tick (fear boost included) so the
    /// per-axis wall check can never skip over a coral cell.
    pub fn validated(mut self) -> Self {
        let maze_width = self.maze_width.clamp(MIN_DIVISIBLE_SPAN, MAX_MAZE_SPAN);
        let maze_height = self.maze_height.clamp(MIN_DIVISIBLE_SPAN, MAX_MAZE_SPAN);
        if maze_width != self.maze_width || maze_height != self.maze_height {
            log::warn!(
                "Maze {}x{} out of range, using {}x{}",
                self.maze_width,
                self.maze_height,
                maze_width,
                maze_height
            );
            self.maze_width = maze_width;
            self.maze_height = maze_height;
        }

        if !self.fear_speed_multiplier.is_finite() || self.fear_speed_multiplier < 1.0 {
            log::warn!("fear_speed_multiplier {} invalid, using 1.0", self.fear_speed_multiplier);
            self.fear_speed_multiplier = 1.0;
        }

        self.player_speed = clamp_speed("player_speed", self.player_speed, CELL_SIZE - 1.0);
        let enemy_max = self.max_enemy_speed();
        self.shark_speed = clamp_speed("shark_speed", self.shark_speed, enemy_max);
        self.jellyfish_speed = clamp_speed("jellyfish_speed", self.jellyfish_speed, enemy_max);

        if !self.fear_distance.is_finite() || self.fear_distance < 0.0 {
            log::warn!("fear_distance {} invalid, using 0", self.fear_distance);
            self.fear_distance = 0.0;
        }
        if !self.patrol_radius.is_finite() || self.patrol_radius < 0.0 {
            log::warn!("patrol_radius {} invalid, using 0", self.patrol_radius);
            self.patrol_radius = 0.0;
        }
        if self.starting_lives == 0 {
            log::warn!("starting_lives must be at least 1");
            self.starting_lives = 1;
        }

        self
    }
}

fn clamp_speed(name: &str, speed: f32, max: f32) -> f32 {
    if !speed.is_finite() || speed < 0.0 {
        log::warn!("{} {} invalid, using 0", name, speed);
        return 0.0;
    }
    if speed > max {
        log::warn!("{} {} would tunnel through coral, clamped to {}", name, speed, max);
        return max;
    }
    speed
}
