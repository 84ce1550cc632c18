//! Game state and entity types
//!
//! Everything created at level start lives here: the maze, the diver, the
//! enemies and the pearls. They are built together by [`GameState::new`] and
//! thrown away together by [`GameState::reset_game`].

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::maze::MazeGrid;
use super::movement::{Body, MoveInput, StuckDetector, WallPolicy, ease_toward};
use crate::consts::*;
use crate::settings::GameSettings;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Out of lives
    GameOver,
    /// All pearls collected
    Victory,
    /// User asked to quit; the loop should unwind
    Quit,
}

impl GamePhase {
    /// True once the level can no longer continue
    pub fn is_finished(&self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Victory | GamePhase::Quit)
    }
}

/// Something the presentation layer may want to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PearlCollected { kind: PearlKind, points: u32, pos: Vec2 },
    HarpoonGained,
    EnemyFeared { enemy_id: u32 },
    PlayerHit { lives_left: u8 },
    Victory { bonus: u64 },
    GameOver,
}

/// Per-tick inputs an entity update may look at
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    pub settings: &'a GameSettings,
    /// Diver movement input for this tick
    pub input: MoveInput,
    /// Where the diver is
    pub player_pos: Vec2,
    /// Whether the diver currently holds the harpoon
    pub player_armed: bool,
}

/// Anything with a collision box
pub trait Collider {
    fn pos(&self) -> Vec2;
    fn half_size(&self) -> f32;
    fn is_active(&self) -> bool;

    /// Axis-aligned box overlap; inactive objects never overlap
    fn overlaps<C: Collider + ?Sized>(&self, other: &C) -> bool {
        if !self.is_active() || !other.is_active() {
            return false;
        }
        let reach = self.half_size() + other.half_size();
        let d = (self.pos() - other.pos()).abs();
        d.x < reach && d.y < reach
    }

    fn distance_to<C: Collider + ?Sized>(&self, other: &C) -> f32 {
        self.pos().distance(other.pos())
    }
}

/// A mobile entity driven once per tick
pub trait Entity: Collider {
    /// Advance one tick against the maze
    fn update(&mut self, maze: &MazeGrid, ctx: &UpdateContext<'_>, rng: &mut Pcg32);
    /// Direction the entity wants to travel (radians)
    fn desired_heading(&self) -> f32;
    /// How this entity reacts to coral
    fn wall_policy(&self) -> WallPolicy;
}

/// The diver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub body: Body,
    /// Facing for rendering (radians); follows the last non-zero input
    pub facing: f32,
    /// Remaining harpoon ticks (0 = unarmed)
    pub harpoon_ticks: u32,
    /// Remaining invulnerability ticks
    pub invulnerable_ticks: u32,
    /// Swim stroke animation phase
    pub swim_phase: f32,
    pub active: bool,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            body: Body::new(pos, PLAYER_SIZE / 2.0, 0.0),
            facing: 0.0,
            harpoon_ticks: 0,
            invulnerable_ticks: 0,
            swim_phase: 0.0,
            active: true,
        }
    }

    pub fn has_harpoon(&self) -> bool {
        self.harpoon_ticks > 0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ticks > 0
    }

    /// Remaining harpoon time as a fraction of `duration` (for the HUD bar)
    pub fn harpoon_ratio(&self, duration: u32) -> f32 {
        if duration == 0 {
            return 0.0;
        }
        (self.harpoon_ticks as f32 / duration as f32).min(1.0)
    }

    /// Arm the diver for `ticks`
    pub fn give_harpoon(&mut self, ticks: u32) {
        self.harpoon_ticks = ticks;
    }

    /// Take a hit. Returns false if still invulnerable from the last one.
    pub fn take_damage(&mut self, invulnerable_ticks: u32) -> bool {
        if self.is_invulnerable() {
            return false;
        }
        self.invulnerable_ticks = invulnerable_ticks;
        true
    }

    /// Blink pattern while invulnerable (for rendering)
    pub fn is_blink_hidden(&self) -> bool {
        self.is_invulnerable() && (self.invulnerable_ticks / 5) % 2 == 1
    }
}

impl Collider for Player {
    fn pos(&self) -> Vec2 {
        self.body.pos
    }

    fn half_size(&self) -> f32 {
        self.body.half_size
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Entity for Player {
    fn update(&mut self, maze: &MazeGrid, ctx: &UpdateContext<'_>, rng: &mut Pcg32) {
        let target = ctx.input.target_velocity(ctx.settings.player_speed);
        if target != Vec2::ZERO {
            self.facing = target.y.atan2(target.x);
        }

        let policy = self.wall_policy();
        self.body.vel = ease_toward(self.body.vel, target);
        self.body.advance(maze, policy, rng);

        if self.body.vel.abs().max_element() > 0.1 {
            self.swim_phase = (self.swim_phase + 0.3) % std::f32::consts::TAU;
        }

        self.harpoon_ticks = self.harpoon_ticks.saturating_sub(1);
        self.invulnerable_ticks = self.invulnerable_ticks.saturating_sub(1);
    }

    fn desired_heading(&self) -> f32 {
        self.facing
    }

    fn wall_policy(&self) -> WallPolicy {
        WallPolicy::Stop
    }
}

/// Enemy species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    Shark,
    Jellyfish,
}

impl EnemyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyKind::Shark => "shark",
            EnemyKind::Jellyfish => "jellyfish",
        }
    }

    pub fn half_size(&self) -> f32 {
        match self {
            EnemyKind::Shark => SHARK_SIZE / 2.0,
            EnemyKind::Jellyfish => JELLYFISH_SIZE / 2.0,
        }
    }

    pub fn base_speed(&self, settings: &GameSettings) -> f32 {
        match self {
            EnemyKind::Shark => settings.shark_speed,
            EnemyKind::Jellyfish => settings.jellyfish_speed,
        }
    }

    /// Animation phase advance per tick (shark tail / jellyfish pulse)
    pub fn anim_rate(&self) -> f32 {
        match self {
            EnemyKind::Shark => 0.2,
            EnemyKind::Jellyfish => 0.08,
        }
    }
}

/// Enemy behavior state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    /// Random walk around the patrol center
    Patrolling,
    /// Fleeing an armed diver
    Feared { ticks_left: u32 },
}

/// A shark or jellyfish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub body: Body,
    /// Base speed (pixels per tick) before the fear multiplier
    pub speed: f32,
    /// Spawn point acting as a soft leash
    pub patrol_center: Vec2,
    pub patrol_radius: f32,
    pub mood: Mood,
    /// Ticks until the next patrol heading reroll
    pub turn_timer: u32,
    pub stuck: StuckDetector,
    /// Tail / pulse animation phase
    pub anim_phase: f32,
    pub active: bool,
}

impl Enemy {
    pub fn new(
        id: u32,
        kind: EnemyKind,
        pos: Vec2,
        speed: f32,
        patrol_radius: f32,
        rng: &mut Pcg32,
    ) -> Self {
        let heading = rng.random_range(0.0..std::f32::consts::TAU);
        Self {
            id,
            kind,
            body: Body::new(pos, kind.half_size(), crate::normalize_angle(heading)),
            speed,
            patrol_center: pos,
            patrol_radius,
            mood: Mood::Patrolling,
            turn_timer: rng.random_range(TURN_TIMER_MIN..=TURN_TIMER_MAX),
            stuck: StuckDetector::new(pos),
            anim_phase: rng.random_range(0.0..std::f32::consts::TAU),
            active: true,
        }
    }

    pub fn is_feared(&self) -> bool {
        matches!(self.mood, Mood::Feared { .. })
    }

    /// Remaining fear ticks (0 while patrolling)
    pub fn fear_ticks_left(&self) -> u32 {
        match self.mood {
            Mood::Feared { ticks_left } => ticks_left,
            Mood::Patrolling => 0,
        }
    }
}

impl Collider for Enemy {
    fn pos(&self) -> Vec2 {
        self.body.pos
    }

    fn half_size(&self) -> f32 {
        self.body.half_size
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Pearl types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PearlKind {
    Normal,
    /// Worth more and grants the harpoon
    Giant,
}

impl PearlKind {
    pub fn points(&self) -> u32 {
        match self {
            PearlKind::Normal => PEARL_POINTS,
            PearlKind::Giant => GIANT_PEARL_POINTS,
        }
    }

    pub fn half_size(&self) -> f32 {
        match self {
            PearlKind::Normal => PEARL_SIZE / 2.0,
            PearlKind::Giant => GIANT_PEARL_SIZE / 2.0,
        }
    }

    pub fn grants_harpoon(&self) -> bool {
        *self == PearlKind::Giant
    }
}

/// A collectible pearl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pearl {
    pub id: u32,
    pub kind: PearlKind,
    /// Resting position; bobbing is cosmetic
    pub pos: Vec2,
    pub bob_phase: f32,
    pub shine_phase: f32,
}

impl Pearl {
    pub fn new(id: u32, kind: PearlKind, pos: Vec2, rng: &mut Pcg32) -> Self {
        Self {
            id,
            kind,
            pos,
            bob_phase: rng.random_range(0.0..std::f32::consts::TAU),
            shine_phase: rng.random_range(0.0..std::f32::consts::TAU),
        }
    }

    /// Advance cosmetic phases
    pub fn animate(&mut self) {
        let (bob, shine) = match self.kind {
            PearlKind::Normal => (0.05, 0.1),
            PearlKind::Giant => (0.03, 0.05),
        };
        self.bob_phase = (self.bob_phase + bob) % std::f32::consts::TAU;
        self.shine_phase = (self.shine_phase + shine) % std::f32::consts::TAU;
    }

    /// Vertical draw offset from the resting position
    pub fn bob_offset(&self) -> f32 {
        let amplitude = match self.kind {
            PearlKind::Normal => 3.0,
            PearlKind::Giant => 5.0,
        };
        self.bob_phase.sin() * amplitude
    }
}

impl Collider for Pearl {
    fn pos(&self) -> Vec2 {
        self.pos
    }

    fn half_size(&self) -> f32 {
        self.kind.half_size()
    }

    fn is_active(&self) -> bool {
        true
    }
}

/// Complete state of one level
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed the level RNG started from
    pub seed: u64,
    /// Settings fixed at level start
    pub settings: GameSettings,
    /// Single RNG threaded through generation and behavior
    pub(super) rng: Pcg32,
    pub maze: MazeGrid,
    pub player: Player,
    /// Enemies (sorted by id)
    pub enemies: Vec<Enemy>,
    /// Remaining pearls (sorted by id)
    pub pearls: Vec<Pearl>,
    pub score: u64,
    pub lives: u8,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events raised during the last tick
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Start a new level with the given seed
    pub fn new(seed: u64, settings: GameSettings) -> Self {
        let settings = settings.validated();
        let mut rng = Pcg32::seed_from_u64(seed);
        let maze = MazeGrid::generate(settings.maze_width, settings.maze_height, &mut rng);
        let player = Player::new(maze.free_position(&mut rng));

        let mut state = Self {
            seed,
            lives: settings.starting_lives,
            settings,
            rng,
            maze,
            player,
            enemies: Vec::new(),
            pearls: Vec::new(),
            score: 0,
            phase: GamePhase::Playing,
            time_ticks: 0,
            events: Vec::new(),
            next_id: 1,
        };
        state.populate();
        state
    }

    /// Throw the level away and build a fresh one with the same settings.
    ///
    /// The RNG carries on, so the new maze differs from the old one.
    pub fn reset_game(&mut self) {
        self.maze = MazeGrid::generate(
            self.settings.maze_width,
            self.settings.maze_height,
            &mut self.rng,
        );
        self.player = Player::new(self.maze.free_position(&mut self.rng));
        self.enemies.clear();
        self.pearls.clear();
        self.score = 0;
        self.lives = self.settings.starting_lives;
        self.phase = GamePhase::Playing;
        self.time_ticks = 0;
        self.events.clear();
        self.next_id = 1;
        self.populate();
    }

    /// Start over with a new seed, keeping the settings
    pub fn restart(&mut self, seed: u64) {
        *self = Self::new(seed, self.settings.clone());
        log::info!("Game restarted with seed: {}", seed);
    }

    /// Spawn enemies away from the diver, then scatter pearls
    fn populate(&mut self) {
        let player_pos = self.player.body.pos;

        for _ in 0..self.settings.enemy_count {
            let pos =
                self.maze
                    .free_position_away_from(&mut self.rng, player_pos, SPAWN_SAFE_DISTANCE);
            let kind = if self.rng.random_bool(0.5) {
                EnemyKind::Shark
            } else {
                EnemyKind::Jellyfish
            };
            let id = self.next_entity_id();
            let speed = kind.base_speed(&self.settings);
            let enemy = Enemy::new(id, kind, pos, speed, self.settings.patrol_radius, &mut self.rng);
            self.enemies.push(enemy);
        }

        let kinds = std::iter::repeat_n(PearlKind::Normal, self.settings.pearl_count)
            .chain(std::iter::repeat_n(PearlKind::Giant, self.settings.giant_pearl_count));
        for kind in kinds {
            let pos = self.maze.free_position(&mut self.rng);
            let id = self.next_entity_id();
            let pearl = Pearl::new(id, kind, pos, &mut self.rng);
            self.pearls.push(pearl);
        }

        log::info!(
            "Level ready: maze {}x{} ({} open cells), {} enemies, {} pearls",
            self.maze.width(),
            self.maze.height(),
            self.maze.open_cell_count(),
            self.enemies.len(),
            self.pearls.len()
        );
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Pearls still in the maze
    pub fn pearls_remaining(&self) -> usize {
        self.pearls.len()
    }

    /// Pearls placed at level start
    pub fn total_pearls(&self) -> usize {
        self.settings.pearl_count + self.settings.giant_pearl_count
    }

    /// Score bonus for clearing the maze with the current lives
    pub fn victory_bonus(&self) -> u64 {
        VICTORY_BONUS + VICTORY_BONUS_PER_LIFE * self.lives as u64
    }
}
