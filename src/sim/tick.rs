//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;

use super::maze::MazeGrid;
use super::movement::MoveInput;
use super::state::{Collider, Entity, GameEvent, GamePhase, GameState, UpdateContext};
use crate::settings::GameSettings;

/// Autopilot ignores offsets smaller than this when steering (pixels)
const AUTOPILOT_DEADZONE: f32 = 2.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Diver movement keys
    pub movement: MoveInput,
    /// Pause toggle
    pub pause: bool,
    /// Stop the game at the start of this tick
    pub quit: bool,
    /// Idle/demo mode - autopilot swims for pearls
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    state.events.clear();

    if input.quit {
        if state.phase != GamePhase::Quit {
            log::info!("Quit at tick {} with score {}", state.time_ticks, state.score);
        }
        state.phase = GamePhase::Quit;
        return;
    }

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }

    if state.phase != GamePhase::Playing {
        return;
    }

    state.time_ticks += 1;

    let movement = if input.idle_mode {
        autopilot_input(state)
    } else {
        input.movement
    };

    state.maze.animate();

    let GameState {
        settings,
        rng,
        maze,
        player,
        enemies,
        pearls,
        score,
        lives,
        phase,
        events,
        ..
    } = state;
    let settings: &GameSettings = settings;
    let maze: &MazeGrid = maze;

    let player_ctx = UpdateContext {
        settings,
        input: movement,
        player_pos: player.pos(),
        player_armed: player.has_harpoon(),
    };
    player.update(maze, &player_ctx, rng);

    // Enemies react to where the diver ended up this tick
    let enemy_ctx = UpdateContext {
        player_pos: player.pos(),
        player_armed: player.has_harpoon(),
        ..player_ctx
    };
    for enemy in enemies.iter_mut() {
        let was_feared = enemy.is_feared();
        enemy.update(maze, &enemy_ctx, rng);
        if !was_feared && enemy.is_feared() {
            events.push(GameEvent::EnemyFeared { enemy_id: enemy.id });
        }
    }

    for pearl in pearls.iter_mut() {
        pearl.animate();
    }

    // Pearl pickups
    let mut collected = Vec::new();
    pearls.retain(|pearl| {
        if player.overlaps(pearl) {
            collected.push((pearl.kind, pearl.pos));
            false
        } else {
            true
        }
    });
    for (kind, pos) in collected {
        let points = kind.points();
        *score += u64::from(points);
        events.push(GameEvent::PearlCollected { kind, points, pos });
        if kind.grants_harpoon() {
            player.give_harpoon(settings.harpoon_ticks);
            events.push(GameEvent::HarpoonGained);
        }
    }

    // Enemy contact
    if enemies.iter().any(|enemy| player.overlaps(enemy))
        && player.take_damage(settings.invulnerable_ticks)
    {
        *lives = lives.saturating_sub(1);
        events.push(GameEvent::PlayerHit { lives_left: *lives });
        log::debug!("Diver hit, {} lives left", lives);

        if *lives == 0 {
            *phase = GamePhase::GameOver;
            events.push(GameEvent::GameOver);
            log::info!("Game over with score {}", score);
            return;
        }
    }

    if pearls.is_empty() {
        let bonus = state.victory_bonus();
        state.score += bonus;
        state.phase = GamePhase::Victory;
        state.events.push(GameEvent::Victory { bonus });
        log::info!(
            "Maze cleared in {} ticks, score {}",
            state.time_ticks,
            state.score
        );
    }
}

/// Steer toward the nearest pearl along the shortest corridor path
fn autopilot_input(state: &GameState) -> MoveInput {
    let from = state.player.pos();
    let Some(pearl) = state.pearls.iter().min_by(|a, b| {
        a.pos
            .distance_squared(from)
            .partial_cmp(&b.pos.distance_squared(from))
            .unwrap_or(std::cmp::Ordering::Equal)
    }) else {
        return MoveInput::default();
    };

    let waypoint = autopilot_waypoint(&state.maze, from, pearl.pos);
    MoveInput::toward(from, waypoint, AUTOPILOT_DEADZONE)
}

/// Next point to swim at: the center of the next corridor cell, or the
/// target itself once we share its cell
fn autopilot_waypoint(maze: &MazeGrid, from: Vec2, target: Vec2) -> Vec2 {
    let (Some(from_cell), Some(target_cell)) = (maze.cell_at(from), maze.cell_at(target)) else {
        return target;
    };
    match maze.next_step(from_cell, target_cell) {
        Some((col, row)) => MazeGrid::cell_center(col, row),
        None => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Enemy, EnemyKind, Pearl, PearlKind};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn quiet_settings() -> GameSettings {
        GameSettings {
            enemy_count: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_quit_stops_everything() {
        let mut state = GameState::new(12345, GameSettings::default());
        let input = TickInput {
            quit: true,
            movement: MoveInput {
                right: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let before = state.player.pos();
        tick(&mut state, &input);
        assert_eq!(state.phase, GamePhase::Quit);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.player.pos(), before);

        // Further ticks do nothing
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_tick_pause() {
        let mut state = GameState::new(12345, GameSettings::default());
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };

        tick(&mut state, &pause);
        assert_eq!(state.phase, GamePhase::Paused);
        let enemies_before: Vec<Vec2> = state.enemies.iter().map(|e| e.pos()).collect();

        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, 0);
        let enemies_after: Vec<Vec2> = state.enemies.iter().map(|e| e.pos()).collect();
        assert_eq!(enemies_before, enemies_after);

        // Unpause
        tick(&mut state, &pause);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.time_ticks, 1);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(99999, GameSettings::default());
        let mut state2 = GameState::new(99999, GameSettings::default());

        let inputs = [
            TickInput {
                movement: MoveInput {
                    right: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            TickInput {
                movement: MoveInput {
                    down: true,
                    left: true,
                    ..Default::default()
                },
                ..Default::default()
            },
            TickInput::default(),
        ];

        for _ in 0..100 {
            for input in &inputs {
                tick(&mut state1, input);
                tick(&mut state2, input);
            }
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.player.pos(), state2.player.pos());
        for (a, b) in state1.enemies.iter().zip(&state2.enemies) {
            assert_eq!(a.pos(), b.pos());
            assert_eq!(a.mood, b.mood);
        }
        assert_eq!(state1.score, state2.score);
    }

    #[test]
    fn test_pearl_pickup_scores() {
        let mut state = GameState::new(7, quiet_settings());
        let at = state.player.pos();
        let id = state.next_entity_id();
        let mut rng = Pcg32::seed_from_u64(0);
        state.pearls.push(Pearl::new(id, PearlKind::Normal, at, &mut rng));

        tick(&mut state, &TickInput::default());
        assert!(state.pearls.iter().all(|p| p.id != id));
        assert!(state.score >= 10);
        assert!(state.events.iter().any(|e| matches!(
            e,
            GameEvent::PearlCollected {
                kind: PearlKind::Normal,
                points: 10,
                ..
            }
        )));
    }

    #[test]
    fn test_giant_pearl_grants_harpoon() {
        let mut state = GameState::new(8, quiet_settings());
        let at = state.player.pos();
        let id = state.next_entity_id();
        let mut rng = Pcg32::seed_from_u64(0);
        state.pearls.push(Pearl::new(id, PearlKind::Giant, at, &mut rng));

        tick(&mut state, &TickInput::default());
        assert!(state.player.has_harpoon());
        assert_eq!(state.player.harpoon_ticks, state.settings.harpoon_ticks);
        assert!(state.events.contains(&GameEvent::HarpoonGained));
    }

    #[test]
    fn test_armed_diver_scares_enemy() {
        let mut state = GameState::new(9, quiet_settings());
        let at = state.player.pos();
        let id = state.next_entity_id();
        let mut enemy = Enemy::new(id, EnemyKind::Jellyfish, at, 0.0, 150.0, &mut state.rng);
        // Touching, but the diver is invulnerable
        enemy.body.pos += Vec2::new(0.0, 0.5);
        state.enemies.push(enemy);
        state.player.give_harpoon(300);
        state.player.invulnerable_ticks = 1000;

        tick(&mut state, &TickInput::default());
        assert!(state.events.contains(&GameEvent::EnemyFeared { enemy_id: id }));
        assert!(state.enemies[0].is_feared());
    }

    #[test]
    fn test_enemy_contact_costs_a_life_once() {
        let mut state = GameState::new(10, quiet_settings());
        let at = state.player.pos();
        let id = state.next_entity_id();
        let enemy = Enemy::new(id, EnemyKind::Shark, at, 0.0, 150.0, &mut state.rng);
        state.enemies.push(enemy);

        tick(&mut state, &TickInput::default());
        assert_eq!(state.lives, 2);
        assert!(state.player.is_invulnerable());
        assert!(state.events.contains(&GameEvent::PlayerHit { lives_left: 2 }));

        // Still overlapping, but invulnerable
        tick(&mut state, &TickInput::default());
        assert_eq!(state.lives, 2);
    }

    #[test]
    fn test_last_life_ends_game() {
        let mut state = GameState::new(11, quiet_settings());
        state.lives = 1;
        let at = state.player.pos();
        let id = state.next_entity_id();
        let enemy = Enemy::new(id, EnemyKind::Shark, at, 0.0, 150.0, &mut state.rng);
        state.enemies.push(enemy);

        tick(&mut state, &TickInput::default());
        assert_eq!(state.lives, 0);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.events.contains(&GameEvent::GameOver));

        let ticks = state.time_ticks;
        tick(&mut state, &TickInput::default());
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_last_pearl_wins() {
        let mut state = GameState::new(12, quiet_settings());
        state.pearls.clear();
        let at = state.player.pos();
        let id = state.next_entity_id();
        let mut rng = Pcg32::seed_from_u64(0);
        state.pearls.push(Pearl::new(id, PearlKind::Normal, at, &mut rng));

        tick(&mut state, &TickInput::default());
        assert_eq!(state.phase, GamePhase::Victory);
        // 10 for the pearl, 1000 + 200 * 3 bonus
        assert_eq!(state.score, 1610);
        assert!(state.events.contains(&GameEvent::Victory { bonus: 1600 }));
    }

    #[test]
    fn test_autopilot_collects_pearls() {
        let settings = GameSettings {
            enemy_count: 0,
            pearl_count: 3,
            giant_pearl_count: 0,
            ..Default::default()
        };
        let mut state = GameState::new(2024, settings);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..20_000 {
            tick(&mut state, &input);
            if state.phase.is_finished() {
                break;
            }
        }
        assert_eq!(state.phase, GamePhase::Victory);
        assert_eq!(state.pearls_remaining(), 0);
    }

    #[test]
    fn test_autopilot_waypoint_follows_corridor() {
        let maze = MazeGrid::from_rows(&["#####", "#...#", "###.#", "#...#", "#####"]);
        let from = MazeGrid::cell_center(1, 1);
        let target = MazeGrid::cell_center(1, 3);
        assert_eq!(
            autopilot_waypoint(&maze, from, target),
            MazeGrid::cell_center(2, 1)
        );
        // Same cell: aim straight at the target
        let near = from + Vec2::new(5.0, 5.0);
        assert_eq!(autopilot_waypoint(&maze, from, near), near);
    }

    fn arb_move() -> impl Strategy<Value = MoveInput> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(left, right, up, down)| MoveInput {
                left,
                right,
                up,
                down,
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_entities_never_enter_coral(
            seed in any::<u64>(),
            moves in prop::collection::vec(arb_move(), 1..40),
        ) {
            let mut state = GameState::new(seed, GameSettings::default());
            state.lives = u8::MAX;
            for step in 0..400 {
                let input = TickInput {
                    movement: moves[step % moves.len()],
                    ..Default::default()
                };
                tick(&mut state, &input);
                prop_assert!(!state.maze.is_wall(state.player.pos()));
                for enemy in &state.enemies {
                    prop_assert!(!state.maze.is_wall(enemy.pos()));
                }
            }
        }
    }
}
