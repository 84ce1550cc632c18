//! Coral Maze entry point
//!
//! Headless demo runner: builds a level, lets the autopilot dive for pearls
//! and prints a JSON summary of the run.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::{Path, PathBuf};

    use clap::Parser;
    use serde::Serialize;

    use coral_maze::consts::TICK_RATE;
    use coral_maze::highscores::HighScores;
    use coral_maze::sim::{GameEvent, GamePhase, GameState, TickInput, tick};
    use coral_maze::{Difficulty, GameSettings};

    /// Default run length: two minutes of game time
    const DEFAULT_TICKS: u64 = 120 * TICK_RATE as u64;

    /// Play one level with the autopilot and print a JSON summary
    #[derive(Parser, Debug)]
    #[command(author, version, about)]
    pub struct Cli {
        /// Level seed (defaults to the clock)
        #[arg(long)]
        seed: Option<u64>,
        /// Stop after this many ticks
        #[arg(long, default_value_t = DEFAULT_TICKS)]
        ticks: u64,
        /// Difficulty preset: relaxed, normal or hard
        #[arg(long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
        /// JSON settings file
        #[arg(long)]
        settings: Option<PathBuf>,
        /// JSON leaderboard file to record the run in
        #[arg(long)]
        scores: Option<PathBuf>,
    }

    fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
        Difficulty::from_str(s).ok_or_else(|| format!("unknown difficulty: {}", s))
    }

    /// What the run looked like, for scripts
    #[derive(Debug, Serialize)]
    pub struct RunSummary {
        seed: u64,
        difficulty: &'static str,
        maze_width: usize,
        maze_height: usize,
        open_cells: usize,
        phase: GamePhase,
        ticks: u64,
        seconds: f32,
        score: u64,
        lives: u8,
        pearls_collected: usize,
        pearls_total: usize,
        hits_taken: u32,
        enemies_feared: u32,
        /// Leaderboard rank, when a score file was given and the run placed
        rank: Option<usize>,
    }

    /// Settings file if given, otherwise the difficulty preset
    fn resolve_settings(cli: &Cli) -> GameSettings {
        match (&cli.settings, cli.difficulty) {
            (Some(path), Some(difficulty)) => {
                log::warn!(
                    "--difficulty {} ignored, using values from {}",
                    difficulty.as_str(),
                    path.display()
                );
                GameSettings::load(path)
            }
            (Some(path), None) => GameSettings::load(path),
            (None, Some(difficulty)) => GameSettings::from_difficulty(difficulty),
            (None, None) => GameSettings::default(),
        }
    }

    pub fn play(cli: &Cli) -> RunSummary {
        let seed = cli.seed.unwrap_or_else(clock_seed);
        let mut state = GameState::new(seed, resolve_settings(cli));
        log::info!("Game initialized with seed: {}", seed);

        let mut hits_taken = 0;
        let mut enemies_feared = 0;
        let mut frame = 0;
        while !state.phase.is_finished() {
            let input = TickInput {
                idle_mode: true,
                quit: frame >= cli.ticks,
                ..Default::default()
            };
            tick(&mut state, &input);
            frame += 1;

            for event in &state.events {
                match event {
                    GameEvent::PlayerHit { .. } => hits_taken += 1,
                    GameEvent::EnemyFeared { .. } => enemies_feared += 1,
                    GameEvent::HarpoonGained => log::debug!("Harpoon at tick {}", state.time_ticks),
                    _ => {}
                }
            }
        }

        let rank = match &cli.scores {
            Some(path) => record_score(path, &state),
            None => None,
        };

        RunSummary {
            seed,
            difficulty: state.settings.difficulty.as_str(),
            maze_width: state.maze.width(),
            maze_height: state.maze.height(),
            open_cells: state.maze.open_cell_count(),
            phase: state.phase,
            ticks: state.time_ticks,
            seconds: state.time_ticks as f32 / TICK_RATE as f32,
            score: state.score,
            lives: state.lives,
            pearls_collected: state.total_pearls() - state.pearls_remaining(),
            pearls_total: state.total_pearls(),
            hits_taken,
            enemies_feared,
            rank,
        }
    }

    pub fn run(cli: &Cli) -> Result<(), serde_json::Error> {
        let summary = play(cli);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }

    /// Add the run to the leaderboard file, returning the rank it placed at
    fn record_score(path: &Path, state: &GameState) -> Option<usize> {
        let mut scores = HighScores::load(path);
        let completed = state.phase == GamePhase::Victory;
        let rank = scores.add_score(state.score, completed, clock_seed())?;
        if let Err(e) = scores.save(path) {
            log::warn!("Could not save high scores to {}: {}", path.display(), e);
        }
        log::info!("New high score #{}: {}", rank, state.score);
        Some(rank)
    }

    fn clock_seed() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::init();
    log::info!("Coral Maze (headless) starting...");

    let cli = native::Cli::parse();
    if let Err(e) = native::run(&cli) {
        log::error!("Could not write summary: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless runner only; the simulation is used as a library on the web
}
