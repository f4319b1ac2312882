//! Headless level runner.
//!
//! Loads a level description, spawns the players, feeds a scripted input
//! sequence frame by frame and logs what happened:
//!
//! ```text
//! jj_game [level.json] [input_script.json] [save_state.bin]
//! ```
//!
//! `RUST_LOG=debug` shows per-frame sounds and HUD messages.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use jj_core::input::ProcessedInput;
use jj_core::time::{FrameClock, REFERENCE_FPS};
use jj_game::config::{load_level_from_path, GameDifficulty, LevelInitialization, PlayerType};
use jj_game::level_handler::{load_level_content, LevelHandler};
use jj_game::replay::load_input_script_from_path;

const DEFAULT_LEVEL_PATH: &str = "assets/levels/demo/01_beach.json";
const DEFAULT_SCRIPT_PATH: &str = "assets/scripts/demo_input.json";
const DEFAULT_SEED: u64 = 0x4A4A_3200;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let level_path = PathBuf::from(args.first().map_or(DEFAULT_LEVEL_PATH, String::as_str));
    let script_path = PathBuf::from(args.get(1).map_or(DEFAULT_SCRIPT_PATH, String::as_str));
    let save_path = args.get(2).map(PathBuf::from);

    let script = load_input_script_from_path(&script_path)?;
    let file = load_level_from_path(&level_path)?;
    let content = load_level_content(&file, &level_path)?;

    let mut init = LevelInitialization::new(&file.episode, &file.name, GameDifficulty::Normal)
        .with_player(PlayerType::Jazz, file.config.default_lives);
    init.seed = DEFAULT_SEED;
    for (slot, player) in script.players().filter(|&p| p > 0).enumerate() {
        let player_type = [PlayerType::Spaz, PlayerType::Lori, PlayerType::Jazz][slot % 3];
        init.players[player as usize] = init.players[0].map(|mut carry| {
            carry.player_type = player_type;
            carry
        });
    }

    let mut level = LevelHandler::from_file(&init, file, content)?;
    level.begin_play();

    let players: Vec<u8> = script.players().collect();
    let inputs: Vec<Vec<ProcessedInput>> = players.iter().map(|&p| script.expanded_inputs(p)).collect();
    let frame_count = inputs.iter().map(Vec::len).max().unwrap_or(0);
    log::info!(
        "Running {} frame(s) of {} for {} player(s)",
        frame_count,
        script_path.display(),
        players.len()
    );

    // Scripted runs feed a fixed delta, so the clock only applies the cap.
    let mut clock = FrameClock::new();
    let frame_dt = f64::from(script.time_mult / REFERENCE_FPS);
    let mut sound_count = 0;
    for frame in 0..frame_count {
        for (&player, player_inputs) in players.iter().zip(&inputs) {
            let input = player_inputs.get(frame).copied().unwrap_or_default();
            level.set_player_input(player, input);
        }
        level.update(clock.advance(frame_dt));

        for sound in level.take_sounds() {
            log::debug!("[{frame}] sound {} at ({}, {})", sound.name, sound.pos.x, sound.pos.y);
            sound_count += 1;
        }
        for message in level.take_hud_messages() {
            log::debug!("[{frame}] hud {message:?}");
        }

        if let Some(next) = level.take_next_level() {
            log::info!(
                "Level finished on frame {frame}, next: \"{}/{}\"",
                next.episode_name,
                next.level_name
            );
            break;
        }
        if level.is_game_over() {
            log::info!("Game over on frame {frame}");
            break;
        }
    }

    log_summary(&level, &clock, sound_count);

    if let Some(path) = save_path {
        save_state(&level, &path)?;
    }
    Ok(())
}

fn log_summary(level: &LevelHandler, clock: &FrameClock, sound_count: usize) {
    log::info!(
        "Ran {} frame(s) at {:.0} fps: {} actor(s) alive, {sound_count} sound(s), state {:?}",
        clock.frame_count,
        clock.smoothed_fps,
        level.actor_count(),
        level.state()
    );
    for &handle in level.players() {
        let Some(actor) = level.actor(handle) else {
            continue;
        };
        let Some(player) = actor.kind.as_player() else {
            continue;
        };
        log::info!(
            "Player {} ({:?}) at ({:.1}, {:.1}): score {}, lives {}, health {}, gems {:?}",
            player.index(),
            player.player_type(),
            actor.base.pos.x,
            actor.base.pos.y,
            player.score(),
            player.lives(),
            actor.base.health,
            player.gems()
        );
    }
    for viewport in level.viewports() {
        log::info!(
            "Camera {} centred on ({:.0}, {:.0})",
            viewport.player_index,
            viewport.camera.position.x,
            viewport.camera.position.y
        );
    }
}

fn save_state(level: &LevelHandler, path: &Path) -> Result<(), String> {
    let data = level.serialize_resumable();
    fs::write(path, &data).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    log::info!("Saved {} byte(s) of resumable state to {}", data.len(), path.display());
    Ok(())
}
