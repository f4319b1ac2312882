//! Scripted input sequences for headless runs.

use glam::Vec2;
use jj_core::input::{PlayerAction, ProcessedInput, MAX_PLAYERS};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct InputScript {
    /// Frame multiplier fed to every update; 1.0 is one 60 Hz frame.
    #[serde(default = "default_time_mult")]
    pub time_mult: f32,
    pub frames: Vec<ScriptFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScriptFrame {
    #[serde(default)]
    pub player: u8,
    #[serde(default)]
    pub actions: Vec<PlayerAction>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl InputScript {
    /// One input per frame for `player`, repeats unrolled.
    pub fn expanded_inputs(&self, player: u8) -> Vec<ProcessedInput> {
        let mut out = Vec::new();
        for frame in self.frames.iter().filter(|f| f.player == player) {
            let mut input = frame
                .actions
                .iter()
                .fold(ProcessedInput::default(), |input, &action| input.with(action));
            input.movement = digital_movement(&frame.actions);
            for _ in 0..frame.repeat.max(1) {
                out.push(input);
            }
        }
        out
    }

    pub fn players(&self) -> impl Iterator<Item = u8> + '_ {
        (0..MAX_PLAYERS as u8).filter(|&p| self.frames.iter().any(|f| f.player == p))
    }
}

pub fn load_input_script_from_path(path: &Path) -> Result<InputScript, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let script: InputScript = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse input script JSON {}: {e}", path.display()))?;
    validate_input_script(&script)?;
    Ok(script)
}

fn validate_input_script(script: &InputScript) -> Result<(), String> {
    if script.time_mult <= 0.0 {
        return Err("Input script validation failed: time_mult must be > 0".to_string());
    }
    if script.frames.is_empty() {
        return Err("Input script validation failed: frames list is empty".to_string());
    }
    if let Some(frame) = script.frames.iter().find(|f| f.player as usize >= MAX_PLAYERS) {
        return Err(format!(
            "Input script validation failed: player {} out of range",
            frame.player
        ));
    }
    Ok(())
}

/// Scripts only name buttons, so directions map to full-scale axes.
fn digital_movement(actions: &[PlayerAction]) -> Vec2 {
    let axis = |negative, positive| {
        if actions.contains(&positive) {
            1.0
        } else if actions.contains(&negative) {
            -1.0
        } else {
            0.0
        }
    };
    Vec2::new(
        axis(PlayerAction::Left, PlayerAction::Right),
        axis(PlayerAction::Up, PlayerAction::Down),
    )
}

const fn default_time_mult() -> f32 {
    1.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::player::Player;
    use crate::actors::test_support::{floor_level, spawn, FLOOR_Y};
    use crate::actors::ActorKind;
    use crate::config::PlayerType;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "jj_script_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn script_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "actions": ["Right"], "repeat": 3 },
                { "actions": ["Right", "Jump"] },
                { "player": 1, "actions": ["Fire"], "repeat": 2 }
              ]
            }"#,
        )
        .expect("write script file");

        let script = load_input_script_from_path(&path).expect("script should load");
        assert_eq!(script.time_mult, 1.0);
        let expanded = script.expanded_inputs(0);
        assert_eq!(expanded.len(), 4);
        assert_eq!(
            expanded[3].pressed_actions,
            PlayerAction::Right.bit() | PlayerAction::Jump.bit()
        );
        assert_eq!(expanded[0].movement, Vec2::new(1.0, 0.0));
        assert_eq!(script.expanded_inputs(1)[0].movement, Vec2::ZERO);
        assert_eq!(script.expanded_inputs(1).len(), 2);
        assert_eq!(script.players().collect::<Vec<_>>(), vec![0, 1]);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn script_validation_rejects_bad_values() {
        let path = temp_file_path("invalid");
        fs::write(&path, r#"{ "time_mult": 0.0, "frames": [ {} ] }"#).expect("write script file");
        let err = load_input_script_from_path(&path).expect_err("zero time_mult");
        assert!(err.contains("time_mult"));

        fs::write(&path, r#"{ "frames": [ { "player": 9 } ] }"#).expect("write script file");
        let err = load_input_script_from_path(&path).expect_err("player out of range");
        assert!(err.contains("player 9"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn scripted_run_is_deterministic() {
        let script: InputScript = serde_json::from_str(
            r#"{
              "frames": [
                { "actions": ["Right"], "repeat": 60 },
                { "actions": ["Right", "Jump"], "repeat": 1 },
                { "actions": ["Right"], "repeat": 120 },
                { "actions": ["Left", "Fire"], "repeat": 45 }
              ]
            }"#,
        )
        .expect("script parses");
        let inputs = script.expanded_inputs(0);

        let run = || {
            let mut level = floor_level();
            let handle = spawn(
                &mut level,
                ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
                Vec2::new(100.0, FLOOR_Y - 20.0),
            );
            for input in &inputs {
                level.set_player_input(0, *input);
                level.update(script.time_mult);
            }
            let actor = level.actor(handle).expect("player survives");
            (actor.base.pos, actor.base.speed, level.actor_count(), level.rng().next_f32())
        };

        let (pos_a, speed_a, count_a, rng_a) = run();
        let (pos_b, speed_b, count_b, rng_b) = run();
        assert!((pos_a - pos_b).length() < 0.0001);
        assert!((speed_a - speed_b).length() < 0.0001);
        assert_eq!(count_a, count_b);
        assert_eq!(rng_a, rng_b);
    }
}
