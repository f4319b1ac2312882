//! Frame-based animation metadata and deterministic tick logic.
//!
//! Clips are measured in 60 Hz frames rather than wall-clock time. The
//! simulation advances them by `time_mult` (1.0 == one reference frame), so a
//! clip plays at the same speed regardless of the display refresh rate.
//!
//! Metadata files group the clips of one actor family (e.g. `Enemy/Turtle`)
//! together with the bounding box used for its hitbox. A registry file bundles
//! many metadata entries so a level can ship a single JSON document.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A named sequence of frames that can loop or play once.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub frame_count: u32,
    /// Duration of a single frame, in reference frames.
    pub frame_duration: f32,
    pub looping: bool,
}

impl AnimationClip {
    /// Total duration of one full cycle in reference frames.
    pub fn total_duration(&self) -> f32 {
        self.frame_count as f32 * self.frame_duration
    }
}

/// All clips of one actor family plus its collision box.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub path: String,
    pub bounding_box: (u32, u32),
    pub animations: HashMap<String, AnimationClip>,
}

impl Metadata {
    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.animations.get(name)
    }
}

/// Runtime state for one active animation instance.
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub clip_name: String,
    pub frame_index: u32,
    pub elapsed: f32,
    pub finished: bool,
}

impl AnimationState {
    pub fn new(clip_name: &str) -> Self {
        Self {
            clip_name: clip_name.to_string(),
            frame_index: 0,
            elapsed: 0.0,
            finished: false,
        }
    }

    /// Advance by `time_mult` reference frames. Returns the current frame index.
    pub fn tick(&mut self, time_mult: f32, clip: &AnimationClip) -> u32 {
        if clip.frame_count == 0 || self.finished {
            return self.frame_index;
        }

        self.elapsed += time_mult;

        while self.elapsed >= clip.frame_duration {
            self.elapsed -= clip.frame_duration;
            self.frame_index += 1;

            if self.frame_index >= clip.frame_count {
                if clip.looping {
                    self.frame_index = 0;
                } else {
                    self.frame_index = clip.frame_count - 1;
                    self.elapsed = 0.0;
                    self.finished = true;
                    break;
                }
            }
        }

        self.frame_index
    }
}

// --- JSON deserialization types (private) ---

#[derive(Debug, Deserialize)]
struct MetadataRegistryJson {
    version: String,
    metadata: Vec<MetadataJson>,
}

#[derive(Debug, Deserialize)]
struct MetadataJson {
    path: String,
    #[serde(default = "default_bounding_box")]
    bounding_box: (u32, u32),
    animations: HashMap<String, AnimationClipJson>,
}

#[derive(Debug, Deserialize)]
struct AnimationClipJson {
    frame_count: u32,
    #[serde(default = "default_frame_duration")]
    frame_duration: f32,
    #[serde(default)]
    looping: bool,
}

const fn default_bounding_box() -> (u32, u32) {
    (24, 24)
}

const fn default_frame_duration() -> f32 {
    5.0
}

/// Load a metadata registry from disk.
pub fn load_metadata_registry(path: &Path) -> Result<Vec<Metadata>, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read metadata registry {}: {e}", path.display()))?;
    parse_metadata_registry(&raw)
        .map_err(|e| format!("Failed to load metadata registry {}: {e}", path.display()))
}

/// Parse a metadata registry from a JSON string.
pub fn parse_metadata_registry(raw: &str) -> Result<Vec<Metadata>, String> {
    let json: MetadataRegistryJson =
        serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    validate_registry_json(&json)?;

    Ok(json
        .metadata
        .into_iter()
        .map(|entry| Metadata {
            path: entry.path,
            bounding_box: entry.bounding_box,
            animations: entry
                .animations
                .into_iter()
                .map(|(name, clip)| {
                    (
                        name,
                        AnimationClip {
                            frame_count: clip.frame_count,
                            frame_duration: clip.frame_duration,
                            looping: clip.looping,
                        },
                    )
                })
                .collect(),
        })
        .collect())
}

fn validate_registry_json(json: &MetadataRegistryJson) -> Result<(), String> {
    if json.version != "0.1" {
        return Err(format!(
            "Metadata validation failed: unsupported version '{}'",
            json.version
        ));
    }
    for entry in &json.metadata {
        if entry.path.is_empty() {
            return Err("Metadata validation failed: path is empty".to_string());
        }
        for (name, clip) in &entry.animations {
            if clip.frame_count == 0 {
                return Err(format!(
                    "Metadata validation failed: '{}' clip '{}' has no frames",
                    entry.path, name
                ));
            }
            if clip.frame_duration <= 0.0 {
                return Err(format!(
                    "Metadata validation failed: '{}' clip '{}' has zero duration",
                    entry.path, name
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "jj_anim_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn make_clip(frame_count: u32, frame_duration: f32, looping: bool) -> AnimationClip {
        AnimationClip {
            frame_count,
            frame_duration,
            looping,
        }
    }

    #[test]
    fn tick_advances_through_frames() {
        let clip = make_clip(3, 5.0, true);
        let mut state = AnimationState::new("Walk");

        assert_eq!(state.tick(0.0, &clip), 0);
        assert_eq!(state.tick(3.0, &clip), 0);
        assert_eq!(state.tick(3.0, &clip), 1);
    }

    #[test]
    fn looping_wraps_around() {
        let clip = make_clip(2, 5.0, true);
        let mut state = AnimationState::new("Idle");

        assert_eq!(state.tick(12.0, &clip), 0);
        assert!(!state.finished);
    }

    #[test]
    fn non_looping_stops_on_last_frame() {
        let clip = make_clip(2, 5.0, false);
        let mut state = AnimationState::new("Withdraw");

        assert_eq!(state.tick(15.0, &clip), 1);
        assert!(state.finished);

        assert_eq!(state.tick(10.0, &clip), 1);
        assert!(state.finished);
    }

    #[test]
    fn half_speed_frames_take_twice_as_many_ticks() {
        let clip = make_clip(4, 2.0, false);
        let mut full = AnimationState::new("Attack");
        let mut half = AnimationState::new("Attack");

        let mut full_ticks = 0;
        while !full.finished {
            full.tick(1.0, &clip);
            full_ticks += 1;
        }
        let mut half_ticks = 0;
        while !half.finished {
            half.tick(0.5, &clip);
            half_ticks += 1;
        }
        assert_eq!(full_ticks, 8);
        assert_eq!(half_ticks, 16);
    }

    #[test]
    fn load_metadata_registry_parses_valid_json() {
        let path = temp_file_path("valid");
        let json = r#"
        {
          "version": "0.1",
          "metadata": [
            {
              "path": "Enemy/Turtle",
              "bounding_box": [28, 30],
              "animations": {
                "Walk": { "frame_count": 8, "frame_duration": 4.0, "looping": true },
                "Withdraw": { "frame_count": 5 }
              }
            }
          ]
        }
        "#;
        fs::write(&path, json).expect("write temp file");

        let registry = load_metadata_registry(&path).expect("should parse");
        assert_eq!(registry.len(), 1);
        let turtle = &registry[0];
        assert_eq!(turtle.path, "Enemy/Turtle");
        assert_eq!(turtle.bounding_box, (28, 30));

        let walk = turtle.clip("Walk").expect("walk clip");
        assert!(walk.looping);
        assert_eq!(walk.frame_count, 8);

        let withdraw = turtle.clip("Withdraw").expect("withdraw clip");
        assert!(!withdraw.looping);
        assert!((withdraw.frame_duration - 5.0).abs() < f32::EPSILON);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn registry_rejects_bad_version() {
        let err = parse_metadata_registry(r#"{ "version": "9.9", "metadata": [] }"#)
            .expect_err("bad version should fail");
        assert!(err.contains("unsupported version"));
    }

    #[test]
    fn registry_rejects_empty_clip() {
        let err = parse_metadata_registry(
            r#"{ "version": "0.1", "metadata": [
                { "path": "Object/Spring", "animations": { "Idle": { "frame_count": 0 } } }
            ] }"#,
        )
        .expect_err("empty clip should fail");
        assert!(err.contains("has no frames"));
    }

    #[test]
    fn total_duration() {
        let clip = make_clip(6, 2.5, true);
        assert!((clip.total_duration() - 15.0).abs() < f32::EPSILON);
    }
}
