//! Agent animation descriptors
//!
//! The descriptor maps animation names to frame sequences. Each frame carries
//! a duration, per-layer sprite-sheet offsets, an optional sound identifier
//! and optional branching data. Descriptors arrive from an external loader as
//! JSON and are immutable once handed to an agent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Errors raised when parsing or validating a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("animation '{animation}' has no frames")]
    EmptyAnimation { animation: String },

    #[error("animation '{animation}' frame {frame}: branch target {target} out of range (frames: {len})")]
    BranchOutOfRange {
        animation: String,
        frame: usize,
        target: usize,
        len: usize,
    },

    #[error("animation '{animation}' frame {frame}: exit branch {target} out of range (frames: {len})")]
    ExitBranchOutOfRange {
        animation: String,
        frame: usize,
        target: usize,
        len: usize,
    },

    #[error("animation '{animation}' frame {frame}: branch weights sum to {sum} (max 100)")]
    WeightOverflow {
        animation: String,
        frame: usize,
        sum: u32,
    },

    #[error("descriptor parse error: {0}")]
    Parse(String),
}

/// One weighted alternative next-frame target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub frame_index: usize,
    pub weight: u8,
}

/// Stochastic branching data attached to a frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branching {
    pub branches: Vec<Branch>,
}

/// A single animation frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Display time in milliseconds.
    pub duration: u64,
    /// Sprite-sheet offsets, one per display layer. Layers beyond this list
    /// are hidden while the frame shows.
    #[serde(default)]
    pub images: Vec<[u32; 2]>,
    /// Sound identifier triggered when the frame shows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Weighted alternatives for the next frame index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branching: Option<Branching>,
    /// Next frame index taken once an exit has been requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_branch: Option<usize>,
}

/// A named, ordered frame sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub frames: Vec<Frame>,
    /// When set, reaching the last frame holds (WAITING) instead of
    /// terminating, until an exit is requested.
    #[serde(default)]
    pub use_exit_branching: bool,
}

/// Voice parameters forwarded to an external speech synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    pub rate: f32,
    pub pitch: f32,
    pub voice: String,
}

/// Full animation descriptor for one agent character.
///
/// Animations are kept in a `BTreeMap` so that name enumeration and random
/// idle selection stay deterministic under a fixed random source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentData {
    /// Number of stacked display layers the renderer provides.
    pub overlay_count: usize,
    /// Frame size in pixels, `[width, height]`.
    #[serde(rename = "framesize")]
    pub frame_size: [u32; 2],
    /// Sound identifiers referenced by frames.
    #[serde(default)]
    pub sounds: Vec<String>,
    pub animations: BTreeMap<String, Animation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<TtsConfig>,
}

impl AgentData {
    /// Parse and validate a JSON descriptor.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let data: AgentData =
            serde_json::from_str(json).map_err(|e| DataError::Parse(e.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Check structural invariants: every branch and exit-branch target must
    /// be a valid index into its own animation, and branch weights must sum
    /// to at most 100.
    pub fn validate(&self) -> Result<(), DataError> {
        for (name, animation) in &self.animations {
            let len = animation.frames.len();
            if len == 0 {
                return Err(DataError::EmptyAnimation {
                    animation: name.clone(),
                });
            }
            for (index, frame) in animation.frames.iter().enumerate() {
                if let Some(target) = frame.exit_branch {
                    if target >= len {
                        return Err(DataError::ExitBranchOutOfRange {
                            animation: name.clone(),
                            frame: index,
                            target,
                            len,
                        });
                    }
                }
                if let Some(branching) = &frame.branching {
                    let mut sum: u32 = 0;
                    for branch in &branching.branches {
                        if branch.frame_index >= len {
                            return Err(DataError::BranchOutOfRange {
                                animation: name.clone(),
                                frame: index,
                                target: branch.frame_index,
                                len,
                            });
                        }
                        sum += u32::from(branch.weight);
                    }
                    if sum > 100 {
                        return Err(DataError::WeightOverflow {
                            animation: name.clone(),
                            frame: index,
                            sum,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a named animation exists.
    pub fn has_animation(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    /// All animation names, in sorted order.
    pub fn animation_names(&self) -> Vec<String> {
        self.animations.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_json() -> &'static str {
        r#"{
            "overlayCount": 2,
            "framesize": [124, 93],
            "sounds": ["1", "2"],
            "animations": {
                "Wave": {
                    "frames": [
                        {"duration": 100, "images": [[0, 0]], "sound": "1"},
                        {"duration": 100, "images": [[124, 0], [0, 93]]},
                        {"duration": 100, "images": [[248, 0]],
                         "branching": {"branches": [{"frameIndex": 0, "weight": 20}]}}
                    ]
                },
                "MoveRight": {
                    "frames": [
                        {"duration": 100, "images": [[0, 186]], "exitBranch": 2},
                        {"duration": 100, "images": [[124, 186]]},
                        {"duration": 100, "images": [[248, 186]]}
                    ],
                    "useExitBranching": true
                }
            }
        }"#
    }

    #[test]
    fn test_from_json_parses_camel_case_fields() {
        let data = AgentData::from_json(descriptor_json()).unwrap();
        assert_eq!(data.overlay_count, 2);
        assert_eq!(data.frame_size, [124, 93]);
        assert_eq!(data.sounds.len(), 2);

        let wave = &data.animations["Wave"];
        assert!(!wave.use_exit_branching);
        assert_eq!(wave.frames.len(), 3);
        assert_eq!(wave.frames[0].sound.as_deref(), Some("1"));
        assert_eq!(wave.frames[1].images.len(), 2);

        let branching = wave.frames[2].branching.as_ref().unwrap();
        assert_eq!(branching.branches[0].frame_index, 0);
        assert_eq!(branching.branches[0].weight, 20);

        let mv = &data.animations["MoveRight"];
        assert!(mv.use_exit_branching);
        assert_eq!(mv.frames[0].exit_branch, Some(2));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            AgentData::from_json("not json"),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_animation() {
        let mut data = AgentData::default();
        data.animations.insert("Empty".into(), Animation::default());
        assert_eq!(
            data.validate(),
            Err(DataError::EmptyAnimation {
                animation: "Empty".into()
            })
        );
    }

    #[test]
    fn test_validate_rejects_branch_out_of_range() {
        let mut data = AgentData::default();
        data.animations.insert(
            "Bad".into(),
            Animation {
                frames: vec![Frame {
                    duration: 100,
                    branching: Some(Branching {
                        branches: vec![Branch {
                            frame_index: 5,
                            weight: 50,
                        }],
                    }),
                    ..Default::default()
                }],
                use_exit_branching: false,
            },
        );
        assert!(matches!(
            data.validate(),
            Err(DataError::BranchOutOfRange { target: 5, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_exit_branch_out_of_range() {
        let mut data = AgentData::default();
        data.animations.insert(
            "Bad".into(),
            Animation {
                frames: vec![Frame {
                    duration: 100,
                    exit_branch: Some(3),
                    ..Default::default()
                }],
                use_exit_branching: true,
            },
        );
        assert!(matches!(
            data.validate(),
            Err(DataError::ExitBranchOutOfRange { target: 3, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_weight_overflow() {
        let mut data = AgentData::default();
        data.animations.insert(
            "Bad".into(),
            Animation {
                frames: vec![
                    Frame {
                        duration: 100,
                        branching: Some(Branching {
                            branches: vec![
                                Branch {
                                    frame_index: 0,
                                    weight: 60,
                                },
                                Branch {
                                    frame_index: 1,
                                    weight: 60,
                                },
                            ],
                        }),
                        ..Default::default()
                    },
                    Frame {
                        duration: 100,
                        ..Default::default()
                    },
                ],
                use_exit_branching: false,
            },
        );
        assert!(matches!(
            data.validate(),
            Err(DataError::WeightOverflow { sum: 120, .. })
        ));
    }

    #[test]
    fn test_weights_under_100_are_valid() {
        let data = AgentData::from_json(descriptor_json()).unwrap();
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_animation_names_sorted() {
        let data = AgentData::from_json(descriptor_json()).unwrap();
        assert_eq!(data.animation_names(), vec!["MoveRight", "Wave"]);
        assert!(data.has_animation("Wave"));
        assert!(!data.has_animation("Unknown"));
    }
}
