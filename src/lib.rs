//! Animated desktop-assistant character engine
//!
//! Renders a sprite-sheet character that plays animations, speaks in a
//! balloon and moves around a host surface.
//!
//! # Architecture
//!
//! The engine consists of:
//! - A serial action queue (one action at a time, FIFO)
//! - A frame-by-frame animation state machine with weighted branching and
//!   two-phase exit semantics (WAITING / EXITED)
//! - A speech-balloon word-reveal timer with hold and streaming modes
//! - An orchestrator composing the three, with idle fallback, per-action
//!   timeouts and pause/resume
//!
//! # Timing
//!
//! Everything runs on one logical timeline: the host calls
//! [`Agent::update`] once per frame with the elapsed time, and every
//! internal clock (frame advance, word reveal, auto-hide, play timeout,
//! movement interpolation) is an accumulator over those deltas. Terminal
//! conditions come back as event values from `update`.
//!
//! Rendering and sound output are host concerns behind the [`Stage`] and
//! [`AudioPlayer`] traits.

pub mod agent;
pub mod animator;
pub mod audio;
pub mod balloon;
pub mod data;
pub mod motion;
pub mod queue;
pub mod random;
pub mod stage;

pub use agent::{Agent, AgentEvent, SpeakOptions, SpeechSynth};
pub use animator::{AnimationSignal, AnimationState, Animator, ResumeMode};
pub use audio::{AudioError, AudioPlayer, NullAudio, RodioPlayer};
pub use balloon::{Balloon, BalloonEvent};
pub use data::{AgentData, Animation, Branch, Branching, DataError, Frame, TtsConfig};
pub use motion::{swing, Direction, Tween};
pub use queue::ActionQueue;
pub use random::{shared_random, LcgRandom, RandomSource, SequenceRandom, SharedRandom};
pub use stage::{LayerOffset, NullStage, Stage};
