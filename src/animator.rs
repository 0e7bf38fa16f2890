//! Frame-by-frame sprite animation state machine
//!
//! Plays one named animation at a time on an elapsed-time accumulator,
//! resolves weighted and exit branching per frame, renders layers through
//! [`Stage`], triggers per-frame sounds and reports terminal states as
//! [`AnimationSignal`] values.
//!
//! Terminal signaling is two-phase: an animation whose descriptor sets
//! `use_exit_branching` holds at its last frame (`Waiting`) until it is told
//! to exit, letting a caller act (e.g. slide the agent) before the animation
//! runs its exit frames and reports `Exited`.

use std::sync::Arc;
use std::time::Duration;

use crate::audio::AudioPlayer;
use crate::data::{AgentData, Frame};
use crate::random::SharedRandom;
use crate::stage::Stage;

/// Terminal state reported when an animation reaches its last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    /// The last frame was reached but the animation uses exit branching and
    /// has not been told to exit; it holds until `exit_animation`.
    Waiting,
    /// The animation reached its last frame and is done.
    Exited,
}

/// A terminal-state report: which animation, and how it ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSignal {
    pub animation: String,
    pub state: AnimationState,
}

/// How `resume` treats the remainder of the frame that was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// Re-run the frame advance immediately on resume. Pausing mid-frame
    /// and resuming causes an immediate extra advance.
    #[default]
    Advance,
    /// Keep displaying the interrupted frame for its remaining time.
    Preserve,
}

/// The animation state machine.
///
/// The frame clock starts on the first successful `show_animation` and then
/// persists across animation switches: switching only replaces the session
/// (animation, frame index, snapshot), so the first frame of the new
/// animation shows when the already-armed tick elapses.
pub struct Animator {
    data: Arc<AgentData>,
    rng: SharedRandom,
    current: Option<String>,
    frame_index: usize,
    frame: Option<Frame>,
    exiting: bool,
    started: bool,
    paused: bool,
    elapsed: Duration,
    armed: Duration,
    resume_mode: ResumeMode,
    signals: Vec<AnimationSignal>,
}

impl Animator {
    pub fn new(data: Arc<AgentData>, rng: SharedRandom) -> Self {
        Self {
            data,
            rng,
            current: None,
            frame_index: 0,
            frame: None,
            exiting: false,
            started: false,
            paused: false,
            elapsed: Duration::ZERO,
            armed: Duration::ZERO,
            resume_mode: ResumeMode::default(),
            signals: Vec::new(),
        }
    }

    pub fn set_resume_mode(&mut self, mode: ResumeMode) {
        self.resume_mode = mode;
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.data.has_animation(name)
    }

    /// All animation names.
    pub fn animations(&self) -> Vec<String> {
        self.data.animation_names()
    }

    /// Name of the animation currently playing, if any.
    pub fn current_animation(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Request that the current animation take its exit path at the next
    /// frame advance. Does not stop playback by itself.
    pub fn exit_animation(&mut self) {
        self.exiting = true;
    }

    /// Start playing `name` from frame 0. Returns `false` without touching
    /// any state when the animation is unknown.
    pub fn show_animation(
        &mut self,
        name: &str,
        stage: &mut dyn Stage,
        audio: &mut dyn AudioPlayer,
    ) -> bool {
        if !self.data.has_animation(name) {
            log::debug!("unknown animation '{name}'");
            return false;
        }

        self.current = Some(name.to_string());
        self.frame_index = 0;
        self.frame = None;
        self.exiting = false;

        if !self.started {
            self.started = true;
            self.step(stage, audio);
        }
        true
    }

    /// Advance the frame clock by `delta` and return any terminal signals
    /// produced, in order.
    pub fn update(
        &mut self,
        delta: Duration,
        stage: &mut dyn Stage,
        audio: &mut dyn AudioPlayer,
    ) -> Vec<AnimationSignal> {
        if self.started && !self.paused && self.current.is_some() {
            self.elapsed += delta;
            while self.elapsed >= self.armed {
                self.elapsed -= self.armed;
                self.step(stage, audio);
                if self.armed.is_zero() {
                    // Zero-duration frame: advance once per update.
                    self.elapsed = Duration::ZERO;
                    break;
                }
            }
        }
        self.take_signals()
    }

    /// Drain signals produced outside `update` (immediate first step,
    /// resume).
    pub fn take_signals(&mut self) -> Vec<AnimationSignal> {
        std::mem::take(&mut self.signals)
    }

    /// Halt the frame clock without resetting session state.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Restart frame advancement. In [`ResumeMode::Advance`] the advance
    /// algorithm runs immediately rather than waiting out the remainder of
    /// the interrupted frame.
    pub fn resume(&mut self, stage: &mut dyn Stage, audio: &mut dyn AudioPlayer) {
        if !self.paused {
            return;
        }
        self.paused = false;
        if self.resume_mode == ResumeMode::Advance && self.started && self.current.is_some() {
            self.elapsed = Duration::ZERO;
            self.step(stage, audio);
        }
    }

    /// One frame advance: pick the next index, commit the frame snapshot
    /// (unless holding at the last frame of an exit-branching animation),
    /// render, trigger sound, re-arm the clock and report terminal states.
    fn step(&mut self, stage: &mut dyn Stage, audio: &mut dyn AudioPlayer) {
        let data = Arc::clone(&self.data);
        let Some(name) = self.current.clone() else {
            return;
        };
        let Some(animation) = data.animations.get(&name) else {
            return;
        };
        if animation.frames.is_empty() {
            return;
        }

        let last = animation.frames.len() - 1;
        let new_index = self.next_frame_index().min(last);
        let frame_changed = self.frame.is_none() || self.frame_index != new_index;
        self.frame_index = new_index;

        let at_last = self.frame_index >= last;
        if !(at_last && animation.use_exit_branching && !self.exiting) {
            self.frame = Some(animation.frames[self.frame_index].clone());
        }

        self.draw(stage);
        self.play_frame_sound(audio);

        self.armed = self
            .frame
            .as_ref()
            .map(|f| Duration::from_millis(f.duration))
            .unwrap_or(Duration::ZERO);

        if frame_changed && at_last {
            let state = if animation.use_exit_branching && !self.exiting {
                AnimationState::Waiting
            } else {
                AnimationState::Exited
            };
            self.signals.push(AnimationSignal {
                animation: name,
                state,
            });
        }
    }

    /// Next frame index per the branching rules. Exit branching takes
    /// priority; weighted branches fall through to sequential advance when
    /// the draw lands past their summed weights.
    fn next_frame_index(&self) -> usize {
        let Some(frame) = self.frame.as_ref() else {
            return 0;
        };

        if self.exiting {
            if let Some(target) = frame.exit_branch {
                return target;
            }
        }

        if let Some(branching) = frame.branching.as_ref() {
            let mut draw = self.rng.lock().next_percent();
            for branch in &branching.branches {
                if f64::from(branch.weight) > draw {
                    return branch.frame_index;
                }
                draw -= f64::from(branch.weight);
            }
        }

        self.frame_index + 1
    }

    /// Place every display layer for the committed frame; layers past the
    /// frame's image list are hidden.
    fn draw(&self, stage: &mut dyn Stage) {
        let images: &[[u32; 2]] = self
            .frame
            .as_ref()
            .map(|f| f.images.as_slice())
            .unwrap_or(&[]);
        for layer in 0..self.data.overlay_count {
            match images.get(layer) {
                Some(&offset) => stage.show_layer(layer, offset),
                None => stage.hide_layer(layer),
            }
        }
    }

    fn play_frame_sound(&self, audio: &mut dyn AudioPlayer) {
        let Some(sound) = self.frame.as_ref().and_then(|f| f.sound.as_deref()) else {
            return;
        };
        if let Err(err) = audio.play(sound) {
            log::debug!("sound '{sound}' playback failed: {err}");
        }
    }
}
