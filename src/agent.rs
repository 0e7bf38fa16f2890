//! Agent orchestrator
//!
//! Composes the action queue, the animator and the balloon into one
//! character. Every public request becomes a queued action; the queue drains
//! one action at a time, each action driving the animator and/or balloon
//! until a terminal signal completes it. When the queue empties while the
//! agent is visible, a random idle animation plays in the background slot;
//! directed animations requested during idle defer until it exits.
//!
//! The host calls [`Agent::update`] once per frame with the elapsed time and
//! reacts to the returned [`AgentEvent`] values.

use std::sync::Arc;
use std::time::Duration;

use crate::animator::{AnimationSignal, AnimationState, Animator, ResumeMode};
use crate::audio::AudioPlayer;
use crate::balloon::{Balloon, BalloonEvent};
use crate::data::AgentData;
use crate::motion::{Direction, Tween};
use crate::queue::ActionQueue;
use crate::random::{shared_random, LcgRandom, RandomSource, SharedRandom};
use crate::stage::Stage;

/// Timeout applied by [`Agent::play`] before the animation is forced out.
pub const DEFAULT_PLAY_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default pause inserted by [`Agent::delay`].
pub const DEFAULT_DELAY: Duration = Duration::from_millis(250);
/// Default duration of [`Agent::move_to`].
pub const DEFAULT_MOVE_DURATION: Duration = Duration::from_millis(1000);

const IDLE_PREFIX: &str = "Idle";
const HIDE_ANIMATION: &str = "Hide";
const SHOW_ANIMATION: &str = "Show";

/// Events reported to the host by [`Agent::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A queued animation finished.
    AnimationFinished(String),
    /// A speech finished (all words revealed, stream done, or a held
    /// balloon closed).
    SpeechFinished,
    /// A movement reached its destination.
    MoveFinished,
    /// The hide sequence completed; the display is now hidden.
    Hidden,
}

/// Options for [`Agent::speak`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeakOptions {
    /// Keep the balloon open after the last word until `close_balloon` or
    /// `stop_current`.
    pub hold: bool,
    /// Forward the text to the speech synthesizer, if one is attached.
    pub tts: bool,
}

/// External text-to-speech collaborator.
pub trait SpeechSynth {
    fn speak(&mut self, text: &str);
    fn cancel(&mut self);
}

/// Queued action payloads. Movement captures its directional animation at
/// enqueue time, from the agent's position when the request was made.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Play {
        animation: String,
        timeout: Option<Duration>,
    },
    Speak {
        text: String,
        hold: bool,
        tts: bool,
    },
    MoveTo {
        x: f64,
        y: f64,
        duration: Duration,
        animation: Option<String>,
    },
    Delay {
        duration: Duration,
    },
}

/// State machine of the action currently holding the queue.
#[derive(Debug)]
enum ActiveAction {
    Play {
        animation: String,
        timeout: Option<Duration>,
        elapsed: Duration,
        fired: bool,
    },
    Speak,
    Move(MoveState),
    Delay {
        remaining: Duration,
    },
}

#[derive(Debug)]
enum MoveState {
    /// The Move animation is playing; waiting for its first terminal signal.
    AwaitingSignal {
        target: (f64, f64),
        duration: Duration,
    },
    /// Interpolating toward the target; `exit_after` tells the sprite to
    /// exit once the slide lands.
    Sliding {
        tween: Tween,
        exit_after: bool,
    },
}

/// Who installed the animation currently playing in the animator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SignalSink {
    #[default]
    None,
    /// The queued action.
    Action,
    /// The idle session.
    Idle,
    /// The hide sequence.
    Hide,
}

/// A request deferred until the in-flight idle animation exits.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DeferredStart {
    animation: String,
    sink: SignalSink,
}

/// Handle for an idle animation in flight, carrying the continuations to
/// flush when it exits. At most one exists at a time.
#[derive(Debug, Default)]
struct IdleSession {
    deferred: Vec<DeferredStart>,
}

/// The composed animated character.
pub struct Agent {
    data: Arc<AgentData>,
    queue: ActionQueue<Action>,
    animator: Animator,
    balloon: Balloon,
    stage: Box<dyn Stage>,
    audio: Box<dyn AudioPlayer>,
    synth: Option<Box<dyn SpeechSynth>>,
    rng: SharedRandom,
    hidden: bool,
    position: (f64, f64),
    sink: SignalSink,
    active: Option<ActiveAction>,
    idle: Option<IdleSession>,
    events: Vec<AgentEvent>,
}

impl Agent {
    /// Create an agent over a validated descriptor. The agent starts hidden;
    /// call [`Agent::show`].
    pub fn new(data: AgentData, stage: Box<dyn Stage>, audio: Box<dyn AudioPlayer>) -> Self {
        Self::with_random(data, stage, audio, LcgRandom::default())
    }

    /// Create an agent with an explicit random source, shared by branch
    /// draws and idle selection. Tests pass a fixed sequence here.
    pub fn with_random(
        data: AgentData,
        stage: Box<dyn Stage>,
        audio: Box<dyn AudioPlayer>,
        rng: impl RandomSource + Send + 'static,
    ) -> Self {
        let data = Arc::new(data);
        let rng = shared_random(rng);
        let animator = Animator::new(Arc::clone(&data), Arc::clone(&rng));
        Self {
            data,
            queue: ActionQueue::new(),
            animator,
            balloon: Balloon::new(),
            stage,
            audio,
            synth: None,
            rng,
            hidden: true,
            position: (0.0, 0.0),
            sink: SignalSink::None,
            active: None,
            idle: None,
            events: Vec::new(),
        }
    }

    /// Attach a speech synthesizer for `tts` speech.
    pub fn set_speech_synth(&mut self, synth: Box<dyn SpeechSynth>) {
        self.synth = Some(synth);
    }

    /// Configure the animator's resume timing behavior.
    pub fn set_resume_mode(&mut self, mode: ResumeMode) {
        self.animator.set_resume_mode(mode);
    }

    /// Advance every clock by `delta` and return the events produced.
    pub fn update(&mut self, delta: Duration) -> Vec<AgentEvent> {
        let signals = self
            .animator
            .update(delta, self.stage.as_mut(), self.audio.as_mut());
        self.dispatch_signals(signals);

        let balloon_events = self.balloon.update(delta, self.stage.as_mut());
        self.dispatch_balloon(balloon_events);

        self.advance_active(delta);
        self.drive_queue();

        std::mem::take(&mut self.events)
    }

    /// Make the agent visible. With `fast` it appears in place; otherwise
    /// the `Show` animation plays first. Returns whether an animation was
    /// queued.
    pub fn show(&mut self, fast: bool) -> bool {
        self.hidden = false;
        self.stage.set_agent_visible(true);
        self.resume();
        if fast {
            self.start_idle();
            return true;
        }
        self.play(SHOW_ANIMATION)
    }

    /// Hide the agent. With `fast` the display hides at once; otherwise a
    /// `Hide` animation plays out first. Pending actions are discarded.
    pub fn hide(&mut self, fast: bool) {
        self.hidden = true;
        self.stop();
        if fast || !self.data.has_animation(HIDE_ANIMATION) {
            self.stage.set_agent_visible(false);
            self.pause();
            self.events.push(AgentEvent::Hidden);
            return;
        }
        self.start_animation(HIDE_ANIMATION, SignalSink::Hide);
        self.pump_animator();
    }

    /// Queue a named animation with the default timeout. Returns `false`
    /// (and queues nothing) for an unknown name.
    pub fn play(&mut self, animation: &str) -> bool {
        self.play_with_timeout(animation, Some(DEFAULT_PLAY_TIMEOUT))
    }

    /// Queue a named animation. When `timeout` is set and the animation has
    /// not exited in time, it is forced toward its exit path so no action
    /// can stall the queue forever. `None` or zero disables the timer.
    pub fn play_with_timeout(&mut self, animation: &str, timeout: Option<Duration>) -> bool {
        if !self.data.has_animation(animation) {
            log::debug!("play rejected: unknown animation '{animation}'");
            return false;
        }
        let timeout = timeout.filter(|t| !t.is_zero());
        self.queue.enqueue(Action::Play {
            animation: animation.to_string(),
            timeout,
        });
        self.drive_queue();
        true
    }

    /// Gesture toward a point: `Gesture<dir>`, falling back to `Look<dir>`.
    pub fn gesture_at(&mut self, x: f64, y: f64) -> bool {
        let direction = Direction::between(self.center(), (x, y));
        let gesture = format!("Gesture{}", direction.suffix());
        let look = format!("Look{}", direction.suffix());
        let animation = if self.data.has_animation(&gesture) {
            gesture
        } else {
            look
        };
        self.play(&animation)
    }

    /// Queue a movement to `(x, y)`. `None` uses the default duration; zero
    /// teleports. The directional `Move` animation is chosen from the
    /// agent's position at call time.
    pub fn move_to(&mut self, x: f64, y: f64, duration: Option<Duration>) {
        let duration = duration.unwrap_or(DEFAULT_MOVE_DURATION);
        let direction = Direction::between(self.center(), (x, y));
        let name = format!("Move{}", direction.suffix());
        let animation = self.data.has_animation(&name).then_some(name);
        self.queue.enqueue(Action::MoveTo {
            x,
            y,
            duration,
            animation,
        });
        self.drive_queue();
    }

    /// Queue a speech balloon for `text`.
    pub fn speak(&mut self, text: &str, options: SpeakOptions) {
        self.queue.enqueue(Action::Speak {
            text: text.to_string(),
            hold: options.hold,
            tts: options.tts,
        });
        self.drive_queue();
    }

    /// Start a streamed speech. Unlike `speak` this bypasses the queue:
    /// pending actions are discarded and chunks drive the balloon directly.
    pub fn speak_stream_begin(&mut self) {
        self.stop();
        if matches!(self.active, Some(ActiveAction::Speak)) {
            // A held or mid-reveal speech is superseded by the stream.
            self.finish_action();
        }
        self.balloon.begin_stream(self.stage.as_mut());
    }

    /// Append a chunk of streamed text.
    pub fn speak_stream_push(&mut self, chunk: &str) {
        self.balloon.push_chunk(self.stage.as_mut(), chunk);
    }

    /// Signal the end of the streamed text. With `tts` the accumulated text
    /// goes to the synthesizer.
    pub fn speak_stream_done(&mut self, tts: bool) {
        if tts {
            let text = self.balloon.full_text().to_string();
            if let Some(synth) = self.synth.as_mut() {
                if !text.is_empty() {
                    synth.speak(&text);
                }
            }
        }
        let events = self.balloon.finish_stream();
        self.dispatch_balloon(events);
    }

    /// Queue a pause during which the idle animation may run.
    pub fn delay(&mut self, duration: Option<Duration>) {
        let duration = duration.unwrap_or(DEFAULT_DELAY);
        self.queue.enqueue(Action::Delay { duration });
        self.drive_queue();
    }

    /// Queue a random non-idle animation. Returns `false` when the
    /// descriptor has none.
    pub fn animate(&mut self) -> bool {
        let names: Vec<String> = self
            .data
            .animation_names()
            .into_iter()
            .filter(|name| !name.starts_with(IDLE_PREFIX))
            .collect();
        if names.is_empty() {
            return false;
        }
        let index = self.rng.lock().next_index(names.len());
        let name = names[index].clone();
        self.play(&name)
    }

    /// Skip the current animation and close the balloon's speech.
    pub fn stop_current(&mut self) {
        self.animator.exit_animation();
        let events = self.balloon.close();
        self.dispatch_balloon(events);
    }

    /// Discard pending actions, force the current animation toward its exit
    /// path and hide the balloon. An action already mid-exit is unaffected.
    pub fn stop(&mut self) {
        self.queue.clear();
        self.animator.exit_animation();
        self.balloon.hide(self.stage.as_mut(), false);
        if let Some(synth) = self.synth.as_mut() {
            synth.cancel();
        }
    }

    /// Hide the speech balloon after the close delay.
    pub fn close_balloon(&mut self) {
        self.balloon.hide(self.stage.as_mut(), false);
    }

    /// Pause animation and balloon clocks. Movement interpolation and play
    /// timeouts keep running.
    pub fn pause(&mut self) {
        self.animator.pause();
        self.balloon.pause();
    }

    /// Resume after `pause`.
    pub fn resume(&mut self) {
        self.animator.resume(self.stage.as_mut(), self.audio.as_mut());
        self.pump_animator();
        let events = self.balloon.resume(self.stage.as_mut());
        self.dispatch_balloon(events);
    }

    /// Stop everything and hide both agent and balloon immediately.
    pub fn dispose(&mut self) {
        self.hidden = true;
        self.stop();
        self.balloon.dispose(self.stage.as_mut());
        self.stage.set_agent_visible(false);
        self.pause();
        self.active = None;
        self.idle = None;
        self.sink = SignalSink::None;
    }

    /// All animation names.
    pub fn animations(&self) -> Vec<String> {
        self.data.animation_names()
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.data.has_animation(name)
    }

    /// Name of the animation currently showing, if any.
    pub fn current_animation(&self) -> Option<&str> {
        self.animator.current_animation()
    }

    /// Current top-left position.
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Place the agent (host seam for dragging and initial placement).
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.position = (x, y);
        self.stage.move_agent(x, y);
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn center(&self) -> (f64, f64) {
        (
            self.position.0 + f64::from(self.data.frame_size[0]) / 2.0,
            self.position.1 + f64::from(self.data.frame_size[1]) / 2.0,
        )
    }

    /// Start `name` for `sink`, deferring when an idle animation is in
    /// flight: the request is appended to the idle session's continuation
    /// list and replayed once the idle animation exits.
    fn start_animation(&mut self, name: &str, sink: SignalSink) {
        if self.is_idle_animation_playing() {
            if let Some(idle) = self.idle.as_mut() {
                idle.deferred.push(DeferredStart {
                    animation: name.to_string(),
                    sink,
                });
                return;
            }
        }
        if self
            .animator
            .show_animation(name, self.stage.as_mut(), self.audio.as_mut())
        {
            self.sink = sink;
        }
    }

    fn is_idle_animation_playing(&self) -> bool {
        self.idle.is_some()
            && self
                .animator
                .current_animation()
                .is_some_and(|name| name.starts_with(IDLE_PREFIX))
    }

    /// Drain signals the animator produced outside `update` (immediate
    /// first step, resume) and dispatch them.
    fn pump_animator(&mut self) {
        let signals = self.animator.take_signals();
        self.dispatch_signals(signals);
    }

    fn dispatch_signals(&mut self, signals: Vec<AnimationSignal>) {
        for signal in signals {
            match self.sink {
                SignalSink::Action => self.on_action_signal(signal),
                SignalSink::Idle => self.on_idle_signal(signal),
                SignalSink::Hide => self.on_hide_signal(signal),
                SignalSink::None => {}
            }
        }
    }

    fn on_action_signal(&mut self, signal: AnimationSignal) {
        let mut finish = None;
        match self.active.as_mut() {
            Some(ActiveAction::Play { animation, .. }) => {
                if signal.state == AnimationState::Exited {
                    finish = Some(AgentEvent::AnimationFinished(animation.clone()));
                }
                // Waiting is not terminal for play; the timeout is the only
                // way out of a held animation.
            }
            Some(ActiveAction::Move(state)) => match signal.state {
                AnimationState::Exited => {
                    finish = Some(AgentEvent::MoveFinished);
                }
                AnimationState::Waiting => {
                    // Only the first Waiting starts the slide.
                    if let MoveState::AwaitingSignal { target, duration } = state {
                        let tween = Tween::new(self.position, *target, *duration);
                        *state = MoveState::Sliding {
                            tween,
                            exit_after: true,
                        };
                    }
                }
            },
            _ => {}
        }
        if let Some(event) = finish {
            self.events.push(event);
            self.finish_action();
        }
    }

    fn on_idle_signal(&mut self, signal: AnimationSignal) {
        if signal.state != AnimationState::Exited {
            return;
        }
        let Some(session) = self.idle.take() else {
            return;
        };
        if self.sink == SignalSink::Idle {
            self.sink = SignalSink::None;
        }
        // Replay deferred requests in order; each show replaces the last.
        for deferred in session.deferred {
            self.start_animation(&deferred.animation, deferred.sink);
        }
        self.pump_animator();
    }

    fn on_hide_signal(&mut self, _signal: AnimationSignal) {
        // The hide sequence completes on the first signal from the Hide
        // animation, whatever its state.
        self.sink = SignalSink::None;
        self.stage.set_agent_visible(false);
        self.pause();
        self.events.push(AgentEvent::Hidden);
    }

    fn dispatch_balloon(&mut self, events: Vec<BalloonEvent>) {
        for event in events {
            match event {
                BalloonEvent::Done => {
                    if matches!(self.active, Some(ActiveAction::Speak)) {
                        self.events.push(AgentEvent::SpeechFinished);
                        self.finish_action();
                    } else {
                        // Streamed speech completion; not queue-bound.
                        self.events.push(AgentEvent::SpeechFinished);
                        self.start_idle();
                    }
                }
            }
        }
    }

    /// Advance the active action's own clocks: play timeout, slide tween,
    /// delay countdown. These run even while the agent is paused.
    fn advance_active(&mut self, delta: Duration) {
        let mut finished = false;
        let mut event = None;
        let mut force_exit = false;
        match self.active.as_mut() {
            Some(ActiveAction::Play {
                timeout: Some(limit),
                elapsed,
                fired,
                ..
            }) => {
                *elapsed += delta;
                if !*fired && *elapsed >= *limit {
                    *fired = true;
                    force_exit = true;
                }
            }
            Some(ActiveAction::Move(MoveState::Sliding { tween, exit_after })) => {
                if !tween.finished() {
                    let position = tween.update(delta);
                    self.position = position;
                    self.stage.move_agent(position.0, position.1);
                    if tween.finished() {
                        if *exit_after {
                            force_exit = true;
                        } else {
                            finished = true;
                            event = Some(AgentEvent::MoveFinished);
                        }
                    }
                }
            }
            Some(ActiveAction::Delay { remaining }) => {
                if delta >= *remaining {
                    *remaining = Duration::ZERO;
                    finished = true;
                } else {
                    *remaining -= delta;
                }
            }
            _ => {}
        }
        if force_exit {
            self.animator.exit_animation();
        }
        if finished {
            if let Some(event) = event {
                self.events.push(event);
            }
            self.finish_action();
        }
    }

    fn finish_action(&mut self) {
        self.active = None;
        if self.sink == SignalSink::Action {
            self.sink = SignalSink::None;
        }
        self.queue.complete();
        self.drive_queue();
    }

    fn drive_queue(&mut self) {
        while let Some(action) = self.queue.take_next() {
            if self.begin_action(action) {
                self.queue.complete();
                continue;
            }
            break;
        }
        if self.queue.poll_empty() {
            self.start_idle();
        }
    }

    /// Begin an action. Returns `true` when it completed synchronously.
    fn begin_action(&mut self, action: Action) -> bool {
        match action {
            Action::Play { animation, timeout } => {
                self.active = Some(ActiveAction::Play {
                    animation: animation.clone(),
                    timeout,
                    elapsed: Duration::ZERO,
                    fired: false,
                });
                self.start_animation(&animation, SignalSink::Action);
                self.pump_animator();
                false
            }
            Action::Speak { text, hold, tts } => {
                self.active = Some(ActiveAction::Speak);
                self.balloon.speak(self.stage.as_mut(), &text, hold);
                if tts {
                    if let Some(synth) = self.synth.as_mut() {
                        synth.speak(&text);
                    }
                }
                false
            }
            Action::MoveTo {
                x,
                y,
                duration,
                animation,
            } => {
                if duration.is_zero() {
                    self.position = (x, y);
                    self.stage.move_agent(x, y);
                    self.events.push(AgentEvent::MoveFinished);
                    return true;
                }
                match animation {
                    Some(name) => {
                        self.active = Some(ActiveAction::Move(MoveState::AwaitingSignal {
                            target: (x, y),
                            duration,
                        }));
                        self.start_animation(&name, SignalSink::Action);
                        self.pump_animator();
                    }
                    None => {
                        // No directional sprite: slide without animation.
                        self.active = Some(ActiveAction::Move(MoveState::Sliding {
                            tween: Tween::new(self.position, (x, y), duration),
                            exit_after: false,
                        }));
                    }
                }
                false
            }
            Action::Delay { duration } => {
                self.active = Some(ActiveAction::Delay {
                    remaining: duration,
                });
                // Idle may fill the gap, as when the queue is empty.
                self.start_idle();
                false
            }
        }
    }

    /// Queue-empty transition: play a random idle animation in the
    /// background slot. Skipped while hidden or already idling.
    fn start_idle(&mut self) {
        if self.hidden || self.is_playing_idle_name() {
            return;
        }
        let idles: Vec<String> = self
            .data
            .animation_names()
            .into_iter()
            .filter(|name| name.starts_with(IDLE_PREFIX))
            .collect();
        if idles.is_empty() {
            return;
        }
        let index = self.rng.lock().next_index(idles.len());
        let name = idles[index].clone();

        self.idle = Some(IdleSession::default());
        if self
            .animator
            .show_animation(&name, self.stage.as_mut(), self.audio.as_mut())
        {
            self.sink = SignalSink::Idle;
            self.pump_animator();
        } else {
            self.idle = None;
        }
    }

    fn is_playing_idle_name(&self) -> bool {
        self.animator
            .current_animation()
            .is_some_and(|name| name.starts_with(IDLE_PREFIX))
    }
}
