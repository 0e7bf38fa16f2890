//! Speech-balloon word-reveal timer
//!
//! Reveals text one whitespace-delimited word per cadence tick, with an
//! optional indefinite hold, an auto-hide delay after completion, and a
//! streaming mode where text arrives in chunks and completion is signaled
//! externally.

use std::time::Duration;

use crate::stage::Stage;

/// Cadence of the word reveal.
pub const WORD_SPEAK_TIME: Duration = Duration::from_millis(200);
/// Delay before the balloon hides after a completed, unheld speech.
pub const CLOSE_BALLOON_DELAY: Duration = Duration::from_millis(2000);

/// Events reported by the balloon timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalloonEvent {
    /// The speech completed: all words revealed (unheld), the stream's done
    /// signal arrived, or a held balloon was closed.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Fixed text from `speak`.
    Script,
    /// Incrementally arriving text; `done` once the external signal fired.
    Stream { done: bool },
}

/// Word-reveal state machine. One speech at a time; a new `speak` or stream
/// replaces the previous state wholly.
pub struct Balloon {
    text: String,
    revealed: usize,
    mode: Mode,
    hold: bool,
    active: bool,
    hidden: bool,
    paused: bool,
    done_emitted: bool,
    tick: Duration,
    hide_timer: Option<Duration>,
    events: Vec<BalloonEvent>,
}

impl Balloon {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            revealed: 0,
            mode: Mode::Script,
            hold: false,
            active: false,
            hidden: true,
            paused: false,
            done_emitted: false,
            tick: Duration::ZERO,
            hide_timer: None,
            events: Vec::new(),
        }
    }

    /// Begin revealing `text`. The first word shows immediately; one more
    /// word per cadence tick after that. With `hold` the balloon stays open
    /// after the last word until `close`.
    pub fn speak(&mut self, stage: &mut dyn Stage, text: &str, hold: bool) {
        self.text = text.to_string();
        self.revealed = 0;
        self.mode = Mode::Script;
        self.hold = hold;
        self.active = true;
        self.hidden = false;
        self.done_emitted = false;
        self.tick = Duration::ZERO;
        self.hide_timer = None;
        stage.show_balloon("");
        self.tick_once(stage);
    }

    /// Begin a streamed speech with no text yet.
    pub fn begin_stream(&mut self, stage: &mut dyn Stage) {
        self.text.clear();
        self.revealed = 0;
        self.mode = Mode::Stream { done: false };
        self.hold = false;
        self.active = true;
        self.hidden = false;
        self.done_emitted = false;
        self.tick = Duration::ZERO;
        self.hide_timer = None;
        stage.show_balloon("");
    }

    /// Append streamed text. Chunks may split words; a trailing word is not
    /// revealed until more text (or the done signal) confirms it complete.
    /// If the reveal had caught up with the text, the next word shows
    /// immediately on arrival instead of waiting out a cadence tick.
    pub fn push_chunk(&mut self, stage: &mut dyn Stage, chunk: &str) {
        let Mode::Stream { done } = self.mode else {
            return;
        };
        if done {
            return;
        }

        let starved = self.revealed >= self.available_count();
        self.text.push_str(chunk);

        if self.active && starved && self.revealed < self.available_count() {
            self.revealed += 1;
            let words: Vec<&str> = self.text.split_whitespace().collect();
            stage.show_balloon(&words[..self.revealed].join(" "));
            self.tick = Duration::ZERO;
        }
    }

    /// External done signal for a streamed speech. Completion is reported
    /// immediately, even mid-reveal; remaining words keep revealing at
    /// cadence and the balloon then auto-hides.
    pub fn finish_stream(&mut self) -> Vec<BalloonEvent> {
        if let Mode::Stream { done } = &mut self.mode {
            *done = true;
            if !self.done_emitted {
                self.done_emitted = true;
                self.events.push(BalloonEvent::Done);
            }
            if self.revealed >= self.word_count() {
                self.active = false;
                self.hide_timer = Some(CLOSE_BALLOON_DELAY);
            }
        }
        std::mem::take(&mut self.events)
    }

    /// Advance reveal and auto-hide clocks by `delta`. The hide countdown
    /// runs independently of the reveal; expiring while a reveal is still
    /// active cancels the hide rather than deferring it.
    pub fn update(&mut self, delta: Duration, stage: &mut dyn Stage) -> Vec<BalloonEvent> {
        if !self.paused {
            let hide_armed_at_entry = self.hide_timer.is_some();
            if self.active {
                self.tick += delta;
                while self.tick >= WORD_SPEAK_TIME && self.active {
                    self.tick -= WORD_SPEAK_TIME;
                    self.tick_once(stage);
                }
            }
            if hide_armed_at_entry {
                if let Some(remaining) = self.hide_timer {
                    if delta >= remaining {
                        self.hide_timer = None;
                        self.finish_hide(stage);
                    } else {
                        self.hide_timer = Some(remaining - delta);
                    }
                }
            }
        }
        std::mem::take(&mut self.events)
    }

    /// Close the balloon's speech. Mid-reveal this drops a pending hold;
    /// on a finished held balloon it fires the deferred completion.
    pub fn close(&mut self) -> Vec<BalloonEvent> {
        if self.active {
            self.hold = false;
        } else if self.hold && !self.done_emitted {
            self.done_emitted = true;
            self.events.push(BalloonEvent::Done);
        }
        std::mem::take(&mut self.events)
    }

    /// Hide the balloon: immediately when `fast`, else after the close
    /// delay (skipped if a reveal is still active when the delay elapses).
    pub fn hide(&mut self, stage: &mut dyn Stage, fast: bool) {
        if fast {
            stage.hide_balloon();
            self.hide_timer = None;
            return;
        }
        self.hide_timer = Some(CLOSE_BALLOON_DELAY);
    }

    /// Suspend the reveal and any pending auto-hide.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continue after `pause`. Mid-reveal the next word shows immediately;
    /// a pending auto-hide is re-armed with the full delay.
    pub fn resume(&mut self, stage: &mut dyn Stage) -> Vec<BalloonEvent> {
        if !self.paused {
            return Vec::new();
        }
        self.paused = false;
        if self.active {
            self.tick = Duration::ZERO;
            self.tick_once(stage);
        } else if self.hide_timer.is_some() && !self.hold && !self.hidden {
            self.hide_timer = Some(CLOSE_BALLOON_DELAY);
        }
        std::mem::take(&mut self.events)
    }

    /// Tear down: stop revealing and hide immediately.
    pub fn dispose(&mut self, stage: &mut dyn Stage) {
        self.active = false;
        self.hide_timer = None;
        self.hidden = true;
        stage.hide_balloon();
    }

    /// The full target text (streamed text included).
    pub fn full_text(&self) -> &str {
        &self.text
    }

    /// Whether a reveal is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Words safe to reveal. In an unfinished stream the trailing word may
    /// still grow, so it is held back unless the text ends in whitespace.
    fn available_count(&self) -> usize {
        let count = self.word_count();
        match self.mode {
            Mode::Script | Mode::Stream { done: true } => count,
            Mode::Stream { done: false } => {
                if self.text.ends_with(char::is_whitespace) {
                    count
                } else {
                    count.saturating_sub(1)
                }
            }
        }
    }

    fn tick_once(&mut self, stage: &mut dyn Stage) {
        if !self.active {
            return;
        }
        let available = self.available_count();
        if self.revealed < available {
            self.revealed += 1;
            let words: Vec<&str> = self.text.split_whitespace().collect();
            stage.show_balloon(&words[..self.revealed].join(" "));
            return;
        }

        match self.mode {
            // Starved stream: wait for more chunks or the done signal.
            Mode::Stream { done: false } => {}
            _ => {
                // One cadence tick past the last word: the speech is over.
                self.active = false;
                if !self.hold {
                    if !self.done_emitted {
                        self.done_emitted = true;
                        self.events.push(BalloonEvent::Done);
                    }
                    self.hide_timer = Some(CLOSE_BALLOON_DELAY);
                }
            }
        }
    }

    fn finish_hide(&mut self, stage: &mut dyn Stage) {
        if self.active {
            return;
        }
        stage.hide_balloon();
        self.hidden = true;
    }
}

impl Default for Balloon {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{LayerOffset, Stage};

    /// Stage recording balloon text transitions.
    struct BalloonStage {
        texts: Vec<String>,
        hidden: usize,
    }

    impl BalloonStage {
        fn new() -> Self {
            Self {
                texts: Vec::new(),
                hidden: 0,
            }
        }
        fn last(&self) -> &str {
            self.texts.last().map(String::as_str).unwrap_or("")
        }
    }

    impl Stage for BalloonStage {
        fn show_layer(&mut self, _index: usize, _offset: LayerOffset) {}
        fn hide_layer(&mut self, _index: usize) {}
        fn move_agent(&mut self, _x: f64, _y: f64) {}
        fn set_agent_visible(&mut self, _visible: bool) {}
        fn show_balloon(&mut self, text: &str) {
            self.texts.push(text.to_string());
        }
        fn hide_balloon(&mut self) {
            self.hidden += 1;
        }
    }

    #[test]
    fn test_words_reveal_at_cadence() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a b c", false);
        assert_eq!(stage.last(), "a");

        assert!(balloon.update(WORD_SPEAK_TIME, &mut stage).is_empty());
        assert_eq!(stage.last(), "a b");

        assert!(balloon.update(WORD_SPEAK_TIME, &mut stage).is_empty());
        assert_eq!(stage.last(), "a b c");

        // One more tick completes the speech.
        let events = balloon.update(WORD_SPEAK_TIME, &mut stage);
        assert_eq!(events, vec![BalloonEvent::Done]);
        assert!(!balloon.is_active());

        // Auto-hide after the close delay.
        assert_eq!(stage.hidden, 0);
        balloon.update(CLOSE_BALLOON_DELAY, &mut stage);
        assert_eq!(stage.hidden, 1);
    }

    #[test]
    fn test_hold_defers_completion_until_close() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a b", true);
        balloon.update(WORD_SPEAK_TIME * 2, &mut stage);
        assert_eq!(stage.last(), "a b");
        assert!(!balloon.is_active());

        // Held open: no completion, no hide.
        assert!(balloon.update(CLOSE_BALLOON_DELAY * 2, &mut stage).is_empty());
        assert_eq!(stage.hidden, 0);

        let events = balloon.close();
        assert_eq!(events, vec![BalloonEvent::Done]);
        // Repeated close does not re-fire.
        assert!(balloon.close().is_empty());
    }

    #[test]
    fn test_close_mid_reveal_drops_the_hold() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a b c", true);
        assert!(balloon.close().is_empty());

        // The reveal finishes as an unheld speech now.
        let mut events = Vec::new();
        for _ in 0..3 {
            events.extend(balloon.update(WORD_SPEAK_TIME, &mut stage));
        }
        assert_eq!(events, vec![BalloonEvent::Done]);
    }

    #[test]
    fn test_new_speak_replaces_previous() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "one two three", false);
        balloon.update(WORD_SPEAK_TIME, &mut stage);
        balloon.speak(&mut stage, "x y", false);
        assert_eq!(stage.last(), "x");

        balloon.update(WORD_SPEAK_TIME, &mut stage);
        assert_eq!(stage.last(), "x y");
    }

    #[test]
    fn test_pause_resume_word_timer() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a b c", false);
        balloon.pause();
        assert!(balloon.update(WORD_SPEAK_TIME * 5, &mut stage).is_empty());
        assert_eq!(stage.last(), "a");

        // Resume reveals the next word immediately.
        balloon.resume(&mut stage);
        assert_eq!(stage.last(), "a b");
    }

    #[test]
    fn test_pause_rearms_auto_hide_in_full() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a", false);
        balloon.update(WORD_SPEAK_TIME, &mut stage); // completes, hide armed

        balloon.update(CLOSE_BALLOON_DELAY / 2, &mut stage);
        balloon.pause();
        balloon.update(CLOSE_BALLOON_DELAY * 3, &mut stage);
        assert_eq!(stage.hidden, 0);

        balloon.resume(&mut stage);
        // Re-armed with the full delay, not the remainder.
        balloon.update(CLOSE_BALLOON_DELAY / 2, &mut stage);
        assert_eq!(stage.hidden, 0);
        balloon.update(CLOSE_BALLOON_DELAY / 2, &mut stage);
        assert_eq!(stage.hidden, 1);
    }

    #[test]
    fn test_fast_hide_is_immediate() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a", false);
        balloon.hide(&mut stage, true);
        assert_eq!(stage.hidden, 1);
    }

    #[test]
    fn test_delayed_hide_cancelled_while_reveal_active() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a b c d e f g h i j k l m", false);
        balloon.hide(&mut stage, false);

        // The hide delay expires mid-reveal and is cancelled.
        for _ in 0..10 {
            balloon.update(WORD_SPEAK_TIME, &mut stage);
        }
        assert_eq!(stage.hidden, 0);
        assert!(balloon.is_active());

        // The reveal's own completion re-arms the hide.
        for _ in 0..4 {
            balloon.update(WORD_SPEAK_TIME, &mut stage);
        }
        assert!(!balloon.is_active());
        balloon.update(CLOSE_BALLOON_DELAY, &mut stage);
        assert_eq!(stage.hidden, 1);
    }

    #[test]
    fn test_stream_reveals_chunks_and_holds_partial_words() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.begin_stream(&mut stage);
        // "hel" is a partial word: nothing to reveal yet.
        balloon.push_chunk(&mut stage, "hel");
        assert_eq!(stage.last(), "");

        // "lo wor" completes "hello"; caught-up reveal shows it immediately.
        balloon.push_chunk(&mut stage, "lo wor");
        assert_eq!(stage.last(), "hello");

        // done confirms the trailing word.
        let events = balloon.finish_stream();
        assert_eq!(events, vec![BalloonEvent::Done]);

        balloon.update(WORD_SPEAK_TIME, &mut stage);
        assert_eq!(stage.last(), "hello wor");
    }

    #[test]
    fn test_stream_done_fires_mid_reveal() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.begin_stream(&mut stage);
        balloon.push_chunk(&mut stage, "one two three four ");

        // Only the first word has revealed so far.
        assert_eq!(stage.last(), "one");

        // Done arrives mid-reveal: completion reported at once.
        let events = balloon.finish_stream();
        assert_eq!(events, vec![BalloonEvent::Done]);

        // Remaining words still reveal at cadence, then auto-hide.
        for _ in 0..4 {
            assert!(balloon.update(WORD_SPEAK_TIME, &mut stage).is_empty());
        }
        assert_eq!(stage.last(), "one two three four");
        assert!(!balloon.is_active());
        balloon.update(CLOSE_BALLOON_DELAY, &mut stage);
        assert_eq!(stage.hidden, 1);
    }

    #[test]
    fn test_stream_cadence_when_producer_is_ahead() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.begin_stream(&mut stage);
        balloon.push_chunk(&mut stage, "a b c ");
        assert_eq!(stage.last(), "a");

        balloon.update(WORD_SPEAK_TIME, &mut stage);
        assert_eq!(stage.last(), "a b");
        balloon.update(WORD_SPEAK_TIME, &mut stage);
        assert_eq!(stage.last(), "a b c");
    }

    #[test]
    fn test_dispose_tears_down() {
        let mut balloon = Balloon::new();
        let mut stage = BalloonStage::new();

        balloon.speak(&mut stage, "a b", false);
        balloon.dispose(&mut stage);
        assert!(!balloon.is_active());
        assert_eq!(stage.hidden, 1);
        assert!(balloon.update(WORD_SPEAK_TIME * 10, &mut stage).is_empty());
    }
}
