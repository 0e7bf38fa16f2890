//! Frame-sound playback
//!
//! Frames may name a sound to trigger as they show. Playback is best-effort:
//! the animator swallows every error so a missing device or handle can never
//! stall the animation timeline.
//!
//! [`RodioPlayer`] runs rodio on a dedicated thread since the output stream
//! is not `Send`; the engine side only sends commands.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rodio::{Decoder, OutputStream, Sink};

/// Errors reported (and then swallowed by callers) during playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("unknown sound '{0}'")]
    UnknownSound(String),

    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),
}

/// Sound playback interface.
pub trait AudioPlayer {
    /// Play a named sound, best-effort.
    fn play(&mut self, sound: &str) -> Result<(), AudioError>;

    /// Stop everything currently playing.
    fn stop_all(&mut self) {}
}

/// Player that ignores every sound, for silent hosts and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPlayer for NullAudio {
    fn play(&mut self, _sound: &str) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Commands sent to the audio thread.
enum AudioCommand {
    Play(Arc<Vec<u8>>),
    StopAll,
    Shutdown,
}

/// Rodio-backed player over preloaded, encoded sound bytes.
pub struct RodioPlayer {
    sounds: HashMap<String, Arc<Vec<u8>>>,
    sender: Sender<AudioCommand>,
    thread: Option<JoinHandle<()>>,
}

impl RodioPlayer {
    /// Create a player from a map of sound identifier to encoded bytes
    /// (wav, ogg or mp3). Fails only if no output device can be opened.
    pub fn new(sounds: HashMap<String, Vec<u8>>) -> Result<Self, AudioError> {
        let (sender, receiver) = mpsc::channel::<AudioCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let thread = thread::spawn(move || {
            // The stream must live on this thread for its whole lifetime.
            let (_stream, handle) = match OutputStream::try_default() {
                Ok(pair) => {
                    let _ = ready_tx.send(Ok(()));
                    pair
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err.to_string()));
                    return;
                }
            };

            let mut sinks: Vec<Sink> = Vec::new();
            while let Ok(command) = receiver.recv() {
                sinks.retain(|sink| !sink.empty());
                match command {
                    AudioCommand::Play(bytes) => {
                        let cursor = Cursor::new(bytes.to_vec());
                        let source = match Decoder::new(cursor) {
                            Ok(source) => source,
                            Err(err) => {
                                log::debug!("sound decode failed: {err}");
                                continue;
                            }
                        };
                        match Sink::try_new(&handle) {
                            Ok(sink) => {
                                sink.append(source);
                                sinks.push(sink);
                            }
                            Err(err) => log::debug!("sink creation failed: {err}"),
                        }
                    }
                    AudioCommand::StopAll => {
                        for sink in sinks.drain(..) {
                            sink.stop();
                        }
                    }
                    AudioCommand::Shutdown => break,
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                sounds: sounds
                    .into_iter()
                    .map(|(name, bytes)| (name, Arc::new(bytes)))
                    .collect(),
                sender,
                thread: Some(thread),
            }),
            Ok(Err(message)) => Err(AudioError::OutputUnavailable(message)),
            Err(_) => Err(AudioError::OutputUnavailable(
                "audio thread exited".to_string(),
            )),
        }
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&mut self, sound: &str) -> Result<(), AudioError> {
        let bytes = self
            .sounds
            .get(sound)
            .ok_or_else(|| AudioError::UnknownSound(sound.to_string()))?;
        self.sender
            .send(AudioCommand::Play(Arc::clone(bytes)))
            .map_err(|_| AudioError::OutputUnavailable("audio thread exited".to_string()))
    }

    fn stop_all(&mut self) {
        let _ = self.sender.send(AudioCommand::StopAll);
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        let _ = self.sender.send(AudioCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
