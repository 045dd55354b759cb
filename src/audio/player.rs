use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info};

use crate::config::AudioSettings;
use crate::playback::{BackendError, BackendEvent, MediaBackend};

use super::sink::load_uri;
use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, PlaybackHandle, PlaybackInfo};

pub struct RodioBackend {
    tx: Sender<AudioCmd>,
    events: Receiver<BackendEvent>,
    status: PlaybackHandle,
    quit_fade_out: Duration,
    generation: u64,
    join: Option<JoinHandle<()>>,
}

impl RodioBackend {
    /// Open the default output device on a dedicated audio thread.
    pub fn new(audio_settings: AudioSettings) -> Result<Self, BackendError> {
        let (tx, rx) = mpsc::channel::<AudioCmd>();
        let (events_tx, events) = mpsc::channel::<BackendEvent>();
        let (ready_tx, ready) = mpsc::sync_channel(1);
        let status: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));
        let quit_fade_out = Duration::from_millis(audio_settings.quit_fade_out_ms);

        let join = spawn_audio_thread(rx, events_tx, status.clone(), audio_settings, ready_tx)
            .map_err(|e| BackendError::NoOutput(e.to_string()))?;
        match ready.recv() {
            Ok(Ok(())) => info!("audio output ready"),
            Ok(Err(reason)) => return Err(BackendError::NoOutput(reason)),
            Err(_) => return Err(BackendError::Disconnected),
        }

        Ok(Self {
            tx,
            events,
            status,
            quit_fade_out,
            generation: 0,
            join: Some(join),
        })
    }

    fn send(&self, cmd: AudioCmd) -> Result<(), BackendError> {
        self.tx.send(cmd).map_err(|_| BackendError::Disconnected)
    }

    fn send_or_log(&self, cmd: AudioCmd) {
        if self.send(cmd).is_err() {
            debug!("audio thread is gone, command dropped");
        }
    }

    fn with_status<T>(&self, f: impl FnOnce(&PlaybackInfo) -> T) -> Option<T> {
        self.status.lock().ok().map(|info| f(&info))
    }

    /// Fade out, stop the audio thread and wait for it.
    pub fn quit_softly(&mut self) {
        let Some(handle) = self.join.take() else {
            return;
        };
        self.send_or_log(AudioCmd::Quit {
            fade_out_ms: self.quit_fade_out.as_millis() as u64,
        });
        let _ = handle.join();
    }
}

impl MediaBackend for RodioBackend {
    fn load(&mut self, uri: &str) -> Result<u64, BackendError> {
        let generation = self.generation + 1;
        let track = load_uri(uri, generation)?;
        let duration = track.duration;
        self.send(AudioCmd::Load(track))?;
        self.generation = generation;
        // Visible before the audio thread publishes its next tick.
        if let Ok(mut info) = self.status.lock() {
            info.loaded = true;
            info.playing = false;
            info.position = Duration::ZERO;
            info.duration = duration;
        }
        Ok(generation)
    }

    fn play(&mut self) {
        self.send_or_log(AudioCmd::Play);
    }

    fn pause(&mut self) {
        self.send_or_log(AudioCmd::Pause);
    }

    fn stop(&mut self) {
        self.send_or_log(AudioCmd::Stop);
    }

    fn seek(&mut self, position: Duration) {
        self.send_or_log(AudioCmd::Seek(position));
        if let Ok(mut info) = self.status.lock() {
            if info.loaded {
                info.position = position;
            }
        }
    }

    fn position(&self) -> Duration {
        self.with_status(|info| info.position).unwrap_or_default()
    }

    fn duration(&self) -> Option<Duration> {
        self.with_status(|info| info.duration).flatten()
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.events.try_recv().ok()
    }

    fn shutdown(&mut self) {
        self.quit_softly();
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.quit_softly();
    }
}
