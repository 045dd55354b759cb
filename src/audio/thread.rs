use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::config::AudioSettings;
use crate::playback::{BackendEvent, BackendState};

use super::sink::{fade_levels, paused_sink, paused_sink_at};
use super::types::{AudioCmd, LoadedTrack, PlaybackHandle};

/// How often the thread samples the sink for position and end-of-stream.
const TICK: Duration = Duration::from_millis(50);

/// The stream currently loaded into the mixer.
struct Current {
    sink: Sink,
    path: PathBuf,
    /// Offset of the sink's start within the file, after a rebuild-seek.
    base: Duration,
    duration: Option<Duration>,
    /// `false` once the sink was rebuilt with `skip_duration`.
    seekable: bool,
    generation: u64,
}

impl Current {
    fn position(&self) -> Duration {
        let pos = self.base + self.sink.get_pos();
        match self.duration {
            Some(total) => pos.min(total),
            None => pos,
        }
    }
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    events: Sender<BackendEvent>,
    status: PlaybackHandle,
    audio_settings: AudioSettings,
    ready: SyncSender<Result<(), String>>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("audio".to_string())
        .spawn(move || {
            let mut stream = match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready.send(Err(e.to_string()));
                    return;
                }
            };
            // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
            // but noisy for a TUI app.
            stream.log_on_drop(false);
            let _ = ready.send(Ok(()));

            AudioThread {
                stream,
                events,
                status,
                settings: audio_settings,
                current: None,
                outgoing: None,
                playing: false,
            }
            .run(rx);
        })
}

struct AudioThread {
    stream: OutputStream,
    events: Sender<BackendEvent>,
    status: PlaybackHandle,
    settings: AudioSettings,
    current: Option<Current>,
    /// The previous stream, still audible until the new one starts.
    outgoing: Option<Sink>,
    playing: bool,
}

impl AudioThread {
    fn run(mut self, rx: Receiver<AudioCmd>) {
        loop {
            match rx.recv_timeout(TICK) {
                Ok(AudioCmd::Quit { fade_out_ms }) => {
                    self.drop_outgoing();
                    if let Some(cur) = self.current.take() {
                        if self.playing {
                            // Fade out gently before stopping.
                            fade_out_sink(&cur.sink, fade_out_ms);
                        }
                        cur.sink.stop();
                    }
                    self.playing = false;
                    self.publish();
                    break;
                }
                Ok(cmd) => self.handle(cmd),
                Err(RecvTimeoutError::Timeout) => self.tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn handle(&mut self, cmd: AudioCmd) {
        match cmd {
            AudioCmd::Load(track) => self.load(track),
            AudioCmd::Play => {
                let Some(cur) = self.current.as_ref() else {
                    return;
                };
                match self.outgoing.take() {
                    Some(old) => crossfade(&old, &cur.sink, &self.settings),
                    None => cur.sink.play(),
                }
                self.playing = true;
                self.emit(BackendEvent::StateChanged(BackendState::Playing));
            }
            AudioCmd::Pause => {
                self.drop_outgoing();
                let Some(cur) = self.current.as_ref() else {
                    return;
                };
                cur.sink.pause();
                self.playing = false;
                self.emit(BackendEvent::StateChanged(BackendState::Paused));
            }
            AudioCmd::Stop => {
                self.drop_outgoing();
                if let Some(cur) = self.current.take() {
                    cur.sink.stop();
                }
                self.playing = false;
                self.emit(BackendEvent::StateChanged(BackendState::Stopped));
            }
            AudioCmd::Seek(target) => self.seek(target),
            AudioCmd::Quit { .. } => {}
        }
        self.publish();
    }

    fn load(&mut self, track: LoadedTrack) {
        self.drop_outgoing();
        if let Some(old) = self.current.take() {
            if self.playing {
                // Kept audible so `Play` can crossfade into the new stream.
                self.outgoing = Some(old.sink);
            } else {
                old.sink.stop();
            }
        }

        let sink = paused_sink(&self.stream, track.source);
        // Keep the default volume sane even if crossfade is disabled.
        sink.set_volume(1.0);
        debug!("loaded {}", track.path.display());
        self.current = Some(Current {
            sink,
            path: track.path,
            base: Duration::ZERO,
            duration: track.duration,
            seekable: true,
            generation: track.generation,
        });
        self.playing = false;
    }

    fn seek(&mut self, target: Duration) {
        let Some(cur) = self.current.as_mut() else {
            return;
        };
        let target = match cur.duration {
            Some(total) => target.min(total),
            None => target,
        };

        if cur.seekable {
            match cur.sink.try_seek(target) {
                Ok(()) => return,
                Err(e) => debug!("in-place seek failed for {}: {e}", cur.path.display()),
            }
        }

        // Rebuild the sink and skip into the file.
        match paused_sink_at(&self.stream, &cur.path, target) {
            Ok(sink) => {
                cur.sink.stop();
                if self.playing {
                    sink.play();
                }
                cur.sink = sink;
                cur.base = target;
                cur.seekable = false;
            }
            Err(e) => warn!("cannot seek in {}: {e}", cur.path.display()),
        }
    }

    fn tick(&mut self) {
        let ended = self
            .current
            .as_ref()
            .filter(|cur| self.playing && cur.sink.empty())
            .map(|cur| cur.generation);
        if let Some(generation) = ended {
            self.playing = false;
            self.emit(BackendEvent::EndOfStream { generation });
        }
        self.publish();
    }

    fn drop_outgoing(&mut self) {
        if let Some(old) = self.outgoing.take() {
            old.stop();
        }
    }

    fn emit(&self, event: BackendEvent) {
        // The control side may already be gone during shutdown.
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        if let Ok(mut info) = self.status.lock() {
            info.loaded = self.current.is_some();
            info.playing = self.playing;
            info.position = self.current.as_ref().map_or(Duration::ZERO, Current::position);
            info.duration = self.current.as_ref().and_then(|c| c.duration);
        }
    }
}

fn crossfade(old: &Sink, new: &Sink, settings: &AudioSettings) {
    let crossfade_ms = settings.crossfade_ms;
    if crossfade_ms == 0 {
        // Crossfade disabled: hard swap.
        old.stop();
        new.set_volume(1.0);
        new.play();
        return;
    }

    let steps = settings.crossfade_steps.max(1);
    old.set_volume(1.0);
    new.set_volume(0.0);
    new.play();

    // Fade volumes in a short blocking loop. This is simple and good enough
    // for a TUI player; audio continues in rodio's mixer thread.
    for t in fade_levels(steps) {
        old.set_volume(1.0 - t);
        new.set_volume(t);
        thread::sleep(Duration::from_millis((crossfade_ms / steps).max(1)));
    }
    old.stop();
}

fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    sink.set_volume(1.0);
    for t in fade_levels(steps) {
        sink.set_volume(1.0 - t);
        thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
