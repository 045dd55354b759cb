//! Scripted `MediaBackend` for tests. Clones share state, so a test can keep
//! one handle while the player owns another.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use super::backend::{BackendError, BackendEvent, MediaBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(Duration),
}

#[derive(Debug, Default)]
struct Script {
    calls: Vec<Call>,
    events: VecDeque<BackendEvent>,
    failing: HashSet<String>,
    loaded: Option<String>,
    generation: u64,
    position: Duration,
    duration: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeBackend(Rc<RefCell<Script>>);

impl FakeBackend {
    pub(crate) fn push_event(&self, event: BackendEvent) {
        self.0.borrow_mut().events.push_back(event);
    }

    /// End of the stream loaded last.
    pub(crate) fn end_of_stream(&self) -> BackendEvent {
        BackendEvent::EndOfStream {
            generation: self.0.borrow().generation,
        }
    }

    pub(crate) fn push_end_of_stream(&self) {
        let event = self.end_of_stream();
        self.push_event(event);
    }

    pub(crate) fn fail_uri(&self, uri: &str) {
        self.0.borrow_mut().failing.insert(uri.to_string());
    }

    pub(crate) fn set_position(&self, position: Duration) {
        self.0.borrow_mut().position = position;
    }

    pub(crate) fn set_duration(&self, duration: Option<Duration>) {
        self.0.borrow_mut().duration = duration;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub(crate) fn loaded(&self) -> Option<String> {
        self.0.borrow().loaded.clone()
    }
}

impl MediaBackend for FakeBackend {
    fn load(&mut self, uri: &str) -> Result<u64, BackendError> {
        let mut s = self.0.borrow_mut();
        s.calls.push(Call::Load(uri.to_string()));
        if s.failing.contains(uri) {
            return Err(BackendError::Decode {
                path: PathBuf::from(uri),
                reason: "scripted failure".to_string(),
            });
        }
        s.loaded = Some(uri.to_string());
        s.position = Duration::ZERO;
        s.generation += 1;
        Ok(s.generation)
    }

    fn play(&mut self) {
        self.0.borrow_mut().calls.push(Call::Play);
    }

    fn pause(&mut self) {
        self.0.borrow_mut().calls.push(Call::Pause);
    }

    fn stop(&mut self) {
        let mut s = self.0.borrow_mut();
        s.calls.push(Call::Stop);
        s.loaded = None;
    }

    fn seek(&mut self, position: Duration) {
        let mut s = self.0.borrow_mut();
        s.calls.push(Call::Seek(position));
        s.position = position;
    }

    fn position(&self) -> Duration {
        self.0.borrow().position
    }

    fn duration(&self) -> Option<Duration> {
        let s = self.0.borrow();
        s.loaded.as_ref().and(s.duration)
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.0.borrow_mut().events.pop_front()
    }
}
