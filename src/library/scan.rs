use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel;
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{LibrarySettings, MetadataSettings};

use super::metadata::MetadataResolver;
use super::model::{Metadata, Track};

/// Messages posted from the scan worker to the control thread.
///
/// For any one track, `Discovered` is always posted before `Resolved`.
#[derive(Debug)]
pub enum ScanEvent {
    Discovered(Track),
    Resolved { path: PathBuf, metadata: Metadata },
    Finished(ScanSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub directories: usize,
    pub files: usize,
    pub skipped_directories: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Shared flag used to stop a running scan between entries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Handle to a running scan.
pub struct ScanHandle {
    cancel: CancelToken,
    join: Option<JoinHandle<()>>,
}

impl ScanHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }

    /// Wait for the worker to exit.
    pub fn join(mut self) {
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

/// Case-insensitive extension check against the configured allow-list.
pub(crate) fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            settings
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.'))
                .any(|e| !e.is_empty() && e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|n| n.starts_with('.')).unwrap_or(false)
}

/// Where resolved metadata requests go: probed inline on the walker, or
/// queued for a bounded pool of probe threads.
enum Resolve {
    Inline(MetadataResolver),
    Pool {
        jobs: channel::Sender<PathBuf>,
        workers: Vec<JoinHandle<()>>,
    },
}

impl Resolve {
    fn start(settings: &MetadataSettings, events: &Sender<ScanEvent>, cancel: &CancelToken) -> Self {
        let resolver = MetadataResolver::new(settings);
        if settings.workers == 0 {
            return Resolve::Inline(resolver);
        }

        // Bounded queue: the walker blocks rather than racing far ahead of the probes.
        let (jobs, rx) = channel::bounded::<PathBuf>(settings.workers * 4);
        let mut workers = Vec::with_capacity(settings.workers);
        for n in 0..settings.workers {
            let rx = rx.clone();
            let events = events.clone();
            let resolver = resolver.clone();
            let cancel = cancel.clone();
            let spawned = thread::Builder::new()
                .name(format!("metadata-{n}"))
                .spawn(move || {
                    while let Ok(path) = rx.recv() {
                        if cancel.is_cancelled() {
                            continue;
                        }
                        if let Some(metadata) = resolver.resolve(&path) {
                            if events.send(ScanEvent::Resolved { path, metadata }).is_err() {
                                break;
                            }
                        }
                    }
                });
            match spawned {
                Ok(h) => workers.push(h),
                Err(e) => warn!("failed to spawn metadata worker {n}: {e}"),
            }
        }

        if workers.is_empty() {
            return Resolve::Inline(resolver);
        }
        Resolve::Pool { jobs, workers }
    }

    /// Returns `false` once the control thread has gone away.
    fn submit(&self, path: PathBuf, events: &Sender<ScanEvent>) -> bool {
        match self {
            Resolve::Inline(resolver) => match resolver.resolve(&path) {
                Some(metadata) => events.send(ScanEvent::Resolved { path, metadata }).is_ok(),
                None => true,
            },
            Resolve::Pool { jobs, .. } => jobs.send(path).is_ok(),
        }
    }

    fn finish(self) {
        if let Resolve::Pool { jobs, workers } = self {
            drop(jobs);
            for w in workers {
                let _ = w.join();
            }
        }
    }
}

/// Background library scanner.
pub struct Scanner {
    library: LibrarySettings,
    metadata: MetadataSettings,
}

impl Scanner {
    pub fn new(library: LibrarySettings, metadata: MetadataSettings) -> Self {
        Self { library, metadata }
    }

    /// Start scanning `root` on a dedicated worker thread.
    pub fn spawn(self, root: PathBuf, events: Sender<ScanEvent>) -> io::Result<ScanHandle> {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let join = thread::Builder::new()
            .name("library-scan".to_string())
            .spawn(move || {
                let summary = self.run(&root, &events, &token);
                let _ = events.send(ScanEvent::Finished(summary));
            })?;
        Ok(ScanHandle {
            cancel,
            join: Some(join),
        })
    }

    /// Breadth-first walk of `root`, posting every audio file found.
    pub fn run(&self, root: &Path, events: &Sender<ScanEvent>, cancel: &CancelToken) -> ScanSummary {
        let started = Instant::now();
        let mut summary = ScanSummary::default();
        info!("scanning library at {}", root.display());

        let resolve = Resolve::start(&self.metadata, events, cancel);
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut pending: VecDeque<(PathBuf, usize)> = VecDeque::new();
        pending.push_back((root.to_path_buf(), 0));

        'walk: while let Some((dir, depth)) = pending.pop_front() {
            if cancel.is_cancelled() {
                break;
            }
            if self.library.follow_links {
                // Symlinked directories may form cycles; visit each real directory once.
                let real = dir.canonicalize().unwrap_or_else(|_| dir.clone());
                if !visited.insert(real) {
                    debug!("skipping already visited directory {}", dir.display());
                    continue;
                }
            }
            summary.directories += 1;

            let listing = WalkDir::new(&dir)
                .min_depth(1)
                .max_depth(1)
                .follow_links(self.library.follow_links)
                .sort_by_file_name();

            for entry in listing {
                if cancel.is_cancelled() {
                    break 'walk;
                }
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        // A failed read of `dir` itself surfaces at depth 0.
                        if e.depth() == 0 {
                            warn!("cannot read directory {}: {e}", dir.display());
                            summary.skipped_directories += 1;
                            continue 'walk;
                        }
                        match e.path() {
                            // Subdirectories are opened while listing their parent.
                            Some(p) if p.is_dir() => {
                                warn!("cannot read directory {}: {e}", p.display());
                                summary.skipped_directories += 1;
                            }
                            _ => debug!("skipping unreadable entry in {}: {e}", dir.display()),
                        }
                        continue;
                    }
                };

                if !self.library.include_hidden && is_hidden(entry.file_name()) {
                    continue;
                }

                // With follow_links this is the link target's type.
                let file_type = entry.file_type();
                let path = entry.into_path();
                if file_type.is_dir() {
                    let next_depth = depth + 1;
                    if self.library.max_depth.is_none_or(|max| next_depth <= max) {
                        pending.push_back((path, next_depth));
                    }
                    continue;
                }
                if !file_type.is_file() || !is_audio_file(&path, &self.library) {
                    continue;
                }

                summary.files += 1;
                if events.send(ScanEvent::Discovered(Track::new(path.clone()))).is_err() {
                    break 'walk;
                }
                if cancel.is_cancelled() {
                    break 'walk;
                }
                if !resolve.submit(path, events) {
                    break 'walk;
                }
            }
        }

        resolve.finish();
        summary.cancelled = cancel.is_cancelled();
        summary.elapsed = started.elapsed();
        info!(
            "scan of {} finished: {} files in {} directories ({} unreadable){}",
            root.display(),
            summary.files,
            summary.directories,
            summary.skipped_directories,
            if summary.cancelled { ", cancelled" } else { "" }
        );
        summary
    }
}
