//! # Hot Reload Module
//!
//! Watches documentation sources (manifests and the OpenAPI document) and
//! triggers a full rebuild of the documentation registry when they change.
//!
//! ## State machine
//!
//! ```text
//!            event                 quiet for `debounce`
//!   Idle ─────────────▶ ReloadPending ─────────────────▶ Reloading
//!    ▲                    │  ▲ events coalesce             │
//!    │                    └──┘                             │
//!    │            no event while reloading                 │
//!    └─────────────────────────────────────────────────────┤
//!                 event while reloading                    │
//!   ReloadPending ◀────────────────────────────────────────┘
//! ```
//!
//! A burst of events inside the debounce window produces exactly one reload.
//! Only one reload runs at a time; an event that arrives while reloading
//! schedules exactly one follow-up cycle.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use routedoc::hot_reload::ChangeWatcher;
//! use std::time::Duration;
//!
//! let mut watcher = ChangeWatcher::new(Duration::from_millis(100), || {
//!     println!("sources changed");
//! });
//! watcher.watch_paths(&["doc/openapi.yaml".into()])?;
//! ```
//!
//! ## Error Handling
//!
//! A panic inside the reload function is caught and logged; the watcher goes
//! back to `Idle` and keeps serving later events.

use crate::error::DocsError;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Reload cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    ReloadPending,
    Reloading,
}

struct Machine {
    state: ReloadState,
    last_event: Instant,
    rerun: bool,
}

struct Shared {
    machine: Mutex<Machine>,
    debounce: Duration,
    reload: Box<dyn Fn() + Send + Sync>,
    cycles: AtomicU64,
}

impl Shared {
    fn machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Debounced reload trigger, optionally fed by a filesystem watcher.
pub struct ChangeWatcher {
    shared: Arc<Shared>,
    fs: Option<RecommendedWatcher>,
}

impl ChangeWatcher {
    pub fn new<F>(debounce: Duration, reload: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(Machine {
                    state: ReloadState::Idle,
                    last_event: Instant::now(),
                    rerun: false,
                }),
                debounce,
                reload: Box::new(reload),
                cycles: AtomicU64::new(0),
            }),
            fs: None,
        }
    }

    /// Record one qualifying change event.
    pub fn trigger(&self) {
        trigger(&self.shared);
    }

    pub fn state(&self) -> ReloadState {
        self.shared.machine().state
    }

    /// Completed reload cycles.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    pub fn debounce(&self) -> Duration {
        self.shared.debounce
    }

    /// Poll until no cycle is pending or running. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.state() == ReloadState::Idle {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.state() == ReloadState::Idle
    }

    /// Start watching `paths`; create, modify and remove events on any of them
    /// trigger a reload.
    ///
    /// Parent directories are watched so editors that save by rename are seen.
    /// A path whose directory cannot be watched is skipped with a warning; an
    /// error is returned only when none of `paths` can be watched.
    pub fn watch_paths(&mut self, paths: &[PathBuf]) -> Result<(), DocsError> {
        let mut targets = BTreeSet::new();
        let mut dirs = BTreeSet::new();
        let mut first_err = None;
        for path in paths {
            let Some(name) = path.file_name() else {
                warn!(path = %path.display(), "cannot watch a path without a file name");
                continue;
            };
            let parent = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            match parent.canonicalize() {
                Ok(dir) => {
                    targets.insert(dir.join(name));
                    dirs.insert(dir);
                }
                Err(source) => {
                    warn!(path = %path.display(), error = %source, "hot-reload: source directory unavailable, not watching");
                    first_err.get_or_insert(DocsError::Io {
                        path: parent,
                        source,
                    });
                }
            }
        }
        if dirs.is_empty() {
            return Err(first_err.unwrap_or_else(|| {
                DocsError::Config("no watchable documentation sources".to_string())
            }));
        }

        let shared = Arc::clone(&self.shared);
        let watched = targets.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                    ) && event.paths.iter().any(|p| is_target(&watched, p));
                    if relevant {
                        debug!(kind = ?event.kind, paths = ?event.paths, "documentation source changed");
                        trigger(&shared);
                    }
                }
                Err(e) => error!(error = %e, "watch error"),
            },
            Config::default(),
        )?;

        let mut watching = 0usize;
        let mut watch_err = None;
        for dir in &dirs {
            match watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => watching += 1,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "hot-reload: cannot watch directory");
                    watch_err.get_or_insert(e);
                }
            }
        }
        if watching == 0 {
            if let Some(e) = watch_err {
                return Err(e.into());
            }
        }
        info!(files = ?targets, "hot-reload: watching documentation sources");
        self.fs = Some(watcher);
        Ok(())
    }
}

fn is_target(targets: &BTreeSet<PathBuf>, path: &Path) -> bool {
    targets.contains(path)
}

fn trigger(shared: &Arc<Shared>) {
    let mut m = shared.machine();
    m.last_event = Instant::now();
    let state = m.state;
    match state {
        ReloadState::Idle => {
            m.state = ReloadState::ReloadPending;
            drop(m);
            let worker = Arc::clone(shared);
            let spawned = thread::Builder::new()
                .name("routedoc-reload".to_string())
                .spawn(move || run_cycles(&worker));
            if let Err(e) = spawned {
                error!(error = %e, "hot-reload: failed to start reload timer");
                shared.machine().state = ReloadState::Idle;
            }
        }
        ReloadState::ReloadPending => {}
        ReloadState::Reloading => m.rerun = true,
    }
}

fn run_cycles(shared: &Shared) {
    loop {
        // quiet period: wait until `debounce` has passed since the last event
        loop {
            let remaining = {
                let mut m = shared.machine();
                let elapsed = m.last_event.elapsed();
                if elapsed >= shared.debounce {
                    m.state = ReloadState::Reloading;
                    None
                } else {
                    Some(shared.debounce - elapsed)
                }
            };
            match remaining {
                Some(wait) => thread::sleep(wait),
                None => break,
            }
        }

        let started = Instant::now();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (shared.reload)()));
        if let Err(panic) = outcome {
            error!(panic = ?panic, "hot-reload: reload panicked");
        }
        let cycle = shared.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        info!(cycle, elapsed_ms = started.elapsed().as_millis() as u64, "hot-reload: cycle complete");

        let mut m = shared.machine();
        if m.rerun {
            m.rerun = false;
            m.state = ReloadState::ReloadPending;
            continue;
        }
        m.state = ReloadState::Idle;
        break;
    }
}
