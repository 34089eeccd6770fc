//! # Change Watcher
//!
//! Watches one file and asks a container to reload when it changes.
//!
//! The file is observed through its *parent directory* so that editors and
//! deploy tools that write a temporary file and rename it over the target are
//! still seen. Qualifying events (write-close, rename-into-place, create, data
//! modification) are filtered by basename and fed to a [`Debouncer`]: the
//! first event opens a window, further events inside it are absorbed, and
//! when it closes exactly one signal is delivered through a [`SignalSender`].
//!
//! A failed delivery is logged and the loop keeps going; the next qualifying
//! event gets a fresh attempt.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::defaults;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The file being watched and the container to signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub file: PathBuf,
    pub parent: PathBuf,
    pub container: String,
}

impl WatchTarget {
    pub fn new(file: &Path, container: &str) -> Result<Self> {
        if container.trim().is_empty() {
            return Err(Error::Watch {
                message: "container identifier is empty".to_string(),
            });
        }
        if file.file_name().is_none() {
            return Err(Error::Watch {
                message: format!("{} does not name a file", file.display()),
            });
        }
        let parent = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(Error::Watch {
                message: format!("directory {} does not exist", parent.display()),
            });
        }
        Ok(Self {
            file: file.to_path_buf(),
            parent,
            container: container.trim().to_string(),
        })
    }

    fn basename(&self) -> Option<&OsStr> {
        self.file.file_name()
    }
}

/// Whether a directory event concerns the watched basename.
pub fn is_qualifying(event: &Event, basename: &OsStr) -> bool {
    let named = |path: &PathBuf| path.file_name() == Some(basename);
    match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write))
        | EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_)) => event.paths.iter().any(named),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().any(named),
        // (from, to): only the destination counts.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().map(named).unwrap_or(false)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Debouncing { deadline: Instant },
}

/// `{Idle, Debouncing}` with a single deadline.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
        }
    }

    /// Record a qualifying event. Only opens a window when idle.
    pub fn on_event(&mut self, now: Instant) {
        if self.state == DebounceState::Idle {
            self.state = DebounceState::Debouncing {
                deadline: now + self.window,
            };
        }
    }

    /// Returns true exactly once per window, when its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Debouncing { deadline } if now >= deadline => {
                self.state = DebounceState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == DebounceState::Idle
    }

    /// Time until the pending deadline, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Debouncing { deadline } => {
                Some(deadline.saturating_duration_since(now))
            }
        }
    }
}

/// Trait for signal delivery - allows mocking in tests
pub trait SignalSender {
    fn send(&self, container: &str) -> Result<()>;
}

/// Delivers the signal through a container-management HTTP API.
pub struct HttpSignalSender {
    client: reqwest::blocking::Client,
    endpoint: String,
    signal: String,
}

impl HttpSignalSender {
    pub fn new(endpoint: &str, signal: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(defaults::FETCH_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            signal: signal.to_string(),
        })
    }

    /// `{endpoint}/containers/{container}/kill?signal={signal}`
    pub fn kill_url(&self, container: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&format!(
            "{}/containers/{}/kill",
            self.endpoint, container
        ))?;
        url.query_pairs_mut().append_pair("signal", &self.signal);
        Ok(url)
    }
}

impl SignalSender for HttpSignalSender {
    fn send(&self, container: &str) -> Result<()> {
        let url = self.kill_url(container)?;
        debug!("POST {}", url);
        let response = self.client.post(url).send().map_err(|e| Error::Watch {
            message: format!("signal request failed: {}", e.without_url()),
        })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Watch {
                message: format!("control endpoint answered HTTP {}", status.as_u16()),
            })
        }
    }
}

/// Drive the debounce loop over a stream of directory events.
///
/// Returns the number of delivery attempts. Stops when `running` is cleared
/// or the event source disconnects; a window still open at disconnect is
/// waited out and fired.
pub fn run_loop(
    rx: &Receiver<notify::Result<Event>>,
    sender: &dyn SignalSender,
    target: &WatchTarget,
    window: Duration,
    running: &AtomicBool,
) -> Result<usize> {
    let Some(basename) = target.basename() else {
        return Ok(0);
    };
    let mut debouncer = Debouncer::new(window);
    let mut attempts = 0;

    while running.load(Ordering::SeqCst) {
        let wait = debouncer
            .remaining(Instant::now())
            .map_or(POLL_INTERVAL, |left| left.min(POLL_INTERVAL));

        match rx.recv_timeout(wait) {
            Ok(Ok(event)) => {
                if is_qualifying(&event, basename) {
                    debug!("Change detected: {:?}", event.kind);
                    debouncer.on_event(Instant::now());
                }
            }
            Ok(Err(e)) => warn!("Watch error: {}", e),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(left) = debouncer.remaining(Instant::now()) {
                    std::thread::sleep(left);
                    deliver(sender, target, &mut attempts);
                }
                return Ok(attempts);
            }
        }

        if debouncer.poll(Instant::now()) {
            deliver(sender, target, &mut attempts);
        }
    }
    Ok(attempts)
}

fn deliver(sender: &dyn SignalSender, target: &WatchTarget, attempts: &mut usize) {
    *attempts += 1;
    match sender.send(&target.container) {
        Ok(()) => info!(
            "{} changed; signalled {}",
            target.file.display(),
            target.container
        ),
        Err(e) => warn!("Could not signal {}: {}", target.container, e),
    }
}

/// Watch `target` until `running` is cleared.
pub fn watch(
    target: &WatchTarget,
    sender: &dyn SignalSender,
    window: Duration,
    running: Arc<AtomicBool>,
) -> Result<usize> {
    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        },
        Config::default(),
    )?;
    watcher.watch(&target.parent, RecursiveMode::NonRecursive)?;
    info!(
        "Watching {} (via {}) for container {}",
        target.file.display(),
        target.parent.display(),
        target.container
    );

    let attempts = run_loop(&rx, sender, target, window, &running)?;
    info!("Watcher stopped after {} signal attempt(s)", attempts);
    Ok(attempts)
}
