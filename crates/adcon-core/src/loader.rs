//! Streaming computer-list loader.
//!
//! Consumes the SSE computer stream and maintains a continuously-observable
//! snapshot: the ordered list received so far, progress against the
//! announced total, and a five-state lifecycle
//! (`Idle → Connecting → Streaming → Completed | Failed`).
//!
//! One session is active at a time. [`start`](ComputerListLoader::start)
//! supersedes any running session: the old transport is cancelled and a
//! generation counter guarantees a superseded session can never write to
//! the shared snapshot again, so observers only ever see one writer's data.
//! All mutation funnels through [`SessionState::apply`]; observers read
//! snapshots through a `watch` channel and never mutate.
//!
//! Failure semantics: a server `error` message, a transport drop, a
//! premature end-of-stream, and the idle watchdog all land in `Failed`
//! with a message. There is no automatic reconnect -- recovery is a fresh
//! `start()`, which restarts from an empty list.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use adcon_api::sse::{EventStream, StreamMessage};

use crate::model::Computer;

// ── Observable state ─────────────────────────────────────────────────

/// Lifecycle of one load session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No load requested yet.
    Idle,
    /// Transport being established; nothing received.
    Connecting,
    /// At least one computer received.
    Streaming,
    /// Server sent `done`.
    Completed,
    /// Terminal failure; see `last_error`.
    Failed,
}

/// Point-in-time view of the loader, published through a `watch` channel.
#[derive(Debug, Clone)]
pub struct LoaderSnapshot {
    /// Computers in exact delivery order. Append-only within a session;
    /// no de-duplication (the server is trusted).
    pub computers: Arc<Vec<Arc<Computer>>>,
    /// Count of computers received this session. Monotonic; resets only
    /// on `start()`.
    pub received: usize,
    /// Total announced by the server, once known. Zero is "unknown".
    pub expected_total: Option<u64>,
    pub state: LoadState,
    /// Present exactly when `state == Failed`.
    pub last_error: Option<String>,
}

impl LoaderSnapshot {
    fn idle() -> Self {
        Self {
            computers: Arc::new(Vec::new()),
            received: 0,
            expected_total: None,
            state: LoadState::Idle,
            last_error: None,
        }
    }

    /// Progress percentage, when the expected total is known and nonzero.
    /// `None` means indeterminate -- show a counter, not a bar.
    pub fn progress_percent(&self) -> Option<u8> {
        let total = self.expected_total.filter(|&t| t > 0)?;
        let received = u64::try_from(self.received).unwrap_or(u64::MAX);
        // Round half-up, clamp to 100 in case the server under-announced.
        let pct = received
            .saturating_mul(100)
            .saturating_add(total / 2)
            / total;
        Some(u8::try_from(pct.min(100)).unwrap_or(100))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, LoadState::Completed | LoadState::Failed)
    }
}

// ── Session state machine ────────────────────────────────────────────

/// Mutable state of one session. Only the session task touches it, and
/// only through [`apply`](Self::apply) -- the single mutation path.
#[derive(Debug)]
struct SessionState {
    computers: Vec<Arc<Computer>>,
    received: usize,
    expected_total: Option<u64>,
    state: LoadState,
    last_error: Option<String>,
}

impl SessionState {
    fn connecting() -> Self {
        Self {
            computers: Vec::new(),
            received: 0,
            expected_total: None,
            state: LoadState::Connecting,
            last_error: None,
        }
    }

    /// Apply one decoded message in delivery order.
    ///
    /// Returns `true` when the session reached a terminal state; the
    /// caller must then stop feeding messages and drop the transport.
    /// Terminal states are sticky: anything arriving after `done` or
    /// `error` is ignored.
    fn apply(&mut self, msg: StreamMessage) -> bool {
        if self.is_terminal() {
            tracing::debug!(?msg, "Ignoring message after terminal state");
            return true;
        }
        match msg {
            StreamMessage::Total { count } => {
                // A zero total means the server doesn't know either.
                self.expected_total = (count > 0).then_some(count);
                false
            }
            StreamMessage::Computer { data } => {
                self.computers.push(Arc::new(Computer::from(data)));
                self.received += 1;
                self.state = LoadState::Streaming;
                false
            }
            StreamMessage::Done => {
                self.state = LoadState::Completed;
                true
            }
            StreamMessage::Error { message } => self.fail(message),
        }
    }

    /// Terminal failure; always returns `true`.
    fn fail(&mut self, message: impl Into<String>) -> bool {
        self.state = LoadState::Failed;
        self.last_error = Some(message.into());
        true
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, LoadState::Completed | LoadState::Failed)
    }

    fn snapshot(&self) -> LoaderSnapshot {
        LoaderSnapshot {
            computers: Arc::new(self.computers.clone()),
            received: self.received,
            expected_total: self.expected_total,
            state: self.state,
            last_error: self.last_error.clone(),
        }
    }
}

// ── Shared publishing state ──────────────────────────────────────────

/// Snapshot channel plus the session generation counter.
///
/// The lock guards generation bumps and snapshot writes as a pair: a
/// superseded session's publish observes the new generation and becomes a
/// no-op, so a message in flight when `start()` raced it can never leak
/// into the successor's view.
struct Shared {
    snapshot: watch::Sender<LoaderSnapshot>,
    generation: Mutex<u64>,
}

impl Shared {
    /// Bump the generation, reset the snapshot, and return the new
    /// generation for the session about to spawn.
    fn begin_session(&self) -> u64 {
        let mut generation = lock(&self.generation);
        *generation += 1;
        self.snapshot.send_replace(LoaderSnapshot {
            state: LoadState::Connecting,
            ..LoaderSnapshot::idle()
        });
        *generation
    }

    /// Publish a snapshot if `generation` is still current.
    fn publish(&self, generation: u64, snapshot: LoaderSnapshot) -> bool {
        let current = lock(&self.generation);
        if *current != generation {
            tracing::debug!(generation, "Dropping snapshot from superseded session");
            return false;
        }
        self.snapshot.send_replace(snapshot);
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ── ComputerListLoader ───────────────────────────────────────────────

struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the stream endpoint and at most one live session.
pub struct ComputerListLoader {
    client: reqwest::Client,
    endpoint: Url,
    idle_timeout: Duration,
    shared: Arc<Shared>,
    session: Mutex<Option<SessionHandle>>,
}

impl ComputerListLoader {
    /// Create a loader. `client` must be a streaming client (no total
    /// request timeout); see `TransportConfig::build_streaming_client`.
    pub fn new(client: reqwest::Client, endpoint: Url, idle_timeout: Duration) -> Self {
        let (snapshot, _) = watch::channel(LoaderSnapshot::idle());
        Self {
            client,
            endpoint,
            idle_timeout,
            shared: Arc::new(Shared {
                snapshot,
                generation: Mutex::new(0),
            }),
            session: Mutex::new(None),
        }
    }

    /// Begin a new load session, superseding any active one.
    ///
    /// Safe to call from any state. Resets the snapshot to an empty
    /// `Connecting` view and spawns the consume task. Errors surface
    /// through the snapshot (`Failed` + `last_error`), never here.
    pub fn start(&self) {
        // Cancel the old session before the reset so it cannot observe
        // its own generation again.
        self.teardown_session();
        let generation = self.shared.begin_session();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(
            self.client.clone(),
            self.endpoint.clone(),
            self.idle_timeout,
            Arc::clone(&self.shared),
            generation,
            cancel.clone(),
        ));

        *lock(&self.session) = Some(SessionHandle { cancel, task });
    }

    /// Cancel the active session, if any. Idempotent.
    ///
    /// Closes the transport; the last-published snapshot stays visible
    /// (a partial list remains a valid view of what was received).
    pub fn cancel(&self) {
        self.teardown_session();
    }

    /// Current snapshot (cheap clone).
    pub fn snapshot(&self) -> LoaderSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<LoaderSnapshot> {
        self.shared.snapshot.subscribe()
    }

    fn teardown_session(&self) {
        if let Some(handle) = lock(&self.session).take() {
            handle.cancel.cancel();
            // Abort rather than drain: messages the transport already
            // queued are discarded, per the cancellation contract.
            handle.task.abort();
        }
    }
}

impl Drop for ComputerListLoader {
    fn drop(&mut self) {
        self.teardown_session();
    }
}

// ── Session task ─────────────────────────────────────────────────────

/// Connect, then pump messages until a terminal transition.
///
/// Dropping the `EventStream` on every exit path closes the transport
/// deterministically. The idle watchdog covers both the connect phase and
/// each inter-message gap.
async fn run_session(
    client: reqwest::Client,
    endpoint: Url,
    idle_timeout: Duration,
    shared: Arc<Shared>,
    generation: u64,
    cancel: CancellationToken,
) {
    let mut state = SessionState::connecting();

    let connect = tokio::time::timeout(idle_timeout, EventStream::connect(&client, endpoint));
    let mut stream = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = connect => match result {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Computer stream connect failed");
                state.fail(e.to_string());
                shared.publish(generation, state.snapshot());
                return;
            }
            Err(_) => {
                state.fail(idle_message(idle_timeout));
                shared.publish(generation, state.snapshot());
                return;
            }
        },
    };

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            next = tokio::time::timeout(idle_timeout, stream.next_message()) => next,
        };

        match next {
            // Watchdog fired: the server went silent without `done`.
            Err(_) => {
                state.fail(idle_message(idle_timeout));
                shared.publish(generation, state.snapshot());
                return;
            }
            // Server closed the connection without a terminal message.
            Ok(None) => {
                debug_assert!(!state.is_terminal());
                state.fail("stream closed before completion");
                shared.publish(generation, state.snapshot());
                return;
            }
            Ok(Some(Ok(msg))) => {
                let terminal = state.apply(msg);
                if !shared.publish(generation, state.snapshot()) {
                    // Superseded; the new session owns the snapshot now.
                    return;
                }
                if terminal {
                    tracing::debug!(
                        received = state.received,
                        state = ?state.state,
                        "Computer stream finished"
                    );
                    return;
                }
            }
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, "Computer stream transport error");
                state.fail(e.to_string());
                shared.publish(generation, state.snapshot());
                return;
            }
        }
    }
}

fn idle_message(idle_timeout: Duration) -> String {
    format!(
        "no data received for {}s -- stream considered hung",
        idle_timeout.as_secs()
    )
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use adcon_api::sse::ComputerPayload;

    fn computer(name: &str) -> StreamMessage {
        StreamMessage::Computer {
            data: ComputerPayload {
                name: name.to_owned(),
                enabled: true,
                password: None,
            },
        }
    }

    fn names(state: &SessionState) -> Vec<&str> {
        state.computers.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn computers_append_in_delivery_order() {
        let mut state = SessionState::connecting();
        for name in ["PC1", "PC2", "PC3"] {
            assert!(!state.apply(computer(name)));
        }
        assert_eq!(names(&state), ["PC1", "PC2", "PC3"]);
        assert_eq!(state.received, 3);
        assert_eq!(state.state, LoadState::Streaming);
    }

    #[test]
    fn duplicate_names_are_kept() {
        // "Trust the server": no de-duplication.
        let mut state = SessionState::connecting();
        state.apply(computer("PC1"));
        state.apply(computer("PC1"));
        assert_eq!(state.received, 2);
        assert_eq!(names(&state), ["PC1", "PC1"]);
    }

    #[test]
    fn total_does_not_change_state() {
        let mut state = SessionState::connecting();
        assert!(!state.apply(StreamMessage::Total { count: 10 }));
        assert_eq!(state.state, LoadState::Connecting);
        assert_eq!(state.expected_total, Some(10));
    }

    #[test]
    fn zero_total_stays_unknown() {
        let mut state = SessionState::connecting();
        state.apply(StreamMessage::Total { count: 0 });
        assert_eq!(state.expected_total, None);
        assert_eq!(state.snapshot().progress_percent(), None);
    }

    #[test]
    fn happy_path_scenario() {
        // total 3, three computers, done.
        let mut state = SessionState::connecting();
        state.apply(StreamMessage::Total { count: 3 });
        for name in ["PC1", "PC2", "PC3"] {
            state.apply(computer(name));
        }
        assert!(state.apply(StreamMessage::Done));

        let snap = state.snapshot();
        assert_eq!(snap.state, LoadState::Completed);
        assert_eq!(snap.received, 3);
        assert_eq!(snap.expected_total, Some(3));
        assert_eq!(snap.progress_percent(), Some(100));
        assert!(snap.is_terminal());
    }

    #[test]
    fn error_scenario_preserves_partial_list() {
        let mut state = SessionState::connecting();
        state.apply(computer("PC1"));
        assert!(state.apply(StreamMessage::Error {
            message: "Erreur inconnue".to_owned(),
        }));

        let snap = state.snapshot();
        assert_eq!(snap.state, LoadState::Failed);
        assert_eq!(snap.received, 1);
        assert_eq!(snap.last_error.as_deref(), Some("Erreur inconnue"));
    }

    #[test]
    fn terminal_state_ignores_trailing_messages() {
        let mut state = SessionState::connecting();
        state.apply(computer("PC1"));
        assert!(state.apply(StreamMessage::Done));

        assert!(state.apply(computer("LATE")));
        assert!(state.apply(StreamMessage::Error {
            message: "late failure".to_owned(),
        }));

        assert_eq!(state.state, LoadState::Completed);
        assert_eq!(state.received, 1);
        assert_eq!(names(&state), ["PC1"]);
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn progress_rounds_and_clamps() {
        let mut state = SessionState::connecting();
        state.apply(StreamMessage::Total { count: 3 });
        state.apply(computer("PC1"));
        // 1/3 -> 33%
        assert_eq!(state.snapshot().progress_percent(), Some(33));
        state.apply(computer("PC2"));
        // 2/3 -> 67% (round half-up)
        assert_eq!(state.snapshot().progress_percent(), Some(67));
        state.apply(computer("PC3"));
        state.apply(computer("PC4"));
        // Server under-announced: clamp at 100.
        assert_eq!(state.snapshot().progress_percent(), Some(100));
    }

    #[test]
    fn progress_indeterminate_without_total() {
        let mut state = SessionState::connecting();
        state.apply(computer("PC1"));
        assert_eq!(state.snapshot().progress_percent(), None);
        assert_eq!(state.received, 1);
    }

    #[test]
    fn superseded_generation_cannot_publish() {
        let (snapshot, _) = watch::channel(LoaderSnapshot::idle());
        let shared = Shared {
            snapshot,
            generation: Mutex::new(0),
        };

        let first = shared.begin_session();
        let second = shared.begin_session();

        let mut stale = SessionState::connecting();
        stale.apply(computer("OLD"));
        assert!(!shared.publish(first, stale.snapshot()));

        let mut fresh = SessionState::connecting();
        fresh.apply(computer("NEW"));
        assert!(shared.publish(second, fresh.snapshot()));

        let visible = shared.snapshot.borrow().clone();
        assert_eq!(visible.computers[0].name, "NEW");
        assert_eq!(visible.received, 1);
    }

    #[test]
    fn begin_session_resets_snapshot() {
        let (snapshot, _) = watch::channel(LoaderSnapshot::idle());
        let shared = Shared {
            snapshot,
            generation: Mutex::new(0),
        };

        let generation = shared.begin_session();
        let mut state = SessionState::connecting();
        state.apply(computer("PC1"));
        shared.publish(generation, state.snapshot());
        assert_eq!(shared.snapshot.borrow().received, 1);

        shared.begin_session();
        let reset = shared.snapshot.borrow().clone();
        assert_eq!(reset.received, 0);
        assert!(reset.computers.is_empty());
        assert_eq!(reset.state, LoadState::Connecting);
        assert_eq!(reset.last_error, None);
    }
}
