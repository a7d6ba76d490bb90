//! `TerminalSession` — one PtyProcess shared among a dynamic set of clients,
//! with replay-on-attach, fan-out, last-writer-wins resize, and logging,
//! built around `PtyProcess`/`HistoryBuffer`/`SessionLogger`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use wt_core::SessionId;

use crate::codec::ExitNotice;
use crate::history::HistoryBuffer;
use crate::logger::SessionLogger;
use crate::pty::PtyProcess;

/// Depth of each client's outbound queue. A client that falls this far
/// behind is dropped rather than allowed to stall the pump — the
/// central backpressure decision of this component.
const CLIENT_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Exited,
    Drained,
}

/// One message delivered to an attached client: either raw PTY bytes or a
/// control-channel JSON string.
#[derive(Debug, Clone)]
pub enum OutputMessage {
    Data(Vec<u8>),
    Control(String),
}

/// A client's end of its attachment: consume with `recv().await` until it
/// returns `None` (session torn down or this client dropped for slowness).
pub struct ClientAttachment {
    pub id: u64,
    rx: flume::Receiver<OutputMessage>,
}

impl ClientAttachment {
    pub async fn recv(&self) -> Option<OutputMessage> {
        self.rx.recv_async().await.ok()
    }
}

/// History, the attachment set, and session state behind a single lock.
///
/// These three must move together: a client's history snapshot and its
/// registration for future output have to be taken under the same critical
/// section as the pump's append-then-fan-out, or a chunk (or the exit
/// notice) produced in the gap between snapshot and registration is lost
/// forever rather than delivered exactly once. Folding `state` in here too
/// means the Exited transition and its exit-notice fan-out are atomic with
/// any concurrent `attach()` deciding whether to register or to hand back
/// history-plus-exit immediately.
struct Shared {
    history: HistoryBuffer,
    senders: HashMap<u64, flume::Sender<OutputMessage>>,
    next_id: u64,
    state: SessionState,
}

impl Shared {
    fn new(history: HistoryBuffer) -> Self {
        Self {
            history,
            senders: HashMap::new(),
            next_id: 1,
            state: SessionState::Running,
        }
    }

    /// Fan out to every attached client. A client whose queue is full is
    /// dropped on the spot rather than retried.
    fn fan_out(&mut self, msg: OutputMessage) {
        let mut slow = Vec::new();
        for (&id, tx) in self.senders.iter() {
            if tx.try_send(msg.clone()).is_err() {
                slow.push(id);
            }
        }
        for id in slow {
            warn!(client_id = id, "client queue full, dropping slow client");
            self.senders.remove(&id);
        }
    }

    fn insert(&mut self, tx: flume::Sender<OutputMessage>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.senders.insert(id, tx);
        id
    }

    fn client_count(&self) -> usize {
        self.senders.len()
    }
}

pub struct TerminalSession {
    id: SessionId,
    pty: Arc<PtyProcess>,
    shared: Mutex<Shared>,
    logger: AsyncMutex<SessionLogger>,
    created_at: SystemTime,
    created_at_monotonic: Instant,
    command: String,
    on_drained: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl TerminalSession {
    /// Spawn the PTY and start the output pump. Returns the `PtyError` from
    /// `PtyProcess::spawn` unmodified on failure — the caller (the
    /// registry's `resolve_or_create`) is responsible for reporting that as
    /// an immediate `exit` to the initiating client without ever inserting
    /// a session into the registry.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        id: SessionId,
        command: &str,
        argv: &[String],
        env: &[(String, String)],
        initial_cols: u16,
        initial_rows: u16,
        history_capacity: usize,
        logger: SessionLogger,
        motd: Option<Vec<u8>>,
    ) -> crate::pty::Result<Arc<Self>> {
        let pty = PtyProcess::spawn(command, argv, env, initial_cols, initial_rows)?;

        let mut history = HistoryBuffer::new(history_capacity);
        // The MOTD, if configured, is simply the first chunk ever appended to
        // history — it rides the same replay-on-attach path as PTY output,
        // so no separate delivery mechanism is needed for it to reach the
        // creating client.
        if let Some(motd) = motd.as_deref() {
            history.append(motd);
        }

        let session = Arc::new(Self {
            id,
            pty: Arc::new(pty),
            shared: Mutex::new(Shared::new(history)),
            logger: AsyncMutex::new(logger),
            created_at: SystemTime::now(),
            created_at_monotonic: Instant::now(),
            command: command.to_string(),
            on_drained: Mutex::new(None),
        });

        Self::spawn_pump(session.clone());
        Ok(session)
    }

    fn spawn_pump(session: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                match session.pty.read_next().await {
                    Some(chunk) => {
                        session.logger.lock().await.record(&chunk);
                        // History append and fan-out happen under the same
                        // lock an attaching client's snapshot+register uses,
                        // so neither side can observe a torn half of this
                        // step.
                        let mut shared = session.shared.lock().unwrap_or_else(|e| e.into_inner());
                        shared.history.append(&chunk);
                        shared.fan_out(OutputMessage::Data(chunk));
                    }
                    None => {
                        debug!(session_id = %session.id, "pty reader closed, session exiting");
                        let mut shared = session.shared.lock().unwrap_or_else(|e| e.into_inner());
                        shared.state = SessionState::Exited;
                        shared.fan_out(OutputMessage::Control(ExitNotice::default().to_json()));
                        break;
                    }
                }
            }
            session.maybe_fire_drained();
        });
    }

    /// Install the callback the registry uses to evict this session once it
    /// reaches Drained (`on_drained`). Fires immediately, inline,
    /// if the session is already drained by the time this is called.
    pub fn set_on_drained(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_drained.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(callback));
        if self.is_drained() {
            self.fire_drained_callback();
        }
    }

    fn fire_drained_callback(&self) {
        if let Some(cb) = self.on_drained.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            cb();
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.created_at_monotonic.elapsed()
    }

    pub fn client_count(&self) -> usize {
        self.shared.lock().unwrap_or_else(|e| e.into_inner()).client_count()
    }

    pub fn is_alive(&self) -> bool {
        self.pty.is_alive()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// Register a client, deliver the history snapshot, and return a handle
    /// that streams subsequent output. If the session has already exited,
    /// the client still gets the history plus the `exit` notice and then
    /// the stream closes.
    ///
    /// Snapshot and registration happen under one lock acquisition — the
    /// same lock the pump holds across its own append-then-fan-out step —
    /// so there is no window in which a chunk (or the exit notice) can be
    /// produced between "copy history" and "start receiving future output"
    /// and be delivered to neither.
    pub async fn attach(&self) -> ClientAttachment {
        let (tx, rx) = flume::bounded(CLIENT_QUEUE_DEPTH);
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());

        let snapshot = shared.history.snapshot();
        if !snapshot.is_empty() {
            let _ = tx.try_send(OutputMessage::Data(snapshot));
        }

        if shared.state == SessionState::Exited || shared.state == SessionState::Drained {
            let _ = tx.try_send(OutputMessage::Control(ExitNotice::default().to_json()));
            // No id registered: nothing to detach, and client_count must not
            // count a stream that is already closed.
            return ClientAttachment { id: 0, rx };
        }

        let id = shared.insert(tx);
        ClientAttachment { id, rx }
    }

    /// Idempotent: removing an id twice (or one that was never registered,
    /// e.g. the post-exit attach path above) is a no-op.
    pub fn detach(&self, handle: &ClientAttachment) {
        if handle.id == 0 {
            return;
        }
        {
            let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            shared.senders.remove(&handle.id);
        }
        self.maybe_fire_drained();
    }

    pub async fn send_input(&self, bytes: &[u8]) {
        self.pty.write(bytes).await;
    }

    /// Last-writer-wins: whichever call reaches the PTY resize ioctl last
    /// determines window size. No coordination across concurrent callers
    /// beyond what `PtyProcess::resize`'s own locking provides.
    pub fn request_resize(&self, cols: u16, rows: u16) {
        self.pty.resize(cols, rows);
    }

    /// Tear down the underlying process directly (used by the registry for
    /// administrative shutdown, not part of the client-facing protocol).
    pub async fn terminate(&self) {
        self.pty.terminate().await;
    }

    /// Transition Exited -> Drained exactly once, under the same lock as
    /// every other state/client-set mutation, then fire the registry's
    /// eviction callback outside the lock.
    fn maybe_fire_drained(&self) {
        let became_drained = {
            let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            let drained = shared.state == SessionState::Exited && shared.client_count() == 0;
            if drained {
                shared.state = SessionState::Drained;
            }
            drained
        };
        if became_drained {
            debug!(session_id = %self.id, "session drained");
            self.fire_drained_callback();
        }
    }

    pub fn is_drained(&self) -> bool {
        self.state() == SessionState::Drained
    }
}
