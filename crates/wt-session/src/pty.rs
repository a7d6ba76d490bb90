//! `PtyProcess` — owns one child process attached to a pseudo-terminal.
//! Uses `portable-pty` for OS-level PTY allocation and process spawn, with
//! a dedicated reader thread and a dedicated writer thread bridging the
//! blocking PTY master fd to bounded `flume` channels the async session
//! pump can await on. This realizes a non-blocking read /
//! retry-until-drained write contract via a threaded-runtime option a
//! pure-async PTY layer can't offer.

use std::io::{Read as IoRead, Write as IoWrite};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;
use tracing::{debug, warn};

/// Size of the bounded channel between the reader/writer threads and the
/// async session pump. Provides the backpressure point between the PTY
/// and the session that owns it.
const PTY_CHANNEL_DEPTH: usize = 256;

/// Bounded total retry time for a write before the data is dropped.
/// The writer thread here blocks on a bounded channel send rather than an
/// EAGAIN loop, so this bound governs how long `write()` waits for channel
/// capacity before giving up.
const WRITE_RETRY_BUDGET: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum PtyError {
    #[error("pty spawn failed: {0}")]
    SpawnFailed(String),
    #[error("pty i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pty internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PtyError>;

/// One child process attached to a pseudo-terminal.
///
/// `alive` is derived on demand from `try_wait()` rather
/// than cached, so it can never go stale between reads.
pub struct PtyProcess {
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    master: Arc<Mutex<Box<dyn MasterPty + Send>>>,
    reader: flume::Receiver<Vec<u8>>,
    writer: flume::Sender<Vec<u8>>,
    exit_status: Arc<Mutex<Option<i32>>>,
    _reader_thread: Option<std::thread::JoinHandle<()>>,
    _writer_thread: Option<std::thread::JoinHandle<()>>,
}

impl PtyProcess {
    /// Allocate a PTY pair, apply `initial_cols`/`initial_rows` (so the
    /// child's first output is already correctly formatted), then
    /// fork/exec `command` with `env` set.
    pub fn spawn(
        command: &str,
        argv: &[String],
        env: &[(String, String)],
        initial_cols: u16,
        initial_rows: u16,
    ) -> Result<Self> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: initial_rows,
                cols: initial_cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;

        let mut cmd = CommandBuilder::new(command);
        for arg in argv {
            cmd.arg(arg);
        }
        for (k, v) in env {
            cmd.env(k, v);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;
        debug!(command, ?argv, "spawned pty process");

        let child = Arc::new(Mutex::new(child));

        let (read_tx, read_rx) = flume::bounded::<Vec<u8>>(PTY_CHANNEL_DEPTH);
        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;
        let reader_thread = std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if read_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("pty reader stopped: {e}");
                        break;
                    }
                }
            }
        });

        let (write_tx, write_rx) = flume::bounded::<Vec<u8>>(PTY_CHANNEL_DEPTH);
        let mut writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(e.to_string()))?;
        let writer_thread = std::thread::spawn(move || {
            while let Ok(data) = write_rx.recv() {
                if writer.write_all(&data).is_err() {
                    break;
                }
                let _ = writer.flush();
            }
        });

        Ok(Self {
            child,
            master: Arc::new(Mutex::new(pair.master)),
            reader: read_rx,
            writer: write_tx,
            exit_status: Arc::new(Mutex::new(None)),
            _reader_thread: Some(reader_thread),
            _writer_thread: Some(writer_thread),
        })
    }

    /// Drain whatever is currently buffered without blocking. Returns an
    /// empty vec both when nothing is ready and (distinguishably, via
    /// [`is_alive`](Self::is_alive)) after the child has exited.
    pub fn read_available(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        while let Ok(chunk) = self.reader.try_recv() {
            buf.extend_from_slice(&chunk);
        }
        buf
    }

    /// Await the next chunk of output, or `None` once the reader channel
    /// closes (child exited and all buffered output drained).
    pub async fn read_next(&self) -> Option<Vec<u8>> {
        self.reader.clone().recv_async().await.ok()
    }

    /// Write input to the PTY. Retries internally (via the bounded channel)
    /// until the data is accepted or [`WRITE_RETRY_BUDGET`] elapses; drops
    /// silently on a dead process per (`WriteToDeadProcess`).
    pub async fn write(&self, bytes: &[u8]) {
        if !self.is_alive() {
            return;
        }
        let data = bytes.to_vec();
        match tokio::time::timeout(WRITE_RETRY_BUDGET, self.writer.send_async(data)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) | Err(_) => {
                debug!("dropping pty write: channel closed or write budget exceeded");
            }
        }
    }

    /// Issue the terminal window-size ioctl. No-op once the child has
    /// exited; ioctl failures are logged, never propagated.
    pub fn resize(&self, cols: u16, rows: u16) {
        if !self.is_alive() {
            return;
        }
        let master = self.master.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = master.resize(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        }) {
            warn!("pty resize ioctl failed: {e}");
        }
    }

    /// Whether the child process has not yet been reaped as exited.
    pub fn is_alive(&self) -> bool {
        let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
        match child.try_wait() {
            Ok(Some(status)) => {
                *self.exit_status.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(status.exit_code() as i32);
                false
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Terminate the child: SIGHUP, then SIGCONT (wakes a stopped child so
    /// it can receive the hangup), then a bounded wait, then SIGKILL if
    /// still alive. Idempotent — a second call finds the child already
    /// reaped and is a no-op. Closes the master either way.
    pub async fn terminate(&self) {
        #[cfg(unix)]
        {
            let pid = {
                let child = self.child.lock().unwrap_or_else(|e| e.into_inner());
                child.process_id()
            };
            if let Some(pid) = pid {
                unsafe {
                    libc::kill(pid as i32, libc::SIGHUP);
                    libc::kill(pid as i32, libc::SIGCONT);
                }
            }
        }

        let deadline = tokio::time::Instant::now() + Duration::from_millis(500);
        while tokio::time::Instant::now() < deadline {
            if !self.is_alive() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        if self.is_alive() {
            let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Present only after the child has been reaped.
    pub fn exit_status(&self) -> Option<i32> {
        *self.exit_status.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for PtyProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyProcess")
            .field("alive", &self.is_alive())
            .finish()
    }
}
