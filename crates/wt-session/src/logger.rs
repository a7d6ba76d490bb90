//! `SessionLogger` — records a session's output stream in `script(1)` /
//! `scriptreplay(1)` compatible form: a raw data file plus a
//! `.timing` file of `<delta-seconds> <byte-count>` lines. Best-effort: any
//! I/O error disables further logging for the session rather than
//! propagating.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to create session log directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("failed to open session log file {0}: {1}")]
    OpenFile(PathBuf, std::io::Error),
}

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Writes `typescript-<session-id>-<suffix>` and `<same>.timing` under `dir`
/// (full layout: `<logdir>/<YYYY>/<MM>/<DD>/typescript-<sid>-<suffix>`). The
/// caller is responsible for resolving `dir` to the date-stamped directory;
/// this type only owns file naming within it.
pub struct SessionLogger {
    raw: Option<BufWriter<File>>,
    timing: Option<BufWriter<File>>,
    start: Instant,
    last: Instant,
    disabled: bool,
}

impl SessionLogger {
    pub fn create(dir: &Path, session_id: &str, suffix: &str) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| LoggerError::CreateDir(dir.to_path_buf(), e))?;

        let raw_path = dir.join(format!("typescript-{session_id}-{suffix}"));
        let timing_path = dir.join(format!("typescript-{session_id}-{suffix}.timing"));

        let raw = File::create(&raw_path).map_err(|e| LoggerError::OpenFile(raw_path, e))?;
        let timing =
            File::create(&timing_path).map_err(|e| LoggerError::OpenFile(timing_path, e))?;

        let now = Instant::now();
        Ok(Self {
            raw: Some(BufWriter::new(raw)),
            timing: Some(BufWriter::new(timing)),
            start: now,
            last: now,
            disabled: false,
        })
    }

    /// A logger that discards everything — used when session logging is
    /// disabled in configuration, so call sites never need to branch on
    /// `Option<SessionLogger>`.
    pub fn disabled() -> Self {
        let now = Instant::now();
        Self {
            raw: None,
            timing: None,
            start: now,
            last: now,
            disabled: true,
        }
    }

    /// Record one chunk of PTY output. On any write failure, logging
    /// disables itself for the remaining lifetime of the session (best
    /// effort, never fatal to the session itself).
    pub fn record(&mut self, bytes: &[u8]) {
        if self.disabled || bytes.is_empty() {
            return;
        }
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f64();
        self.last = now;

        let wrote = (|| -> std::io::Result<()> {
            if let Some(raw) = self.raw.as_mut() {
                raw.write_all(bytes)?;
                raw.flush()?;
            }
            if let Some(timing) = self.timing.as_mut() {
                writeln!(timing, "{delta:.6} {}", bytes.len())?;
                timing.flush()?;
            }
            Ok(())
        })();

        if let Err(e) = wrote {
            warn!("session log write failed, disabling further logging: {e}");
            self.disabled = true;
            self.raw = None;
            self.timing = None;
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_raw_and_timing_files() {
        let dir = std::env::temp_dir().join(format!("webtty-logger-test-{}", std::process::id()));
        let mut logger = SessionLogger::create(&dir, "abc123", "0").expect("create");
        logger.record(b"hello");
        logger.record(b" world");

        let mut raw = String::new();
        File::open(dir.join("typescript-abc123-0"))
            .unwrap()
            .read_to_string(&mut raw)
            .unwrap();
        assert_eq!(raw, "hello world");

        let mut timing = String::new();
        File::open(dir.join("typescript-abc123-0.timing"))
            .unwrap()
            .read_to_string(&mut timing)
            .unwrap();
        let lines: Vec<&str> = timing.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parts: Vec<&str> = line.split(' ').collect();
            assert_eq!(parts.len(), 2);
            parts[0].parse::<f64>().expect("delta is a float");
            parts[1].parse::<usize>().expect("byte count is an int");
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn disabled_logger_records_nothing() {
        let mut logger = SessionLogger::disabled();
        logger.record(b"ignored");
        assert!(logger.is_disabled());
    }

    #[test]
    fn empty_chunk_is_not_recorded() {
        let dir = std::env::temp_dir().join(format!("webtty-logger-test-empty-{}", std::process::id()));
        let mut logger = SessionLogger::create(&dir, "xyz", "0").expect("create");
        logger.record(b"");
        let meta = std::fs::metadata(dir.join("typescript-xyz-0.timing")).unwrap();
        assert_eq!(meta.len(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
