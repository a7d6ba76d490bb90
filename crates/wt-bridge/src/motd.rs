//! Loads the configured message-of-the-day file, if any. The file's raw
//! bytes become the first chunk appended to a freshly created session's
//! `HistoryBuffer` (`wt_session::session::TerminalSession::spawn`), riding
//! the same replay-on-attach seam as live PTY output.

/// Read `path`, if set, returning its raw bytes. A missing or unreadable
/// file disables the MOTD for that session rather than failing session
/// creation.
pub fn load(path: Option<&str>) -> Option<Vec<u8>> {
    let path = path?;
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(path, "failed to read motd file: {e}");
            None
        }
    }
}
