//! Terminal session engine: PTY lifecycle, replay history, session-log
//! recording, multi-client fan-out, and the session registry.
//!
//! Data flow: [`pty::PtyProcess`] owns one child process on a pseudo-terminal;
//! [`session::TerminalSession`] bridges it to a dynamic set of attached
//! clients via [`history::HistoryBuffer`] (replay) and [`logger::SessionLogger`]
//! (recording); [`registry::SessionRegistry`] creates, looks up, and evicts
//! sessions by id.

pub mod codec;
pub mod history;
pub mod logger;
pub mod pty;
pub mod registry;
pub mod session;
