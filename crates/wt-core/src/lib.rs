//! Core library for webtty — shared types, configuration, and errors used by
//! the PTY, session, and bridge layers.
//!
//! This crate provides:
//! - [`session_id::SessionId`] — the opaque session identifier
//! - [`error::WebttyError`] — the shared error taxonomy
//! - [`config::Config`] / [`settings::SettingsManager`] — layered
//!   file/env/CLI configuration

pub mod config;
pub mod error;
pub mod session_id;
pub mod settings;

pub use error::{Result, WebttyError};
pub use session_id::SessionId;
