//! `SessionRegistry` — name service and lifetime arbiter for sessions: a
//! single mutex-guarded map from id to session, with a narrow listing
//! contract (id/created_at/client_count/alive).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::info;

use wt_core::{SessionId, WebttyError};

use crate::logger::SessionLogger;
use crate::session::TerminalSession;

/// Parameters for a freshly created session. Ignored entirely when
/// `resolve_or_create` attaches to an existing id.
#[derive(Debug, Clone)]
pub struct CreateParams {
    pub command: String,
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cols: u16,
    pub rows: u16,
    pub motd: Option<Vec<u8>>,
}

/// One row of `list()` output.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: SessionId,
    pub created_at: SystemTime,
    pub client_count: usize,
    pub alive: bool,
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<TerminalSession>>>,
    history_capacity: usize,
    session_log_dir: Option<std::path::PathBuf>,
}

impl SessionRegistry {
    pub fn new(history_capacity: usize, session_log_dir: Option<std::path::PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            history_capacity,
            session_log_dir,
        })
    }

    /// Resolve `requested_id` to an existing session, or create a fresh one
    /// with `params` when it is empty or does not resolve. Returns the
    /// session plus whether it was freshly created, so the caller can decide
    /// whether to emit a `session` control frame. On spawn
    /// failure for a fresh session, nothing is inserted into the registry —
    /// the caller is expected to translate the error into an immediate
    /// `exit` frame to the initiating client without the session ever
    /// running. The underlying `PtyError` is surfaced as `WebttyError::Spawn`,
    /// the shared taxonomy's boundary type for this crate's callers.
    pub fn resolve_or_create(
        self: &Arc<Self>,
        requested_id: Option<&str>,
        params: CreateParams,
    ) -> wt_core::Result<(Arc<TerminalSession>, bool)> {
        if let Some(raw) = requested_id {
            if let Some(id) = SessionId::parse(raw) {
                if let Some(session) = self.get(&id) {
                    return Ok((session, false));
                }
            }
        }

        let id = SessionId::generate();
        let logger = match &self.session_log_dir {
            Some(dir) => {
                let dated_dir = dated_subdir(dir);
                match SessionLogger::create(&dated_dir, id.as_str(), "0") {
                    Ok(logger) => logger,
                    Err(e) => {
                        tracing::warn!("session log disabled for {id}: {e}");
                        SessionLogger::disabled()
                    }
                }
            }
            None => SessionLogger::disabled(),
        };

        let session = TerminalSession::spawn(
            id.clone(),
            &params.command,
            &params.argv,
            &params.env,
            params.cols,
            params.rows,
            self.history_capacity,
            logger,
            params.motd,
        )
        .map_err(|e| WebttyError::Spawn(e.to_string()))?;

        let registry = self.clone();
        let drained_id = id.clone();
        session.set_on_drained(move || registry.remove(&drained_id));

        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).insert(id, session.clone());
        info!(session_id = %session.id(), "session created");
        Ok((session, true))
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<TerminalSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
    }

    /// Ordered by `created_at` ascending.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut rows: Vec<SessionSummary> = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|s| SessionSummary {
                id: s.id().clone(),
                created_at: s.created_at(),
                client_count: s.client_count(),
                alive: s.is_alive(),
            })
            .collect();
        rows.sort_by_key(|r| r.created_at);
        rows
    }

    fn remove(&self, id: &SessionId) {
        if self.sessions.lock().unwrap_or_else(|e| e.into_inner()).remove(id).is_some() {
            info!(session_id = %id, "session drained, removed from registry");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `<logdir>/<YYYY>/<MM>/<DD>/`.
fn dated_subdir(base: &std::path::Path) -> std::path::PathBuf {
    let today = chrono::Utc::now();
    base.join(today.format("%Y").to_string())
        .join(today.format("%m").to_string())
        .join(today.format("%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CreateParams {
        CreateParams {
            command: "/bin/sh".into(),
            argv: vec!["-c".into(), "sleep 1".into()],
            env: vec![],
            cols: 80,
            rows: 24,
            motd: None,
        }
    }

    #[tokio::test]
    async fn resolve_or_create_creates_fresh_session_when_no_id_given() {
        let registry = SessionRegistry::new(1024, None);
        let (session, created) = registry.resolve_or_create(None, params()).expect("create");
        assert!(created);
        assert_eq!(registry.len(), 1);
        session.terminate().await;
    }

    #[tokio::test]
    async fn resolve_or_create_attaches_to_existing_id_ignoring_params() {
        let registry = SessionRegistry::new(1024, None);
        let (first, _) = registry.resolve_or_create(None, params()).expect("create");
        let id_str = first.id().as_str().to_string();

        let mut different = params();
        different.command = "/bin/echo".into();
        let (second, created) = registry
            .resolve_or_create(Some(&id_str), different)
            .expect("resolve");

        assert!(!created);
        assert_eq!(second.id().as_str(), id_str);
        assert_eq!(second.command(), "/bin/sh");
        first.terminate().await;
    }

    #[tokio::test]
    async fn list_is_ordered_by_created_at_ascending() {
        let registry = SessionRegistry::new(1024, None);
        let (s1, _) = registry.resolve_or_create(None, params()).expect("create");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (s2, _) = registry.resolve_or_create(None, params()).expect("create");

        let listed = registry.list();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at <= listed[1].created_at);
        s1.terminate().await;
        s2.terminate().await;
    }

    #[tokio::test]
    async fn drained_session_is_evicted_from_registry() {
        let registry = SessionRegistry::new(1024, None);
        let mut quick = params();
        quick.argv = vec!["-c".into(), "true".into()];
        let (session, _) = registry.resolve_or_create(None, quick).expect("create");
        let attachment = session.attach().await;

        for _ in 0..100 {
            if session.state() == crate::session::SessionState::Exited {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        session.detach(&attachment);

        for _ in 0..50 {
            if registry.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(registry.is_empty());
    }
}
