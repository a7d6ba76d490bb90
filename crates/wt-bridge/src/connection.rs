//! `ConnectionHandler` — adapts one browser WebSocket connection to one
//! attachment on one [`wt_session::session::TerminalSession`]. Reconnect is
//! driven entirely by the client; the server keeps no reconnect state — a
//! fresh attach on a new connection is sufficient, since
//! [`wt_session::history::HistoryBuffer`] already replays recent output to
//! any newly attached client.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use wt_session::codec::{ClientMessage, ExitNotice, SessionAnnounce};
use wt_session::registry::CreateParams;
use wt_session::session::OutputMessage;

use crate::AppState;

/// Ping frames are sent at this interval to detect half-open TCP connections.
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// If no output and no heartbeat tick produces traffic for this long, the
/// connection is closed.
const WS_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
pub struct AttachQuery {
    cols: Option<u16>,
    rows: Option<u16>,
    cmd: Option<String>,
}

/// `GET /<prefix>` — attach to a brand new session.
pub async fn attach_new(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<AttachQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, None, query))
}

/// `GET /<prefix>/<id>` — attach to an existing session, or create one when
/// the id does not resolve.
pub async fn attach_existing(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AttachQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, Some(id), query))
}

async fn handle_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    requested_id: Option<String>,
    query: AttachQuery,
) {
    let params = CreateParams {
        command: state.config.pty.shell.clone(),
        argv: query
            .cmd
            .map(|c| vec!["-c".to_string(), c])
            .unwrap_or_else(|| state.config.pty.shell_args.clone()),
        env: Vec::new(),
        cols: query.cols.unwrap_or(state.config.pty.default_cols),
        rows: query.rows.unwrap_or(state.config.pty.default_rows),
        motd: crate::motd::load(state.config.ui.motd_path.as_deref()),
    };

    let (mut sink, mut stream) = socket.split();

    let (session, created) = match state
        .registry
        .resolve_or_create(requested_id.as_deref(), params)
    {
        Ok(pair) => pair,
        Err(e) => {
            warn!("session spawn failed: {e}");
            let _ = sink
                .send(Message::Text(ExitNotice::default().to_json().into()))
                .await;
            return;
        }
    };

    if created {
        let announce = SessionAnnounce::new(session.id().as_str()).to_json();
        if sink.send(Message::Text(announce.into())).await.is_err() {
            return;
        }
    }

    let attachment = session.attach().await;
    debug!(session_id = %session.id(), "client attached");

    // Writer: incoming frames from the browser become PTY input or resize
    // requests. Runs as its own task so a client that only
    // sends and never reads (or vice versa) cannot stall the other half.
    let session_for_writer = session.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Binary(bytes) => session_for_writer.send_input(&bytes).await,
                Message::Text(text) => {
                    if let ClientMessage::Resize { cols, rows } = ClientMessage::parse(&text) {
                        session_for_writer.request_resize(cols as u16, rows as u16);
                    }
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    // Reader: session output becomes outgoing frames; a periodic Ping
    // detects half-open connections, and prolonged silence on both closes
    // the socket.
    let mut heartbeat = tokio::time::interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            outcome = tokio::time::timeout(WS_IDLE_TIMEOUT, attachment.recv()) => {
                match outcome {
                    Ok(Some(OutputMessage::Data(bytes))) => {
                        if sink.send(Message::Binary(bytes.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(OutputMessage::Control(json))) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        debug!("websocket idle timeout, closing");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    writer_task.abort();
    session.detach(&attachment);
    let _ = sink.close().await;
}
