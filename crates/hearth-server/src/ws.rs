//! WebSocket transport.
//!
//! One task per connection. A writer task owns the sink and drains the
//! connection's event receiver; the reader loop parses client frames and
//! hands them to the hub. Liveness pings run in the writer.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use hearth_shared::constants::{CLOSE_EVICTED, CLOSE_PONG_TIMEOUT, MAX_MESSAGE_SIZE};
use hearth_shared::protocol::{ClientEvent, ServerEvent};
use hearth_shared::types::UserId;

use crate::api::AppState;
use crate::auth::VerifiedIdentity;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::hub::{Hub, Session};
use crate::registry::ConnectionHandle;

/// Upper bound on an inbound frame: one maximal message plus envelope.
const MAX_FRAME_SIZE: usize = MAX_MESSAGE_SIZE + 4 * 1024;

/// How long an evicted connection waits for its close frame to flush.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

/// Ping/pong liveness settings for one connection.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    /// `None` disables pings.
    pub ping_interval: Option<Duration>,
    pub pong_timeout: Duration,
}

impl Liveness {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            ping_interval: config.liveness_enabled().then_some(config.ping_interval),
            pong_timeout: config.pong_timeout,
        }
    }
}

/// `GET /ws?token=...`
///
/// The token is verified before the upgrade; a bad token never reaches
/// the hub.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> Result<Response, ServerError> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServerError::Authentication("Missing token".into()))?;
    let identity = state.verifier.verify(&token)?;
    let liveness = Liveness::from_config(&state.config);
    let hub = state.hub.clone();

    Ok(ws
        .max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| run_connection(socket, hub, identity, liveness)))
}

async fn run_connection(
    socket: WebSocket,
    hub: Hub,
    identity: VerifiedIdentity,
    liveness: Liveness,
) {
    let Session { handle, events } = match hub.connect(identity).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Rejected connection");
            return;
        }
    };
    let user = handle.identity().clone();

    info!(
        user = %user.short(),
        username = handle.username(),
        connection = %handle.id(),
        "WebSocket connected"
    );

    let (sink, mut stream) = socket.split();
    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let (close_tx, close_rx) = oneshot::channel::<CloseFrame<'static>>();
    let mut close_tx = Some(close_tx);

    let mut writer = tokio::spawn(write_loop(
        sink,
        events,
        pong_rx,
        close_rx,
        liveness,
        user.clone(),
    ));

    loop {
        tokio::select! {
            _ = handle.evicted() => {
                info!(user = %user.short(), connection = %handle.id(), "Connection replaced by a newer one");
                if let Some(tx) = close_tx.take() {
                    let _ = tx.send(CloseFrame {
                        code: CLOSE_EVICTED,
                        reason: "Replaced by a newer connection".into(),
                    });
                }
                let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut writer).await;
                break;
            }
            _ = &mut writer => {
                debug!(user = %user.short(), "Writer finished");
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_text(&hub, &handle, &text).await,
                Some(Ok(Message::Pong(_))) => {
                    let _ = pong_tx.send(());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(user = %user.short(), error = %e, "WebSocket read error");
                    break;
                }
            },
        }
    }

    writer.abort();
    hub.disconnect(&handle).await;

    info!(user = %user.short(), connection = %handle.id(), "WebSocket disconnected");
}

/// Parse and dispatch one text frame. Failures are answered on this
/// connection only and never close it.
async fn handle_text(hub: &Hub, handle: &ConnectionHandle, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(user = %handle.identity().short(), error = %e, "Ignoring malformed frame");
            return;
        }
    };

    let name = event.name();
    if let Err(e) = hub.dispatch(handle, event).await {
        warn!(
            user = %handle.identity().short(),
            event = name,
            error = %e,
            "Client event failed"
        );
        handle.push(ServerEvent::Error {
            message: e.client_message(),
        });
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut events: mpsc::Receiver<ServerEvent>,
    mut pongs: mpsc::UnboundedReceiver<()>,
    mut close: oneshot::Receiver<CloseFrame<'static>>,
    liveness: Liveness,
    user: UserId,
) {
    let mut ping = liveness.ping_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    let deadline = liveness
        .ping_interval
        .map(|period| period + liveness.pong_timeout);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event.to_json() {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(user = %user.short(), error = %e, "Failed to encode event"),
                }
            }
            Some(()) = pongs.recv() => {
                last_pong = Instant::now();
            }
            _ = next_ping(&mut ping) => {
                if deadline.is_some_and(|limit| last_pong.elapsed() > limit) {
                    warn!(user = %user.short(), "Pong timeout, closing connection");
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: CLOSE_PONG_TIMEOUT,
                            reason: "Pong timeout".into(),
                        })))
                        .await;
                    break;
                }
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            frame = &mut close => {
                if let Ok(frame) = frame {
                    let _ = sink.send(Message::Close(Some(frame))).await;
                }
                break;
            }
        }
    }
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
