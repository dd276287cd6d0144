use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::broadcast::error::RecvError, sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientFrame, DisconnectPayload, FanOut, ServerFrame},
    state::{ConnectionEntry, Envelope, SharedState, board::event_for_frame},
};

/// Handle the full lifecycle for one relay WebSocket connection.
///
/// The relay never interprets payloads beyond routing: each inbound command is
/// parsed just far enough to pick its rebroadcast name and fan-out scope, is
/// applied to the relay's own board mirror (which feeds the snapshot flusher),
/// and is then fanned out. Malformed frames are logged and dropped — validity
/// is each receiver's problem.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Forwarder task: every envelope the hub fans out that this connection
    // should see becomes an outbound text frame.
    let mut hub_rx = state.hub().subscribe();
    let forward_tx = outbound_tx.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match hub_rx.recv().await {
                Ok(envelope) => {
                    if !envelope.is_for(connection_id) {
                        continue;
                    }
                    let payload = match serde_json::to_string(&envelope.frame) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(error = %err, "failed to serialize relayed frame");
                            continue;
                        }
                    };
                    if forward_tx.send(Message::Text(payload.into())).is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    // Gaps are repaired by snapshot reconciliation, not replay.
                    warn!(%connection_id, skipped, "relay subscriber lagged; frames dropped");
                }
            }
        }
    });

    state
        .connections()
        .insert(connection_id, ConnectionEntry::default());
    info!(%connection_id, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientFrame::from_json_str(&text) {
                Ok(ClientFrame::Unknown) => {
                    warn!(%connection_id, "ignoring unknown event kind");
                }
                Ok(frame) => route_frame(&state, connection_id, frame).await,
                Err(err) => {
                    warn!(%connection_id, error = %err, "failed to parse frame");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    // Teams persist across disconnects: flaky buzzer connectivity must never
    // silently drop a team mid-game. Announce the drop, touch nothing else.
    let dropped_team = state
        .connections()
        .remove(&connection_id)
        .and_then(|(_, entry)| entry.team_id);
    match dropped_team {
        Some(team_id) => {
            info!(%connection_id, team_id, "client disconnected");
            state.hub().broadcast(Envelope {
                origin: connection_id,
                scope: FanOut::All,
                frame: ServerFrame::TeamDisconnected(DisconnectPayload {
                    team_id,
                    connection_id,
                }),
            });
        }
        None => info!(%connection_id, "client disconnected"),
    }

    finalize(writer_task, forward_task, outbound_tx).await;
}

/// Route one inbound command: registry bookkeeping, mirror application, fan-out.
async fn route_frame(state: &SharedState, connection_id: Uuid, frame: ClientFrame) {
    if let Some(team_id) = frame.registered_team_id() {
        if let Some(mut entry) = state.connections().get_mut(&connection_id) {
            entry.team_id = Some(team_id.to_string());
        }
        info!(%connection_id, team_id, "connection associated with team");
    }

    // A global reset truncates the persisted record immediately; the mirror
    // reset rides through the reducer below like any other event.
    if matches!(frame, ClientFrame::ResetAll)
        && let Err(err) = state.snapshot_store().clear().await
    {
        warn!(error = %err, "failed to truncate snapshot store on reset");
    }

    let Some((server_frame, scope)) = frame.routed() else {
        return;
    };

    if let Some(event) = event_for_frame(&server_frame) {
        state.apply_to_mirror(event).await;
    }

    state.hub().broadcast(Envelope {
        origin: connection_id,
        scope,
        frame: server_frame,
    });
}

/// Wind the helper tasks down before returning from the socket handler.
async fn finalize(
    writer_task: JoinHandle<()>,
    forward_task: JoinHandle<()>,
    outbound_tx: mpsc::UnboundedSender<Message>,
) {
    forward_task.abort();
    let _ = forward_task.await;
    drop(outbound_tx);
    let _ = writer_task.await;
}
