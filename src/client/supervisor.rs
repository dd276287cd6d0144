use std::{future::Future, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc},
    time::sleep,
};
use tracing::{info, warn};

use crate::{
    client::session::ClientSession,
    dto::ws::{ClientFrame, ServerFrame},
};

/// Delay between reconnection attempts.
///
/// Deliberately short and fixed: a foregrounded device should be back on the
/// stream within a blink of a network blip.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Channel pair representing one established relay connection.
///
/// The transport itself stays external: anything that pumps frames into and
/// out of a pair of channels — a WebSocket task, an in-memory loop in tests —
/// can carry a session.
pub struct Link {
    /// Commands published to the bus.
    pub outbound: mpsc::UnboundedSender<ClientFrame>,
    /// Notifications fanned out by the bus.
    pub inbound: mpsc::UnboundedReceiver<ServerFrame>,
}

/// Error produced by a connect attempt.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The relay could not be reached.
    #[error("relay unreachable: {0}")]
    Unreachable(String),
}

/// Keep a session connected for the life of the process.
///
/// Reconnection attempts are unbounded with a short fixed delay rather than
/// backoff: during a brief network blip the priority is shrinking the window
/// of missed events. Every established link opens with the session's rejoin
/// frame so the shared roster reconverges, then inbound frames drive the
/// mirror until the link drops.
pub async fn run<F, Fut>(
    session: Arc<Mutex<ClientSession>>,
    reconnect_delay: Duration,
    mut connect: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Link, LinkError>>,
{
    loop {
        match connect().await {
            Ok(mut link) => {
                if let Some(frame) = session.lock().await.on_connected() {
                    // Fire-and-forget; a dead link is caught by the recv loop.
                    let _ = link.outbound.send(frame);
                }
                while let Some(frame) = link.inbound.recv().await {
                    session.lock().await.receive(&frame);
                }
                info!("relay link closed; reconnecting");
            }
            Err(err) => {
                warn!(error = %err, "relay connection attempt failed");
            }
        }
        sleep(reconnect_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dto::ws::TeamPayload, state::board::Team};
    use tokio::time::timeout;

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.into(),
            name: name.into(),
            color: String::new(),
            avatar: "owl".into(),
            score: 0,
            streak: 0,
        }
    }

    #[tokio::test]
    async fn rejoins_on_every_connect_and_applies_inbound_frames() {
        let session = Arc::new(Mutex::new(ClientSession::with_identity(team(
            "team-1", "Alpha",
        ))));
        let (probe_tx, mut probe_rx) = mpsc::unbounded_channel::<ClientFrame>();

        let supervisor = tokio::spawn(run(
            session.clone(),
            Duration::from_millis(5),
            move || {
                let probe_tx = probe_tx.clone();
                async move {
                    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
                    tokio::spawn(async move {
                        while let Some(frame) = out_rx.recv().await {
                            let _ = probe_tx.send(frame);
                        }
                    });

                    let (in_tx, in_rx) = mpsc::unbounded_channel();
                    in_tx
                        .send(ServerFrame::TeamRegistered(TeamPayload::from(team(
                            "team-2", "Beta",
                        ))))
                        .unwrap();
                    // Dropping the sender ends this link, forcing a reconnect.
                    drop(in_tx);

                    Ok(Link {
                        outbound: out_tx,
                        inbound: in_rx,
                    })
                }
            },
        ));

        let wait = Duration::from_secs(5);
        let first = timeout(wait, probe_rx.recv()).await.unwrap().unwrap();
        assert!(matches!(
            first,
            ClientFrame::TeamRejoin(ref payload) if payload.id == "team-1"
        ));

        // A second rejoin proves the supervisor reconnected after the drop.
        let second = timeout(wait, probe_rx.recv()).await.unwrap().unwrap();
        assert!(matches!(second, ClientFrame::TeamRejoin(_)));

        let guard = session.lock().await;
        assert!(guard.board().team("team-2").is_some());
        drop(guard);

        supervisor.abort();
    }
}
