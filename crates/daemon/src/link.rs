//! The peer-facing link: a WebSocket surface standing in for the radio
//! stack's control, acknowledgment, and data endpoints.
//!
//! Inbound text messages are control writes ("Start" / "Stop"); outbound
//! text carries the acknowledgment and outbound binary carries encoded data
//! frames. Socket lifecycle and control writes are translated into
//! [`LinkEvent`]s on a bounded channel, so the gate is never touched from
//! transport context.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use imu_types::{ControlCommand, LinkEvent, ACK_PAYLOAD};

const NOTIFY_BUFFER: usize = 16;

/// An outbound notification fanned out to connected peers.
#[derive(Debug, Clone)]
pub enum Notification {
    Ack,
    Frame(Vec<u8>),
}

/// Shared link state: the peer counter and the notification fan-out.
pub struct Link {
    peers: AtomicUsize,
    notify_tx: broadcast::Sender<Notification>,
    event_tx: flume::Sender<LinkEvent>,
}

impl Link {
    pub fn new(event_tx: flume::Sender<LinkEvent>) -> Self {
        let (notify_tx, _) = broadcast::channel(NOTIFY_BUFFER);
        Self {
            peers: AtomicUsize::new(0),
            notify_tx,
            event_tx,
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.load(Ordering::Acquire)
    }

    /// Push the Start acknowledgment.
    pub fn notify_ack(&self) {
        let _ = self.notify_tx.send(Notification::Ack);
    }

    /// Push one encoded data frame. Broadcast subscribers only ever see
    /// frames sent after they subscribed, so a late-joining peer gets no
    /// backlog replay.
    pub fn notify_frame(&self, frame: Vec<u8>) {
        let _ = self.notify_tx.send(Notification::Frame(frame));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    pub fn register_peer(&self) {
        self.peers.fetch_add(1, Ordering::AcqRel);
    }

    pub fn unregister_peer(&self) {
        self.peers.fetch_sub(1, Ordering::AcqRel);
    }
}

pub fn router(link: Arc<Link>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(link)
}

async fn ws_handler(ws: WebSocketUpgrade, State(link): State<Arc<Link>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, link))
}

async fn handle_socket(socket: WebSocket, link: Arc<Link>) {
    let (mut outbound, mut inbound) = socket.split();
    let mut notifications = link.subscribe();

    link.register_peer();
    let _ = link.event_tx.send_async(LinkEvent::Connected).await;
    info!("peer connected ({} total)", link.peer_count());

    // Forward notifications to this peer until it goes away.
    let forward = tokio::spawn(async move {
        loop {
            let message = match notifications.recv().await {
                Ok(Notification::Ack) => Message::Text(ACK_PAYLOAD.to_string()),
                Ok(Notification::Frame(frame)) => Message::Binary(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("peer outbound lagged, skipped {} notifications", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if outbound.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = inbound.next().await {
        match message {
            Message::Text(text) => match ControlCommand::parse(text.as_bytes()) {
                Some(command) => {
                    let _ = link.event_tx.send_async(LinkEvent::Command(command)).await;
                }
                None => debug!("ignoring unrecognized control write: {:?}", text),
            },
            Message::Close(_) => break,
            // Binary or ping/pong traffic on the control path is ignored.
            _ => {}
        }
    }

    forward.abort();
    link.unregister_peer();
    let _ = link.event_tx.send_async(LinkEvent::Disconnected).await;
    info!("peer disconnected ({} total)", link.peer_count());
}
