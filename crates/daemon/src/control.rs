//! The control task: the only place the run gate is mutated.

use std::sync::Arc;

use tracing::{debug, info};

use imu_sensor::RunGate;
use imu_types::{ControlCommand, LinkEvent};

use crate::link::Link;

/// Consume link events and drive the gate. "ACK" goes out exactly once per
/// accepted Start; a Start during a running session is ignored. Losing the
/// peer stops the session just like an explicit Stop.
pub async fn run(events: flume::Receiver<LinkEvent>, gate: Arc<RunGate>, link: Arc<Link>) {
    while let Ok(event) = events.recv_async().await {
        match event {
            LinkEvent::Command(ControlCommand::Start) => {
                if gate.start() {
                    info!("session started");
                    link.notify_ack();
                } else {
                    debug!("Start ignored; session already running");
                }
            }
            LinkEvent::Command(ControlCommand::Stop) => {
                if gate.stop() {
                    info!("session stopped");
                }
            }
            LinkEvent::Connected => {}
            LinkEvent::Disconnected => {
                if gate.stop() {
                    info!("peer lost; session stopped");
                }
            }
        }
    }
}
