//! The streaming task: the consumer side of the hand-off queue.

use std::sync::Arc;

use log::info;

use imu_types::{encode_packet, Packet};

use crate::link::Link;

/// Forward packets to the peer in production order. With no peer connected
/// the packet is consumed and discarded rather than re-queued, which is why
/// the hand-off queue only needs to absorb short bursts.
pub async fn run(packets: flume::Receiver<Packet>, link: Arc<Link>) {
    while let Ok(packet) = packets.recv_async().await {
        if link.peer_count() == 0 {
            continue;
        }

        link.notify_frame(encode_packet(&packet).to_vec());

        if packet.sequence_id % 100 == 0 {
            info!("sent packet seq #{}", packet.sequence_id);
        }
    }
}
