//! The fixed-period acquisition loop: the producer side of the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use imu_types::{Packet, Sample, SAMPLES_PER_PACKET};

use crate::gate::RunGate;
use crate::mpu6050::Mpu6050;
use crate::types::ImuBus;

pub const SAMPLE_RATE_HZ: u32 = 100;
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(1000 / SAMPLE_RATE_HZ as u64);

/// Hand-off queue depth between the acquisition thread and the streaming
/// task. Sized to absorb short consumer stalls, not whole sessions.
pub const QUEUE_DEPTH: usize = 10;

/// Accumulates samples into fixed-size batches and stamps sequence ids.
#[derive(Debug, Default)]
pub struct PacketAssembler {
    samples: [Sample; SAMPLES_PER_PACKET],
    index: usize,
    next_seq: u32,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one completed sample. Returns a full packet every
    /// [`SAMPLES_PER_PACKET`] calls; the sequence id is post-incremented so
    /// numbering starts at 0.
    pub fn push(&mut self, sample: Sample) -> Option<Packet> {
        self.samples[self.index] = sample;
        self.index += 1;
        if self.index < SAMPLES_PER_PACKET {
            return None;
        }
        self.index = 0;
        let packet = Packet {
            sequence_id: self.next_seq,
            samples: self.samples,
        };
        self.next_seq = self.next_seq.wrapping_add(1);
        Some(packet)
    }

    /// Discard any partial batch and restart sequence numbering. Called at
    /// session start, so a batch interrupted by Stop is never flushed.
    pub fn reset(&mut self) {
        self.index = 0;
        self.next_seq = 0;
    }
}

/// The producer: owns the bus, polls the gate, and feeds the hand-off queue.
pub struct Sampler {
    bus: Box<dyn ImuBus>,
    sensor_a: Mpu6050,
    sensor_b: Mpu6050,
    gate: Arc<RunGate>,
    tx: flume::Sender<Packet>,
    shutdown: Arc<AtomicBool>,
    assembler: PacketAssembler,
    dropped: u64,
}

impl Sampler {
    pub fn new(
        bus: Box<dyn ImuBus>,
        sensor_a: Mpu6050,
        sensor_b: Mpu6050,
        gate: Arc<RunGate>,
        tx: flume::Sender<Packet>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            bus,
            sensor_a,
            sensor_b,
            gate,
            tx,
            shutdown,
            assembler: PacketAssembler::new(),
            dropped: 0,
        }
    }

    fn begin_session(&mut self) {
        self.assembler.reset();
    }

    /// One scheduling tick: read both sensors back-to-back, and only if both
    /// bursts succeeded fold the reading into the current batch. A failed
    /// tick contributes no sample and never advances the batch.
    pub fn tick(&mut self) {
        let reading_a = self.sensor_a.read_raw(self.bus.as_mut());
        let reading_b = self.sensor_b.read_raw(self.bus.as_mut());

        let (a, b) = match (reading_a, reading_b) {
            (Ok(a), Ok(b)) => (a, b),
            (a, b) => {
                for (sensor, result) in [(&self.sensor_a, &a), (&self.sensor_b, &b)] {
                    if let Err(e) = result {
                        warn!("sensor 0x{:02X} read failed: {}", sensor.addr(), e);
                    }
                }
                return;
            }
        };

        let sample = Sample {
            time_offset: self.gate.elapsed_ms(),
            accel_a: a.accel,
            gyro_a: a.gyro,
            accel_b: b.accel,
            gyro_b: b.gyro,
        };

        if let Some(packet) = self.assembler.push(sample) {
            // Never block the tick: a full queue means the consumer is
            // stalled, and stale data is worse than missing data.
            if let Err(flume::TrySendError::Full(packet)) = self.tx.try_send(packet) {
                self.dropped += 1;
                debug!(
                    "hand-off queue full, dropped packet {} ({} dropped so far)",
                    packet.sequence_id, self.dropped
                );
            }
        }
    }

    /// The acquisition loop. Deadlines advance from the session's reference
    /// tick (`start + n * period`), so one late wake does not shift the rest
    /// of the schedule.
    pub fn run(mut self) {
        info!("acquisition thread started ({} Hz)", SAMPLE_RATE_HZ);
        let mut was_running = false;
        let mut next_deadline = Instant::now();

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            if !self.gate.is_running() {
                was_running = false;
                thread::sleep(SAMPLE_PERIOD);
                continue;
            }

            if !was_running {
                self.begin_session();
                next_deadline = Instant::now();
                was_running = true;
            }

            next_deadline += SAMPLE_PERIOD;
            if let Some(wait) = next_deadline.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }

            // Re-check after the timed wait so Stop takes effect within one
            // period; the partial batch is discarded on the next Start.
            if self.gate.is_running() {
                self.tick();
            }
        }
        info!("acquisition thread stopped");
    }

    /// Move the sampler onto its own thread. It runs until the shutdown
    /// flag is set.
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("imu-acquisition".into())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;
    use crate::mpu6050::{MPU_ADDR_A, MPU_ADDR_B};

    fn test_sampler(
        bus: MockBus,
        depth: usize,
    ) -> (Sampler, flume::Receiver<Packet>, Arc<RunGate>) {
        let (tx, rx) = flume::bounded(depth);
        let gate = Arc::new(RunGate::new());
        gate.start();
        let sampler = Sampler::new(
            Box::new(bus),
            Mpu6050::new(MPU_ADDR_A),
            Mpu6050::new(MPU_ADDR_B),
            gate.clone(),
            tx,
            Arc::new(AtomicBool::new(false)),
        );
        (sampler, rx, gate)
    }

    #[test]
    fn packet_emitted_after_three_good_ticks() {
        let (mut sampler, rx, _gate) = test_sampler(MockBus::new(), QUEUE_DEPTH);

        sampler.tick();
        sampler.tick();
        assert!(rx.is_empty(), "no packet before the batch is full");
        sampler.tick();

        let packet = rx.try_recv().unwrap();
        assert_eq!(packet.sequence_id, 0);
        assert!(rx.is_empty());
    }

    #[test]
    fn sequence_ids_increase_within_a_session() {
        let (mut sampler, rx, _gate) = test_sampler(MockBus::new(), QUEUE_DEPTH);

        for _ in 0..9 {
            sampler.tick();
        }
        let seqs: Vec<u32> = rx.drain().map(|p| p.sequence_id).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn failed_tick_contributes_no_sample() {
        // Ticks: good, good, sensor-A failure, good. The failed tick must
        // not advance the batch, so one packet forms from the three good
        // ticks and nothing else is emitted.
        let mut bus = MockBus::new();
        bus.fail_read(MPU_ADDR_A, 2);
        let (mut sampler, rx, _gate) = test_sampler(bus, QUEUE_DEPTH);

        for _ in 0..4 {
            sampler.tick();
        }

        let packets: Vec<Packet> = rx.drain().collect();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].sequence_id, 0);
    }

    #[test]
    fn failed_b_read_also_skips_the_tick() {
        let mut bus = MockBus::new();
        bus.fail_read(MPU_ADDR_B, 0);
        let (mut sampler, rx, _gate) = test_sampler(bus, QUEUE_DEPTH);

        for _ in 0..3 {
            sampler.tick();
        }
        assert!(rx.is_empty(), "two good ticks are not a full batch");
        sampler.tick();
        assert_eq!(rx.try_recv().unwrap().sequence_id, 0);
    }

    #[test]
    fn partial_batch_is_discarded_on_restart() {
        let (mut sampler, rx, gate) = test_sampler(MockBus::new(), QUEUE_DEPTH);

        sampler.tick();
        sampler.tick();
        gate.stop();

        gate.start();
        sampler.begin_session();
        sampler.tick();
        sampler.tick();
        sampler.tick();

        let packets: Vec<Packet> = rx.drain().collect();
        assert_eq!(packets.len(), 1, "the two pre-stop samples must not surface");
        assert_eq!(packets[0].sequence_id, 0);
    }

    #[test]
    fn restart_resets_sequence_numbering() {
        let (mut sampler, rx, gate) = test_sampler(MockBus::new(), QUEUE_DEPTH);

        for _ in 0..6 {
            sampler.tick();
        }
        assert_eq!(
            rx.drain().map(|p| p.sequence_id).collect::<Vec<_>>(),
            vec![0, 1]
        );

        gate.stop();
        gate.start();
        sampler.begin_session();
        for _ in 0..3 {
            sampler.tick();
        }
        assert_eq!(rx.try_recv().unwrap().sequence_id, 0);
    }

    #[test]
    fn overflow_drops_newest_packets_without_blocking() {
        // No consumer: after the queue holds QUEUE_DEPTH packets, further
        // completed batches are dropped and production keeps going.
        let (mut sampler, rx, _gate) = test_sampler(MockBus::new(), QUEUE_DEPTH);

        for _ in 0..(QUEUE_DEPTH + 2) * SAMPLES_PER_PACKET {
            sampler.tick();
        }

        let seqs: Vec<u32> = rx.drain().map(|p| p.sequence_id).collect();
        assert_eq!(seqs.len(), QUEUE_DEPTH);
        assert_eq!(seqs, (0..QUEUE_DEPTH as u32).collect::<Vec<_>>());
        assert_eq!(sampler.dropped, 2);
    }

    #[test]
    fn time_offsets_are_non_decreasing_within_a_packet() {
        let (mut sampler, rx, _gate) = test_sampler(MockBus::new(), QUEUE_DEPTH);

        sampler.tick();
        std::thread::sleep(Duration::from_millis(2));
        sampler.tick();
        std::thread::sleep(Duration::from_millis(2));
        sampler.tick();

        let packet = rx.try_recv().unwrap();
        assert!(packet.samples[0].time_offset <= packet.samples[1].time_offset);
        assert!(packet.samples[1].time_offset <= packet.samples[2].time_offset);
    }
}
