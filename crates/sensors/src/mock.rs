//! A stubbed-out bus that does not touch any hardware.
//!
//! Serves generated motion data for `--mock` runs, and supports per-read
//! failure injection plus dead-sensor simulation for scenario tests.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::mpu6050::BURST_LEN;
use crate::types::{BusError, ImuBus};

pub struct MockBus {
    /// Burst reads served so far, per device address.
    reads_seen: HashMap<u8, u64>,
    /// (address, zero-based read index) pairs that fail with a bus error.
    failures: HashSet<(u8, u64)>,
    /// Addresses that answer with all-zero bursts (absent/unpowered sensor).
    dead: HashSet<u8>,
    /// Recorded register writes, in order.
    pub writes: Vec<(u8, u8, u8)>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            reads_seen: HashMap::new(),
            failures: HashSet::new(),
            dead: HashSet::new(),
            writes: Vec::new(),
        }
    }

    /// Make the `index`-th burst read of `addr` fail (indices count per
    /// address, starting at 0).
    pub fn fail_read(&mut self, addr: u8, index: u64) {
        self.failures.insert((addr, index));
    }

    /// Simulate an absent sensor: every burst from `addr` reads all-zero.
    pub fn mark_dead(&mut self, addr: u8) {
        self.dead.insert(addr);
    }

    /// Fill a register image with a plausible motion waveform: slow
    /// sinusoids per axis plus a little noise, offset per device so the two
    /// sensors do not mirror each other.
    fn generate_burst(&self, addr: u8, index: u64, buf: &mut [u8]) {
        let mut rng = rand::thread_rng();
        let phase = index as f32 * 0.06 + addr as f32;

        let mut axes = [0i16; 7];
        for (i, axis) in axes.iter_mut().enumerate() {
            let wave = (phase + i as f32 * 0.9).sin();
            *axis = (wave * 2000.0) as i16 + rng.gen_range(-16..16);
        }
        // Gravity on accel Z, a fixed die temperature word in the middle
        axes[2] = axes[2].saturating_add(16384);
        axes[3] = 0x0B00;

        for (i, axis) in axes.iter().enumerate() {
            let be = axis.to_be_bytes();
            if let Some(pair) = buf.get_mut(i * 2..i * 2 + 2) {
                pair.copy_from_slice(&be);
            }
        }
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuBus for MockBus {
    fn write_register(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), BusError> {
        self.writes.push((addr, reg, value));
        Ok(())
    }

    fn burst_read(&mut self, addr: u8, _start_reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let index = self.reads_seen.entry(addr).or_insert(0);
        let this_read = *index;
        *index += 1;

        if self.failures.contains(&(addr, this_read)) {
            return Err(BusError::Transaction(format!(
                "injected failure for 0x{:02X} read #{}",
                addr, this_read
            )));
        }

        if self.dead.contains(&addr) {
            buf.fill(0);
            return Ok(());
        }

        debug_assert_eq!(buf.len(), BURST_LEN);
        self.generate_burst(addr, this_read, buf);
        Ok(())
    }
}
