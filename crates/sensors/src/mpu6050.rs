//! Register driver for the MPU-6050 inertial sensors.

use crate::types::{DriverError, ImuBus};

// Default and AD0-high bus addresses
pub const MPU_ADDR_A: u8 = 0x68;
pub const MPU_ADDR_B: u8 = 0x69;

// Register map
pub const REG_PWR_MGMT_1: u8 = 0x6B;
pub const REG_ACCEL_XOUT_H: u8 = 0x3B;

/// One burst covers ACCEL_XOUT_H..GYRO_ZOUT_L: accelerometer (6 bytes),
/// temperature (2 bytes, unused), gyroscope (6 bytes).
pub const BURST_LEN: usize = 14;

/// Decoded contents of one register burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

impl RawReading {
    /// Decode a 14-byte burst. Register pairs are big-endian.
    fn from_registers(raw: &[u8; BURST_LEN]) -> Self {
        let be = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]);
        Self {
            accel: [be(0), be(2), be(4)],
            gyro: [be(8), be(10), be(12)],
        }
    }
}

/// One MPU-6050 on the shared bus. The bus itself is passed into each call
/// because both sensors multiplex a single peripheral.
#[derive(Debug, Clone, Copy)]
pub struct Mpu6050 {
    addr: u8,
}

impl Mpu6050 {
    pub fn new(addr: u8) -> Self {
        Self { addr }
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// Take the sensor out of sleep mode. Must run before sampling.
    pub fn wake(&self, bus: &mut dyn ImuBus) -> Result<(), DriverError> {
        bus.write_register(self.addr, REG_PWR_MGMT_1, 0x00)?;
        Ok(())
    }

    /// Read one full accel+gyro burst.
    pub fn read_raw(&self, bus: &mut dyn ImuBus) -> Result<RawReading, DriverError> {
        let mut raw = [0u8; BURST_LEN];
        bus.burst_read(self.addr, REG_ACCEL_XOUT_H, &mut raw)?;
        Ok(RawReading::from_registers(&raw))
    }

    /// Startup self-test: an all-zero burst means the sensor is absent or
    /// unpowered (a live MPU-6050 always reports nonzero accel/temp bits).
    pub fn validate(&self, bus: &mut dyn ImuBus) -> Result<(), DriverError> {
        let mut raw = [0u8; BURST_LEN];
        bus.burst_read(self.addr, REG_ACCEL_XOUT_H, &mut raw)?;
        if raw.iter().all(|&b| b == 0) {
            return Err(DriverError::NotResponding { addr: self.addr });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    #[test]
    fn decodes_big_endian_register_pairs() {
        let mut raw = [0u8; BURST_LEN];
        // accel X = 0x0102, accel Z = -1
        raw[0] = 0x01;
        raw[1] = 0x02;
        raw[4] = 0xFF;
        raw[5] = 0xFF;
        // gyro Y = 0x7FFF
        raw[10] = 0x7F;
        raw[11] = 0xFF;

        let reading = RawReading::from_registers(&raw);
        assert_eq!(reading.accel, [0x0102, 0, -1]);
        assert_eq!(reading.gyro, [0, 0x7FFF, 0]);
    }

    #[test]
    fn wake_writes_power_register() {
        let mut bus = MockBus::new();
        let sensor = Mpu6050::new(MPU_ADDR_A);
        sensor.wake(&mut bus).unwrap();
        assert_eq!(bus.writes, vec![(MPU_ADDR_A, REG_PWR_MGMT_1, 0x00)]);
    }

    #[test]
    fn validate_rejects_all_zero_burst() {
        let mut bus = MockBus::new();
        bus.mark_dead(MPU_ADDR_B);
        let sensor = Mpu6050::new(MPU_ADDR_B);
        assert!(matches!(
            sensor.validate(&mut bus),
            Err(DriverError::NotResponding { addr: MPU_ADDR_B })
        ));
    }

    #[test]
    fn validate_accepts_live_sensor() {
        let mut bus = MockBus::new();
        let sensor = Mpu6050::new(MPU_ADDR_A);
        assert!(sensor.validate(&mut bus).is_ok());
    }
}
