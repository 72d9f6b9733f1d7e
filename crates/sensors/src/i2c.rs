//! rppal-backed implementation of the bus contract.

use log::info;
use rppal::i2c::I2c;

use crate::types::{BusError, ImuBus};

/// The hardware I2C bus, shared by both sensors.
pub struct RppalBus {
    i2c: I2c,
}

impl RppalBus {
    pub fn new(bus: u8) -> Result<Self, BusError> {
        let i2c = I2c::with_bus(bus)?;
        info!("opened I2C bus {}", bus);
        Ok(Self { i2c })
    }
}

impl ImuBus for RppalBus {
    fn write_register(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), BusError> {
        self.i2c.set_slave_address(addr as u16)?;
        self.i2c.write(&[reg, value])?;
        Ok(())
    }

    fn burst_read(&mut self, addr: u8, start_reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c.set_slave_address(addr as u16)?;
        self.i2c.write_read(&[start_reg], buf)?;
        Ok(())
    }
}
