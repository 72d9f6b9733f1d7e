//! Common types and traits for the sensor bus

use thiserror::Error;

/// Errors surfaced by a bus implementation.
#[derive(Debug, Error)]
pub enum BusError {
    /// I2C peripheral error
    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),
    /// Transaction-level failure (NACK, timeout, injected fault)
    #[error("bus transaction failed: {0}")]
    Transaction(String),
}

/// Errors that can occur in the sensor driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Bus(#[from] BusError),
    /// Startup validation: the sensor answered with an all-zero burst,
    /// which means it is absent, unpowered, or miswired.
    #[error("sensor 0x{addr:02X} returned an all-zero burst; not responding")]
    NotResponding { addr: u8 },
}

/// Register-level access to the shared two-wire bus.
///
/// The bus is an external collaborator: implementations only promise that a
/// successful burst read returns correctly ordered bytes starting at the
/// requested register. Multi-byte sensor fields arrive big-endian and are
/// decoded by the caller.
pub trait ImuBus: Send {
    /// Write a single byte to a device register.
    fn write_register(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), BusError>;

    /// Read `buf.len()` consecutive bytes starting at `start_reg`.
    fn burst_read(&mut self, addr: u8, start_reg: u8, buf: &mut [u8]) -> Result<(), BusError>;
}
