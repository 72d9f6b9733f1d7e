pub mod acquisition;
pub mod gate;
pub mod i2c;
pub mod mock;
pub mod mpu6050;
pub mod types;

// Re-export the main types that users need
pub use acquisition::{PacketAssembler, Sampler, QUEUE_DEPTH, SAMPLE_PERIOD, SAMPLE_RATE_HZ};
pub use gate::RunGate;
pub use i2c::RppalBus;
pub use mock::MockBus;
pub use mpu6050::{Mpu6050, RawReading, MPU_ADDR_A, MPU_ADDR_B};
pub use types::{BusError, DriverError, ImuBus};
