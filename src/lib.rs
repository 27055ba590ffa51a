#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod device;
pub mod interface;
pub mod registers;
pub mod sensors;

pub mod fifo;
pub mod init;
pub mod interrupt;
pub mod power;
pub mod watermark;

// Re-export main types
pub use device::{AccelData, Bmi270Driver, GyroData};
pub use interface::{BusTiming, SpiInterface, TimingMode};
pub use sensors::{
    AccOdr, AccRange, AccelConfig, AccelDataG, FilterPerf, GyrOdr, GyrRange, GyroConfig,
    GyroDataDps, GyroDataRps,
};

pub use fifo::parser::{DecodeError, FifoBatch, FifoCursor, FifoFrame, MalformedFrame, parse_batch};
pub use fifo::{FIFO_SIZE, FifoConfig};
pub use init::{BringUpState, ConfigBlob, InitStatus};
pub use interrupt::{DataInterrupts, IntPin, InterruptPinConfig, InterruptStatus};
pub use power::{PowerConf, SensorPowerConfig};
pub use watermark::{Wake, WatermarkSignal};

/// Expected value of `CHIP_ID` register
pub const CHIP_ID_VALUE: u8 = 0x24;

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Invalid `CHIP_ID` register value (contains the actual value read)
    ChipIdMismatch(u8),
    /// The chip reported `INIT_ERR` after the config file upload
    ConfigRejected,
    /// The chip did not report a config load result in time
    VerificationTimeout,
    /// Invalid argument (buffer size, config file size)
    InvalidArgument,
    /// A register holds a value with no defined meaning
    InvalidRegisterValue(u8),
    /// Operation requires a completed bring-up
    NotReady,
    /// More FIFO frames than fit in the output vector
    FifoOverflow,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
