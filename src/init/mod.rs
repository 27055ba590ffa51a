//! Chip bring-up
//!
//! The BMI270 ships without the firmware its feature engine needs. After every
//! power-on or soft reset the host must upload an 8 KiB configuration file
//! supplied by Bosch and wait for the chip to acknowledge it in
//! `INTERNAL_STATUS`. Until then the chip stays in advanced power save, so every
//! bus transaction needs the long settle delay.
//!
//! ## Sequence
//!
//! 1. **Reset**: SPI activation (dummy read), chip-ID check, soft reset, SPI
//!    re-activation (the reset drops the chip back into I²C mode)
//! 2. **`PowerPrepared`**: disable advanced power save, `INIT_CTRL = 0`
//! 3. **`ConfigUploading`**: 256-byte chunks to `INIT_DATA`, with
//!    `INIT_ADDR_0/1` set to the chunk's word address before each burst
//! 4. **`ConfigUploaded`**: `INIT_CTRL = 1`
//! 5. **Verifying**: poll `INTERNAL_STATUS` every 2 ms for up to 150 ms
//! 6. **Ready**: switch the bus to normal timing, enable accel/gyro/temp,
//!    leave advanced power save off
//!
//! Any failure lands in [`BringUpState::Failed`]. The driver never retries on
//! its own; calling [`bring_up`](crate::Bmi270Driver::bring_up) again restarts
//! from the reset step.
//!
//! ## Usage Example
//!
//! ```ignore
//! # use bmi270::{Bmi270Driver, ConfigBlob, SpiInterface};
//! static BMI270_CONFIG_FILE: [u8; 8192] = *include_bytes!("bmi270_config_file.bin");
//!
//! let mut imu = Bmi270Driver::new(SpiInterface::new(spi_device, Delay));
//! imu.bring_up(&ConfigBlob::new(&BMI270_CONFIG_FILE), &mut Delay)?;
//! assert!(imu.is_ready());
//! ```

pub mod config_file;

pub use config_file::{CONFIG_CHUNK_SIZE, CONFIG_FILE_SIZE, ConfigBlob, ConfigChunk, ConfigChunks};

/// Wait after the soft reset command before the chip accepts commands (µs)
pub const SOFT_RESET_DELAY_US: u32 = 2000;

/// Wait between the SPI activation dummy read and the next transaction (µs)
pub const SPI_ACTIVATION_DELAY_US: u32 = 1000;

/// Longest time the chip may take to report the result of the config load (ms)
pub const INIT_TIMEOUT_MS: u32 = 150;

/// Interval between `INTERNAL_STATUS` polls (ms)
pub const INIT_POLL_INTERVAL_MS: u32 = 2;

/// `INIT_CTRL` value that prepares the config load
pub const INIT_CTRL_PREPARE: u8 = 0x00;

/// `INIT_CTRL` value that starts processing the uploaded config
pub const INIT_CTRL_COMPLETE: u8 = 0x01;

/// Result of the config load as reported in `INTERNAL_STATUS.message`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStatus {
    /// ASIC is not initialized yet
    NotInitialized,
    /// Config accepted
    Ok,
    /// Config rejected
    Error,
    /// Any other message code
    Other(u8),
}

impl From<u8> for InitStatus {
    fn from(message: u8) -> Self {
        match message & 0x0F {
            0x00 => Self::NotInitialized,
            0x01 => Self::Ok,
            0x02 => Self::Error,
            other => Self::Other(other),
        }
    }
}

/// Bring-up progress of a driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringUpState {
    /// No bring-up attempted yet
    Uninitialized,
    /// Soft reset issued, SPI mode re-activated
    Reset,
    /// Advanced power save disabled, config load prepared
    PowerPrepared,
    /// Config file chunks are being written
    ConfigUploading,
    /// Whole config file written, load completion signalled
    ConfigUploaded,
    /// Waiting for `INTERNAL_STATUS`
    Verifying,
    /// Chip initialized, bus running with normal timing
    Ready,
    /// Last bring-up attempt failed
    Failed,
}

impl BringUpState {
    /// Whether sensor configuration and data access are allowed
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}
