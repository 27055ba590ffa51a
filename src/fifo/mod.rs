//! FIFO buffer management
//!
//! The BMI270 has a 2 KiB FIFO. In header mode every frame starts with a
//! one-byte header that says what follows, so accelerometer-only,
//! gyroscope-only and combined frames can be mixed with control frames
//! (skip, sensor time, config change) in one stream. See [`parser`] for the
//! frame layouts.
//!
//! The usual flow is: configure once, map the watermark interrupt to a pin,
//! then on every watermark wake query the fill level, burst-read that many
//! bytes and decode them.
//!
//! # Example
//!
//! ```ignore
//! # use bmi270::{Bmi270Driver, FifoConfig, IntPin, fifo::parser::FifoCursor};
//! # let mut imu: Bmi270Driver<_> = todo!();
//! let config = FifoConfig {
//!     watermark: 512,
//!     ..FifoConfig::default()
//! };
//! imu.fifo_configure(&config)?;
//! imu.enable_fifo_watermark_interrupt(IntPin::Int1)?;
//!
//! // On watermark interrupt:
//! let mut buffer = [0u8; 2048];
//! let len = imu.fifo_drain(&mut buffer)?;
//! for frame in FifoCursor::new(&buffer[..len]).flatten() {
//!     // ...
//! }
//! # Ok::<(), bmi270::Error<()>>(())
//! ```

pub mod parser;

/// FIFO size in bytes
pub const FIFO_SIZE: u16 = 2048;

/// Largest watermark the `FIFO_WTM` registers are allowed to hold (bytes)
pub const FIFO_WATERMARK_MAX: u16 = 2047;

/// Mask applied to the raw `FIFO_LENGTH` value
pub const FIFO_LENGTH_MASK: u16 = 0x07FF;

/// FIFO configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)]
pub struct FifoConfig {
    /// Store accelerometer data
    pub acc_enable: bool,
    /// Store gyroscope data
    pub gyr_enable: bool,
    /// Prefix every frame with a header byte
    pub header_enable: bool,
    /// Stop writing when full instead of overwriting the oldest frames
    pub stop_on_full: bool,
    /// Watermark level in bytes. 0 leaves the watermark registers untouched;
    /// values above [`FIFO_WATERMARK_MAX`] are clamped.
    pub watermark: u16,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            acc_enable: true,
            gyr_enable: true,
            header_enable: true,
            stop_on_full: false,
            watermark: 0,
        }
    }
}

impl FifoConfig {
    /// Bytes per data frame produced by this configuration (header mode)
    ///
    /// Returns 0 when no sensor is enabled.
    #[must_use]
    pub const fn frame_size(&self) -> usize {
        match (self.acc_enable, self.gyr_enable) {
            (true, true) => parser::FRAME_LEN_ACC_GYR,
            (true, false) => parser::FRAME_LEN_ACC,
            (false, true) => parser::FRAME_LEN_GYR,
            (false, false) => 0,
        }
    }
}

/// Clamp a requested watermark to what the chip can hold
#[must_use]
pub const fn clamp_watermark(watermark: u16) -> u16 {
    if watermark > FIFO_WATERMARK_MAX {
        FIFO_WATERMARK_MAX
    } else {
        watermark
    }
}

/// Split a watermark into the `FIFO_WTM_0` and `FIFO_WTM_1` register values
///
/// The level is expressed in bytes. The low byte goes to `FIFO_WTM_0` and
/// bits 12:8 go to `FIFO_WTM_1`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn split_watermark(watermark: u16) -> (u8, u8) {
    ((watermark & 0xFF) as u8, ((watermark >> 8) & 0x1F) as u8)
}

/// Rebuild a watermark from the `FIFO_WTM_0` and `FIFO_WTM_1` register values
#[must_use]
pub const fn join_watermark(wtm_0: u8, wtm_1: u8) -> u16 {
    ((wtm_1 as u16 & 0x1F) << 8) | wtm_0 as u16
}

/// Decode the `FIFO_LENGTH_0/1` register pair into a fill level in bytes
#[must_use]
pub const fn decode_length(raw: [u8; 2]) -> u16 {
    u16::from_le_bytes(raw) & FIFO_LENGTH_MASK
}
