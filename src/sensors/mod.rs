//! Sensor modules for the BMI270
//!
//! This module provides types, enums, and configuration structures for each sensor
//! in the BMI270:
//! - Accelerometer (3-axis)
//! - Gyroscope (3-axis)
//!
//! All sensor operations are performed through methods on `Bmi270Driver`.

pub mod accelerometer;
pub mod gyroscope;

// Re-export main types
pub use accelerometer::{AccRange, AccelConfig, AccelDataG, AccOdr};
pub use gyroscope::{GyrOdr, GyrRange, GyroConfig, GyroDataDps, GyroDataRps};

/// Filter performance mode (bit 7 of `ACC_CONF` / `GYR_CONF`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterPerf {
    /// Power optimized (averaging)
    PowerOptimized = 0,
    /// Performance optimized (normal filter)
    PerformanceOptimized = 1,
}

impl FilterPerf {
    /// Value of the register bit
    #[must_use]
    pub const fn bit(self) -> bool {
        matches!(self, Self::PerformanceOptimized)
    }

    /// Mode encoded by a register bit
    #[must_use]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Self::PerformanceOptimized
        } else {
            Self::PowerOptimized
        }
    }
}

/// Raw `TEMPERATURE` value the chip reports while no valid reading exists
pub const TEMPERATURE_INVALID: i16 = i16::MIN;

/// Convert the raw `TEMPERATURE` register value to degrees Celsius
///
/// The register reads 0 at 23 °C with 512 LSB/K. [`TEMPERATURE_INVALID`] is
/// not checked here and converts to about -41 °C.
#[must_use]
pub fn temperature_celsius(raw: i16) -> f32 {
    f32::from(raw) / 512.0 + 23.0
}
