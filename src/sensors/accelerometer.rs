//! Accelerometer sensor types and configuration
//!
//! Provides types, enums, and utility functions for the BMI270's 3-axis accelerometer.

use super::FilterPerf;

/// Accelerometer measurement range (`ACC_RANGE.acc_range`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccRange {
    /// ±2g range (most sensitive, least range)
    G2 = 0,
    /// ±4g range
    G4 = 1,
    /// ±8g range (reset value)
    G8 = 2,
    /// ±16g range (least sensitive, most range)
    G16 = 3,
}

impl AccRange {
    /// Get the sensitivity in LSB/g (Least Significant Bit per g)
    ///
    /// This is used to convert raw sensor values to physical units.
    #[must_use]
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::G2 => 16384.0,
            Self::G4 => 8192.0,
            Self::G8 => 4096.0,
            Self::G16 => 2048.0,
        }
    }

    /// Get the maximum value in g
    #[must_use]
    pub const fn max_value(self) -> u8 {
        match self {
            Self::G2 => 2,
            Self::G4 => 4,
            Self::G8 => 8,
            Self::G16 => 16,
        }
    }
}

impl TryFrom<u8> for AccRange {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::G2),
            1 => Ok(Self::G4),
            2 => Ok(Self::G8),
            3 => Ok(Self::G16),
            other => Err(other),
        }
    }
}

/// Accelerometer output data rate (`ACC_CONF.acc_odr`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccOdr {
    /// 25/32 Hz
    Hz0_78 = 0x01,
    /// 25/16 Hz
    Hz1_5 = 0x02,
    /// 25/8 Hz
    Hz3_1 = 0x03,
    /// 25/4 Hz
    Hz6_25 = 0x04,
    /// 25/2 Hz
    Hz12_5 = 0x05,
    /// 25 Hz
    Hz25 = 0x06,
    /// 50 Hz
    Hz50 = 0x07,
    /// 100 Hz (reset value)
    Hz100 = 0x08,
    /// 200 Hz
    Hz200 = 0x09,
    /// 400 Hz
    Hz400 = 0x0A,
    /// 800 Hz
    Hz800 = 0x0B,
    /// 1600 Hz
    Hz1600 = 0x0C,
}

impl AccOdr {
    /// Output data rate in Hz
    #[must_use]
    pub const fn hz(self) -> f32 {
        match self {
            Self::Hz0_78 => 0.781_25,
            Self::Hz1_5 => 1.562_5,
            Self::Hz3_1 => 3.125,
            Self::Hz6_25 => 6.25,
            Self::Hz12_5 => 12.5,
            Self::Hz25 => 25.0,
            Self::Hz50 => 50.0,
            Self::Hz100 => 100.0,
            Self::Hz200 => 200.0,
            Self::Hz400 => 400.0,
            Self::Hz800 => 800.0,
            Self::Hz1600 => 1600.0,
        }
    }
}

impl TryFrom<u8> for AccOdr {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => Self::Hz0_78,
            0x02 => Self::Hz1_5,
            0x03 => Self::Hz3_1,
            0x04 => Self::Hz6_25,
            0x05 => Self::Hz12_5,
            0x06 => Self::Hz25,
            0x07 => Self::Hz50,
            0x08 => Self::Hz100,
            0x09 => Self::Hz200,
            0x0A => Self::Hz400,
            0x0B => Self::Hz800,
            0x0C => Self::Hz1600,
            other => return Err(other),
        })
    }
}

/// Accelerometer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelConfig {
    /// Measurement range
    pub range: AccRange,
    /// Output data rate
    pub odr: AccOdr,
    /// Filter performance mode
    pub filter_perf: FilterPerf,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            range: AccRange::G8,
            odr: AccOdr::Hz100,
            filter_perf: FilterPerf::PerformanceOptimized,
        }
    }
}

/// Accelerometer data in physical units (g-force)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelDataG {
    /// X-axis acceleration in g
    pub x: f32,
    /// Y-axis acceleration in g
    pub y: f32,
    /// Z-axis acceleration in g
    pub z: f32,
}

impl AccelDataG {
    /// Create from raw sensor values
    ///
    /// # Arguments
    ///
    /// * `raw_x` - Raw X-axis value
    /// * `raw_y` - Raw Y-axis value
    /// * `raw_z` - Raw Z-axis value
    /// * `sensitivity` - Sensitivity in LSB/g (from `AccRange::sensitivity()`)
    #[must_use]
    pub fn from_raw(raw_x: i16, raw_y: i16, raw_z: i16, sensitivity: f32) -> Self {
        Self {
            x: f32::from(raw_x) / sensitivity,
            y: f32::from(raw_y) / sensitivity,
            z: f32::from(raw_z) / sensitivity,
        }
    }

    /// Get the magnitude of the acceleration vector
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }
}
