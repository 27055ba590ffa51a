//! Gyroscope sensor types and configuration
//!
//! Provides types, enums, and utility functions for the BMI270's 3-axis gyroscope.

use super::FilterPerf;

/// Gyroscope measurement range (`GYR_RANGE.gyr_range`)
///
/// Sensitivity doubles with every step down: 16.4 LSB/°/s at ±2000°/s up to
/// 262.4 LSB/°/s at ±125°/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyrRange {
    /// ±2000°/s (reset value)
    Dps2000 = 0,
    /// ±1000°/s
    Dps1000 = 1,
    /// ±500°/s
    Dps500 = 2,
    /// ±250°/s
    Dps250 = 3,
    /// ±125°/s
    Dps125 = 4,
}

impl GyrRange {
    /// Get the sensitivity in LSB/(°/s)
    #[must_use]
    pub const fn sensitivity(self) -> f32 {
        match self {
            Self::Dps2000 => 16.4,
            Self::Dps1000 => 32.8,
            Self::Dps500 => 65.6,
            Self::Dps250 => 131.2,
            Self::Dps125 => 262.4,
        }
    }

    /// Get the maximum value in °/s
    #[must_use]
    pub const fn max_value(self) -> u16 {
        match self {
            Self::Dps2000 => 2000,
            Self::Dps1000 => 1000,
            Self::Dps500 => 500,
            Self::Dps250 => 250,
            Self::Dps125 => 125,
        }
    }
}

impl TryFrom<u8> for GyrRange {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Dps2000),
            1 => Ok(Self::Dps1000),
            2 => Ok(Self::Dps500),
            3 => Ok(Self::Dps250),
            4 => Ok(Self::Dps125),
            other => Err(other),
        }
    }
}

/// Gyroscope output data rate (`GYR_CONF.gyr_odr`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyrOdr {
    /// 25 Hz
    Hz25 = 0x06,
    /// 50 Hz
    Hz50 = 0x07,
    /// 100 Hz
    Hz100 = 0x08,
    /// 200 Hz (reset value)
    Hz200 = 0x09,
    /// 400 Hz
    Hz400 = 0x0A,
    /// 800 Hz
    Hz800 = 0x0B,
    /// 1600 Hz
    Hz1600 = 0x0C,
    /// 3200 Hz
    Hz3200 = 0x0D,
}

impl GyrOdr {
    /// Output data rate in Hz
    #[must_use]
    pub const fn hz(self) -> u16 {
        match self {
            Self::Hz25 => 25,
            Self::Hz50 => 50,
            Self::Hz100 => 100,
            Self::Hz200 => 200,
            Self::Hz400 => 400,
            Self::Hz800 => 800,
            Self::Hz1600 => 1600,
            Self::Hz3200 => 3200,
        }
    }
}

impl TryFrom<u8> for GyrOdr {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x06 => Self::Hz25,
            0x07 => Self::Hz50,
            0x08 => Self::Hz100,
            0x09 => Self::Hz200,
            0x0A => Self::Hz400,
            0x0B => Self::Hz800,
            0x0C => Self::Hz1600,
            0x0D => Self::Hz3200,
            other => return Err(other),
        })
    }
}

/// Gyroscope configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GyroConfig {
    /// Measurement range
    pub range: GyrRange,
    /// Output data rate
    pub odr: GyrOdr,
    /// Filter performance mode
    pub filter_perf: FilterPerf,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            range: GyrRange::Dps2000,
            odr: GyrOdr::Hz200,
            filter_perf: FilterPerf::PerformanceOptimized,
        }
    }
}

/// Gyroscope data in degrees per second
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GyroDataDps {
    /// X-axis rotation rate in °/s
    pub x: f32,
    /// Y-axis rotation rate in °/s
    pub y: f32,
    /// Z-axis rotation rate in °/s
    pub z: f32,
}

impl GyroDataDps {
    /// Create from raw sensor values
    ///
    /// # Arguments
    ///
    /// * `raw_x` - Raw X-axis value
    /// * `raw_y` - Raw Y-axis value
    /// * `raw_z` - Raw Z-axis value
    /// * `sensitivity` - Sensitivity in LSB/(°/s) (from `GyrRange::sensitivity()`)
    #[must_use]
    pub fn from_raw(raw_x: i16, raw_y: i16, raw_z: i16, sensitivity: f32) -> Self {
        Self {
            x: f32::from(raw_x) / sensitivity,
            y: f32::from(raw_y) / sensitivity,
            z: f32::from(raw_z) / sensitivity,
        }
    }

    /// Convert to radians per second
    #[must_use]
    pub fn to_radians_per_sec(&self) -> GyroDataRps {
        const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
        GyroDataRps {
            x: self.x * DEG_TO_RAD,
            y: self.y * DEG_TO_RAD,
            z: self.z * DEG_TO_RAD,
        }
    }

    /// Get the magnitude of the rotation rate vector
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }
}

/// Gyroscope data in radians per second
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GyroDataRps {
    /// X-axis rotation rate in rad/s
    pub x: f32,
    /// Y-axis rotation rate in rad/s
    pub y: f32,
    /// Z-axis rotation rate in rad/s
    pub z: f32,
}
