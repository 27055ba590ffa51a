//! Power configuration
//!
//! Two registers control power on the BMI270:
//! - `PWR_CTRL` switches the individual sensors on or off
//! - `PWR_CONF` controls advanced power save and the FIFO self-wake-up
//!
//! Advanced power save must stay off while the config file is uploaded. After
//! bring-up the driver enables accelerometer, gyroscope and temperature sensor
//! and writes `PWR_CONF = 0x02` (power save off, FIFO self-wake-up on).
//!
//! # Example
//!
//! ```ignore
//! # use bmi270::{Bmi270Driver, power::SensorPowerConfig};
//! # let mut imu: Bmi270Driver<_> = todo!();
//! // Accelerometer only
//! imu.set_sensor_power(&SensorPowerConfig::accel_only())?;
//! # Ok::<(), bmi270::Error<()>>(())
//! ```

/// Sensor enables (`PWR_CTRL`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)]
pub struct SensorPowerConfig {
    /// Accelerometer
    pub accel: bool,
    /// Gyroscope
    pub gyro: bool,
    /// Temperature sensor
    pub temperature: bool,
    /// Auxiliary interface
    pub aux: bool,
}

impl Default for SensorPowerConfig {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl SensorPowerConfig {
    /// Accelerometer, gyroscope and temperature sensor on
    #[must_use]
    pub const fn all_enabled() -> Self {
        Self {
            accel: true,
            gyro: true,
            temperature: true,
            aux: false,
        }
    }

    /// Accelerometer and temperature sensor on, gyroscope off
    #[must_use]
    pub const fn accel_only() -> Self {
        Self {
            accel: true,
            gyro: false,
            temperature: true,
            aux: false,
        }
    }

    /// Everything off
    #[must_use]
    pub const fn all_disabled() -> Self {
        Self {
            accel: false,
            gyro: false,
            temperature: false,
            aux: false,
        }
    }
}

/// Power mode configuration (`PWR_CONF`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerConf {
    /// Advanced power save; requires the long settle delay while active
    pub adv_power_save: bool,
    /// Allow FIFO reads while in advanced power save
    pub fifo_self_wake_up: bool,
    /// Fast power up
    pub fast_power_up: bool,
}

impl PowerConf {
    /// Value used during config upload (`0x00`)
    #[must_use]
    pub const fn upload() -> Self {
        Self {
            adv_power_save: false,
            fifo_self_wake_up: false,
            fast_power_up: false,
        }
    }

    /// Value used once bring-up completed (`0x02`)
    #[must_use]
    pub const fn normal() -> Self {
        Self {
            adv_power_save: false,
            fifo_self_wake_up: true,
            fast_power_up: false,
        }
    }

    /// Raw register value
    #[must_use]
    pub const fn to_raw(&self) -> u8 {
        (self.adv_power_save as u8)
            | ((self.fifo_self_wake_up as u8) << 1)
            | ((self.fast_power_up as u8) << 2)
    }
}
