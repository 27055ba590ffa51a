//! Interrupt configuration and management
//!
//! The BMI270 has two interrupt pins, INT1 and INT2. Each pin has its own
//! electrical configuration (`INT1_IO_CTRL` / `INT2_IO_CTRL`) and any data
//! interrupt can be routed to either pin through `INT_MAP_DATA`:
//! - FIFO full
//! - FIFO watermark reached
//! - Data ready
//!
//! # Example
//!
//! ```ignore
//! # use bmi270::{Bmi270Driver, interrupt::{DataInterrupts, IntPin, InterruptPinConfig}};
//! # let mut imu: Bmi270Driver<_> = todo!();
//! // INT1 as active-high push-pull output
//! imu.configure_interrupt_pin(IntPin::Int1, &InterruptPinConfig::default())?;
//!
//! // Route the FIFO watermark to INT1
//! imu.map_data_interrupts(IntPin::Int1, &DataInterrupts::fifo_batch())?;
//! # Ok::<(), bmi270::Error<()>>(())
//! ```

/// Interrupt output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntPin {
    /// INT1
    Int1,
    /// INT2
    Int2,
}

/// Interrupt pin electrical configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptPinConfig {
    /// Active high (true) or active low (false)
    pub active_high: bool,
    /// Open-drain (true) or push-pull (false)
    pub open_drain: bool,
    /// Drive the pin as an output
    pub output_enable: bool,
}

impl Default for InterruptPinConfig {
    fn default() -> Self {
        Self {
            active_high: true,
            open_drain: false,
            output_enable: true,
        }
    }
}

impl InterruptPinConfig {
    /// Active-low, open-drain output (for a shared, pulled-up interrupt line)
    #[must_use]
    pub const fn open_drain_active_low() -> Self {
        Self {
            active_high: false,
            open_drain: true,
            output_enable: true,
        }
    }

    /// Pin output disabled
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            active_high: true,
            open_drain: false,
            output_enable: false,
        }
    }
}

/// Data interrupt sources routed to one pin
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataInterrupts {
    /// FIFO full
    pub fifo_full: bool,
    /// FIFO fill level reached the watermark
    pub fifo_watermark: bool,
    /// New accelerometer or gyroscope sample
    pub data_ready: bool,
}

impl DataInterrupts {
    /// Only data ready
    #[must_use]
    pub const fn data_ready_only() -> Self {
        Self {
            fifo_full: false,
            fifo_watermark: false,
            data_ready: true,
        }
    }

    /// FIFO watermark and FIFO full, for batch reading
    #[must_use]
    pub const fn fifo_batch() -> Self {
        Self {
            fifo_full: true,
            fifo_watermark: true,
            data_ready: false,
        }
    }

    /// Check if any source is enabled
    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.fifo_full || self.fifo_watermark || self.data_ready
    }
}

/// Data interrupt status (`INT_STATUS_1`, cleared on read)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)]
pub struct InterruptStatus {
    /// FIFO full
    pub fifo_full: bool,
    /// FIFO watermark reached
    pub fifo_watermark: bool,
    /// Error interrupt
    pub error: bool,
    /// Gyroscope data ready
    pub gyro_data_ready: bool,
    /// Accelerometer data ready
    pub accel_data_ready: bool,
}

impl InterruptStatus {
    /// Check if any interrupt is set
    #[must_use]
    pub const fn any_set(&self) -> bool {
        self.fifo_full
            || self.fifo_watermark
            || self.error
            || self.gyro_data_ready
            || self.accel_data_ready
    }
}
