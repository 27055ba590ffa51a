//! High-level driver API for the BMI270
//!
//! This module provides the driver handle: chip bring-up, sensor
//! configuration, data reading, interrupt routing and FIFO access.
//!
//! Everything except bring-up itself and a few diagnostic reads requires a
//! completed bring-up and fails with [`Error::NotReady`] otherwise, without
//! touching the bus.

use crate::fifo::{
    FIFO_SIZE, FifoConfig, clamp_watermark, decode_length, join_watermark, split_watermark,
};
use crate::init::{
    BringUpState, ConfigBlob, INIT_CTRL_COMPLETE, INIT_CTRL_PREPARE, INIT_POLL_INTERVAL_MS,
    INIT_TIMEOUT_MS, InitStatus, SOFT_RESET_DELAY_US, SPI_ACTIVATION_DELAY_US,
};
use crate::interface::{BusTiming, TimingMode, bit_len};
use crate::interrupt::{DataInterrupts, IntPin, InterruptPinConfig, InterruptStatus};
use crate::power::{PowerConf, SensorPowerConfig};
use crate::registers::{Bmi270 as RegisterDevice, addr, cmd};
use crate::sensors::{
    AccOdr, AccRange, AccelConfig, AccelDataG, FilterPerf, GyrOdr, GyrRange, GyroConfig,
    GyroDataDps, TEMPERATURE_INVALID, temperature_celsius,
};
use crate::watermark::Wake;
use crate::{CHIP_ID_VALUE, Error};

// Only import RegisterInterface when not using async feature
#[cfg(not(feature = "async"))]
use device_driver::RegisterInterface;

/// Accelerometer data (raw 16-bit values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AccelData {
    /// X-axis acceleration (raw)
    pub x: i16,
    /// Y-axis acceleration (raw)
    pub y: i16,
    /// Z-axis acceleration (raw)
    pub z: i16,
}

/// Gyroscope data (raw 16-bit values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GyroData {
    /// X-axis rotation (raw)
    pub x: i16,
    /// Y-axis rotation (raw)
    pub y: i16,
    /// Z-axis rotation (raw)
    pub z: i16,
}

fn axes(buffer: &[u8]) -> (i16, i16, i16) {
    (
        i16::from_le_bytes([buffer[0], buffer[1]]),
        i16::from_le_bytes([buffer[2], buffer[3]]),
        i16::from_le_bytes([buffer[4], buffer[5]]),
    )
}

impl AccelData {
    fn from_le(buffer: &[u8]) -> Self {
        let (x, y, z) = axes(buffer);
        Self { x, y, z }
    }
}

impl GyroData {
    fn from_le(buffer: &[u8]) -> Self {
        let (x, y, z) = axes(buffer);
        Self { x, y, z }
    }
}

/// Main driver for the BMI270
pub struct Bmi270Driver<I> {
    device: RegisterDevice<I>,
    state: BringUpState,
    // Ranges used for physical unit conversion
    accel_range: AccRange,
    gyro_range: GyrRange,
}

impl<I> Bmi270Driver<I> {
    /// Create a new BMI270 driver instance
    ///
    /// No bus access happens here. Call [`bring_up`](Self::bring_up) before
    /// using any sensor function.
    pub fn new(interface: I) -> Self {
        Self {
            device: RegisterDevice::new(interface),
            state: BringUpState::Uninitialized,
            accel_range: AccelConfig::default().range,
            gyro_range: GyroConfig::default().range,
        }
    }

    /// Current bring-up state
    pub const fn state(&self) -> BringUpState {
        self.state
    }

    /// Whether bring-up completed successfully
    pub const fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Consume the driver and return the bus interface
    pub fn release(self) -> I {
        self.device.interface
    }

    /// Get a reference to the underlying register device
    ///
    /// Registers written through this handle bypass the bring-up gate and the
    /// cached sensor ranges.
    pub const fn device(&self) -> &RegisterDevice<I> {
        &self.device
    }

    /// Get a mutable reference to the underlying register device
    pub const fn device_mut(&mut self) -> &mut RegisterDevice<I> {
        &mut self.device
    }

    const fn ensure_ready<E>(&self) -> Result<(), Error<E>> {
        if self.state.is_ready() {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    fn reset_cached_ranges(&mut self) {
        self.accel_range = AccelConfig::default().range;
        self.gyro_range = GyroConfig::default().range;
    }
}

impl<I: BusTiming> Bmi270Driver<I> {
    /// Settle-delay regime currently applied by the bus interface
    pub fn timing(&self) -> TimingMode {
        self.device.interface.timing()
    }

    /// A failed bring-up that already switched to normal timing got past
    /// `INIT_OK`; only the final power writes are missing.
    fn config_accepted(&self) -> bool {
        self.state == BringUpState::Failed && self.timing() == TimingMode::Normal
    }
}

#[cfg(not(feature = "async"))]
impl<I> Bmi270Driver<I>
where
    I: RegisterInterface<AddressType = u8> + BusTiming,
{
    /// Bring the chip from power-on to a feature-ready state
    ///
    /// Performs the soft reset, uploads the config file and waits for the chip
    /// to accept it. On success the bus switches to normal timing and the
    /// accelerometer, gyroscope and temperature sensor are enabled.
    ///
    /// Calling this on a driver that is already ready does nothing. If an
    /// earlier attempt failed after the chip accepted the config file, only the
    /// sensor enable and power mode writes are retried; the chip is not reset.
    ///
    /// # Arguments
    ///
    /// * `blob` - The 8 KiB BMI270 config file
    /// * `delay` - Delay provider implementing `embedded_hal::delay::DelayNs`
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the driver in [`BringUpState::Failed`] if:
    /// - Communication with the device fails
    /// - The chip ID is not `0x24`
    /// - The chip reports that it rejected the config file
    /// - The chip does not report a result within 150 ms
    ///
    /// # Example
    ///
    /// ```ignore
    /// use embassy_time::Delay;
    /// let mut delay = Delay;
    /// driver.bring_up(&ConfigBlob::new(&BMI270_CONFIG_FILE), &mut delay)?;
    /// ```
    pub fn bring_up<D>(&mut self, blob: &ConfigBlob<'_>, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        if self.state.is_ready() {
            return Ok(());
        }

        let result = if self.config_accepted() {
            self.finish_bring_up()
        } else {
            self.run_bring_up(blob, delay)
        };
        if result.is_err() {
            self.state = BringUpState::Failed;

            #[cfg(feature = "defmt")]
            defmt::warn!("BMI270 bring-up failed");
        }
        result
    }

    fn run_bring_up<D>(&mut self, blob: &ConfigBlob<'_>, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        // Step 1: Reset
        self.state = BringUpState::Reset;
        self.activate_spi(delay)?;

        let chip_id = self.read_chip_id()?;
        if chip_id != CHIP_ID_VALUE {
            return Err(Error::ChipIdMismatch(chip_id));
        }

        self.device.cmd().write(|w| w.set_cmd(cmd::SOFT_RESET))?;
        delay.delay_us(SOFT_RESET_DELAY_US);

        // Soft reset puts the chip back into I2C mode
        self.activate_spi(delay)?;
        self.reset_cached_ranges();

        #[cfg(feature = "defmt")]
        defmt::debug!("BMI270 soft reset done");

        // Step 2: Disable advanced power save and prepare the config load
        self.state = BringUpState::PowerPrepared;
        self.write_power_conf(PowerConf::upload())?;
        self.device
            .init_ctrl()
            .write(|w| w.set_init_ctrl(INIT_CTRL_PREPARE))?;

        // Step 3: Upload the config file
        self.state = BringUpState::ConfigUploading;
        self.device.init_addr_0().write(|w| w.set_base_0_3(0))?;
        self.device.init_addr_1().write(|w| w.set_base_11_4(0))?;

        for chunk in blob.chunks() {
            self.device
                .init_addr_0()
                .write(|w| w.set_base_0_3(chunk.init_addr_0()))?;
            self.device
                .init_addr_1()
                .write(|w| w.set_base_11_4(chunk.init_addr_1()))?;
            self.device
                .interface
                .write_register(addr::INIT_DATA, bit_len(chunk.data.len()), chunk.data)?;
        }

        // Step 4: Signal load complete
        self.state = BringUpState::ConfigUploaded;
        self.device
            .init_ctrl()
            .write(|w| w.set_init_ctrl(INIT_CTRL_COMPLETE))?;

        #[cfg(feature = "defmt")]
        defmt::debug!("BMI270 config file uploaded");

        // Step 5: Wait for the chip to accept the config
        self.state = BringUpState::Verifying;
        let mut status = InitStatus::NotInitialized;
        for _ in 0..(INIT_TIMEOUT_MS / INIT_POLL_INTERVAL_MS) {
            delay.delay_ms(INIT_POLL_INTERVAL_MS);
            status = InitStatus::from(self.device.internal_status().read()?.message());
            match status {
                InitStatus::Ok => break,
                InitStatus::Error => return Err(Error::ConfigRejected),
                InitStatus::NotInitialized | InitStatus::Other(_) => {}
            }
        }

        if status != InitStatus::Ok {
            return Err(Error::VerificationTimeout);
        }

        // Step 6: Normal operation
        self.device.interface.mark_bring_up_complete();
        self.finish_bring_up()
    }

    /// Enable the sensors and leave the upload power mode
    fn finish_bring_up(&mut self) -> Result<(), Error<I::Error>> {
        self.write_sensor_power(&SensorPowerConfig::all_enabled())?;
        self.write_power_conf(PowerConf::normal())?;
        self.state = BringUpState::Ready;

        #[cfg(feature = "defmt")]
        defmt::info!("BMI270 ready");

        Ok(())
    }

    /// Switch the chip's host interface to SPI with a dummy read
    fn activate_spi<D>(&mut self, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        self.read_chip_id()?;
        delay.delay_us(SPI_ACTIVATION_DELAY_US);
        Ok(())
    }

    fn write_power_conf(&mut self, conf: PowerConf) -> Result<(), Error<I::Error>> {
        self.device.pwr_conf().write(|w| {
            w.set_adv_power_save(conf.adv_power_save);
            w.set_fifo_self_wake_up(conf.fifo_self_wake_up);
            w.set_fup_en(conf.fast_power_up);
        })?;
        Ok(())
    }

    fn write_sensor_power(&mut self, config: &SensorPowerConfig) -> Result<(), Error<I::Error>> {
        self.device.pwr_ctrl().write(|w| {
            w.set_aux_en(config.aux);
            w.set_gyr_en(config.gyro);
            w.set_acc_en(config.accel);
            w.set_temp_en(config.temperature);
        })?;
        Ok(())
    }

    /// Read the `CHIP_ID` register
    ///
    /// Allowed before bring-up.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_chip_id(&mut self) -> Result<u8, Error<I::Error>> {
        Ok(self.device.chip_id().read()?.chip_id())
    }

    /// Read the initialization result from `INTERNAL_STATUS`
    ///
    /// Allowed before bring-up.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_init_status(&mut self) -> Result<InitStatus, Error<I::Error>> {
        Ok(InitStatus::from(
            self.device.internal_status().read()?.message(),
        ))
    }

    /// Set the accelerometer range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_accel_range(&mut self, range: AccRange) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.acc_range().modify(|w| {
            w.set_acc_range(range as u8);
        })?;
        self.accel_range = range;
        Ok(())
    }

    /// Read the accelerometer range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub fn accel_range(&mut self) -> Result<AccRange, Error<I::Error>> {
        self.ensure_ready()?;
        let raw = self.device.acc_range().read()?.acc_range();
        AccRange::try_from(raw).map_err(Error::InvalidRegisterValue)
    }

    /// Set accelerometer output data rate and filter mode
    ///
    /// The bandwidth field of `ACC_CONF` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_accel_odr(&mut self, odr: AccOdr, filter: FilterPerf) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.acc_conf().modify(|w| {
            w.set_acc_odr(odr as u8);
            w.set_acc_filter_perf(filter.bit());
        })?;
        Ok(())
    }

    /// Read accelerometer output data rate and filter mode
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub fn accel_odr(&mut self) -> Result<(AccOdr, FilterPerf), Error<I::Error>> {
        self.ensure_ready()?;
        let conf = self.device.acc_conf().read()?;
        let odr = AccOdr::try_from(conf.acc_odr()).map_err(Error::InvalidRegisterValue)?;
        Ok((odr, FilterPerf::from_bit(conf.acc_filter_perf())))
    }

    /// Apply range, output data rate and filter mode of the accelerometer
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn configure_accelerometer(&mut self, config: &AccelConfig) -> Result<(), Error<I::Error>> {
        self.set_accel_odr(config.odr, config.filter_perf)?;
        self.set_accel_range(config.range)
    }

    /// Set the gyroscope range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_gyro_range(&mut self, range: GyrRange) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.gyr_range().modify(|w| {
            w.set_gyr_range(range as u8);
        })?;
        self.gyro_range = range;
        Ok(())
    }

    /// Read the gyroscope range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub fn gyro_range(&mut self) -> Result<GyrRange, Error<I::Error>> {
        self.ensure_ready()?;
        let raw = self.device.gyr_range().read()?.gyr_range();
        GyrRange::try_from(raw).map_err(Error::InvalidRegisterValue)
    }

    /// Set gyroscope output data rate and filter mode
    ///
    /// Bandwidth and noise mode fields of `GYR_CONF` are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_gyro_odr(&mut self, odr: GyrOdr, filter: FilterPerf) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.gyr_conf().modify(|w| {
            w.set_gyr_odr(odr as u8);
            w.set_gyr_filter_perf(filter.bit());
        })?;
        Ok(())
    }

    /// Read gyroscope output data rate and filter mode
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub fn gyro_odr(&mut self) -> Result<(GyrOdr, FilterPerf), Error<I::Error>> {
        self.ensure_ready()?;
        let conf = self.device.gyr_conf().read()?;
        let odr = GyrOdr::try_from(conf.gyr_odr()).map_err(Error::InvalidRegisterValue)?;
        Ok((odr, FilterPerf::from_bit(conf.gyr_filter_perf())))
    }

    /// Apply range, output data rate and filter mode of the gyroscope
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn configure_gyroscope(&mut self, config: &GyroConfig) -> Result<(), Error<I::Error>> {
        self.set_gyro_odr(config.odr, config.filter_perf)?;
        self.set_gyro_range(config.range)
    }

    /// Switch sensors on or off
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_sensor_power(&mut self, config: &SensorPowerConfig) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.write_sensor_power(config)
    }

    /// Read which sensors are switched on
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn sensor_power(&mut self) -> Result<SensorPowerConfig, Error<I::Error>> {
        self.ensure_ready()?;
        let pwr = self.device.pwr_ctrl().read()?;
        Ok(SensorPowerConfig {
            accel: pwr.acc_en(),
            gyro: pwr.gyr_en(),
            temperature: pwr.temp_en(),
            aux: pwr.aux_en(),
        })
    }

    /// Switch the accelerometer on or off, leaving other sensors untouched
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_accel_enable(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.pwr_ctrl().modify(|w| {
            w.set_acc_en(enable);
        })?;
        Ok(())
    }

    /// Switch the gyroscope on or off, leaving other sensors untouched
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_gyro_enable(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.pwr_ctrl().modify(|w| {
            w.set_gyr_en(enable);
        })?;
        Ok(())
    }

    /// Read accelerometer data
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_accel_raw(&mut self) -> Result<AccelData, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 6];
        self.device
            .interface
            .read_register(addr::ACC_X_LSB, 48, &mut buffer)?;
        Ok(AccelData::from_le(&buffer))
    }

    /// Read gyroscope data
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_gyro_raw(&mut self) -> Result<GyroData, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 6];
        self.device
            .interface
            .read_register(addr::GYR_X_LSB, 48, &mut buffer)?;
        Ok(GyroData::from_le(&buffer))
    }

    /// Read accelerometer and gyroscope data in one burst
    ///
    /// Both samples come from the same data-register snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_imu_raw(&mut self) -> Result<(AccelData, GyroData), Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 12];
        self.device
            .interface
            .read_register(addr::ACC_X_LSB, 96, &mut buffer)?;
        Ok((
            AccelData::from_le(&buffer[..6]),
            GyroData::from_le(&buffer[6..]),
        ))
    }

    /// Read accelerometer data in g, using the last range set through this driver
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_accelerometer(&mut self) -> Result<AccelDataG, Error<I::Error>> {
        let raw = self.read_accel_raw()?;
        Ok(AccelDataG::from_raw(
            raw.x,
            raw.y,
            raw.z,
            self.accel_range.sensitivity(),
        ))
    }

    /// Read gyroscope data in °/s, using the last range set through this driver
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_gyroscope(&mut self) -> Result<GyroDataDps, Error<I::Error>> {
        let raw = self.read_gyro_raw()?;
        Ok(GyroDataDps::from_raw(
            raw.x,
            raw.y,
            raw.z,
            self.gyro_range.sensitivity(),
        ))
    }

    /// Read the raw temperature value
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_temperature_raw(&mut self) -> Result<i16, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(addr::TEMPERATURE_0, 16, &mut buffer)?;
        Ok(i16::from_le_bytes(buffer))
    }

    /// Read the temperature in degrees Celsius
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    /// Returns [`Error::InvalidRegisterValue`] with the `TEMPERATURE_1` byte
    /// (`0x80`) while the chip has no valid reading.
    pub fn read_temperature_celsius(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_temperature_raw()?;
        if raw == TEMPERATURE_INVALID {
            return Err(Error::InvalidRegisterValue(0x80));
        }
        Ok(temperature_celsius(raw))
    }

    /// Read the 24-bit sensor time (39.0625 µs per tick)
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_sensor_time(&mut self) -> Result<u32, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 3];
        self.device
            .interface
            .read_register(addr::SENSORTIME_0, 24, &mut buffer)?;
        Ok(u32::from_le_bytes([buffer[0], buffer[1], buffer[2], 0]))
    }

    /// Configure the electrical behaviour of an interrupt pin
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn configure_interrupt_pin(
        &mut self,
        pin: IntPin,
        config: &InterruptPinConfig,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        match pin {
            IntPin::Int1 => self.device.int_1_io_ctrl().modify(|w| {
                w.set_lvl(config.active_high);
                w.set_od(config.open_drain);
                w.set_output_en(config.output_enable);
            })?,
            IntPin::Int2 => self.device.int_2_io_ctrl().modify(|w| {
                w.set_lvl(config.active_high);
                w.set_od(config.open_drain);
                w.set_output_en(config.output_enable);
            })?,
        }
        Ok(())
    }

    /// Select latched (`true`) or pulsed (`false`) interrupts
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn set_interrupt_latch(&mut self, latched: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.int_latch().modify(|w| {
            w.set_int_latch(latched);
        })?;
        Ok(())
    }

    /// Route data interrupt sources to a pin
    ///
    /// Routing of the other pin is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn map_data_interrupts(
        &mut self,
        pin: IntPin,
        sources: &DataInterrupts,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.int_map_data().modify(|w| match pin {
            IntPin::Int1 => {
                w.set_ffull_int_1(sources.fifo_full);
                w.set_fwm_int_1(sources.fifo_watermark);
                w.set_drdy_int_1(sources.data_ready);
            }
            IntPin::Int2 => {
                w.set_ffull_int_2(sources.fifo_full);
                w.set_fwm_int_2(sources.fifo_watermark);
                w.set_drdy_int_2(sources.data_ready);
            }
        })?;
        Ok(())
    }

    /// Route the data-ready interrupt to a pin, keeping its other sources
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn enable_data_ready_interrupt(&mut self, pin: IntPin) -> Result<(), Error<I::Error>> {
        self.set_data_ready_routing(pin, true)
    }

    /// Remove the data-ready interrupt from a pin, keeping its other sources
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn disable_data_ready_interrupt(&mut self, pin: IntPin) -> Result<(), Error<I::Error>> {
        self.set_data_ready_routing(pin, false)
    }

    fn set_data_ready_routing(&mut self, pin: IntPin, enable: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.int_map_data().modify(|w| match pin {
            IntPin::Int1 => w.set_drdy_int_1(enable),
            IntPin::Int2 => w.set_drdy_int_2(enable),
        })?;
        Ok(())
    }

    /// Route the FIFO watermark interrupt to a pin, keeping its other sources
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn enable_fifo_watermark_interrupt(&mut self, pin: IntPin) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.int_map_data().modify(|w| match pin {
            IntPin::Int1 => w.set_fwm_int_1(true),
            IntPin::Int2 => w.set_fwm_int_2(true),
        })?;
        Ok(())
    }

    /// Read and clear the data interrupt status
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn read_interrupt_status(&mut self) -> Result<InterruptStatus, Error<I::Error>> {
        self.ensure_ready()?;
        let status = self.device.int_status_1().read()?;
        Ok(InterruptStatus {
            fifo_full: status.ffull_int(),
            fifo_watermark: status.fwm_int(),
            error: status.err_int(),
            gyro_data_ready: status.gyr_drdy_int(),
            accel_data_ready: status.acc_drdy_int(),
        })
    }

    /// Configure FIFO contents, mode and watermark
    ///
    /// A watermark of 0 leaves the watermark registers untouched. Larger
    /// values are clamped to 2047 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn fifo_configure(&mut self, config: &FifoConfig) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;

        self.device.fifo_config_0().modify(|w| {
            w.set_fifo_stop_on_full(config.stop_on_full);
        })?;
        self.device.fifo_config_1().modify(|w| {
            w.set_fifo_header_en(config.header_enable);
            w.set_fifo_acc_en(config.acc_enable);
            w.set_fifo_gyr_en(config.gyr_enable);
        })?;

        if config.watermark > 0 {
            let watermark = clamp_watermark(config.watermark);

            #[cfg(feature = "defmt")]
            if watermark != config.watermark {
                defmt::warn!(
                    "FIFO watermark {=u16} clamped to {=u16}",
                    config.watermark,
                    watermark
                );
            }

            let (wtm_0, wtm_1) = split_watermark(watermark);
            self.device
                .fifo_wtm_0()
                .write(|w| w.set_fifo_water_mark_7_0(wtm_0))?;
            self.device
                .fifo_wtm_1()
                .write(|w| w.set_fifo_water_mark_12_8(wtm_1))?;
        }

        Ok(())
    }

    /// Read the configured watermark level in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn fifo_watermark(&mut self) -> Result<u16, Error<I::Error>> {
        self.ensure_ready()?;
        let wtm_0 = self.device.fifo_wtm_0().read()?.fifo_water_mark_7_0();
        let wtm_1 = self.device.fifo_wtm_1().read()?.fifo_water_mark_12_8();
        Ok(join_watermark(wtm_0, wtm_1))
    }

    /// Read the FIFO fill level in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn fifo_length(&mut self) -> Result<u16, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(addr::FIFO_LENGTH_0, 16, &mut buffer)?;
        Ok(decode_length(buffer))
    }

    /// Burst-read `buffer.len()` bytes from the FIFO
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` (without bus access) if `buffer` is empty or
    /// larger than the FIFO, or an error if the driver is not ready or
    /// communication fails.
    pub fn fifo_read(&mut self, buffer: &mut [u8]) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        if buffer.is_empty() || buffer.len() > usize::from(FIFO_SIZE) {
            return Err(Error::InvalidArgument);
        }
        self.device
            .interface
            .read_register(addr::FIFO_DATA, bit_len(buffer.len()), buffer)?;
        Ok(())
    }

    /// Discard all FIFO content
    ///
    /// Do not call this right after a watermark wake-up if the signalled data
    /// is still needed; flush only when starting a fresh acquisition.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn fifo_flush(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device.cmd().write(|w| w.set_cmd(cmd::FIFO_FLUSH))?;
        Ok(())
    }

    /// Read everything currently in the FIFO, up to `buffer.len()` bytes
    ///
    /// # Returns
    /// Number of bytes written to `buffer` (0 if the FIFO is empty)
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn fifo_drain(&mut self, buffer: &mut [u8]) -> Result<usize, Error<I::Error>> {
        let length = usize::from(self.fifo_length()?).min(buffer.len());
        if length == 0 {
            return Ok(0);
        }
        self.fifo_read(&mut buffer[..length])?;
        Ok(length)
    }

    /// Consumer step after a watermark wait
    ///
    /// After [`Wake::Interrupt`] the FIFO is drained. After [`Wake::Timeout`]
    /// the fill level is polled directly and the FIFO is only drained if it
    /// reached `watermark`, which means the interrupt line is not delivering.
    ///
    /// # Returns
    /// Number of bytes written to `buffer`
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub fn fifo_service(
        &mut self,
        wake: Wake,
        watermark: u16,
        buffer: &mut [u8],
    ) -> Result<usize, Error<I::Error>> {
        if wake == Wake::Timeout {
            let length = self.fifo_length()?;
            if length == 0 || length < clamp_watermark(watermark) {
                return Ok(0);
            }

            #[cfg(feature = "defmt")]
            defmt::warn!(
                "FIFO at {=u16} bytes without watermark interrupt, check INT mapping",
                length
            );
        }

        self.fifo_drain(buffer)
    }
}

#[cfg(feature = "async")]
impl<I> Bmi270Driver<I>
where
    I: device_driver::AsyncRegisterInterface<AddressType = u8> + BusTiming,
{
    /// Bring the chip from power-on to a feature-ready state
    ///
    /// Performs the soft reset, uploads the config file and waits for the chip
    /// to accept it. On success the bus switches to normal timing and the
    /// accelerometer, gyroscope and temperature sensor are enabled.
    ///
    /// Calling this on a driver that is already ready does nothing. If an
    /// earlier attempt failed after the chip accepted the config file, only the
    /// sensor enable and power mode writes are retried; the chip is not reset.
    ///
    /// # Arguments
    ///
    /// * `blob` - The 8 KiB BMI270 config file
    /// * `delay` - Delay provider implementing `embedded_hal_async::delay::DelayNs`
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the driver in [`BringUpState::Failed`] if:
    /// - Communication with the device fails
    /// - The chip ID is not `0x24`
    /// - The chip reports that it rejected the config file
    /// - The chip does not report a result within 150 ms
    ///
    /// # Example
    ///
    /// ```ignore
    /// use embassy_time::Delay;
    /// let mut delay = Delay;
    /// driver.bring_up(&ConfigBlob::new(&BMI270_CONFIG_FILE), &mut delay).await?;
    /// ```
    pub async fn bring_up<D>(
        &mut self,
        blob: &ConfigBlob<'_>,
        delay: &mut D,
    ) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        if self.state.is_ready() {
            return Ok(());
        }

        let result = if self.config_accepted() {
            self.finish_bring_up().await
        } else {
            self.run_bring_up(blob, delay).await
        };
        if result.is_err() {
            self.state = BringUpState::Failed;

            #[cfg(feature = "defmt")]
            defmt::warn!("BMI270 bring-up failed");
        }
        result
    }

    async fn run_bring_up<D>(
        &mut self,
        blob: &ConfigBlob<'_>,
        delay: &mut D,
    ) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        // Step 1: Reset
        self.state = BringUpState::Reset;
        self.activate_spi(delay).await?;

        let chip_id = self.read_chip_id().await?;
        if chip_id != CHIP_ID_VALUE {
            return Err(Error::ChipIdMismatch(chip_id));
        }

        self.device
            .cmd()
            .write_async(|w| w.set_cmd(cmd::SOFT_RESET))
            .await?;
        delay.delay_us(SOFT_RESET_DELAY_US).await;

        // Soft reset puts the chip back into I2C mode
        self.activate_spi(delay).await?;
        self.reset_cached_ranges();

        #[cfg(feature = "defmt")]
        defmt::debug!("BMI270 soft reset done");

        // Step 2: Disable advanced power save and prepare the config load
        self.state = BringUpState::PowerPrepared;
        self.write_power_conf(PowerConf::upload()).await?;
        self.device
            .init_ctrl()
            .write_async(|w| w.set_init_ctrl(INIT_CTRL_PREPARE))
            .await?;

        // Step 3: Upload the config file
        self.state = BringUpState::ConfigUploading;
        self.device
            .init_addr_0()
            .write_async(|w| w.set_base_0_3(0))
            .await?;
        self.device
            .init_addr_1()
            .write_async(|w| w.set_base_11_4(0))
            .await?;

        for chunk in blob.chunks() {
            self.device
                .init_addr_0()
                .write_async(|w| w.set_base_0_3(chunk.init_addr_0()))
                .await?;
            self.device
                .init_addr_1()
                .write_async(|w| w.set_base_11_4(chunk.init_addr_1()))
                .await?;
            self.device
                .interface
                .write_register(addr::INIT_DATA, bit_len(chunk.data.len()), chunk.data)
                .await?;
        }

        // Step 4: Signal load complete
        self.state = BringUpState::ConfigUploaded;
        self.device
            .init_ctrl()
            .write_async(|w| w.set_init_ctrl(INIT_CTRL_COMPLETE))
            .await?;

        #[cfg(feature = "defmt")]
        defmt::debug!("BMI270 config file uploaded");

        // Step 5: Wait for the chip to accept the config
        self.state = BringUpState::Verifying;
        let mut status = InitStatus::NotInitialized;
        for _ in 0..(INIT_TIMEOUT_MS / INIT_POLL_INTERVAL_MS) {
            delay.delay_ms(INIT_POLL_INTERVAL_MS).await;
            status = InitStatus::from(
                self.device
                    .internal_status()
                    .read_async()
                    .await?
                    .message(),
            );
            match status {
                InitStatus::Ok => break,
                InitStatus::Error => return Err(Error::ConfigRejected),
                InitStatus::NotInitialized | InitStatus::Other(_) => {}
            }
        }

        if status != InitStatus::Ok {
            return Err(Error::VerificationTimeout);
        }

        // Step 6: Normal operation
        self.device.interface.mark_bring_up_complete();
        self.finish_bring_up().await
    }

    /// Enable the sensors and leave the upload power mode
    async fn finish_bring_up(&mut self) -> Result<(), Error<I::Error>> {
        self.write_sensor_power(&SensorPowerConfig::all_enabled())
            .await?;
        self.write_power_conf(PowerConf::normal()).await?;
        self.state = BringUpState::Ready;

        #[cfg(feature = "defmt")]
        defmt::info!("BMI270 ready");

        Ok(())
    }

    /// Switch the chip's host interface to SPI with a dummy read
    async fn activate_spi<D>(&mut self, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        self.read_chip_id().await?;
        delay.delay_us(SPI_ACTIVATION_DELAY_US).await;
        Ok(())
    }

    async fn write_power_conf(&mut self, conf: PowerConf) -> Result<(), Error<I::Error>> {
        self.device
            .pwr_conf()
            .write_async(|w| {
                w.set_adv_power_save(conf.adv_power_save);
                w.set_fifo_self_wake_up(conf.fifo_self_wake_up);
                w.set_fup_en(conf.fast_power_up);
            })
            .await?;
        Ok(())
    }

    async fn write_sensor_power(
        &mut self,
        config: &SensorPowerConfig,
    ) -> Result<(), Error<I::Error>> {
        self.device
            .pwr_ctrl()
            .write_async(|w| {
                w.set_aux_en(config.aux);
                w.set_gyr_en(config.gyro);
                w.set_acc_en(config.accel);
                w.set_temp_en(config.temperature);
            })
            .await?;
        Ok(())
    }

    /// Read the `CHIP_ID` register
    ///
    /// Allowed before bring-up.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_chip_id(&mut self) -> Result<u8, Error<I::Error>> {
        Ok(self.device.chip_id().read_async().await?.chip_id())
    }

    /// Read the initialization result from `INTERNAL_STATUS`
    ///
    /// Allowed before bring-up.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_init_status(&mut self) -> Result<InitStatus, Error<I::Error>> {
        Ok(InitStatus::from(
            self.device
                .internal_status()
                .read_async()
                .await?
                .message(),
        ))
    }

    /// Set the accelerometer range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_accel_range(&mut self, range: AccRange) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .acc_range()
            .modify_async(|w| {
                w.set_acc_range(range as u8);
            })
            .await?;
        self.accel_range = range;
        Ok(())
    }

    /// Read the accelerometer range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub async fn accel_range(&mut self) -> Result<AccRange, Error<I::Error>> {
        self.ensure_ready()?;
        let raw = self.device.acc_range().read_async().await?.acc_range();
        AccRange::try_from(raw).map_err(Error::InvalidRegisterValue)
    }

    /// Set accelerometer output data rate and filter mode
    ///
    /// The bandwidth field of `ACC_CONF` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_accel_odr(
        &mut self,
        odr: AccOdr,
        filter: FilterPerf,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .acc_conf()
            .modify_async(|w| {
                w.set_acc_odr(odr as u8);
                w.set_acc_filter_perf(filter.bit());
            })
            .await?;
        Ok(())
    }

    /// Read accelerometer output data rate and filter mode
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub async fn accel_odr(&mut self) -> Result<(AccOdr, FilterPerf), Error<I::Error>> {
        self.ensure_ready()?;
        let conf = self.device.acc_conf().read_async().await?;
        let odr = AccOdr::try_from(conf.acc_odr()).map_err(Error::InvalidRegisterValue)?;
        Ok((odr, FilterPerf::from_bit(conf.acc_filter_perf())))
    }

    /// Apply range, output data rate and filter mode of the accelerometer
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn configure_accelerometer(
        &mut self,
        config: &AccelConfig,
    ) -> Result<(), Error<I::Error>> {
        self.set_accel_odr(config.odr, config.filter_perf).await?;
        self.set_accel_range(config.range).await
    }

    /// Set the gyroscope range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_gyro_range(&mut self, range: GyrRange) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .gyr_range()
            .modify_async(|w| {
                w.set_gyr_range(range as u8);
            })
            .await?;
        self.gyro_range = range;
        Ok(())
    }

    /// Read the gyroscope range
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub async fn gyro_range(&mut self) -> Result<GyrRange, Error<I::Error>> {
        self.ensure_ready()?;
        let raw = self.device.gyr_range().read_async().await?.gyr_range();
        GyrRange::try_from(raw).map_err(Error::InvalidRegisterValue)
    }

    /// Set gyroscope output data rate and filter mode
    ///
    /// Bandwidth and noise mode fields of `GYR_CONF` are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_gyro_odr(
        &mut self,
        odr: GyrOdr,
        filter: FilterPerf,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .gyr_conf()
            .modify_async(|w| {
                w.set_gyr_odr(odr as u8);
                w.set_gyr_filter_perf(filter.bit());
            })
            .await?;
        Ok(())
    }

    /// Read gyroscope output data rate and filter mode
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready, communication fails or
    /// the register holds an undefined value.
    pub async fn gyro_odr(&mut self) -> Result<(GyrOdr, FilterPerf), Error<I::Error>> {
        self.ensure_ready()?;
        let conf = self.device.gyr_conf().read_async().await?;
        let odr = GyrOdr::try_from(conf.gyr_odr()).map_err(Error::InvalidRegisterValue)?;
        Ok((odr, FilterPerf::from_bit(conf.gyr_filter_perf())))
    }

    /// Apply range, output data rate and filter mode of the gyroscope
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn configure_gyroscope(&mut self, config: &GyroConfig) -> Result<(), Error<I::Error>> {
        self.set_gyro_odr(config.odr, config.filter_perf).await?;
        self.set_gyro_range(config.range).await
    }

    /// Switch sensors on or off
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_sensor_power(
        &mut self,
        config: &SensorPowerConfig,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.write_sensor_power(config).await
    }

    /// Read which sensors are switched on
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn sensor_power(&mut self) -> Result<SensorPowerConfig, Error<I::Error>> {
        self.ensure_ready()?;
        let pwr = self.device.pwr_ctrl().read_async().await?;
        Ok(SensorPowerConfig {
            accel: pwr.acc_en(),
            gyro: pwr.gyr_en(),
            temperature: pwr.temp_en(),
            aux: pwr.aux_en(),
        })
    }

    /// Switch the accelerometer on or off, leaving other sensors untouched
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_accel_enable(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .pwr_ctrl()
            .modify_async(|w| {
                w.set_acc_en(enable);
            })
            .await?;
        Ok(())
    }

    /// Switch the gyroscope on or off, leaving other sensors untouched
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_gyro_enable(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .pwr_ctrl()
            .modify_async(|w| {
                w.set_gyr_en(enable);
            })
            .await?;
        Ok(())
    }

    /// Read accelerometer data
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_accel_raw(&mut self) -> Result<AccelData, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 6];
        self.device
            .interface
            .read_register(addr::ACC_X_LSB, 48, &mut buffer)
            .await?;
        Ok(AccelData::from_le(&buffer))
    }

    /// Read gyroscope data
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_gyro_raw(&mut self) -> Result<GyroData, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 6];
        self.device
            .interface
            .read_register(addr::GYR_X_LSB, 48, &mut buffer)
            .await?;
        Ok(GyroData::from_le(&buffer))
    }

    /// Read accelerometer and gyroscope data in one burst
    ///
    /// Both samples come from the same data-register snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_imu_raw(&mut self) -> Result<(AccelData, GyroData), Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 12];
        self.device
            .interface
            .read_register(addr::ACC_X_LSB, 96, &mut buffer)
            .await?;
        Ok((
            AccelData::from_le(&buffer[..6]),
            GyroData::from_le(&buffer[6..]),
        ))
    }

    /// Read accelerometer data in g, using the last range set through this driver
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_accelerometer(&mut self) -> Result<AccelDataG, Error<I::Error>> {
        let raw = self.read_accel_raw().await?;
        Ok(AccelDataG::from_raw(
            raw.x,
            raw.y,
            raw.z,
            self.accel_range.sensitivity(),
        ))
    }

    /// Read gyroscope data in °/s, using the last range set through this driver
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_gyroscope(&mut self) -> Result<GyroDataDps, Error<I::Error>> {
        let raw = self.read_gyro_raw().await?;
        Ok(GyroDataDps::from_raw(
            raw.x,
            raw.y,
            raw.z,
            self.gyro_range.sensitivity(),
        ))
    }

    /// Read the raw temperature value
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_temperature_raw(&mut self) -> Result<i16, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(addr::TEMPERATURE_0, 16, &mut buffer)
            .await?;
        Ok(i16::from_le_bytes(buffer))
    }

    /// Read the temperature in degrees Celsius
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    /// Returns [`Error::InvalidRegisterValue`] with the `TEMPERATURE_1` byte
    /// (`0x80`) while the chip has no valid reading.
    pub async fn read_temperature_celsius(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_temperature_raw().await?;
        if raw == TEMPERATURE_INVALID {
            return Err(Error::InvalidRegisterValue(0x80));
        }
        Ok(temperature_celsius(raw))
    }

    /// Read the 24-bit sensor time (39.0625 µs per tick)
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_sensor_time(&mut self) -> Result<u32, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 3];
        self.device
            .interface
            .read_register(addr::SENSORTIME_0, 24, &mut buffer)
            .await?;
        Ok(u32::from_le_bytes([buffer[0], buffer[1], buffer[2], 0]))
    }

    /// Configure the electrical behaviour of an interrupt pin
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn configure_interrupt_pin(
        &mut self,
        pin: IntPin,
        config: &InterruptPinConfig,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        match pin {
            IntPin::Int1 => {
                self.device
                    .int_1_io_ctrl()
                    .modify_async(|w| {
                        w.set_lvl(config.active_high);
                        w.set_od(config.open_drain);
                        w.set_output_en(config.output_enable);
                    })
                    .await?;
            }
            IntPin::Int2 => {
                self.device
                    .int_2_io_ctrl()
                    .modify_async(|w| {
                        w.set_lvl(config.active_high);
                        w.set_od(config.open_drain);
                        w.set_output_en(config.output_enable);
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Select latched (`true`) or pulsed (`false`) interrupts
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn set_interrupt_latch(&mut self, latched: bool) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .int_latch()
            .modify_async(|w| {
                w.set_int_latch(latched);
            })
            .await?;
        Ok(())
    }

    /// Route data interrupt sources to a pin
    ///
    /// Routing of the other pin is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn map_data_interrupts(
        &mut self,
        pin: IntPin,
        sources: &DataInterrupts,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .int_map_data()
            .modify_async(|w| match pin {
                IntPin::Int1 => {
                    w.set_ffull_int_1(sources.fifo_full);
                    w.set_fwm_int_1(sources.fifo_watermark);
                    w.set_drdy_int_1(sources.data_ready);
                }
                IntPin::Int2 => {
                    w.set_ffull_int_2(sources.fifo_full);
                    w.set_fwm_int_2(sources.fifo_watermark);
                    w.set_drdy_int_2(sources.data_ready);
                }
            })
            .await?;
        Ok(())
    }

    /// Route the data-ready interrupt to a pin, keeping its other sources
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn enable_data_ready_interrupt(&mut self, pin: IntPin) -> Result<(), Error<I::Error>> {
        self.set_data_ready_routing(pin, true).await
    }

    /// Remove the data-ready interrupt from a pin, keeping its other sources
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn disable_data_ready_interrupt(
        &mut self,
        pin: IntPin,
    ) -> Result<(), Error<I::Error>> {
        self.set_data_ready_routing(pin, false).await
    }

    async fn set_data_ready_routing(
        &mut self,
        pin: IntPin,
        enable: bool,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .int_map_data()
            .modify_async(|w| match pin {
                IntPin::Int1 => w.set_drdy_int_1(enable),
                IntPin::Int2 => w.set_drdy_int_2(enable),
            })
            .await?;
        Ok(())
    }

    /// Route the FIFO watermark interrupt to a pin, keeping its other sources
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn enable_fifo_watermark_interrupt(
        &mut self,
        pin: IntPin,
    ) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .int_map_data()
            .modify_async(|w| match pin {
                IntPin::Int1 => w.set_fwm_int_1(true),
                IntPin::Int2 => w.set_fwm_int_2(true),
            })
            .await?;
        Ok(())
    }

    /// Read and clear the data interrupt status
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn read_interrupt_status(&mut self) -> Result<InterruptStatus, Error<I::Error>> {
        self.ensure_ready()?;
        let status = self.device.int_status_1().read_async().await?;
        Ok(InterruptStatus {
            fifo_full: status.ffull_int(),
            fifo_watermark: status.fwm_int(),
            error: status.err_int(),
            gyro_data_ready: status.gyr_drdy_int(),
            accel_data_ready: status.acc_drdy_int(),
        })
    }

    /// Configure FIFO contents, mode and watermark
    ///
    /// A watermark of 0 leaves the watermark registers untouched. Larger
    /// values are clamped to 2047 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn fifo_configure(&mut self, config: &FifoConfig) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;

        self.device
            .fifo_config_0()
            .modify_async(|w| {
                w.set_fifo_stop_on_full(config.stop_on_full);
            })
            .await?;
        self.device
            .fifo_config_1()
            .modify_async(|w| {
                w.set_fifo_header_en(config.header_enable);
                w.set_fifo_acc_en(config.acc_enable);
                w.set_fifo_gyr_en(config.gyr_enable);
            })
            .await?;

        if config.watermark > 0 {
            let watermark = clamp_watermark(config.watermark);

            #[cfg(feature = "defmt")]
            if watermark != config.watermark {
                defmt::warn!(
                    "FIFO watermark {=u16} clamped to {=u16}",
                    config.watermark,
                    watermark
                );
            }

            let (wtm_0, wtm_1) = split_watermark(watermark);
            self.device
                .fifo_wtm_0()
                .write_async(|w| w.set_fifo_water_mark_7_0(wtm_0))
                .await?;
            self.device
                .fifo_wtm_1()
                .write_async(|w| w.set_fifo_water_mark_12_8(wtm_1))
                .await?;
        }

        Ok(())
    }

    /// Read the configured watermark level in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn fifo_watermark(&mut self) -> Result<u16, Error<I::Error>> {
        self.ensure_ready()?;
        let wtm_0 = self
            .device
            .fifo_wtm_0()
            .read_async()
            .await?
            .fifo_water_mark_7_0();
        let wtm_1 = self
            .device
            .fifo_wtm_1()
            .read_async()
            .await?
            .fifo_water_mark_12_8();
        Ok(join_watermark(wtm_0, wtm_1))
    }

    /// Read the FIFO fill level in bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn fifo_length(&mut self) -> Result<u16, Error<I::Error>> {
        self.ensure_ready()?;
        let mut buffer = [0u8; 2];
        self.device
            .interface
            .read_register(addr::FIFO_LENGTH_0, 16, &mut buffer)
            .await?;
        Ok(decode_length(buffer))
    }

    /// Burst-read `buffer.len()` bytes from the FIFO
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` (without bus access) if `buffer` is empty or
    /// larger than the FIFO, or an error if the driver is not ready or
    /// communication fails.
    pub async fn fifo_read(&mut self, buffer: &mut [u8]) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        if buffer.is_empty() || buffer.len() > usize::from(FIFO_SIZE) {
            return Err(Error::InvalidArgument);
        }
        self.device
            .interface
            .read_register(addr::FIFO_DATA, bit_len(buffer.len()), buffer)
            .await?;
        Ok(())
    }

    /// Discard all FIFO content
    ///
    /// Do not call this right after a watermark wake-up if the signalled data
    /// is still needed; flush only when starting a fresh acquisition.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn fifo_flush(&mut self) -> Result<(), Error<I::Error>> {
        self.ensure_ready()?;
        self.device
            .cmd()
            .write_async(|w| w.set_cmd(cmd::FIFO_FLUSH))
            .await?;
        Ok(())
    }

    /// Read everything currently in the FIFO, up to `buffer.len()` bytes
    ///
    /// # Returns
    /// Number of bytes written to `buffer` (0 if the FIFO is empty)
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn fifo_drain(&mut self, buffer: &mut [u8]) -> Result<usize, Error<I::Error>> {
        let length = usize::from(self.fifo_length().await?).min(buffer.len());
        if length == 0 {
            return Ok(0);
        }
        self.fifo_read(&mut buffer[..length]).await?;
        Ok(length)
    }

    /// Consumer step after a watermark wait
    ///
    /// After [`Wake::Interrupt`] the FIFO is drained. After [`Wake::Timeout`]
    /// the fill level is polled directly and the FIFO is only drained if it
    /// reached `watermark`, which means the interrupt line is not delivering.
    ///
    /// # Returns
    /// Number of bytes written to `buffer`
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is not ready or communication fails.
    pub async fn fifo_service(
        &mut self,
        wake: Wake,
        watermark: u16,
        buffer: &mut [u8],
    ) -> Result<usize, Error<I::Error>> {
        if wake == Wake::Timeout {
            let length = self.fifo_length().await?;
            if length == 0 || length < clamp_watermark(watermark) {
                return Ok(0);
            }

            #[cfg(feature = "defmt")]
            defmt::warn!(
                "FIFO at {=u16} bytes without watermark interrupt, check INT mapping",
                length
            );
        }

        self.fifo_drain(buffer).await
    }
}
