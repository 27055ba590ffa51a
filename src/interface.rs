//! SPI bus access for the BMI270
//!
//! Every transaction with the BMI270 must be followed by a settle delay before
//! the next one starts. How long depends on the chip's power mode: while
//! advanced power save is active (from power-on until the config file has been
//! accepted) the chip needs at least 450 µs; once it runs in normal mode 2 µs
//! is enough. [`SpiInterface`] owns that policy so no caller can skip it.
//!
//! The interface starts in [`TimingMode::Suspend`]. The driver switches it to
//! [`TimingMode::Normal`] with [`BusTiming::mark_bring_up_complete`] once
//! initialization has been confirmed. There is no way back.

use device_driver::RegisterInterface;

/// Settle delay after each transaction in suspend/low-power mode, in µs
///
/// The datasheet minimum is 450 µs.
pub const SETTLE_SUSPEND_US: u32 = 1000;

/// Settle delay after each transaction in normal mode, in µs
pub const SETTLE_NORMAL_US: u32 = 2;

/// Read flag carried in bit 7 of the SPI address byte
const SPI_READ_FLAG: u8 = 0x80;

/// Settle-delay regime applied after every transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingMode {
    /// Chip is in suspend or low-power mode (before bring-up completes)
    Suspend,
    /// Chip is in normal mode (after bring-up completes)
    Normal,
}

impl TimingMode {
    /// Settle delay for this mode in microseconds
    #[must_use]
    pub const fn settle_us(self) -> u32 {
        match self {
            Self::Suspend => SETTLE_SUSPEND_US,
            Self::Normal => SETTLE_NORMAL_US,
        }
    }
}

/// Access to an interface's settle-delay regime
///
/// Implemented by [`SpiInterface`]. The driver relies on it to flip the bus
/// into fast timing at the end of bring-up.
pub trait BusTiming {
    /// Current settle-delay regime
    fn timing(&self) -> TimingMode;

    /// Switch to [`TimingMode::Normal`]
    ///
    /// Irreversible. Calling it again has no further effect.
    fn mark_bring_up_complete(&mut self);
}

/// SPI interface for the BMI270
///
/// Wraps an `SpiDevice` (which owns chip select and bus clock configuration)
/// together with the delay used for post-transaction settling.
///
/// If using `embedded-hal-bus`, you would typically create it like:
/// ```ignore
/// let spi_device = embedded_hal_bus::spi::ExclusiveDevice::new(spi_bus, cs_pin, Delay);
/// let interface = SpiInterface::new(spi_device, Delay);
/// ```
pub struct SpiInterface<SPI, D> {
    spi: SPI,
    delay: D,
    timing: TimingMode,
}

impl<SPI, D> SpiInterface<SPI, D> {
    /// Create a new SPI interface in [`TimingMode::Suspend`]
    pub const fn new(spi: SPI, delay: D) -> Self {
        Self {
            spi,
            delay,
            timing: TimingMode::Suspend,
        }
    }

    /// Consume the interface and return the SPI device and delay
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }
}

impl<SPI, D> BusTiming for SpiInterface<SPI, D> {
    fn timing(&self) -> TimingMode {
        self.timing
    }

    fn mark_bring_up_complete(&mut self) {
        #[cfg(feature = "defmt")]
        if self.timing == TimingMode::Suspend {
            defmt::debug!("bus timing switched to normal mode");
        }

        self.timing = TimingMode::Normal;
    }
}

#[cfg(not(feature = "async"))]
impl<SPI, D> SpiInterface<SPI, D>
where
    SPI: embedded_hal::spi::SpiDevice,
    D: embedded_hal::delay::DelayNs,
{
    /// Read a single register
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub fn read(&mut self, address: u8) -> Result<u8, SPI::Error> {
        let mut value = [0u8; 1];
        self.read_register(address, 8, &mut value)?;
        Ok(value[0])
    }

    /// Write a single register
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub fn write(&mut self, address: u8, value: u8) -> Result<(), SPI::Error> {
        self.write_register(address, 8, &[value])
    }

    /// Read `buffer.len()` consecutive bytes starting at `address`
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub fn read_burst(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), SPI::Error> {
        let bits = bit_len(buffer.len());
        self.read_register(address, bits, buffer)
    }

    /// Write `data` to consecutive registers starting at `address`
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub fn write_burst(&mut self, address: u8, data: &[u8]) -> Result<(), SPI::Error> {
        self.write_register(address, bit_len(data.len()), data)
    }
}

impl<SPI, D> RegisterInterface for SpiInterface<SPI, D>
where
    SPI: embedded_hal::spi::SpiDevice,
    D: embedded_hal::delay::DelayNs,
{
    type Error = SPI::Error;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for SPI
        let mut dummy = [0u8; 1];

        // The BMI270 clocks out one dummy byte before the payload
        let mut operations = [
            embedded_hal::spi::Operation::Write(&[address | SPI_READ_FLAG]),
            embedded_hal::spi::Operation::Read(&mut dummy),
            embedded_hal::spi::Operation::Read(read_data),
        ];

        let result = self.spi.transaction(&mut operations);
        self.delay.delay_us(self.timing.settle_us());
        result
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for SPI

        let mut operations = [
            embedded_hal::spi::Operation::Write(&[address & !SPI_READ_FLAG]),
            embedded_hal::spi::Operation::Write(write_data),
        ];

        let result = self.spi.transaction(&mut operations);
        self.delay.delay_us(self.timing.settle_us());
        result
    }
}

#[cfg(feature = "async")]
impl<SPI, D> SpiInterface<SPI, D>
where
    SPI: embedded_hal_async::spi::SpiDevice,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Read a single register
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub async fn read(&mut self, address: u8) -> Result<u8, SPI::Error> {
        let mut value = [0u8; 1];
        device_driver::AsyncRegisterInterface::read_register(self, address, 8, &mut value)
            .await?;
        Ok(value[0])
    }

    /// Write a single register
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub async fn write(&mut self, address: u8, value: u8) -> Result<(), SPI::Error> {
        device_driver::AsyncRegisterInterface::write_register(self, address, 8, &[value]).await
    }

    /// Read `buffer.len()` consecutive bytes starting at `address`
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub async fn read_burst(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), SPI::Error> {
        let bits = bit_len(buffer.len());
        device_driver::AsyncRegisterInterface::read_register(self, address, bits, buffer).await
    }

    /// Write `data` to consecutive registers starting at `address`
    ///
    /// # Errors
    ///
    /// Returns the transport error unchanged; there is no retry.
    pub async fn write_burst(&mut self, address: u8, data: &[u8]) -> Result<(), SPI::Error> {
        let bits = bit_len(data.len());
        device_driver::AsyncRegisterInterface::write_register(self, address, bits, data).await
    }
}

#[cfg(feature = "async")]
impl<SPI, D> device_driver::AsyncRegisterInterface for SpiInterface<SPI, D>
where
    SPI: embedded_hal_async::spi::SpiDevice,
    D: embedded_hal_async::delay::DelayNs,
{
    type Error = SPI::Error;
    type AddressType = u8;

    async fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for SPI
        let mut dummy = [0u8; 1];

        // The BMI270 clocks out one dummy byte before the payload
        let mut operations = [
            embedded_hal_async::spi::Operation::Write(&[address | SPI_READ_FLAG]),
            embedded_hal_async::spi::Operation::Read(&mut dummy),
            embedded_hal_async::spi::Operation::Read(read_data),
        ];

        let result = self.spi.transaction(&mut operations).await;
        self.delay.delay_us(self.timing.settle_us()).await;
        result
    }

    async fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for SPI

        let mut operations = [
            embedded_hal_async::spi::Operation::Write(&[address & !SPI_READ_FLAG]),
            embedded_hal_async::spi::Operation::Write(write_data),
        ];

        let result = self.spi.transaction(&mut operations).await;
        self.delay.delay_us(self.timing.settle_us()).await;
        result
    }
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn bit_len(bytes: usize) -> u32 {
    (bytes * 8) as u32
}
