//! FIFO watermark wake-up handoff
//!
//! The watermark interrupt arrives on a GPIO edge, usually in interrupt
//! context where no bus access is allowed. [`WatermarkSignal`] carries that
//! edge to the task that owns the driver: the interrupt handler calls
//! [`notify`](WatermarkSignal::notify), the consumer waits with a timeout and
//! then services the FIFO with [`fifo_service`](crate::Bmi270Driver::fifo_service).
//!
//! Repeated notifications before the consumer runs collapse into one wake-up.
//! That is fine: the consumer always reads the current fill level, not a count
//! of edges.
//!
//! # Example
//!
//! ```ignore
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use bmi270::watermark::{DEFAULT_WAIT_TIMEOUT_MS, WatermarkSignal, Wake};
//!
//! static FIFO_WATERMARK: WatermarkSignal<CriticalSectionRawMutex> = WatermarkSignal::new();
//!
//! // GPIO interrupt handler
//! fn on_int1_edge() {
//!     FIFO_WATERMARK.notify();
//! }
//!
//! // Consumer task
//! loop {
//!     let wake = FIFO_WATERMARK.wait(&mut Delay, DEFAULT_WAIT_TIMEOUT_MS).await;
//!     let len = imu.fifo_service(wake, 512, &mut buffer).await?;
//!     // decode buffer[..len]
//! }
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

/// Default time a consumer waits for a watermark edge before polling (ms)
pub const DEFAULT_WAIT_TIMEOUT_MS: u32 = 2000;

/// Poll interval of [`WatermarkSignal::wait_blocking`] (ms)
#[cfg(not(feature = "async"))]
const BLOCKING_POLL_INTERVAL_MS: u32 = 1;

/// Why a wait returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wake {
    /// The interrupt handler signalled a watermark edge
    Interrupt,
    /// No edge arrived within the timeout
    Timeout,
}

/// Single-slot wake token shared between an interrupt handler and a consumer
pub struct WatermarkSignal<M: RawMutex> {
    signal: Signal<M, ()>,
}

impl<M: RawMutex> WatermarkSignal<M> {
    /// Create a signal with no pending wake-up
    #[must_use]
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    /// Record a watermark edge. Safe to call from interrupt context.
    pub fn notify(&self) {
        self.signal.signal(());
    }

    /// Take a pending wake-up without waiting
    pub fn take(&self) -> bool {
        self.signal.try_take().is_some()
    }

    /// Whether a wake-up is pending, without consuming it
    pub fn is_pending(&self) -> bool {
        self.signal.signaled()
    }

    /// Drop any pending wake-up
    pub fn clear(&self) {
        self.signal.reset();
    }

    /// Wait for a wake-up, polling every millisecond
    ///
    /// # Arguments
    ///
    /// * `delay` - Delay provider implementing `embedded_hal::delay::DelayNs`
    /// * `timeout_ms` - Give up after this many milliseconds
    #[cfg(not(feature = "async"))]
    pub fn wait_blocking<D>(&self, delay: &mut D, timeout_ms: u32) -> Wake
    where
        D: embedded_hal::delay::DelayNs,
    {
        if self.take() {
            return Wake::Interrupt;
        }

        for _ in 0..(timeout_ms / BLOCKING_POLL_INTERVAL_MS) {
            delay.delay_ms(BLOCKING_POLL_INTERVAL_MS);
            if self.take() {
                return Wake::Interrupt;
            }
        }

        Wake::Timeout
    }

    /// Wait for a wake-up or the timeout, whichever comes first
    ///
    /// # Arguments
    ///
    /// * `delay` - Delay provider implementing `embedded_hal_async::delay::DelayNs`
    /// * `timeout_ms` - Give up after this many milliseconds
    #[cfg(feature = "async")]
    pub async fn wait<D>(&self, delay: &mut D, timeout_ms: u32) -> Wake
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        use embassy_futures::select::{Either, select};

        match select(self.signal.wait(), delay.delay_ms(timeout_ms)).await {
            Either::First(()) => Wake::Interrupt,
            Either::Second(()) => Wake::Timeout,
        }
    }
}

impl<M: RawMutex> Default for WatermarkSignal<M> {
    fn default() -> Self {
        Self::new()
    }
}
