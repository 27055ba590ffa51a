//! Unit tests for the SPI framing and settle delays

use crate::common::mock_spi::{SETTLE_NORMAL_NS, SETTLE_SUSPEND_NS};
use crate::common::{BusEvent, MockSpi};
use bmi270::{BusTiming, Error, SpiInterface, TimingMode};

fn interface() -> (SpiInterface<MockSpi, crate::common::MockDelay>, MockSpi) {
    let spi = MockSpi::new();
    (SpiInterface::new(spi.clone(), spi.delay()), spi)
}

#[test]
fn test_read_sets_read_flag_and_skips_dummy_byte() {
    let (mut interface, spi) = interface();

    let chip_id = interface.read(0x00).unwrap();

    assert_eq!(chip_id, bmi270::CHIP_ID_VALUE);
    assert_eq!(
        spi.transactions(),
        vec![BusEvent::Read {
            raw_address: 0x80,
            len: 1
        }]
    );
}

#[test]
fn test_write_clears_read_flag() {
    let (mut interface, spi) = interface();

    interface.write(0x7D, 0x0E).unwrap();

    assert_eq!(
        spi.transactions(),
        vec![BusEvent::Write {
            raw_address: 0x7D,
            data: vec![0x0E]
        }]
    );
    assert_eq!(spi.register(0x7D), 0x0E);
}

#[test]
fn test_burst_read_auto_increments() {
    let (mut interface, spi) = interface();
    spi.set_accel_data(1, -2, 300);

    let mut buffer = [0u8; 6];
    interface.read_burst(0x0C, &mut buffer).unwrap();

    assert_eq!(buffer, [0x01, 0x00, 0xFE, 0xFF, 0x2C, 0x01]);
}

#[test]
fn test_burst_write_is_one_transaction() {
    let (mut interface, spi) = interface();

    interface.write_burst(0x46, &[0x00, 0x02]).unwrap();

    assert_eq!(spi.transactions().len(), 1);
    assert_eq!(spi.register(0x46), 0x00);
    assert_eq!(spi.register(0x47), 0x02);
}

#[test]
fn test_suspend_timing_after_every_transaction() {
    let (mut interface, spi) = interface();
    assert_eq!(interface.timing(), TimingMode::Suspend);

    interface.write(0x7C, 0x00).unwrap();
    interface.read(0x21).unwrap();

    assert_eq!(
        spi.events(),
        vec![
            BusEvent::Write {
                raw_address: 0x7C,
                data: vec![0x00]
            },
            BusEvent::Delay {
                ns: SETTLE_SUSPEND_NS
            },
            BusEvent::Read {
                raw_address: 0xA1,
                len: 1
            },
            BusEvent::Delay {
                ns: SETTLE_SUSPEND_NS
            },
        ]
    );
}

#[test]
fn test_normal_timing_after_mark() {
    let (mut interface, spi) = interface();

    interface.mark_bring_up_complete();
    interface.write(0x7D, 0x0E).unwrap();

    assert_eq!(interface.timing(), TimingMode::Normal);
    assert_eq!(
        spi.events()[1],
        BusEvent::Delay {
            ns: SETTLE_NORMAL_NS
        }
    );
}

#[test]
fn test_transport_error_propagates_without_retry() {
    let (mut interface, spi) = interface();
    spi.fail_next();

    let result = interface.read(0x00);

    assert!(result.is_err());
    assert_eq!(spi.transactions().len(), 1, "must not retry");

    // The next transaction goes through
    assert_eq!(interface.read(0x00).unwrap(), bmi270::CHIP_ID_VALUE);
}

#[test]
fn test_driver_wraps_transport_error() {
    let spi = MockSpi::new();
    let mut driver = bmi270::Bmi270Driver::new(SpiInterface::new(spi.clone(), spi.delay()));
    spi.fail_next();

    assert!(matches!(driver.read_chip_id(), Err(Error::Bus(_))));
}

#[test]
fn test_release_returns_parts() {
    let (interface, _spi) = interface();
    let (_spi, _delay) = interface.release();
}
