//! Unit tests for FIFO configuration and access

use crate::common::mock_spi::{CMD, FIFO_CONFIG_0, FIFO_CONFIG_1, FIFO_WTM_0, FIFO_WTM_1};
use crate::common::{BusEvent, combined_frame, ready_driver};
use bmi270::registers::addr;
use bmi270::{Error, FifoConfig, Wake};

#[test]
fn test_watermark_512_round_trip() {
    let (mut driver, spi) = ready_driver();

    driver
        .fifo_configure(&FifoConfig {
            watermark: 512,
            ..FifoConfig::default()
        })
        .unwrap();

    // Bytes, not 4-byte words
    assert_eq!(spi.writes_to(FIFO_WTM_0), vec![vec![0x00]]);
    assert_eq!(spi.writes_to(FIFO_WTM_1), vec![vec![0x02]]);
    assert_eq!(driver.fifo_watermark().unwrap(), 512);
}

#[test]
fn test_watermark_split_across_registers() {
    let (mut driver, spi) = ready_driver();

    driver
        .fifo_configure(&FifoConfig {
            watermark: 520,
            ..FifoConfig::default()
        })
        .unwrap();

    assert_eq!(spi.register(FIFO_WTM_0), 0x08);
    assert_eq!(spi.register(FIFO_WTM_1), 0x02);
    assert_eq!(driver.fifo_watermark().unwrap(), 520);
}

#[test]
fn test_watermark_clamped() {
    let (mut driver, spi) = ready_driver();

    driver
        .fifo_configure(&FifoConfig {
            watermark: 3000,
            ..FifoConfig::default()
        })
        .unwrap();

    assert_eq!(spi.register(FIFO_WTM_0), 0xFF);
    assert_eq!(spi.register(FIFO_WTM_1), 0x07);
    assert_eq!(driver.fifo_watermark().unwrap(), 2047);
}

#[test]
fn test_zero_watermark_leaves_registers_alone() {
    let (mut driver, spi) = ready_driver();

    driver.fifo_configure(&FifoConfig::default()).unwrap();

    assert!(spi.writes_to(FIFO_WTM_0).is_empty());
    assert!(spi.writes_to(FIFO_WTM_1).is_empty());
}

#[test]
fn test_fifo_config_bits() {
    let (mut driver, spi) = ready_driver();

    driver
        .fifo_configure(&FifoConfig {
            stop_on_full: true,
            ..FifoConfig::default()
        })
        .unwrap();

    // Sensor time bit (reset value) is preserved
    assert_eq!(spi.register(FIFO_CONFIG_0), 0x03);
    assert_eq!(spi.register(FIFO_CONFIG_1), 0xD0);

    driver
        .fifo_configure(&FifoConfig {
            gyr_enable: false,
            ..FifoConfig::default()
        })
        .unwrap();

    assert_eq!(spi.register(FIFO_CONFIG_0), 0x02);
    assert_eq!(spi.register(FIFO_CONFIG_1), 0x50);
}

#[test]
fn test_fifo_length_masked_to_11_bits() {
    let (mut driver, spi) = ready_driver();
    spi.override_fifo_length([0xFF, 0xFF]);

    assert_eq!(driver.fifo_length().unwrap(), 2047);
}

#[test]
fn test_fifo_length_follows_content() {
    let (mut driver, spi) = ready_driver();
    assert_eq!(driver.fifo_length().unwrap(), 0);

    spi.push_fifo(&combined_frame([1, 2, 3], [4, 5, 6]));
    assert_eq!(driver.fifo_length().unwrap(), 13);
}

#[test]
fn test_fifo_read_rejects_bad_buffers() {
    let (mut driver, spi) = ready_driver();

    assert!(matches!(driver.fifo_read(&mut []), Err(Error::InvalidArgument)));
    let mut too_big = [0u8; 2049];
    assert!(matches!(
        driver.fifo_read(&mut too_big),
        Err(Error::InvalidArgument)
    ));

    assert!(spi.events().is_empty());
}

#[test]
fn test_fifo_read_full_size() {
    let (mut driver, spi) = ready_driver();
    let mut buffer = [0u8; 2048];

    driver.fifo_read(&mut buffer).unwrap();

    assert_eq!(
        spi.transactions(),
        vec![BusEvent::Read {
            raw_address: addr::FIFO_DATA | 0x80,
            len: 2048
        }]
    );
}

#[test]
fn test_fifo_flush() {
    let (mut driver, spi) = ready_driver();
    spi.push_fifo(&[0x40; 10]);

    driver.fifo_flush().unwrap();

    assert_eq!(spi.writes_to(CMD), vec![vec![0xB0]]);
    assert_eq!(spi.fifo_len(), 0);
}

#[test]
fn test_fifo_drain() {
    let (mut driver, spi) = ready_driver();
    let frame = combined_frame([1, 2, 3], [4, 5, 6]);
    spi.push_fifo(&frame);
    spi.push_fifo(&frame);

    let mut buffer = [0u8; 64];
    let len = driver.fifo_drain(&mut buffer).unwrap();

    assert_eq!(len, 26);
    assert_eq!(&buffer[..13], &frame);
    assert_eq!(&buffer[13..26], &frame);
    assert_eq!(spi.fifo_len(), 0);
    assert_eq!(
        spi.transactions(),
        vec![
            BusEvent::Read {
                raw_address: addr::FIFO_LENGTH_0 | 0x80,
                len: 2
            },
            BusEvent::Read {
                raw_address: addr::FIFO_DATA | 0x80,
                len: 26
            },
        ]
    );
}

#[test]
fn test_fifo_drain_limited_by_buffer() {
    let (mut driver, spi) = ready_driver();
    spi.push_fifo(&[0x40; 30]);

    let mut buffer = [0u8; 13];
    assert_eq!(driver.fifo_drain(&mut buffer).unwrap(), 13);
    assert_eq!(spi.fifo_len(), 17);
}

#[test]
fn test_fifo_drain_empty() {
    let (mut driver, spi) = ready_driver();

    let mut buffer = [0u8; 64];
    assert_eq!(driver.fifo_drain(&mut buffer).unwrap(), 0);
    assert_eq!(spi.transactions().len(), 1, "only the length query");
}

#[test]
fn test_fifo_service_after_interrupt() {
    let (mut driver, spi) = ready_driver();
    spi.push_fifo(&combined_frame([1, 2, 3], [4, 5, 6]));

    let mut buffer = [0u8; 64];
    let len = driver.fifo_service(Wake::Interrupt, 520, &mut buffer).unwrap();

    assert_eq!(len, 13);
}

#[test]
fn test_fifo_service_timeout_below_watermark() {
    let (mut driver, spi) = ready_driver();
    spi.push_fifo(&combined_frame([1, 2, 3], [4, 5, 6]));

    let mut buffer = [0u8; 64];
    let len = driver.fifo_service(Wake::Timeout, 26, &mut buffer).unwrap();

    assert_eq!(len, 0);
    assert_eq!(spi.fifo_len(), 13, "data stays for the next wake-up");
    assert_eq!(spi.transactions().len(), 1);
}

#[test]
fn test_fifo_service_timeout_polls_as_fallback() {
    let (mut driver, spi) = ready_driver();
    let frame = combined_frame([1, 2, 3], [4, 5, 6]);
    spi.push_fifo(&frame);
    spi.push_fifo(&frame);

    let mut buffer = [0u8; 64];
    let len = driver.fifo_service(Wake::Timeout, 26, &mut buffer).unwrap();

    assert_eq!(len, 26);
    assert_eq!(spi.fifo_len(), 0);
}

#[test]
fn test_fifo_service_timeout_on_empty_fifo() {
    let (mut driver, _spi) = ready_driver();

    let mut buffer = [0u8; 64];
    assert_eq!(
        driver.fifo_service(Wake::Timeout, 0, &mut buffer).unwrap(),
        0
    );
}
