//! Unit tests for the bring-up sequence

use crate::common::mock_spi::{
    CMD, INIT_ADDR_0, INIT_ADDR_1, INIT_CTRL, INTERNAL_STATUS, PWR_CONF, PWR_CTRL,
    SETTLE_NORMAL_NS, SETTLE_SUSPEND_NS,
};
use crate::common::{BusEvent, InitBehaviour, TEST_CONFIG_FILE, create_mock_driver};
use bmi270::registers::addr;
use bmi270::{BringUpState, ConfigBlob, Error, SensorPowerConfig, TimingMode};

fn blob() -> ConfigBlob<'static> {
    ConfigBlob::new(&TEST_CONFIG_FILE)
}

#[test]
fn test_new_does_not_touch_the_bus() {
    let (driver, spi) = create_mock_driver();

    assert_eq!(driver.state(), BringUpState::Uninitialized);
    assert!(!driver.is_ready());
    assert!(spi.events().is_empty());
}

#[test]
fn test_bring_up_reaches_ready() {
    let (mut driver, spi) = create_mock_driver();

    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    assert_eq!(driver.state(), BringUpState::Ready);
    assert!(driver.is_ready());
    assert_eq!(driver.timing(), TimingMode::Normal);
    assert_eq!(spi.config_ram(), TEST_CONFIG_FILE.to_vec());
    assert_eq!(spi.register(PWR_CTRL), 0x0E, "accel, gyro and temp enabled");
    assert_eq!(spi.register(PWR_CONF), 0x02, "power save off, FIFO self-wake-up on");
}

#[test]
fn test_bring_up_step_order() {
    let (mut driver, spi) = create_mock_driver();

    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    let transactions = spi.transactions();
    let position = |predicate: fn(&BusEvent) -> bool| {
        transactions
            .iter()
            .position(|e| predicate(e))
            .expect("transaction not found")
    };

    let soft_reset = position(|e| e.is_write_of(CMD, &[0xB6]));
    let power_save_off = position(|e| e.is_write_of(PWR_CONF, &[0x00]));
    let prepare = position(|e| e.is_write_of(INIT_CTRL, &[0x00]));
    let first_chunk = position(|e| e.address() == Some(addr::INIT_DATA));
    let complete = position(|e| e.is_write_of(INIT_CTRL, &[0x01]));
    let first_poll = position(|e| e.address() == Some(INTERNAL_STATUS));
    let sensors_on = position(|e| e.is_write_of(PWR_CTRL, &[0x0E]));
    let normal_power = position(|e| e.is_write_of(PWR_CONF, &[0x02]));

    // SPI activation and chip ID check come first
    assert_eq!(transactions[0].address(), Some(addr::CHIP_ID));
    assert!(soft_reset > 0);
    assert!(soft_reset < power_save_off);
    assert!(power_save_off < prepare);
    assert!(prepare < first_chunk);
    assert!(first_chunk < complete);
    assert!(complete < first_poll);
    assert!(first_poll < sensors_on);
    assert!(sensors_on < normal_power);
}

#[test]
fn test_config_uploaded_in_256_byte_chunks() {
    let (mut driver, spi) = create_mock_driver();

    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    let chunks = spi.writes_to(addr::INIT_DATA);
    assert_eq!(chunks.len(), 32);
    assert!(chunks.iter().all(|chunk| chunk.len() == 256));
    assert_eq!(chunks[1], TEST_CONFIG_FILE[256..512].to_vec());

    // Every chunk is preceded by both address registers; the last chunk
    // starts at word 3968 = 0xF80
    let addr_1 = spi.writes_to(INIT_ADDR_1);
    let addr_0 = spi.writes_to(INIT_ADDR_0);
    assert_eq!(addr_1.len(), 33, "initial reset plus one per chunk");
    assert_eq!(addr_0.len(), 33);
    assert_eq!(addr_1.last(), Some(&vec![0xF8]));
    assert_eq!(addr_0.last(), Some(&vec![0x00]));
}

#[test]
fn test_settle_delay_switches_only_after_init_ok() {
    let (mut driver, spi) = create_mock_driver();

    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    let events = spi.events();
    let status_reads: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_transaction() && e.address() == Some(INTERNAL_STATUS))
        .map(|(i, _)| i)
        .collect();
    let init_ok_read = *status_reads.last().unwrap();

    for (i, event) in events.iter().enumerate() {
        if !event.is_transaction() {
            continue;
        }
        let expected = if i <= init_ok_read {
            SETTLE_SUSPEND_NS
        } else {
            SETTLE_NORMAL_NS
        };
        assert_eq!(
            events[i + 1],
            BusEvent::Delay { ns: expected },
            "wrong settle delay after {event:?}"
        );
    }

    // Something did run in normal timing
    assert!(events[init_ok_read + 1..]
        .iter()
        .any(|e| *e == BusEvent::Delay { ns: SETTLE_NORMAL_NS }));
}

#[test]
fn test_chip_id_mismatch() {
    let (mut driver, spi) = create_mock_driver();
    spi.set_chip_id(0x43);

    let result = driver.bring_up(&blob(), &mut spi.delay());

    assert!(matches!(result, Err(Error::ChipIdMismatch(0x43))));
    assert_eq!(driver.state(), BringUpState::Failed);
    assert!(spi.writes_to(CMD).is_empty(), "no soft reset on a foreign chip");
    assert_eq!(driver.timing(), TimingMode::Suspend);
}

#[test]
fn test_config_rejected() {
    let (mut driver, spi) = create_mock_driver();
    spi.set_init_behaviour(InitBehaviour::Reject);

    let result = driver.bring_up(&blob(), &mut spi.delay());

    assert!(matches!(result, Err(Error::ConfigRejected)));
    assert_eq!(driver.state(), BringUpState::Failed);
    assert_eq!(driver.timing(), TimingMode::Suspend);
    assert_eq!(spi.reads_from(INTERNAL_STATUS), 1);
}

#[test]
fn test_verification_timeout() {
    let (mut driver, spi) = create_mock_driver();
    spi.set_init_behaviour(InitBehaviour::Hang);

    let result = driver.bring_up(&blob(), &mut spi.delay());

    assert!(matches!(result, Err(Error::VerificationTimeout)));
    assert_eq!(driver.state(), BringUpState::Failed);
    assert_eq!(driver.timing(), TimingMode::Suspend);
    // 150 ms in 2 ms steps
    assert_eq!(spi.reads_from(INTERNAL_STATUS), 75);
    assert!(spi.writes_to(PWR_CTRL).is_empty());
}

#[test]
fn test_transport_failure_during_upload() {
    let (mut driver, spi) = create_mock_driver();
    spi.fail_writes_to(addr::INIT_DATA);

    let result = driver.bring_up(&blob(), &mut spi.delay());

    assert!(matches!(result, Err(Error::Bus(_))));
    assert_eq!(driver.state(), BringUpState::Failed);
    assert_eq!(spi.writes_to(addr::INIT_DATA).len(), 1, "no retry");
    assert!(spi.writes_to(INIT_CTRL).iter().all(|data| data == &[0x00]));
}

#[test]
fn test_bring_up_can_be_restarted_after_failure() {
    let (mut driver, spi) = create_mock_driver();
    spi.set_init_behaviour(InitBehaviour::Hang);
    assert!(driver.bring_up(&blob(), &mut spi.delay()).is_err());

    spi.set_init_behaviour(InitBehaviour::Accept);
    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    assert!(driver.is_ready());
    assert_eq!(spi.writes_to(CMD).len(), 2, "second attempt starts from reset");
}

#[test]
fn test_retry_after_failed_power_writes_keeps_the_uploaded_config() {
    let (mut driver, spi) = create_mock_driver();
    spi.fail_writes_to(PWR_CTRL);

    let result = driver.bring_up(&blob(), &mut spi.delay());

    assert!(matches!(result, Err(Error::Bus(_))));
    assert_eq!(driver.state(), BringUpState::Failed);
    assert_eq!(driver.timing(), TimingMode::Normal);

    spi.clear_failures();
    spi.clear_events();
    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    assert!(driver.is_ready());
    assert!(spi.writes_to(CMD).is_empty(), "no soft reset on resume");
    assert!(spi.writes_to(INIT_CTRL).is_empty());
    assert!(spi.writes_to(addr::INIT_DATA).is_empty());
    assert_eq!(spi.writes_to(PWR_CTRL), vec![vec![0x0E]]);
    assert_eq!(spi.writes_to(PWR_CONF), vec![vec![0x02]]);
    assert_eq!(spi.register(PWR_CTRL), 0x0E);
    assert!(
        spi.events()
            .iter()
            .all(|event| *event != BusEvent::Delay { ns: SETTLE_SUSPEND_NS })
    );
}

#[test]
fn test_resume_can_fail_again_and_still_resume() {
    let (mut driver, spi) = create_mock_driver();
    spi.fail_writes_to(PWR_CTRL);
    assert!(driver.bring_up(&blob(), &mut spi.delay()).is_err());
    assert!(driver.bring_up(&blob(), &mut spi.delay()).is_err());
    assert_eq!(driver.state(), BringUpState::Failed);
    assert_eq!(spi.writes_to(CMD).len(), 1, "only the first attempt resets");

    spi.clear_failures();
    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    assert!(driver.is_ready());
    assert_eq!(spi.writes_to(CMD).len(), 1);
    assert_eq!(spi.register(PWR_CONF), 0x02);
}

#[test]
fn test_bring_up_when_ready_is_a_no_op() {
    let (mut driver, spi) = create_mock_driver();
    driver.bring_up(&blob(), &mut spi.delay()).unwrap();
    spi.clear_events();

    driver.bring_up(&blob(), &mut spi.delay()).unwrap();

    assert!(spi.events().is_empty());
    assert!(driver.is_ready());
}

#[test]
fn test_operations_gated_before_bring_up() {
    let (mut driver, spi) = create_mock_driver();
    let mut buffer = [0u8; 16];

    assert!(matches!(driver.read_accel_raw(), Err(Error::NotReady)));
    assert!(matches!(driver.read_gyroscope(), Err(Error::NotReady)));
    assert!(matches!(
        driver.set_accel_range(bmi270::AccRange::G4),
        Err(Error::NotReady)
    ));
    assert!(matches!(
        driver.set_sensor_power(&SensorPowerConfig::accel_only()),
        Err(Error::NotReady)
    ));
    assert!(matches!(driver.fifo_length(), Err(Error::NotReady)));
    assert!(matches!(driver.fifo_read(&mut buffer), Err(Error::NotReady)));
    assert!(matches!(driver.fifo_flush(), Err(Error::NotReady)));
    assert!(matches!(driver.read_interrupt_status(), Err(Error::NotReady)));

    assert!(spi.events().is_empty(), "gated calls must not touch the bus");
}

#[test]
fn test_operations_gated_after_failed_bring_up() {
    let (mut driver, spi) = create_mock_driver();
    spi.set_init_behaviour(InitBehaviour::Reject);
    assert!(driver.bring_up(&blob(), &mut spi.delay()).is_err());
    spi.clear_events();

    assert!(matches!(driver.read_imu_raw(), Err(Error::NotReady)));
    assert!(spi.events().is_empty());
}

#[test]
fn test_diagnostic_reads_allowed_before_bring_up() {
    let (mut driver, _spi) = create_mock_driver();

    assert_eq!(driver.read_chip_id().unwrap(), bmi270::CHIP_ID_VALUE);
    assert_eq!(
        driver.read_init_status().unwrap(),
        bmi270::InitStatus::NotInitialized
    );
}

#[test]
fn test_config_blob_from_slice_rejects_wrong_size() {
    assert!(matches!(
        ConfigBlob::from_slice(&TEST_CONFIG_FILE[..100]),
        Err(Error::InvalidArgument)
    ));
    assert!(ConfigBlob::from_slice(&TEST_CONFIG_FILE[..]).is_ok());
}
