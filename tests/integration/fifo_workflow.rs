//! Integration tests for the bring-up, configure, drain and decode workflow

use crate::common::mock_spi::{FIFO_EMPTY_BYTE, INT_MAP_DATA};
use crate::common::{
    TEST_CONFIG_FILE, accel_frame, combined_frame, create_mock_driver, gyro_frame,
};
use bmi270::fifo::parser::{FrameTally, HEADER_CONFIG_CHANGE, HEADER_SENSOR_TIME, HEADER_SKIP};
use bmi270::watermark::DEFAULT_WAIT_TIMEOUT_MS;
use bmi270::{
    AccelConfig, AccelData, ConfigBlob, DataInterrupts, DecodeError, FifoConfig, FifoCursor,
    FifoFrame, GyroConfig, GyroData, IntPin, InterruptPinConfig, MalformedFrame, TimingMode, Wake,
    WatermarkSignal, parse_batch,
};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;

#[test]
fn test_complete_fifo_workflow() {
    let (mut driver, spi) = create_mock_driver();
    let mut delay = spi.delay();

    // Bring-up and configuration
    driver
        .bring_up(&ConfigBlob::new(&TEST_CONFIG_FILE), &mut delay)
        .unwrap();
    assert_eq!(driver.timing(), TimingMode::Normal);

    driver
        .configure_accelerometer(&AccelConfig::default())
        .unwrap();
    driver.configure_gyroscope(&GyroConfig::default()).unwrap();
    driver
        .fifo_configure(&FifoConfig {
            watermark: 26,
            ..FifoConfig::default()
        })
        .unwrap();
    driver
        .configure_interrupt_pin(IntPin::Int1, &InterruptPinConfig::default())
        .unwrap();
    driver
        .map_data_interrupts(IntPin::Int1, &DataInterrupts::fifo_batch())
        .unwrap();
    assert_eq!(spi.register(INT_MAP_DATA), 0x03);

    // The chip fills its FIFO and raises INT1
    spi.push_fifo(&combined_frame([10, 20, 30], [1000, -1000, 4096]));
    spi.push_fifo(&combined_frame([11, 21, 31], [1001, -1001, 4097]));
    let watermark = WatermarkSignal::<NoopRawMutex>::new();
    watermark.notify();

    // Consumer task
    let wake = watermark.wait_blocking(&mut delay, DEFAULT_WAIT_TIMEOUT_MS);
    assert_eq!(wake, Wake::Interrupt);

    let mut buffer = [0u8; 2048];
    let len = driver.fifo_service(wake, 26, &mut buffer).unwrap();
    assert_eq!(len, 26);

    let frames: Vec<_> = FifoCursor::new(&buffer[..len]).collect();
    assert_eq!(
        frames,
        vec![
            Ok(FifoFrame::AccelGyro {
                gyro: GyroData {
                    x: 10,
                    y: 20,
                    z: 30
                },
                accel: AccelData {
                    x: 1000,
                    y: -1000,
                    z: 4096
                },
            }),
            Ok(FifoFrame::AccelGyro {
                gyro: GyroData {
                    x: 11,
                    y: 21,
                    z: 31
                },
                accel: AccelData {
                    x: 1001,
                    y: -1001,
                    z: 4097
                },
            }),
        ]
    );
}

#[test]
fn test_watermark_timeout_falls_back_to_polling() {
    let (mut driver, spi) = create_mock_driver();
    let mut delay = spi.delay();
    driver
        .bring_up(&ConfigBlob::new(&TEST_CONFIG_FILE), &mut delay)
        .unwrap();

    // INT line not wired: no notification, but the FIFO is past the watermark
    for i in 0..4 {
        spi.push_fifo(&combined_frame([i, i, i], [i, i, i]));
    }
    let watermark = WatermarkSignal::<NoopRawMutex>::new();

    let wake = watermark.wait_blocking(&mut delay, 5);
    assert_eq!(wake, Wake::Timeout);

    let mut buffer = [0u8; 2048];
    let len = driver.fifo_service(wake, 26, &mut buffer).unwrap();
    assert_eq!(len, 52);

    let batch = parse_batch::<8>(&buffer[..len], false).unwrap();
    assert_eq!(batch.tally.acc_gyr, 4);
    assert_eq!(batch.consumed, 52);
}

#[test]
fn test_mixed_stream_with_control_frames() {
    let (mut driver, spi) = create_mock_driver();
    driver
        .bring_up(&ConfigBlob::new(&TEST_CONFIG_FILE), &mut spi.delay())
        .unwrap();

    spi.push_fifo(&[HEADER_SKIP]);
    spi.push_fifo(&accel_frame([1, 2, 3]));
    spi.push_fifo(&[HEADER_CONFIG_CHANGE]);
    spi.push_fifo(&gyro_frame([4, 5, 6]));
    spi.push_fifo(&[0x13]);
    spi.push_fifo(&combined_frame([7, 8, 9], [10, 11, 12]));
    spi.push_fifo(&[HEADER_SENSOR_TIME]);

    let mut buffer = [0u8; 2048];
    let len = driver.fifo_drain(&mut buffer).unwrap();

    let mut tally = FrameTally::default();
    let mut data = Vec::new();
    for item in FifoCursor::new(&buffer[..len]) {
        match item {
            Ok(frame) => {
                tally.record(&frame);
                if frame.is_data() {
                    data.push(frame);
                }
            }
            Err(malformed) => tally.record_malformed(&malformed),
        }
    }

    assert_eq!(
        data,
        vec![
            FifoFrame::Accel(AccelData { x: 1, y: 2, z: 3 }),
            FifoFrame::Gyro(GyroData { x: 4, y: 5, z: 6 }),
            FifoFrame::AccelGyro {
                gyro: GyroData { x: 7, y: 8, z: 9 },
                accel: AccelData {
                    x: 10,
                    y: 11,
                    z: 12
                },
            },
        ]
    );
    assert_eq!(tally.skip, 1);
    assert_eq!(tally.config_change, 1);
    assert_eq!(tally.sensor_time, 1);
    assert_eq!(tally.unknown, 1);
    assert_eq!(tally.data_frames(), 3);
}

#[test]
fn test_truncated_frame_carried_into_next_read() {
    let (mut driver, spi) = create_mock_driver();
    driver
        .bring_up(&ConfigBlob::new(&TEST_CONFIG_FILE), &mut spi.delay())
        .unwrap();

    let first = combined_frame([1, 1, 1], [2, 2, 2]);
    let second = combined_frame([3, 3, 3], [4, 4, 4]);

    // First read ends in the middle of the second frame
    spi.push_fifo(&first);
    spi.push_fifo(&second[..5]);

    let mut buffer = [0u8; 2048];
    let len = driver.fifo_drain(&mut buffer).unwrap();
    assert_eq!(len, 18);

    let mut cursor = FifoCursor::new(&buffer[..len]);
    assert!(matches!(
        cursor.decode_next(),
        Ok(FifoFrame::AccelGyro { .. })
    ));
    assert_eq!(
        cursor.decode_next(),
        Err(DecodeError::Malformed(MalformedFrame::Truncated {
            header: 0x8C,
            needed: 13,
            available: 5,
        }))
    );
    assert_eq!(cursor.consumed(), 13, "truncated frame is not consumed");

    // Keep the tail and append the next read
    let consumed = cursor.consumed();
    buffer.copy_within(consumed..len, 0);
    let carried = len - consumed;

    spi.push_fifo(&second[5..]);
    let more = driver.fifo_drain(&mut buffer[carried..]).unwrap();

    let mut cursor = FifoCursor::new(&buffer[..carried + more]);
    assert_eq!(
        cursor.decode_next(),
        Ok(FifoFrame::AccelGyro {
            gyro: GyroData { x: 3, y: 3, z: 3 },
            accel: AccelData { x: 4, y: 4, z: 4 },
        })
    );
    assert_eq!(cursor.decode_next(), Err(DecodeError::NoMoreFrames));
}

#[test]
fn test_reading_past_fifo_end_yields_empty_markers() {
    let (mut driver, spi) = create_mock_driver();
    driver
        .bring_up(&ConfigBlob::new(&TEST_CONFIG_FILE), &mut spi.delay())
        .unwrap();
    spi.push_fifo(&accel_frame([1, 2, 3]));

    // Read more than is available
    let mut buffer = [0u8; 9];
    driver.fifo_read(&mut buffer).unwrap();
    assert_eq!(&buffer[7..], &[FIFO_EMPTY_BYTE, FIFO_EMPTY_BYTE]);

    let frames: Vec<_> = FifoCursor::new(&buffer).collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(
        frames[1],
        Err(MalformedFrame::UnknownHeader(FIFO_EMPTY_BYTE))
    );
}

#[test]
fn test_parse_batch_overflow() {
    let mut stream = Vec::new();
    for _ in 0..3 {
        stream.extend_from_slice(&accel_frame([0, 0, 0]));
    }

    assert!(matches!(
        parse_batch::<2>(&stream, false),
        Err(bmi270::Error::FifoOverflow)
    ));
    assert_eq!(parse_batch::<3>(&stream, false).unwrap().frames.len(), 3);
}

#[test]
fn test_sensor_time_decoding_is_opt_in() {
    let stream = [HEADER_SENSOR_TIME, 0x01, 0x02, 0x03, HEADER_SKIP];

    let partial = parse_batch::<4>(&stream, false).unwrap();
    assert_eq!(partial.tally.sensor_time, 1);
    assert_eq!(partial.tally.unknown, 3, "time bytes are stepped over one by one");

    let mut cursor = FifoCursor::new(&stream).with_sensor_time();
    assert_eq!(
        cursor.decode_next(),
        Ok(FifoFrame::SensorTime(Some(0x0003_0201)))
    );
    assert_eq!(cursor.decode_next(), Ok(FifoFrame::Skip));
}
