//! FIFO frame decoding
//!
//! In header mode the FIFO stream is a sequence of self-describing frames.
//! Each frame starts with a header byte; the header decides how many bytes
//! follow and what they mean:
//!
//! | Header | Frame            | Length | Payload                                    |
//! |--------|------------------|--------|--------------------------------------------|
//! | `0x84` | accelerometer    | 7      | acc x, y, z (LE `i16`)                     |
//! | `0x88` | gyroscope        | 7      | gyr x, y, z (LE `i16`)                     |
//! | `0x8C` | accel + gyro     | 13     | gyr x, y, z first, then acc x, y, z        |
//! | `0x40` | skip             | 1      | -                                          |
//! | `0x44` | sensor time      | 1 (4)  | 24-bit LE time, only with `with_sensor_time` |
//! | `0x48` | config change    | 1      | -                                          |
//!
//! Anything else is an unknown header: the cursor steps over one byte and
//! reports it, so the caller can keep going. A frame cut off at the end of the
//! buffer is reported as truncated and the cursor stays put; the remaining
//! bytes belong to the next bulk read.
//!
//! # Example
//!
//! ```ignore
//! # use bmi270::fifo::parser::{DecodeError, FifoCursor, FifoFrame};
//! # let buffer = [0u8; 13];
//! let mut cursor = FifoCursor::new(&buffer);
//! loop {
//!     match cursor.decode_next() {
//!         Ok(FifoFrame::AccelGyro { gyro, accel }) => { /* ... */ }
//!         Ok(_) => {}
//!         Err(DecodeError::NoMoreFrames) => break,
//!         Err(DecodeError::Malformed(frame)) if frame.is_truncated() => break,
//!         Err(DecodeError::Malformed(_)) => {}
//!     }
//! }
//! ```

use crate::Error;
use crate::device::{AccelData, GyroData};

/// Header of an accelerometer-only frame
pub const HEADER_ACC: u8 = 0x84;
/// Header of a gyroscope-only frame
pub const HEADER_GYR: u8 = 0x88;
/// Header of a combined accelerometer + gyroscope frame
pub const HEADER_ACC_GYR: u8 = 0x8C;
/// Header of a skip frame
pub const HEADER_SKIP: u8 = 0x40;
/// Header of a sensor-time frame
pub const HEADER_SENSOR_TIME: u8 = 0x44;
/// Header of a config-change frame
pub const HEADER_CONFIG_CHANGE: u8 = 0x48;

/// Length of an accelerometer-only frame including header
pub const FRAME_LEN_ACC: usize = 7;
/// Length of a gyroscope-only frame including header
pub const FRAME_LEN_GYR: usize = 7;
/// Length of a combined frame including header
pub const FRAME_LEN_ACC_GYR: usize = 13;
/// Length of a control frame (skip, config change, partially handled sensor time)
pub const FRAME_LEN_CONTROL: usize = 1;
/// Length of a fully decoded sensor-time frame including header
pub const FRAME_LEN_SENSOR_TIME: usize = 4;

/// One decoded FIFO frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoFrame {
    /// Frames were dropped by the chip
    Skip,
    /// Sensor time marker. `None` when only the header was consumed.
    SensorTime(Option<u32>),
    /// Sensor configuration changed
    ConfigChange,
    /// Accelerometer sample
    Accel(AccelData),
    /// Gyroscope sample
    Gyro(GyroData),
    /// Accelerometer and gyroscope sample taken together
    AccelGyro {
        /// Gyroscope part (bytes 1..7 of the frame)
        gyro: GyroData,
        /// Accelerometer part (bytes 7..13 of the frame)
        accel: AccelData,
    },
}

impl FifoFrame {
    /// Whether this frame carries sensor data
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Accel(_) | Self::Gyro(_) | Self::AccelGyro { .. })
    }
}

/// Frame that could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MalformedFrame {
    /// Buffer ends before the frame does; the cursor did not move
    Truncated {
        /// Header of the cut-off frame
        header: u8,
        /// Bytes the frame needs
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },
    /// Header byte is not a known frame type; the cursor moved one byte
    UnknownHeader(u8),
}

impl MalformedFrame {
    /// Whether decoding has to stop for this buffer
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

/// Why [`FifoCursor::decode_next`] did not return a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The buffer is exhausted
    NoMoreFrames,
    /// The next bytes are not a valid frame
    Malformed(MalformedFrame),
}

impl From<MalformedFrame> for DecodeError {
    fn from(frame: MalformedFrame) -> Self {
        Self::Malformed(frame)
    }
}

/// Lazy frame decoder over a caller-owned FIFO buffer
#[derive(Debug, Clone)]
pub struct FifoCursor<'a> {
    data: &'a [u8],
    consumed: usize,
    decode_sensor_time: bool,
    halted: bool,
}

impl<'a> FifoCursor<'a> {
    /// Create a cursor at the start of `data`
    ///
    /// Sensor-time frames are stepped over one byte at a time.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            consumed: 0,
            decode_sensor_time: false,
            halted: false,
        }
    }

    /// Decode sensor-time frames in full (header plus 24-bit time)
    #[must_use]
    pub const fn with_sensor_time(mut self) -> Self {
        self.decode_sensor_time = true;
        self
    }

    /// Bytes consumed so far
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes not yet consumed
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.consumed
    }

    /// Decode the frame at the cursor and advance past it
    ///
    /// # Errors
    ///
    /// - [`DecodeError::NoMoreFrames`] if the buffer is exhausted
    /// - [`MalformedFrame::Truncated`] if the frame does not fit in the
    ///   remaining bytes; the cursor is not advanced
    /// - [`MalformedFrame::UnknownHeader`] for an unrecognized header; the
    ///   cursor is advanced by one byte
    pub fn decode_next(&mut self) -> Result<FifoFrame, DecodeError> {
        let rest = &self.data[self.consumed..];
        let Some(&header) = rest.first() else {
            return Err(DecodeError::NoMoreFrames);
        };

        let needed = match header {
            HEADER_ACC => FRAME_LEN_ACC,
            HEADER_GYR => FRAME_LEN_GYR,
            HEADER_ACC_GYR => FRAME_LEN_ACC_GYR,
            HEADER_SENSOR_TIME if self.decode_sensor_time => FRAME_LEN_SENSOR_TIME,
            HEADER_SKIP | HEADER_SENSOR_TIME | HEADER_CONFIG_CHANGE => FRAME_LEN_CONTROL,
            unknown => {
                self.consumed += 1;

                #[cfg(feature = "defmt")]
                defmt::warn!("unknown FIFO header {=u8:#x}", unknown);

                return Err(MalformedFrame::UnknownHeader(unknown).into());
            }
        };

        if rest.len() < needed {
            return Err(MalformedFrame::Truncated {
                header,
                needed,
                available: rest.len(),
            }
            .into());
        }

        let frame = &rest[..needed];
        let decoded = match header {
            HEADER_ACC => FifoFrame::Accel(accel_from(&frame[1..7])),
            HEADER_GYR => FifoFrame::Gyro(gyro_from(&frame[1..7])),
            HEADER_ACC_GYR => FifoFrame::AccelGyro {
                gyro: gyro_from(&frame[1..7]),
                accel: accel_from(&frame[7..13]),
            },
            HEADER_SKIP => FifoFrame::Skip,
            HEADER_CONFIG_CHANGE => FifoFrame::ConfigChange,
            _ if needed == FRAME_LEN_SENSOR_TIME => {
                FifoFrame::SensorTime(Some(u32::from_le_bytes([frame[1], frame[2], frame[3], 0])))
            }
            _ => FifoFrame::SensorTime(None),
        };

        self.consumed += needed;
        Ok(decoded)
    }
}

impl Iterator for FifoCursor<'_> {
    type Item = Result<FifoFrame, MalformedFrame>;

    /// Yields frames and malformed-frame reports; ends at the end of the
    /// buffer or right after a truncated frame.
    fn next(&mut self) -> Option<Self::Item> {
        if self.halted {
            return None;
        }

        match self.decode_next() {
            Ok(frame) => Some(Ok(frame)),
            Err(DecodeError::NoMoreFrames) => None,
            Err(DecodeError::Malformed(frame)) => {
                self.halted = frame.is_truncated();
                Some(Err(frame))
            }
        }
    }
}

fn triple(bytes: &[u8]) -> (i16, i16, i16) {
    (
        i16::from_le_bytes([bytes[0], bytes[1]]),
        i16::from_le_bytes([bytes[2], bytes[3]]),
        i16::from_le_bytes([bytes[4], bytes[5]]),
    )
}

fn accel_from(bytes: &[u8]) -> AccelData {
    let (x, y, z) = triple(bytes);
    AccelData { x, y, z }
}

fn gyro_from(bytes: &[u8]) -> GyroData {
    let (x, y, z) = triple(bytes);
    GyroData { x, y, z }
}

/// Per-kind frame counts for one decoded buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameTally {
    /// Accelerometer-only frames
    pub acc: usize,
    /// Gyroscope-only frames
    pub gyr: usize,
    /// Combined frames
    pub acc_gyr: usize,
    /// Skip frames
    pub skip: usize,
    /// Sensor-time frames
    pub sensor_time: usize,
    /// Config-change frames
    pub config_change: usize,
    /// Unknown header bytes stepped over
    pub unknown: usize,
    /// Bytes left over in a truncated trailing frame
    pub truncated_bytes: usize,
}

impl FrameTally {
    /// Count one decoded frame
    pub fn record(&mut self, frame: &FifoFrame) {
        match frame {
            FifoFrame::Accel(_) => self.acc += 1,
            FifoFrame::Gyro(_) => self.gyr += 1,
            FifoFrame::AccelGyro { .. } => self.acc_gyr += 1,
            FifoFrame::Skip => self.skip += 1,
            FifoFrame::SensorTime(_) => self.sensor_time += 1,
            FifoFrame::ConfigChange => self.config_change += 1,
        }
    }

    /// Count one malformed frame
    pub fn record_malformed(&mut self, frame: &MalformedFrame) {
        match frame {
            MalformedFrame::UnknownHeader(_) => self.unknown += 1,
            MalformedFrame::Truncated { available, .. } => self.truncated_bytes += available,
        }
    }

    /// Number of frames carrying sensor data
    #[must_use]
    pub const fn data_frames(&self) -> usize {
        self.acc + self.gyr + self.acc_gyr
    }
}

/// Result of decoding a whole FIFO buffer
#[derive(Debug, Clone)]
pub struct FifoBatch<const N: usize> {
    /// Data-bearing frames in FIFO order
    pub frames: heapless::Vec<FifoFrame, N>,
    /// Counts of every frame kind seen
    pub tally: FrameTally,
    /// Bytes decoded (excludes a truncated trailing frame)
    pub consumed: usize,
}

/// Decode a whole FIFO buffer, keeping the data frames
///
/// Control frames and unknown headers are counted in the tally and otherwise
/// skipped. Decoding stops at a truncated trailing frame.
///
/// # Arguments
/// * `data` - Raw FIFO bytes
/// * `decode_sensor_time` - Decode sensor-time frames in full
///
/// # Errors
/// Returns `FifoOverflow` if the buffer holds more than `N` data frames.
pub fn parse_batch<const N: usize>(
    data: &[u8],
    decode_sensor_time: bool,
) -> Result<FifoBatch<N>, Error<()>> {
    let mut cursor = FifoCursor::new(data);
    if decode_sensor_time {
        cursor = cursor.with_sensor_time();
    }

    let mut frames = heapless::Vec::new();
    let mut tally = FrameTally::default();

    for item in cursor.by_ref() {
        match item {
            Ok(frame) => {
                tally.record(&frame);
                if frame.is_data() {
                    frames.push(frame).map_err(|_| Error::FifoOverflow)?;
                }
            }
            Err(malformed) => tally.record_malformed(&malformed),
        }
    }

    Ok(FifoBatch {
        frames,
        tally,
        consumed: cursor.consumed(),
    })
}
