//! BMI270 configuration file
//!
//! The config file is an opaque 8192-byte image published by Bosch Sensortec
//! as part of `BMI270_SensorAPI` (`bmi270_config_file` in `bmi270.c`). It is
//! not redistributed with this crate; embed it in your firmware with
//! `include_bytes!` and hand it to [`ConfigBlob::new`].
//!
//! The chip addresses its config RAM in 16-bit words. Before each burst to
//! `INIT_DATA` the word address of the chunk start is written split across two
//! registers: bits 3:0 to `INIT_ADDR_0` and bits 11:4 to `INIT_ADDR_1`.

use crate::Error;

/// Size of the config file in bytes
pub const CONFIG_FILE_SIZE: usize = 8192;

/// Bytes written to `INIT_DATA` per burst
pub const CONFIG_CHUNK_SIZE: usize = 256;

/// Borrowed, size-checked config file image
#[derive(Debug, Clone, Copy)]
pub struct ConfigBlob<'a> {
    data: &'a [u8; CONFIG_FILE_SIZE],
}

impl<'a> ConfigBlob<'a> {
    /// Wrap a config file image
    #[must_use]
    pub const fn new(data: &'a [u8; CONFIG_FILE_SIZE]) -> Self {
        Self { data }
    }

    /// Wrap a config file image of unchecked length
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `data` is not exactly
    /// [`CONFIG_FILE_SIZE`] bytes long.
    pub fn from_slice(data: &'a [u8]) -> Result<Self, Error<()>> {
        let data: &'a [u8; CONFIG_FILE_SIZE] =
            data.try_into().map_err(|_| Error::InvalidArgument)?;
        Ok(Self { data })
    }

    /// Raw bytes of the image
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Iterate over the upload chunks in order
    #[must_use]
    pub fn chunks(&self) -> ConfigChunks<'a> {
        ConfigChunks {
            data: self.data,
            offset: 0,
        }
    }
}

/// One `INIT_DATA` burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChunk<'a> {
    /// Byte offset of the chunk within the config file
    pub offset: usize,
    /// Chunk payload
    pub data: &'a [u8],
}

impl ConfigChunk<'_> {
    /// Word address of the chunk start (byte offset / 2)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn word_address(&self) -> u16 {
        (self.offset / 2) as u16
    }

    /// `INIT_ADDR_0` value (word address bits 3:0)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn init_addr_0(&self) -> u8 {
        (self.word_address() & 0x0F) as u8
    }

    /// `INIT_ADDR_1` value (word address bits 11:4)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn init_addr_1(&self) -> u8 {
        ((self.word_address() >> 4) & 0xFF) as u8
    }
}

/// Iterator over [`ConfigChunk`]s
#[derive(Debug, Clone)]
pub struct ConfigChunks<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for ConfigChunks<'a> {
    type Item = ConfigChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let end = (self.offset + CONFIG_CHUNK_SIZE).min(self.data.len());
        let chunk = ConfigChunk {
            offset: self.offset,
            data: &self.data[self.offset..end],
        };
        self.offset = end;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.data.len() - self.offset).div_ceil(CONFIG_CHUNK_SIZE);
        (left, Some(left))
    }
}

impl ExactSizeIterator for ConfigChunks<'_> {}
