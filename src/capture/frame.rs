use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Sample layouts the pipeline can reduce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    /// One byte per sample
    #[default]
    Gray8,
    /// Two bytes per sample, little endian
    Gray16,
}

impl SampleFormat {
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Gray8 => 1,
            SampleFormat::Gray16 => 2,
        }
    }

    pub const fn max_sample(self) -> u64 {
        match self {
            SampleFormat::Gray8 => u8::MAX as u64,
            SampleFormat::Gray16 => u16::MAX as u64,
        }
    }
}

/// Borrowed view of a frame, valid only while the delivery call runs.
///
/// `data` is `None` when the driver handed over a null buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameDescriptor<'a> {
    pub data: Option<&'a [u8]>,
    pub width: u32,
    pub height: u32,
    pub format: SampleFormat,
}

impl<'a> FrameDescriptor<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            data: Some(data),
            width,
            height,
            format: SampleFormat::Gray8,
        }
    }

    pub fn null(width: u32, height: u32) -> Self {
        Self {
            data: None,
            width,
            height,
            format: SampleFormat::Gray8,
        }
    }

    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.format = format;
        self
    }

    /// `width * height`, or `None` if either is zero or the product overflows.
    pub fn sample_count(&self) -> Option<usize> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Returns the exact pixel payload if the descriptor is admissible.
    pub fn payload(&self) -> Option<&'a [u8]> {
        let data = self.data?;
        let len = self
            .sample_count()?
            .checked_mul(self.format.bytes_per_sample())?;
        data.get(..len)
    }

    pub fn is_admissible(&self) -> bool {
        self.payload().is_some()
    }
}

/// Independent copy of a frame, exclusively owned by one worker task
pub struct OwnedFrame {
    pub data: Bytes,
    pub meta: FrameMetadata,

    /// Admission timestamp for latency tracking
    pub timestamp: Instant,
}

#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub format: SampleFormat,
}

impl OwnedFrame {
    /// Copies the payload out of a caller-owned buffer.
    ///
    /// Returns `None` for inadmissible descriptors.
    pub fn copy_from(descriptor: &FrameDescriptor<'_>, sequence: u64) -> Option<Self> {
        let payload = descriptor.payload()?;
        Some(Self::from_payload(payload, descriptor, sequence))
    }

    /// Copies an already validated payload, as returned by
    /// [`FrameDescriptor::payload`].
    pub fn from_payload(payload: &[u8], descriptor: &FrameDescriptor<'_>, sequence: u64) -> Self {
        Self {
            data: Bytes::copy_from_slice(payload),
            meta: FrameMetadata {
                sequence,
                width: descriptor.width,
                height: descriptor.height,
                format: descriptor.format,
            },
            timestamp: Instant::now(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.meta.width as usize * self.meta.height as usize
    }
}

impl std::fmt::Debug for OwnedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedFrame")
            .field("len", &self.data.len())
            .field("meta", &self.meta)
            .finish()
    }
}
