use {
    crate::constants::{MAX_FRAME_BYTES, MAX_PARAMETERS},
    core::{fmt, ops::Deref},
};

pub type Buffer = heapless::Vec<u8, MAX_FRAME_BYTES>;

/// A complete instruction packet, header through checksum.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub(crate) bytes: Buffer,
}

impl Frame {
    #[inline(always)]
    pub fn as_buffer(&self) -> &[u8] {
        &self.bytes
    }

    #[inline(always)]
    pub fn id(&self) -> u8 {
        self.bytes[2]
    }

    #[inline(always)]
    pub fn length(&self) -> u8 {
        self.bytes[3]
    }

    #[inline(always)]
    pub fn instruction(&self) -> u8 {
        self.bytes[4]
    }

    #[inline(always)]
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }
}

impl Deref for Frame {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        self.as_buffer()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TooManyParameters {
    pub count: usize,
}

impl fmt::Display for TooManyParameters {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parameter bytes would overflow the length field (at most {MAX_PARAMETERS})",
            self.count
        )
    }
}

impl core::error::Error for TooManyParameters {}
