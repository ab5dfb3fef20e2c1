//! Typed payloads of status packets.

use {
    crate::{
        packet::recv::{Fault, Framing, Status},
        sign_magnitude::{WORD_MAGNITUDE_MAX, to_host, to_wire},
    },
    core::fmt,
};

pub use crate::packet::recv::Error;

/// Decodes the parameter bytes of a structurally valid status packet.
pub trait Receive: Sized {
    fn receive(status: &Status<'_>) -> Result<Self, Framing>;
}

#[inline]
fn exactly<const N: usize>(parameters: &[u8]) -> Result<[u8; N], Framing> {
    parameters
        .try_into()
        .map_err(|_| Framing::WrongParameterCount {
            expected: N,
            actual: parameters.len(),
        })
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// The servo answered with an empty status packet.
    Received,
    /// The servo stayed silent; the write may or may not have landed.
    Missing,
}

impl Receive for Ack {
    #[inline]
    fn receive(status: &Status<'_>) -> Result<Self, Framing> {
        exactly::<0>(status.parameters)?;
        Ok(Self::Received)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ping {
    /// Only some firmware revisions include it.
    pub model_number: Option<u16>,
}

impl Receive for Ping {
    #[inline]
    fn receive(status: &Status<'_>) -> Result<Self, Framing> {
        match *status.parameters {
            [] => Ok(Self { model_number: None }),
            [lo, hi] => Ok(Self {
                model_number: Some(u16::from_le_bytes([lo, hi])),
            }),
            ref other => Err(Framing::WrongParameterCount {
                expected: 2,
                actual: other.len(),
            }),
        }
    }
}

impl Receive for u8 {
    #[inline]
    fn receive(status: &Status<'_>) -> Result<Self, Framing> {
        let [byte] = exactly::<1>(status.parameters)?;
        Ok(byte)
    }
}

impl Receive for u16 {
    #[inline]
    fn receive(status: &Status<'_>) -> Result<Self, Framing> {
        exactly::<2>(status.parameters).map(u16::from_le_bytes)
    }
}

/// Present position and speed, signed offsets from the servo's zero point.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoReading {
    pub position: i32,
    pub speed: i32,
    pub error_flags: Fault,
}

impl Receive for ServoReading {
    #[inline]
    fn receive(status: &Status<'_>) -> Result<Self, Framing> {
        let [p_lo, p_hi, s_lo, s_hi] = exactly::<4>(status.parameters)?;
        Ok(Self {
            position: to_host(u16::from_le_bytes([p_lo, p_hi])),
            speed: to_host(u16::from_le_bytes([s_lo, s_hi])),
            error_flags: status.fault,
        })
    }
}

impl fmt::Display for ServoReading {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position {}, speed {}", self.position, self.speed)?;
        if !self.error_flags.is_clear() {
            write!(f, " ({})", self.error_flags)?;
        }
        Ok(())
    }
}

/// Angle limits as configured in EEPROM. Both zero means multi-turn.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Limits {
    pub min: i32,
    pub max: i32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange {
    pub value: i32,
    pub min: i32,
    pub max: i32,
}

impl fmt::Display for OutOfRange {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { value, min, max } = *self;
        write!(f, "{value} is outside [{min}, {max}]")
    }
}

impl core::error::Error for OutOfRange {}

impl Limits {
    pub const MULTI_TURN: Self = Self { min: 0, max: 0 };

    #[inline(always)]
    pub const fn is_multi_turn(&self) -> bool {
        self.min == 0 && self.max == 0
    }

    /// Whether a goal position may be commanded under these limits.
    #[inline]
    pub const fn check(&self, goal: i32) -> Result<(), OutOfRange> {
        if self.is_multi_turn() || (self.min <= goal && goal <= self.max) {
            Ok(())
        } else {
            Err(OutOfRange {
                value: goal,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Raw register values, min first.
    #[inline]
    pub fn to_wire(&self) -> Result<[u16; 2], OutOfRange> {
        let encode = |value: i32| {
            to_wire(value).ok_or(OutOfRange {
                value,
                min: -i32::from(WORD_MAGNITUDE_MAX),
                max: i32::from(WORD_MAGNITUDE_MAX),
            })
        };
        Ok([encode(self.min)?, encode(self.max)?])
    }
}

impl Receive for Limits {
    #[inline]
    fn receive(status: &Status<'_>) -> Result<Self, Framing> {
        let [min_lo, min_hi, max_lo, max_hi] = exactly::<4>(status.parameters)?;
        Ok(Self {
            min: to_host(u16::from_le_bytes([min_lo, min_hi])),
            max: to_host(u16::from_le_bytes([max_lo, max_hi])),
        })
    }
}

impl fmt::Display for Limits {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_multi_turn() {
            f.write_str("multi-turn")
        } else {
            write!(f, "[{}, {}]", self.min, self.max)
        }
    }
}

/// Position-loop gains, one byte each.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pid {
    pub p: u8,
    pub i: u8,
    pub d: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidGain {
    pub name: &'static str,
    pub value: i64,
}

impl fmt::Display for InvalidGain {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} gain {} is outside 0 through 255",
            self.name, self.value
        )
    }
}

impl core::error::Error for InvalidGain {}

impl Pid {
    #[inline]
    pub fn new(p: i64, i: i64, d: i64) -> Result<Self, InvalidGain> {
        let gain = |name: &'static str, value: i64| {
            u8::try_from(value).map_err(|_| InvalidGain { name, value })
        };
        Ok(Self {
            p: gain("P", p)?,
            i: gain("I", i)?,
            d: gain("D", d)?,
        })
    }

    #[inline(always)]
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.p, self.i, self.d]
    }
}

impl Receive for Pid {
    #[inline]
    fn receive(status: &Status<'_>) -> Result<Self, Framing> {
        let [p, i, d] = exactly::<3>(status.parameters)?;
        Ok(Self { p, i, d })
    }
}

impl fmt::Display for Pid {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P {} I {} D {}", self.p, self.i, self.d)
    }
}
