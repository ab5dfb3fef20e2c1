use {
    crate::{
        checksum::checksum,
        constants::{HEADER, MIN_STATUS_BYTES},
    },
    core::fmt,
};

/// Error byte reported by the servo in every status packet.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fault(pub u8);

impl Fault {
    pub const NONE: Self = Self(0);

    pub const VOLTAGE: u8 = 0x01;
    pub const ANGLE: u8 = 0x02;
    pub const OVERHEAT: u8 = 0x04;
    pub const OVERCURRENT: u8 = 0x08;
    pub const OVERLOAD: u8 = 0x20;

    const NAMED: [(u8, &'static str); 5] = [
        (Self::VOLTAGE, "input voltage"),
        (Self::ANGLE, "angle sensor"),
        (Self::OVERHEAT, "overheat"),
        (Self::OVERCURRENT, "overcurrent"),
        (Self::OVERLOAD, "overload"),
    ];

    #[inline(always)]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn is_clear(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

impl fmt::Display for Fault {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clear() {
            return f.write_str("no fault");
        }
        let mut remaining = self.0;
        let mut first = true;
        for (bit, name) in Self::NAMED {
            if remaining & bit != 0 {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                remaining &= !bit;
                first = false;
            }
        }
        if remaining != 0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "unknown bits `x{remaining:02X}`")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mismatch8 {
    pub expected: u8,
    pub actual: u8,
}

impl fmt::Display for Mismatch8 {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { expected, actual } = *self;
        write!(f, "Expected `x{expected:02X}` but received `x{actual:02X}`")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Truncated {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for Truncated {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { expected, actual } = *self;
        write!(f, "Expected {expected} bytes but received only {actual}")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Framing {
    WrongFirstHeaderByte(Mismatch8),
    WrongSecondHeaderByte(Mismatch8),
    /// The length byte must at least cover the instruction/error byte and the checksum.
    WrongLength { length: u8 },
    TrailingBytes { expected: usize, actual: usize },
    WrongId(Mismatch8),
    WrongParameterCount { expected: usize, actual: usize },
}

impl fmt::Display for Framing {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::WrongFirstHeaderByte(ref e) => write!(f, "Wrong first header byte: {e}"),
            Self::WrongSecondHeaderByte(ref e) => write!(f, "Wrong second header byte: {e}"),
            Self::WrongLength { length } => write!(f, "Length byte {length} is too small"),
            Self::TrailingBytes { expected, actual } => write!(
                f,
                "Packet should be {expected} bytes long but {actual} were received"
            ),
            Self::WrongId(ref e) => write!(f, "Reply from the wrong servo: {e}"),
            Self::WrongParameterCount { expected, actual } => write!(
                f,
                "Expected {expected} parameter bytes but the reply carried {actual}"
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Truncated(Truncated),
    Framing(Framing),
    Checksum(Mismatch8),
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Truncated(ref e) => write!(f, "Truncated packet: {e}"),
            Self::Framing(ref e) => write!(f, "Malformed packet: {e}"),
            Self::Checksum(ref e) => write!(f, "Checksum mismatch: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<Framing> for Error {
    #[inline(always)]
    fn from(e: Framing) -> Self {
        Self::Framing(e)
    }
}

/// Structurally valid packet of either direction.
///
/// `byte` is the instruction in an instruction packet and the error byte in a status packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct View<'raw> {
    pub id: u8,
    pub byte: u8,
    pub parameters: &'raw [u8],
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status<'raw> {
    pub id: u8,
    pub fault: Fault,
    pub parameters: &'raw [u8],
}

impl Status<'_> {
    #[inline]
    pub const fn expect_id(&self, id: u8) -> Result<(), Framing> {
        if self.id == id {
            Ok(())
        } else {
            Err(Framing::WrongId(Mismatch8 {
                expected: id,
                actual: self.id,
            }))
        }
    }
}

#[inline]
pub fn view(raw: &[u8]) -> Result<View<'_>, Error> {
    if raw.len() < MIN_STATUS_BYTES {
        return Err(Error::Truncated(Truncated {
            expected: MIN_STATUS_BYTES,
            actual: raw.len(),
        }));
    }
    if raw[0] != HEADER[0] {
        return Err(Error::Framing(Framing::WrongFirstHeaderByte(Mismatch8 {
            expected: HEADER[0],
            actual: raw[0],
        })));
    }
    if raw[1] != HEADER[1] {
        return Err(Error::Framing(Framing::WrongSecondHeaderByte(Mismatch8 {
            expected: HEADER[1],
            actual: raw[1],
        })));
    }
    let length = raw[3];
    if length < 2 {
        return Err(Error::Framing(Framing::WrongLength { length }));
    }
    let expected = length as usize + 4;
    if raw.len() < expected {
        return Err(Error::Truncated(Truncated {
            expected,
            actual: raw.len(),
        }));
    }
    if raw.len() > expected {
        return Err(Error::Framing(Framing::TrailingBytes {
            expected,
            actual: raw.len(),
        }));
    }
    let (body, &[actual]) = raw[2..].split_at(expected - 3) else {
        unreachable!("split leaves exactly the checksum byte")
    };
    let computed = checksum(body);
    if computed != actual {
        return Err(Error::Checksum(Mismatch8 {
            expected: computed,
            actual,
        }));
    }
    Ok(View {
        id: body[0],
        byte: body[2],
        parameters: &body[3..],
    })
}

#[inline]
pub fn parse(raw: &[u8]) -> Result<Status<'_>, Error> {
    let View {
        id,
        byte,
        parameters,
    } = view(raw)?;
    Ok(Status {
        id,
        fault: Fault(byte),
        parameters,
    })
}
