use core::fmt;

pub const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Reserved for broadcast; never accepted as a servo ID here.
pub const BROADCAST_ID: u8 = 0xFE;
pub const MAX_ID: u8 = 253;

/// The length byte counts the instruction and checksum too, so it caps the parameters.
pub const MAX_PARAMETERS: usize = u8::MAX as usize - 2;

/// Header, ID, length, then `length` more bytes.
pub const MAX_FRAME_BYTES: usize = 4 + u8::MAX as usize;

/// Header, ID, length, error byte, checksum: the shortest well-formed status packet.
pub const MIN_STATUS_BYTES: usize = 6;

pub const INSTRUCTION_PING: u8 = 0x01;
pub const INSTRUCTION_READ: u8 = 0x02;
pub const INSTRUCTION_WRITE: u8 = 0x03;

/// A unicast servo ID (0 through 253).
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Id(u8);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidId {
    pub id: u8,
}

impl fmt::Display for InvalidId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid servo ID {} (must be between 0 and {MAX_ID})",
            self.id
        )
    }
}

impl core::error::Error for InvalidId {}

impl Id {
    #[inline]
    pub const fn new(id: u8) -> Result<Self, InvalidId> {
        if id > MAX_ID {
            return Err(InvalidId { id });
        }
        Ok(Self(id))
    }

    #[inline(always)]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Id {
    type Error = InvalidId;

    #[inline(always)]
    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<Id> for u8 {
    #[inline(always)]
    fn from(id: Id) -> Self {
        id.0
    }
}

impl fmt::Display for Id {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod test {
    use {super::*, quickcheck::TestResult, quickcheck_macros::quickcheck};

    #[quickcheck]
    fn id_accepts_exactly_unicast(raw: u8) -> TestResult {
        match Id::new(raw) {
            Ok(id) if raw <= MAX_ID && id.get() == raw => TestResult::passed(),
            Err(InvalidId { id }) if raw > MAX_ID && id == raw => TestResult::passed(),
            other => TestResult::error(format!("{raw} -> {other:?}")),
        }
    }

    #[test]
    fn broadcast_is_rejected() {
        assert_eq!(
            Id::new(BROADCAST_ID),
            Err(InvalidId { id: BROADCAST_ID })
        );
    }
}
