use {
    crate::{
        constants::{INSTRUCTION_PING, INSTRUCTION_READ, INSTRUCTION_WRITE},
        control_table::{Block, Register, Width},
    },
    core::fmt,
};

/// Data carried by a write, little-endian on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value<'block> {
    Byte(u8),
    Word(u16),
    Block(&'block [u8]),
}

impl Value<'_> {
    #[inline]
    pub const fn len(&self) -> usize {
        match *self {
            Self::Byte(_) => 1,
            Self::Word(_) => 2,
            Self::Block(bytes) => bytes.len(),
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn extend_into<const N: usize>(
        &self,
        buffer: &mut heapless::Vec<u8, N>,
    ) -> Result<(), ()> {
        match *self {
            Self::Byte(byte) => buffer.push(byte).map_err(|_| ()),
            Self::Word(word) => buffer.extend_from_slice(&word.to_le_bytes()),
            Self::Block(bytes) => buffer.extend_from_slice(bytes),
        }
    }
}

/// Value does not fit the width of the register it targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overflow {
    pub value: u16,
    pub width: Width,
}

impl fmt::Display for Overflow {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Value {} does not fit in {} byte(s)",
            self.value,
            self.width.bytes()
        )
    }
}

impl core::error::Error for Overflow {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction<'block> {
    Ping,
    Read { address: u8, length: u8 },
    Write { address: u8, value: Value<'block> },
}

impl<'block> Instruction<'block> {
    #[inline]
    pub const fn read(register: Register) -> Self {
        Self::Read {
            address: register.address,
            length: register.width as u8,
        }
    }

    #[inline]
    pub const fn read_block(block: Block) -> Self {
        Self::Read {
            address: block.address,
            length: block.length,
        }
    }

    #[inline]
    pub const fn write(register: Register, value: u16) -> Result<Self, Overflow> {
        let value = match register.width {
            Width::Byte => {
                if value > u8::MAX as u16 {
                    return Err(Overflow {
                        value,
                        width: register.width,
                    });
                }
                Value::Byte(value as u8)
            }
            Width::Word => Value::Word(value),
        };
        Ok(Self::Write {
            address: register.address,
            value,
        })
    }

    #[inline]
    pub const fn write_block(address: u8, bytes: &'block [u8]) -> Self {
        Self::Write {
            address,
            value: Value::Block(bytes),
        }
    }

    #[inline]
    pub const fn byte(&self) -> u8 {
        match *self {
            Self::Ping => INSTRUCTION_PING,
            Self::Read { .. } => INSTRUCTION_READ,
            Self::Write { .. } => INSTRUCTION_WRITE,
        }
    }

    #[inline]
    pub const fn parameter_count(&self) -> usize {
        match *self {
            Self::Ping => 0,
            Self::Read { .. } => 2,
            Self::Write { ref value, .. } => 1 + value.len(),
        }
    }

    /// Parameter bytes a successful status packet carries in reply.
    #[inline]
    pub const fn reply_parameters(&self) -> Option<usize> {
        match *self {
            // Firmware differs: some send the model number, some nothing.
            Self::Ping => None,
            Self::Read { length, .. } => Some(length as usize),
            Self::Write { .. } => Some(0),
        }
    }

    #[inline]
    pub(crate) fn extend_into<const N: usize>(
        &self,
        buffer: &mut heapless::Vec<u8, N>,
    ) -> Result<(), ()> {
        match *self {
            Self::Ping => Ok(()),
            Self::Read { address, length } => buffer.extend_from_slice(&[address, length]),
            Self::Write { address, ref value } => {
                buffer.push(address).map_err(|_| ())?;
                value.extend_into(buffer)
            }
        }
    }
}
