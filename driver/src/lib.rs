#![cfg_attr(not(test), no_std)]

pub mod actuator;
pub mod bus;
pub mod comm;
pub mod link;
pub mod mutex;

#[cfg(test)]
mod sim;

use {
    core::fmt,
    sts_packet::{
        Fault, instruction::Overflow, packet::send::TooManyParameters, recv,
    },
};

pub use {
    actuator::Servo,
    bus::{Bus, Stage},
    link::{Acquire, Configuration, Link, Polled},
};

/// A structurally valid reply whose error byte was nonzero.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Faulted<Output> {
    pub id: u8,
    pub flags: Fault,
    /// Whatever the reply carried, if it decoded.
    pub output: Option<Output>,
}

impl<X> Faulted<X> {
    #[inline]
    pub fn map<Y, F: FnOnce(X) -> Y>(self, f: F) -> Faulted<Y> {
        Faulted {
            id: self.id,
            flags: self.flags,
            output: self.output.map(f),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvalidParameter {
    Value(Overflow),
    Speed { speed: i32 },
    TooManyParameters(TooManyParameters),
}

impl fmt::Display for InvalidParameter {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Value(ref e) => fmt::Display::fmt(e, f),
            Self::Speed { speed } => write!(f, "Speed {speed} does not fit in 15 bits"),
            Self::TooManyParameters(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error<E, Output = ()> {
    /// The transport itself failed.
    Io(E),
    NoResponse {
        id: u8,
    },
    /// A reply arrived but could not be trusted; the command may or may not have taken effect.
    Protocol(recv::Error),
    Fault(Faulted<Output>),
    OutOfRange(recv::OutOfRange),
    InvalidParameter(InvalidParameter),
    Verification {
        expected: u16,
        actual: u16,
    },
    Closed,
}

impl<E, X> Error<E, X> {
    #[inline]
    pub fn map<Y, F: FnOnce(X) -> Y>(self, f: F) -> Error<E, Y> {
        match self {
            Self::Io(e) => Error::Io(e),
            Self::NoResponse { id } => Error::NoResponse { id },
            Self::Protocol(e) => Error::Protocol(e),
            Self::Fault(e) => Error::Fault(e.map(f)),
            Self::OutOfRange(e) => Error::OutOfRange(e),
            Self::InvalidParameter(e) => Error::InvalidParameter(e),
            Self::Verification { expected, actual } => Error::Verification { expected, actual },
            Self::Closed => Error::Closed,
        }
    }

    /// Drops whatever a faulted reply carried.
    #[inline(always)]
    pub fn forget(self) -> Error<E> {
        self.map(|_| ())
    }
}

impl<E, Output> From<recv::Error> for Error<E, Output> {
    #[inline(always)]
    fn from(e: recv::Error) -> Self {
        Self::Protocol(e)
    }
}

impl<E, Output> From<InvalidParameter> for Error<E, Output> {
    #[inline(always)]
    fn from(e: InvalidParameter) -> Self {
        Self::InvalidParameter(e)
    }
}

impl<E, Output> From<recv::OutOfRange> for Error<E, Output> {
    #[inline(always)]
    fn from(e: recv::OutOfRange) -> Self {
        Self::OutOfRange(e)
    }
}

impl<E: fmt::Display, Output> fmt::Display for Error<E, Output> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Io(ref e) => write!(f, "Serial bus error: {e}"),
            Self::NoResponse { id } => write!(f, "No response from servo {id}"),
            Self::Protocol(ref e) => write!(f, "Unusable reply: {e}"),
            Self::Fault(Faulted { id, flags, .. }) => {
                write!(f, "Servo {id} reported a fault: {flags}")
            }
            Self::OutOfRange(ref e) => write!(f, "Out of range: {e}"),
            Self::InvalidParameter(ref e) => write!(f, "Invalid parameter: {e}"),
            Self::Verification { expected, actual } => write!(
                f,
                "Read back {actual} after writing {expected}"
            ),
            Self::Closed => f.write_str("The serial link has been shut down"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display, Output: fmt::Debug> core::error::Error for Error<E, Output> {}

#[cfg(test)]
mod test {
    use {super::*, sts_packet::control_table::Width};

    #[test]
    fn invalid_parameters_explain_themselves() {
        let error: Error<&str> = InvalidParameter::Speed { speed: 40_000 }.into();
        assert_eq!(
            error.to_string(),
            "Invalid parameter: Speed 40000 does not fit in 15 bits"
        );
        let overflow = InvalidParameter::Value(Overflow {
            value: 300,
            width: Width::Byte,
        });
        assert!(overflow.to_string().contains("300"), "{overflow}");
    }
}
