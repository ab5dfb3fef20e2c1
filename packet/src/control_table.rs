//! Control table of the STS series (STS3215 and relatives).

use core::fmt;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    Byte = 1,
    Word = 2,
}

impl Width {
    #[inline(always)]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn max_value(self) -> u16 {
        match self {
            Self::Byte => u8::MAX as u16,
            Self::Word => u16::MAX,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Register {
    pub address: u8,
    pub width: Width,
    /// Writes only stick while the lock register reads zero.
    pub eeprom: bool,
    pub description: &'static str,
}

impl fmt::Display for Register {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (address {}, {} byte{})",
            self.description,
            self.address,
            self.width.bytes(),
            if self.width.bytes() == 1 { "" } else { "s" },
        )
    }
}

pub trait Item {
    const ADDRESS: u8;
    const WIDTH: Width;
    const EEPROM: bool = false;
    const DESCRIPTION: &'static str;

    const REGISTER: Register = Register {
        address: Self::ADDRESS,
        width: Self::WIDTH,
        eeprom: Self::EEPROM,
        description: Self::DESCRIPTION,
    };
}

pub struct ModelNumber;
impl Item for ModelNumber {
    const ADDRESS: u8 = 3;
    const WIDTH: Width = Width::Word;
    const DESCRIPTION: &'static str = "Model Number";
}

pub struct Id;
impl Item for Id {
    const ADDRESS: u8 = 5;
    const WIDTH: Width = Width::Byte;
    const EEPROM: bool = true;
    const DESCRIPTION: &'static str = "ID";
}

pub struct BaudRate;
impl Item for BaudRate {
    const ADDRESS: u8 = 6;
    const WIDTH: Width = Width::Byte;
    const EEPROM: bool = true;
    const DESCRIPTION: &'static str = "Baud Rate";
}

pub struct MinAngleLimit;
impl Item for MinAngleLimit {
    const ADDRESS: u8 = 9;
    const WIDTH: Width = Width::Word;
    const EEPROM: bool = true;
    const DESCRIPTION: &'static str = "Min Angle Limit";
}

pub struct MaxAngleLimit;
impl Item for MaxAngleLimit {
    const ADDRESS: u8 = 11;
    const WIDTH: Width = Width::Word;
    const EEPROM: bool = true;
    const DESCRIPTION: &'static str = "Max Angle Limit";
}

pub struct Mode;
impl Item for Mode {
    const ADDRESS: u8 = 33;
    const WIDTH: Width = Width::Byte;
    const EEPROM: bool = true;
    const DESCRIPTION: &'static str = "Operating Mode";
}

pub struct TorqueEnable;
impl Item for TorqueEnable {
    const ADDRESS: u8 = 40;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "Torque Enable";
}

pub struct Acceleration;
impl Item for Acceleration {
    const ADDRESS: u8 = 41;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "Acceleration";
}

pub struct GoalPosition;
impl Item for GoalPosition {
    const ADDRESS: u8 = 0x2A;
    const WIDTH: Width = Width::Word;
    const DESCRIPTION: &'static str = "Goal Position";
}

pub struct GoalTime;
impl Item for GoalTime {
    const ADDRESS: u8 = 44;
    const WIDTH: Width = Width::Word;
    const DESCRIPTION: &'static str = "Goal Time";
}

pub struct GoalSpeed;
impl Item for GoalSpeed {
    const ADDRESS: u8 = 46;
    const WIDTH: Width = Width::Word;
    const DESCRIPTION: &'static str = "Goal Speed";
}

pub struct PidP;
impl Item for PidP {
    const ADDRESS: u8 = 0x30;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "PID Proportional Gain";
}

pub struct PidI;
impl Item for PidI {
    const ADDRESS: u8 = 0x31;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "PID Integral Gain";
}

pub struct PidD;
impl Item for PidD {
    const ADDRESS: u8 = 0x32;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "PID Derivative Gain";
}

pub struct Lock;
impl Item for Lock {
    const ADDRESS: u8 = 55;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "EEPROM Lock";
}

pub struct PresentPosition;
impl Item for PresentPosition {
    const ADDRESS: u8 = 56;
    const WIDTH: Width = Width::Word;
    const DESCRIPTION: &'static str = "Present Position";
}

pub struct PresentSpeed;
impl Item for PresentSpeed {
    const ADDRESS: u8 = 58;
    const WIDTH: Width = Width::Word;
    const DESCRIPTION: &'static str = "Present Speed";
}

pub struct PresentLoad;
impl Item for PresentLoad {
    const ADDRESS: u8 = 60;
    const WIDTH: Width = Width::Word;
    const DESCRIPTION: &'static str = "Present Load";
}

pub struct PresentVoltage;
impl Item for PresentVoltage {
    const ADDRESS: u8 = 62;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "Present Voltage";
}

pub struct PresentTemperature;
impl Item for PresentTemperature {
    const ADDRESS: u8 = 63;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "Present Temperature";
}

pub struct Status;
impl Item for Status {
    const ADDRESS: u8 = 65;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "Status";
}

pub struct Moving;
impl Item for Moving {
    const ADDRESS: u8 = 66;
    const WIDTH: Width = Width::Byte;
    const DESCRIPTION: &'static str = "Moving";
}

/// A run of consecutive registers written or read in one instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Block {
    pub address: u8,
    pub length: u8,
}

/// Acceleration, goal position, goal time, goal speed.
pub const GOAL_BLOCK: Block = Block {
    address: Acceleration::ADDRESS,
    length: 7,
};

/// Present position, present speed.
pub const PRESENT_BLOCK: Block = Block {
    address: PresentPosition::ADDRESS,
    length: 4,
};

/// Min angle limit, max angle limit.
pub const LIMITS_BLOCK: Block = Block {
    address: MinAngleLimit::ADDRESS,
    length: 4,
};

/// P, I, D gains, one byte each.
pub const PID_BLOCK: Block = Block {
    address: PidP::ADDRESS,
    length: 3,
};

/// Values of the operating-mode register.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(test, derive(strum_macros::VariantArray))]
pub enum OperatingMode {
    Position = 0,
    Wheel = 1,
    Pwm = 2,
    Step = 3,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidMode {
    pub byte: u8,
}

impl fmt::Display for InvalidMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid operating mode: `x{:02X}`", self.byte)
    }
}

impl core::error::Error for InvalidMode {}

impl TryFrom<u8> for OperatingMode {
    type Error = InvalidMode;

    #[inline]
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Position),
            1 => Ok(Self::Wheel),
            2 => Ok(Self::Pwm),
            3 => Ok(Self::Step),
            byte => Err(InvalidMode { byte }),
        }
    }
}

impl fmt::Display for OperatingMode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::Position => "position",
            Self::Wheel => "wheel",
            Self::Pwm => "PWM",
            Self::Step => "step",
        })
    }
}
