#![cfg_attr(not(test), no_std)]

pub mod checksum;
pub mod constants;
pub mod control_table;
pub mod instruction;
pub mod packet;
pub mod recv;
pub mod sign_magnitude;

pub use {
    checksum::checksum,
    constants::Id,
    instruction::Instruction,
    packet::recv::{Fault, Status},
    recv::{Ack, Limits, Pid, Ping, Receive, ServoReading},
};
