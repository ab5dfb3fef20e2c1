pub mod recv;
pub mod send;

pub use {
    recv::{parse, view},
    send::Frame,
};

use crate::{
    checksum::Checksum,
    constants::{HEADER, Id, MAX_PARAMETERS},
    instruction::Instruction,
};

#[inline]
pub fn new(id: Id, instruction: &Instruction<'_>) -> Result<Frame, send::TooManyParameters> {
    let count = instruction.parameter_count();
    if count > MAX_PARAMETERS {
        return Err(send::TooManyParameters { count });
    }
    let overflow = |()| send::TooManyParameters { count };
    let mut bytes = send::Buffer::new();
    bytes.extend_from_slice(&HEADER).map_err(overflow)?;
    bytes
        .extend_from_slice(&[id.get(), count as u8 + 2, instruction.byte()])
        .map_err(overflow)?;
    instruction.extend_into(&mut bytes).map_err(overflow)?;
    let crc = {
        let mut crc = Checksum::new();
        crc.extend(&bytes[HEADER.len()..]);
        crc.collapse()
    };
    bytes.push(crc).map_err(|_| send::TooManyParameters { count })?;
    log::trace!("Built packet {:02X?}", &bytes[..]);
    Ok(Frame { bytes })
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{
            checksum::checksum,
            control_table::{GoalPosition, Item, PresentPosition},
            instruction::Value,
        },
        quickcheck::TestResult,
        quickcheck_macros::quickcheck,
        recv::{Error, Fault, Framing, Mismatch8, Status, Truncated},
    };

    fn id(raw: u8) -> Id {
        Id::new(raw % 254).unwrap()
    }

    /// Status packet as the servo would send it, checksum included.
    fn status(id: u8, error: u8, parameters: &[u8]) -> Vec<u8> {
        let mut raw = vec![0xFF, 0xFF, id, parameters.len() as u8 + 2, error];
        raw.extend_from_slice(parameters);
        raw.push(checksum(&raw[2..]));
        raw
    }

    #[test]
    fn goal_position_and_speed_bytes() {
        let value = [0x00, 0x08, 0xF4, 0x01];
        let frame = new(
            Id::new(1).unwrap(),
            &Instruction::write_block(GoalPosition::ADDRESS, &value),
        )
        .unwrap();
        assert_eq!(
            frame.as_buffer(),
            &[0xFF, 0xFF, 0x01, 0x07, 0x03, 0x2A, 0x00, 0x08, 0xF4, 0x01, 0xCD],
        );
        assert_eq!(frame.checksum(), checksum(&frame[2..frame.len() - 1]));
    }

    #[test]
    fn ping_frame() {
        let frame = new(Id::new(1).unwrap(), &Instruction::Ping).unwrap();
        assert_eq!(frame.as_buffer(), &[0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
    }

    #[test]
    fn read_frame() {
        let frame = new(
            Id::new(3).unwrap(),
            &Instruction::read(PresentPosition::REGISTER),
        )
        .unwrap();
        assert_eq!(
            frame.as_buffer(),
            &[0xFF, 0xFF, 0x03, 0x04, 0x02, 0x38, 0x02, 0xBC],
        );
    }

    #[test]
    fn too_many_parameters_rejected() {
        let block = [0; MAX_PARAMETERS];
        // Address byte plus a full block overflows by one.
        assert_eq!(
            new(Id::new(1).unwrap(), &Instruction::write_block(0, &block)),
            Err(send::TooManyParameters {
                count: MAX_PARAMETERS + 1
            }),
        );
        let frame = new(
            Id::new(1).unwrap(),
            &Instruction::write_block(0, &block[1..]),
        )
        .unwrap();
        assert_eq!(frame.length(), u8::MAX);
    }

    #[test]
    fn ping_reply_without_model_number() {
        let raw = [0xFF, 0xFF, 0x01, 0x02, 0x00, 0xFC];
        assert_eq!(
            parse(&raw),
            Ok(Status {
                id: 1,
                fault: Fault::NONE,
                parameters: &[],
            }),
        );
    }

    #[test]
    fn fault_is_structurally_valid() {
        let raw = status(4, Fault::OVERLOAD, &[0x10, 0x00]);
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.fault, Fault(Fault::OVERLOAD));
        assert_eq!(parsed.parameters, &[0x10, 0x00]);
    }

    #[test]
    fn header_checked() {
        let mut raw = status(1, 0, &[]);
        raw[1] = 0xFD;
        assert_eq!(
            parse(&raw),
            Err(Error::Framing(Framing::WrongSecondHeaderByte(Mismatch8 {
                expected: 0xFF,
                actual: 0xFD,
            }))),
        );
    }

    #[test]
    fn length_checked() {
        let raw = status(1, 0, &[1, 2, 3]);
        assert_eq!(
            parse(&raw[..raw.len() - 1]),
            Err(Error::Truncated(Truncated {
                expected: raw.len(),
                actual: raw.len() - 1,
            })),
        );
        let mut long = raw.clone();
        long.push(0);
        assert_eq!(
            parse(&long),
            Err(Error::Framing(Framing::TrailingBytes {
                expected: raw.len(),
                actual: raw.len() + 1,
            })),
        );
        let mut short_length = status(1, 0, &[]);
        short_length[3] = 1;
        assert_eq!(
            parse(&short_length),
            Err(Error::Framing(Framing::WrongLength { length: 1 })),
        );
    }

    #[quickcheck]
    fn short_buffers_are_truncated(raw: Vec<u8>) -> TestResult {
        let raw = &raw[..raw.len().min(5)];
        match parse(raw) {
            Err(Error::Truncated(Truncated { expected: 6, actual })) if actual == raw.len() => {
                TestResult::passed()
            }
            other => TestResult::error(format!("{raw:02X?} -> {other:?}")),
        }
    }

    #[quickcheck]
    fn acknowledgment_roundtrip(raw_id: u8, address: u8, value: Vec<u8>) -> TestResult {
        let id = id(raw_id);
        let value = &value[..value.len().min(MAX_PARAMETERS - 1)];
        let frame = match new(id, &Instruction::write_block(address, value)) {
            Ok(ok) => ok,
            Err(e) => return TestResult::error(format!("{e}")),
        };
        // The instruction packet itself is structurally valid:
        let request = match view(&frame) {
            Ok(ok) => ok,
            Err(e) => return TestResult::error(format!("{frame:02X?}: {e}")),
        };
        if request.id != id.get() || request.parameters.len() != value.len() + 1 {
            return TestResult::error(format!("{frame:02X?} -> {request:02X?}"));
        }
        // And so is the acknowledgment a loopback device would answer with:
        let ack = status(request.id, 0, &[]);
        match parse(&ack) {
            Ok(Status {
                id: echoed,
                fault: Fault::NONE,
                parameters: &[],
            }) if echoed == id.get() => TestResult::passed(),
            other => TestResult::error(format!("{ack:02X?} -> {other:?}")),
        }
    }

    #[quickcheck]
    fn flipped_bit_fails_checksum(
        raw_id: u8,
        error: u8,
        parameters: Vec<u8>,
        index: usize,
        bit: u8,
    ) -> TestResult {
        let parameters = &parameters[..parameters.len().min(32)];
        let mut raw = status(raw_id % 254, error, parameters);
        // ID, error byte, and parameters (the length byte is covered separately):
        let candidates: Vec<usize> = (2..raw.len() - 1).filter(|&i| i != 3).collect();
        let i = candidates[index % candidates.len()];
        raw[i] ^= 1 << (bit % 8);
        match parse(&raw) {
            Err(Error::Checksum(_)) => TestResult::passed(),
            other => TestResult::error(format!("flipped byte {i}: {raw:02X?} -> {other:?}")),
        }
    }

    #[quickcheck]
    fn flipped_length_bit_rejected(parameters: Vec<u8>, bit: u8) -> TestResult {
        let parameters = &parameters[..parameters.len().min(32)];
        let mut raw = status(1, 0, parameters);
        raw[3] ^= 1 << (bit % 8);
        match parse(&raw) {
            Err(_) => TestResult::passed(),
            Ok(ok) => TestResult::error(format!("{raw:02X?} accepted as {ok:?}")),
        }
    }

    #[test]
    fn word_value_frames_like_block() {
        let word = new(
            Id::new(9).unwrap(),
            &Instruction::Write {
                address: GoalPosition::ADDRESS,
                value: Value::Word(0x0800),
            },
        )
        .unwrap();
        let block = new(
            Id::new(9).unwrap(),
            &Instruction::write_block(GoalPosition::ADDRESS, &[0x00, 0x08]),
        )
        .unwrap();
        assert_eq!(word, block);
    }
}
