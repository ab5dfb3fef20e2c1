//! Signed registers (position, speed, angle limits) carry a direction bit above a magnitude.

/// Direction bit of every signed word register on the STS series.
pub const WORD_SIGN_BIT: u8 = 15;

/// Largest magnitude representable below `WORD_SIGN_BIT`.
pub const WORD_MAGNITUDE_MAX: u16 = (1 << WORD_SIGN_BIT) - 1;

const SIGN: u16 = 1 << WORD_SIGN_BIT;

#[inline]
pub const fn to_host(raw: u16) -> i32 {
    let magnitude = (raw & WORD_MAGNITUDE_MAX) as i32;
    if raw & SIGN == 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// `None` if the magnitude needs the sign bit or anything above it.
#[inline]
pub const fn to_wire(value: i32) -> Option<u16> {
    let magnitude = value.unsigned_abs();
    if magnitude > WORD_MAGNITUDE_MAX as u32 {
        return None;
    }
    let direction = if value < 0 { SIGN } else { 0 };
    Some(magnitude as u16 | direction)
}
