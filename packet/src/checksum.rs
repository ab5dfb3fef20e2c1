//! One's-complement checksum over everything between the header and the checksum byte.

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Checksum {
    sum: u8,
}

impl Checksum {
    #[inline(always)]
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    #[inline(always)]
    pub const fn push(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte);
    }

    #[inline]
    pub const fn extend(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            self.push(bytes[i]);
            i += 1;
        }
    }

    #[inline(always)]
    pub const fn collapse(self) -> u8 {
        !self.sum
    }
}

/// `bytes` must start at the ID and end at the last parameter.
#[inline]
pub const fn checksum(bytes: &[u8]) -> u8 {
    let mut state = Checksum::new();
    state.extend(bytes);
    state.collapse()
}

#[cfg(test)]
mod test {
    use {super::*, quickcheck::TestResult, quickcheck_macros::quickcheck};

    #[quickcheck]
    fn matches_inverted_sum(bytes: Vec<u8>) -> TestResult {
        let sum: u64 = bytes.iter().map(|&b| u64::from(b)).sum();
        let expected = (!sum & 0xFF) as u8;
        let actual = checksum(&bytes);
        if actual == expected {
            TestResult::passed()
        } else {
            TestResult::error(format!(
                "{bytes:02X?}: expected `x{expected:02X}` but got `x{actual:02X}`"
            ))
        }
    }

    #[quickcheck]
    fn stable_under_recomputation(bytes: Vec<u8>) -> bool {
        checksum(&bytes) == checksum(&bytes)
    }

    #[quickcheck]
    fn streaming_matches_slice(bytes: Vec<u8>, split: usize) -> bool {
        let split = if bytes.is_empty() { 0 } else { split % bytes.len() };
        let mut state = Checksum::new();
        state.extend(&bytes[..split]);
        for &byte in &bytes[split..] {
            state.push(byte);
        }
        state.collapse() == checksum(&bytes)
    }

    #[test]
    fn covers_id_through_last_parameter() {
        // Ping reply from ID 1: FF FF | 01 02 00 | FC
        assert_eq!(checksum(&[0x01, 0x02, 0x00]), 0xFC);
        // Header bytes would change the result if they were included.
        assert_ne!(checksum(&[0xFF, 0xFF, 0x01, 0x02, 0x00]), 0xFC);
    }
}
