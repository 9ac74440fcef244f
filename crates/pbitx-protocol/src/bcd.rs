//! BCD frequency encoding
//!
//! CI-V carries frequencies as packed BCD, least significant digit first.
//! Each byte holds two decimal digits: the low nibble is the less
//! significant one.
//!
//! ```text
//! 14.070.000 Hz -> 00 00 07 14 00
//! ```

use crate::error::ParseError;

/// Number of bytes in an encoded frequency (ten decimal digits)
pub const FREQUENCY_BYTES: usize = 5;

/// Decode a BCD frequency that runs until `terminator`
///
/// The slice may hold any number of digit pairs; decoding stops at the first
/// terminator byte. A slice without a terminator is a malformed frame and
/// must be dropped by the caller.
pub fn decode_frequency(bytes: &[u8], terminator: u8) -> Result<u32, ParseError> {
    let mut sum: u64 = 0;
    let mut multiplier: u64 = 1;

    for &byte in bytes {
        if byte == terminator {
            return u32::try_from(sum).map_err(|_| ParseError::FrequencyOverflow);
        }

        let low = u64::from(byte & 0x0F);
        let high = u64::from(byte >> 4);
        if low > 9 || high > 9 {
            return Err(ParseError::InvalidBcd(byte));
        }

        for digit in [low, high] {
            if digit != 0 {
                let term = digit
                    .checked_mul(multiplier)
                    .ok_or(ParseError::FrequencyOverflow)?;
                sum = sum
                    .checked_add(term)
                    .ok_or(ParseError::FrequencyOverflow)?;
            }
            multiplier = multiplier.saturating_mul(10);
        }

        if sum > u64::from(u32::MAX) {
            return Err(ParseError::FrequencyOverflow);
        }
    }

    Err(ParseError::MalformedFrame(format!(
        "no terminator 0x{:02X} in {} bytes",
        terminator,
        bytes.len()
    )))
}

/// Encode a frequency in Hz as five packed BCD bytes, little-endian
pub fn encode_frequency(hz: u32) -> [u8; FREQUENCY_BYTES] {
    let mut out = [0u8; FREQUENCY_BYTES];
    let mut remaining = hz;

    for byte in out.iter_mut() {
        let low = (remaining % 10) as u8;
        remaining /= 10;
        let high = (remaining % 10) as u8;
        remaining /= 10;
        *byte = (high << 4) | low;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::TERMINATOR;
    use proptest::prelude::*;

    #[test]
    fn test_encode_frequency() {
        // 14070000 -> digits from LSB: 0,0,0,0,7,0,4,1,0,0
        assert_eq!(encode_frequency(14_070_000), [0x00, 0x00, 0x07, 0x14, 0x00]);
        assert_eq!(encode_frequency(3_500_000), [0x00, 0x00, 0x50, 0x03, 0x00]);
        assert_eq!(encode_frequency(u32::MAX), [0x95, 0x72, 0x96, 0x94, 0x42]);
    }

    #[test]
    fn test_decode_frequency() {
        let bytes = [0x00, 0x00, 0x07, 0x14, 0x00, TERMINATOR];
        assert_eq!(decode_frequency(&bytes, TERMINATOR), Ok(14_070_000));
    }

    #[test]
    fn test_decode_short_payload() {
        // Fewer than five digit pairs is still a valid number
        assert_eq!(decode_frequency(&[0x21, 0x43, TERMINATOR], TERMINATOR), Ok(4321));
        assert_eq!(decode_frequency(&[TERMINATOR], TERMINATOR), Ok(0));
    }

    #[test]
    fn test_decode_stops_at_terminator() {
        let bytes = [0x50, TERMINATOR, 0x99, 0x99];
        assert_eq!(decode_frequency(&bytes, TERMINATOR), Ok(50));
    }

    #[test]
    fn test_decode_missing_terminator() {
        let result = decode_frequency(&[0x00, 0x00, 0x07, 0x14, 0x00], TERMINATOR);
        assert!(matches!(result, Err(ParseError::MalformedFrame(_))));
    }

    #[test]
    fn test_decode_invalid_digit() {
        let result = decode_frequency(&[0x0A, TERMINATOR], TERMINATOR);
        assert_eq!(result, Err(ParseError::InvalidBcd(0x0A)));
    }

    #[test]
    fn test_decode_overflow() {
        // 9_999_999_999 does not fit a u32
        let bytes = [0x99, 0x99, 0x99, 0x99, 0x99, TERMINATOR];
        assert_eq!(decode_frequency(&bytes, TERMINATOR), Err(ParseError::FrequencyOverflow));

        // Trailing zero pairs beyond ten digits are harmless
        let padded = [0x00, 0x00, 0x07, 0x14, 0x00, 0x00, 0x00, TERMINATOR];
        assert_eq!(decode_frequency(&padded, TERMINATOR), Ok(14_070_000));
    }

    proptest! {
        #[test]
        fn roundtrip_any_frequency(hz in any::<u32>()) {
            let mut bytes = encode_frequency(hz).to_vec();
            bytes.push(TERMINATOR);
            prop_assert_eq!(decode_frequency(&bytes, TERMINATOR), Ok(hz));
        }
    }
}
