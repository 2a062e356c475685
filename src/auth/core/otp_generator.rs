//! One-time code generation

use rand::{rngs::OsRng, Rng, RngCore};

use crate::auth::config::MAX_OTP_LENGTH;

/// Codes up to this many digits use a single modulo reduction of a 64-bit draw.
/// The bias is below 10^9 / 2^64 (about 5e-11), which is accepted as negligible.
/// Longer codes fall back to rejection sampling.
const MODULO_MAX_LENGTH: usize = 9;

/// Generate a zero-padded numeric code of exactly `length` digits from the OS CSPRNG.
///
/// # Panics
/// If `length` is 0 or greater than 19. Lengths are validated with the rest of the
/// configuration, so reaching this is a programming error.
pub fn generate_code(length: usize) -> String {
    assert!(
        (1..=MAX_OTP_LENGTH).contains(&length),
        "otp length must be in 1..={}, got {}",
        MAX_OTP_LENGTH,
        length
    );

    let bound = 10u64.pow(length as u32);
    let value = if length <= MODULO_MAX_LENGTH {
        OsRng.next_u64() % bound
    } else {
        OsRng.gen_range(0..bound)
    };

    format!("{:0width$}", value, width = length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_has_requested_length() {
        for length in [1, 4, 6, 9, 10, 19] {
            for _ in 0..50 {
                let code = generate_code(length);
                assert_eq!(code.len(), length);
                assert!(code.bytes().all(|b| b.is_ascii_digit()));
            }
        }
    }

    #[test]
    fn test_digit_distribution_has_no_gross_bias() {
        let mut counts = [0u32; 10];
        for _ in 0..10_000 {
            for b in generate_code(6).bytes() {
                counts[(b - b'0') as usize] += 1;
            }
        }

        // 60_000 digits, 6_000 expected per bucket
        for (digit, count) in counts.iter().enumerate() {
            assert!(
                (5_400..=6_600).contains(count),
                "digit {} appeared {} times",
                digit,
                count
            );
        }
    }

    #[test]
    fn test_leading_zeros_are_kept() {
        // with one digit, "0" must appear eventually
        let saw_zero = (0..1_000).any(|_| generate_code(1) == "0");
        assert!(saw_zero);
    }

    #[test]
    #[should_panic(expected = "otp length")]
    fn test_zero_length_panics() {
        generate_code(0);
    }
}
