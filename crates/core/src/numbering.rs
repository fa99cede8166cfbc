//! Human-readable identifiers (account, transaction and loan numbers).

use rand::Rng;

/// Returns the last `width` digits of `value`, left-padded with zeros.
pub(crate) fn trailing_digits(value: i64, width: usize) -> String {
    let digits = value.unsigned_abs().to_string();
    let start = digits.len().saturating_sub(width);
    format!("{:0>width$}", &digits[start..])
}

/// Returns `width` random decimal digits.
pub(crate) fn random_digits(width: u32) -> String {
    let upper = 10_u64.pow(width);
    let n = rand::rng().random_range(0..upper);
    format!("{n:0>w$}", w = width as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_digits() {
        assert_eq!(trailing_digits(1_736_000_123_456, 8), "00123456");
        assert_eq!(trailing_digits(42, 5), "00042");
    }

    #[test]
    fn test_random_digits_width() {
        for _ in 0..50 {
            let d = random_digits(4);
            assert_eq!(d.len(), 4);
            assert!(d.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
