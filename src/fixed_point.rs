//! Fixed-point conversion
//!
//! Contract values are USD amounts scaled by 10^30. Conversion keeps four
//! decimal places and truncates toward zero on the magnitude, so
//! -1.23456 becomes -1.2345 rather than -1.2346.

use ethers::types::I256;
use rust_decimal::Decimal;

use crate::error::{PipelineError, Result};

/// Decimals used by on-chain USD amounts
pub const USD_DECIMALS: u32 = 30;

/// Decimals kept in the converted value
pub const OUTPUT_DECIMALS: u32 = 4;

fn pow10(exp: u32) -> I256 {
    I256::exp10(exp as usize)
}

/// Convert a 30-decimal integer into a USD [`Decimal`] with 4 decimal places.
///
/// The whole part and remainder are split with truncating division, the
/// remainder is scaled down to 4 digits with truncating division, and the
/// two are recombined as an integer count of 10^-4 units. No floating point
/// is involved.
pub fn from_usd_fixed(value: I256) -> Result<Decimal> {
    let scale = pow10(USD_DECIMALS);
    let out_scale = pow10(OUTPUT_DECIMALS);

    // I256 division and remainder truncate toward zero, so both parts carry
    // the sign of `value`
    let whole = value / scale;
    let remainder = value % scale;
    let fraction = remainder * out_scale / scale;

    let units = whole
        .checked_mul(out_scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| PipelineError::DecimalOverflow(value.to_string()))?;

    if units > I256::from(i128::MAX) || units < I256::from(i128::MIN) {
        return Err(PipelineError::DecimalOverflow(value.to_string()));
    }

    Decimal::try_from_i128_with_scale(units.as_i128(), OUTPUT_DECIMALS)
        .map_err(|_| PipelineError::DecimalOverflow(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn int(s: &str) -> I256 {
        I256::from_dec_str(s).unwrap()
    }

    #[test]
    fn test_one_and_a_half() {
        let v = int("1500000000000000000000000000000");
        assert_eq!(from_usd_fixed(v).unwrap(), dec!(1.5));
    }

    #[test]
    fn test_truncates_not_rounds() {
        // 1234.56789... -> 1234.5678
        let v = int("1234567890123456789012345678901234");
        let converted = from_usd_fixed(v).unwrap();
        assert_eq!(converted, dec!(1234.5678));
        assert_eq!(converted.to_string(), "1234.5678");

        // 0.99999 stays below one
        let v = int("999990000000000000000000000000");
        assert_eq!(from_usd_fixed(v).unwrap(), dec!(0.9999));
    }

    #[test]
    fn test_matches_division_by_1e26() {
        for raw in [
            "0",
            "1",
            "99999999999999999999999999",
            "100000000000000000000000000",
            "42000000000000000000000000000000",
            "3141592653589793238462643383279502884",
        ] {
            let v = int(raw);
            let expected = v / pow10(26);
            let expected = Decimal::from_i128_with_scale(expected.as_i128(), 4);
            assert_eq!(from_usd_fixed(v).unwrap(), expected, "value {}", raw);
        }
    }

    #[test]
    fn test_negative_truncates_toward_zero() {
        let v = int("-1234560000000000000000000000000");
        assert_eq!(from_usd_fixed(v).unwrap(), dec!(-1.2345));

        // Magnitude below one unit collapses to zero rather than -0.0001
        let v = int("-50000000000000000000000");
        assert_eq!(from_usd_fixed(v).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_keeps_four_decimal_scale() {
        let v = int("2000000000000000000000000000000");
        let converted = from_usd_fixed(v).unwrap();
        assert_eq!(converted.scale(), 4);
        assert_eq!(converted.to_string(), "2.0000");
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(from_usd_fixed(I256::MAX).is_err());
        assert!(from_usd_fixed(I256::MIN).is_err());
    }
}
