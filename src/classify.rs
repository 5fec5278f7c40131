//! Unpacking of IEEE-754 bit patterns.
//!
//! This is the only place that looks at the native representation of a
//! float. Everything downstream works from a `FloatValue`.

use std::fmt::Debug;

/// Special value classes that bypass digit generation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Special {
    None,
    Zero,
    Infinity,
    NaN,
}

/// A float broken into its parts.
///
/// For finite non-zero values, the value is exactly
/// `mantissa * 2^(exponent - (precision - 1))`, with the leading one of
/// `mantissa` at bit `precision - 1`. Subnormals are shifted up to that
/// position; `significant_bits` records how many low bits are real.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FloatValue {
    pub sign: bool,
    pub exponent: i32,
    pub mantissa: u64,
    pub significant_bits: u32,
    pub precision: u32,
    pub special: Special,
}

impl FloatValue {
    /// Decompose any supported float.
    ///
    /// ```
    /// # use floating_decimal::{FloatValue, Special};
    /// let v = FloatValue::classify(-0.75f64);
    ///
    /// assert!(v.sign);
    /// assert_eq!(v.exponent, -1);
    /// assert_eq!(v.mantissa, 0x18_0000_0000_0000);
    /// assert_eq!(v.special, Special::None);
    /// ```
    pub fn classify<F: RawFloat>(value: F) -> FloatValue {
        let bits = value.to_raw();
        let fraction_bits = F::PRECISION - 1;
        let hidden_bit = 1u64 << fraction_bits;
        let exponent_mask = (1u64 << F::EXPONENT_BITS) - 1;

        let sign = (bits >> (fraction_bits + F::EXPONENT_BITS)) & 1 != 0;
        let biased = ((bits >> fraction_bits) & exponent_mask) as i32;
        let mut mantissa = bits & (hidden_bit - 1);

        let special = |special, sign| FloatValue {
            sign,
            exponent: 0,
            mantissa: 0,
            significant_bits: 0,
            precision: F::PRECISION,
            special,
        };

        if biased as u64 == exponent_mask {
            return if mantissa == 0 {
                special(Special::Infinity, sign)
            } else {
                // NaN has no sign
                special(Special::NaN, false)
            };
        }

        let (exponent, significant_bits) = if biased == 0 {
            if mantissa == 0 {
                return special(Special::Zero, sign);
            }
            let shift = mantissa.leading_zeros() - (63 - fraction_bits);
            mantissa <<= shift;
            (1 - F::EXPONENT_BIAS - shift as i32, F::PRECISION - shift)
        } else {
            mantissa |= hidden_bit;
            (biased - F::EXPONENT_BIAS, F::PRECISION)
        };

        FloatValue {
            sign,
            exponent,
            mantissa,
            significant_bits,
            precision: F::PRECISION,
            special: Special::None,
        }
    }

    /// Unbiased exponent of the smallest normal value of this format.
    #[inline]
    pub fn min_normal_exponent(&self) -> i32 {
        match self.precision {
            24 => 1 - f32::EXPONENT_BIAS,
            _ => 1 - f64::EXPONENT_BIAS,
        }
    }

    /// Whether the last significant mantissa bit is clear.
    #[inline]
    pub fn is_even(&self) -> bool {
        (self.mantissa >> (self.precision - self.significant_bits)) & 1 == 0
    }

    /// The gap to the next smaller value is half the gap to the next larger
    /// one. True for normal exact powers of two above the smallest normal.
    #[inline]
    pub fn has_closer_lower_neighbor(&self) -> bool {
        self.significant_bits == self.precision
            && self.mantissa == 1 << (self.precision - 1)
            && self.exponent > self.min_normal_exponent()
    }
}

/// A binary floating point type that can be decomposed and rebuilt from
/// its bit pattern.
pub trait RawFloat: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Significand bits, including the hidden bit.
    const PRECISION: u32;
    const EXPONENT_BITS: u32;
    const EXPONENT_BIAS: i32;

    fn to_raw(self) -> u64;
    fn from_raw(bits: u64) -> Self;
}

macro_rules! impl_raw_float {
    ($( $t:ty => $bits:ty, $precision:expr, $exponent_bits:expr; )*) => ($(
        impl RawFloat for $t {
            const PRECISION: u32 = $precision;
            const EXPONENT_BITS: u32 = $exponent_bits;
            const EXPONENT_BIAS: i32 = (1 << ($exponent_bits - 1)) - 1;

            #[inline]
            fn to_raw(self) -> u64 {
                self.to_bits() as u64
            }

            #[inline]
            fn from_raw(bits: u64) -> Self {
                <$t>::from_bits(bits as $bits)
            }
        }
    )*)
}

impl_raw_float! {
    f64 => u64, 53, 11;
    f32 => u32, 24, 8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_values() {
        let one = FloatValue::classify(1.0f64);
        assert_eq!(one.exponent, 0);
        assert_eq!(one.mantissa, 1 << 52);
        assert_eq!(one.significant_bits, 53);
        assert!(!one.sign);

        let f = FloatValue::classify(-3.0f32);
        assert!(f.sign);
        assert_eq!(f.exponent, 1);
        assert_eq!(f.mantissa, 0b11 << 22);
        assert_eq!(f.precision, 24);
    }

    #[test]
    fn special_values() {
        assert_eq!(FloatValue::classify(0.0f64).special, Special::Zero);

        let negative_zero = FloatValue::classify(-0.0f64);
        assert_eq!(negative_zero.special, Special::Zero);
        assert!(negative_zero.sign);

        let infinity = FloatValue::classify(f64::NEG_INFINITY);
        assert_eq!(infinity.special, Special::Infinity);
        assert!(infinity.sign);

        let nan = FloatValue::classify(-f32::NAN);
        assert_eq!(nan.special, Special::NaN);
        assert!(!nan.sign);
    }

    #[test]
    fn subnormals_are_normalized() {
        let min = FloatValue::classify(f64::from_bits(1));
        assert_eq!(min.exponent, -1074);
        assert_eq!(min.mantissa, 1 << 52);
        assert_eq!(min.significant_bits, 1);
        assert!(!min.is_even());

        let f = FloatValue::classify(f32::from_bits(0b110));
        assert_eq!(f.exponent, -147);
        assert_eq!(f.mantissa, 0b11 << 22);
        assert_eq!(f.significant_bits, 3);
        assert!(f.is_even());
    }

    #[test]
    fn powers_of_two_boundaries() {
        assert!(FloatValue::classify(1.0f64).has_closer_lower_neighbor());
        assert!(FloatValue::classify(2.0f32).has_closer_lower_neighbor());
        assert!(!FloatValue::classify(f64::MIN_POSITIVE).has_closer_lower_neighbor());
        assert!(!FloatValue::classify(f64::from_bits(1)).has_closer_lower_neighbor());
        assert!(!FloatValue::classify(3.0f64).has_closer_lower_neighbor());
    }
}
