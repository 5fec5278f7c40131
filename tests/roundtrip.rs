use floating_decimal::{
    format, format_value, parse_decimal, parse_str, to_decimal, DecimalDigits, FormatStyle,
};
use proptest::prelude::*;

fn finite_f64() -> impl Strategy<Value = f64> {
    any::<u64>()
        .prop_map(f64::from_bits)
        .prop_filter("finite", |v| v.is_finite())
}

fn finite_f32() -> impl Strategy<Value = f32> {
    any::<u32>()
        .prop_map(f32::from_bits)
        .prop_filter("finite", |v| v.is_finite())
}

/// Integer value of the digits and the power of ten of their last digit.
fn scaled(d: &DecimalDigits) -> (i128, i32) {
    let value = d
        .digits()
        .iter()
        .fold(0i128, |acc, &b| acc * 10 + (b - b'0') as i128);
    (value, d.exponent() - d.digits().len() as i32)
}

/// Distance between `rounded` and `exact`, in units of the last digit of
/// `exact`. Rounding never adds digits below that unit.
fn error(exact: &DecimalDigits, rounded: &DecimalDigits) -> i128 {
    let (e, e_exp) = scaled(exact);
    if rounded.is_zero() {
        return e;
    }
    let (r, r_exp) = scaled(rounded);
    let shift = (r_exp - e_exp) as u32;
    (r * 10i128.pow(shift) - e).abs()
}

proptest! {
    #[test]
    fn shortest_digits_round_trip(v in finite_f64()) {
        let d = DecimalDigits::from(v);
        prop_assert_eq!(f64::from(d).to_bits(), v.to_bits());
    }

    #[test]
    fn compatible_digits_round_trip(v in finite_f64()) {
        let d = to_decimal(v, FormatStyle::Compatible);
        prop_assert_eq!(f64::from(d).to_bits(), v.to_bits());
    }

    #[test]
    fn compatible_text_round_trips(v in finite_f64()) {
        let text = format_value(v, FormatStyle::Compatible);
        prop_assert_eq!(parse_str::<f64>(&text).map(f64::to_bits), Ok(v.to_bits()), "{}", text);
    }

    #[test]
    fn float_text_round_trips(v in finite_f32()) {
        let text = format_value(v, FormatStyle::Compatible);
        prop_assert_eq!(parse_str::<f32>(&text).map(f32::to_bits), Ok(v.to_bits()), "{}", text);

        let d = DecimalDigits::from(v);
        prop_assert_eq!(f32::from(d).to_bits(), v.to_bits());
    }

    #[test]
    fn digits_are_trimmed(v in finite_f64()) {
        let d = DecimalDigits::from(v);
        let digits = d.digits();
        if v == 0.0 {
            prop_assert_eq!(digits, b"0");
        } else {
            prop_assert!(digits[0] != b'0');
            prop_assert!(digits[digits.len() - 1] != b'0');
            prop_assert!(digits.len() <= 17);
        }
    }

    #[test]
    fn no_shorter_digits_round_trip(v in finite_f64().prop_filter("non-zero", |v| *v != 0.0)) {
        let d = DecimalDigits::from(v);
        let digits = d.digits();
        let negative = d.is_sign_negative();

        for k in 1..digits.len() {
            let truncated = digits[..k]
                .iter()
                .fold(0u64, |acc, &b| acc * 10 + (b - b'0') as u64);
            let exponent = d.exponent() - k as i32;

            for candidate in [truncated, truncated + 1] {
                let text = candidate.to_string();
                let parsed = parse_decimal::<f64>(text.as_bytes(), exponent, negative);
                prop_assert_ne!(parsed.to_bits(), v.to_bits(), "{}e{} also reads back", text, exponent);
            }
        }
    }

    #[test]
    fn no_shorter_float_digits_round_trip(v in finite_f32().prop_filter("non-zero", |v| *v != 0.0)) {
        let d = DecimalDigits::from(v);
        let digits = d.digits();

        for k in 1..digits.len() {
            let truncated = digits[..k]
                .iter()
                .fold(0u64, |acc, &b| acc * 10 + (b - b'0') as u64);
            let exponent = d.exponent() - k as i32;

            for candidate in [truncated, truncated + 1] {
                let text = candidate.to_string();
                let parsed = parse_decimal::<f32>(text.as_bytes(), exponent, d.is_sign_negative());
                prop_assert_ne!(parsed.to_bits(), v.to_bits(), "{}e{} also reads back", text, exponent);
            }
        }
    }

    #[test]
    fn rounding_is_idempotent(v in finite_f64(), p in 1i32..20) {
        let d = DecimalDigits::from(v);
        let rounded = d.round_to(p);

        for q in p..20 {
            prop_assert_eq!(rounded.round_to(q), rounded);
        }

        let style = FormatStyle::Scientific { precision: p as u32 - 1 };
        prop_assert_eq!(format(&rounded, style), format(&d, style));
    }

    #[test]
    fn fixed_output_is_stable_at_more_places(v in finite_f64(), p in 0u32..8) {
        let d = DecimalDigits::from(v);
        let once = format(&d, FormatStyle::DecimalFloat { precision: p });
        let rounded = d.round_to(d.exponent() + p as i32);

        for extra in 0..4 {
            let mut expected = once.clone();
            if p == 0 && extra > 0 {
                expected.push('.');
            }
            expected.extend(std::iter::repeat('0').take(extra as usize));

            let again = format(&rounded, FormatStyle::DecimalFloat { precision: p + extra });
            prop_assert_eq!(again, expected);
        }
    }

    #[test]
    fn more_precision_is_never_less_accurate(v in finite_f64().prop_filter("non-zero", |v| *v != 0.0)) {
        let d = DecimalDigits::from(v);
        let mut previous = error(&d, &d.round_to(-1));

        for len in 0..=18 {
            let current = error(&d, &d.round_to(len));
            prop_assert!(current <= previous, "len {}: {} > {}", len, current, previous);
            previous = current;
        }
        prop_assert_eq!(previous, 0);
    }

    #[test]
    fn precision_styles_parse_back_close(v in finite_f64(), p in 0u32..17) {
        let text = format_value(v, FormatStyle::Scientific { precision: p });
        let parsed = parse_str::<f64>(&text);
        prop_assert!(parsed.is_ok(), "{}", text);

        if p == 16 {
            prop_assert_eq!(parsed.map(f64::to_bits), Ok(v.to_bits()), "{}", text);
        }
    }
}
