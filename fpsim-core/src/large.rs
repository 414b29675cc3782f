//! Arbitrary-precision engine: the same contract as the word engine with
//! no width ceiling.
//!
//! The scaled integer is a signed `BigInt`; its two's-complement bit view
//! is derived on demand for pattern operations. num-bigint's division
//! already truncates toward zero, which is exactly the VHDL divide
//! semantics, and its right shift floors, which is exactly the arithmetic
//! shift the rounding step builds on.

use crate::bits::{self, to_shift, WORD_BITS};
use crate::error::FpError;
use crate::format::Format;
use crate::policy::{OverflowMode, QuantizePolicy, RoundMode};
use crate::small::FpSmall;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed, Zero};
use std::cmp::Ordering;
use tracing::trace;

#[derive(Clone, Debug)]
pub struct FpLarge {
    format: Format,
    scaled: BigInt,
    signed: bool,
}

impl FpLarge {
    pub(crate) fn zero(format: Format, signed: bool) -> Self {
        FpLarge {
            format,
            scaled: BigInt::zero(),
            signed,
        }
    }

    pub(crate) fn from_value(format: Format, signed: bool, value: BigInt) -> Self {
        debug_assert!(value <= bits::max_scaled_big(format.total_bits() as u64, signed));
        debug_assert!(value >= bits::min_scaled_big(format.total_bits() as u64, signed));
        FpLarge {
            format,
            scaled: value,
            signed,
        }
    }

    /// Adopt a raw bit pattern: mask to the field, then sign-interpret.
    pub(crate) fn from_bit_field(format: Format, signed: bool, raw: BigUint) -> Self {
        let total = format.total_bits() as u64;
        let mask = (BigUint::one() << total) - BigUint::one();
        let masked = raw & mask;
        let negative = signed && masked >= (BigUint::one() << (total - 1));
        let scaled = if negative {
            BigInt::from(masked) - (BigInt::one() << total)
        } else {
            BigInt::from(masked)
        };
        FpLarge {
            format,
            scaled,
            signed,
        }
    }

    pub(crate) fn from_small(small: &FpSmall) -> Self {
        FpLarge {
            format: small.format(),
            scaled: BigInt::from(small.value()),
            signed: small.is_signed(),
        }
    }

    /// Quantize an exact scaled integer into `target` with the
    /// construction policy (saturate, round halves up).
    pub(crate) fn quantize_exact(
        value: BigInt,
        src_frac: i64,
        target: Format,
        signed: bool,
    ) -> Self {
        let drop = src_frac - target.frac_bits();
        let mut v = value;
        if drop > 0 {
            v = bits::round_shift_big(&v, drop as u64, RoundMode::NearPosInf);
        } else if drop < 0 {
            v <<= to_shift(-drop);
        }
        let total = target.total_bits() as u64;
        let max = bits::max_scaled_big(total, signed);
        let min = bits::min_scaled_big(total, signed);
        if v > max {
            v = max;
        } else if v < min {
            v = min;
        }
        Self::from_value(target, signed, v)
    }

    #[inline]
    pub(crate) fn format(&self) -> Format {
        self.format
    }

    #[inline]
    pub(crate) fn is_signed(&self) -> bool {
        self.signed
    }

    #[inline]
    pub(crate) fn value(&self) -> &BigInt {
        &self.scaled
    }

    /// Two's-complement view of the field.
    pub(crate) fn pattern(&self) -> BigUint {
        let total = self.format.total_bits() as u64;
        let p = if self.scaled.is_negative() {
            &self.scaled + (BigInt::one() << total)
        } else {
            self.scaled.clone()
        };
        p.magnitude().clone()
    }

    /// The low word of the pattern, for demotion once the field fits.
    pub(crate) fn word_pattern(&self) -> u64 {
        debug_assert!(self.format.total_bits() <= i64::from(WORD_BITS));
        self.pattern().iter_u64_digits().next().unwrap_or(0)
    }

    pub(crate) fn add(&self, other: &Self) -> Self {
        self.sum(other, false)
    }

    pub(crate) fn sub(&self, other: &Self) -> Self {
        self.sum(other, true)
    }

    fn sum(&self, other: &Self, negate: bool) -> Self {
        debug_assert_eq!(self.signed, other.signed);
        let format = self.format.add_growth(&other.format);
        let va = &self.scaled << to_shift(format.frac_bits() - self.format.frac_bits());
        let vb = &other.scaled << to_shift(format.frac_bits() - other.format.frac_bits());
        let mut v = if negate { va - vb } else { va + vb };
        // Unsigned subtraction below zero wraps in the field, exactly as
        // the hardware register would.
        if !self.signed && v.is_negative() {
            v += BigInt::one() << to_shift(format.total_bits());
        }
        Self::from_value(format, self.signed, v)
    }

    pub(crate) fn mul(&self, other: &Self) -> Self {
        debug_assert_eq!(self.signed, other.signed);
        let format = self.format.mul_growth(&other.format);
        Self::from_value(format, self.signed, &self.scaled * &other.scaled)
    }

    /// Truncate-toward-zero division, which num-bigint's `/` provides
    /// directly for signed operands.
    pub(crate) fn div(&self, other: &Self) -> Result<Self, FpError> {
        debug_assert_eq!(self.signed, other.signed);
        if other.scaled.is_zero() {
            return Err(FpError::DivisionByZero);
        }
        let format = self.format.div_growth(&other.format, self.signed);
        let num = &self.scaled << to_shift(other.format.total_bits());
        Ok(Self::from_value(format, self.signed, num / &other.scaled))
    }

    pub(crate) fn neg(&self) -> Self {
        Self::from_value(self.format.neg_growth(), true, -&self.scaled)
    }

    pub(crate) fn abs(&self) -> Self {
        if self.scaled.is_negative() {
            self.neg()
        } else {
            self.clone()
        }
    }

    /// Shift the bit pattern left inside the field; format unchanged.
    pub(crate) fn shl(&self, n: u32) -> Self {
        let total = self.format.total_bits() as u64;
        let mask = (BigUint::one() << total) - BigUint::one();
        let raw = (self.pattern() << n as usize) & mask;
        Self::from_bit_field(self.format, self.signed, raw)
    }

    /// Arithmetic right shift inside the field; format unchanged.
    pub(crate) fn shr(&self, n: u32) -> Self {
        Self::from_value(self.format, self.signed, &self.scaled >> n as usize)
    }

    pub(crate) fn resize(
        &mut self,
        target: Format,
        policy: QuantizePolicy,
    ) -> Result<(), FpError> {
        let mut v = self.scaled.clone();
        let drop = self.format.frac_bits() - target.frac_bits();
        if drop > 0 {
            v = bits::round_shift_big(&v, drop as u64, policy.round);
        } else if drop < 0 {
            v <<= to_shift(-drop);
        }

        let total = target.total_bits() as u64;
        let max = bits::max_scaled_big(total, self.signed);
        let min = bits::min_scaled_big(total, self.signed);
        if v > max || v < min {
            match policy.overflow {
                OverflowMode::Wrap => {
                    trace!(%target, "resize wrapped");
                    let modulus = BigInt::one() << total;
                    let wrapped = ((v % &modulus) + &modulus) % &modulus;
                    *self =
                        Self::from_bit_field(target, self.signed, wrapped.magnitude().clone());
                    return Ok(());
                }
                OverflowMode::Saturate => {
                    trace!(%target, "resize saturated");
                    v = if v > max { max } else { min };
                }
                OverflowMode::Exception => {
                    return Err(FpError::Overflow {
                        value: bits::decimal_string(&self.scaled, self.format.frac_bits()),
                        int_bits: target.int_bits(),
                        frac_bits: target.frac_bits(),
                    });
                }
            }
        }
        *self = Self::from_value(target, self.signed, v);
        Ok(())
    }

    pub(crate) fn cmp_value(&self, other: &Self) -> Ordering {
        let f = self.format.frac_bits().max(other.format.frac_bits());
        let va = &self.scaled << to_shift(f - self.format.frac_bits());
        let vb = &other.scaled << to_shift(f - other.format.frac_bits());
        va.cmp(&vb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(i: i64, f: i64) -> Format {
        Format::new(i, f).unwrap()
    }

    fn large(i: i64, f: i64, signed: bool, value: i128) -> FpLarge {
        FpLarge::from_value(fmt(i, f), signed, BigInt::from(value))
    }

    #[test]
    fn pattern_is_twos_complement() {
        let v = large(4, 4, true, -91);
        assert_eq!(v.pattern(), BigUint::from(0xA5u32));

        let wide = large(100, 0, true, -1);
        assert_eq!(wide.pattern(), (BigUint::one() << 100u32) - BigUint::one());
    }

    #[test]
    fn bit_field_sign_interprets() {
        let raw = (BigUint::one() << 99u32) | BigUint::one();
        let v = FpLarge::from_bit_field(fmt(100, 0), true, raw.clone());
        assert_eq!(v.value(), &(BigInt::one() - (BigInt::one() << 99u32)));
        // And the pattern reads back verbatim.
        assert_eq!(v.pattern(), raw);

        let u = FpLarge::from_bit_field(fmt(100, 0), false, raw.clone());
        assert_eq!(u.value(), &BigInt::from(raw));
    }

    #[test]
    fn wide_multiply_is_exact() {
        // Two 40-bit operands land on an 80-bit product.
        let a = large(40, 0, true, (1i128 << 38) + 12345);
        let b = large(40, 0, true, -((1i128 << 37) + 999));
        let r = a.mul(&b);
        assert_eq!(r.format(), fmt(80, 0));
        let expect = BigInt::from((1i128 << 38) + 12345) * BigInt::from(-((1i128 << 37) + 999));
        assert_eq!(r.value(), &expect);
    }

    #[test]
    fn divide_truncates_toward_zero() {
        let a = large(8, 0, true, -7);
        let b = large(4, 0, true, 3);
        let r = a.div(&b).unwrap();
        // (-7 << 4) / 3 = -112 / 3 = -37 (toward zero, not -38).
        assert_eq!(r.value(), &BigInt::from(-37));
        assert_eq!(r.format(), fmt(8 + 0 + 1, 0 + 4));
    }

    #[test]
    fn divide_by_zero_is_reported() {
        let a = large(8, 0, true, 1);
        let b = large(8, 0, true, 0);
        assert!(matches!(a.div(&b), Err(FpError::DivisionByZero)));
    }

    #[test]
    fn shifts_mask_within_the_field() {
        let v = large(4, 4, true, 0x25);
        let l = v.shl(2);
        assert_eq!(l.pattern(), BigUint::from(0x94u32));
        assert_eq!(l.value(), &BigInt::from(-108));

        let r = l.shr(2);
        assert_eq!(r.value(), &BigInt::from(-27));
    }

    #[test]
    fn resize_wrap_matches_modular_arithmetic() {
        let mut v = large(5, 0, true, 10);
        v.resize(fmt(4, 0), QuantizePolicy::default()).unwrap();
        assert_eq!(v.value(), &BigInt::from(-6));
    }

    #[test]
    fn resize_saturates_to_endpoints() {
        let mut v = large(5, 0, true, 10);
        v.resize(
            fmt(4, 0),
            QuantizePolicy::new(OverflowMode::Saturate, RoundMode::DirectNegInf),
        )
        .unwrap();
        assert_eq!(v.value(), &BigInt::from(7));

        let mut v = large(5, 0, true, -12);
        v.resize(
            fmt(4, 0),
            QuantizePolicy::new(OverflowMode::Saturate, RoundMode::DirectNegInf),
        )
        .unwrap();
        assert_eq!(v.value(), &BigInt::from(-8));
    }

    #[test]
    fn resize_exception_reports_the_value() {
        let mut v = large(5, 1, true, 21);
        let err = v
            .resize(
                fmt(4, 1),
                QuantizePolicy::new(OverflowMode::Exception, RoundMode::DirectNegInf),
            )
            .unwrap_err();
        match err {
            FpError::Overflow { value, int_bits, frac_bits } => {
                assert_eq!(value, "10.5");
                assert_eq!((int_bits, frac_bits), (4, 1));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn demotion_pattern_fits_the_word() {
        let v = large(4, 4, true, -91);
        assert_eq!(v.word_pattern(), 0xA5);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Promotion idempotence: the word engine and this engine agree
            /// on every operation that fits both.
            #[test]
            fn agrees_with_word_engine(
                a in -128i128..=127,
                b in -128i128..=127,
            ) {
                let f = Format::new(5, 3).unwrap();
                let sa = FpSmall::from_value(f, true, a);
                let sb = FpSmall::from_value(f, true, b);
                let la = FpLarge::from_small(&sa);
                let lb = FpLarge::from_small(&sb);

                let sum_s = sa.add(&sb).unwrap();
                let sum_l = la.add(&lb);
                prop_assert_eq!(sum_l.value(), &BigInt::from(sum_s.value()));
                prop_assert_eq!(sum_l.format(), sum_s.format());

                let prod_s = sa.mul(&sb).unwrap();
                let prod_l = la.mul(&lb);
                prop_assert_eq!(prod_l.value(), &BigInt::from(prod_s.value()));

                if b != 0 {
                    let q_s = sa.div(&sb).unwrap();
                    let q_l = la.div(&lb).unwrap();
                    prop_assert_eq!(q_l.value(), &BigInt::from(q_s.value()));
                    prop_assert_eq!(q_l.format(), q_s.format());
                }
            }

            /// Resize agrees with the word engine across modes.
            #[test]
            fn resize_agrees_with_word_engine(
                v in -4096i128..=4095,
                round in 1u8..=5,
                overflow in 0u8..=1,
            ) {
                let f = Format::new(7, 6).unwrap();
                let target = Format::new(4, 2).unwrap();
                let policy = QuantizePolicy::new(
                    OverflowMode::try_from(overflow).unwrap(),
                    RoundMode::try_from(round).unwrap(),
                );
                let mut s = FpSmall::from_value(f, true, v);
                let mut l = FpLarge::from_small(&s);
                s.resize(target, policy).unwrap();
                l.resize(target, policy).unwrap();
                prop_assert_eq!(l.value(), &BigInt::from(s.value()));
            }
        }
    }
}
