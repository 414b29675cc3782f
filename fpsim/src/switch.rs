//! Mode-switchable numeric wrapper.
//!
//! A design under sizing runs twice: once on doubles to observe the value
//! ranges, once on fixed point to check the chosen formats. [`FpSwitch`]
//! lets the same model code do both — a construction-time flag routes
//! every operation to the fixed-point engine or to a native double, and
//! the double path records the min/max excursion of every assignment so
//! formats can be read straight off a completed run.

use fpsim_core::{FpError, FpNum, Format, QuantizePolicy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Div, Mul, Shl, Shr, Sub};
use tracing::trace;

/// A value routed through either the fixed-point engine or a floating
/// shadow, chosen at construction.
#[derive(Clone, Debug)]
pub struct FpSwitch {
    fp_mode: bool,
    fp: Option<FpNum>,
    dbl: f64,
    dbl_min: f64,
    dbl_max: f64,
}

/// Anything assignable to a switchable.
#[derive(Clone, Debug)]
pub enum SwitchValue {
    Fixed(FpNum),
    Float(f64),
}

impl From<FpNum> for SwitchValue {
    fn from(v: FpNum) -> Self {
        SwitchValue::Fixed(v)
    }
}

impl From<f64> for SwitchValue {
    fn from(v: f64) -> Self {
        SwitchValue::Float(v)
    }
}

impl From<&FpSwitch> for SwitchValue {
    fn from(v: &FpSwitch) -> Self {
        match (&v.fp, v.fp_mode) {
            (Some(n), true) => SwitchValue::Fixed(n.clone()),
            _ => SwitchValue::Float(v.dbl),
        }
    }
}

impl FpSwitch {
    /// A switchable in fixed-point mode.
    pub fn fixed(value: FpNum) -> Self {
        let dbl = value.to_f64();
        FpSwitch {
            fp_mode: true,
            fp: Some(value),
            dbl,
            dbl_min: dbl,
            dbl_max: dbl,
        }
    }

    /// A switchable in double mode.
    pub fn float(value: f64) -> Self {
        FpSwitch {
            fp_mode: false,
            fp: None,
            dbl: value,
            dbl_min: value,
            dbl_max: value,
        }
    }

    #[inline]
    pub fn fp_mode(&self) -> bool {
        self.fp_mode
    }

    /// The fixed-point value, when in fixed-point mode.
    pub fn fixed_value(&self) -> Option<&FpNum> {
        if self.fp_mode {
            self.fp.as_ref()
        } else {
            None
        }
    }

    /// The current value as a double (approximate in fixed-point mode).
    pub fn float_value(&self) -> f64 {
        match (&self.fp, self.fp_mode) {
            (Some(n), true) => n.to_f64(),
            _ => self.dbl,
        }
    }

    /// Smallest double ever assigned (double mode only).
    #[inline]
    pub fn min_value(&self) -> f64 {
        self.dbl_min
    }

    /// Largest double ever assigned (double mode only).
    #[inline]
    pub fn max_value(&self) -> f64 {
        self.dbl_max
    }

    /// Replace the held value. Fixed-point mode insists on a fixed-point
    /// operand; double mode converts anything and updates the excursion
    /// record.
    pub fn set_value(&mut self, value: impl Into<SwitchValue>) -> Result<(), FpError> {
        match (self.fp_mode, value.into()) {
            (true, SwitchValue::Fixed(n)) => {
                self.dbl = n.to_f64();
                self.fp = Some(n);
                Ok(())
            }
            (true, SwitchValue::Float(_)) => Err(FpError::ModeMismatch),
            (false, SwitchValue::Float(x)) => {
                self.assign_double(x);
                Ok(())
            }
            (false, SwitchValue::Fixed(n)) => {
                self.assign_double(n.to_f64());
                Ok(())
            }
        }
    }

    fn assign_double(&mut self, x: f64) {
        self.dbl = x;
        if x < self.dbl_min || x > self.dbl_max {
            trace!(value = x, "double excursion extended");
        }
        self.dbl_min = self.dbl_min.min(x);
        self.dbl_max = self.dbl_max.max(x);
    }

    /// Quantize the fixed-point side; a no-op in double mode.
    pub fn resize(&mut self, format: Format, policy: QuantizePolicy) -> Result<(), FpError> {
        if !self.fp_mode {
            return Ok(());
        }
        match &mut self.fp {
            Some(n) => n.resize(format, policy),
            None => Ok(()),
        }
    }

    /// Fixed-point view of the current value, exact for the double path.
    fn as_fixed(&self) -> Result<FpNum, FpError> {
        match (&self.fp, self.fp_mode) {
            (Some(n), true) => Ok(n.clone()),
            _ => FpNum::from_float_minimal(self.dbl),
        }
    }

    fn combine(
        &self,
        other: &FpSwitch,
        fixed_op: impl FnOnce(&FpNum, &FpNum) -> Result<FpNum, FpError>,
        double_op: impl FnOnce(f64, f64) -> f64,
    ) -> Result<FpSwitch, FpError> {
        if self.fp_mode || other.fp_mode {
            let a = self.as_fixed()?;
            let b = other.as_fixed()?;
            Ok(FpSwitch::fixed(fixed_op(&a, &b)?))
        } else {
            Ok(FpSwitch::float(double_op(self.dbl, other.dbl)))
        }
    }

    pub fn checked_add(&self, other: &FpSwitch) -> Result<FpSwitch, FpError> {
        self.combine(other, FpNum::checked_add, |a, b| a + b)
    }

    pub fn checked_sub(&self, other: &FpSwitch) -> Result<FpSwitch, FpError> {
        self.combine(other, FpNum::checked_sub, |a, b| a - b)
    }

    pub fn checked_mul(&self, other: &FpSwitch) -> Result<FpSwitch, FpError> {
        self.combine(other, FpNum::checked_mul, |a, b| a * b)
    }

    pub fn checked_div(&self, other: &FpSwitch) -> Result<FpSwitch, FpError> {
        self.combine(other, FpNum::checked_div, |a, b| a / b)
    }
}

macro_rules! impl_switch_operator {
    ($trait:ident, $method:ident, $checked:ident) => {
        impl $trait<&FpSwitch> for &FpSwitch {
            type Output = FpSwitch;
            fn $method(self, rhs: &FpSwitch) -> FpSwitch {
                self.$checked(rhs)
                    .unwrap_or_else(|err| panic!("switchable {} failed: {err}", stringify!($method)))
            }
        }

        impl $trait<FpSwitch> for &FpSwitch {
            type Output = FpSwitch;
            fn $method(self, rhs: FpSwitch) -> FpSwitch {
                self.$method(&rhs)
            }
        }

        impl $trait<&FpSwitch> for FpSwitch {
            type Output = FpSwitch;
            fn $method(self, rhs: &FpSwitch) -> FpSwitch {
                (&self).$method(rhs)
            }
        }

        impl $trait for FpSwitch {
            type Output = FpSwitch;
            fn $method(self, rhs: FpSwitch) -> FpSwitch {
                (&self).$method(&rhs)
            }
        }

        impl $trait<f64> for &FpSwitch {
            type Output = FpSwitch;
            fn $method(self, rhs: f64) -> FpSwitch {
                self.$method(&FpSwitch::float(rhs))
            }
        }

        impl $trait<f64> for FpSwitch {
            type Output = FpSwitch;
            fn $method(self, rhs: f64) -> FpSwitch {
                (&self).$method(&FpSwitch::float(rhs))
            }
        }

        impl $trait<&FpSwitch> for f64 {
            type Output = FpSwitch;
            fn $method(self, rhs: &FpSwitch) -> FpSwitch {
                (&FpSwitch::float(self)).$method(rhs)
            }
        }
    };
}

impl_switch_operator!(Add, add, checked_add);
impl_switch_operator!(Sub, sub, checked_sub);
impl_switch_operator!(Mul, mul, checked_mul);
impl_switch_operator!(Div, div, checked_div);

impl Shl<u32> for &FpSwitch {
    type Output = FpSwitch;
    fn shl(self, n: u32) -> FpSwitch {
        match (&self.fp, self.fp_mode) {
            (Some(v), true) => FpSwitch::fixed(v << n),
            _ => FpSwitch::float(self.dbl * (2f64).powi(n as i32)),
        }
    }
}

impl Shl<u32> for FpSwitch {
    type Output = FpSwitch;
    fn shl(self, n: u32) -> FpSwitch {
        &self << n
    }
}

impl Shr<u32> for &FpSwitch {
    type Output = FpSwitch;
    fn shr(self, n: u32) -> FpSwitch {
        match (&self.fp, self.fp_mode) {
            (Some(v), true) => FpSwitch::fixed(v >> n),
            _ => FpSwitch::float(self.dbl / (2f64).powi(n as i32)),
        }
    }
}

impl Shr<u32> for FpSwitch {
    type Output = FpSwitch;
    fn shr(self, n: u32) -> FpSwitch {
        &self >> n
    }
}

impl PartialEq for FpSwitch {
    fn eq(&self, other: &FpSwitch) -> bool {
        if self.fp_mode || other.fp_mode {
            match (self.as_fixed(), other.as_fixed()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        } else {
            self.dbl == other.dbl
        }
    }
}

impl PartialEq<f64> for FpSwitch {
    fn eq(&self, other: &f64) -> bool {
        match (&self.fp, self.fp_mode) {
            (Some(n), true) => n == other,
            _ => self.dbl == *other,
        }
    }
}

impl fmt::Display for FpSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.fp, self.fp_mode) {
            (Some(n), true) => n.fmt(f),
            _ => self.dbl.fmt(f),
        }
    }
}

// Wire record: `{fpm, dv, dmax, dmin, fpv?}`.
#[derive(Serialize, Deserialize)]
struct SwitchRecord {
    fpm: bool,
    dv: f64,
    dmax: f64,
    dmin: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fpv: Option<FpNum>,
}

impl Serialize for FpSwitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SwitchRecord {
            fpm: self.fp_mode,
            dv: self.dbl,
            dmax: self.dbl_max,
            dmin: self.dbl_min,
            fpv: self.fp.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FpSwitch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let r = SwitchRecord::deserialize(deserializer)?;
        if r.fpm && r.fpv.is_none() {
            return Err(serde::de::Error::custom(
                "fixed-point mode record is missing the fpv value",
            ));
        }
        Ok(FpSwitch {
            fp_mode: r.fpm,
            fp: r.fpv,
            dbl: r.dv,
            dbl_min: r.dmin,
            dbl_max: r.dmax,
        })
    }
}
