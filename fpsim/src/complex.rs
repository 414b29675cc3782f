//! Complex fixed-point pair.
//!
//! Two signed [`FpNum`] parts sharing one format. Arithmetic delegates to
//! the real engine at full growth; the parts are re-normalized to a common
//! format after every operation, so the shared-format invariant survives
//! asymmetric growth (conjugation grows only the imaginary part, for
//! instance).

use fpsim_core::{FpError, FpNum, Format, QuantizePolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FpComplex {
    re: FpNum,
    im: FpNum,
}

impl FpComplex {
    /// Pair two values; both become signed and grow losslessly to the
    /// wider common format.
    pub fn new(re: FpNum, im: FpNum) -> Result<FpComplex, FpError> {
        let re = re.to_signed();
        let im = im.to_signed();
        let format = Format::new(
            re.int_bits().max(im.int_bits()),
            re.frac_bits().max(im.frac_bits()),
        )?;
        Ok(FpComplex {
            re: re.grow_to(format)?,
            im: im.grow_to(format)?,
        })
    }

    /// Quantize a complex scalar into the format (saturating).
    pub fn from_floats(re: f64, im: f64, format: Format) -> Result<FpComplex, FpError> {
        Self::new(
            FpNum::from_float(re, format, true)?,
            FpNum::from_float(im, format, true)?,
        )
    }

    /// A real scalar with a zero imaginary part.
    pub fn from_real(re: f64, format: Format) -> Result<FpComplex, FpError> {
        Self::from_floats(re, 0.0, format)
    }

    /// Quantize using another complex value's format.
    pub fn with_format_of(re: f64, im: f64, other: &FpComplex) -> Result<FpComplex, FpError> {
        Self::from_floats(re, im, other.format())
    }

    fn paired(re: FpNum, im: FpNum) -> FpComplex {
        match Self::new(re, im) {
            Ok(c) => c,
            Err(err) => panic!("complex normalization failed: {err}"),
        }
    }

    #[inline]
    pub fn real(&self) -> &FpNum {
        &self.re
    }

    #[inline]
    pub fn imag(&self) -> &FpNum {
        &self.im
    }

    /// The shared component format.
    #[inline]
    pub fn format(&self) -> Format {
        self.re.format()
    }

    /// `re^2 + im^2`, the non-negative real intermediate behind division
    /// and magnitude.
    pub fn energy(&self) -> FpNum {
        &(&self.re * &self.re) + &(&self.im * &self.im)
    }

    /// Negate the imaginary part.
    pub fn conj(&self) -> FpComplex {
        Self::paired(self.re.clone(), -&self.im)
    }

    pub fn checked_add(&self, other: &FpComplex) -> Result<FpComplex, FpError> {
        Self::new(
            self.re.checked_add(&other.re)?,
            self.im.checked_add(&other.im)?,
        )
    }

    pub fn checked_sub(&self, other: &FpComplex) -> Result<FpComplex, FpError> {
        Self::new(
            self.re.checked_sub(&other.re)?,
            self.im.checked_sub(&other.im)?,
        )
    }

    /// `(a+bi)(c+di) = (ac - bd) + (ad + bc)i`, four real multiplies at
    /// full growth.
    pub fn checked_mul(&self, other: &FpComplex) -> Result<FpComplex, FpError> {
        let ac = self.re.checked_mul(&other.re)?;
        let bd = self.im.checked_mul(&other.im)?;
        let ad = self.re.checked_mul(&other.im)?;
        let bc = self.im.checked_mul(&other.re)?;
        Self::new(ac.checked_sub(&bd)?, ad.checked_add(&bc)?)
    }

    /// Multiply by the conjugate, then divide both parts by the real
    /// energy of the denominator.
    pub fn checked_div(&self, other: &FpComplex) -> Result<FpComplex, FpError> {
        let numerator = self.checked_mul(&other.conj())?;
        let energy = other.energy();
        Self::new(
            numerator.re.checked_div(&energy)?,
            numerator.im.checked_div(&energy)?,
        )
    }

    /// Magnitude: square root of the energy, quantized back into the
    /// energy's format. The root goes through a double, so this is a
    /// documented approximation rather than a bit-exact operation.
    pub fn abs(&self) -> Result<FpNum, FpError> {
        let energy = self.energy();
        FpNum::from_float(energy.to_f64().sqrt(), energy.format(), true)
    }

    /// Resize both parts with the same arguments; all-or-nothing.
    pub fn resize(&mut self, format: Format, policy: QuantizePolicy) -> Result<(), FpError> {
        let mut re = self.re.clone();
        re.resize(format, policy)?;
        let mut im = self.im.clone();
        im.resize(format, policy)?;
        self.re = re;
        self.im = im;
        Ok(())
    }
}

macro_rules! impl_complex_operator {
    ($trait:ident, $method:ident, $checked:ident) => {
        impl $trait<&FpComplex> for &FpComplex {
            type Output = FpComplex;
            fn $method(self, rhs: &FpComplex) -> FpComplex {
                self.$checked(rhs)
                    .unwrap_or_else(|err| panic!("complex {} failed: {err}", stringify!($method)))
            }
        }

        impl $trait<FpComplex> for &FpComplex {
            type Output = FpComplex;
            fn $method(self, rhs: FpComplex) -> FpComplex {
                self.$method(&rhs)
            }
        }

        impl $trait<&FpComplex> for FpComplex {
            type Output = FpComplex;
            fn $method(self, rhs: &FpComplex) -> FpComplex {
                (&self).$method(rhs)
            }
        }

        impl $trait for FpComplex {
            type Output = FpComplex;
            fn $method(self, rhs: FpComplex) -> FpComplex {
                (&self).$method(&rhs)
            }
        }
    };
}

impl_complex_operator!(Add, add, checked_add);
impl_complex_operator!(Sub, sub, checked_sub);
impl_complex_operator!(Mul, mul, checked_mul);
impl_complex_operator!(Div, div, checked_div);

impl Neg for &FpComplex {
    type Output = FpComplex;
    fn neg(self) -> FpComplex {
        FpComplex::paired(-&self.re, -&self.im)
    }
}

impl Neg for FpComplex {
    type Output = FpComplex;
    fn neg(self) -> FpComplex {
        -&self
    }
}

impl PartialEq for FpComplex {
    fn eq(&self, other: &FpComplex) -> bool {
        self.re == other.re && self.im == other.im
    }
}

impl fmt::Display for FpComplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0i64 {
            write!(f, "({}{}j)", self.re, self.im)
        } else {
            write!(f, "({}+{}j)", self.re, self.im)
        }
    }
}
