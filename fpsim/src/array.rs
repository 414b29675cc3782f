//! Nested-sequence fan-outs.
//!
//! Models frequently carry coefficient tables as nested lists (filter
//! banks, polyphase matrices). [`Nested`] mirrors that shape, and the
//! helpers here map "construct from scalar" and "resize in place" across
//! every leaf, preserving the structure.

use crate::complex::FpComplex;
use fpsim_core::{FpError, FpNum, Format, QuantizePolicy};
use serde::{Deserialize, Serialize};

/// An arbitrarily nested ordered sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nested<T> {
    Leaf(T),
    List(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Apply a fallible map to every leaf, mirroring the shape. The first
    /// error aborts the walk.
    pub fn try_map<U, E, F>(&self, f: &mut F) -> Result<Nested<U>, E>
    where
        F: FnMut(&T) -> Result<U, E>,
    {
        match self {
            Nested::Leaf(v) => Ok(Nested::Leaf(f(v)?)),
            Nested::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for n in items {
                    out.push(n.try_map(f)?);
                }
                Ok(Nested::List(out))
            }
        }
    }

    /// Visit every leaf mutably; the first error aborts the walk.
    pub fn try_for_each_mut<E, F>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut T) -> Result<(), E>,
    {
        match self {
            Nested::Leaf(v) => f(v),
            Nested::List(items) => {
                for n in items {
                    n.try_for_each_mut(f)?;
                }
                Ok(())
            }
        }
    }

    /// All leaves in order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Nested::Leaf(v) => out.push(v),
            Nested::List(items) => {
                for n in items {
                    n.collect_leaves(out);
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Nested::Leaf(_) => 1,
            Nested::List(items) => items.iter().map(Nested::leaf_count).sum(),
        }
    }
}

impl<T> From<Vec<T>> for Nested<T> {
    fn from(values: Vec<T>) -> Self {
        Nested::List(values.into_iter().map(Nested::Leaf).collect())
    }
}

/// A two-level convenience: rows of leaves.
pub fn from_rows<T>(rows: Vec<Vec<T>>) -> Nested<T> {
    Nested::List(rows.into_iter().map(Nested::from).collect())
}

/// Construct a fixed-point value for every scalar leaf.
pub fn num_from_nested(
    src: &Nested<f64>,
    format: Format,
    signed: bool,
) -> Result<Nested<FpNum>, FpError> {
    src.try_map(&mut |x| FpNum::from_float(*x, format, signed))
}

/// [`num_from_nested`] with the format copied from an existing value.
pub fn num_from_nested_like(
    src: &Nested<f64>,
    format_inst: &FpNum,
) -> Result<Nested<FpNum>, FpError> {
    src.try_map(&mut |x| FpNum::with_format_of(*x, format_inst))
}

/// Resize every leaf in place with the same arguments.
pub fn resize_nested(
    values: &mut Nested<FpNum>,
    format: Format,
    policy: QuantizePolicy,
) -> Result<(), FpError> {
    values.try_for_each_mut(&mut |v| v.resize(format, policy))
}

/// Construct a complex value for every `(re, im)` leaf.
pub fn complex_from_nested(
    src: &Nested<(f64, f64)>,
    format: Format,
) -> Result<Nested<FpComplex>, FpError> {
    src.try_map(&mut |(re, im)| FpComplex::from_floats(*re, *im, format))
}

/// Construct complex values from real-only leaves (imaginary part zero).
pub fn complex_from_reals(
    src: &Nested<f64>,
    format: Format,
) -> Result<Nested<FpComplex>, FpError> {
    src.try_map(&mut |re| FpComplex::from_real(*re, format))
}

/// Resize every complex leaf in place with the same arguments.
pub fn resize_complex_nested(
    values: &mut Nested<FpComplex>,
    format: Format,
    policy: QuantizePolicy,
) -> Result<(), FpError> {
    values.try_for_each_mut(&mut |v| v.resize(format, policy))
}
