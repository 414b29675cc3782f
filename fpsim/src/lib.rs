//! # fpsim
//!
//! Binary fixed-point arithmetic for bit-accurate simulation of DSP
//! hardware: a value type with explicit `(int_bits, frac_bits)` formats,
//! lossless growth-rule arithmetic, and VHDL-style `resize` quantization.
//!
//! This crate layers the model-building surface over [`fpsim_core`]:
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FpNum`] | Real fixed-point value (re-exported from the core) |
//! | [`FpSwitch`] | Fixed-point / double switchable with range tracking |
//! | [`FpComplex`] | Complex pair over two real values |
//! | [`Nested`] | Nested coefficient sequences + construct/resize fan-outs |
//!
//! A typical sizing workflow: run the model on [`FpSwitch`] doubles to
//! observe ranges, pick formats, then flip to fixed-point mode and compare
//! the quantized pipeline bit for bit.

pub mod array;
pub mod complex;
pub mod switch;

pub use array::{
    complex_from_nested, complex_from_reals, from_rows, num_from_nested, num_from_nested_like,
    resize_complex_nested, resize_nested, Nested,
};
pub use complex::FpComplex;
pub use fpsim_core::{FpError, FpNum, Format, OverflowMode, QuantizePolicy, RoundMode};
pub use switch::{FpSwitch, SwitchValue};
