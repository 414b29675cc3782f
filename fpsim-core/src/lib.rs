//! # Fixed-point simulation core
//!
//! Bit-accurate binary fixed-point arithmetic for simulating DSP hardware
//! before it exists. Values carry an explicit `(int_bits, frac_bits)`
//! format; arithmetic grows the format so no precision is ever lost, and
//! the single quantization operator, `resize`, applies VHDL-style overflow
//! and rounding policies on the way back down.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   growth rules    ┌───────────┐
//! │  FpNum   │──────────────────▶│  FpSmall  │  u64 field, i128 math
//! │ dispatch │                   ├───────────┤
//! │          │── promote/demote ─│  FpLarge  │  BigInt, no ceiling
//! └────┬─────┘                   └───────────┘
//!      │ resize(QuantizePolicy)
//!      ▼
//!  quantized value (wrap | saturate | exception, five rounding modes)
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FpNum`] | The dispatching fixed-point value (the type you use) |
//! | [`Format`] | `(int_bits, frac_bits)` bit layout |
//! | [`QuantizePolicy`] | Overflow + rounding pair for `resize` |
//! | [`OverflowMode`], [`RoundMode`] | The individual policy enums |
//! | [`FpError`] | Everything that can go wrong, typed |
//!
//! Engine choice is transparent: formats at or below 64 total bits ride a
//! native `u64` field; wider results promote to arbitrary precision
//! automatically, and `resize` demotes back once the field fits again.

pub mod bits;
pub mod error;
pub mod format;
mod large;
pub mod num;
pub mod policy;
mod record;
mod small;


pub use error::FpError;
pub use format::Format;
pub use num::FpNum;
pub use policy::{OverflowMode, QuantizePolicy, RoundMode};
