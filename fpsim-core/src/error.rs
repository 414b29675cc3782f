use thiserror::Error;

/// Errors surfaced by the fixed-point engines and the dispatcher.
///
/// Arithmetic itself never loses information (growth rules + automatic
/// promotion to the arbitrary-precision engine); every loss-of-information
/// path is funneled through `resize`, and every misuse path is a typed
/// variant here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FpError {
    /// A format must carry at least one bit: `int_bits + frac_bits >= 1`.
    #[error("invalid format: int_bits {int_bits} + frac_bits {frac_bits} must total at least 1")]
    InvalidFormat { int_bits: i64, frac_bits: i64 },

    /// `resize` with `OverflowMode::Exception` found a value outside the
    /// target range.
    #[error("resize overflow: {value} does not fit a ({int_bits}, {frac_bits}) field")]
    Overflow {
        /// Exact decimal rendering of the offending value.
        value: String,
        int_bits: i64,
        frac_bits: i64,
    },

    /// An engine was asked to produce a result wider than the native word.
    /// The dispatcher promotes to the arbitrary-precision engine before
    /// this can happen; reaching it indicates a dispatch bug.
    #[error("result needs {total_bits} bits, beyond the {word}-bit native word")]
    WordCapacity { total_bits: i64, word: u32 },

    /// Denominator was exactly zero.
    #[error("division by zero")]
    DivisionByZero,

    /// NaN or an infinity cannot be quantized.
    #[error("cannot quantize a non-finite float")]
    NonFinite,

    /// A serialized record carried a backing-engine id other than 1 (word)
    /// or 2 (arbitrary precision).
    #[error("unknown record id {0}")]
    UnknownRecordId(u8),

    /// A mode enum was rebuilt from a wire value outside its range.
    #[error("unknown mode value {0}")]
    UnknownMode(u8),

    /// A switchable in fixed-point mode was assigned a plain float.
    #[error("switchable in fixed-point mode requires a fixed-point value")]
    ModeMismatch,

    /// A bit slice selected zero bits.
    #[error("empty bit slice: [{lo}, {hi})")]
    EmptySlice { lo: u64, hi: u64 },
}
