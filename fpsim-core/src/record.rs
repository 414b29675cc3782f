//! Wire records for fixed-point values.
//!
//! A value serializes to a small keyed record: `bid` names the backing
//! engine (1 = word, 2 = arbitrary precision), `ib`/`fb` the format, `sgn`
//! the signedness, and `sv` the stored bits — the raw two's-complement
//! pattern for `bid: 1`, the signed scaled integer for `bid: 2`.
//!
//! The loader is deliberately more liberal than the writer: a `bid: 1`
//! record wider than the local word (written by a host with a bigger word)
//! rebuilds through the arbitrary-precision engine, and either `sv` shape
//! is accepted for either `bid`. Unknown `bid` values are rejected.

use crate::bits::to_shift;
use crate::error::FpError;
use crate::format::Format;
use crate::num::{FpNum, Repr};
use num_bigint::BigInt;
use num_traits::One;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const WORD_BACKED: u8 = 1;
const BIG_BACKED: u8 = 2;

#[derive(Serialize, Deserialize)]
struct WordRecord {
    bid: u8,
    ib: i64,
    fb: i64,
    sv: u64,
    sgn: bool,
}

#[derive(Serialize, Deserialize)]
struct BigRecord {
    bid: u8,
    ib: i64,
    fb: i64,
    sv: BigInt,
    sgn: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NumRecord {
    Word(WordRecord),
    Big(BigRecord),
}

impl Serialize for FpNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.repr {
            Repr::Small(small) => WordRecord {
                bid: WORD_BACKED,
                ib: small.format().int_bits(),
                fb: small.format().frac_bits(),
                sv: small.pattern(),
                sgn: small.is_signed(),
            }
            .serialize(serializer),
            Repr::Large(large) => BigRecord {
                bid: BIG_BACKED,
                ib: large.format().int_bits(),
                fb: large.format().frac_bits(),
                sv: large.value().clone(),
                sgn: large.is_signed(),
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FpNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = NumRecord::deserialize(deserializer)?;
        rebuild(record).map_err(serde::de::Error::custom)
    }
}

fn rebuild(record: NumRecord) -> Result<FpNum, FpError> {
    let (bid, ib, fb, sgn, sv) = match record {
        NumRecord::Word(w) => (w.bid, w.ib, w.fb, w.sgn, BigInt::from(w.sv)),
        NumRecord::Big(b) => (b.bid, b.ib, b.fb, b.sgn, b.sv),
    };
    let format = Format::new(ib, fb)?;
    match bid {
        // The stored bits are the raw pattern; masking and sign extension
        // happen on adoption, and the engine follows the local word width
        // rather than the writer's.
        WORD_BACKED => Ok(FpNum::from_bit_field(sv.magnitude().clone(), format, sgn)),
        // The stored bits are the signed scaled integer. Reduce modulo the
        // field so a malformed record cannot break the range invariants.
        BIG_BACKED => {
            let modulus = BigInt::one() << to_shift(format.total_bits());
            let wrapped = ((sv % &modulus) + &modulus) % &modulus;
            Ok(FpNum::from_bit_field(
                wrapped.magnitude().clone(),
                format,
                sgn,
            ))
        }
        other => Err(FpError::UnknownRecordId(other)),
    }
}
