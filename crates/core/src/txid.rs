//! Transaction identity codec.
//!
//! A single signed 64-bit integer encodes every phase-tagged transaction id
//! the manager hands out. Positive (and zero) values are *read ids* — stable
//! snapshot identifiers handed to readers. Negative values are *write ids* —
//! in-flight transactions, where the low two bits of the packed magnitude
//! select which phase of the prepare pipeline produced the id.
//!
//! This module is pure: no state, no I/O, just the packing contract. Callers
//! are responsible for only calling [`write_tx_counter`] and [`generate_tx_id`]
//! with write ids; both panic on misuse rather than return an error, since a
//! caller that passes a read id here has already violated an invariant no
//! recovery path should paper over.

use serde::{Deserialize, Serialize};

/// A transaction id: non-negative means a committed read snapshot, negative
/// means an in-flight write transaction (see module docs for the packing).
pub type TxId = i64;

/// Sentinel meaning "no transaction" (e.g. no write currently preparing, no
/// record found for a client). Equal to the minimum representable `i64`, so
/// it can never collide with a real write id or read id.
pub const NO_TX: TxId = i64::MIN;

/// Read id meaning "before any commit has ever happened".
pub const BEFORE_FIRST_COMMIT: TxId = 0;

/// Phase tag carried in the low two bits of a write id's packed counter.
///
/// `Open` is the phase assigned at `begin`; the other three correspond to
/// the prepare-pipeline stages that may need to hand out a distinct
/// synthetic id to a store (so validators/rectifiers/distributors can tell,
/// from the id alone, which phase is asking).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(i64)]
pub enum Phase {
    /// The transaction is in flight, before prepare begins.
    Open = 0,
    /// Validators are running (read-only across all enlisted stores).
    Validating = 1,
    /// Rectifiers are running (a store may mutate only itself).
    Rectifying = 2,
    /// Distributors are running (may mutate any store, may enlist more).
    Distributing = 3,
}

/// `true` for any committed-snapshot id (`x >= 0`).
#[inline]
pub fn is_read_tx(x: TxId) -> bool {
    x >= 0
}

/// `true` for any in-flight write id (`x < 0`). Note this also holds for
/// [`NO_TX`] — callers that need to distinguish the sentinel must check for
/// it explicitly before calling write-id-only helpers.
#[inline]
pub fn is_write_tx(x: TxId) -> bool {
    x < 0
}

#[inline]
fn is_no_tx(x: TxId) -> bool {
    x == NO_TX
}

/// Recover the monotonic counter packed into a write id, stripping the
/// phase tag.
///
/// # Panics
/// Panics if `x` is not a write id (see [`is_write_tx`]) or is [`NO_TX`].
#[inline]
pub fn write_tx_counter(x: TxId) -> i64 {
    assert!(
        is_write_tx(x) && !is_no_tx(x),
        "write_tx_counter called on a non-write id: {x}"
    );
    (-x) >> 2
}

/// Pack a counter into an `Open`-phase write id.
///
/// # Panics
/// Panics if `counter < 1`.
#[inline]
pub fn generate_write_id(counter: i64) -> TxId {
    assert!(counter >= 1, "write id counters start at 1, got {counter}");
    -(counter << 2)
}

/// Recover the phase tag from a write id.
///
/// # Panics
/// Panics if `x` is not a write id or is [`NO_TX`].
#[inline]
pub fn phase_of(x: TxId) -> Phase {
    assert!(is_write_tx(x) && !is_no_tx(x), "phase_of called on a non-write id: {x}");
    match (-x) & 0b11 {
        0 => Phase::Open,
        1 => Phase::Validating,
        2 => Phase::Rectifying,
        3 => Phase::Distributing,
        _ => unreachable!("two bits can only hold four values"),
    }
}

/// Derive a phase-tagged synthetic transaction id from a write id. Used to
/// hand validators/rectifiers/distributors a id that identifies both the
/// transaction and the pipeline phase asking, without widening the public
/// store API.
///
/// # Panics
/// Panics if `write_id` is not a write id, or if `phase` is [`Phase::Open`]
/// (the id returned by `begin` already carries that tag).
#[inline]
pub fn generate_tx_id(write_id: TxId, phase: Phase) -> TxId {
    assert!(
        is_write_tx(write_id) && !is_no_tx(write_id),
        "generate_tx_id requires a write id, got {write_id}"
    );
    assert_ne!(
        phase,
        Phase::Open,
        "generate_tx_id is only defined for non-Open phases"
    );
    let tag = phase as i64 - 1;
    -(((-write_id) & !0b11) | tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn read_write_classification() {
        assert!(is_read_tx(0));
        assert!(is_read_tx(42));
        assert!(!is_read_tx(-4));
        assert!(is_write_tx(-4));
        assert!(!is_write_tx(0));
    }

    #[test]
    fn write_id_roundtrip() {
        for counter in [1_i64, 2, 3, 1000, (1i64 << 61) - 1] {
            let w = generate_write_id(counter);
            assert!(is_write_tx(w));
            assert_eq!(write_tx_counter(w), counter);
            assert_eq!(phase_of(w), Phase::Open);
        }
    }

    #[test]
    fn phase_tagging_preserves_counter() {
        let w = generate_write_id(7);
        for phase in [Phase::Validating, Phase::Rectifying, Phase::Distributing] {
            let tagged = generate_tx_id(w, phase);
            assert!(is_write_tx(tagged));
            assert_eq!(write_tx_counter(tagged), 7);
            assert_eq!(phase_of(tagged), phase);
        }
    }

    #[test]
    #[should_panic]
    fn generate_tx_id_rejects_open() {
        let w = generate_write_id(1);
        generate_tx_id(w, Phase::Open);
    }

    #[test]
    #[should_panic]
    fn write_tx_counter_rejects_read_id() {
        write_tx_counter(5);
    }

    proptest! {
        #[test]
        fn roundtrip_any_counter(counter in 1i64..(1i64 << 61)) {
            let w = generate_write_id(counter);
            prop_assert_eq!(write_tx_counter(w), counter);
        }
    }
}
