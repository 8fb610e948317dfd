//! Stock accounting: pure computation over available quantities.
//!
//! These functions validate and compute the new available quantity for a
//! product; they perform no IO. Persisting the result atomically with the
//! matching ledger write is the consistency gate's job (see `almox-infra`).

use almox_core::{DomainError, DomainResult};

/// Available quantity after removing `amount` from the pool.
///
/// Fails with `InsufficientStock` when `amount` exceeds `current`.
pub fn debit(current: i64, amount: i64) -> DomainResult<i64> {
    if amount > current {
        return Err(DomainError::InsufficientStock {
            requested: amount,
            available: current,
        });
    }
    Ok(current - amount)
}

/// Available quantity after returning `amount` to the pool.
///
/// No upper bound: the pool tracks availability, not a fixed cap.
pub fn credit(current: i64, amount: i64) -> i64 {
    current + amount
}

/// Available quantity after applying a signed `delta`.
///
/// `delta < 0` behaves as `debit(-delta)`, `delta > 0` as `credit(delta)`,
/// and `delta == 0` is a no-op.
pub fn adjust_by_delta(current: i64, delta: i64) -> DomainResult<i64> {
    if delta < 0 {
        debit(current, -delta)
    } else {
        Ok(credit(current, delta))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn debit_within_available_succeeds() {
        assert_eq!(debit(10, 3).unwrap(), 7);
        // Draining the pool exactly is allowed.
        assert_eq!(debit(5, 5).unwrap(), 0);
    }

    #[test]
    fn debit_beyond_available_fails() {
        let err = debit(4, 5).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 5,
                available: 4,
            }
        );
    }

    #[test]
    fn credit_has_no_upper_bound() {
        assert_eq!(credit(0, 10), 10);
        assert_eq!(credit(1_000_000, 1), 1_000_001);
    }

    #[test]
    fn zero_delta_is_a_no_op() {
        assert_eq!(adjust_by_delta(42, 0).unwrap(), 42);
    }

    #[test]
    fn adjust_matches_debit_and_credit() {
        assert_eq!(adjust_by_delta(10, -3).unwrap(), debit(10, 3).unwrap());
        assert_eq!(adjust_by_delta(10, 3).unwrap(), credit(10, 3));
        assert!(adjust_by_delta(2, -3).is_err());
    }

    proptest! {
        /// The pool can never be driven negative through `adjust_by_delta`.
        #[test]
        fn adjust_never_goes_negative(current in 0i64..1_000_000, delta in -1_000_000i64..1_000_000) {
            match adjust_by_delta(current, delta) {
                Ok(next) => prop_assert!(next >= 0),
                Err(err) => {
                    prop_assert!(delta < 0);
                    prop_assert!(matches!(err, DomainError::InsufficientStock { .. }), "expected InsufficientStock error");
                }
            }
        }

        /// Debiting and crediting the same amount restores the pool.
        #[test]
        fn debit_credit_round_trip(current in 0i64..1_000_000, amount in 0i64..1_000_000) {
            prop_assume!(amount <= current);
            let debited = debit(current, amount).unwrap();
            prop_assert_eq!(credit(debited, amount), current);
        }
    }
}
