use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, ProductId, RequestId, UserId};

/// Delivery state of a ledger entry.
///
/// Modeled as a tagged variant so that "not delivered, but carrying a
/// delivery timestamp" is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryState {
    Pending,
    Delivered { at: DateTime<Utc> },
}

impl DeliveryState {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryState::Delivered { .. })
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        match self {
            DeliveryState::Pending => None,
            DeliveryState::Delivered { at } => Some(*at),
        }
    }

    /// Rebuild the state from the persisted `delivered`/`delivered_at` column
    /// pair. A false flag with a stale timestamp normalizes to `Pending`.
    pub fn from_columns(delivered: bool, delivered_at: Option<DateTime<Utc>>) -> DomainResult<Self> {
        match (delivered, delivered_at) {
            (false, _) => Ok(DeliveryState::Pending),
            (true, Some(at)) => Ok(DeliveryState::Delivered { at }),
            (true, None) => Err(DomainError::validation(
                "delivered entry is missing its delivery timestamp",
            )),
        }
    }
}

/// A single outstanding or historical request for a quantity of a product.
///
/// Identity fields (`id`, `user_id`, `product_id`) and `created_at` are set
/// once at creation; `quantity` and `delivery` evolve through the transition
/// methods below. Every transition returns a new value; persisting it (and
/// the matching stock adjustment) is the lifecycle manager's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: RequestId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub delivery: DeliveryState,
}

impl LedgerEntry {
    /// Open a new entry in `Pending` state.
    pub fn open(
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_positive_quantity(quantity)?;
        Ok(Self {
            id: RequestId::new(),
            user_id,
            product_id,
            quantity,
            created_at,
            delivery: DeliveryState::Pending,
        })
    }

    /// Re-quantify the entry.
    ///
    /// Permitted regardless of delivery state (matches the source system:
    /// a delivered request may still be corrected).
    pub fn requantify(&self, quantity: i64) -> DomainResult<Self> {
        ensure_positive_quantity(quantity)?;
        Ok(Self { quantity, ..self.clone() })
    }

    /// Stock delta implied by re-quantifying to `new_quantity`.
    ///
    /// Positive means stock is returned to the pool, negative means more
    /// stock is consumed.
    pub fn requantify_delta(&self, new_quantity: i64) -> i64 {
        self.quantity - new_quantity
    }

    /// Transition `Pending -> Delivered`.
    pub fn mark_delivered(&self, at: DateTime<Utc>) -> DomainResult<Self> {
        if self.delivery.is_delivered() {
            return Err(DomainError::invalid_state(
                "request is already marked as delivered",
            ));
        }
        Ok(Self {
            delivery: DeliveryState::Delivered { at },
            ..self.clone()
        })
    }

    /// Transition `Delivered -> Pending`.
    pub fn cancel_delivery(&self) -> DomainResult<Self> {
        if !self.delivery.is_delivered() {
            return Err(DomainError::invalid_state(
                "request is not marked as delivered",
            ));
        }
        Ok(Self {
            delivery: DeliveryState::Pending,
            ..self.clone()
        })
    }
}

fn ensure_positive_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_entry() -> LedgerEntry {
        LedgerEntry::open(UserId::new(), ProductId::new(), 3, Utc::now()).unwrap()
    }

    #[test]
    fn open_rejects_non_positive_quantity() {
        for quantity in [0, -1] {
            let err = LedgerEntry::open(UserId::new(), ProductId::new(), quantity, Utc::now())
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn open_starts_pending() {
        let entry = test_entry();
        assert_eq!(entry.delivery, DeliveryState::Pending);
        assert_eq!(entry.delivery.delivered_at(), None);
    }

    #[test]
    fn requantify_keeps_identity_fields() {
        let entry = test_entry();
        let updated = entry.requantify(7).unwrap();
        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.user_id, entry.user_id);
        assert_eq!(updated.product_id, entry.product_id);
        assert_eq!(updated.created_at, entry.created_at);
        assert_eq!(updated.quantity, 7);
    }

    #[test]
    fn requantify_delta_sign_convention() {
        let entry = test_entry();
        // 3 -> 1 returns 2 units to the pool; 3 -> 5 consumes 2 more.
        assert_eq!(entry.requantify_delta(1), 2);
        assert_eq!(entry.requantify_delta(5), -2);
        assert_eq!(entry.requantify_delta(3), 0);
    }

    #[test]
    fn deliver_then_cancel_round_trips() {
        let entry = test_entry();
        let at = Utc::now();

        let delivered = entry.mark_delivered(at).unwrap();
        assert_eq!(delivered.delivery, DeliveryState::Delivered { at });

        let cancelled = delivered.cancel_delivery().unwrap();
        assert_eq!(cancelled.delivery, DeliveryState::Pending);
        // Everything except the delivery state is back to the original.
        assert_eq!(cancelled, entry);
    }

    #[test]
    fn mark_delivered_twice_is_invalid() {
        let delivered = test_entry().mark_delivered(Utc::now()).unwrap();
        let err = delivered.mark_delivered(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn cancel_delivery_requires_delivered() {
        let entry = test_entry();
        let err = entry.cancel_delivery().unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        // Cancelling twice fails the second time without changing state.
        let delivered = entry.mark_delivered(Utc::now()).unwrap();
        let cancelled = delivered.cancel_delivery().unwrap();
        let err = cancelled.cancel_delivery().unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(cancelled.delivery, DeliveryState::Pending);
    }

    #[test]
    fn from_columns_rejects_delivered_without_timestamp() {
        assert!(DeliveryState::from_columns(true, None).is_err());
        assert_eq!(
            DeliveryState::from_columns(false, None).unwrap(),
            DeliveryState::Pending
        );

        let at = Utc::now();
        assert_eq!(
            DeliveryState::from_columns(true, Some(at)).unwrap(),
            DeliveryState::Delivered { at }
        );
        // A stale timestamp with the flag cleared normalizes to Pending.
        assert_eq!(
            DeliveryState::from_columns(false, Some(at)).unwrap(),
            DeliveryState::Pending
        );
    }
}
