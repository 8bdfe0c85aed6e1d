use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The (order id, folio) pair that identifies one delivery across the open-orders
/// cache and the pending-sync list. Also sent to the backend as the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusinessKey {
    pub order_id: String,
    pub folio: String,
}

impl BusinessKey {
    pub fn new(order_id: impl Into<String>, folio: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            folio: folio.into(),
        }
    }

    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.order_id, self.folio)
    }
}

impl Display for BusinessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order {} / folio {}", self.order_id, self.folio)
    }
}
