use super::payment::Payment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A participant's registration to an event, created from a paid payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Registration {
    pub id: String,
    pub payment_id: String,
    pub event_id: String,
    pub participant_id: String,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    /// Builds a fresh registration for `payment` with a random id.
    pub fn for_payment(payment: &Payment) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payment_id: payment.id.clone(),
            event_id: payment.event_id.clone(),
            participant_id: payment.participant_id.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Result of inserting a registration into a store that keeps at most one
/// registration per payment.
#[derive(Debug, PartialEq, Clone)]
pub enum RegistrationInsert {
    Created(Registration),
    /// Another registration for the same payment was already stored.
    Existing(Registration),
}

impl RegistrationInsert {
    pub fn was_created(&self) -> bool {
        matches!(self, RegistrationInsert::Created(_))
    }

    pub fn into_inner(self) -> Registration {
        match self {
            RegistrationInsert::Created(r) | RegistrationInsert::Existing(r) => r,
        }
    }
}
