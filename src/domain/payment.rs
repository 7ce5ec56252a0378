use crate::error::ReconcileError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a strictly positive monetary amount charged for a checkout.
///
/// Wraps `rust_decimal::Decimal` so that invalid amounts cannot be constructed,
/// including through deserialization.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ReconcileError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ReconcileError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ReconcileError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
    Cancelled,
}

impl PaymentStatus {
    /// Terminal statuses accept no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkout attempt correlated with the gateway through `order_id`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: String,
    /// Gateway-assigned order reference.
    pub order_id: String,
    pub amount: Amount,
    pub status: PaymentStatus,
    pub event_id: String,
    pub participant_id: String,
    /// Set once, after the participant registration is created.
    pub registration_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment in the `PENDING` state, as done when a checkout is initiated.
    pub fn new(
        id: impl Into<String>,
        order_id: impl Into<String>,
        amount: Amount,
        event_id: impl Into<String>,
        participant_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            order_id: order_id.into(),
            amount,
            status: PaymentStatus::Pending,
            event_id: event_id.into(),
            participant_id: participant_id.into(),
            registration_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the payment to `next`.
    ///
    /// Returns `Ok(false)` when the payment is already in `next`. A terminal payment
    /// never changes status again.
    pub fn apply_status(&mut self, next: PaymentStatus) -> Result<bool, ReconcileError> {
        if self.status == next {
            return Ok(false);
        }
        if self.status.is_terminal() {
            return Err(ReconcileError::TerminalPayment {
                order_id: self.order_id.clone(),
                current: self.status,
                requested: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Links the registration created for this payment. Only one registration
    /// can ever be linked; re-attaching the same id is accepted.
    pub fn attach_registration(&mut self, registration_id: &str) -> Result<(), ReconcileError> {
        if self.status != PaymentStatus::Paid {
            return Err(ReconcileError::NotPaid {
                payment_id: self.id.clone(),
                status: self.status,
            });
        }
        match &self.registration_id {
            Some(existing) if existing == registration_id => Ok(()),
            Some(existing) => Err(ReconcileError::RegistrationConflict {
                payment_id: self.id.clone(),
                existing: existing.clone(),
            }),
            None => {
                self.registration_id = Some(registration_id.to_string());
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration_id.is_some()
    }
}
