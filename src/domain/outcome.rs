use super::payment::{Payment, PaymentStatus};
use serde::Serialize;

/// Why a reconciliation ended in the failed state.
#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The redirect carried no `order_id`.
    MissingOrderId,
    PaymentNotFound { order_id: String },
    /// The payment lookup itself could not be performed.
    LookupFailed { order_id: String, message: String },
    /// The payment reached a terminal state other than PAID.
    PaymentUnsuccessful { status: PaymentStatus },
    /// Polling stopped after `attempts` ticks without reaching a terminal state.
    PollingExhausted { attempts: u32 },
}

/// Observable state of a reconciliation, as a payment result page renders it.
#[derive(Debug, PartialEq, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Loading,
    Success {
        payment: Payment,
        registration_id: Option<String>,
    },
    Pending {
        payment: Payment,
    },
    Failed {
        reason: FailureReason,
        payment: Option<Payment>,
    },
}

impl FlowState {
    pub fn failed(reason: FailureReason) -> Self {
        FlowState::Failed {
            reason,
            payment: None,
        }
    }

    /// Success and failure are final; loading and pending may still change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Success { .. } | FlowState::Failed { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FlowState::Success { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FlowState::Pending { .. })
    }

    pub fn payment(&self) -> Option<&Payment> {
        match self {
            FlowState::Loading => None,
            FlowState::Success { payment, .. } | FlowState::Pending { payment } => Some(payment),
            FlowState::Failed { payment, .. } => payment.as_ref(),
        }
    }

    pub fn registration_id(&self) -> Option<&str> {
        match self {
            FlowState::Success {
                registration_id, ..
            } => registration_id.as_deref(),
            _ => None,
        }
    }
}
