use super::payment::PaymentStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `transaction_status` vocabulary used by the gateway.
///
/// Values outside the known set are kept verbatim and treated as untrusted.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Capture,
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
    Failure,
    Other(String),
}

impl From<&str> for TransactionStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "capture" => TransactionStatus::Capture,
            "settlement" => TransactionStatus::Settlement,
            "pending" => TransactionStatus::Pending,
            "deny" => TransactionStatus::Deny,
            "cancel" => TransactionStatus::Cancel,
            "expire" => TransactionStatus::Expire,
            "failure" => TransactionStatus::Failure,
            _ => TransactionStatus::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        TransactionStatus::from(value.as_str())
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Capture => "capture",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Failure => "failure",
            TransactionStatus::Other(other) => other,
        };
        f.write_str(s)
    }
}

impl TransactionStatus {
    /// `capture` and `settlement` mean the customer completed the payment.
    pub fn indicates_success(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Capture | TransactionStatus::Settlement
        )
    }

    pub fn indicates_pending(&self) -> bool {
        matches!(self, TransactionStatus::Pending)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
}

/// Authoritative status of a transaction as reported by the gateway.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub order_id: String,
    pub transaction_status: TransactionStatus,
    #[serde(default)]
    pub fraud_status: Option<FraudStatus>,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub gross_amount: Option<Decimal>,
}

impl GatewayStatus {
    pub fn new(order_id: impl Into<String>, transaction_status: TransactionStatus) -> Self {
        Self {
            order_id: order_id.into(),
            transaction_status,
            fraud_status: None,
            status_code: None,
            gross_amount: None,
        }
    }

    /// Local status this gateway status maps to, or `None` when the gateway
    /// status carries no meaning for the local record (refunds, unknown values).
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        match &self.transaction_status {
            TransactionStatus::Capture => match self.fraud_status {
                None | Some(FraudStatus::Accept) => Some(PaymentStatus::Paid),
                Some(FraudStatus::Challenge) => Some(PaymentStatus::Pending),
                Some(FraudStatus::Deny) => Some(PaymentStatus::Failed),
            },
            TransactionStatus::Settlement => Some(PaymentStatus::Paid),
            TransactionStatus::Pending => Some(PaymentStatus::Pending),
            TransactionStatus::Deny | TransactionStatus::Failure => Some(PaymentStatus::Failed),
            TransactionStatus::Expire => Some(PaymentStatus::Expired),
            TransactionStatus::Cancel => Some(PaymentStatus::Cancelled),
            TransactionStatus::Other(_) => None,
        }
    }
}
