use crate::domain::payment::PaymentStatus;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),
    #[error("Payment {payment_id} is {status}, registration requires PAID")]
    NotPaid {
        payment_id: String,
        status: PaymentStatus,
    },
    #[error("Payment for order {order_id} is already {current}, cannot move to {requested}")]
    TerminalPayment {
        order_id: String,
        current: PaymentStatus,
        requested: PaymentStatus,
    },
    #[error("Payment {payment_id} already links registration {existing}")]
    RegistrationConflict {
        payment_id: String,
        existing: String,
    },
    #[error("Gateway reported {reported} for order {order_id}, expected {expected}")]
    AmountMismatch {
        order_id: String,
        expected: Decimal,
        reported: Decimal,
    },
    #[error("Invalid notification signature for order {0}")]
    InvalidSignature(String),
    #[error("Gateway error: {0}")]
    GatewayError(String),
    #[error("Backend error: {0}")]
    BackendError(String),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
