use super::gateway::GatewayStatus;
use super::payment::{Payment, PaymentStatus};
use super::registration::{Registration, RegistrationInsert};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Local payment records keyed by payment id and indexed by order id.
///
/// `transition` and `attach_registration` are read-modify-write operations and
/// must be atomic with respect to each other.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<()>;
    async fn get(&self, payment_id: &str) -> Result<Option<Payment>>;
    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Payment>>;
    async fn transition(&self, order_id: &str, next: PaymentStatus) -> Result<Payment>;
    async fn attach_registration(&self, payment_id: &str, registration_id: &str)
    -> Result<Payment>;
}

/// Registrations, at most one per payment.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Stores `registration` unless one already exists for its payment, in which
    /// case the stored one is returned untouched.
    async fn insert_once(&self, registration: Registration) -> Result<RegistrationInsert>;
    async fn get_by_payment(&self, payment_id: &str) -> Result<Option<Registration>>;
    async fn all(&self) -> Result<Vec<Registration>>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_status(&self, order_id: &str) -> Result<GatewayStatus>;
}

/// Operations the reconciliation flow consumes from the payment backend.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn get_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>>;
    async fn sync_payment_status(&self, order_id: &str) -> Result<PaymentStatus>;
    async fn trigger_registration(&self, payment_id: &str) -> Result<Registration>;
}

pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type RegistrationStoreRef = Arc<dyn RegistrationStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type PaymentBackendRef = Arc<dyn PaymentBackend>;
