use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{PaymentStore, RegistrationStore};
use crate::domain::registration::{Registration, RegistrationInsert};
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct PaymentTable {
    by_id: HashMap<String, Payment>,
    /// order id -> payment id
    by_order: HashMap<String, String>,
}

/// A thread-safe in-memory store for payments.
///
/// Both indexes live behind one `RwLock`, so every read-modify-write runs under a
/// single write guard.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    table: Arc<RwLock<PaymentTable>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let mut table = self.table.write().await;
        if let Some(owner) = table.by_order.get(&payment.order_id)
            && owner != &payment.id
        {
            return Err(ReconcileError::ValidationError(format!(
                "order {} already belongs to payment {}",
                payment.order_id, owner
            )));
        }
        table
            .by_order
            .insert(payment.order_id.clone(), payment.id.clone());
        table.by_id.insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<Payment>> {
        let table = self.table.read().await;
        Ok(table.by_id.get(payment_id).cloned())
    }

    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let table = self.table.read().await;
        Ok(table
            .by_order
            .get(order_id)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn transition(&self, order_id: &str, next: PaymentStatus) -> Result<Payment> {
        let mut table = self.table.write().await;
        let payment_id = table
            .by_order
            .get(order_id)
            .cloned()
            .ok_or_else(|| ReconcileError::PaymentNotFound(order_id.to_string()))?;
        let payment = table
            .by_id
            .get_mut(&payment_id)
            .ok_or_else(|| ReconcileError::PaymentNotFound(order_id.to_string()))?;
        payment.apply_status(next)?;
        Ok(payment.clone())
    }

    async fn attach_registration(
        &self,
        payment_id: &str,
        registration_id: &str,
    ) -> Result<Payment> {
        let mut table = self.table.write().await;
        let payment = table
            .by_id
            .get_mut(payment_id)
            .ok_or_else(|| ReconcileError::PaymentNotFound(payment_id.to_string()))?;
        payment.attach_registration(registration_id)?;
        Ok(payment.clone())
    }
}

/// A thread-safe in-memory store for registrations, keyed by payment id.
///
/// Keying by payment id is what keeps registration creation at-most-once per
/// payment, whatever the callers do.
#[derive(Default, Clone)]
pub struct InMemoryRegistrationStore {
    registrations: Arc<RwLock<HashMap<String, Registration>>>,
}

impl InMemoryRegistrationStore {
    /// Creates a new, empty in-memory registration store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn insert_once(&self, registration: Registration) -> Result<RegistrationInsert> {
        let mut registrations = self.registrations.write().await;
        if let Some(existing) = registrations.get(&registration.payment_id) {
            return Ok(RegistrationInsert::Existing(existing.clone()));
        }
        registrations.insert(registration.payment_id.clone(), registration.clone());
        Ok(RegistrationInsert::Created(registration))
    }

    async fn get_by_payment(&self, payment_id: &str) -> Result<Option<Registration>> {
        let registrations = self.registrations.read().await;
        Ok(registrations.get(payment_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Registration>> {
        let registrations = self.registrations.read().await;
        Ok(registrations.values().cloned().collect())
    }
}
