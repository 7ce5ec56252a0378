use super::registration::RegistrationService;
use super::sync::PaymentSyncService;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{
    PaymentBackend, PaymentGatewayRef, PaymentStoreRef, RegistrationStoreRef,
};
use crate::domain::registration::Registration;
use crate::error::Result;
use async_trait::async_trait;

/// In-process `PaymentBackend` wired directly to the stores and the gateway.
#[derive(Clone)]
pub struct LocalBackend {
    payments: PaymentStoreRef,
    sync: PaymentSyncService,
    registrations: RegistrationService,
}

impl LocalBackend {
    pub fn new(
        payments: PaymentStoreRef,
        registrations: RegistrationStoreRef,
        gateway: PaymentGatewayRef,
    ) -> Self {
        Self {
            sync: PaymentSyncService::new(payments.clone(), gateway),
            registrations: RegistrationService::new(payments.clone(), registrations),
            payments,
        }
    }

    pub fn sync_service(&self) -> &PaymentSyncService {
        &self.sync
    }

    pub fn registration_service(&self) -> &RegistrationService {
        &self.registrations
    }
}

#[async_trait]
impl PaymentBackend for LocalBackend {
    async fn get_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        self.payments.get_by_order_id(order_id).await
    }

    async fn sync_payment_status(&self, order_id: &str) -> Result<PaymentStatus> {
        self.sync.sync_status(order_id).await
    }

    async fn trigger_registration(&self, payment_id: &str) -> Result<Registration> {
        self.registrations.trigger(payment_id).await
    }
}
