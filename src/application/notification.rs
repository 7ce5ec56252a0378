use super::registration::RegistrationService;
use super::sync::PaymentSyncService;
use crate::domain::gateway::{FraudStatus, GatewayStatus, TransactionStatus};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::error::{ReconcileError, Result};
use serde::Deserialize;
use sha2::{Digest, Sha512};

/// HTTP notification the gateway posts when a transaction changes state.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayNotification {
    pub order_id: String,
    pub status_code: String,
    /// Kept verbatim: the signature covers the exact string the gateway sent.
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: TransactionStatus,
    #[serde(default)]
    pub fraud_status: Option<FraudStatus>,
}

impl GatewayNotification {
    /// `hex(sha512(order_id + status_code + gross_amount + server_key))`
    pub fn expected_signature(&self, server_key: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(self.order_id.as_bytes());
        hasher.update(self.status_code.as_bytes());
        hasher.update(self.gross_amount.as_bytes());
        hasher.update(server_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify(&self, server_key: &str) -> bool {
        self.expected_signature(server_key)
            .eq_ignore_ascii_case(self.signature_key.trim())
    }

    pub fn to_gateway_status(&self) -> Result<GatewayStatus> {
        let gross_amount = self.gross_amount.trim().parse().map_err(|e| {
            ReconcileError::ValidationError(format!(
                "invalid gross_amount {:?}: {}",
                self.gross_amount, e
            ))
        })?;
        Ok(GatewayStatus {
            order_id: self.order_id.clone(),
            transaction_status: self.transaction_status.clone(),
            fraud_status: self.fraud_status,
            status_code: Some(self.status_code.clone()),
            gross_amount: Some(gross_amount),
        })
    }
}

/// Applies gateway notifications and creates the registration once a payment is paid.
///
/// This is the asynchronous path the redirect reconciliation races with; both
/// go through the same idempotent registration trigger.
#[derive(Clone)]
pub struct NotificationHandler {
    sync: PaymentSyncService,
    registrations: RegistrationService,
    server_key: Option<String>,
}

impl NotificationHandler {
    pub fn new(
        sync: PaymentSyncService,
        registrations: RegistrationService,
        server_key: Option<String>,
    ) -> Self {
        Self {
            sync,
            registrations,
            server_key: server_key.filter(|k| !k.is_empty()),
        }
    }

    pub async fn handle(&self, notification: &GatewayNotification) -> Result<Payment> {
        if let Some(key) = &self.server_key
            && !notification.verify(key)
        {
            tracing::warn!(
                order_id = %notification.order_id,
                "rejecting notification with invalid signature"
            );
            return Err(ReconcileError::InvalidSignature(
                notification.order_id.clone(),
            ));
        }

        let reported = notification.to_gateway_status()?;
        let payment = self.sync.apply_gateway_status(&reported).await?;

        if payment.status == PaymentStatus::Paid && !payment.is_registered() {
            let registration = self.registrations.trigger(&payment.id).await?;
            tracing::info!(
                order_id = %payment.order_id,
                registration_id = %registration.id,
                "registration created from gateway notification"
            );
            return Ok(Payment {
                registration_id: Some(registration.id),
                ..payment
            });
        }
        Ok(payment)
    }
}
