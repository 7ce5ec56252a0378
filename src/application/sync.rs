use crate::domain::gateway::GatewayStatus;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{PaymentGatewayRef, PaymentStoreRef};
use crate::error::{ReconcileError, Result};

/// Brings local payment records in line with the gateway's view of the transaction.
#[derive(Clone)]
pub struct PaymentSyncService {
    payments: PaymentStoreRef,
    gateway: PaymentGatewayRef,
}

impl PaymentSyncService {
    pub fn new(payments: PaymentStoreRef, gateway: PaymentGatewayRef) -> Self {
        Self { payments, gateway }
    }

    /// Queries the gateway for `order_id` and applies the result locally.
    ///
    /// Terminal payments are returned without contacting the gateway.
    pub async fn sync(&self, order_id: &str) -> Result<Payment> {
        let payment = self
            .payments
            .get_by_order_id(order_id)
            .await?
            .ok_or_else(|| ReconcileError::PaymentNotFound(order_id.to_string()))?;

        if payment.status.is_terminal() {
            return Ok(payment);
        }

        let reported = self.gateway.fetch_status(order_id).await?;
        self.apply(payment, &reported).await
    }

    /// Applies a status reported by the gateway, through sync or a notification.
    pub async fn apply_gateway_status(&self, reported: &GatewayStatus) -> Result<Payment> {
        let payment = self
            .payments
            .get_by_order_id(&reported.order_id)
            .await?
            .ok_or_else(|| ReconcileError::PaymentNotFound(reported.order_id.clone()))?;
        self.apply(payment, reported).await
    }

    async fn apply(&self, payment: Payment, reported: &GatewayStatus) -> Result<Payment> {
        let Some(next) = reported.payment_status() else {
            tracing::info!(
                order_id = %payment.order_id,
                gateway = self.gateway.name(),
                transaction_status = %reported.transaction_status,
                "gateway status has no local meaning, leaving payment untouched"
            );
            return Ok(payment);
        };

        if next == payment.status {
            return Ok(payment);
        }

        // Late or redelivered reports never touch a settled record, whatever amount they carry.
        if payment.status.is_terminal() {
            tracing::warn!(
                order_id = %payment.order_id,
                current = %payment.status,
                requested = %next,
                "payment already terminal, ignoring gateway status"
            );
            return Ok(payment);
        }

        if let Some(gross) = reported.gross_amount
            && gross != payment.amount.value()
        {
            tracing::warn!(
                order_id = %payment.order_id,
                expected = %payment.amount.value(),
                reported = %gross,
                "gateway amount does not match local payment"
            );
            return Err(ReconcileError::AmountMismatch {
                order_id: payment.order_id.clone(),
                expected: payment.amount.value(),
                reported: gross,
            });
        }

        match self.payments.transition(&payment.order_id, next).await {
            Ok(updated) => {
                tracing::info!(
                    order_id = %updated.order_id,
                    from = %payment.status,
                    to = %updated.status,
                    "payment status updated"
                );
                Ok(updated)
            }
            // Another writer moved the payment to a terminal state first; that state stands.
            Err(ReconcileError::TerminalPayment { current, .. }) => {
                tracing::warn!(
                    order_id = %payment.order_id,
                    current = %current,
                    requested = %next,
                    "payment already terminal, ignoring gateway status"
                );
                self.payments
                    .get_by_order_id(&payment.order_id)
                    .await?
                    .ok_or_else(|| ReconcileError::PaymentNotFound(payment.order_id.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Current local status, synced first. Convenience for callers that only need
    /// the status.
    pub async fn sync_status(&self, order_id: &str) -> Result<PaymentStatus> {
        Ok(self.sync(order_id).await?.status)
    }
}
