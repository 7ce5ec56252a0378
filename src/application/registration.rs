use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{PaymentStoreRef, RegistrationStoreRef};
use crate::domain::registration::{Registration, RegistrationInsert};
use crate::error::{ReconcileError, Result};

/// Creates the participant registration for a paid payment.
///
/// Triggering is idempotent: the registration store holds at most one
/// registration per payment, so concurrent triggers converge on the same record.
#[derive(Clone)]
pub struct RegistrationService {
    payments: PaymentStoreRef,
    registrations: RegistrationStoreRef,
}

impl RegistrationService {
    pub fn new(payments: PaymentStoreRef, registrations: RegistrationStoreRef) -> Self {
        Self {
            payments,
            registrations,
        }
    }

    pub async fn trigger(&self, payment_id: &str) -> Result<Registration> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| ReconcileError::PaymentNotFound(payment_id.to_string()))?;

        if payment.status != PaymentStatus::Paid {
            return Err(ReconcileError::NotPaid {
                payment_id: payment.id,
                status: payment.status,
            });
        }

        if let Some(linked) = &payment.registration_id {
            // Linked records may predate this store (e.g. imported payments).
            return Ok(match self.registrations.get_by_payment(payment_id).await? {
                Some(existing) => existing,
                None => Registration {
                    id: linked.clone(),
                    payment_id: payment.id.clone(),
                    event_id: payment.event_id.clone(),
                    participant_id: payment.participant_id.clone(),
                    created_at: payment.updated_at,
                },
            });
        }

        let registration = match self
            .registrations
            .insert_once(Registration::for_payment(&payment))
            .await?
        {
            RegistrationInsert::Created(r) => {
                tracing::info!(
                    payment_id,
                    registration_id = %r.id,
                    event_id = %r.event_id,
                    "registration created"
                );
                r
            }
            RegistrationInsert::Existing(r) => {
                tracing::debug!(
                    payment_id,
                    registration_id = %r.id,
                    "registration already existed"
                );
                r
            }
        };

        self.payments
            .attach_registration(payment_id, &registration.id)
            .await?;
        Ok(registration)
    }
}
