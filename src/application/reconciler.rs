use super::poller::PollHandle;
use crate::config::{HintPolicy, PollPolicy, ReconcileConfig};
use crate::domain::outcome::{FailureReason, FlowState};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::PaymentBackendRef;
use crate::domain::redirect::RedirectParams;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Outcome of a single poll tick.
enum Tick {
    Observed(Payment),
    /// The payment no longer exists locally.
    Missing,
    /// Transport failure; try again on the next tick.
    Retry,
}

/// Determines the authoritative status of a payment after the gateway redirect
/// and makes sure a paid payment ends up with a registration.
#[derive(Clone)]
pub struct Reconciler {
    backend: PaymentBackendRef,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(backend: PaymentBackendRef, config: ReconcileConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Single pass over the redirect: best-effort sync, lookup, classification and,
    /// for paid payments, the registration trigger. Never polls.
    pub async fn evaluate(&self, params: &RedirectParams) -> FlowState {
        let Some(order_id) = params.order_id.as_deref() else {
            tracing::warn!("redirect carried no order_id");
            return FlowState::failed(FailureReason::MissingOrderId);
        };

        if params.hints_success()
            && let Err(e) = self.backend.sync_payment_status(order_id).await
        {
            tracing::warn!(order_id, error = %e, "best-effort payment sync failed");
        }

        let payment = match self.backend.get_payment_by_order_id(order_id).await {
            Ok(Some(payment)) => payment,
            Ok(None) => {
                tracing::warn!(order_id, "no payment recorded for order");
                return FlowState::failed(FailureReason::PaymentNotFound {
                    order_id: order_id.to_string(),
                });
            }
            Err(e) => {
                tracing::error!(order_id, error = %e, "payment lookup failed");
                return FlowState::failed(FailureReason::LookupFailed {
                    order_id: order_id.to_string(),
                    message: e.to_string(),
                });
            }
        };

        self.classify(payment, params).await
    }

    async fn classify(&self, payment: Payment, params: &RedirectParams) -> FlowState {
        let trusted_hint =
            params.hints_success() && self.config.hint_policy == HintPolicy::Trust;

        if trusted_hint || payment.status == PaymentStatus::Paid {
            self.succeed(payment).await
        } else if payment.status == PaymentStatus::Pending || params.hints_pending() {
            FlowState::Pending { payment }
        } else {
            FlowState::Failed {
                reason: FailureReason::PaymentUnsuccessful {
                    status: payment.status,
                },
                payment: Some(payment),
            }
        }
    }

    /// SUCCESS branch. Registration is triggered only when the payment has none;
    /// a failed trigger is reported but does not fail the flow.
    async fn succeed(&self, mut payment: Payment) -> FlowState {
        if let Some(registration_id) = payment.registration_id.clone() {
            return FlowState::Success {
                payment,
                registration_id: Some(registration_id),
            };
        }

        match self.backend.trigger_registration(&payment.id).await {
            Ok(registration) => {
                tracing::info!(
                    order_id = %payment.order_id,
                    registration_id = %registration.id,
                    "registration ensured"
                );
                payment.registration_id = Some(registration.id.clone());
                FlowState::Success {
                    payment,
                    registration_id: Some(registration.id),
                }
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %payment.order_id,
                    error = %e,
                    "registration trigger failed, assuming it is created elsewhere"
                );
                FlowState::Success {
                    payment,
                    registration_id: None,
                }
            }
        }
    }

    /// Evaluates the redirect and keeps polling while the payment is pending.
    ///
    /// Returns the last observed state when `cancel` fires.
    pub async fn run(&self, params: &RedirectParams, cancel: &CancellationToken) -> FlowState {
        self.drive(params, cancel, None).await
    }

    /// Runs the reconciliation on a background task.
    pub fn spawn(&self, params: RedirectParams) -> PollHandle {
        PollHandle::spawn(self.clone(), params)
    }

    pub(crate) async fn drive(
        &self,
        params: &RedirectParams,
        cancel: &CancellationToken,
        updates: Option<&watch::Sender<FlowState>>,
    ) -> FlowState {
        let publish = |state: &FlowState| {
            if let Some(tx) = updates {
                tx.send_replace(state.clone());
            }
        };

        let state = self.evaluate(params).await;
        publish(&state);

        let FlowState::Pending { payment } = state else {
            return state;
        };

        let state = self.poll(payment, cancel, &publish).await;
        publish(&state);
        state
    }

    async fn poll(
        &self,
        mut payment: Payment,
        cancel: &CancellationToken,
        publish: &(dyn Fn(&FlowState) + Send + Sync),
    ) -> FlowState {
        let policy = self.config.poll;
        let order_id = payment.order_id.clone();
        // `interval_at` panics on a zero period.
        let period = policy.interval.max(PollPolicy::MIN_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        // Ticks run one after another on this task; a slow tick delays the next one.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=policy.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(order_id = %order_id, attempt, "polling cancelled");
                    return FlowState::Pending { payment };
                }
                _ = ticker.tick() => {}
            }

            let tick = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(order_id = %order_id, attempt, "polling cancelled mid-tick");
                    return FlowState::Pending { payment };
                }
                result = tokio::time::timeout(policy.tick_timeout, self.tick(&order_id)) => result,
            };

            let observed = match tick {
                Err(_) => {
                    tracing::warn!(order_id = %order_id, attempt, "poll tick timed out");
                    continue;
                }
                Ok(Tick::Retry) => continue,
                Ok(Tick::Missing) => {
                    return FlowState::failed(FailureReason::PaymentNotFound { order_id });
                }
                Ok(Tick::Observed(observed)) => observed,
            };

            tracing::debug!(
                order_id = %order_id,
                attempt,
                status = %observed.status,
                "poll tick"
            );

            match observed.status {
                PaymentStatus::Pending => {
                    if observed != payment {
                        payment = observed;
                        publish(&FlowState::Pending {
                            payment: payment.clone(),
                        });
                    }
                }
                PaymentStatus::Paid => return self.succeed(observed).await,
                status => {
                    return FlowState::Failed {
                        reason: FailureReason::PaymentUnsuccessful { status },
                        payment: Some(observed),
                    };
                }
            }
        }

        tracing::warn!(
            order_id = %order_id,
            attempts = policy.max_attempts,
            "payment still pending, giving up polling"
        );
        FlowState::Failed {
            reason: FailureReason::PollingExhausted {
                attempts: policy.max_attempts,
            },
            payment: Some(payment),
        }
    }

    async fn tick(&self, order_id: &str) -> Tick {
        if let Err(e) = self.backend.sync_payment_status(order_id).await {
            tracing::debug!(order_id, error = %e, "sync failed, retrying next tick");
        }
        match self.backend.get_payment_by_order_id(order_id).await {
            Ok(Some(payment)) => Tick::Observed(payment),
            Ok(None) => Tick::Missing,
            Err(e) => {
                tracing::warn!(order_id, error = %e, "lookup failed, retrying next tick");
                Tick::Retry
            }
        }
    }
}
