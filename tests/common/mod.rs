#![allow(dead_code)]

use async_trait::async_trait;
use paysync::application::backend::LocalBackend;
use paysync::config::{HintPolicy, PollPolicy, ReconcileConfig};
use paysync::domain::gateway::{GatewayStatus, TransactionStatus};
use paysync::domain::payment::{Amount, Payment, PaymentStatus};
use paysync::domain::ports::{PaymentBackend, PaymentStore};
use paysync::domain::registration::Registration;
use paysync::error::{ReconcileError, Result};
use paysync::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryRegistrationStore};
use paysync::infrastructure::scripted::ScriptedGateway;
use rust_decimal_macros::dec;
use std::io::Write;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;

pub fn payment(id: &str, order_id: &str) -> Payment {
    Payment::new(
        id,
        order_id,
        Amount::new(dec!(150000)).unwrap(),
        "evt-42",
        "usr-7",
    )
}

pub fn gateway_status(order_id: &str, status: &str) -> GatewayStatus {
    GatewayStatus::new(order_id, TransactionStatus::from(status))
}

pub fn fast_config() -> ReconcileConfig {
    ReconcileConfig {
        poll: PollPolicy {
            interval: Duration::from_millis(5),
            max_attempts: 50,
            tick_timeout: Duration::from_millis(500),
        },
        hint_policy: HintPolicy::Trust,
    }
}

/// Wraps a backend and counts every call. Failures, slow syncs and a payment
/// that disappears can be injected.
pub struct CountingBackend {
    inner: Arc<dyn PaymentBackend>,
    pub lookups: AtomicUsize,
    pub syncs: AtomicUsize,
    pub triggers: AtomicUsize,
    failing_syncs: AtomicUsize,
    slow_syncs: AtomicUsize,
    sync_delay: Mutex<Duration>,
    /// Lookups numbered in this half-open range fail.
    failing_lookups: Mutex<Range<usize>>,
    /// Lookups after this many report the payment as absent.
    vanish_after: AtomicUsize,
}

impl CountingBackend {
    pub fn new(inner: Arc<dyn PaymentBackend>) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
            syncs: AtomicUsize::new(0),
            triggers: AtomicUsize::new(0),
            failing_syncs: AtomicUsize::new(0),
            slow_syncs: AtomicUsize::new(0),
            sync_delay: Mutex::new(Duration::ZERO),
            failing_lookups: Mutex::new(0..0),
            vanish_after: AtomicUsize::new(usize::MAX),
        }
    }

    /// Makes the next `n` sync calls fail as if the network dropped.
    pub fn fail_next_syncs(&self, n: usize) {
        self.failing_syncs.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` sync calls take `delay` before reaching the backend.
    pub fn slow_next_syncs(&self, n: usize, delay: Duration) {
        *self.sync_delay.lock().unwrap() = delay;
        self.slow_syncs.store(n, Ordering::SeqCst);
    }

    /// Lets `skip` lookups through, then fails the following `n`.
    pub fn fail_lookups(&self, skip: usize, n: usize) {
        let start = self.lookups.load(Ordering::SeqCst) + skip + 1;
        *self.failing_lookups.lock().unwrap() = start..start + n;
    }

    /// Reports the payment as gone once `n` more lookups have been served.
    pub fn vanish_after_lookups(&self, n: usize) {
        let served = self.lookups.load(Ordering::SeqCst);
        self.vanish_after.store(served + n, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentBackend for CountingBackend {
    async fn get_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let n = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_lookups.lock().unwrap().contains(&n) {
            return Err(ReconcileError::BackendError("lookup timed out".to_string()));
        }
        if n > self.vanish_after.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get_payment_by_order_id(order_id).await
    }

    async fn sync_payment_status(&self, order_id: &str) -> Result<PaymentStatus> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_syncs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(ReconcileError::BackendError("connection reset".to_string()));
        }
        let slow = self
            .slow_syncs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if slow.is_ok() {
            let delay = *self.sync_delay.lock().unwrap();
            tokio::time::sleep(delay).await;
        }
        self.inner.sync_payment_status(order_id).await
    }

    async fn trigger_registration(&self, payment_id: &str) -> Result<Registration> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        self.inner.trigger_registration(payment_id).await
    }
}

/// An in-process backend over in-memory stores and a scripted gateway.
pub struct Harness {
    pub payments: InMemoryPaymentStore,
    pub registrations: InMemoryRegistrationStore,
    pub gateway: Arc<ScriptedGateway>,
    pub backend: Arc<CountingBackend>,
}

impl Harness {
    pub async fn new(seed: Vec<Payment>, statuses: Vec<GatewayStatus>) -> Self {
        let payments = InMemoryPaymentStore::new();
        for p in seed {
            payments.insert(p).await.unwrap();
        }
        let registrations = InMemoryRegistrationStore::new();
        let gateway = Arc::new(ScriptedGateway::with_statuses(statuses));
        let local = LocalBackend::new(
            Arc::new(payments.clone()),
            Arc::new(registrations.clone()),
            gateway.clone(),
        );
        Self {
            payments,
            registrations,
            gateway,
            backend: Arc::new(CountingBackend::new(Arc::new(local))),
        }
    }
}

pub fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

pub const PAYMENTS_HEADER: &str =
    "id, order_id, amount, status, event_id, participant_id, registration_id";
pub const SCRIPT_HEADER: &str = "order_id, transaction_status, fraud_status, gross_amount";
