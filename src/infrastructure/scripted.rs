use crate::domain::gateway::GatewayStatus;
use crate::domain::ports::PaymentGateway;
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A gateway that replays a prepared sequence of statuses per order.
///
/// Each `fetch_status` call consumes the next status for the order; the last one
/// is repeated once the sequence is exhausted. Orders without a script behave
/// like transactions the gateway has never seen.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, VecDeque<GatewayStatus>>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `status` to the script of its order.
    pub fn push(&self, status: GatewayStatus) {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts
            .entry(status.order_id.clone())
            .or_default()
            .push_back(status);
    }

    pub fn with_statuses(statuses: impl IntoIterator<Item = GatewayStatus>) -> Self {
        let gateway = Self::new();
        for status in statuses {
            gateway.push(status);
        }
        gateway
    }

    /// Total number of `fetch_status` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_status(&self, order_id: &str) -> Result<GatewayStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        let script = scripts
            .get_mut(order_id)
            .filter(|script| !script.is_empty())
            .ok_or_else(|| {
                ReconcileError::GatewayError(format!("404 transaction {} not found", order_id))
            })?;
        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        status.ok_or_else(|| {
            ReconcileError::GatewayError(format!("404 transaction {} not found", order_id))
        })
    }
}
