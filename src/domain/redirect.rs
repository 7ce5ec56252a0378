use super::gateway::TransactionStatus;
use crate::error::{ReconcileError, Result};
use serde::{Deserialize, Serialize};

/// Query parameters the gateway appends when redirecting the customer back.
///
/// Only `order_id` is required. `status_code` and `transaction_status` are hints:
/// the authoritative status is always re-read from the local payment record.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct RedirectParams {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status_code: Option<String>,
    #[serde(default)]
    pub transaction_status: Option<TransactionStatus>,
}

impl RedirectParams {
    /// Parses a redirect query string (`order_id=...&transaction_status=...`) or a
    /// full URL carrying one.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let query = if input.contains("://") || input.starts_with('/') {
            let without_fragment = input.split('#').next().unwrap_or_default();
            without_fragment
                .split_once('?')
                .map_or("", |(_, query)| query)
        } else {
            input.strip_prefix('?').unwrap_or(input)
        };

        let mut params: RedirectParams = serde_urlencoded::from_str(query)
            .map_err(|e| ReconcileError::InvalidRedirect(e.to_string()))?;

        params.order_id = params
            .order_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        if matches!(&params.transaction_status, Some(TransactionStatus::Other(s)) if s.is_empty()) {
            params.transaction_status = None;
        }
        Ok(params)
    }

    pub fn for_order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn with_transaction_status(mut self, status: impl Into<TransactionStatus>) -> Self {
        self.transaction_status = Some(status.into());
        self
    }

    pub fn hints_success(&self) -> bool {
        self.transaction_status
            .as_ref()
            .is_some_and(TransactionStatus::indicates_success)
    }

    pub fn hints_pending(&self) -> bool {
        self.transaction_status
            .as_ref()
            .is_some_and(TransactionStatus::indicates_pending)
    }
}
