use crate::domain::payment::{Amount, Payment, PaymentStatus};
use crate::domain::ports::PaymentBackend;
use crate::domain::registration::Registration;
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemotePayment {
    id: String,
    order_id: String,
    amount: Decimal,
    status: PaymentStatus,
    #[serde(default)]
    event_id: String,
    #[serde(default, alias = "userId")]
    participant_id: String,
    #[serde(default)]
    registration_id: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<RemotePayment> for Payment {
    type Error = ReconcileError;

    fn try_from(remote: RemotePayment) -> Result<Self> {
        let created_at = remote.created_at.unwrap_or_else(Utc::now);
        Ok(Payment {
            id: remote.id,
            order_id: remote.order_id,
            amount: Amount::new(remote.amount)?,
            status: remote.status,
            event_id: remote.event_id,
            participant_id: remote.participant_id,
            registration_id: remote.registration_id,
            created_at,
            updated_at: remote.updated_at.unwrap_or(created_at),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteRegistration {
    id: String,
    #[serde(default)]
    payment_id: Option<String>,
    #[serde(default)]
    event_id: String,
    #[serde(default, alias = "userId")]
    participant_id: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    success: bool,
    #[serde(default)]
    payment: Option<RemotePayment>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncResponse {
    success: bool,
    #[serde(default)]
    payment_status: Option<PaymentStatus>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    success: bool,
    #[serde(default)]
    registration: Option<RemoteRegistration>,
    #[serde(default)]
    message: Option<String>,
}

/// `PaymentBackend` over the platform's REST API.
///
/// Every endpoint answers with a `{ "success": bool, ... }` envelope.
pub struct HttpBackend {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout: Duration::from_secs(10),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.timeout(self.timeout);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Appends `segments` to the path of `base`, percent-encoding each one so ids
/// containing `/`, `?` or `#` stay inside their segment.
pub(crate) fn endpoint_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| ReconcileError::ValidationError(format!("invalid base url {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| ReconcileError::ValidationError(format!("invalid base url {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn failure(message: Option<String>, fallback: &str) -> ReconcileError {
    ReconcileError::BackendError(message.unwrap_or_else(|| fallback.to_string()))
}

#[async_trait]
impl PaymentBackend for HttpBackend {
    async fn get_payment_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        let url = endpoint_url(&self.base_url, &["payments", "order", order_id])?;
        let resp = self.request(self.client.get(url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        let body: LookupResponse = resp.json().await?;
        match (body.success, body.payment) {
            (true, Some(payment)) => Ok(Some(payment.try_into()?)),
            (_, None) => Ok(None),
            (false, Some(_)) => Err(failure(body.message, "payment lookup failed")),
        }
    }

    async fn sync_payment_status(&self, order_id: &str) -> Result<PaymentStatus> {
        let url = endpoint_url(&self.base_url, &["payments", "sync", order_id])?;
        let resp = self
            .request(self.client.post(url))
            .send()
            .await?
            .error_for_status()?;
        let body: SyncResponse = resp.json().await?;
        match (body.success, body.payment_status) {
            (true, Some(status)) => Ok(status),
            _ => Err(failure(body.message, "payment sync failed")),
        }
    }

    async fn trigger_registration(&self, payment_id: &str) -> Result<Registration> {
        let url = endpoint_url(&self.base_url, &["payments", payment_id, "registration"])?;
        let resp = self
            .request(self.client.post(url))
            .send()
            .await?
            .error_for_status()?;
        let body: TriggerResponse = resp.json().await?;
        match (body.success, body.registration) {
            (true, Some(remote)) => Ok(Registration {
                id: remote.id,
                payment_id: remote.payment_id.unwrap_or_else(|| payment_id.to_string()),
                event_id: remote.event_id,
                participant_id: remote.participant_id,
                created_at: remote.created_at.unwrap_or_else(Utc::now),
            }),
            _ => Err(failure(body.message, "registration trigger failed")),
        }
    }
}
