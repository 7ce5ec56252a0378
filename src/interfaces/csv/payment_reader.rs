use crate::domain::payment::{Amount, Payment, PaymentStatus};
use crate::error::{ReconcileError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a payments CSV export.
#[derive(Debug, Deserialize)]
struct PaymentRecord {
    id: String,
    order_id: String,
    amount: Decimal,
    #[serde(default)]
    status: Option<PaymentStatus>,
    event_id: String,
    participant_id: String,
    #[serde(default)]
    registration_id: Option<String>,
}

impl TryFrom<PaymentRecord> for Payment {
    type Error = ReconcileError;

    fn try_from(record: PaymentRecord) -> Result<Self> {
        let mut payment = Payment::new(
            record.id,
            record.order_id,
            Amount::new(record.amount)?,
            record.event_id,
            record.participant_id,
        );
        payment.status = record.status.unwrap_or(PaymentStatus::Pending);
        payment.registration_id = record.registration_id.filter(|id| !id.is_empty());
        Ok(payment)
    }
}

/// Reads payments from a CSV source.
///
/// Expected header: `id,order_id,amount,status,event_id,participant_id,registration_id`.
/// `status` defaults to `PENDING` and `registration_id` may be left empty.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates payments.
    pub fn payments(self) -> impl Iterator<Item = Result<Payment>> {
        self.reader
            .into_deserialize::<PaymentRecord>()
            .map(|result| result.map_err(ReconcileError::from).and_then(Payment::try_from))
    }
}
