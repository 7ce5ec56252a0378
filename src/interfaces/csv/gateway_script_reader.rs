use crate::domain::gateway::{FraudStatus, GatewayStatus, TransactionStatus};
use crate::error::{ReconcileError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct ScriptRecord {
    order_id: String,
    transaction_status: String,
    #[serde(default)]
    fraud_status: Option<FraudStatus>,
    #[serde(default)]
    gross_amount: Option<Decimal>,
}

/// Reads scripted gateway answers, one status per row, in the order the gateway
/// should report them.
///
/// Expected header: `order_id,transaction_status,fraud_status,gross_amount`.
pub struct GatewayScriptReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> GatewayScriptReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn statuses(self) -> impl Iterator<Item = Result<GatewayStatus>> {
        self.reader.into_deserialize::<ScriptRecord>().map(|result| {
            let record = result.map_err(ReconcileError::from)?;
            Ok(GatewayStatus {
                order_id: record.order_id,
                transaction_status: TransactionStatus::from(record.transaction_status),
                fraud_status: record.fraud_status,
                status_code: None,
                gross_amount: record.gross_amount,
            })
        })
    }
}
