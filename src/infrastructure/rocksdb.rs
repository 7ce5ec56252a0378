use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::ports::{PaymentStore, RegistrationStore};
use crate::domain::registration::{Registration, RegistrationInsert};
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payments, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping order ids to payment ids.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing registrations, keyed by payment id.
pub const CF_REGISTRATIONS: &str = "registrations";

/// A persistent store implementation using RocksDB.
///
/// Implements both `PaymentStore` and `RegistrationStore` on separate Column
/// Families. Read-modify-write operations are serialized through `write_lock`,
/// which makes `insert_once` behave like a unique constraint on the payment id.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// column families it needs.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_PAYMENTS, CF_ORDERS, CF_REGISTRATIONS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            ReconcileError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &str) -> Result<Option<T>> {
        let handle = self.cf(cf)?;
        match self.db.get_cf(handle, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf: &str, key: &str, value: &T) -> Result<()> {
        let handle = self.cf(cf)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(handle, key.as_bytes(), bytes)?;
        Ok(())
    }

    fn order_owner(&self, order_id: &str) -> Result<Option<String>> {
        let handle = self.cf(CF_ORDERS)?;
        Ok(self
            .db
            .get_cf(handle, order_id.as_bytes())?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(owner) = self.order_owner(&payment.order_id)?
            && owner != payment.id
        {
            return Err(ReconcileError::ValidationError(format!(
                "order {} already belongs to payment {}",
                payment.order_id, owner
            )));
        }
        self.write(CF_PAYMENTS, &payment.id, &payment)?;
        let orders = self.cf(CF_ORDERS)?;
        self.db
            .put_cf(orders, payment.order_id.as_bytes(), payment.id.as_bytes())?;
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, payment_id)
    }

    async fn get_by_order_id(&self, order_id: &str) -> Result<Option<Payment>> {
        match self.order_owner(order_id)? {
            Some(payment_id) => self.read(CF_PAYMENTS, &payment_id),
            None => Ok(None),
        }
    }

    async fn transition(&self, order_id: &str, next: PaymentStatus) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let mut payment: Payment = self
            .get_by_order_id(order_id)
            .await?
            .ok_or_else(|| ReconcileError::PaymentNotFound(order_id.to_string()))?;
        if payment.apply_status(next)? {
            self.write(CF_PAYMENTS, &payment.id, &payment)?;
        }
        Ok(payment)
    }

    async fn attach_registration(
        &self,
        payment_id: &str,
        registration_id: &str,
    ) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let mut payment: Payment = self
            .read(CF_PAYMENTS, payment_id)?
            .ok_or_else(|| ReconcileError::PaymentNotFound(payment_id.to_string()))?;
        payment.attach_registration(registration_id)?;
        self.write(CF_PAYMENTS, &payment.id, &payment)?;
        Ok(payment)
    }
}

#[async_trait]
impl RegistrationStore for RocksDBStore {
    async fn insert_once(&self, registration: Registration) -> Result<RegistrationInsert> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.read(CF_REGISTRATIONS, &registration.payment_id)? {
            return Ok(RegistrationInsert::Existing(existing));
        }
        self.write(CF_REGISTRATIONS, &registration.payment_id, &registration)?;
        Ok(RegistrationInsert::Created(registration))
    }

    async fn get_by_payment(&self, payment_id: &str) -> Result<Option<Registration>> {
        self.read(CF_REGISTRATIONS, payment_id)
    }

    async fn all(&self) -> Result<Vec<Registration>> {
        let handle = self.cf(CF_REGISTRATIONS)?;
        let mut registrations = Vec::new();
        for item in self.db.iterator_cf(handle, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            registrations.push(serde_json::from_slice(&value)?);
        }
        Ok(registrations)
    }
}
