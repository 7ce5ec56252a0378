//! Application layer containing the payment reconciliation orchestration.
//!
//! The backend side (`sync`, `registration`, `notification`) keeps local payment
//! records consistent with the gateway. `Reconciler` drives the redirect flow
//! against any `PaymentBackend`, either `LocalBackend` in-process or a remote
//! backend over HTTP.

pub mod backend;
pub mod notification;
pub mod poller;
pub mod reconciler;
pub mod registration;
pub mod sync;
