//! Domain types and ports. Nothing in here performs I/O.

pub mod gateway;
pub mod outcome;
pub mod payment;
pub mod ports;
pub mod redirect;
pub mod registration;
