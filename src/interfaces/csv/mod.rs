pub mod gateway_script_reader;
pub mod payment_reader;
