//! Credentials for cloud-hosted model endpoints

pub mod adc;

pub use adc::AuthenticationManager;
