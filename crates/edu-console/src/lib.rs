pub mod billing;
pub mod config;
pub mod crm;
pub mod documents;
pub mod error;
pub mod export;
pub mod telemetry;
