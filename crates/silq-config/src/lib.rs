pub mod annotations;
pub mod config;
pub mod error;

pub use config::{Config, ConnectionConfig, ConnectorSettings};

#[cfg(test)]
pub mod test_utils;
