pub mod config;

pub use config::{ClientConfig, Config, CredentialsConfig, DatasetResolution, DefaultsConfig};
