pub mod api_client;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod data;
pub mod endpoints;
pub mod error;
pub mod export;
pub mod models;
pub mod transport;
pub mod utils;

pub use api_client::ServiceClient;
pub use config::{ClientConfig, DatasetResolution};
pub use credentials::Credentials;
pub use error::{PbiError, Result};
