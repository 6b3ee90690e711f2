pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod http;
pub mod utils;

pub use adapters::{InMemoryStore, SqliteStore, ViaCepClient, ViaCepConfig};
pub use config::{CliConfig, ServiceConfig};
pub use crate::core::AddressService;
pub use domain::model::{AddressInput, AddressRecord, OriginLookupResult, Page, PageRequest};
pub use utils::error::{CepError, Result};
