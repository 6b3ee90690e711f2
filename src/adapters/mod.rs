// Adapters layer: concrete implementations of the domain ports (storage, origin lookup).

pub mod memory;
pub mod sqlite;
pub mod viacep;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use viacep::{ViaCepClient, ViaCepConfig};
