pub mod address_service;

pub use crate::domain::model::{AddressInput, AddressRecord, Page, PageRequest};
pub use crate::domain::ports::{AddressStore, OriginClient};
pub use crate::utils::error::Result;
pub use address_service::AddressService;
