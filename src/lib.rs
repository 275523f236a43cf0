pub mod aggregate;
pub mod app;
pub mod catalog;
pub mod coerce;
pub mod decode;
pub mod enrich;
pub mod error;
pub mod identity;
pub mod kodik;
pub mod models;

pub use aggregate::aggregate;
pub use catalog::Catalog;
pub use decode::decode;
pub use enrich::enrich;
pub use error::{CatalogError, DecodeError};
pub use identity::canonical_key;
