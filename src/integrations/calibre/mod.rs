pub mod client;

pub use client::{CalibreClient, CatalogSource, RemoteBook};

#[cfg(test)]
pub use client::MockCatalogSource;
