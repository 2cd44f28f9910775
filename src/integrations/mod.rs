// src/integrations/mod.rs
//
// External integrations
//
// Everything here is INFRASTRUCTURE: clients talk to the outside world and
// return DTOs. They never touch domain storage.

pub mod calibre;

pub use calibre::{CalibreClient, CatalogSource, RemoteBook};
