// src/db/mod.rs
//
// Database module
//
// Provides:
// - Connection pooling
// - Schema migrations

pub mod connection;
pub mod migrations;

pub use connection::{
    create_connection_pool, database_path, ConnectionPool, PooledConn,
};

pub use migrations::initialize_database;

#[cfg(test)]
pub use connection::create_test_pool;
