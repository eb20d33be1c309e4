// Database service module
// SQLite connection and schema for the demo appointment store

mod connection;
pub mod migrations;
mod schema;

pub use connection::Database;
