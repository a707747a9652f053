//! Database bootstrap: connection pool, tables, migrations

pub mod init;
pub mod migrations;

pub use init::*;
pub use migrations::*;
