pub mod connection;
pub mod value;

pub use connection::{quote_ident, ConnectionConfig, DatabaseConnection};
pub use value::SqlValue;
