//! Where the exporter reads tables from.
//!
//! `DatabaseConnection` is the real implementation; tests drive the exporter
//! with an in-memory source instead of a live server.

use crate::db::{DatabaseConnection, SqlValue};
use crate::error::Result;

#[allow(async_fn_in_trait)]
pub trait DumpSource {
    /// Base tables, in the order the server lists them.
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// The server's own `CREATE TABLE` text, without a trailing semicolon.
    async fn show_create_table(&mut self, table: &str) -> Result<String>;

    /// Column names in definition order.
    async fn column_names(&mut self, table: &str) -> Result<Vec<String>>;

    /// Hand every row of `table` to `on_row`, in scan order. Returns the row count.
    async fn stream_rows<F>(&mut self, table: &str, on_row: F) -> Result<u64>
    where
        F: FnMut(Vec<SqlValue>) -> Result<()>;
}

impl DumpSource for DatabaseConnection {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        DatabaseConnection::list_tables(self).await
    }

    async fn show_create_table(&mut self, table: &str) -> Result<String> {
        DatabaseConnection::show_create_table(self, table).await
    }

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        DatabaseConnection::column_names(self, table).await
    }

    async fn stream_rows<F>(&mut self, table: &str, on_row: F) -> Result<u64>
    where
        F: FnMut(Vec<SqlValue>) -> Result<()>,
    {
        DatabaseConnection::stream_rows(self, table, on_row).await
    }
}
