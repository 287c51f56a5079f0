use crate::error::{BackupError, Result};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, Row};
use tracing::debug;

use super::value::{decode_row, text_at};
use super::SqlValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub charset: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            database: "fba".to_string(),
            charset: "utf8mb4".to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
            .charset(&self.charset)
    }
}

/// A single MySQL session owned by one backup run.
pub struct DatabaseConnection {
    conn: MySqlConnection,
}

impl DatabaseConnection {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let conn = MySqlConnection::connect_with(&config.connect_options())
            .await
            .map_err(BackupError::ConnectionFailed)?;
        Ok(Self { conn })
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    pub async fn list_tables(&mut self) -> Result<Vec<String>> {
        let rows: Vec<MySqlRow> = sqlx::query("SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'")
            .fetch_all(&mut self.conn)
            .await?;
        rows.iter().map(|row| text_at(row, 0)).collect()
    }

    pub async fn show_create_table(&mut self, table: &str) -> Result<String> {
        let sql = format!("SHOW CREATE TABLE {}", quote_ident(table));
        let row = sqlx::query(&sql).fetch_one(&mut self.conn).await?;
        text_at(&row, 1)
    }

    pub async fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        let sql = format!("SHOW COLUMNS FROM {}", quote_ident(table));
        let rows = sqlx::query(&sql).fetch_all(&mut self.conn).await?;
        rows.iter().map(|row| text_at(row, 0)).collect()
    }

    /// Full scan of `table`, handing each decoded row to `on_row` as it
    /// arrives. Returns the number of rows read.
    pub async fn stream_rows<F>(&mut self, table: &str, mut on_row: F) -> Result<u64>
    where
        F: FnMut(Vec<SqlValue>) -> Result<()>,
    {
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        debug!(%sql, "streaming rows");

        let mut stream = sqlx::query(&sql).fetch(&mut self.conn);
        let mut count = 0u64;
        while let Some(row) = stream.try_next().await? {
            on_row(decode_row(&row)?)?;
            count += 1;
        }
        Ok(count)
    }

    pub async fn server_version(&mut self) -> Result<String> {
        let row = sqlx::query("SELECT VERSION()").fetch_one(&mut self.conn).await?;
        Ok(row.try_get::<String, _>(0)?)
    }
}

/// Quote a MySQL identifier, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
